//! forum.rs — in-memory community board. Posts live for the process
//! lifetime only; there is no persistence tier behind it.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One board entry. Ids are 1-based insertion indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ForumBoard {
    inner: Mutex<Vec<ForumPost>>,
}

impl ForumBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// All posts in insertion order.
    pub fn list(&self) -> Vec<ForumPost> {
        let v = self.inner.lock().expect("forum mutex poisoned");
        v.clone()
    }

    /// Append a post. Content must be non-empty after trimming; `None`
    /// signals a rejected submission. Accepted content is stored as
    /// submitted, untrimmed.
    pub fn create(&self, content: &str) -> Option<ForumPost> {
        if content.trim().is_empty() {
            return None;
        }
        let mut v = self.inner.lock().expect("forum mutex poisoned");
        let post = ForumPost {
            id: v.len() as u64 + 1,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        v.push(post.clone());
        // Log a content fingerprint, never the content itself.
        tracing::info!(id = post.id, content_hash = %anon_hash(content), "forum post created");
        Some(post)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("forum mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Short stable fingerprint for privacy-safe logging.
fn anon_hash(text: &str) -> String {
    use std::fmt::Write as _;
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
