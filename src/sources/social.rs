// src/sources/social.rs
//! Social-feed adapter for the monitored emergency accounts.
//!
//! Auth is an explicit session state machine instead of ad-hoc retries: a
//! login moves `Unauthenticated -> Authenticating -> Authenticated`; a 401
//! from any feed call marks the session `Expired`, and the next refresh
//! logs in again. Feed reads go through a short cache so burst reads reuse
//! one upstream pass.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::TtlCache;
use crate::config::SocialConfig;
use crate::sources::clean_text;
use crate::sources::types::{SocialPost, Sourced};

/// Observable phase of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

#[derive(Debug, Clone)]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Debug, Default)]
enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(Session),
    Expired,
}

impl AuthState {
    fn phase(&self) -> SessionPhase {
        match self {
            AuthState::Unauthenticated => SessionPhase::Unauthenticated,
            AuthState::Authenticating => SessionPhase::Authenticating,
            AuthState::Authenticated(_) => SessionPhase::Authenticated,
            AuthState::Expired => SessionPhase::Expired,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    did: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorFeedResponse {
    #[serde(default)]
    feed: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    post: Option<FeedPost>,
}

#[derive(Debug, Deserialize)]
struct FeedPost {
    record: Option<PostRecord>,
    #[serde(rename = "indexedAt")]
    indexed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PostRecord {
    text: Option<String>,
}

pub struct SocialFeed {
    client: reqwest::Client,
    cfg: SocialConfig,
    auth: Mutex<AuthState>,
    cache: TtlCache<Vec<SocialPost>>,
    live: AtomicBool,
}

impl SocialFeed {
    pub fn new(client: reqwest::Client, cfg: SocialConfig) -> Self {
        let cache = TtlCache::new(cfg.cache_ttl());
        Self {
            client,
            cfg,
            auth: Mutex::new(AuthState::default()),
            cache,
            live: AtomicBool::new(false),
        }
    }

    /// Current phase of the session state machine.
    pub async fn session_phase(&self) -> SessionPhase {
        self.auth.lock().await.phase()
    }

    /// Whether the last served feed carried live posts rather than the
    /// placeholder list. False until something has been served.
    pub fn live_feed(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    /// Latest posts across the monitored accounts, newest first. Served from
    /// the cache while fresh; the placeholder feed covers auth failures,
    /// total fetch failure, and an upstream that returned nothing.
    pub async fn latest(&self) -> Sourced<Vec<SocialPost>> {
        let out = match self.cache.get_or_refresh(|| self.refresh()).await {
            Ok(posts) if posts.is_empty() => {
                counter!("social_fallback_total").increment(1);
                Sourced::fallback(fallback_posts())
            }
            Ok(posts) => Sourced::live(posts),
            Err(err) => {
                tracing::warn!(error = ?err, "social feed unavailable; serving placeholder posts");
                counter!("social_fallback_total").increment(1);
                Sourced::fallback(fallback_posts())
            }
        };
        self.live.store(out.is_live(), Ordering::Relaxed);
        out
    }

    async fn refresh(&self) -> Result<Vec<SocialPost>> {
        let session = self.ensure_session().await?;
        let mut merged = Vec::new();
        for account in &self.cfg.accounts {
            match self.fetch_account(&session, account).await {
                Ok(mut posts) => merged.append(&mut posts),
                Err(err) => {
                    // One bad account must not sink the merge.
                    tracing::warn!(error = ?err, account = account.as_str(), "skipping account");
                    counter!("social_account_errors_total").increment(1);
                }
            }
        }
        merged.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        merged.truncate(self.cfg.max_posts);
        Ok(merged)
    }

    async fn ensure_session(&self) -> Result<Session> {
        {
            let mut auth = self.auth.lock().await;
            if let AuthState::Authenticated(session) = &*auth {
                return Ok(session.clone());
            }
            if !self.cfg.has_credentials() {
                bail!("social credentials not configured");
            }
            *auth = AuthState::Authenticating;
        }

        // The login round-trip runs unlocked; `session_phase()` must stay
        // readable while it is in flight.
        let result = self.create_session().await;

        let mut auth = self.auth.lock().await;
        match result {
            Ok(session) => {
                counter!("social_session_logins_total").increment(1);
                tracing::debug!("social session established");
                *auth = AuthState::Authenticated(session.clone());
                Ok(session)
            }
            Err(err) => {
                *auth = AuthState::Unauthenticated;
                Err(err)
            }
        }
    }

    async fn create_session(&self) -> Result<Session> {
        let url = format!("{}/xrpc/com.atproto.server.createSession", self.cfg.service_url);
        let resp: CreateSessionResponse = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "identifier": self.cfg.identifier,
                "password": self.cfg.password,
            }))
            .send()
            .await
            .context("social login post()")?
            .error_for_status()
            .context("social login status")?
            .json()
            .await
            .context("social login body")?;
        Ok(Session {
            access_jwt: resp.access_jwt,
            did: resp.did,
        })
    }

    async fn fetch_account(&self, session: &Session, handle: &str) -> Result<Vec<SocialPost>> {
        let profile = self.get_profile(session, handle).await?;
        let feed = self.get_author_feed(session, &profile.did).await?;
        let display_name = profile
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| handle.to_string());

        let mut posts = Vec::new();
        for item in feed.feed {
            let Some(post) = item.post else { continue };
            let Some(indexed_at) = post.indexed_at else { continue };
            let Some(text) = post.record.and_then(|r| r.text) else {
                continue;
            };
            let content = clean_text(&text);
            if content.is_empty() {
                continue;
            }
            posts.push(SocialPost {
                author: handle.to_string(),
                display_name: display_name.clone(),
                content,
                posted_at: indexed_at,
            });
        }
        Ok(posts)
    }

    async fn get_profile(&self, session: &Session, handle: &str) -> Result<ProfileResponse> {
        let url = format!("{}/xrpc/app.bsky.actor.getProfile", self.cfg.service_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("actor", handle)])
            .bearer_auth(&session.access_jwt)
            .send()
            .await
            .context("profile get()")?;
        let resp = self.check_session(resp, handle).await?;
        resp.json().await.context("profile body")
    }

    async fn get_author_feed(&self, session: &Session, did: &str) -> Result<AuthorFeedResponse> {
        let url = format!("{}/xrpc/app.bsky.feed.getAuthorFeed", self.cfg.service_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("actor", did.to_string()),
                ("limit", self.cfg.max_posts.to_string()),
            ])
            .bearer_auth(&session.access_jwt)
            .send()
            .await
            .context("author feed get()")?;
        let resp = self.check_session(resp, did).await?;
        resp.json().await.context("author feed body")
    }

    /// A 401 marks the session expired; the next refresh logs in again.
    async fn check_session(
        &self,
        resp: reqwest::Response,
        subject: &str,
    ) -> Result<reqwest::Response> {
        if resp.status() == StatusCode::UNAUTHORIZED {
            let mut auth = self.auth.lock().await;
            *auth = AuthState::Expired;
            tracing::debug!(subject, "social session expired");
            return Err(anyhow!("session rejected for {subject}"));
        }
        resp.error_for_status().context("social feed status")
    }
}

/// Placeholder feed shown when no live posts are available. Contents are
/// pinned; timestamps are synthesized relative to now so the feed still
/// reads newest-first.
pub fn fallback_posts() -> Vec<SocialPost> {
    let now = Utc::now();
    vec![
        SocialPost {
            author: "@CAL_FIRE".into(),
            display_name: "CAL FIRE".into(),
            content: "For the latest official fire updates, please visit fire.ca.gov".into(),
            posted_at: now,
        },
        SocialPost {
            author: "@CalOES".into(),
            display_name: "Cal OES".into(),
            content: "Stay prepared and have an evacuation plan ready. Visit caloes.ca.gov for emergency preparedness guides.".into(),
            posted_at: now - ChronoDuration::hours(1),
        },
        SocialPost {
            author: "@NWS".into(),
            display_name: "NWS Los Angeles".into(),
            content: "Monitor local weather conditions and fire warnings at weather.gov".into(),
            posted_at: now - ChronoDuration::hours(2),
        },
    ]
}
