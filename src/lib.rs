// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod cache;
pub mod config;
pub mod forum;
pub mod i18n;
pub mod metrics;
pub mod poller;
pub mod sources;

// ---- Re-exports for stable public API ----
// Convenient router access: `wildfire_tracker::api::create_router` or
// `wildfire_tracker::create_router`
pub use crate::api::{create_router, AppState};

// Record types most callers want without spelling out the module path
pub use crate::sources::types::{
    AirQuality, FireDetection, IncidentStats, NewsArticle, NewsPage, Provenance, SocialPost,
    Sourced,
};
