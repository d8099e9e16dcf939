use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::forum::{ForumBoard, ForumPost};
use crate::i18n;
use crate::poller::{refresh_stats, DomainState, Snapshot, StatsBundle};
use crate::sources::air_quality::AirQualityFeed;
use crate::sources::incidents::IncidentScraper;
use crate::sources::news::NewsFeed;
use crate::sources::social::{SessionPhase, SocialFeed};
use crate::sources::types::{FireDetection, NewsPage, SocialPost, Sourced};

#[derive(Clone)]
pub struct AppState {
    pub forum: Arc<ForumBoard>,
    pub fires: Arc<DomainState<Vec<FireDetection>>>,
    pub stats: Arc<DomainState<StatsBundle>>,
    pub incidents: Arc<IncidentScraper>,
    pub air: Arc<AirQualityFeed>,
    pub news: Arc<NewsFeed>,
    pub social: Arc<SocialFeed>,
    /// Stats snapshots older than this are re-scraped on request.
    pub stats_max_age: Duration,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/translations", get(translations))
        .route("/posts", get(list_posts).post(create_post))
        .route("/api/fires", get(fire_snapshot))
        .route("/api/stats", get(stats_snapshot))
        .route("/api/news", get(news_page))
        .route("/api/social", get(social_feed))
        .route("/debug/social-session", get(debug_social_session))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct LangQuery {
    #[serde(default)]
    lang: Option<String>,
}

async fn translations(Query(q): Query<LangQuery>) -> Json<Value> {
    let lang = q.lang.as_deref().unwrap_or(i18n::DEFAULT_LANG);
    Json(i18n::table(lang).clone())
}

async fn list_posts(State(state): State<AppState>) -> Json<Vec<ForumPost>> {
    Json(state.forum.list())
}

#[derive(serde::Deserialize)]
struct NewPostReq {
    #[serde(default)]
    content: String,
}

async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<NewPostReq>,
) -> Result<(StatusCode, Json<ForumPost>), (StatusCode, Json<Value>)> {
    match state.forum.create(&body.content) {
        Some(post) => Ok((StatusCode::CREATED, Json(post))),
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Content cannot be empty" })),
        )),
    }
}

async fn fire_snapshot(State(state): State<AppState>) -> Json<Snapshot<Vec<FireDetection>>> {
    Json(state.fires.snapshot().await)
}

async fn stats_snapshot(State(state): State<AppState>) -> Json<Snapshot<StatsBundle>> {
    let snap = refresh_stats(
        &state.stats,
        &state.incidents,
        &state.air,
        state.stats_max_age,
    )
    .await;
    Json(snap)
}

#[derive(serde::Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: usize,
}

fn default_page() -> usize {
    1
}

async fn news_page(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<NewsPage>, (StatusCode, Json<Value>)> {
    match state.news.page(q.page).await {
        Ok(page) => Ok(Json(page)),
        Err(err) => {
            tracing::warn!(error = ?err, "news page unavailable");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "news feed unavailable" })),
            ))
        }
    }
}

async fn social_feed(State(state): State<AppState>) -> Json<Sourced<Vec<SocialPost>>> {
    Json(state.social.latest().await)
}

#[derive(serde::Serialize)]
struct SessionOut {
    phase: SessionPhase,
    /// The dashboard's Live/Demo light: true while real posts are served.
    live_feed: bool,
}

async fn debug_social_session(State(state): State<AppState>) -> Json<SessionOut> {
    Json(SessionOut {
        phase: state.social.session_phase().await,
        live_feed: state.social.live_feed(),
    })
}
