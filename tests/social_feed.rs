// tests/social_feed.rs
//
// Social adapter against a mock XRPC service: login + profile + author feed,
// merge across accounts, session lifecycle, and fallback substitution.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wildfire_tracker::config::SocialConfig;
use wildfire_tracker::sources::social::{SessionPhase, SocialFeed};

fn test_cfg(server: &MockServer, accounts: &[&str]) -> SocialConfig {
    SocialConfig {
        service_url: server.uri(),
        identifier: "tracker.example".into(),
        password: "app-password".into(),
        accounts: accounts.iter().map(|s| s.to_string()).collect(),
        ..SocialConfig::default()
    }
}

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .and(body_partial_json(json!({ "identifier": "tracker.example" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessJwt": "jwt-test",
            "refreshJwt": "refresh-test",
            "did": "did:plc:login",
            "handle": "tracker.example"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_profile(server: &MockServer, handle: &str, did: &str, display_name: Option<&str>) {
    let mut body = json!({ "did": did, "handle": handle });
    if let Some(name) = display_name {
        body["displayName"] = json!(name);
    }
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", handle))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_feed(server: &MockServer, did: &str, posts: Vec<(&str, &str)>) {
    let feed: Vec<_> = posts
        .into_iter()
        .map(|(text, indexed_at)| {
            json!({
                "post": {
                    "uri": format!("at://{did}/app.bsky.feed.post/x"),
                    "record": { "text": text, "createdAt": indexed_at },
                    "indexedAt": indexed_at
                }
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param("actor", did))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feed": feed })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn merges_accounts_newest_first_and_truncates() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_profile(&server, "lafd.bsky.social", "did:plc:lafd", Some("LAFD")).await;
    mount_profile(&server, "calfire.bsky.social", "did:plc:calfire", None).await;
    mount_feed(
        &server,
        "did:plc:lafd",
        vec![
            ("Brush fire near Sylmar", "2024-01-15T10:00:00Z"),
            ("All clear in Sunland", "2024-01-15T08:00:00Z"),
        ],
    )
    .await;
    mount_feed(
        &server,
        "did:plc:calfire",
        vec![
            ("Evacuation warning lifted", "2024-01-15T09:00:00Z"),
            ("Containment line holding", "2024-01-15T07:00:00Z"),
        ],
    )
    .await;

    let cfg = SocialConfig {
        max_posts: 3,
        ..test_cfg(&server, &["lafd.bsky.social", "calfire.bsky.social"])
    };
    let feed = SocialFeed::new(reqwest::Client::new(), cfg);
    let out = feed.latest().await;

    assert!(out.is_live());
    let contents: Vec<_> = out.value.iter().map(|p| p.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "Brush fire near Sylmar",
            "Evacuation warning lifted",
            "All clear in Sunland"
        ],
        "merged feed must be newest-first and truncated to max_posts"
    );
    assert_eq!(out.value[0].author, "lafd.bsky.social");
    assert_eq!(out.value[0].display_name, "LAFD");
    assert_eq!(
        out.value[1].display_name, "calfire.bsky.social",
        "missing display name falls back to the handle"
    );
    assert_eq!(feed.session_phase().await, SessionPhase::Authenticated);
    assert!(feed.live_feed(), "a live serve turns the feed flag on");
}

#[tokio::test]
async fn one_failing_account_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_profile(&server, "lafd.bsky.social", "did:plc:lafd", Some("LAFD")).await;
    mount_feed(
        &server,
        "did:plc:lafd",
        vec![("Containment at 60%", "2024-01-15T10:00:00Z")],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .and(query_param("actor", "lapd.bsky.social"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let feed = SocialFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["lafd.bsky.social", "lapd.bsky.social"]),
    );
    let out = feed.latest().await;

    assert!(out.is_live());
    assert_eq!(out.value.len(), 1);
    assert_eq!(out.value[0].content, "Containment at 60%");
}

#[tokio::test]
async fn failed_login_serves_placeholder_posts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let feed = SocialFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["lafd.bsky.social"]),
    );
    let out = feed.latest().await;

    assert!(!out.is_live());
    assert_eq!(out.value.len(), 3);
    assert_eq!(out.value[0].author, "@CAL_FIRE");
    assert_eq!(feed.session_phase().await, SessionPhase::Unauthenticated);
    assert!(!feed.live_feed(), "a placeholder serve leaves the feed flag off");
}

#[tokio::test]
async fn cached_window_reuses_the_merged_feed() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_profile(&server, "lafd.bsky.social", "did:plc:lafd", Some("LAFD")).await;
    mount_feed(
        &server,
        "did:plc:lafd",
        vec![("Wind advisory tonight", "2024-01-15T10:00:00Z")],
    )
    .await;

    let feed = SocialFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["lafd.bsky.social"]),
    );
    let first = feed.latest().await;
    let second = feed.latest().await;

    assert!(first.is_live() && second.is_live());
    assert_eq!(
        first.value, second.value,
        "inside the window both reads are the same set"
    );
    // mount_login's expect(1) verifies only one upstream pass happened
}

#[tokio::test]
async fn rejected_session_is_marked_expired_and_relogged_in() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.actor.getProfile"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    // Zero TTL so the second read refreshes instead of hitting the cache.
    let cfg = SocialConfig {
        cache_ttl_secs: 0,
        ..test_cfg(&server, &["lafd.bsky.social"])
    };
    let feed = SocialFeed::new(reqwest::Client::new(), cfg);

    let first = feed.latest().await;
    assert!(!first.is_live(), "all accounts rejected, placeholder served");
    assert_eq!(feed.session_phase().await, SessionPhase::Expired);

    // Next refresh logs in again; mount_login's expect(2) verifies it.
    let _ = feed.latest().await;
}

#[tokio::test]
async fn login_in_flight_is_observable_as_authenticating() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xrpc/com.atproto.server.createSession"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(300))
                .set_body_json(json!({
                    "accessJwt": "jwt-test",
                    "refreshJwt": "refresh-test",
                    "did": "did:plc:login",
                    "handle": "tracker.example"
                })),
        )
        .mount(&server)
        .await;
    // Feed calls after the login are irrelevant here; fail them fast.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let feed = Arc::new(SocialFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["lafd.bsky.social"]),
    ));
    let bg = {
        let feed = feed.clone();
        tokio::spawn(async move { feed.latest().await })
    };

    // Phase reads must not block behind the login round-trip.
    let mut observed = SessionPhase::Unauthenticated;
    for _ in 0..100 {
        observed = feed.session_phase().await;
        if observed == SessionPhase::Authenticating {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(observed, SessionPhase::Authenticating);

    let out = bg.await.expect("latest() task");
    assert!(!out.is_live(), "the only account failed, placeholder served");
    assert_eq!(feed.session_phase().await, SessionPhase::Authenticated);
}

#[tokio::test]
async fn posts_without_text_are_dropped() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_profile(&server, "lafd.bsky.social", "did:plc:lafd", Some("LAFD")).await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param("actor", "did:plc:lafd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feed": [
                { "post": { "record": { "text": "Red flag warning" }, "indexedAt": "2024-01-15T10:00:00Z" } },
                { "post": { "record": {}, "indexedAt": "2024-01-15T09:00:00Z" } },
                { "post": { "record": { "text": "   " }, "indexedAt": "2024-01-15T08:00:00Z" } },
                { "post": null },
                {}
            ]
        })))
        .mount(&server)
        .await;

    let feed = SocialFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["lafd.bsky.social"]),
    );
    let out = feed.latest().await;

    assert!(out.is_live());
    assert_eq!(out.value.len(), 1);
    assert_eq!(out.value[0].content, "Red flag warning");
}
