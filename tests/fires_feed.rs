// tests/fires_feed.rs
//
// Fire-detection adapter against a local mock upstream: per-source CSV
// requests, merge across sources, and both fan-out policies.

use chrono::NaiveDate;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wildfire_tracker::config::FiresConfig;
use wildfire_tracker::sources::fires::FireFeed;
use wildfire_tracker::sources::FanoutPolicy;

const HEADER: &str = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight";

fn csv_body(rows: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for r in rows {
        out.push('\n');
        out.push_str(r);
    }
    out
}

fn test_cfg(server: &MockServer, sources: &[&str], fanout: FanoutPolicy) -> FiresConfig {
    FiresConfig {
        base_url: server.uri(),
        api_key: "testkey".into(),
        sources: sources.iter().map(|s| s.to_string()).collect(),
        fanout,
        ..FiresConfig::default()
    }
}

fn fetch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date")
}

#[tokio::test]
async fn merges_rows_across_all_sources() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"/testkey/VIIRS_SNPP_NRT/.*/8/2024-01-15$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(&[
            "34.1,-118.2,300,x,x,2024-01-15,1200,x,x,77,x,x,45,D",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/testkey/MODIS_NRT/.*/8/2024-01-15$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(&[
            "35.0,-119.0,310,x,x,2024-01-15,1300,x,x,60,x,x,20,N",
            "36.0,-120.0,290,x,x,2024-01-15,1400,x,x,90,x,x,5,D",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let feed = FireFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["VIIRS_SNPP_NRT", "MODIS_NRT"], FanoutPolicy::RequireAll),
    );
    let detections = feed.fetch(fetch_date()).await.expect("fan-out fetch");

    assert_eq!(detections.len(), 3, "rows from both sources must merge");
    assert!(detections.iter().any(|d| d.latitude == 34.1));
    assert!(detections.iter().any(|d| d.latitude == 36.0));
}

#[tokio::test]
async fn require_all_fails_when_one_source_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"/testkey/VIIRS_SNPP_NRT/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(&[
            "34.1,-118.2,300,x,x,2024-01-15,1200,x,x,77,x,x,45,D",
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/testkey/MODIS_NRT/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let feed = FireFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["VIIRS_SNPP_NRT", "MODIS_NRT"], FanoutPolicy::RequireAll),
    );
    let res = feed.fetch(fetch_date()).await;
    assert!(res.is_err(), "require-all must surface the source error");
}

#[tokio::test]
async fn best_effort_keeps_the_surviving_sources() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"/testkey/VIIRS_SNPP_NRT/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(&[
            "34.1,-118.2,300,x,x,2024-01-15,1200,x,x,77,x,x,45,D",
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"/testkey/MODIS_NRT/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let feed = FireFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["VIIRS_SNPP_NRT", "MODIS_NRT"], FanoutPolicy::BestEffort),
    );
    let detections = feed.fetch(fetch_date()).await.expect("best-effort fetch");

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].latitude, 34.1);
}

#[tokio::test]
async fn best_effort_with_zero_survivors_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let feed = FireFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["VIIRS_SNPP_NRT", "MODIS_NRT"], FanoutPolicy::BestEffort),
    );
    assert!(feed.fetch(fetch_date()).await.is_err());
}

#[tokio::test]
async fn request_path_carries_area_window_and_date() {
    let server = MockServer::start().await;

    // bbox in west,south,east,north order, then day range, then the date.
    Mock::given(method("GET"))
        .and(path_regex(
            r"^/testkey/VIIRS_SNPP_NRT/-124\.409,32\.534,-114\.131,42\.009/8/2024-01-15$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(HEADER))
        .expect(1)
        .mount(&server)
        .await;

    let feed = FireFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["VIIRS_SNPP_NRT"], FanoutPolicy::RequireAll),
    );
    let detections = feed.fetch(fetch_date()).await.expect("single source fetch");
    assert!(detections.is_empty(), "header-only body parses to nothing");
}

#[tokio::test]
async fn malformed_rows_are_dropped_in_transit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(&[
            "34.1,-118.2,300,x,x,2024-01-15,1200,x,x,77,x,x,45,D",
            "garbage,row",
            "not,a,number,x,x,2024-01-15,1200,x,x,77,x,x,45,D",
        ])))
        .mount(&server)
        .await;

    let feed = FireFeed::new(
        reqwest::Client::new(),
        test_cfg(&server, &["VIIRS_SNPP_NRT"], FanoutPolicy::RequireAll),
    );
    let detections = feed.fetch(fetch_date()).await.expect("fetch");
    assert_eq!(detections.len(), 1);
}
