// src/sources/mod.rs
pub mod air_quality;
pub mod fires;
pub mod incidents;
pub mod news;
pub mod social;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fires_rows_total", "CSV rows seen across telemetry sources.");
        describe_counter!(
            "fires_rows_dropped_total",
            "CSV rows dropped as short or non-numeric."
        );
        describe_counter!(
            "fires_source_errors_total",
            "Telemetry source fetch errors (best-effort fan-out)."
        );
        describe_histogram!("fires_parse_ms", "CSV parse time in milliseconds.");
        describe_counter!(
            "stats_fallback_total",
            "Incident-stats fetches that served the fallback snapshot."
        );
        describe_counter!(
            "air_fallback_total",
            "Air-quality fetches that collapsed to Unknown after an error."
        );
        describe_counter!("news_refresh_total", "News upstream refreshes.");
        describe_counter!("news_kept_total", "Articles kept after filtering.");
        describe_counter!(
            "news_filtered_total",
            "Articles dropped as redacted, incomplete, or stale."
        );
        describe_counter!("social_session_logins_total", "Social session logins.");
        describe_counter!(
            "social_account_errors_total",
            "Monitored accounts skipped during a feed refresh."
        );
        describe_counter!(
            "social_fallback_total",
            "Social feed reads that served the placeholder posts."
        );
        describe_counter!("poll_runs_total", "Completed domain refreshes.");
        describe_counter!(
            "poll_discarded_total",
            "Refresh completions discarded as superseded."
        );
        describe_gauge!("poll_last_run_ts", "Unix ts when a domain last refreshed.");
    });
}

/// How an adapter treats partial failure when it fans out to several
/// upstreams in one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FanoutPolicy {
    /// Any failed upstream fails the whole operation.
    #[default]
    RequireAll,
    /// Failed upstreams are skipped; at least one must succeed.
    BestEffort,
}

/// Normalize upstream text fields (news titles, social post bodies):
/// decode HTML entities, collapse whitespace, trim.
pub(crate) fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(decoded.trim(), " ").to_string()
}

/// Parse the leading integer of a scraped numeric string, ignoring
/// thousands separators ("12,300+" -> 12300).
pub(crate) fn parse_count(s: &str) -> Option<u32> {
    let cleaned = s.replace(',', "");
    let digits: String = cleaned
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
