// src/sources/fires.rs
//! Satellite fire-detection adapter.
//!
//! One logical fetch fans out to every configured satellite product, each as
//! its own CSV request, and merges the parsed rows. Partial failure follows
//! the configured [`FanoutPolicy`].

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use futures::future;
use metrics::{counter, histogram};

use crate::config::FiresConfig;
use crate::sources::types::FireDetection;
use crate::sources::FanoutPolicy;

/// Rows shorter than this are not considered at all.
const MIN_COLUMNS: usize = 9;
/// Substituted when the confidence column is missing or unparseable.
const DEFAULT_CONFIDENCE: u8 = 50;
/// Substituted when the radiative-power column is missing or unparseable.
const DEFAULT_FRP: f64 = 1.0;

// Telemetry CSV layout:
// latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,
// instrument,confidence,version,bright_t31,frp,daynight
const COL_LATITUDE: usize = 0;
const COL_LONGITUDE: usize = 1;
const COL_BRIGHTNESS: usize = 2;
const COL_ACQ_DATE: usize = 5;
const COL_ACQ_TIME: usize = 6;
const COL_CONFIDENCE: usize = 9;
const COL_FRP: usize = 12;
const COL_DAYNIGHT: usize = 13;

/// Seam between the background poller and the telemetry fan-out. The poller
/// only needs "detections for a date"; tests drive it with a scripted source.
#[async_trait::async_trait]
pub trait DetectionSource: Send + Sync {
    async fn fetch_latest(&self, date: NaiveDate) -> Result<Vec<FireDetection>>;
    fn name(&self) -> &'static str;
}

pub struct FireFeed {
    client: reqwest::Client,
    cfg: FiresConfig,
}

#[async_trait::async_trait]
impl DetectionSource for FireFeed {
    async fn fetch_latest(&self, date: NaiveDate) -> Result<Vec<FireDetection>> {
        self.fetch(date).await
    }

    fn name(&self) -> &'static str {
        "firms"
    }
}

impl FireFeed {
    pub fn new(client: reqwest::Client, cfg: FiresConfig) -> Self {
        Self { client, cfg }
    }

    /// Fetch every configured satellite source for `date` and merge their
    /// rows. Under `RequireAll` any source error fails the fetch; under
    /// `BestEffort` failed sources are skipped as long as one succeeds.
    pub async fn fetch(&self, date: NaiveDate) -> Result<Vec<FireDetection>> {
        if self.cfg.sources.is_empty() {
            return Ok(Vec::new());
        }
        let area = self.cfg.bbox.as_area();
        let day = date.format("%Y-%m-%d").to_string();
        let requests = self.cfg.sources.iter().map(|source| {
            // Key and area ride in the path; never log the full URL.
            let url = format!(
                "{}/{}/{}/{}/{}/{}",
                self.cfg.base_url, self.cfg.api_key, source, area, self.cfg.day_range, day
            );
            let client = self.client.clone();
            let source = source.clone();
            async move {
                fetch_csv(&client, &url)
                    .await
                    .with_context(|| format!("telemetry source {source}"))
            }
        });

        let bodies: Vec<String> = match self.cfg.fanout {
            FanoutPolicy::RequireAll => future::try_join_all(requests).await?,
            FanoutPolicy::BestEffort => future::join_all(requests)
                .await
                .into_iter()
                .filter_map(|res| match res {
                    Ok(body) => Some(body),
                    Err(err) => {
                        tracing::warn!(error = ?err, "skipping telemetry source");
                        counter!("fires_source_errors_total").increment(1);
                        None
                    }
                })
                .collect(),
        };
        if bodies.is_empty() {
            return Err(anyhow!("all telemetry sources failed"));
        }

        let fetched_at = Utc::now();
        let mut detections = Vec::new();
        for body in &bodies {
            detections.extend(parse_detections(body, fetched_at));
        }
        Ok(detections)
    }
}

async fn fetch_csv(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await.context("telemetry get()")?;
    let resp = resp.error_for_status().context("telemetry status")?;
    resp.text().await.context("telemetry .text()")
}

/// Parse one CSV body. The header row is dropped; a data row is kept only if
/// it carries at least [`MIN_COLUMNS`] fields and numeric latitude,
/// longitude, and brightness. Optional fields degrade to defaults instead of
/// dropping the row.
pub fn parse_detections(csv: &str, fetched_at: DateTime<Utc>) -> Vec<FireDetection> {
    let t0 = std::time::Instant::now();
    let mut rows = 0u64;
    let mut dropped = 0u64;
    let mut out = Vec::new();

    for line in csv.lines().map(str::trim).filter(|l| !l.is_empty()).skip(1) {
        rows += 1;
        match parse_row(line, fetched_at) {
            Some(d) => out.push(d),
            None => dropped += 1,
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("fires_parse_ms").record(ms);
    counter!("fires_rows_total").increment(rows);
    counter!("fires_rows_dropped_total").increment(dropped);
    out
}

fn parse_row(line: &str, fetched_at: DateTime<Utc>) -> Option<FireDetection> {
    let cols: Vec<&str> = line.split(',').collect();
    if cols.len() < MIN_COLUMNS {
        return None;
    }
    let latitude = cols[COL_LATITUDE].trim().parse::<f64>().ok()?;
    let longitude = cols[COL_LONGITUDE].trim().parse::<f64>().ok()?;
    let brightness = cols[COL_BRIGHTNESS].trim().parse::<f64>().ok()?;
    let confidence = cols
        .get(COL_CONFIDENCE)
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|v| *v <= 100)
        .unwrap_or(DEFAULT_CONFIDENCE);
    let frp = cols
        .get(COL_FRP)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(DEFAULT_FRP);
    let observed_at =
        parse_observed_at(cols.get(COL_ACQ_DATE), cols.get(COL_ACQ_TIME)).unwrap_or(fetched_at);
    let day_night = cols
        .get(COL_DAYNIGHT)
        .map(|v| v.trim().to_string())
        .unwrap_or_default();

    Some(FireDetection {
        latitude,
        longitude,
        brightness,
        confidence,
        frp,
        observed_at,
        day_night,
    })
}

/// acq_date is `YYYY-MM-DD`; acq_time is an integer `HHMM` (leading zeros
/// may be absent). Both must parse, otherwise the caller substitutes the
/// fetch time.
fn parse_observed_at(date: Option<&&str>, time: Option<&&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date?.trim(), "%Y-%m-%d").ok()?;
    let hhmm: u32 = time?.trim().parse().ok()?;
    let time = NaiveTime::from_hms_opt(hhmm / 100, hhmm % 100, 0)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}
