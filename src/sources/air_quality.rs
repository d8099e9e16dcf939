// src/sources/air_quality.rs
//! Air-quality adapter: one pollution index for the configured coordinate,
//! mapped onto the severity scale.

use anyhow::{Context, Result};
use metrics::counter;
use serde::Deserialize;

use crate::config::AirConfig;
use crate::sources::types::{AirQuality, Sourced};

#[derive(Debug, Deserialize)]
struct PollutionResponse {
    #[serde(default)]
    list: Vec<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    main: MeasurementMain,
}

#[derive(Debug, Deserialize)]
struct MeasurementMain {
    aqi: i64,
}

pub struct AirQualityFeed {
    client: reqwest::Client,
    cfg: AirConfig,
}

impl AirQualityFeed {
    pub fn new(client: reqwest::Client, cfg: AirConfig) -> Self {
        Self { client, cfg }
    }

    /// Current severity for the configured coordinate. Fetch errors collapse
    /// to `Unknown` with fallback provenance; an index outside 1..=5 is
    /// `Unknown` but still live.
    pub async fn fetch(&self) -> Sourced<AirQuality> {
        match self.try_fetch().await {
            Ok(quality) => Sourced::live(quality),
            Err(err) => {
                tracing::warn!(error = ?err, "air quality unavailable");
                counter!("air_fallback_total").increment(1);
                Sourced::fallback(AirQuality::Unknown)
            }
        }
    }

    async fn try_fetch(&self) -> Result<AirQuality> {
        let url = format!("{}/air_pollution", self.cfg.base_url);
        let resp: PollutionResponse = self
            .client
            .get(&url)
            .query(&[
                ("lat", self.cfg.latitude.to_string()),
                ("lon", self.cfg.longitude.to_string()),
                ("appid", self.cfg.api_key.clone()),
            ])
            .send()
            .await
            .context("air quality get()")?
            .error_for_status()
            .context("air quality status")?
            .json()
            .await
            .context("air quality body")?;
        let first = resp
            .list
            .first()
            .context("air quality response has no measurements")?;
        Ok(AirQuality::from_index(first.main.aqi))
    }
}
