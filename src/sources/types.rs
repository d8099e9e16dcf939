//! Shared record types produced by the upstream adapters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a value came from: a real upstream response, or the static default
/// substituted after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Fallback,
}

/// An adapter result tagged with its provenance, so consumers can tell live
/// data apart from substituted defaults without inspecting the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Sourced<T> {
    pub fn live(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Live,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Fallback,
        }
    }

    pub fn is_live(&self) -> bool {
        self.provenance == Provenance::Live
    }
}

/// One satellite hotspot detection, parsed from a single telemetry CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireDetection {
    pub latitude: f64,
    pub longitude: f64,
    /// Brightness temperature in Kelvin.
    pub brightness: f64,
    /// Detection confidence 0..=100; 50 when the source omits it.
    pub confidence: u8,
    /// Fire radiative power in MW; 1.0 when the source omits it.
    pub frp: f64,
    /// Acquisition timestamp; falls back to fetch time when the row's
    /// date/time fields do not parse.
    pub observed_at: DateTime<Utc>,
    /// "D" or "N" pass-through from the source.
    pub day_night: String,
}

/// Headline statistics scraped from the state incident page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentStats {
    pub active_fires: u32,
    /// Display string, e.g. "35,999 acres".
    pub fire_area: String,
    /// Display string, may carry a trailing '+', e.g. "12,300+".
    pub structures_damaged: String,
}

/// Air-quality severity derived from the upstream 1..=5 pollution index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirQuality {
    Good,
    Fair,
    Moderate,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Unknown,
}

impl AirQuality {
    /// Map the upstream index onto a severity label. Anything outside 1..=5
    /// (including a missing reading) collapses to `Unknown`.
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => AirQuality::Good,
            2 => AirQuality::Fair,
            3 => AirQuality::Moderate,
            4 => AirQuality::Poor,
            5 => AirQuality::VeryPoor,
            _ => AirQuality::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AirQuality::Good => "Good",
            AirQuality::Fair => "Fair",
            AirQuality::Moderate => "Moderate",
            AirQuality::Poor => "Poor",
            AirQuality::VeryPoor => "Very Poor",
            AirQuality::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AirQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One article from the news search, after filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

/// One fixed-size page out of the filtered, newest-first article set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsPage {
    pub articles: Vec<NewsArticle>,
    pub total_results: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

/// One post from a monitored emergency account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    /// Handle of the monitored account the post came from.
    pub author: String,
    pub display_name: String,
    pub content: String,
    pub posted_at: DateTime<Utc>,
}
