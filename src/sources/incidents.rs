// src/sources/incidents.rs
//! Incident-stats scraper.
//!
//! The public incident page is fetched through a CORS relay and mined in two
//! tiers: a structured pass over the stats container, then regex patterns
//! over the page text when the container is missing. When both tiers come up
//! empty, or the page cannot be fetched at all, a pinned fallback snapshot
//! is served and tagged as such.

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::IncidentsConfig;
use crate::sources::types::{IncidentStats, Sourced};
use crate::sources::parse_count;

/// Snapshot substituted when nothing can be extracted.
pub fn fallback_stats() -> IncidentStats {
    IncidentStats {
        active_fires: 98,
        fire_area: "35,999 acres".into(),
        structures_damaged: "12,300+".into(),
    }
}

pub struct IncidentScraper {
    client: reqwest::Client,
    cfg: IncidentsConfig,
}

impl IncidentScraper {
    pub fn new(client: reqwest::Client, cfg: IncidentsConfig) -> Self {
        Self { client, cfg }
    }

    /// Fetch the incident page and extract the stats triple. Never fails:
    /// any error substitutes the fallback snapshot.
    pub async fn fetch(&self) -> Sourced<IncidentStats> {
        match self.try_fetch().await {
            Ok(stats) => Sourced::live(stats),
            Err(err) => {
                tracing::warn!(error = ?err, "incident stats unavailable; serving fallback snapshot");
                counter!("stats_fallback_total").increment(1);
                Sourced::fallback(fallback_stats())
            }
        }
    }

    async fn try_fetch(&self) -> Result<IncidentStats> {
        let resp = self
            .client
            .get(&self.cfg.relay_url)
            .query(&[("url", self.cfg.page_url.as_str())])
            .send()
            .await
            .context("incident page get()")?;
        let html = resp
            .error_for_status()
            .context("incident page status")?
            .text()
            .await
            .context("incident page .text()")?;
        extract_stats(&html)
    }
}

/// Extract the stats triple from a page. Structured markup wins; text
/// patterns are the fallback tier. Errors only when neither tier finds
/// anything.
pub fn extract_stats(html: &str) -> Result<IncidentStats> {
    let doc = Html::parse_document(html);
    if let Some(stats) = extract_structured(&doc) {
        return Ok(stats);
    }
    extract_from_text(&page_text(&doc))
        .ok_or_else(|| anyhow!("no stats container and no pattern matches"))
}

/// Structured tier: inside the stats container, each `h2` label's value sits
/// in the element right before it. The container's presence settles the
/// result; unmatched labels stay at their zero placeholders.
fn extract_structured(doc: &Html) -> Option<IncidentStats> {
    let container_sel = Selector::parse(".incident-stats").expect("container selector");
    let h2_sel = Selector::parse("h2").expect("h2 selector");

    let container = doc.select(&container_sel).next()?;
    let mut stats = IncidentStats {
        active_fires: 0,
        fire_area: "0 acres".into(),
        structures_damaged: "0".into(),
    };
    for header in container.select(&h2_sel) {
        let label = element_text(header);
        let value = preceding_element_text(header).unwrap_or_else(|| "0".into());
        if label.contains("Wildfires") {
            stats.active_fires = parse_count(&value).unwrap_or(0);
        } else if label.contains("Acres Burned") {
            stats.fire_area = format!("{value} acres");
        } else if label.contains("Structures") {
            stats.structures_damaged = value;
        }
    }
    Some(stats)
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of the nearest preceding sibling that is an element.
fn preceding_element_text(el: ElementRef<'_>) -> Option<String> {
    el.prev_siblings()
        .find_map(ElementRef::wrap)
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn page_text(doc: &Html) -> String {
    let body_sel = Selector::parse("body").expect("body selector");
    match doc.select(&body_sel).next() {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => doc.root_element().text().collect::<Vec<_>>().join(" "),
    }
}

/// Text tier: the three headline phrases as they appear in page copy. At
/// least one pattern must hit; the others degrade to zero placeholders.
fn extract_from_text(text: &str) -> Option<IncidentStats> {
    static RE_WILDFIRES: OnceCell<Regex> = OnceCell::new();
    static RE_ACRES: OnceCell<Regex> = OnceCell::new();
    static RE_STRUCTURES: OnceCell<Regex> = OnceCell::new();
    let re_wildfires =
        RE_WILDFIRES.get_or_init(|| Regex::new(r"(\d+)\s+Wildfires").expect("wildfires regex"));
    let re_acres =
        RE_ACRES.get_or_init(|| Regex::new(r"(\d+[\d,]*)\s+Acres Burned").expect("acres regex"));
    let re_structures = RE_STRUCTURES
        .get_or_init(|| Regex::new(r"(\d+[\d,]*\+?)\s+Structures").expect("structures regex"));

    let fires = capture(re_wildfires, text);
    let acres = capture(re_acres, text);
    let structures = capture(re_structures, text);
    if fires.is_none() && acres.is_none() && structures.is_none() {
        return None;
    }

    Some(IncidentStats {
        active_fires: fires.as_deref().and_then(parse_count).unwrap_or(0),
        fire_area: format!(
            "{} acres",
            acres.map(|v| v.replace(',', "")).unwrap_or_else(|| "0".into())
        ),
        structures_damaged: structures
            .map(|v| v.replace(',', ""))
            .unwrap_or_else(|| "0".into()),
    })
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
