//! Forward geocoding: free text to canonical locations.
//!
//! `suggest` powers search-as-you-type and never fails; `resolve` backs an
//! explicit search submission and reports `NotFound`.

use crate::types::Location;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::instrument;
use wxpro_core::{WeatherConfig, WeatherError};

const DIRECT_PATH: &str = "geo/1.0/direct";

#[derive(Debug, Deserialize)]
struct GeocodingEntry {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    state: Option<String>,
}

impl From<GeocodingEntry> for Location {
    fn from(entry: GeocodingEntry) -> Self {
        Location {
            name: entry.name,
            country: entry.country,
            state: entry.state.filter(|s| !s.is_empty()),
            lat: entry.lat,
            lon: entry.lon,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeoResolver {
    client: Client,
    base_url: String,
    api_key: String,
    limit: u8,
    min_query_len: usize,
}

impl GeoResolver {
    pub fn new(client: Client, base_url: &str, api_key: &str, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            limit: config.suggestion_limit,
            min_query_len: config.min_query_len,
        }
    }

    /// Up to `limit` locations for a partial query, in provider relevance
    /// order. Short queries and any failure yield an empty list.
    #[instrument(skip(self), level = "debug")]
    pub async fn suggest(&self, query: &str) -> Vec<Location> {
        let query = query.trim();
        if query.chars().count() < self.min_query_len {
            return Vec::new();
        }

        match self.lookup(query, self.limit).await {
            Ok(locations) => locations,
            Err(e) => {
                tracing::debug!("Suggestion lookup for {:?} failed: {}", query, e);
                Vec::new()
            }
        }
    }

    /// Best match for a submitted search.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> Result<Location, WeatherError> {
        let query = query.trim();
        self.lookup(query, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::NotFound(query.to_string()))
    }

    async fn lookup(&self, query: &str, limit: u8) -> Result<Vec<Location>, WeatherError> {
        let url = format!("{}/{}", self.base_url, DIRECT_PATH);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::from_status(status.as_u16(), query, body));
        }

        let entries: Vec<GeocodingEntry> = response.json().await?;
        Ok(entries.into_iter().map(Location::from).collect())
    }
}

/// Lets only the last of a burst of keystrokes through.
#[derive(Debug)]
pub struct SuggestDebouncer {
    delay: Duration,
    latest: AtomicU64,
}

impl SuggestDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: AtomicU64::new(0),
        }
    }

    /// Wait out the quiet period. Returns a ticket if no other call started
    /// while this one was waiting.
    pub async fn settle(&self) -> Option<u64> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.is_current(ticket).then_some(ticket)
    }

    /// Invalidate any pending ticket, e.g. once a location has been picked.
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether `ticket` still belongs to the most recent call.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}
