//! Observable store state and its derived views.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use common::{ForecastResponse, Lighthouse};

/// Which lighthouse, if any, is open for detailed inspection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailView {
    #[default]
    Closed,
    Open(String),
}

impl DetailView {
    pub fn is_open(&self, id: &str) -> bool {
        matches!(self, DetailView::Open(open) if open == id)
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            DetailView::Open(id) => Some(id),
            DetailView::Closed => None,
        }
    }
}

/// Where the in-memory forecast came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastOrigin {
    /// A successful remote fetch.
    Fetched,
    /// Fallback to the persisted copy after a failed fetch.
    Cache,
}

/// A forecast held in memory with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub forecast: ForecastResponse,
    pub origin: ForecastOrigin,
    pub updated_at: DateTime<Utc>,
}

/// Everything subscribers can observe. Replaced atomically per mutation.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub catalog: Vec<Lighthouse>,
    pub forecasts: HashMap<String, ForecastEntry>,
    /// Raw filter text as entered; trimming happens when filtering.
    pub filter: String,
    pub detail: DetailView,
    pub favorites: BTreeSet<String>,
    /// Wind alert thresholds (m/s) keyed by lighthouse id.
    pub wind_alerts: HashMap<String, f64>,
    pub notifications_enabled: bool,
}

impl StoreState {
    /// Catalog entries whose name contains the filter, case-insensitively.
    pub fn filtered(&self) -> Vec<&Lighthouse> {
        let needle = self.filter.trim().to_lowercase();
        self.catalog
            .iter()
            .filter(|lh| lh.name_matches(&needle))
            .collect()
    }

    pub fn lighthouse(&self, id: &str) -> Option<&Lighthouse> {
        self.catalog.iter().find(|lh| lh.id == id)
    }

    pub fn forecast(&self, id: &str) -> Option<&ForecastResponse> {
        self.forecasts.get(id).map(|entry| &entry.forecast)
    }

    /// Favorite lighthouses in catalog order.
    pub fn favorites(&self) -> Vec<&Lighthouse> {
        self.catalog
            .iter()
            .filter(|lh| self.favorites.contains(&lh.id))
            .collect()
    }
}
