//! Persistence gateway: typed, fail-soft access to the key-value store.
//!
//! Nothing here returns an error: storage and decode failures are logged
//! and reported as "no data" (reads) or ignored (writes).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use common::{ForecastResponse, LighthouseRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::kv::KeyValueStore;
use crate::preferences::UserSettings;

pub const LIGHTHOUSES_KEY: &str = "lighthouses";
pub const FORECAST_KEY_PREFIX: &str = "forecast_";
pub const FAVORITES_KEY: &str = "favoriteLighthouses";
pub const WIND_ALERTS_KEY: &str = "windAlerts";
pub const SETTINGS_KEY: &str = "userSettings";
pub const LANGUAGE_KEY: &str = "userLanguage";

pub fn forecast_key(id: &str) -> String {
    format!("{FORECAST_KEY_PREFIX}{id}")
}

/// Typed view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persisted lighthouse list, if one was ever stored and still decodes.
    pub async fn load_catalog(&self) -> Option<Vec<LighthouseRecord>> {
        self.load_json(LIGHTHOUSES_KEY).await
    }

    pub async fn cache_forecast(&self, id: &str, data: &ForecastResponse) {
        self.save_json(&forecast_key(id), data).await;
    }

    pub async fn load_cached_forecast(&self, id: &str) -> Option<ForecastResponse> {
        self.load_json(&forecast_key(id)).await
    }

    pub async fn load_favorites(&self) -> BTreeSet<String> {
        self.load_json::<Vec<String>>(FAVORITES_KEY)
            .await
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default()
    }

    pub async fn save_favorites(&self, ids: &BTreeSet<String>) {
        let ids: Vec<&String> = ids.iter().collect();
        self.save_json(FAVORITES_KEY, &ids).await;
    }

    /// Wind alert thresholds in m/s keyed by lighthouse id.
    pub async fn load_wind_alerts(&self) -> HashMap<String, f64> {
        self.load_json(WIND_ALERTS_KEY).await.unwrap_or_default()
    }

    pub async fn save_wind_alerts(&self, alerts: &HashMap<String, f64>) {
        self.save_json(WIND_ALERTS_KEY, alerts).await;
    }

    pub async fn load_settings(&self) -> Option<UserSettings> {
        self.load_json(SETTINGS_KEY).await
    }

    pub async fn save_settings(&self, settings: &UserSettings) {
        self.save_json(SETTINGS_KEY, settings).await;
    }

    /// The language code is stored raw, not JSON-encoded.
    pub async fn load_language(&self) -> Option<String> {
        match self.store.get(LANGUAGE_KEY).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Error loading {} from storage: {}", LANGUAGE_KEY, e);
                None
            }
        }
    }

    pub async fn save_language(&self, code: &str) {
        if let Err(e) = self.store.set(LANGUAGE_KEY, code).await {
            warn!("Error saving {} to storage: {}", LANGUAGE_KEY, e);
        }
    }

    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error loading {} from storage: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable {} from storage: {}", key, e);
                None
            }
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Error encoding {} for storage: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, &raw).await {
            warn!("Error saving {} to storage: {}", key, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use async_trait::async_trait;
    use common::{CurrentConditions, Error};

    /// A store whose every operation fails.
    pub(crate) struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> common::Result<Option<String>> {
            Err(Error::Storage("disk unavailable".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> common::Result<()> {
            Err(Error::Storage("disk unavailable".into()))
        }
        async fn remove(&self, _key: &str) -> common::Result<()> {
            Err(Error::Storage("disk unavailable".into()))
        }
    }

    fn forecast(temp_c: f64) -> ForecastResponse {
        ForecastResponse {
            current: Some(CurrentConditions {
                temp_c,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_forecast_cache_uses_prefixed_key() {
        let store = MemoryStore::new();
        let gateway = PersistenceGateway::new(Arc::new(store.clone()));

        gateway.cache_forecast("42", &forecast(12.0)).await;

        assert!(store.get("forecast_42").await.expect("get").is_some());
        assert_eq!(gateway.load_cached_forecast("42").await, Some(forecast(12.0)));
        assert_eq!(gateway.load_cached_forecast("43").await, None);
    }

    #[tokio::test]
    async fn test_broken_store_is_masked() {
        let gateway = PersistenceGateway::new(Arc::new(BrokenStore));

        gateway.cache_forecast("1", &forecast(3.0)).await;
        assert_eq!(gateway.load_cached_forecast("1").await, None);
        assert_eq!(gateway.load_catalog().await, None);
        assert!(gateway.load_favorites().await.is_empty());
        assert!(gateway.load_wind_alerts().await.is_empty());
        assert_eq!(gateway.load_language().await, None);
    }

    #[tokio::test]
    async fn test_garbage_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("lighthouses", "not json").await.expect("set");
        let gateway = PersistenceGateway::new(Arc::new(store));

        assert_eq!(gateway.load_catalog().await, None);
    }

    #[tokio::test]
    async fn test_favorites_round_trip_as_json_array() {
        let store = MemoryStore::new();
        let gateway = PersistenceGateway::new(Arc::new(store.clone()));

        let ids: BTreeSet<String> = ["3".to_string(), "1".to_string()].into_iter().collect();
        gateway.save_favorites(&ids).await;

        assert_eq!(
            store.get("favoriteLighthouses").await.expect("get").as_deref(),
            Some(r#"["1","3"]"#)
        );
        assert_eq!(gateway.load_favorites().await, ids);
    }
}
