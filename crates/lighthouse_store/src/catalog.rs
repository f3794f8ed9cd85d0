//! Lighthouse catalog loading.
//!
//! The catalog comes from the persisted `lighthouses` key when present,
//! otherwise from the list bundled into the binary. Loading never fails.

use common::{Lighthouse, LighthouseRecord};
use tracing::{info, warn};

use crate::persistence::PersistenceGateway;

const BUNDLED_LIGHTHOUSES: &str = include_str!("../data/lighthouses.json");

/// The lighthouse list shipped with the binary, in external field naming.
pub fn bundled_records() -> Vec<LighthouseRecord> {
    match serde_json::from_str(BUNDLED_LIGHTHOUSES) {
        Ok(records) => records,
        Err(e) => {
            warn!("Bundled lighthouse list is invalid: {}", e);
            Vec::new()
        }
    }
}

/// Convert records to catalog entries, preserving order.
pub fn to_catalog(records: Vec<LighthouseRecord>) -> Vec<Lighthouse> {
    records.into_iter().map(Lighthouse::from).collect()
}

/// Load the catalog: persisted list first, bundled defaults otherwise.
pub async fn load(persistence: &PersistenceGateway) -> Vec<Lighthouse> {
    let records = match persistence.load_catalog().await {
        Some(records) => {
            info!("Loaded {} lighthouses from storage", records.len());
            records
        }
        None => {
            let records = bundled_records();
            info!("Using {} bundled lighthouses", records.len());
            records
        }
    };

    to_catalog(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KeyValueStore, MemoryStore};
    use crate::persistence::tests::BrokenStore;
    use std::sync::Arc;

    #[test]
    fn test_bundled_list_parses_and_converts() {
        let catalog = to_catalog(bundled_records());
        assert!(!catalog.is_empty());
        assert_eq!(catalog[0].id, "1");
        assert_eq!(catalog[0].name, "Lista fyr");

        let unplotted = catalog
            .iter()
            .find(|lh| lh.name == "Unplotted beacon")
            .expect("entry without position");
        assert_eq!((unplotted.lat, unplotted.lon), (0.0, 0.0));
        assert_eq!(unplotted.elevation, None);
        assert_eq!(unplotted.description, "");
    }

    #[tokio::test]
    async fn test_persisted_list_overrides_bundled() {
        let store = MemoryStore::new();
        store
            .set(
                "lighthouses",
                r#"[{"Id": 1, "Name": "Lista", "Description": "x", "Latitude": 58.1, "Longitude": 6.6, "Elevation": 12.5}]"#,
            )
            .await
            .expect("set");
        let gateway = PersistenceGateway::new(Arc::new(store));

        let catalog = load(&gateway).await;
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "Lista");
        assert_eq!(catalog[0].elevation, Some(12.5));
    }

    #[tokio::test]
    async fn test_storage_failure_falls_back_to_bundled() {
        let gateway = PersistenceGateway::new(Arc::new(BrokenStore));

        let catalog = load(&gateway).await;
        assert_eq!(catalog, to_catalog(bundled_records()));
    }
}
