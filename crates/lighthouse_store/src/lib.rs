//! Lighthouse catalog, forecast cache and refresh engine.

pub mod alerts;
pub mod catalog;
pub mod engine;
pub mod kv;
pub mod persistence;
pub mod preferences;
pub mod state;
pub mod throttle;

pub use alerts::WindAlert;
pub use engine::{LighthouseStore, RefreshOutcome, StoreEvent, StoreOptions};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use persistence::PersistenceGateway;
pub use preferences::{Language, Preferences, UserSettings};
pub use state::{DetailView, ForecastEntry, ForecastOrigin, StoreState};
pub use throttle::RefreshThrottle;
