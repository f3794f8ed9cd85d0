//! Forecast cache & refresh engine.
//!
//! Owns the catalog, the latest forecast per lighthouse and the UI
//! selection state. Forecasts are fetched on demand (detail view), in bulk
//! on a fixed interval, or through a per-lighthouse throttle. A failed
//! fetch falls back to the persisted copy so known data is never blanked.
//!
//! Two refreshes of the same id are not serialized: whichever completes
//! last wins.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use common::config::TimingConfig;
use common::{Error, ForecastResponse, ForecastSource, Lighthouse, Result};
use futures_util::future::join_all;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::alerts::{self, WindAlert};
use crate::catalog;
use crate::persistence::PersistenceGateway;
use crate::state::{DetailView, ForecastEntry, ForecastOrigin, StoreState};
use crate::throttle::RefreshThrottle;

const EVENT_CAPACITY: usize = 64;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Period of the bulk refresh armed by [`LighthouseStore::init`].
    pub refresh_interval: Duration,
    /// Window of [`LighthouseStore::refresh_one_throttled`], per lighthouse.
    pub throttle_window: Duration,
    pub notifications_enabled: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30 * 60),
            throttle_window: Duration::from_secs(60),
            notifications_enabled: true,
        }
    }
}

impl From<&TimingConfig> for StoreOptions {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            refresh_interval: Duration::from_secs(timing.refresh_interval_secs),
            throttle_window: Duration::from_secs(timing.throttle_window_secs),
            ..Self::default()
        }
    }
}

/// Result of a single refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fetched, cached and installed.
    Fetched,
    /// Fetch failed; the persisted copy was installed.
    FromCache,
    /// Fetch failed and nothing was cached; the entry is as it was.
    Unchanged,
    /// No lighthouse with that id in the catalog.
    UnknownLighthouse,
}

/// Notifications that are not visible as state.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ForecastUpdated { id: String, origin: ForecastOrigin },
    WindAlert(WindAlert),
}

/// Handle to the store. Clones share the same state.
///
/// Construct one per process and hand clones to whoever needs them.
#[derive(Clone)]
pub struct LighthouseStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<StoreState>,
    events: broadcast::Sender<StoreEvent>,
    source: Arc<dyn ForecastSource>,
    persistence: PersistenceGateway,
    throttle: RefreshThrottle,
    refresh_interval: Duration,
    initialized: AtomicBool,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    /// Held from a favorites/alerts mutation until its snapshot is saved.
    save_lock: tokio::sync::Mutex<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = self
            .refresh_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl LighthouseStore {
    pub fn new(
        source: Arc<dyn ForecastSource>,
        persistence: PersistenceGateway,
        options: StoreOptions,
    ) -> Self {
        let (state, _) = watch::channel(StoreState {
            notifications_enabled: options.notifications_enabled,
            ..StoreState::default()
        });
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                state,
                events,
                source,
                persistence,
                throttle: RefreshThrottle::new(options.throttle_window),
                refresh_interval: options.refresh_interval,
                initialized: AtomicBool::new(false),
                refresh_task: Mutex::new(None),
                save_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Receiver of state snapshots; notified after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Run `f` against the current state without cloning it.
    ///
    /// `f` must not call back into the store.
    pub fn with_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub fn filtered(&self) -> Vec<Lighthouse> {
        self.with_state(|s| s.filtered().into_iter().cloned().collect())
    }

    pub fn favorites(&self) -> Vec<Lighthouse> {
        self.with_state(|s| s.favorites().into_iter().cloned().collect())
    }

    pub fn lighthouse(&self, id: &str) -> Option<Lighthouse> {
        self.with_state(|s| s.lighthouse(id).cloned())
    }

    pub fn forecast(&self, id: &str) -> Option<ForecastResponse> {
        self.with_state(|s| s.forecast(id).cloned())
    }

    pub fn filter(&self) -> String {
        self.with_state(|s| s.filter.clone())
    }

    pub fn detail_id(&self) -> Option<String> {
        self.with_state(|s| s.detail.id().map(str::to_string))
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.with_state(|s| s.favorites.contains(id))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load the catalog plus persisted favorites and wind alerts.
    ///
    /// Returns the catalog size. Does not arm the refresh timer.
    pub async fn load_catalog(&self) -> usize {
        let catalog = catalog::load(&self.inner.persistence).await;
        let favorites = self.inner.persistence.load_favorites().await;
        let wind_alerts = self.inner.persistence.load_wind_alerts().await;
        let count = catalog.len();

        self.inner.state.send_modify(|s| {
            s.catalog = catalog;
            s.favorites = favorites;
            s.wind_alerts = wind_alerts;
        });

        count
    }

    /// Load the catalog and arm the periodic bulk refresh.
    ///
    /// May be called once per store; later calls return
    /// [`Error::AlreadyInitialized`] and leave the running timer alone.
    pub async fn init(&self) -> Result<()> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        let count = self.load_catalog().await;

        let period = self.inner.refresh_interval;
        if period.is_zero() {
            warn!("Refresh interval is zero; periodic refresh disabled");
            return Ok(());
        }

        let handle = spawn_refresh_loop(Arc::downgrade(&self.inner), period);
        *self.refresh_slot() = Some(handle);

        info!(
            "Store initialized with {} lighthouses; refreshing every {:?}",
            count, period
        );
        Ok(())
    }

    /// Cancel the periodic refresh. In-flight fetches are not cancelled.
    pub fn shutdown(&self) {
        if let Some(handle) = self.refresh_slot().take() {
            handle.abort();
            info!("Periodic refresh stopped");
        }
    }

    fn refresh_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Fetch and install the forecast for `id` right away.
    pub async fn refresh_one(&self, id: &str) -> RefreshOutcome {
        let Some(lighthouse) = self.lighthouse(id) else {
            debug!("Refresh skipped: unknown lighthouse {}", id);
            return RefreshOutcome::UnknownLighthouse;
        };

        let fetched = self
            .inner
            .source
            .fetch_forecast(lighthouse.lat, lighthouse.lon, Some(&lighthouse.name))
            .await;

        match fetched {
            Ok(forecast) => {
                self.inner.persistence.cache_forecast(id, &forecast).await;
                let alert = self.wind_alert_for(&lighthouse, &forecast);
                self.install(id, forecast, ForecastOrigin::Fetched);

                if let Some(alert) = alert {
                    warn!(
                        "High wind at {}: {:.1} m/s (threshold {:.1} m/s)",
                        alert.name, alert.wind_speed_ms, alert.threshold_ms
                    );
                    let _ = self.inner.events.send(StoreEvent::WindAlert(alert));
                }
                RefreshOutcome::Fetched
            }
            Err(e) => {
                warn!("Error refreshing forecast for lighthouse {}: {}", id, e);
                match self.inner.persistence.load_cached_forecast(id).await {
                    Some(cached) => {
                        debug!("Using cached forecast for lighthouse {}", id);
                        self.install(id, cached, ForecastOrigin::Cache);
                        RefreshOutcome::FromCache
                    }
                    None => RefreshOutcome::Unchanged,
                }
            }
        }
    }

    /// Like [`refresh_one`](Self::refresh_one), but at most once per id per
    /// throttle window. Returns `None` when the call was dropped.
    ///
    /// Unknown ids never take a throttle slot.
    pub async fn refresh_one_throttled(&self, id: &str) -> Option<RefreshOutcome> {
        if self.lighthouse(id).is_none() {
            debug!("Throttled refresh skipped: unknown lighthouse {}", id);
            return Some(RefreshOutcome::UnknownLighthouse);
        }
        if !self.inner.throttle.try_acquire(id) {
            debug!(
                "Throttled refresh for lighthouse {} (window {:?})",
                id,
                self.inner.throttle.window()
            );
            return None;
        }
        Some(self.refresh_one(id).await)
    }

    /// Refresh every catalog entry concurrently.
    pub async fn refresh_all(&self) -> Vec<(String, RefreshOutcome)> {
        let ids: Vec<String> =
            self.with_state(|s| s.catalog.iter().map(|lh| lh.id.clone()).collect());
        info!("Refreshing forecasts for {} lighthouses", ids.len());

        let outcomes = join_all(ids.iter().map(|id| self.refresh_one(id))).await;
        ids.into_iter().zip(outcomes).collect()
    }

    fn install(&self, id: &str, forecast: ForecastResponse, origin: ForecastOrigin) {
        self.inner.state.send_modify(|s| {
            s.forecasts.insert(
                id.to_string(),
                ForecastEntry {
                    forecast,
                    origin,
                    updated_at: Utc::now(),
                },
            );
        });
        let _ = self.inner.events.send(StoreEvent::ForecastUpdated {
            id: id.to_string(),
            origin,
        });
    }

    fn wind_alert_for(&self, lighthouse: &Lighthouse, forecast: &ForecastResponse) -> Option<WindAlert> {
        let threshold = self.with_state(|s| {
            if s.notifications_enabled {
                s.wind_alerts.get(&lighthouse.id).copied()
            } else {
                None
            }
        })?;
        alerts::evaluate(lighthouse, forecast, threshold)
    }

    // ── UI state ─────────────────────────────────────────────────────

    /// Open the detail view for `id`, or close it with an empty id.
    ///
    /// Opening a lighthouse other than the one already open spawns an
    /// unthrottled refresh and returns its handle.
    pub fn open_detail(&self, id: &str) -> Option<JoinHandle<RefreshOutcome>> {
        let mut opened = false;
        self.inner.state.send_if_modified(|s| {
            if id.is_empty() {
                let was_open = s.detail != DetailView::Closed;
                s.detail = DetailView::Closed;
                return was_open;
            }
            if s.detail.is_open(id) {
                return false;
            }
            s.detail = DetailView::Open(id.to_string());
            opened = true;
            true
        });

        if !opened {
            return None;
        }

        let store = self.clone();
        let id = id.to_string();
        Some(tokio::spawn(async move { store.refresh_one(&id).await }))
    }

    /// Replace the filter text verbatim.
    pub fn set_filter(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.state.send_if_modified(|s| {
            if s.filter == text {
                false
            } else {
                s.filter = text;
                true
            }
        });
    }

    // ── Favorites & alerts ───────────────────────────────────────────

    /// Flip favorite status for `id` and persist; returns the new status.
    pub async fn toggle_favorite(&self, id: &str) -> bool {
        let _saving = self.inner.save_lock.lock().await;
        let mut now_favorite = false;
        let mut favorites = BTreeSet::new();
        self.inner.state.send_modify(|s| {
            now_favorite = if s.favorites.remove(id) {
                false
            } else {
                s.favorites.insert(id.to_string());
                true
            };
            favorites = s.favorites.clone();
        });

        self.inner.persistence.save_favorites(&favorites).await;
        now_favorite
    }

    /// Watch `id` for current wind at or above `threshold_ms`.
    pub async fn set_wind_alert(&self, id: &str, threshold_ms: f64) -> Result<()> {
        if !threshold_ms.is_finite() || threshold_ms < 0.0 {
            return Err(Error::Other(format!(
                "wind alert threshold must be a non-negative number, got {threshold_ms}"
            )));
        }

        let _saving = self.inner.save_lock.lock().await;
        let alerts = self.update_wind_alerts(|alerts| {
            alerts.insert(id.to_string(), threshold_ms);
        });
        self.inner.persistence.save_wind_alerts(&alerts).await;
        Ok(())
    }

    /// Stop watching `id`; returns whether an alert was set.
    pub async fn clear_wind_alert(&self, id: &str) -> bool {
        let _saving = self.inner.save_lock.lock().await;
        let mut removed = false;
        let alerts = self.update_wind_alerts(|alerts| {
            removed = alerts.remove(id).is_some();
        });
        if removed {
            self.inner.persistence.save_wind_alerts(&alerts).await;
        }
        removed
    }

    fn update_wind_alerts(&self, f: impl FnOnce(&mut HashMap<String, f64>)) -> HashMap<String, f64> {
        let mut snapshot = HashMap::new();
        self.inner.state.send_modify(|s| {
            f(&mut s.wind_alerts);
            snapshot = s.wind_alerts.clone();
        });
        snapshot
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.inner.state.send_if_modified(|s| {
            let changed = s.notifications_enabled != enabled;
            s.notifications_enabled = enabled;
            changed
        });
    }
}

fn spawn_refresh_loop(inner: Weak<Inner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            LighthouseStore { inner }.refresh_all().await;
        }
    })
}
