//! lighthouse-watch: headless driver for the lighthouse forecast store.
//!
//! Single-binary Tokio application that:
//! 1. Loads the lighthouse catalog (persisted list or bundled data)
//! 2. Refreshes forecasts from weatherapi.com on a fixed interval
//! 3. Falls back to cached forecasts when a fetch fails
//! 4. Raises wind alerts for watched lighthouses

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use common::{AppConfig, Error, ForecastResponse, ForecastSource, Lighthouse};
use lighthouse_store::{
    FileStore, Language, LighthouseStore, PersistenceGateway, Preferences, RefreshOutcome,
    StoreEvent, StoreOptions,
};
use weatherapi_client::WeatherApiClient;

/// Lighthouse forecast watcher
#[derive(Parser)]
#[command(name = "lighthouse-watch", about = "Lighthouse forecast cache and refresher")]
struct Cli {
    /// Path of the optional TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh forecasts periodically until Ctrl+C (default).
    Watch,
    /// Print the catalog, optionally filtered by name.
    List {
        #[arg(long)]
        filter: Option<String>,
        /// Only show favorites.
        #[arg(long)]
        favorites: bool,
    },
    /// Fetch and print the forecast of one lighthouse.
    Forecast {
        id: String,
        /// Print the raw forecast as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Toggle a lighthouse as favorite.
    Favorite { id: String },
    /// Set or clear the wind alert threshold (m/s) of a lighthouse.
    Alert {
        id: String,
        #[arg(required_unless_present = "clear")]
        threshold_ms: Option<f64>,
        #[arg(long, conflicts_with = "threshold_ms")]
        clear: bool,
    },
    /// Show or update user preferences.
    Settings {
        #[arg(long)]
        metric: Option<bool>,
        #[arg(long)]
        dark_map: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        language: Option<Language>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lighthouse_watch=info,lighthouse_store=info,weatherapi_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let cfg = match config::load_config(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command.unwrap_or(Command::Watch), &cfg).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, cfg: &AppConfig) -> Result<(), Error> {
    let kv = FileStore::open(&cfg.storage.data_dir).await?;
    info!("Data directory: {}", kv.dir().display());
    let persistence = PersistenceGateway::new(Arc::new(kv));

    if let Command::Settings {
        metric,
        dark_map,
        notifications,
        language,
    } = command
    {
        let prefs = Preferences::new(persistence);
        return run_settings(&prefs, metric, dark_map, notifications, language).await;
    }

    let settings = Preferences::new(persistence.clone()).settings().await;
    let source: Arc<dyn ForecastSource> = Arc::new(WeatherApiClient::from_config(cfg)?);
    let store = LighthouseStore::new(
        source,
        persistence,
        StoreOptions {
            notifications_enabled: settings.enable_notifications,
            ..StoreOptions::from(&cfg.timing)
        },
    );

    match command {
        Command::Watch => run_watch(&store).await,
        Command::List { filter, favorites } => {
            store.load_catalog().await;
            if let Some(text) = filter {
                store.set_filter(text);
            }
            let mut entries = store.filtered();
            if favorites {
                entries.retain(|lh| store.is_favorite(&lh.id));
            }
            for lh in &entries {
                println!("{}", format_lighthouse(lh, store.is_favorite(&lh.id)));
            }
            info!("{} lighthouses", entries.len());
            Ok(())
        }
        Command::Forecast { id, json } => {
            store.load_catalog().await;
            let Some(lighthouse) = store.lighthouse(&id) else {
                return Err(Error::Other(format!("unknown lighthouse {id}")));
            };
            if let Some(handle) = store.open_detail(&id) {
                let outcome = handle
                    .await
                    .map_err(|e| Error::Other(format!("refresh task failed: {e}")))?;
                if outcome == RefreshOutcome::FromCache {
                    warn!("Showing cached forecast for {}", lighthouse.name);
                }
            }
            match store.forecast(&id) {
                Some(forecast) if json => println!("{}", serde_json::to_string_pretty(&forecast)?),
                Some(forecast) => print_forecast(&lighthouse, &forecast, settings.use_metric),
                None => warn!("No forecast available for {}", lighthouse.name),
            }
            Ok(())
        }
        Command::Favorite { id } => {
            store.load_catalog().await;
            let Some(lighthouse) = store.lighthouse(&id) else {
                return Err(Error::Other(format!("unknown lighthouse {id}")));
            };
            let now_favorite = store.toggle_favorite(&id).await;
            info!(
                "{} {} favorites",
                lighthouse.name,
                if now_favorite { "added to" } else { "removed from" }
            );
            Ok(())
        }
        Command::Alert {
            id,
            threshold_ms,
            clear,
        } => {
            store.load_catalog().await;
            if clear {
                if store.clear_wind_alert(&id).await {
                    info!("Wind alert for {} cleared", id);
                } else {
                    info!("No wind alert set for {}", id);
                }
                return Ok(());
            }
            let threshold = threshold_ms
                .ok_or_else(|| Error::Other("a threshold or --clear is required".into()))?;
            if store.lighthouse(&id).is_none() {
                return Err(Error::Other(format!("unknown lighthouse {id}")));
            }
            store.set_wind_alert(&id, threshold).await?;
            info!("Wind alert for {} set at {:.1} m/s", id, threshold);
            Ok(())
        }
        Command::Settings { .. } => Ok(()),
    }
}

// ── Subcommands ─────────────────────────────────────────────────────

async fn run_watch(store: &LighthouseStore) -> Result<(), Error> {
    let mut events = store.events();
    store.init().await?;

    let event_handle = tokio::spawn({
        let store = store.clone();
        async move {
            loop {
                match events.recv().await {
                    Ok(StoreEvent::ForecastUpdated { id, origin }) => {
                        let name = store.lighthouse(&id).map(|lh| lh.name).unwrap_or(id);
                        info!(
                            "Forecast for {} updated ({:?}) at {}",
                            name,
                            origin,
                            Local::now().format("%H:%M:%S")
                        );
                    }
                    Ok(StoreEvent::WindAlert(alert)) => match serde_json::to_string(&alert) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!("Failed to encode wind alert: {}", e),
                    },
                    Err(RecvError::Lagged(n)) => warn!("Dropped {} store events", n),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    });

    // Prime every forecast instead of waiting a full interval.
    store.refresh_all().await;

    info!("Lighthouse watch is running. Press Ctrl+C to stop.");
    tokio::select! {
        r = tokio::signal::ctrl_c() => {
            if let Err(e) = r {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Shutdown signal received");
        }
        r = event_handle => {
            error!("Event task exited: {:?}", r);
        }
    }

    store.shutdown();
    info!("Lighthouse watch shut down.");
    Ok(())
}

async fn run_settings(
    prefs: &Preferences,
    metric: Option<bool>,
    dark_map: Option<bool>,
    notifications: Option<bool>,
    language: Option<Language>,
) -> Result<(), Error> {
    let mut settings = prefs.settings().await;
    let changed = metric.is_some() || dark_map.is_some() || notifications.is_some();
    if let Some(v) = metric {
        settings.use_metric = v;
    }
    if let Some(v) = dark_map {
        settings.dark_map_style = v;
    }
    if let Some(v) = notifications {
        settings.enable_notifications = v;
    }
    if changed {
        prefs.update_settings(settings).await;
    }
    if let Some(lang) = language {
        prefs.set_language(lang).await;
    }

    let locale = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_default();
    println!("metric:        {}", settings.use_metric);
    println!("dark map:      {}", settings.dark_map_style);
    println!("notifications: {}", settings.enable_notifications);
    println!("language:      {}", prefs.language(&locale).await);
    Ok(())
}

// ── Formatting ──────────────────────────────────────────────────────

fn format_lighthouse(lh: &Lighthouse, favorite: bool) -> String {
    let star = if favorite { "*" } else { " " };
    let elevation = lh
        .elevation
        .map(|m| format!(" {m:.0} m"))
        .unwrap_or_default();
    format!(
        "{star} {:>4}  {:<28} {:>8.4} {:>8.4}{elevation}",
        lh.id, lh.name, lh.lat, lh.lon
    )
}

fn print_forecast(lh: &Lighthouse, forecast: &ForecastResponse, metric: bool) {
    let temp = |c: f64| {
        if metric {
            format!("{c:.0}°C")
        } else {
            format!("{:.0}°F", c * 9.0 / 5.0 + 32.0)
        }
    };

    println!("{}", lh.name);
    if let Some(current) = &forecast.current {
        println!(
            "  now: {} (feels {}), {}, wind {:.1} m/s {}",
            temp(current.temp_c),
            temp(current.feelslike_c),
            current.condition.text,
            current.wind_ms(),
            current.wind_dir
        );
    }
    for day in &forecast.forecast.forecastday {
        println!(
            "  {}: {} / {}, {}% rain, max wind {:.1} m/s, {}",
            day.date,
            temp(day.day.maxtemp_c),
            temp(day.day.mintemp_c),
            day.day.daily_chance_of_rain,
            day.day.maxwind_kph / 3.6,
            day.day.condition.text
        );
    }
}
