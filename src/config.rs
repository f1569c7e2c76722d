use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_STATISTICS_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub home_dir: Option<String>,
    pub ui_store_file: PathBuf,
    pub statistics_capacity: usize,
    pub statistics_interval: Duration,
    pub watch_debounce_factor: f64,
    pub watch_debounce_min: Duration,
    pub watch_debounce_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            home_dir: None,
            ui_store_file: PathBuf::from(".t1/ui_store.json"),
            statistics_capacity: DEFAULT_STATISTICS_CAPACITY,
            statistics_interval: Duration::from_millis(2000),
            watch_debounce_factor: 2.0,
            watch_debounce_min: Duration::from_millis(100),
            watch_debounce_max: Duration::from_millis(5000),
        }
    }
}

pub fn expand_tilde(path_str: &str) -> Result<PathBuf> {
    Ok(PathBuf::from(shellexpand::tilde(path_str).as_ref()))
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid {}: {}", name, raw)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        let defaults = Config::default();

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| defaults.log_level.clone());

        let home_dir = match std::env::var("T1_HOME_DIR").ok().filter(|s| !s.is_empty()) {
            Some(dir) => Some(expand_tilde(&dir)?.to_string_lossy().into_owned()),
            None => {
                let expanded = shellexpand::tilde("~").into_owned();
                // shellexpand leaves "~" untouched when no home directory is known
                if expanded == "~" {
                    warn!("No home directory found; paths will not be shortened with '~'.");
                    None
                } else {
                    Some(expanded)
                }
            }
        };

        let ui_store_file = match std::env::var("T1_UI_STORE_FILE").ok().filter(|s| !s.is_empty()) {
            Some(path) => expand_tilde(&path)?,
            None => expand_tilde("~/.t1/ui_store.json")?,
        };

        let statistics_capacity = env_or("T1_STATISTICS_CAPACITY", defaults.statistics_capacity)?;
        if statistics_capacity == 0 {
            anyhow::bail!("T1_STATISTICS_CAPACITY must be greater than zero");
        }
        let statistics_interval = Duration::from_millis(env_or("T1_STATISTICS_INTERVAL_MS", 2000u64)?);

        let watch_debounce_factor = env_or("T1_WATCH_DEBOUNCE_FACTOR", defaults.watch_debounce_factor)?;
        if !watch_debounce_factor.is_finite() || watch_debounce_factor < 0.0 {
            anyhow::bail!("T1_WATCH_DEBOUNCE_FACTOR must be a non-negative number");
        }
        let watch_debounce_min = Duration::from_millis(env_or("T1_WATCH_DEBOUNCE_MIN_MS", 100u64)?);
        let watch_debounce_max = Duration::from_millis(env_or("T1_WATCH_DEBOUNCE_MAX_MS", 5000u64)?);
        if watch_debounce_min > watch_debounce_max {
            anyhow::bail!(
                "T1_WATCH_DEBOUNCE_MIN_MS ({:?}) exceeds T1_WATCH_DEBOUNCE_MAX_MS ({:?})",
                watch_debounce_min,
                watch_debounce_max
            );
        }

        Ok(Config {
            log_level,
            home_dir,
            ui_store_file,
            statistics_capacity,
            statistics_interval,
            watch_debounce_factor,
            watch_debounce_min,
            watch_debounce_max,
        })
    }

    /// Delay before re-resolving watcher extensions, scaled by how long the
    /// last full resolution took. The upper bound wins if the bounds cross.
    pub fn watch_debounce_for(&self, last_resolution_cost: Duration) -> Duration {
        Duration::try_from_secs_f64(last_resolution_cost.as_secs_f64() * self.watch_debounce_factor)
            .unwrap_or(self.watch_debounce_max)
            .max(self.watch_debounce_min)
            .min(self.watch_debounce_max)
    }
}
