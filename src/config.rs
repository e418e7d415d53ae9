use std::path::PathBuf;
use std::time::Duration;

pub const GRID_COLUMNS: usize = 5;
pub const THUMBNAIL_WIDTH: u32 = 300;
pub const THUMBNAIL_HEIGHT: u32 = 200;
pub const QUEUE_TICK: Duration = Duration::from_millis(100);

const STORE_FILE: &str = "image_paths.json";
const STORE_ENV: &str = "PICGRID_STORE";
const CACHE_CAPACITY_ENV: &str = "PICGRID_CACHE_CAPACITY";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store_path: PathBuf,
    pub thumbnail_size: (u32, u32),
    /// `None` keeps every decoded thumbnail for the lifetime of the process.
    pub cache_capacity: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: config_dir()
                .map(|d| d.join(STORE_FILE))
                .unwrap_or_else(|| PathBuf::from(STORE_FILE)),
            thumbnail_size: (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT),
            cache_capacity: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(STORE_ENV).ok(),
            std::env::var(CACHE_CAPACITY_ENV).ok(),
        )
    }

    fn from_vars(store: Option<String>, capacity: Option<String>) -> Self {
        let mut config = Config::default();
        if let Some(store) = store.filter(|s| !s.trim().is_empty()) {
            config.store_path = PathBuf::from(store.trim());
        }
        if let Some(raw) = capacity {
            match raw.trim().parse::<usize>() {
                Ok(0) => config.cache_capacity = None,
                Ok(n) => config.cache_capacity = Some(n),
                Err(e) => log::warn!("Ignoring {}={:?}: {}", CACHE_CAPACITY_ENV, raw, e),
            }
        }
        config
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|d| d.join(".picgrid"))
}
