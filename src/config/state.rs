// Application state module
// Shared, read-only state handed to every connection task

use std::sync::atomic::{AtomicBool, Ordering};

use super::types::Config;
use crate::fetch::FetchClient;

/// Application state
///
/// Built once at startup. Nothing in here is mutated by request handling
/// except the cached access-log switch.
pub struct AppState {
    pub config: Config,
    pub fetcher: FetchClient,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let fetcher = FetchClient::new(&config.fetch)?;
        let cached_access_log = AtomicBool::new(config.logging.access_log);

        Ok(Self {
            config,
            fetcher,
            cached_access_log,
        })
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}
