//! Runtime configuration.
//!
//! Settings are seeded from environment variables at startup and adjustable
//! through the settings commands. They live in memory only; the storefront
//! keeps no config files and no persisted local state.

use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use crate::api;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Floor for the catalog poll interval; anything lower hammers the backend.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;

const ENV_BACKEND_URL: &str = "CAFFERINE_BACKEND_URL";
const ENV_DEMO_MODE: &str = "CAFFERINE_DEMO_MODE";
const ENV_POLL_INTERVAL: &str = "CAFFERINE_POLL_INTERVAL_SECS";

/// A snapshot of the current settings, in the shape the frontend consumes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub backend_url: String,
    /// When enabled, order submission tolerates an unreachable backend and
    /// completes the sale locally. Off by default: a real storefront must
    /// never pretend an order was placed.
    pub demo_mode: bool,
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            demo_mode: false,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

/// Managed state holding the live settings.
#[derive(Debug, Default)]
pub struct ConfigState {
    settings: Mutex<Settings>,
}

impl ConfigState {
    /// Build the initial settings from the process environment.
    pub fn from_env() -> Self {
        let mut settings = Settings::default();

        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            let trimmed = url.trim();
            if trimmed.is_empty() {
                warn!(
                    var = ENV_BACKEND_URL,
                    default = DEFAULT_BACKEND_URL,
                    "backend URL env var is empty, using default"
                );
            } else {
                settings.backend_url = api::normalize_backend_url(trimmed);
            }
        }

        if let Ok(raw) = std::env::var(ENV_DEMO_MODE) {
            settings.demo_mode = parse_bool_flag(&raw);
            if settings.demo_mode {
                warn!("demo mode enabled: unreachable backend will not block order completion");
            }
        }

        if let Ok(raw) = std::env::var(ENV_POLL_INTERVAL) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => {
                    let clamped = secs.max(MIN_POLL_INTERVAL_SECS);
                    if clamped != secs {
                        warn!(
                            requested = secs,
                            floor = MIN_POLL_INTERVAL_SECS,
                            "catalog poll interval below floor, clamping"
                        );
                    }
                    settings.poll_interval_secs = clamped;
                }
                Err(_) => warn!(
                    var = ENV_POLL_INTERVAL,
                    value = %raw,
                    default = DEFAULT_POLL_INTERVAL_SECS,
                    "invalid poll interval, using default"
                ),
            }
        }

        info!(
            backend_url = %settings.backend_url,
            demo_mode = settings.demo_mode,
            poll_interval_secs = settings.poll_interval_secs,
            "configuration loaded"
        );

        ConfigState {
            settings: Mutex::new(settings),
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }

    pub fn backend_url(&self) -> String {
        self.settings.lock().unwrap().backend_url.clone()
    }

    pub fn demo_mode(&self) -> bool {
        self.settings.lock().unwrap().demo_mode
    }

    pub fn poll_interval(&self) -> Duration {
        let secs = self.settings.lock().unwrap().poll_interval_secs;
        Duration::from_secs(secs.max(MIN_POLL_INTERVAL_SECS))
    }

    /// Store a new backend URL and return the normalised form actually kept.
    pub fn set_backend_url(&self, url: &str) -> Result<String, String> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err("Backend URL cannot be empty".to_string());
        }
        let normalized = api::normalize_backend_url(trimmed);
        self.settings.lock().unwrap().backend_url = normalized.clone();
        info!(backend_url = %normalized, "backend URL updated");
        Ok(normalized)
    }

    pub fn set_demo_mode(&self, enabled: bool) {
        self.settings.lock().unwrap().demo_mode = enabled;
        if enabled {
            warn!("demo mode enabled: unreachable backend will not block order completion");
        } else {
            info!("demo mode disabled");
        }
    }
}

/// Accept the usual truthy spellings for env flags.
fn parse_bool_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
