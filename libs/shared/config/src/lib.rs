use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Fallback average consultation length used for wait estimates until a
    /// queue has completed-session history of its own.
    pub default_service_duration_minutes: u32,
    /// Upper bound on any single store call; expiry surfaces to callers as a
    /// storage-unavailable failure.
    pub store_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORT not set or invalid, using 3000");
                    3000
                }),
            default_service_duration_minutes: env::var("DEFAULT_SERVICE_DURATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("DEFAULT_SERVICE_DURATION_MINUTES not set or invalid, using 15");
                    15
                }),
            store_timeout_ms: env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("STORE_TIMEOUT_MS not set or invalid, using 2000");
                    2000
                }),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            default_service_duration_minutes: 15,
            store_timeout_ms: 2000,
        }
    }
}
