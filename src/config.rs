//! Runtime configuration (§1 ambient-stack addition, §6 External interfaces).
//!
//! Grounded in the teacher's `runtime_config::RuntimeConfig::from_env` (env-var driven,
//! sensible defaults on parse failure) generalised from a single stack-size knob to the
//! spec's configuration surface, plus an optional YAML overlay the way `dotenvy` layers
//! a `.env` file on top of the process environment before the typed config is built.

use std::env;
use std::path::Path;

use serde::Deserialize;

/// CORS settings read from config, distinct from a constructed [`CorsMiddleware`]
/// (`crate::middleware::CorsMiddleware`) — this is just the data the application
/// wiring uses to build one.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub default_ttl_secs: Option<u64>,
}

/// Top-level application configuration (§1): names of global middleware to wire (the
/// instances themselves are registered in code, per SPEC_FULL.md §1), whether
/// validation and caching are enabled, and whether the route table is logged at
/// startup.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TurboConfig {
    #[serde(default)]
    pub global_middlewares: Vec<String>,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub validation_enabled: bool,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub disable_startup_log: bool,
}

impl TurboConfig {
    /// Load from environment variables only; `.env` (if present) is merged into the
    /// process environment first via `dotenvy`, matching the teacher's layering of
    /// environment-driven config over hardcoded defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            global_middlewares: env::var("TURBO_GLOBAL_MIDDLEWARES")
                .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
                .unwrap_or_default(),
            cors: CorsConfig {
                enabled: env_bool("TURBO_CORS_ENABLED", false),
                allowed_origins: env::var("TURBO_CORS_ALLOWED_ORIGINS")
                    .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
                    .unwrap_or_default(),
                allow_credentials: env_bool("TURBO_CORS_ALLOW_CREDENTIALS", false),
            },
            validation_enabled: env_bool("TURBO_VALIDATION_ENABLED", true),
            cache: CacheConfig {
                enabled: env_bool("TURBO_CACHE_ENABLED", false),
                default_ttl_secs: env::var("TURBO_CACHE_TTL_SECS").ok().and_then(|v| v.parse().ok()),
            },
            disable_startup_log: env_bool("TURBO_DISABLE_STARTUP_LOG", false),
        }
    }

    /// Overlay a YAML file on top of env-derived defaults. Fields absent from the file
    /// keep their env/default value (`serde(default)` on every field).
    pub fn with_yaml_overlay(mut self, path: impl AsRef<Path>) -> Result<Self, serde_yaml::Error> {
        let path = path.as_ref();
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Ok(self);
        };
        let overlay: TurboConfig = serde_yaml::from_str(&contents)?;
        if !overlay.global_middlewares.is_empty() {
            self.global_middlewares = overlay.global_middlewares;
        }
        if overlay.cors.enabled {
            self.cors = overlay.cors;
        }
        self.validation_enabled = overlay.validation_enabled || self.validation_enabled;
        if overlay.cache.enabled {
            self.cache = overlay.cache;
        }
        self.disable_startup_log = overlay.disable_startup_log || self.disable_startup_log;
        Ok(self)
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
