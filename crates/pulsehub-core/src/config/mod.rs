//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every section has usable defaults so a missing file still
//! yields a working configuration.

pub mod activity;
pub mod app;
pub mod event_bus;
pub mod logging;
pub mod presence;
pub mod session;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::activity::ActivityConfig;
use self::app::ServerConfig;
use self::event_bus::EventBusConfig;
use self::logging::LoggingConfig;
use self::presence::PresenceConfig;
use self::session::SessionConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Event bus queue settings.
    #[serde(default)]
    pub event_bus: EventBusConfig,
    /// Presence tracking settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Session tracking settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Activity broadcast policy.
    #[serde(default)]
    pub activity: ActivityConfig,
    /// Background scheduler settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PULSEHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PULSEHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allowed_origins")
                    .with_list_parse_key("activity.suppressed_actions")
                    .with_list_parse_key("activity.significant_actions")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
