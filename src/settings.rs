use chrono_tz::Tz;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub debug: bool,
    pub auth_token: String,
    pub admin_token: Option<String>,
    pub enable_swagger: bool,
    pub port: u16,
    pub timezone: String,
    pub enforce_capacity: bool,
    pub strict_status_transitions: bool,
    pub calendar_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            auth_token: "default-token-change-me".to_string(),
            admin_token: None,
            enable_swagger: true,
            port: 8080,
            timezone: "UTC".to_string(),
            enforce_capacity: true,
            strict_status_transitions: true,
            calendar_title: "Gym Class Schedule".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Load from environment variables with APP_ prefix
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .set_default("debug", false)?
            .set_default("auth_token", "default-token-change-me")?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("timezone", "UTC")?
            .set_default("enforce_capacity", true)?
            .set_default("strict_status_transitions", true)?
            .set_default("calendar_title", "Gym Class Schedule")?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.time_zone()?;
        Ok(settings)
    }

    /// Zone that defines a "calendar day" for listings and exports.
    pub fn time_zone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Message(format!("unknown time zone: {}", self.timezone)))
    }
}
