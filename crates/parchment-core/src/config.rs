use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Google Calendar caps `maxResults` per page at this value.
const GOOGLE_MAX_RESULTS: u32 = 2500;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Semicolon-joined summary of all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Google OAuth client settings
    #[serde(default)]
    pub google: GoogleConfig,

    /// Calendar widget settings
    #[serde(default)]
    pub calendar: CalendarSettings,
}

/// Google OAuth client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client ID from the Google Developer Console
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Local port for the OAuth redirect listener
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
}

fn default_callback_port() -> u16 {
    8080
}

impl GoogleConfig {
    /// Check if credentials are configured (not placeholders)
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.client_id.starts_with("YOUR_")
            && !self.client_secret.starts_with("YOUR_")
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: "YOUR_CLIENT_ID".to_string(),
            client_secret: "YOUR_CLIENT_SECRET".to_string(),
            callback_port: default_callback_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSettings {
    /// Calendar to mirror; Google accepts "primary" for the signed-in user
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// IANA zone used for date keys and displayed times
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Rows in the list view
    #[serde(default = "default_list_max_results")]
    pub list_max_results: u32,

    /// Rows in the dashboard upcoming-events list
    #[serde(default = "default_upcoming_max_results")]
    pub upcoming_max_results: u32,

    /// Events fetched for one month grid
    #[serde(default = "default_month_max_results")]
    pub month_max_results: u32,

    /// HTTP timeout for calendar requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Calendar API root (override for testing)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_list_max_results() -> u32 {
    30
}

fn default_upcoming_max_results() -> u32 {
    10
}

fn default_month_max_results() -> u32 {
    250
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            time_zone: default_time_zone(),
            list_max_results: default_list_max_results(),
            upcoming_max_results: default_upcoming_max_results(),
            month_max_results: default_month_max_results(),
            request_timeout_secs: default_request_timeout_secs(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl CalendarSettings {
    /// Parsed display time zone, UTC if the configured name is unknown.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.time_zone.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown time zone {:?}, using UTC", self.time_zone);
            chrono_tz::UTC
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parchment");

        Self {
            config_dir,
            google: GoogleConfig::default(),
            calendar: CalendarSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        let calendar = &self.calendar;

        self.validate_url(&calendar.api_base_url, "calendar.api_base_url", &mut result);

        if calendar.calendar_id.trim().is_empty() {
            result.add_error("calendar.calendar_id", "Calendar id must not be empty");
        }

        if calendar.time_zone.parse::<chrono_tz::Tz>().is_err() {
            result.add_error(
                "calendar.time_zone",
                format!("Unknown IANA time zone: {}", calendar.time_zone),
            );
        }

        for (field, value) in [
            ("calendar.list_max_results", calendar.list_max_results),
            ("calendar.upcoming_max_results", calendar.upcoming_max_results),
            ("calendar.month_max_results", calendar.month_max_results),
        ] {
            if value == 0 {
                result.add_error(field, "Must be greater than 0");
            } else if value > GOOGLE_MAX_RESULTS {
                result.add_warning(
                    field,
                    format!("Google returns at most {} events per page", GOOGLE_MAX_RESULTS),
                );
            }
        }

        if calendar.request_timeout_secs == 0 {
            result.add_error("calendar.request_timeout_secs", "Timeout must be greater than 0");
        }

        if self.google.callback_port == 0 {
            result.add_error("google.callback_port", "Port cannot be 0");
        }

        if !self.google.is_configured() {
            result.add_warning(
                "google",
                "Google OAuth not configured - the calendar will stay signed out",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("parchment");

        Ok(config_dir.join("config.toml"))
    }
}
