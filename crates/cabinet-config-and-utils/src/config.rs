//! Client configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default backend URL (can be overridden at compile time via CABINET_API_BASE_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("CABINET_API_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:8080",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Storage key holding the bearer token.
pub const DEFAULT_TOKEN_KEY: &str = "authToken";

/// Route a full navigation lands on after logout.
pub const DEFAULT_LANDING_ROUTE: &str = "/";

/// Route unauthenticated users are sent to.
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Route users without the required role are sent to.
pub const DEFAULT_HOME_ROUTE: &str = "/";

const ENV_LOG_LEVEL: &str = "CABINET_LOG_LEVEL";
const ENV_API_BASE_URL: &str = "CABINET_API_BASE_URL";

/// Main client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Base URL of the backend REST API.
    pub api_base_url: String,
    /// Storage key under which the bearer token is persisted.
    pub token_key: String,
    /// Target of the full navigation performed by logout.
    pub landing_route: String,
    /// Redirect target for unauthenticated users.
    pub login_route: String,
    /// Redirect target for authenticated users lacking a role.
    pub home_route: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            home_route: DEFAULT_HOME_ROUTE.to_string(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
    }

    /// Reject configurations the client cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;

        if self.token_key.trim().is_empty() {
            return Err(CoreError::Config("token_key must not be empty".to_string()));
        }

        for (name, route) in [
            ("landing_route", &self.landing_route),
            ("login_route", &self.login_route),
            ("home_route", &self.home_route),
        ] {
            if !route.starts_with('/') {
                return Err(CoreError::Config(format!(
                    "{} must be an absolute path, got {:?}",
                    name, route
                )));
            }
        }

        Ok(())
    }

    /// Get the backend URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }
}
