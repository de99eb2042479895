//! Configuration, paths, and logging setup for the cabinet client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_HOME_ROUTE, DEFAULT_LANDING_ROUTE, DEFAULT_LOGIN_ROUTE,
    DEFAULT_LOG_LEVEL, DEFAULT_TOKEN_KEY,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
