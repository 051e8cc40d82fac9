//! Startup configuration.
//!
//! Loaded once by the binary before anything else runs, then handed into
//! [`logging::init`](crate::logging::init), the CORS policy, and the server.
//! Defaults are overridden by `STRATA_`-prefixed environment variables:
//!
//! ```text
//! STRATA_PRODUCTION=true
//! STRATA_LOG_LEVEL=warn
//! STRATA_ALLOWED_ORIGINS='["https://app.example"]'
//! STRATA_PORT=8080
//! ```

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

/// Process configuration, immutable after [`Config::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Production mode: JSON logs, no stack traces in error responses.
    pub production: bool,
    /// Log verbosity override. `None` uses the mode default
    /// (`debug` outside production, `info` in production).
    pub log_level: Option<String>,
    /// Origins allowed by the CORS policy. May contain `"*"`.
    pub allowed_origins: Vec<String>,
    /// Listening port.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            production: false,
            log_level: None,
            allowed_origins: vec!["*".to_owned()],
            port: 3000,
        }
    }
}

impl Config {
    /// Loads configuration: defaults, overridden by `STRATA_*` environment
    /// variables.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("STRATA_"))
            .extract()
    }

    /// The socket address to bind.
    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_development_friendly() {
        let config = Config::default();
        assert!(!config.production);
        assert_eq!(config.log_level, None);
        assert_eq!(config.allowed_origins, vec!["*".to_owned()]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn load_without_env_matches_defaults() {
        let config = Config::load().expect("defaults extract cleanly");
        assert_eq!(config.port, Config::default().port);
        assert_eq!(config.production, Config::default().production);
    }
}
