//! Runtime [`Settings`], from defaults, a `.env` file and the environment.

use std::{path::PathBuf, time::Duration};

use crate::{
    client::{self, Client},
    key::{self, Key, MissingKey},
    model::InvalidModel,
    theme::ThemeFile,
    whois::Whois,
    Model,
};

/// Overrides the theme file location.
pub const THEME_PATH_VAR: &str = "EUREKA_THEME_PATH";
/// Overrides the API base URL.
pub const API_BASE_VAR: &str = "REPLICATE_API_BASE";
/// Overrides the model, as `owner/name`.
pub const MODEL_VAR: &str = "EUREKA_MODEL";
/// Overrides the WHOIS server, as `host` or `host:port`.
pub const WHOIS_SERVER_VAR: &str = "EUREKA_WHOIS_SERVER";
/// Overrides the WHOIS timeout, in seconds.
pub const WHOIS_TIMEOUT_VAR: &str = "EUREKA_WHOIS_TIMEOUT";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model is not `owner/name`.
    #[error("{var}: {error}")]
    Model {
        /// Variable holding the model.
        var: &'static str,
        /// Why it did not parse.
        error: InvalidModel,
    },
    /// A timeout is not a whole number of seconds.
    #[error("{var}: `{value}` is not a number of seconds")]
    Seconds {
        /// Variable holding the timeout.
        var: &'static str,
        /// Its value.
        value: String,
    },
}

/// Everything that can be configured.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Variable holding the API token.
    pub key_var: String,
    /// Base URL of the predictions API.
    pub api_base: String,
    /// Model to run.
    pub model: Model,
    /// Theme config file.
    pub theme_path: PathBuf,
    /// WHOIS server, `host:port`.
    pub whois_server: String,
    /// Upper bound for one WHOIS exchange.
    pub whois_timeout: Duration,
    /// Upper bound for connecting to the API.
    pub connect_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_var: key::ENV_VAR.to_string(),
            api_base: Client::DEFAULT_URL.to_string(),
            model: Model::default(),
            theme_path: PathBuf::from(ThemeFile::DEFAULT_PATH),
            whois_server: Whois::DEFAULT_SERVER.to_string(),
            whois_timeout: Whois::DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    /// Load a `.env` file if there is one, then apply overrides from the
    /// process environment.
    pub fn from_env() -> Result<Self, Error> {
        match dotenvy::dotenv() {
            Ok(_path) => {
                #[cfg(feature = "log")]
                log::debug!("Loaded {}", _path.display());
            }
            Err(_error) => {
                #[cfg(feature = "log")]
                log::debug!("No .env file loaded: {}", _error);
            }
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(THEME_PATH_VAR) {
            settings.theme_path = PathBuf::from(path);
        }
        if let Some(base) = get(API_BASE_VAR) {
            settings.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(model) = get(MODEL_VAR) {
            settings.model = model.parse().map_err(|error| Error::Model {
                var: MODEL_VAR,
                error,
            })?;
        }
        if let Some(server) = get(WHOIS_SERVER_VAR) {
            settings.whois_server = server;
        }
        if let Some(value) = get(WHOIS_TIMEOUT_VAR) {
            let seconds = value.trim().parse::<u64>().map_err(|_| {
                Error::Seconds {
                    var: WHOIS_TIMEOUT_VAR,
                    value: value.clone(),
                }
            })?;
            settings.whois_timeout = Duration::from_secs(seconds);
        }

        Ok(settings)
    }

    /// The API [`Key`] from [`Self::key_var`].
    pub fn key(&self) -> Result<Key, MissingKey> {
        Key::from_env(&self.key_var)
    }

    /// A [`Client`] using [`Self::key`].
    pub fn client(&self) -> client::Result<Client> {
        Ok(Client::from_key(self.key()?, Some(self.connect_timeout))?
            .with_base_url(self.api_base.as_str()))
    }

    /// WHOIS client for the configured server and timeout.
    pub fn whois(&self) -> Whois {
        Whois::new(self.whois_server.as_str(), self.whois_timeout)
    }

    /// Theme file at the configured path.
    pub fn theme_file(&self) -> ThemeFile {
        ThemeFile::new(&self.theme_path)
    }
}
