use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEV_BASE_URL: &str = "http://localhost:5000/api";
pub const PROD_BASE_URL: &str = "https://karang-taruna-diy-backend.onrender.com/api";

/// Backend the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(ConfigError::Environment(other.to_owned())),
        }
    }

    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Environment::Dev => DEV_BASE_URL,
            Environment::Prod => PROD_BASE_URL,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: Url,
    /// `None` leaves requests without a client-side timeout.
    pub timeout: Option<Duration>,
}

impl ApiConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::BaseUrl` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|source| ConfigError::BaseUrl {
            value: base_url.to_owned(),
            source,
        })?;
        Ok(Self {
            base_url,
            timeout: None,
        })
    }

    /// Replace the base URL, keeping the other settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BaseUrl` if `base_url` is not an absolute URL.
    pub fn with_base_url(self, base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(base_url)?.with_timeout(self.timeout))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `DIY_API_BASE_URL`, `DIY_ENV` and `DIY_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = non_empty("DIY_ENV")
            .map(|raw| Environment::parse(&raw))
            .transpose()?
            .unwrap_or_default();
        let base_url = non_empty("DIY_API_BASE_URL")
            .unwrap_or_else(|| environment.default_base_url().to_owned());
        let timeout = non_empty("DIY_API_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::Timeout(raw))
            })
            .transpose()?;

        Ok(Self::new(&base_url)?.with_timeout(timeout))
    }

    /// Absolute URL for an API path such as `/tutorials`.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_dev_backend() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:5000/api");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn prod_environment_and_explicit_url() {
        let prod = ApiConfig::from_lookup(lookup(&[("DIY_ENV", "prod")])).unwrap();
        assert_eq!(prod.base_url.as_str(), PROD_BASE_URL);

        let custom = ApiConfig::from_lookup(lookup(&[
            ("DIY_ENV", "prod"),
            ("DIY_API_BASE_URL", "http://10.0.2.2:5000/api/"),
            ("DIY_API_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(
            custom.endpoint("/tutorials").unwrap().as_str(),
            "http://10.0.2.2:5000/api/tutorials"
        );
        assert_eq!(custom.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("DIY_ENV", "staging")])),
            Err(ConfigError::Environment(_))
        ));
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("DIY_API_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::Timeout(_))
        ));
        assert!(matches!(
            ApiConfig::new("localhost"),
            Err(ConfigError::BaseUrl { .. })
        ));
    }
}
