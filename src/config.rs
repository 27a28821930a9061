use reqwest::Url;

use crate::env::{
    env_opt, LOGGYTO_API_KEY_ENV, LOGGYTO_API_SECRET_ENV, LOGGYTO_ENDPOINT_ENV,
    LOGGYTO_PAGE_URL_ENV,
};

/// Attribute carrying the collection endpoint URL.
pub const ENDPOINT_ATTR: &str = "data-endpoint";
/// Attribute carrying the API key.
pub const API_KEY_ATTR: &str = "data-api-key";
/// Attribute carrying the API secret.
pub const API_SECRET_ATTR: &str = "data-api-secret";

/// Raw agent configuration as read from the hosting environment.
///
/// All values are optional here; [`AgentConfig::resolve`] decides whether
/// the agent can be activated at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Base location used to resolve relative request targets. When unset,
    /// relative targets resolve against the endpoint itself.
    pub page_url: Option<String>,
}

impl AgentConfig {
    /// Read the three `data-*` attributes from an attribute list, such as the
    /// attributes of the element that loaded the agent.
    ///
    /// Unknown attributes are ignored. When an attribute occurs more than
    /// once, the last occurrence wins.
    pub fn from_attributes<I, K, V>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = AgentConfig::default();
        for (name, value) in attrs {
            match name.as_ref() {
                ENDPOINT_ATTR => config.endpoint = Some(value.into()),
                API_KEY_ATTR => config.api_key = Some(value.into()),
                API_SECRET_ATTR => config.api_secret = Some(value.into()),
                _ => {}
            }
        }
        config
    }

    /// Read configuration from the `LOGGYTO_*` environment variables.
    pub fn from_env() -> Self {
        AgentConfig {
            endpoint: env_opt(LOGGYTO_ENDPOINT_ENV),
            api_key: env_opt(LOGGYTO_API_KEY_ENV),
            api_secret: env_opt(LOGGYTO_API_SECRET_ENV),
            page_url: env_opt(LOGGYTO_PAGE_URL_ENV),
        }
    }

    /// Validate the configuration.
    ///
    /// **Returns**
    /// - `Ok(ResolvedConfig)` when endpoint, key and secret are all present,
    ///   non-empty, and the endpoint is an absolute URL.
    /// - `Err(ConfigError)` otherwise. Callers treat any error as "agent
    ///   disabled"; it is never surfaced to the host.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let endpoint = required(&self.endpoint, ENDPOINT_ATTR)?;
        let api_key = required(&self.api_key, API_KEY_ATTR)?;
        let api_secret = required(&self.api_secret, API_SECRET_ATTR)?;

        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(e.to_string()))?;

        // An unparsable page URL only loses relative resolution.
        let page_url = self
            .page_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| Url::parse(s).ok());

        Ok(ResolvedConfig {
            endpoint,
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            page_url,
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Configuration of an active agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub api_secret: String,
    pub page_url: Option<Url>,
}

/// Reasons the agent refuses to activate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required attribute `{0}`")]
    Missing(&'static str),

    #[error("collection endpoint is not an absolute URL: {0}")]
    InvalidEndpoint(String),
}
