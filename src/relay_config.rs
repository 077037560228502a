use log::LevelFilter;
use reqwest::header::HeaderValue;
use std::env;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const HOST_VAR: &str = "ELASTICSEARCH_HOST";
pub const API_KEY_VAR: &str = "ELASTICSEARCH_API_KEY";
pub const SCHEME_VAR: &str = "ELASTICSEARCH_SCHEME";
pub const TIMEOUT_VAR: &str = "ELASTICSEARCH_TIMEOUT_SECS";
pub const PROXY_URL_VAR: &str = "RELAY_PROXY_URL";
pub const PROXY_USER_VAR: &str = "RELAY_PROXY_USER";
pub const PROXY_PASS_VAR: &str = "RELAY_PROXY_PASS";
pub const MAX_REDIRECTS_VAR: &str = "RELAY_MAX_REDIRECTS";
pub const LOG_LEVEL_VAR: &str = "RELAY_LOG_LEVEL";
pub const LOG_PAYLOADS_VAR: &str = "RELAY_LOG_PAYLOADS";

const DEFAULT_MAX_REDIRECTS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("{0} is not set")]
  Missing(&'static str),
  #[error("{var} is invalid: {reason}")]
  Invalid { var: &'static str, reason: String },
}

#[derive(PartialEq, Debug, Clone, Copy, Eq, Default)]
pub enum UpstreamScheme {
  #[default]
  Https,
  Http,
}

/// How much of events, bodies and headers ends up in the log.
#[derive(PartialEq, Debug, Clone, Copy, Eq, Default)]
pub enum PayloadLogPolicy {
  Full,
  #[default]
  Redacted,
  Off,
}

#[derive(PartialEq, Debug, Clone)]
pub struct EgressProxy {
  pub url: String,
  pub user: Option<String>,
  pub pass: Option<String>,
}

/// Process-wide settings, read once at start and never mutated.
#[derive(Clone)]
pub struct RelayConfig {
  pub host: String,
  pub api_key: String,
  pub scheme: UpstreamScheme,
  pub timeout: Option<Duration>,
  pub egress_proxy: Option<EgressProxy>,
  pub max_redirects: usize,
  pub log_level: LevelFilter,
  pub log_payloads: PayloadLogPolicy,
}

impl RelayConfig {
  pub fn from_env() -> Result<RelayConfig, ConfigError> {
    RelayConfig::from_lookup(|name| env::var(name).ok())
  }

  #[cfg(test)]
  pub fn from_map(values: &std::collections::HashMap<&str, &str>) -> Result<RelayConfig, ConfigError> {
    RelayConfig::from_lookup(|name| values.get(name).map(|value| value.to_string()))
  }

  /// Builds and validates the configuration from any variable source.
  /// Empty values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<RelayConfig, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let scheme = match read(SCHEME_VAR) {
      Some(value) => UpstreamScheme::from_str(&value).map_err(|_| ConfigError::Invalid {
        var: SCHEME_VAR,
        reason: format!("expected 'https' or 'http', got '{}'", value),
      })?,
      None => UpstreamScheme::default(),
    };

    let host = read(HOST_VAR).ok_or(ConfigError::Missing(HOST_VAR))?;
    let host = validate_host(host.trim(), scheme)?;

    let api_key = read(API_KEY_VAR).ok_or(ConfigError::Missing(API_KEY_VAR))?;
    credential_header(&api_key)?;

    let timeout = read(TIMEOUT_VAR)
      .map(|value| match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid {
          var: TIMEOUT_VAR,
          reason: format!("expected a positive number of seconds, got '{}'", value),
        }),
      })
      .transpose()?;

    let egress_proxy = match (read(PROXY_URL_VAR), read(PROXY_USER_VAR), read(PROXY_PASS_VAR)) {
      (Some(url), user, pass) => {
        if user.is_some() != pass.is_some() {
          return Err(ConfigError::Invalid {
            var: PROXY_USER_VAR,
            reason: format!("{} and {} must be set together", PROXY_USER_VAR, PROXY_PASS_VAR),
          });
        }
        Some(EgressProxy { url, user, pass })
      }
      (None, None, None) => None,
      (None, _, _) => {
        return Err(ConfigError::Invalid {
          var: PROXY_URL_VAR,
          reason: "proxy credentials given without a proxy url".into(),
        })
      }
    };

    let max_redirects = read(MAX_REDIRECTS_VAR)
      .map(|value| {
        value.trim().parse::<usize>().map_err(|err| ConfigError::Invalid {
          var: MAX_REDIRECTS_VAR,
          reason: err.to_string(),
        })
      })
      .transpose()?
      .unwrap_or(DEFAULT_MAX_REDIRECTS);

    let log_level = read(LOG_LEVEL_VAR)
      .map(|value| {
        LevelFilter::from_str(value.trim()).map_err(|err| ConfigError::Invalid {
          var: LOG_LEVEL_VAR,
          reason: err.to_string(),
        })
      })
      .transpose()?
      .unwrap_or(LevelFilter::Info);

    let log_payloads = match read(LOG_PAYLOADS_VAR) {
      Some(value) => PayloadLogPolicy::from_str(&value).map_err(|_| ConfigError::Invalid {
        var: LOG_PAYLOADS_VAR,
        reason: format!("expected 'full', 'redacted' or 'off', got '{}'", value),
      })?,
      None => PayloadLogPolicy::default(),
    };

    Ok(RelayConfig {
      host,
      api_key,
      scheme,
      timeout,
      egress_proxy,
      max_redirects,
      log_level,
      log_payloads,
    })
  }

  pub fn base_url(&self) -> String {
    format!("{}://{}", self.scheme, self.host)
  }
}

impl Debug for RelayConfig {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RelayConfig")
      .field("host", &self.host)
      .field("api_key", &"[redacted]")
      .field("scheme", &self.scheme)
      .field("timeout", &self.timeout)
      .field("egress_proxy", &self.egress_proxy.as_ref().map(|proxy| &proxy.url))
      .field("max_redirects", &self.max_redirects)
      .field("log_level", &self.log_level)
      .field("log_payloads", &self.log_payloads)
      .finish()
  }
}

/// `Authorization: ApiKey <key>`, marked sensitive so it never shows up in debug output.
pub fn credential_header(api_key: &str) -> Result<HeaderValue, ConfigError> {
  let mut value = HeaderValue::try_from(format!("ApiKey {}", api_key)).map_err(|_| ConfigError::Invalid {
    var: API_KEY_VAR,
    reason: "contains characters not allowed in an HTTP header".into(),
  })?;
  value.set_sensitive(true);
  Ok(value)
}

fn validate_host(host: &str, scheme: UpstreamScheme) -> Result<String, ConfigError> {
  let invalid = |reason: &str| ConfigError::Invalid {
    var: HOST_VAR,
    reason: format!("'{}' {}", host, reason),
  };

  if host.contains("://") {
    return Err(invalid("must not include a scheme"));
  }

  if host.contains(['/', '?', '#']) || host.chars().any(char::is_whitespace) {
    return Err(invalid("must be a bare host name with an optional port"));
  }

  match Url::parse(&format!("{}://{}", scheme, host)) {
    Ok(url) if url.host_str().is_some() => Ok(host.to_string()),
    _ => Err(invalid("is not a valid host")),
  }
}

impl FromStr for UpstreamScheme {
  type Err = ();

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_lowercase().as_str() {
      "https" => Ok(UpstreamScheme::Https),
      "http" => Ok(UpstreamScheme::Http),
      _ => Err(()),
    }
  }
}

impl Display for UpstreamScheme {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      UpstreamScheme::Https => f.write_str("https"),
      UpstreamScheme::Http => f.write_str("http"),
    }
  }
}

impl FromStr for PayloadLogPolicy {
  type Err = ();

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_lowercase().as_str() {
      "full" => Ok(PayloadLogPolicy::Full),
      "redacted" => Ok(PayloadLogPolicy::Redacted),
      "off" => Ok(PayloadLogPolicy::Off),
      _ => Err(()),
    }
  }
}
