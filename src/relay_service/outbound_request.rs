use crate::lambda_event::InboundEvent;
use crate::relay_config::{credential_header, ConfigError, RelayConfig, HOST_VAR};
use crate::relay_service::RelayError;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use bytes::Bytes;
use log::warn;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use std::collections::HashMap;
use url::Url;

/// Inbound header names containing any of these are forwarded. Substring match,
/// case-sensitive: `my-content-type-extra` goes through, `Content-Type` does not.
const FORWARDED_HEADER_MARKERS: [&str; 2] = ["content-type", "cookie"];

/// Where requests go and how they authenticate.
pub struct UpstreamTarget {
  base_url: Url,
  credential: HeaderValue,
}

impl UpstreamTarget {
  pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
    let base_url = Url::parse(&config.base_url()).map_err(|err| ConfigError::Invalid {
      var: HOST_VAR,
      reason: err.to_string(),
    })?;

    Ok(Self {
      base_url,
      credential: credential_header(&config.api_key)?,
    })
  }
}

#[derive(Debug, Clone)]
pub struct OutboundRequest {
  pub method: Method,
  pub url: Url,
  pub headers: HeaderMap,
  pub query_params: Vec<(String, String)>,
  pub body: Option<Bytes>,
}

impl OutboundRequest {
  pub fn from_event(event: InboundEvent, target: &UpstreamTarget) -> Result<OutboundRequest, RelayError> {
    let method = extract_method(&event)?;
    let url = extract_url(&event, target);
    let headers = extract_headers(&event.headers, &target.credential);

    let InboundEvent {
      query_string_parameters,
      body,
      is_base64_encoded,
      ..
    } = event;

    Ok(OutboundRequest {
      method,
      url,
      headers,
      query_params: extract_query_params(query_string_parameters),
      body: extract_body(body, is_base64_encoded)?,
    })
  }
}

pub fn is_forwarded_header(name: &str) -> bool {
  FORWARDED_HEADER_MARKERS.iter().any(|marker| name.contains(marker))
}

#[inline]
fn extract_method(event: &InboundEvent) -> Result<Method, RelayError> {
  let method = event.method().ok_or(RelayError::MissingMethod)?;

  Method::from_bytes(method.to_ascii_uppercase().as_bytes())
    .map_err(|_| RelayError::InvalidMethod(method.to_string()))
}

/// The path only ever replaces the path of the configured base, so it cannot
/// change host or port. `?` and `#` inside it are percent-encoded.
#[inline]
fn extract_url(event: &InboundEvent, target: &UpstreamTarget) -> Url {
  let path = event.path();
  let mut url = target.base_url.clone();

  if path.is_empty() || path.starts_with('/') {
    url.set_path(path);
  } else {
    url.set_path(&format!("/{}", path));
  }

  url
}

#[inline]
fn extract_headers(inbound: &HashMap<String, String>, credential: &HeaderValue) -> HeaderMap {
  let mut header_map = HeaderMap::new();

  for (name, value) in inbound.iter().filter(|(name, _)| is_forwarded_header(name)) {
    match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
      (Ok(name), Ok(value)) => {
        header_map.insert(name, value);
      }
      _ => warn!("Dropping header '{}', not a valid HTTP header", name),
    }
  }

  header_map.insert(AUTHORIZATION, credential.clone());
  header_map
}

#[inline]
fn extract_query_params(query: HashMap<String, String>) -> Vec<(String, String)> {
  let mut params: Vec<(String, String)> = query.into_iter().collect();
  params.sort();
  params
}

#[inline]
fn extract_body(body: Option<String>, is_base64_encoded: bool) -> Result<Option<Bytes>, RelayError> {
  match body {
    Some(content) if is_base64_encoded => B64
      .decode(strip_ascii_whitespace(&content))
      .map(|decoded| Some(Bytes::from(decoded)))
      .map_err(RelayError::InvalidBody),
    Some(content) => Ok(Some(Bytes::from(content))),
    None => Ok(None),
  }
}

/// Wrapped base64 (MIME style line breaks) is accepted.
fn strip_ascii_whitespace(content: &str) -> Vec<u8> {
  content.bytes().filter(|byte| !byte.is_ascii_whitespace()).collect()
}
