//! Wire shapes of the function URL / API Gateway v2 payload the relay consumes and
//! the reply it hands back to the runtime.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
  #[serde(default, deserialize_with = "null_as_default")]
  pub request_context: RequestContext,
  #[serde(default, deserialize_with = "null_as_default")]
  pub headers: HashMap<String, String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub query_string_parameters: HashMap<String, String>,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub is_base64_encoded: bool,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct RequestContext {
  #[serde(default, deserialize_with = "null_as_default")]
  pub http: HttpContext,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct HttpContext {
  #[serde(default)]
  pub method: Option<String>,
  #[serde(default)]
  pub path: Option<String>,
}

impl InboundEvent {
  /// The HTTP method, if one is present and not blank.
  pub fn method(&self) -> Option<&str> {
    self
      .request_context
      .http
      .method
      .as_deref()
      .filter(|method| !method.trim().is_empty())
  }

  pub fn path(&self) -> &str {
    self.request_context.http.path.as_deref().unwrap_or_default()
  }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEvent {
  pub status_code: u16,
  pub body: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub headers: Option<HashMap<String, String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_base64_encoded: Option<bool>,
}

impl ReplyEvent {
  pub fn encoded(status_code: u16, body: String, headers: HashMap<String, String>) -> ReplyEvent {
    ReplyEvent {
      status_code,
      body,
      headers: Some(headers),
      is_base64_encoded: Some(true),
    }
  }

  /// Bare `{statusCode, body}` reply with a `{"error": "..."}` JSON body.
  pub fn error(status_code: u16, message: &str) -> ReplyEvent {
    let message = serde_json::Value::String(message.to_string());

    ReplyEvent {
      status_code,
      body: format!("{{\"error\": {}}}", message),
      headers: None,
      is_base64_encoded: None,
    }
  }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
