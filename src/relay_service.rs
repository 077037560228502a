use crate::lambda_event::{InboundEvent, ReplyEvent};
use crate::relay_config::{ConfigError, PayloadLogPolicy, RelayConfig};
use crate::relay_service::outbound_request::{OutboundRequest, UpstreamTarget};
use crate::relay_service::upstream::Upstream;
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;

pub mod outbound_request;
pub mod payload_log;
pub mod reply_format;
pub mod upstream;

#[derive(Debug, Error)]
pub enum RelayError {
  #[error("No HTTP method specified")]
  MissingMethod,
  #[error("Invalid HTTP method: {0}")]
  InvalidMethod(String),
  #[error("Invalid base64 body")]
  InvalidBody(#[source] base64::DecodeError),
  #[error("Upstream request failed")]
  Upstream(#[source] reqwest::Error),
}

impl RelayError {
  pub fn status_code(&self) -> u16 {
    match self {
      RelayError::MissingMethod | RelayError::InvalidMethod(_) | RelayError::InvalidBody(_) => 400,
      RelayError::Upstream(_) => 502,
    }
  }

  pub fn to_reply(&self) -> ReplyEvent {
    ReplyEvent::error(self.status_code(), &self.to_string())
  }
}

/// Turns one inbound event into one upstream call and the upstream answer into a reply.
/// Holds nothing mutable, so a single instance serves every invocation.
pub struct RelayService {
  target: UpstreamTarget,
  log_payloads: PayloadLogPolicy,
  upstream: Arc<dyn Upstream>,
}

impl RelayService {
  pub fn new(config: &RelayConfig, upstream: Arc<dyn Upstream>) -> Result<Self, ConfigError> {
    Ok(Self {
      target: UpstreamTarget::from_config(config)?,
      log_payloads: config.log_payloads,
      upstream,
    })
  }

  /// Every failure ends up as a reply; nothing escapes to the runtime.
  pub async fn handle(&self, event: InboundEvent) -> ReplyEvent {
    payload_log::log_event(&event, self.log_payloads);

    match self.relay(event).await {
      Ok(reply) => reply,
      Err(err) => {
        match &err {
          RelayError::MissingMethod => error!("No HTTP method found in the event"),
          RelayError::Upstream(source) => error!("Proxy request failed {}", source),
          other => warn!("Rejecting event: {}", other),
        }
        err.to_reply()
      }
    }
  }

  async fn relay(&self, event: InboundEvent) -> Result<ReplyEvent, RelayError> {
    let request = OutboundRequest::from_event(event, &self.target)?;
    info!("Calling URL: {} {}", request.method, request.url);

    let response = self.upstream.send(request).await?;
    info!("Upstream answered {}", response.status);

    Ok(reply_format::format_response(response, self.log_payloads))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::relay_service::upstream::testing::RecordingUpstream;
  use crate::relay_service::upstream::UpstreamResponse;
  use base64::engine::general_purpose::STANDARD as B64;
  use base64::Engine as _;
  use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
  use serde_json::json;
  use std::collections::HashMap;

  fn config() -> RelayConfig {
    RelayConfig::from_map(&HashMap::from([
      ("ELASTICSEARCH_HOST", "search.example.com"),
      ("ELASTICSEARCH_API_KEY", "abc123"),
    ]))
    .unwrap()
  }

  fn relay_with(upstream: &Arc<RecordingUpstream>) -> RelayService {
    RelayService::new(&config(), upstream.clone()).unwrap()
  }

  fn event(value: serde_json::Value) -> InboundEvent {
    serde_json::from_value(value).unwrap()
  }

  #[tokio::test]
  async fn missing_method_replies_400_without_calling_upstream() {
    let upstream = Arc::new(RecordingUpstream::ok(200, HeaderMap::new(), "unused"));
    let relay = relay_with(&upstream);

    for inbound in [
      event(json!({})),
      event(json!({ "requestContext": { "http": { "path": "/_search" } } })),
      event(json!({ "requestContext": { "http": { "method": "", "path": "/_search" } } })),
    ] {
      let reply = relay.handle(inbound).await;

      assert_eq!(
        serde_json::to_value(&reply).unwrap(),
        json!({ "statusCode": 400, "body": "{\"error\": \"No HTTP method specified\"}" })
      );
    }

    assert!(upstream.requests().is_empty());
  }

  #[tokio::test]
  async fn relays_search_request_and_encodes_reply() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let upstream = Arc::new(RecordingUpstream::ok(200, headers, r#"{"hits":[]}"#));
    let relay = relay_with(&upstream);

    let reply = relay
      .handle(event(json!({
        "requestContext": { "http": { "method": "GET", "path": "/my-index/_search" } },
        "headers": { "content-type": "application/json" },
        "queryStringParameters": {},
        "body": null,
        "isBase64Encoded": false
      })))
      .await;

    assert_eq!(
      reply,
      ReplyEvent::encoded(
        200,
        B64.encode(r#"{"hits":[]}"#),
        HashMap::from([("content-type".to_string(), "application/json".to_string())]),
      )
    );

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, reqwest::Method::GET);
    assert_eq!(requests[0].url.as_str(), "https://search.example.com/my-index/_search");
    assert_eq!(requests[0].headers[AUTHORIZATION], "ApiKey abc123");
    assert_eq!(requests[0].headers[CONTENT_TYPE], "application/json");
    assert!(requests[0].body.is_none());
  }

  #[tokio::test]
  async fn decodes_base64_body_before_forwarding() {
    let upstream = Arc::new(RecordingUpstream::ok(201, HeaderMap::new(), ""));
    let relay = relay_with(&upstream);
    let payload: &[u8] = b"{\"index\":{}}\n{\"field\":\"\xc3\xa9\"}\n";

    let reply = relay
      .handle(event(json!({
        "requestContext": { "http": { "method": "POST", "path": "/_bulk" } },
        "headers": { "content-type": "application/x-ndjson" },
        "body": B64.encode(payload),
        "isBase64Encoded": true
      })))
      .await;

    assert_eq!(reply.status_code, 201);
    assert_eq!(upstream.requests()[0].body.as_deref(), Some(payload));
  }

  #[tokio::test]
  async fn passes_upstream_errors_through_and_strips_content_encoding() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    let body = r#"{"error":{"type":"index_not_found_exception"},"status":404}"#;
    let upstream = Arc::new(RecordingUpstream::ok(404, headers, body));
    let relay = relay_with(&upstream);

    let reply = relay
      .handle(event(json!({
        "requestContext": { "http": { "method": "GET", "path": "/missing/_search" } }
      })))
      .await;

    assert_eq!(reply.status_code, 404);
    assert_eq!(B64.decode(&reply.body).unwrap(), body.as_bytes());
    let reply_headers = reply.headers.unwrap();
    assert!(!reply_headers.contains_key("content-encoding"));
    assert_eq!(reply_headers["content-type"], "application/json");
    assert_eq!(reply.is_base64_encoded, Some(true));
  }

  #[tokio::test]
  async fn binary_upstream_body_survives_round_trip() {
    let bytes: Vec<u8> = (0..=255u8).rev().collect();
    let upstream = Arc::new(RecordingUpstream::new(UpstreamResponse {
      status: 200,
      headers: HeaderMap::new(),
      body: bytes.clone().into(),
    }));
    let relay = relay_with(&upstream);

    let reply = relay
      .handle(event(json!({
        "requestContext": { "http": { "method": "GET", "path": "/_snapshot/blob" } }
      })))
      .await;

    assert_eq!(B64.decode(&reply.body).unwrap(), bytes);
  }

  #[tokio::test]
  async fn invalid_base64_body_is_rejected_locally() {
    let upstream = Arc::new(RecordingUpstream::ok(200, HeaderMap::new(), ""));
    let relay = relay_with(&upstream);

    let reply = relay
      .handle(event(json!({
        "requestContext": { "http": { "method": "POST", "path": "/_search" } },
        "body": "not base64!",
        "isBase64Encoded": true
      })))
      .await;

    assert_eq!(reply, ReplyEvent::error(400, "Invalid base64 body"));
    assert!(upstream.requests().is_empty());
  }

  #[test]
  fn error_statuses() {
    assert_eq!(RelayError::MissingMethod.status_code(), 400);
    assert_eq!(RelayError::InvalidMethod("GE T".into()).status_code(), 400);
    assert_eq!(
      RelayError::InvalidMethod("GE T".into()).to_reply().body,
      "{\"error\": \"Invalid HTTP method: GE T\"}"
    );
  }
}
