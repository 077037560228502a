use crate::lambda_event::{InboundEvent, ReplyEvent};
use crate::relay_service::RelayService;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokeError {
  #[error("unable to read event file: {0}")]
  Read(#[from] std::io::Error),
  #[error("event file is neither valid JSON nor YAML: {0}")]
  Parse(#[from] serde_yaml::Error),
  #[error("unable to render reply: {0}")]
  Render(#[from] serde_json::Error),
}

/// JSON is a subset of YAML, so one parser covers both fixture formats.
pub fn read_event(path: &Path) -> Result<InboundEvent, InvokeError> {
  let content = fs::read_to_string(path)?;
  parse_event(&content)
}

pub fn parse_event(content: &str) -> Result<InboundEvent, InvokeError> {
  Ok(serde_yaml::from_str(content)?)
}

pub fn render_reply(reply: &ReplyEvent, pretty: bool) -> Result<String, InvokeError> {
  let rendered = if pretty {
    serde_json::to_string_pretty(reply)?
  } else {
    serde_json::to_string(reply)?
  };
  Ok(rendered)
}

/// Relays the event stored at `path` once and returns the reply document.
pub fn run(relay: &RelayService, path: &Path, pretty: bool) -> Result<String, InvokeError> {
  let event = read_event(path)?;
  let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
  let reply = runtime.block_on(relay.handle(event));

  render_reply(&reply, pretty)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parses_json_event() {
    let event = parse_event(
      r#"{"requestContext":{"http":{"method":"GET","path":"/_cat/indices"}},"queryStringParameters":{"v":"true"}}"#,
    )
    .unwrap();

    assert_eq!(event.method(), Some("GET"));
    assert_eq!(event.path(), "/_cat/indices");
    assert_eq!(event.query_string_parameters["v"], "true");
  }

  #[test]
  fn parses_yaml_event() {
    let event = parse_event(
      "requestContext:\n  http:\n    method: POST\n    path: /logs/_search\nheaders:\n  content-type: application/json\nbody: eyJzaXplIjowfQ==\nisBase64Encoded: true\n",
    )
    .unwrap();

    assert_eq!(event.method(), Some("POST"));
    assert_eq!(event.headers["content-type"], "application/json");
    assert_eq!(event.body.as_deref(), Some("eyJzaXplIjowfQ=="));
    assert!(event.is_base64_encoded);
  }

  #[test]
  fn rejects_malformed_event_file() {
    assert!(matches!(parse_event("headers: [1, 2"), Err(InvokeError::Parse(_))));
  }

  #[test]
  fn renders_compact_and_pretty_replies() {
    let reply = ReplyEvent::error(400, "No HTTP method specified");

    let compact = render_reply(&reply, false).unwrap();
    assert_eq!(compact, r#"{"statusCode":400,"body":"{\"error\": \"No HTTP method specified\"}"}"#);

    let pretty = render_reply(&reply, true).unwrap();
    assert!(pretty.contains('\n'));
    assert_eq!(
      serde_json::from_str::<serde_json::Value>(&pretty).unwrap(),
      json!({ "statusCode": 400, "body": "{\"error\": \"No HTTP method specified\"}" })
    );
  }
}
