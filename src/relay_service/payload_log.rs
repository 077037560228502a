use crate::lambda_event::InboundEvent;
use crate::relay_config::PayloadLogPolicy;
use log::info;
use std::collections::HashMap;

const REDACTED: &str = "[redacted]";

/// Header names whose values never reach the log unless payload logging is `full`.
const SENSITIVE_HEADER_MARKERS: [&str; 4] = ["authorization", "cookie", "api-key", "token"];

pub fn is_sensitive_header(name: &str) -> bool {
  let name = name.to_ascii_lowercase();
  SENSITIVE_HEADER_MARKERS.iter().any(|marker| name.contains(marker))
}

pub fn redact_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
  headers
    .iter()
    .map(|(name, value)| {
      let value = if is_sensitive_header(name) { REDACTED } else { value.as_str() };
      (name.clone(), value.to_string())
    })
    .collect()
}

pub fn describe_event(event: &InboundEvent, policy: PayloadLogPolicy) -> String {
  match policy {
    PayloadLogPolicy::Full => to_json(event),
    PayloadLogPolicy::Redacted => {
      let mut redacted = event.clone();
      redacted.headers = redact_headers(&event.headers);
      redacted.body = event
        .body
        .as_ref()
        .map(|body| format!("[{} bytes]", body.len()));
      to_json(&redacted)
    }
    PayloadLogPolicy::Off => format!(
      "{} {}",
      event.method().unwrap_or("<no method>"),
      event.path()
    ),
  }
}

pub fn log_event(event: &InboundEvent, policy: PayloadLogPolicy) {
  info!("Event: {}", describe_event(event, policy));
}

pub fn log_response(
  encoded_body: &str,
  body_len: usize,
  headers: &HashMap<String, String>,
  policy: PayloadLogPolicy,
) {
  match policy {
    PayloadLogPolicy::Full => {
      info!("Response body: {}", encoded_body);
      info!("Response headers: {:?}", headers);
    }
    PayloadLogPolicy::Redacted => {
      info!("Response body: [{} bytes]", body_len);
      info!("Response headers: {:?}", redact_headers(headers));
    }
    PayloadLogPolicy::Off => {}
  }
}

fn to_json(event: &InboundEvent) -> String {
  serde_json::to_string(event).unwrap_or_else(|err| format!("<unprintable event: {}>", err))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn event() -> InboundEvent {
    serde_json::from_value(json!({
      "requestContext": { "http": { "method": "POST", "path": "/_security/_authenticate" } },
      "headers": {
        "authorization": "Bearer s3cr3t",
        "cookie": "sid=s3cr3t",
        "x-api-key": "s3cr3t",
        "content-type": "application/json"
      },
      "body": "{\"password\":\"s3cr3t\"}",
      "isBase64Encoded": false
    }))
    .unwrap()
  }

  #[test]
  fn recognises_sensitive_headers() {
    for name in ["Authorization", "proxy-authorization", "cookie", "set-cookie", "X-Api-Key", "x-auth-token"] {
      assert!(is_sensitive_header(name), "{}", name);
    }
    for name in ["content-type", "content-length", "x-elastic-product"] {
      assert!(!is_sensitive_header(name), "{}", name);
    }
  }

  #[test]
  fn redacted_event_hides_credentials_and_body() {
    let line = describe_event(&event(), PayloadLogPolicy::Redacted);

    assert!(!line.contains("s3cr3t"), "{}", line);
    assert!(line.contains("application/json"));
    assert!(line.contains("[redacted]"));
    assert!(line.contains("[21 bytes]"));
  }

  #[test]
  fn full_event_is_logged_verbatim() {
    let line = describe_event(&event(), PayloadLogPolicy::Full);
    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();

    assert_eq!(parsed["headers"]["authorization"], "Bearer s3cr3t");
    assert_eq!(parsed["requestContext"]["http"]["method"], "POST");
  }

  #[test]
  fn off_only_names_the_request() {
    assert_eq!(
      describe_event(&event(), PayloadLogPolicy::Off),
      "POST /_security/_authenticate"
    );
    assert_eq!(
      describe_event(&InboundEvent::default(), PayloadLogPolicy::Off),
      "<no method> "
    );
  }
}
