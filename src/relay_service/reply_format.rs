use crate::lambda_event::ReplyEvent;
use crate::relay_config::PayloadLogPolicy;
use crate::relay_service::payload_log;
use crate::relay_service::upstream::UpstreamResponse;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, CONTENT_ENCODING};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// The body is always shipped as base64, so whatever `Content-Encoding` the
/// upstream announced no longer describes it.
pub fn format_response(response: UpstreamResponse, log_payloads: PayloadLogPolicy) -> ReplyEvent {
  let UpstreamResponse { status, headers, body } = response;

  let encoded_body = B64.encode(&body);
  let mut reply_headers = flatten_headers(&headers);
  reply_headers.retain(|name, _| !name.eq_ignore_ascii_case(CONTENT_ENCODING.as_str()));

  payload_log::log_response(&encoded_body, body.len(), &reply_headers, log_payloads);

  ReplyEvent::encoded(status, encoded_body, reply_headers)
}

/// Repeated headers collapse into one comma separated value.
pub fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
  let mut flattened: HashMap<String, String> = HashMap::with_capacity(headers.keys_len());

  for (name, value) in headers.iter() {
    let value = String::from_utf8_lossy(value.as_bytes());

    match flattened.entry(name.as_str().to_string()) {
      Entry::Occupied(mut entry) => {
        let joined = entry.get_mut();
        joined.push_str(", ");
        joined.push_str(&value);
      }
      Entry::Vacant(entry) => {
        entry.insert(value.into_owned());
      }
    }
  }

  flattened
}
