//! Local stand-in for the Lambda platform.
//!
//! Serves two surfaces over one relay:
//! - `POST /2015-03-31/functions/function/invocations` takes a raw event document and
//!   answers with the reply document, like the runtime interface emulator.
//! - every other request is treated like a function URL call: it is turned into an
//!   event, relayed, and the reply is written back as a plain HTTP response.

use crate::lambda_event::{HttpContext, InboundEvent, ReplyEvent, RequestContext};
use crate::relay_service::RelayService;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::Condition;
use actix_web::web::{self, Query};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;

pub const INVOKE_PATH: &str = "/2015-03-31/functions/function/invocations";

/// Matches the synchronous invocation payload limit of the platform.
const MAX_PAYLOAD_BYTES: usize = 6 * 1024 * 1024;

/// Headers the HTTP layer here sets itself.
const SKIPPED_REPLY_HEADERS: [&str; 3] = ["content-length", "transfer-encoding", "connection"];

pub struct ServerConfig {
  pub bind: String,
  pub port: u16,
  pub worker_count: usize,
  pub permissive_cors: bool,
}

pub async fn run(relay: Arc<RelayService>, config: ServerConfig) -> std::io::Result<()> {
  let ServerConfig {
    bind,
    port,
    worker_count,
    permissive_cors,
  } = config;
  let relay = web::Data::from(relay);

  info!("Local relay listening on http://{}:{}", &bind, port);
  info!("Raw events are accepted at 'POST {}'.", INVOKE_PATH);

  HttpServer::new(move || {
    App::new()
      .wrap(Condition::new(permissive_cors, Cors::permissive()))
      .app_data(relay.clone())
      .configure(configure_routes)
  })
  .workers(worker_count)
  .bind((bind, port))?
  .run()
  .await
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().limit(MAX_PAYLOAD_BYTES))
    .app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
    .route(INVOKE_PATH, web::post().to(invoke_handler))
    .route("/{tail:.*}", web::route().to(function_url_handler));
}

async fn invoke_handler(relay: web::Data<RelayService>, event: web::Json<InboundEvent>) -> HttpResponse {
  let reply = relay.handle(event.into_inner()).await;
  HttpResponse::Ok().json(reply)
}

async fn function_url_handler(relay: web::Data<RelayService>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
  let event = event_from_request(&req, &body);
  let reply = relay.handle(event).await;
  response_from_reply(reply)
}

/// Builds the event the platform would have delivered for this request.
pub fn event_from_request(req: &HttpRequest, body: &[u8]) -> InboundEvent {
  let mut headers: HashMap<String, String> = HashMap::new();

  for (name, value) in req.headers().iter() {
    let value = String::from_utf8_lossy(value.as_bytes());
    headers
      .entry(name.as_str().to_string())
      .and_modify(|joined| {
        joined.push(',');
        joined.push_str(&value);
      })
      .or_insert_with(|| value.to_string());
  }

  let query_string_parameters = match Query::<HashMap<String, String>>::from_query(req.query_string()) {
    Ok(query_params) => query_params.into_inner(),
    Err(err) => {
      error!("Unable to parse query parameters {}", err);
      HashMap::new()
    }
  };

  let (body, is_base64_encoded) = if body.is_empty() {
    (None, false)
  } else {
    (Some(B64.encode(body)), true)
  };

  InboundEvent {
    request_context: RequestContext {
      http: HttpContext {
        method: Some(req.method().to_string()),
        path: Some(req.path().to_string()),
      },
    },
    headers,
    query_string_parameters,
    body,
    is_base64_encoded,
  }
}

/// Writes a reply back the way a function URL would: status, headers, decoded body.
pub fn response_from_reply(reply: ReplyEvent) -> HttpResponse {
  let ReplyEvent {
    status_code,
    body,
    headers,
    is_base64_encoded,
  } = reply;

  let body = if is_base64_encoded.unwrap_or(false) {
    match B64.decode(body.as_bytes()) {
      Ok(bytes) => bytes,
      Err(err) => {
        error!("Reply body is not valid base64 {}", err);
        return HttpResponse::BadGateway().finish();
      }
    }
  } else {
    body.into_bytes()
  };

  let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_GATEWAY);
  let mut response = HttpResponse::build(status);

  match headers {
    Some(headers) => {
      for (name, value) in headers.iter() {
        if !SKIPPED_REPLY_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
          response.append_header((name.as_str(), value.as_str()));
        }
      }
    }
    None => {
      response.content_type("application/json");
    }
  }

  response.body(body)
}
