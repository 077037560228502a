use crate::relay_service::outbound_request::OutboundRequest;
use crate::relay_service::RelayError;
use bytes::{Bytes, BytesMut};
use futures_core::future::BoxFuture;
use futures_util::StreamExt;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
  pub status: u16,
  pub headers: HeaderMap,
  pub body: Bytes,
}

/// The one outbound call a relay makes per event.
pub trait Upstream: Send + Sync {
  fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<UpstreamResponse, RelayError>>;
}

pub struct HttpUpstream {
  http_client: Client,
}

impl HttpUpstream {
  pub fn new(http_client: Client) -> Self {
    Self { http_client }
  }

  fn init_request(&self, request: OutboundRequest) -> RequestBuilder {
    let OutboundRequest {
      method,
      url,
      headers,
      query_params,
      body,
    } = request;

    let mut builder = self.http_client.request(method, url).headers(headers);

    if !query_params.is_empty() {
      builder = builder.query(&query_params);
    }

    if let Some(body) = body {
      builder = builder.body(body);
    }

    builder
  }

  async fn exec(builder: RequestBuilder) -> Result<UpstreamResponse, RelayError> {
    let response = builder.send().await.map_err(RelayError::Upstream)?;
    debug!("Proxy response {:?}", &response);

    let status = response.status().as_u16();
    let headers = response.headers().clone();

    let mut body_buffer = BytesMut::new();
    let body_stream = response.bytes_stream();
    futures_util::pin_mut!(body_stream);

    while let Some(chunk) = body_stream.next().await {
      body_buffer.extend_from_slice(&chunk.map_err(RelayError::Upstream)?);
    }

    Ok(UpstreamResponse {
      status,
      headers,
      body: body_buffer.freeze(),
    })
  }
}

impl Upstream for HttpUpstream {
  fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<UpstreamResponse, RelayError>> {
    let builder = self.init_request(request);

    Box::pin(HttpUpstream::exec(builder))
  }
}
