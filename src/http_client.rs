use crate::relay_config::RelayConfig;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

pub struct HttpClientConfig {
  pub http_proxy: Option<String>,
  pub user: Option<String>,
  pub pass: Option<String>,
  pub timeout: Option<Duration>,
  pub max_redirects: usize,
}

impl HttpClientConfig {
  pub fn to_client(self) -> Result<Client, reqwest::Error> {
    let HttpClientConfig {
      http_proxy,
      user,
      pass,
      timeout,
      max_redirects,
    } = self;
    let mut client_builder = reqwest::ClientBuilder::new();

    if let Some(proxy_url) = http_proxy {
      let mut proxy = reqwest::Proxy::all(proxy_url)?;

      if let (Some(user_name), Some(password)) = (user, pass) {
        proxy = proxy.basic_auth(&user_name, &password);
      }

      client_builder = client_builder.proxy(proxy);
    }

    if let Some(timeout) = timeout {
      client_builder = client_builder.timeout(timeout);
    }

    let redirect = if max_redirects == 0 {
      Policy::none()
    } else {
      Policy::limited(max_redirects)
    };

    let client = client_builder
      .redirect(redirect)
      .gzip(true)
      .deflate(true)
      .brotli(true)
      .build()?;

    Ok(client)
  }
}

impl From<&RelayConfig> for HttpClientConfig {
  fn from(config: &RelayConfig) -> Self {
    let (http_proxy, user, pass) = match &config.egress_proxy {
      Some(proxy) => (Some(proxy.url.clone()), proxy.user.clone(), proxy.pass.clone()),
      None => (None, None, None),
    };

    HttpClientConfig {
      http_proxy,
      user,
      pass,
      timeout: config.timeout,
      max_redirects: config.max_redirects,
    }
  }
}
