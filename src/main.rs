mod http_client;
mod invoke;
mod lambda_event;
mod lambda_handler;
mod local_server;
mod relay_config;
mod relay_service;
mod std_logger;

use clap::{Parser, Subcommand};
use http_client::HttpClientConfig;
use local_server::ServerConfig;
use log::info;
use relay_config::RelayConfig;
use relay_service::upstream::HttpUpstream;
use relay_service::RelayService;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Relays Lambda function URL events to an Elasticsearch endpoint.
///
/// Upstream and credentials come from ELASTICSEARCH_HOST and ELASTICSEARCH_API_KEY.
#[derive(Parser)]
#[command(name = "es-lambda-relay", version, about)]
struct Cli {
  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve invocations from the AWS Lambda runtime API (default).
  Lambda,
  /// Run a local server that accepts raw events and function URL style requests.
  Serve {
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
    #[arg(long, default_value_t = 9000)]
    port: u16,
    #[arg(long, default_value_t = 4)]
    workers: usize,
    #[arg(long)]
    permissive_cors: bool,
  },
  /// Relay a single event read from a JSON or YAML file and print the reply.
  Invoke {
    #[arg(long)]
    event: PathBuf,
    #[arg(long)]
    pretty: bool,
  },
}

type BoxError = Box<dyn Error + Send + Sync>;

fn main() -> ExitCode {
  match run(Cli::parse()) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("es-lambda-relay: {}", err);
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<(), BoxError> {
  let config = RelayConfig::from_env()?;
  std_logger::init(config.log_level)?;
  info!("Relaying to {} ({:?})", config.base_url(), config);

  let relay = Arc::new(build_relay(&config)?);

  match cli.command.unwrap_or(Command::Lambda) {
    Command::Lambda => lambda_handler::run(relay),
    Command::Serve {
      bind,
      port,
      workers,
      permissive_cors,
    } => {
      let server_config = ServerConfig {
        bind,
        port,
        worker_count: workers,
        permissive_cors,
      };
      actix_web::rt::System::new().block_on(local_server::run(relay, server_config))?;
      Ok(())
    }
    Command::Invoke { event, pretty } => {
      println!("{}", invoke::run(&relay, &event, pretty)?);
      Ok(())
    }
  }
}

fn build_relay(config: &RelayConfig) -> Result<RelayService, BoxError> {
  let http_client = HttpClientConfig::from(config).to_client()?;
  let upstream = Arc::new(HttpUpstream::new(http_client));

  Ok(RelayService::new(config, upstream)?)
}
