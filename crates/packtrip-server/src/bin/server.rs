//! packtrip server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, wires up the external services, and serves the
//! JSON API and realtime channel over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use packtrip_engine::{Engine, EngineConfig, Hub, Services};
use packtrip_server::{AppState, ServerConfig, seed::seed_demo};
use packtrip_services::{
  GetImgClient, HttpTravelSearch, OpenAiClassifier, OpenAiClient, PlannerClient,
};
use packtrip_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Generous bound reflecting genuine LLM latency on itinerary generation.
const PLANNER_TIMEOUT: Duration = Duration::from_secs(200);
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(author, version, about = "PackTrip group trip-planning server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PACKTRIP"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  if server_cfg.seed_demo {
    seed_demo(store.as_ref()).await.context("failed to seed demo data")?;
  }

  // Wire up the external services.
  let openai = Arc::new(
    OpenAiClient::new(
      &server_cfg.openai_base_url,
      &server_cfg.openai_api_key,
      &server_cfg.openai_model,
      CHAT_TIMEOUT,
    )
    .context("failed to build OpenAI client")?,
  );
  let services = Services {
    classifier: Arc::new(OpenAiClassifier::new(openai.clone())),
    itinerary:  Arc::new(
      PlannerClient::new(openai, &server_cfg.planner_base_url, PLANNER_TIMEOUT)
        .context("failed to build planner client")?,
    ),
    image:      Arc::new(
      GetImgClient::new(&server_cfg.getimg_base_url, &server_cfg.getimg_api_key, IMAGE_TIMEOUT)
        .context("failed to build image client")?,
    ),
    travel:     Arc::new(
      HttpTravelSearch::new(&server_cfg.planner_base_url, PLANNER_TIMEOUT)
        .context("failed to build travel search client")?,
    ),
  };

  let engine = Engine::new(store, Hub::new(), services, EngineConfig {
    default_departure_city: server_cfg.default_departure_city.clone(),
  });
  let state = AppState { engine: Arc::new(engine) };

  let app = packtrip_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
