mod error;
mod gate;
mod page;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sparkbytes_core::api::ApiClient;
use sparkbytes_core::config::SparkConfig;
use sparkbytes_core::mutation::InFlight;
use sparkbytes_core::session::SessionContext;

pub struct AppState {
    pub api: ApiClient,
    pub sessions: SessionContext<ApiClient>,
    pub in_flight: InFlight,
    pub config: SparkConfig,
}

impl AppState {
    pub fn new(config: SparkConfig) -> Result<Self> {
        let api = ApiClient::new(&config.api)?;
        let sessions = SessionContext::new(
            api.clone(),
            config.api.session_cookie.clone(),
            &config.session,
        );
        Ok(Self {
            api,
            sessions,
            in_flight: InFlight::new(),
            config,
        })
    }
}

/// SparkBytes web front-end: find and share events with free food.
#[derive(Parser)]
#[command(name = "sparkbytes-web", version)]
struct Cli {
    /// Directory holding `.sparkbytes/config.toml` (defaults to the current directory)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Address to bind (overrides `web.host`)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides `web.port`)
    #[arg(long)]
    port: Option<u16>,

    /// Backend base URL (overrides `api.base_url`)
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("sparkbytes_web=info,sparkbytes_core=info")
                }),
        )
        .init();

    let cli = Cli::parse();
    let project_dir = match cli.config_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut config = SparkConfig::load(Some(&project_dir)).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        SparkConfig::default_config()
    });
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
        config.validate();
    }

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let backend = config.api.base_url.clone();
    let state = Arc::new(AppState::new(config)?);

    let app = routes::router()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    tracing::info!("sparkbytes-web listening on http://{addr} (backend {backend})");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
