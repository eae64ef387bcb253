//! Auditor server - HTTP front end for contract analyses with live progress.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use auditor::io::config::{CONFIG_FILE_NAME, load_config};
use axum::Router;
use axum::routing::{get, post};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "auditor-server")]
#[command(about = "HTTP server running contract analyses and streaming their progress")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Foundry project directory the analyses run in
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Config file (defaults to <project-dir>/auditor.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory containing UI static files (defaults to <project-dir>/ui/dist)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auditor_server=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let project_dir = args.project_dir.canonicalize().unwrap_or(args.project_dir);
    let config_path = args
        .config
        .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME));
    let config = load_config(&config_path)?;
    info!(
        project_dir = %project_dir.display(),
        isolate = config.workspace.isolate,
        "starting auditor-server"
    );

    let state = AppState::new(project_dir.clone(), config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/analyze", post(routes::analyze))
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    let ui_dir = args
        .ui_dir
        .unwrap_or_else(|| project_dir.join("ui").join("dist"));

    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
