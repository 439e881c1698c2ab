use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderName, Method};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod error;
mod handlers;
mod logic;
mod plans;
mod state;
mod storage;

use crate::handlers::{
    get_annotations_handler, health_handler, save_annotations_handler, USER_ID_HEADER,
};
use crate::state::AppState;
use crate::storage::{FileStorage, MemoryStorage, Storage};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding one annotation file per floor plan.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Keep annotations in memory only.
    #[arg(long, conflicts_with = "data_dir")]
    in_memory: bool,
}

fn init_tracing() {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,planmark_server=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(USER_ID_HEADER),
        ]);
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/floor-plans/:floor_plan_id/annotations",
            get(get_annotations_handler).post(save_annotations_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_tracing();
    let args = Args::parse();

    let storage: Arc<dyn Storage> = if args.in_memory {
        tracing::info!("annotations are kept in memory only");
        Arc::new(MemoryStorage::new())
    } else {
        let data_dir = args
            .data_dir
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data"));
        tokio::fs::create_dir_all(&data_dir).await?;
        tracing::info!(data_dir = %data_dir.display(), "storing annotations on disk");
        Arc::new(FileStorage::new(data_dir))
    };
    let app = router(AppState::new(storage));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("floor plan annotation service listening on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
