pub use crate::common::RouteResult;

use std::sync::Arc;

use axum::Router;
use pipeline::Orchestrator;
use route_graph::GraphStore;
use routing::RoutingService;
use storage::Repositories;
use tokio::net::TcpListener;

use crate::config::AppConfig;

pub mod api;
pub mod common;
pub mod config;

#[derive(Clone)]
pub struct WebState {
    pub routing: Arc<RoutingService>,
    pub store: Arc<GraphStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub repos: Repositories,
    pub config: AppConfig,
}

pub async fn start_web_server(state: WebState) -> std::io::Result<()> {
    let port = state.config.http_port;
    let routes = Router::new().nest("/api", api::routes(state));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("listening on port {port}");
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
