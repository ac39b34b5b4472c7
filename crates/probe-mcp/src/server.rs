use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use std::sync::Arc;

use probe_engine::Inspector;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::tools::handle_jsonrpc;

pub struct McpServer {
    pub inspector: Arc<Inspector>,
}

impl McpServer {
    pub fn new(inspector: Arc<Inspector>) -> Self {
        Self { inspector }
    }

    /// HTTP routes: `GET /` for server info, `POST /mcp` for JSON-RPC
    pub fn router(self: Arc<Self>) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(handle_info).post(handle_mcp_post))
            .route("/mcp", get(handle_info).post(handle_mcp_post))
            .layer(cors)
            .with_state(self)
    }

    pub async fn serve(self: Arc<Self>, host: &str, port: u16) -> anyhow::Result<()> {
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr).await?;

        info!("MCP server listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

/// GET handler for server info/health check
async fn handle_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "probe",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "mcp",
        "transport": "http"
    }))
}

/// POST /mcp - Handle JSON-RPC messages (stateless mode)
async fn handle_mcp_post(
    State(server): State<Arc<McpServer>>,
    Json(req): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    Json(handle_jsonrpc(&server, req).await)
}
