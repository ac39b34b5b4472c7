use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::tools::handle_jsonrpc;

/// Newline-delimited JSON-RPC over stdin/stdout.
///
/// Runs until stdin closes. Logs go to stderr so stdout carries only
/// protocol messages.
pub async fn run_stdio(server: Arc<McpServer>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!("MCP server reading from stdio");

    while let Some(line) = lines.next_line().await? {
        let Some(response) = handle_line(&server, &line).await else {
            continue;
        };

        let mut output = serde_json::to_string(&response)?;
        output.push('\n');
        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Response for one input line; `None` for blank lines and notifications
pub async fn handle_line(server: &McpServer, line: &str) -> Option<JsonRpcResponse> {
    if line.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<JsonRpcRequest>(line) {
        Ok(req) if req.is_notification() => {
            handle_jsonrpc(server, req).await;
            None
        }
        Ok(req) => Some(handle_jsonrpc(server, req).await),
        Err(e) => Some(JsonRpcResponse::error(
            serde_json::Value::Null,
            PARSE_ERROR,
            &format!("Parse error: {}", e),
        )),
    }
}
