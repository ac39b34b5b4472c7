use std::sync::Arc;

use anyhow::Result;
use probe_config::Config;
use probe_mcp::{McpServer, run_stdio};

use super::Sources;

pub async fn handle(
    stdio: bool,
    host: &str,
    port: u16,
    sources: &Sources,
    config: &Config,
) -> Result<()> {
    let inspector = Arc::new(sources.inspector(config)?);

    // Fail fast on an unreachable discovery source
    inspector.discovery().current().await?;

    let server = Arc::new(McpServer::new(inspector));
    if stdio {
        run_stdio(server).await
    } else {
        eprintln!("Starting MCP server on {}:{}", host, port);
        server.serve(host, port).await
    }
}
