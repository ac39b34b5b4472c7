mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use probe_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries results and stdio MCP traffic
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    if let cli::Commands::Completions { shell } = cli.command {
        commands::completions::handle(shell);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let sources = commands::Sources::new(&cli, &config);

    match cli.command {
        cli::Commands::Resolve(args) => commands::resolve::handle(args, &sources, &config).await,
        cli::Commands::Redact { file, stats } => commands::redact::handle(file, stats, &config).await,
        cli::Commands::ApiResources { json } => {
            commands::api_resources::handle(json, &sources, &config).await
        }
        cli::Commands::Get {
            resource,
            name,
            namespace,
            selector,
        } => {
            commands::get::handle(
                &resource,
                name.as_deref(),
                namespace.as_deref(),
                selector.as_deref(),
                &sources,
                &config,
            )
            .await
        }
        cli::Commands::Mcp { stdio, host, port } => {
            let host = host.unwrap_or_else(|| config.mcp.host.clone());
            let port = port.unwrap_or(config.mcp.port);
            commands::mcp::handle(stdio, &host, port, &sources, &config).await
        }
        cli::Commands::Completions { .. } => Ok(()),
    }
}
