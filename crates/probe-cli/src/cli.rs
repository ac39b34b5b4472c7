use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "probe")]
#[command(about = "Resolve control-plane resource types and redact what comes back", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Discovery document to read instead of querying a server
    #[arg(long, global = true, env = "PROBE_DISCOVERY_FILE")]
    pub discovery_file: Option<PathBuf>,

    /// Control-plane API base URL
    #[arg(long, global = true, env = "PROBE_SERVER")]
    pub server: Option<String>,

    /// Config file (default: probe.toml in the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a partial identifier to one resource type
    Resolve(ResolveArgs),

    /// Redact secrets from JSON or text (stdin when no file is given)
    Redact {
        file: Option<PathBuf>,

        /// Print per-rule redaction counts to stderr
        #[arg(long)]
        stats: bool,
    },

    /// List the preferred version of every API group
    ApiResources {
        #[arg(long)]
        json: bool,
    },

    /// List objects of a resource type, or get one by name
    Get {
        /// Resource name, e.g. pods, deploy, deployments.apps
        resource: String,

        name: Option<String>,

        #[arg(short, long)]
        namespace: Option<String>,

        /// Label selector, e.g. app=web
        #[arg(short = 'l', long)]
        selector: Option<String>,
    },

    /// Start MCP server
    Mcp {
        /// Serve JSON-RPC on stdin/stdout instead of HTTP
        #[arg(long)]
        stdio: bool,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Args)]
pub struct ResolveArgs {
    #[arg(long)]
    pub api_version: Option<String>,

    #[arg(long)]
    pub kind: Option<String>,

    #[arg(long)]
    pub resource: Option<String>,

    #[arg(long)]
    pub group: Option<String>,

    /// Fail instead of scanning every group when the direct lookup misses
    #[arg(long)]
    pub exact: bool,

    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get() {
        let cli = Cli::try_parse_from([
            "probe", "get", "pods", "-n", "kube-system", "-l", "app=dns", "--server",
            "https://10.0.0.1:6443",
        ])
        .unwrap();

        assert_eq!(cli.server.as_deref(), Some("https://10.0.0.1:6443"));
        match cli.command {
            Commands::Get {
                resource,
                name,
                namespace,
                selector,
            } => {
                assert_eq!(resource, "pods");
                assert!(name.is_none());
                assert_eq!(namespace.as_deref(), Some("kube-system"));
                assert_eq!(selector.as_deref(), Some("app=dns"));
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "probe",
            "resolve",
            "--api-version",
            "apps/v1",
            "--kind",
            "Deployment",
            "--exact",
        ])
        .unwrap();

        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.api_version.as_deref(), Some("apps/v1"));
                assert_eq!(args.kind.as_deref(), Some("Deployment"));
                assert!(args.exact);
            }
            _ => panic!("expected resolve"),
        }
    }
}
