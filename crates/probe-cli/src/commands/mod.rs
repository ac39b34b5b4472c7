pub mod api_resources;
pub mod completions;
pub mod get;
pub mod mcp;
pub mod redact;
pub mod resolve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use probe_config::Config;
use probe_discovery::{CachedDiscovery, FileFetcher, HttpFetcher, SnapshotFetcher};
use probe_engine::{HttpResourceSource, Inspector, OfflineSource, ResourceSource};
use probe_security::Redactor;
use tracing::debug;

use crate::cli::Cli;

/// Where discovery and objects come from; flags override the config file
pub struct Sources {
    pub discovery_file: Option<PathBuf>,
    pub server: Option<String>,
}

impl Sources {
    pub fn new(cli: &Cli, config: &Config) -> Self {
        Self {
            discovery_file: cli
                .discovery_file
                .clone()
                .or_else(|| config.discovery.file.clone()),
            server: cli.server.clone().or_else(|| config.discovery.server.clone()),
        }
    }

    pub fn discovery(&self, config: &Config) -> Result<Arc<CachedDiscovery>> {
        let settings = &config.discovery;
        let fetcher: Arc<dyn SnapshotFetcher> = match (&self.discovery_file, &self.server) {
            (Some(path), _) => Arc::new(FileFetcher::new(path)),
            (None, Some(server)) => Arc::new(HttpFetcher::new(
                server.as_str(),
                settings.token(),
                settings.timeout(),
                settings.insecure_skip_tls_verify,
            )?),
            (None, None) => bail!(
                "no discovery source: pass --discovery-file or --server, or set [discovery] in {}",
                Config::config_path().display()
            ),
        };
        debug!(source = %fetcher.describe(), "discovery source");

        Ok(Arc::new(CachedDiscovery::new(
            fetcher,
            settings.refresh_interval(),
        )))
    }

    pub fn resource_source(&self, config: &Config) -> Result<Arc<dyn ResourceSource>> {
        let settings = &config.discovery;
        Ok(match &self.server {
            Some(server) => Arc::new(HttpResourceSource::new(
                server,
                settings.token(),
                settings.timeout(),
                settings.insecure_skip_tls_verify,
            )?),
            None => Arc::new(OfflineSource),
        })
    }

    pub fn inspector(&self, config: &Config) -> Result<Inspector> {
        Ok(Inspector::new(
            self.discovery(config)?,
            self.resource_source(config)?,
            redactor(config),
        ))
    }
}

/// Built-in rules plus the `[redaction]` extras
pub fn redactor(config: &Config) -> Arc<Redactor> {
    Arc::new(Redactor::with_extras(
        &config.redaction.extra_keys,
        &config.redaction.extra_patterns,
    ))
}
