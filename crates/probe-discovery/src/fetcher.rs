//! Snapshot fetcher trait

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use probe_core::{ApiResourceList, DiscoveryError, DiscoverySnapshot};
use serde::Deserialize;

/// Produces a fresh discovery snapshot
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> Result<DiscoverySnapshot, DiscoveryError>;

    /// Where snapshots come from, for logs
    fn describe(&self) -> String;
}

/// Serves the same snapshot every time
pub struct StaticFetcher {
    snapshot: DiscoverySnapshot,
}

impl StaticFetcher {
    pub fn new(snapshot: DiscoverySnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl SnapshotFetcher for StaticFetcher {
    async fn fetch(&self) -> Result<DiscoverySnapshot, DiscoveryError> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        "static snapshot".to_string()
    }
}

/// Reads a discovery document from disk on every refresh
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotFetcher for FileFetcher {
    async fn fetch(&self) -> Result<DiscoverySnapshot, DiscoveryError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DiscoveryError::Unavailable(format!("reading {}: {e}", self.path.display()))
        })?;
        parse_document(&content)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DiscoveryDocument {
    Full {
        resources: Vec<ApiResourceList>,
        #[serde(default, rename = "failedGroups")]
        failed_groups: BTreeMap<String, String>,
    },
    Lists(Vec<ApiResourceList>),
}

/// Parse a discovery document.
///
/// Accepts either `{"resources": [...], "failedGroups": {...}}` or a bare
/// array of resource lists. List order is preserved, so the first list of
/// each group is its preferred version.
pub fn parse_document(content: &str) -> Result<DiscoverySnapshot, DiscoveryError> {
    let document: DiscoveryDocument = serde_json::from_str(content)
        .map_err(|e| DiscoveryError::Unavailable(format!("invalid discovery document: {e}")))?;

    Ok(match document {
        DiscoveryDocument::Full {
            resources,
            failed_groups,
        } => DiscoverySnapshot::with_failures(resources, failed_groups),
        DiscoveryDocument::Lists(lists) => DiscoverySnapshot::new(lists),
    })
}
