//! Live discovery against a control-plane API server

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use probe_core::{ApiResourceList, DiscoveryError, DiscoverySnapshot};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::fetcher::SnapshotFetcher;

#[derive(Debug, Deserialize)]
struct ApiVersions {
    #[serde(default)]
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiGroupList {
    #[serde(default)]
    groups: Vec<ApiGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGroup {
    #[serde(default)]
    versions: Vec<GroupVersionForDiscovery>,
    preferred_version: Option<GroupVersionForDiscovery>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupVersionForDiscovery {
    group_version: String,
}

impl ApiGroup {
    /// Group versions with the preferred one first
    fn ordered_group_versions(&self) -> Vec<String> {
        let preferred = self.preferred_version.as_ref().map(|p| p.group_version.clone());
        let mut ordered: Vec<String> = preferred.iter().cloned().collect();
        ordered.extend(
            self.versions
                .iter()
                .map(|v| v.group_version.clone())
                .filter(|gv| Some(gv) != preferred.as_ref()),
        );
        ordered
    }
}

/// Walks `/api` and `/apis` and reads every group version.
///
/// Root documents must load; a group version that fails is recorded in the
/// snapshot's failed groups instead of failing the whole refresh.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpFetcher {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        insecure_skip_tls_verify: bool,
    ) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_skip_tls_verify)
            .build()
            .map_err(|e| DiscoveryError::Unavailable(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| format!("GET {path}: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("GET {path}: HTTP {status}"));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| format!("GET {path}: invalid response: {e}"))
    }
}

/// Path of a group version's resource list
pub(crate) fn group_version_path(group_version: &str) -> String {
    if group_version.contains('/') {
        format!("/apis/{group_version}")
    } else {
        format!("/api/{group_version}")
    }
}

#[async_trait]
impl SnapshotFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<DiscoverySnapshot, DiscoveryError> {
        let core: ApiVersions = self
            .get_json("/api")
            .await
            .map_err(DiscoveryError::Unavailable)?;
        let groups: ApiGroupList = self
            .get_json("/apis")
            .await
            .map_err(DiscoveryError::Unavailable)?;

        let group_versions: Vec<String> = core
            .versions
            .into_iter()
            .chain(groups.groups.iter().flat_map(ApiGroup::ordered_group_versions))
            .collect();
        debug!(count = group_versions.len(), "fetching group versions");

        let results = join_all(group_versions.iter().map(|gv| async move {
            let path = group_version_path(gv);
            (gv.clone(), self.get_json::<ApiResourceList>(&path).await)
        }))
        .await;

        let mut lists = Vec::new();
        let mut failed_groups = BTreeMap::new();
        for (group_version, result) in results {
            match result {
                Ok(list) => lists.push(list),
                Err(reason) => {
                    failed_groups.insert(group_version, reason);
                }
            }
        }

        Ok(DiscoverySnapshot::with_failures(lists, failed_groups))
    }

    fn describe(&self) -> String {
        format!("server {}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_version_path() {
        assert_eq!(group_version_path("v1"), "/api/v1");
        assert_eq!(group_version_path("apps/v1"), "/apis/apps/v1");
    }

    #[test]
    fn test_preferred_version_first() {
        let group: ApiGroup = serde_json::from_str(
            r#"{
                "name": "autoscaling",
                "versions": [
                    {"groupVersion": "autoscaling/v1", "version": "v1"},
                    {"groupVersion": "autoscaling/v2", "version": "v2"}
                ],
                "preferredVersion": {"groupVersion": "autoscaling/v2", "version": "v2"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            group.ordered_group_versions(),
            vec!["autoscaling/v2", "autoscaling/v1"]
        );
    }

    #[test]
    fn test_group_without_preferred_version() {
        let group: ApiGroup = serde_json::from_str(
            r#"{"versions": [{"groupVersion": "example.com/v1"}]}"#,
        )
        .unwrap();
        assert_eq!(group.ordered_group_versions(), vec!["example.com/v1"]);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let fetcher = HttpFetcher::new(
            "https://127.0.0.1:6443/",
            None,
            Duration::from_secs(5),
            false,
        )
        .unwrap();
        assert_eq!(fetcher.describe(), "server https://127.0.0.1:6443");
    }
}
