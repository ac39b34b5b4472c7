//! Discovery capability and the in-memory snapshot that implements it
//!
//! The snapshot is a point-in-time view of the control plane's supported
//! resource types. It is immutable once built; refreshing means building a
//! new snapshot and swapping it in (see `probe-discovery`).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::DiscoveryError;
use crate::identity::{
    GroupKind, GroupVersion, GroupVersionKind, GroupVersionResource, PartialResource, RestMapping,
};

/// One resource entry of a discovery document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub name: String,
    #[serde(default)]
    pub singular_name: String,
    #[serde(default)]
    pub namespaced: bool,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<String>,
}

impl ApiResource {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, namespaced: bool) -> Self {
        let kind = kind.into();
        Self {
            name: name.into(),
            singular_name: kind.to_lowercase(),
            namespaced,
            kind,
            short_names: Vec::new(),
            verbs: Vec::new(),
        }
    }

    pub fn with_short_names(mut self, short_names: &[&str]) -> Self {
        self.short_names = short_names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_verbs(mut self, verbs: &[&str]) -> Self {
        self.verbs = verbs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Subresources such as `pods/log` carry a path separator
    pub fn is_subresource(&self) -> bool {
        self.name.contains('/')
    }

    /// Exact match against the plural, singular, or any short name
    pub fn answers_to(&self, word: &str) -> bool {
        self.name == word
            || (!self.singular_name.is_empty() && self.singular_name == word)
            || self.short_names.iter().any(|s| s == word)
    }
}

/// All resources served under one group/version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    pub group_version: String,
    #[serde(default)]
    pub resources: Vec<ApiResource>,
}

impl ApiResourceList {
    pub fn new(group_version: impl Into<String>, resources: Vec<ApiResource>) -> Self {
        Self {
            group_version: group_version.into(),
            resources,
        }
    }

    pub fn parsed_group_version(&self) -> Option<GroupVersion> {
        GroupVersion::parse(&self.group_version)
    }
}

/// The preferred version of every group, plus groups that failed discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredResources {
    pub lists: Vec<ApiResourceList>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failed_groups: BTreeMap<String, String>,
}

/// Capability the resolver needs from discovery.
///
/// `resource_for`, `kind_for` and `rest_mapping` are exact lookups backed by
/// cached metadata. `preferred_resources` enumerates every group's preferred
/// version; it succeeds with `failed_groups` filled in when only some
/// groups could not be read.
pub trait Discovery: Send + Sync {
    fn resource_for(&self, partial: &PartialResource)
    -> Result<GroupVersionResource, DiscoveryError>;

    fn kind_for(&self, gvr: &GroupVersionResource) -> Result<GroupVersionKind, DiscoveryError>;

    fn rest_mapping(
        &self,
        group_kind: &GroupKind,
        version: Option<&str>,
    ) -> Result<RestMapping, DiscoveryError>;

    fn preferred_resources(&self) -> Result<PreferredResources, DiscoveryError>;
}

/// Immutable point-in-time view of the control plane's resource types.
///
/// The first list seen for a group is that group's preferred version.
#[derive(Debug, Clone)]
pub struct DiscoverySnapshot {
    lists: Vec<ApiResourceList>,
    failed_groups: BTreeMap<String, String>,
    fetched_at: OffsetDateTime,
    fingerprint: String,
}

impl DiscoverySnapshot {
    pub fn new(lists: Vec<ApiResourceList>) -> Self {
        Self::with_failures(lists, BTreeMap::new())
    }

    pub fn with_failures(
        lists: Vec<ApiResourceList>,
        failed_groups: BTreeMap<String, String>,
    ) -> Self {
        let fingerprint = fingerprint(&lists);
        Self {
            lists,
            failed_groups,
            fetched_at: OffsetDateTime::now_utc(),
            fingerprint,
        }
    }

    pub fn lists(&self) -> &[ApiResourceList] {
        &self.lists
    }

    pub fn failed_groups(&self) -> &BTreeMap<String, String> {
        &self.failed_groups
    }

    pub fn fetched_at(&self) -> OffsetDateTime {
        self.fetched_at
    }

    /// Content hash of the resource lists, stable across refreshes that
    /// observe the same API surface
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn resource_count(&self) -> usize {
        self.lists.iter().map(|l| l.resources.len()).sum()
    }

    fn parsed_lists(&self) -> impl Iterator<Item = (GroupVersion, &ApiResourceList)> {
        self.lists
            .iter()
            .filter_map(|list| list.parsed_group_version().map(|gv| (gv, list)))
    }
}

impl Discovery for DiscoverySnapshot {
    fn resource_for(
        &self,
        partial: &PartialResource,
    ) -> Result<GroupVersionResource, DiscoveryError> {
        let mut seen_groups = HashSet::new();
        let mut hits = Vec::new();

        for (gv, list) in self.parsed_lists() {
            if partial.group.as_deref().is_some_and(|g| g != gv.group) {
                continue;
            }
            if partial.version.as_deref().is_some_and(|v| v != gv.version) {
                continue;
            }
            let found = list.resources.iter().find(|r| {
                !r.is_subresource()
                    && (r.name == partial.resource || r.singular_name == partial.resource)
            });
            // Lists arrive preferred-first, so the first hit per group wins
            if let Some(resource) = found {
                if seen_groups.insert(gv.group.clone()) {
                    hits.push(GroupVersionResource::new(
                        gv.group,
                        gv.version,
                        resource.name.clone(),
                    ));
                }
            }
        }

        match hits.len() {
            0 => Err(DiscoveryError::NotFound(partial.to_string())),
            1 => Ok(hits.remove(0)),
            _ => {
                let mut candidates: Vec<String> = hits.iter().map(|h| h.to_string()).collect();
                candidates.sort();
                Err(DiscoveryError::Ambiguous {
                    query: partial.to_string(),
                    candidates,
                })
            }
        }
    }

    fn kind_for(&self, gvr: &GroupVersionResource) -> Result<GroupVersionKind, DiscoveryError> {
        self.parsed_lists()
            .filter(|(gv, _)| gv.group == gvr.group && gv.version == gvr.version)
            .flat_map(|(_, list)| list.resources.iter())
            .find(|r| r.name == gvr.resource)
            .map(|r| GroupVersionKind {
                group: gvr.group.clone(),
                version: gvr.version.clone(),
                kind: r.kind.clone(),
            })
            .ok_or_else(|| DiscoveryError::NotFound(format!("resource {gvr}")))
    }

    fn rest_mapping(
        &self,
        group_kind: &GroupKind,
        version: Option<&str>,
    ) -> Result<RestMapping, DiscoveryError> {
        for (gv, list) in self.parsed_lists() {
            if gv.group != group_kind.group || version.is_some_and(|v| v != gv.version) {
                continue;
            }
            let found = list
                .resources
                .iter()
                .find(|r| !r.is_subresource() && r.kind == group_kind.kind);
            if let Some(resource) = found {
                return Ok(RestMapping {
                    resource: GroupVersionResource::new(
                        gv.group.clone(),
                        gv.version.clone(),
                        resource.name.clone(),
                    ),
                    kind: GroupVersionKind {
                        group: gv.group,
                        version: gv.version,
                        kind: resource.kind.clone(),
                    },
                    namespaced: resource.namespaced,
                });
            }
        }

        let mut what = format!("kind {group_kind}");
        if let Some(v) = version {
            what.push_str(&format!(" at version {v:?}"));
        }
        Err(DiscoveryError::NotFound(what))
    }

    fn preferred_resources(&self) -> Result<PreferredResources, DiscoveryError> {
        let mut seen_groups = HashSet::new();
        let lists = self
            .parsed_lists()
            .filter(|(gv, _)| seen_groups.insert(gv.group.clone()))
            .map(|(_, list)| list.clone())
            .collect();

        Ok(PreferredResources {
            lists,
            failed_groups: self.failed_groups.clone(),
        })
    }
}

fn fingerprint(lists: &[ApiResourceList]) -> String {
    let mut hasher = blake3::Hasher::new();
    for list in lists {
        hasher.update(list.group_version.as_bytes());
        hasher.update(&[0]);
        for r in &list.resources {
            hasher.update(r.name.as_bytes());
            hasher.update(&[0]);
            hasher.update(r.kind.as_bytes());
            hasher.update(&[r.namespaced as u8, 0]);
        }
        hasher.update(&[1]);
    }
    hasher.finalize().to_hex().to_string()
}
