//! Resource identity models

use serde::{Deserialize, Serialize};
use std::fmt;

/// A partially specified resource identifier, as supplied by a caller.
///
/// Every field is optional and empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl ResourceIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn api_version(&self) -> Option<&str> {
        non_empty(&self.api_version)
    }

    pub fn kind(&self) -> Option<&str> {
        non_empty(&self.kind)
    }

    pub fn resource(&self) -> Option<&str> {
        non_empty(&self.resource)
    }

    pub fn group(&self) -> Option<&str> {
        non_empty(&self.group)
    }

    /// True when no field carries any information
    pub fn is_empty(&self) -> bool {
        self.api_version().is_none()
            && self.kind().is_none()
            && self.resource().is_none()
            && self.group().is_none()
    }

    /// Split a `resource.group` compound into its parts.
    ///
    /// Only applies when no explicit group is set; everything after the
    /// first `.` becomes the group.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        if self.group().is_some() {
            return out;
        }
        if let Some((name, group)) = self.resource().and_then(|r| r.split_once('.')) {
            out.resource = Some(name.to_string());
            out.group = Some(group.to_string());
        }
        out
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(v) = self.api_version() {
            parts.push(format!("apiVersion={v}"));
        }
        if let Some(k) = self.kind() {
            parts.push(format!("kind={k}"));
        }
        if let Some(r) = self.resource() {
            parts.push(format!("resource={r}"));
        }
        if let Some(g) = self.group() {
            parts.push(format!("group={g}"));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// An API group and version; the core group is the empty string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// Parse `group/version`, or a bare `version` for the core group
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.split_once('/') {
            None if !raw.is_empty() => Some(Self::new("", raw)),
            None => None,
            Some((group, version))
                if !group.is_empty() && !version.is_empty() && !version.contains('/') =>
            {
                Some(Self::new(group, version))
            }
            Some(_) => None,
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// Uniquely identifies a resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group.clone(), self.version.clone())
    }
}

/// Renders as `<groupVersion>/<resource>`
impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_version(), self.resource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn group_kind(&self) -> GroupKind {
        GroupKind {
            group: self.group.clone(),
            kind: self.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// A resource name with an optional group and version, used for direct lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResource {
    pub group: Option<String>,
    pub version: Option<String>,
    pub resource: String,
}

impl fmt::Display for PartialResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource {:?}", self.resource)?;
        match (&self.group, &self.version) {
            (Some(g), Some(v)) => write!(f, " in {}", GroupVersion::new(g.clone(), v.clone())),
            (Some(g), None) if g.is_empty() => write!(f, " in the core group"),
            (Some(g), None) => write!(f, " in group {g:?}"),
            (None, Some(v)) => write!(f, " at version {v:?}"),
            (None, None) => Ok(()),
        }
    }
}

/// Full type information for one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestMapping {
    pub resource: GroupVersionResource,
    pub kind: GroupVersionKind,
    pub namespaced: bool,
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedResource {
    #[serde(flatten)]
    pub gvr: GroupVersionResource,
    pub namespaced: bool,
}

impl ResolvedResource {
    pub fn new(gvr: GroupVersionResource, namespaced: bool) -> Self {
        Self { gvr, namespaced }
    }
}

impl From<RestMapping> for ResolvedResource {
    fn from(mapping: RestMapping) -> Self {
        Self::new(mapping.resource, mapping.namespaced)
    }
}
