//! Resource resolver
//!
//! Turns a partially specified `ResourceIdentifier` into exactly one
//! canonical resource type, or an error precise enough to act on.
//!
//! CRITICAL: a wrong resolution silently targets the wrong live resource.
//! Ambiguity is always reported, never settled by precedence.

use tracing::{debug, warn};

use crate::discovery::{ApiResourceList, Discovery};
use crate::error::{DiscoveryError, ResolveError, Result};
use crate::identity::{
    GroupKind, GroupVersion, GroupVersionResource, PartialResource, ResolvedResource,
    ResourceIdentifier,
};

/// A discovery entry that matched during a best-effort scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    gvr: GroupVersionResource,
    namespaced: bool,
    group_version: String,
}

impl Candidate {
    /// `<groupVersion>/<resourceName>`
    fn label(&self) -> String {
        format!("{}/{}", self.group_version, self.gvr.resource)
    }
}

/// Resolve through exact discovery lookups.
///
/// A supplied `resource` is looked up directly first and refined through
/// its kind back to a mapping, so `namespaced` always comes from discovery.
/// On a miss, falls back to `{group, kind, version}`.
pub fn resolve_exact<D: Discovery + ?Sized>(
    discovery: &D,
    id: &ResourceIdentifier,
) -> Result<ResolvedResource> {
    let gv = match id.api_version() {
        Some(raw) => Some(GroupVersion::parse(raw).ok_or_else(|| {
            ResolveError::InvalidInput(format!(
                "apiVersion {raw:?} is not of the form <group>/<version> or <version>"
            ))
        })?),
        None => None,
    };

    if let Some(resource) = id.resource() {
        let partial = match &gv {
            Some(gv) => PartialResource {
                group: Some(gv.group.clone()),
                version: Some(gv.version.clone()),
                resource: resource.to_string(),
            },
            None => {
                let normalized = id.normalized();
                PartialResource {
                    group: normalized.group().map(String::from),
                    version: None,
                    resource: normalized.resource().unwrap_or(resource).to_string(),
                }
            }
        };

        match lookup_by_resource(discovery, &partial) {
            Ok(resolved) => return Ok(resolved),
            Err(DiscoveryError::Unavailable(reason)) => {
                return Err(ResolveError::DiscoveryUnavailable(reason));
            }
            Err(err) if id.kind().is_none() => return Err(err.into()),
            Err(err) => debug!(%partial, error = %err, "direct resource lookup missed, trying kind"),
        }
    }

    let Some(kind) = id.kind() else {
        return Err(ResolveError::InvalidInput(
            "either apiVersion and kind, or resource, must be specified".to_string(),
        ));
    };

    let group_kind = GroupKind {
        group: match &gv {
            Some(gv) => gv.group.clone(),
            None => id.normalized().group().unwrap_or_default().to_string(),
        },
        kind: kind.to_string(),
    };
    let version = gv.as_ref().map(|gv| gv.version.as_str());

    let mapping = discovery.rest_mapping(&group_kind, version)?;
    debug!(%group_kind, gvr = %mapping.resource, "resolved by kind");
    Ok(mapping.into())
}

fn lookup_by_resource<D: Discovery + ?Sized>(
    discovery: &D,
    partial: &PartialResource,
) -> std::result::Result<ResolvedResource, DiscoveryError> {
    let gvr = discovery.resource_for(partial)?;
    let gvk = discovery.kind_for(&gvr)?;
    let mapping = discovery.rest_mapping(&gvk.group_kind(), Some(&gvk.version))?;
    debug!(%partial, gvr = %mapping.resource, "resolved by resource");
    Ok(mapping.into())
}

/// Resolve from sparse or informal input.
///
/// Tries `resolve_exact` when an `apiVersion` or `resource` is present,
/// then scans every group's preferred version for matching names or kinds.
pub fn resolve_best_effort<D: Discovery + ?Sized>(
    discovery: &D,
    id: &ResourceIdentifier,
) -> Result<ResolvedResource> {
    let id = id.normalized();

    if id.api_version().is_some() || id.resource().is_some() {
        match resolve_exact(discovery, &id) {
            Ok(resolved) => return Ok(resolved),
            Err(err) if is_fatal(&id, &err) => return Err(err),
            Err(err) => debug!(%id, error = %err, "exact resolution missed, scanning discovery"),
        }
    }

    if id.kind().is_none() && id.resource().is_none() {
        return Err(ResolveError::InvalidInput(
            "at least one of kind or resource must be specified".to_string(),
        ));
    }

    let preferred = discovery.preferred_resources()?;
    for (group_version, reason) in &preferred.failed_groups {
        warn!(%group_version, %reason, "skipping group that failed discovery");
    }

    decide(&id, collect_candidates(&preferred.lists, &id))
}

/// An explicit `apiVersion` is a precise request; when it fails there is
/// nothing to guess.
fn is_fatal(id: &ResourceIdentifier, err: &ResolveError) -> bool {
    match err {
        ResolveError::DiscoveryUnavailable(_) | ResolveError::InvalidInput(_) => true,
        _ => id.api_version().is_some(),
    }
}

fn collect_candidates(lists: &[ApiResourceList], id: &ResourceIdentifier) -> Vec<Candidate> {
    let (word, kind) = (id.resource(), id.kind());

    lists
        .iter()
        .filter_map(|list| list.parsed_group_version().map(|gv| (gv, list)))
        .filter(|(gv, _)| id.group().is_none_or(|g| g == gv.group))
        .flat_map(move |(gv, list)| {
            list.resources
                .iter()
                .filter(|r| !r.is_subresource())
                // A resource word takes precedence over the kind
                .filter(move |r| match (word, kind) {
                    (Some(word), _) => r.answers_to(word),
                    (None, Some(kind)) => r.kind == kind,
                    (None, None) => false,
                })
                .map(move |r| Candidate {
                    gvr: GroupVersionResource::new(
                        gv.group.clone(),
                        gv.version.clone(),
                        r.name.clone(),
                    ),
                    namespaced: r.namespaced,
                    group_version: list.group_version.clone(),
                })
        })
        .fold(Vec::new(), |mut acc, candidate| {
            if !acc.iter().any(|c: &Candidate| c.gvr == candidate.gvr) {
                acc.push(candidate);
            }
            acc
        })
}

fn decide(id: &ResourceIdentifier, mut candidates: Vec<Candidate>) -> Result<ResolvedResource> {
    let what = match (id.resource(), id.kind()) {
        (Some(resource), _) => format!("resource {resource:?}"),
        (None, Some(kind)) => format!("kind {kind:?}"),
        (None, None) => id.to_string(),
    };

    match candidates.len() {
        0 => Err(ResolveError::NotFound { what }),
        1 => {
            let Candidate {
                gvr, namespaced, ..
            } = candidates.remove(0);
            Ok(ResolvedResource::new(gvr, namespaced))
        }
        _ => {
            let mut labels: Vec<String> = candidates.iter().map(Candidate::label).collect();
            labels.sort();
            Err(ResolveError::Ambiguous {
                what,
                candidates: labels,
            })
        }
    }
}
