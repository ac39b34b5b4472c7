//! Core domain models and logic for probe
//!
//! This crate contains:
//! - Resource identity models (identifier, group/version/resource triples)
//! - The discovery capability and its in-memory snapshot
//! - The resolver (partial identifier -> one canonical resource type)

pub mod discovery;
pub mod error;
pub mod identity;
pub mod resolver;

pub use discovery::{
    ApiResource, ApiResourceList, Discovery, DiscoverySnapshot, PreferredResources,
};
pub use error::{DiscoveryError, ResolveError, Result};
pub use identity::{
    GroupKind, GroupVersion, GroupVersionKind, GroupVersionResource, PartialResource,
    ResolvedResource, ResourceIdentifier, RestMapping,
};
pub use resolver::{resolve_best_effort, resolve_exact};
