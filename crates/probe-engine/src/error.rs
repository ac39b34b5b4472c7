use probe_core::{DiscoveryError, ResolveError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("{resource} is cluster-scoped; a namespace cannot be given")]
    ClusterScoped { resource: String },

    #[error("{resource} is namespaced; a namespace is required to get {name:?}")]
    NamespaceRequired { resource: String, name: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    ObjectNotFound(String),

    #[error("request failed: {0}")]
    Source(String),
}

impl InspectError {
    /// Discovery outages and transport failures may succeed on retry
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Resolve(e) => e.is_retriable(),
            Self::Discovery(DiscoveryError::Unavailable(_)) | Self::Source(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
