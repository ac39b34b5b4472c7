use thiserror::Error;

/// Errors reported by a discovery capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("no resource type matches {0}")]
    NotFound(String),

    #[error("{query} matches multiple resource types: {}", .candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    #[error("discovery unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by the resolver.
///
/// `NotFound` and `Ambiguous` render text that is safe to show verbatim to
/// a human or an agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid resource identifier: {0}")]
    InvalidInput(String),

    #[error("no resource type found for {what}")]
    NotFound { what: String },

    #[error(
        "{what} is ambiguous, it matches: {}; specify apiVersion or group to disambiguate",
        .candidates.join(", ")
    )]
    Ambiguous {
        what: String,
        candidates: Vec<String>,
    },

    #[error("discovery unavailable: {0}")]
    DiscoveryUnavailable(String),
}

impl ResolveError {
    /// Only a discovery outage can succeed on a plain retry
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::DiscoveryUnavailable(_))
    }
}

impl From<DiscoveryError> for ResolveError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::NotFound(what) => Self::NotFound { what },
            DiscoveryError::Ambiguous { query, candidates } => Self::Ambiguous {
                what: query,
                candidates,
            },
            DiscoveryError::Unavailable(reason) => Self::DiscoveryUnavailable(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = ResolveError::Ambiguous {
            what: "kind \"Widget\"".to_string(),
            candidates: vec!["a.io/v1/widgets".to_string(), "b.io/v1/widgets".to_string()],
        };

        let message = err.to_string();
        assert!(message.contains("a.io/v1/widgets, b.io/v1/widgets"));
        assert!(message.contains("apiVersion or group"));
    }

    #[test]
    fn test_only_discovery_outage_is_retriable() {
        assert!(ResolveError::DiscoveryUnavailable("timeout".into()).is_retriable());
        assert!(!ResolveError::InvalidInput("empty".into()).is_retriable());
        assert!(
            !ResolveError::NotFound {
                what: "kind \"X\"".into()
            }
            .is_retriable()
        );
    }

    #[test]
    fn test_discovery_error_conversion() {
        let err: ResolveError = DiscoveryError::Unavailable("connection refused".into()).into();
        assert_eq!(
            err,
            ResolveError::DiscoveryUnavailable("connection refused".into())
        );
    }
}
