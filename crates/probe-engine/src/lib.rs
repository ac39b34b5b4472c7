//! Handler pipeline for read-only control-plane operations
//!
//! An `Inspector` resolves a partial identifier against the current
//! discovery snapshot, fetches objects through a `ResourceSource`, and
//! redacts the result before returning it.

pub mod error;
pub mod inspector;
pub mod source;

pub use error::{InspectError, Result};
pub use inspector::Inspector;
pub use source::{HttpResourceSource, OfflineSource, ResourceQuery, ResourceSource};
