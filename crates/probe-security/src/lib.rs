//! Secret redaction engine
//!
//! Scrubs credentials out of tool results before they leave the process.
//! Two kinds of rules drive it:
//! - key rules, matched against mapping keys, redact a whole branch by name
//! - content rules, matched against leaf strings, redact secret-shaped spans

pub mod redactor;
pub mod rules;

pub use redactor::{RedactionInfo, Redactor, redact_str, redact_value};
pub use rules::{ContentAction, KeyMatcher, REDACTION_MARKER, RedactionRule};
