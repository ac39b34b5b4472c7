//! Discovery layer for probe
//!
//! This crate provides:
//! - Snapshot fetchers (discovery JSON file, live control-plane HTTP)
//! - `CachedDiscovery`, which refreshes and shares immutable snapshots

pub mod cache;
pub mod fetcher;
pub mod http;

pub use cache::CachedDiscovery;
pub use fetcher::{FileFetcher, SnapshotFetcher, StaticFetcher, parse_document};
pub use http::HttpFetcher;
