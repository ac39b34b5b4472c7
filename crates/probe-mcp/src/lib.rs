//! MCP surface for probe
//!
//! Exposes the read-only inspector operations as MCP tools over two
//! transports: newline-delimited JSON-RPC on stdio, and JSON-RPC over HTTP.

pub mod protocol;
pub mod server;
pub mod stdio;
pub mod tools;

pub use server::McpServer;
pub use stdio::run_stdio;
