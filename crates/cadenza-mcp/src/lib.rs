//! Cadenza MCP server
//!
//! Exposes the analysis engine as MCP tools over stdio. The binary in
//! `main.rs` wires the production resolver; the library surface exists so
//! integration tests can drive the tools with injected fetchers.

pub mod format;
pub mod server;

pub use server::AudioAnalysisServer;
