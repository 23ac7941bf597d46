//! timing-diagram-mcp: timing diagram tooling over a diagram engine's HTTP API
//!
//! Two front ends share one typed API client:
//!
//! - **MCP server**: lets an AI assistant create, inspect, lay out and
//!   export timing diagrams through JSON-RPC tools on stdio
//! - **Regression harness**: drives the engine through a fixed end-to-end
//!   timing diagram scenario and reports each step as passed or failed
//!
//! The engine owns all diagram state. Nothing here persists between runs
//! except exported images.
//!
//! # Modules
//!
//! - [`api`]: HTTP client, entity types and timing diagram endpoints
//! - [`config`]: configuration loading and validation
//! - [`error`]: configuration error types
//! - [`harness`]: step tracking, scenario context, runner and scenarios
//! - [`logging`]: tracing subscriber setup
//! - [`mcp`]: MCP protocol implementation

pub mod api;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod mcp;
