//! Model Context Protocol (MCP) server for timing diagrams.
//!
//! Exposes the diagram engine's timing diagram API as MCP tools so an AI
//! assistant can build and inspect diagrams. JSON-RPC 2.0 over stdio.
//!
//! ```text
//!   stdin ──▶ transport ──▶ server (lifecycle) ──▶ tools ──▶ TimingApi ──▶ engine
//!   stdout ◀──────────────────┘
//! ```
//!
//! Targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ToolCallResult, ToolContent};
pub use transport::StdioTransport;
