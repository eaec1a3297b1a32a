//! `pl-toolclient` — the in-process client for the MCP tool boundary.
//!
//! Every side effect in Paceline (database reads/writes, prompt-file
//! loads) travels through [`ToolClient::call`]. The client:
//! - routes each known tool name to one of the two upstream servers via
//!   a static table,
//! - issues a single `POST /mcp/tools/call` with a bounded timeout,
//! - surfaces failures in three categories: `Transport`, `Protocol`,
//!   and `Remote` (a tool-returned `{code, message}`).
//!
//! The constructor is fail-closed: it refuses to build when either
//! endpoint is unconfigured. There is deliberately no caching and no
//! retrying here — the boundary is the audit and test surface, and any
//! retry is an explicit, named operation owned by a caller.

pub mod client;
pub mod routing;

pub use client::{ToolClient, ToolClientError};
pub use routing::{route, ToolEndpoint};
