//! Tool dispatch for the Voxlink live-session client.
//!
//! The remote model issues tool calls with loosely typed argument maps;
//! this crate validates them into a tagged [`ToolArgs`] enum at the
//! dispatch boundary, routes them through a name-to-handler registry,
//! and guarantees that handler failures come back as error-shaped
//! results instead of crossing the boundary as errors.
//!
//! # Main entry points
//!
//! - [`ToolRouter`] — the registry; look up by name, dispatch, audit.
//! - [`ToolArgs`] — validated argument variants, one per tool.
//! - [`ToolContext`] — the execution-context snapshot handlers receive.
//! - [`builtins::register_defaults()`] — install the standard handlers.

/// Validated tool argument variants.
pub mod args;
/// Per-dispatch audit trail.
pub mod audit;
/// Built-in tool handlers.
pub mod builtins;
/// Execution context snapshot and client hooks.
pub mod context;
/// The handler registry.
pub mod router;

pub use args::{AmbientAction, MissionOp, ToolArgs};
pub use audit::{AuditEntry, AuditOutcome, AuditSink, FileAuditTrail, MemoryAuditTrail};
pub use context::{ClientHooks, GithubConfig, NoopHooks, SystemStatus, ToolContext};
pub use router::{AgentKind, ToolDescriptor, ToolHandler, ToolRouter};
