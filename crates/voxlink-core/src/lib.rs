//! Core types and error definitions for the Voxlink live-session client.
//!
//! This crate provides the foundational types shared across all Voxlink
//! crates, including error handling, transcript representations, and
//! tool call abstractions.
//!
//! # Main types
//!
//! - [`VoxlinkError`] — Unified error enum for all Voxlink subsystems.
//! - [`VoxlinkResult`] — Convenience alias for `Result<T, VoxlinkError>`.
//! - [`TranscriptTurn`] — One user/assistant exchange unit.
//! - [`ConversationSession`] — An immutable, persisted transcript record.
//! - [`ToolCall`] — A server-issued tool invocation request.
//! - [`ToolResult`] — The result returned after executing a tool call.
//! - [`EngineEvent`] — UI-visible events emitted by the session engine.

/// Error types.
pub mod error;
/// Engine events surfaced to the orchestration layer.
pub mod event;
/// Shared status and context value types.
pub mod status;
/// Tool call and result envelopes.
pub mod tool;
/// Transcript turn and conversation history types.
pub mod turn;

pub use error::{TransportError, TransportErrorKind, VoxlinkError, VoxlinkResult};
pub use event::EngineEvent;
pub use status::{DocumentData, GeoPoint, MissionTask, MotionStatus, SecurityStatus, SemanticMemory};
pub use tool::{ToolCall, ToolResult};
pub use turn::{ChartKind, ChartPayload, ChartPoint, ConversationSession, TranscriptTurn};
