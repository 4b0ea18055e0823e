//! The live-session engine for the Voxlink client.
//!
//! One [`SessionEngine`] owns at most one open session at a time: it
//! acquires local media, connects over the transport with bounded
//! retry, pumps microphone audio and sampled video frames out, demuxes
//! inbound server events, schedules returned audio gaplessly, and
//! round-trips tool calls — all reported to the embedding layer as
//! [`voxlink_core::EngineEvent`]s.
//!
//! # Main entry points
//!
//! - [`SessionEngine`] — the lifecycle state machine and its operations.
//! - [`SessionConfig`] — everything one `start()` needs.
//! - [`ws::WsTransport`] — the production WebSocket transport.
//! - [`FileHistoryStore`] / [`FileSnapshotStore`] — on-disk persistence.

/// Local media device boundary.
pub mod capture;
/// Per-start session configuration.
pub mod config;
/// The session engine itself.
pub mod engine;
/// Conversation history and resume-snapshot stores.
pub mod history;
/// System-instruction assembly.
pub mod instructions;
/// Wire-facing message and event types.
pub mod protocol;
/// Session-local access control.
pub mod security;
/// Ambient sensor boundary.
pub mod sensors;
/// Transport trait and the connect retry loop.
pub mod transport;
/// WebSocket transport implementation.
pub mod ws;

pub use capture::{CaptureRequest, CapturedMedia, MediaDevices};
pub use config::SessionConfig;
pub use engine::{EngineDeps, Lifecycle, SessionEngine};
pub use history::{FileHistoryStore, FileSnapshotStore, HistoryStore, SnapshotStore};
pub use instructions::build_system_instruction;
pub use protocol::{ClientMessage, ServerEvent, SessionSetup};
pub use security::SecurityContext;
pub use sensors::{SensorProvider, SensorSnapshot, StaticSensorProvider};
pub use transport::{Connector, LiveConnection, LiveTransport, OutboundSink, RetryPolicy};
pub use ws::WsTransport;
