//! Media plumbing for the Voxlink live-session client.
//!
//! Covers the three media concerns the session engine composes:
//!
//! - [`codec`] — stateless PCM encode/decode and base64 chunk framing.
//! - [`playback`] — gapless scheduling of server-pushed audio chunks,
//!   including barge-in flush and a shared gain stage.
//! - [`profile`] — the network-quality to resolution/frame-rate map.
//! - [`video`] — a switchable camera/display frame source.

/// Ambient noise synthesis for focus mode.
pub mod ambient;
/// PCM and JPEG chunk framing.
pub mod codec;
/// Output audio scheduling.
pub mod playback;
/// Adaptive stream profiles.
pub mod profile;
/// Switchable video frame sources.
pub mod video;

pub use codec::{AudioBuffer, MediaChunk, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};
pub use playback::{MonotonicClock, NullSink, PlaybackClock, PlaybackScheduler, PlaybackSink, ScheduledAt};
pub use profile::{classify_link, LinkMetrics, NetworkQuality, StreamProfile};
pub use video::{VideoFeed, VideoSource};
