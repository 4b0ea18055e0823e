use serde::{Deserialize, Serialize};

/// Network health classification derived from connection metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkQuality {
    /// Fast, low-latency link.
    Optimal,
    /// Usable but constrained link.
    Degraded,
    /// Barely usable link.
    Poor,
}

impl NetworkQuality {
    /// Parses a classification label, falling back to `Optimal` for
    /// anything unrecognized.
    pub fn parse(label: &str) -> Self {
        match label {
            "Degraded" => Self::Degraded,
            "Poor" => Self::Poor,
            _ => Self::Optimal,
        }
    }
}

/// The resolution/frame-rate pair chosen for outgoing video.
///
/// Recomputed once per session start; a mid-call network change only
/// affects the next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProfile {
    /// Capture width in pixels.
    pub width: u32,
    /// Capture height in pixels.
    pub height: u32,
    /// Outgoing frames per second.
    pub frame_rate: u32,
}

impl StreamProfile {
    /// Milliseconds between frame-sampler ticks.
    pub fn frame_interval_ms(&self) -> u64 {
        1000 / self.frame_rate.max(1) as u64
    }

    /// The profile for a given network classification.
    pub fn for_quality(quality: NetworkQuality) -> Self {
        match quality {
            NetworkQuality::Optimal => Self {
                width: 640,
                height: 480,
                frame_rate: 5,
            },
            NetworkQuality::Degraded => Self {
                width: 480,
                height: 360,
                frame_rate: 3,
            },
            NetworkQuality::Poor => Self {
                width: 320,
                height: 240,
                frame_rate: 1,
            },
        }
    }
}

/// Raw connection metadata from the platform's link monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    /// Coarse link class, e.g. `4g`, `3g`, `2g`, `slow-2g`.
    pub effective_type: String,
    /// Measured round-trip time in milliseconds.
    pub rtt_ms: u32,
    /// Estimated downlink bandwidth in Mbit/s.
    pub downlink_mbps: f64,
}

/// Classifies link metrics into a [`NetworkQuality`].
///
/// Absent metrics (platform does not expose a link monitor) assume the
/// best. A `4g` label is downgraded when RTT or downlink say otherwise.
pub fn classify_link(metrics: Option<&LinkMetrics>) -> NetworkQuality {
    let Some(m) = metrics else {
        return NetworkQuality::Optimal;
    };
    match m.effective_type.as_str() {
        "4g" => {
            if m.rtt_ms > 150 || m.downlink_mbps < 5.0 {
                NetworkQuality::Degraded
            } else {
                NetworkQuality::Optimal
            }
        }
        "3g" => NetworkQuality::Degraded,
        "2g" | "slow-2g" => NetworkQuality::Poor,
        _ => NetworkQuality::Optimal,
    }
}
