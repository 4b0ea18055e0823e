use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use voxlink_core::{VoxlinkError, VoxlinkResult};

/// Sample rate the remote service accepts for captured audio.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;
/// Sample rate of audio chunks the remote service pushes back.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// A small, time-ordered unit of audio or image data streamed over the
/// open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    /// Base64-encoded payload.
    pub data: String,
    /// MIME tag, e.g. `audio/pcm;rate=16000` or `image/jpeg`.
    pub mime_type: String,
}

/// A decoded block of mono PCM audio ready for playback scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Normalized samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Samples per second.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Playback duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Converts one capture frame of 32-bit float samples into a base64
/// PCM chunk tagged for the input sample rate.
pub fn encode_pcm_chunk(samples: &[f32]) -> MediaChunk {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    MediaChunk {
        data: B64.encode(&bytes),
        mime_type: format!("audio/pcm;rate={INPUT_SAMPLE_RATE}"),
    }
}

/// Decodes a base64 16-bit PCM chunk into a playback buffer at the
/// given sample rate.
pub fn decode_pcm_chunk(data: &str, sample_rate: u32) -> VoxlinkResult<AudioBuffer> {
    let bytes = B64
        .decode(data)
        .map_err(|e| VoxlinkError::Media(format!("invalid base64 audio chunk: {e}")))?;
    if bytes.len() % 2 != 0 {
        return Err(VoxlinkError::Media(format!(
            "odd PCM byte count: {}",
            bytes.len()
        )));
    }
    let mut samples = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let v = i16::from_le_bytes([pair[0], pair[1]]);
        samples.push(v as f32 / 32768.0);
    }
    Ok(AudioBuffer {
        samples,
        sample_rate,
    })
}

/// Wraps an encoded JPEG frame into a realtime image chunk.
pub fn jpeg_chunk(frame: &[u8]) -> MediaChunk {
    MediaChunk {
        data: B64.encode(frame),
        mime_type: "image/jpeg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_chunk_carries_input_rate_tag() {
        let chunk = encode_pcm_chunk(&[0.0, 0.5, -0.5]);
        assert_eq!(chunk.mime_type, "audio/pcm;rate=16000");
        assert!(!chunk.data.is_empty());
    }

    #[test]
    fn encode_clamps_out_of_range_samples() {
        let chunk = encode_pcm_chunk(&[2.0, -2.0]);
        let decoded = decode_pcm_chunk(&chunk.data, INPUT_SAMPLE_RATE).unwrap();
        assert!(decoded.samples[0] > 0.99);
        assert!(decoded.samples[1] < -0.99);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_pcm_chunk("not base64!!!", OUTPUT_SAMPLE_RATE).is_err());
        // Three bytes is a valid base64 payload but an invalid PCM one.
        let odd = B64.encode([1u8, 2, 3]);
        assert!(decode_pcm_chunk(&odd, OUTPUT_SAMPLE_RATE).is_err());
    }

    #[test]
    fn buffer_duration_matches_sample_count() {
        let buf = AudioBuffer {
            samples: vec![0.0; OUTPUT_SAMPLE_RATE as usize],
            sample_rate: OUTPUT_SAMPLE_RATE,
        };
        assert!((buf.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jpeg_chunk_mime_tag() {
        let chunk = jpeg_chunk(&[0xFF, 0xD8, 0xFF]);
        assert_eq!(chunk.mime_type, "image/jpeg");
    }
}
