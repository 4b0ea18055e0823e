use crate::codec::AudioBuffer;
use rand::Rng;

/// Cutoff behavior roughly matching a 400 Hz one-pole low-pass, which
/// turns white noise into the deeper rumble used for focus mode.
const LOWPASS_ALPHA: f32 = 0.1;
/// Ambient noise is mixed well below speech level.
const AMBIENT_LEVEL: f32 = 0.15;

/// Synthesizes a loopable brown-noise buffer.
///
/// White noise run through a one-pole low-pass filter and attenuated,
/// so the loop sits under the assistant's voice without masking it.
pub fn brown_noise(seconds: f64, sample_rate: u32) -> AudioBuffer {
    let mut rng = rand::thread_rng();
    let count = (seconds * sample_rate as f64) as usize;
    let mut samples = Vec::with_capacity(count);
    let mut last = 0.0f32;
    for _ in 0..count {
        let white: f32 = rng.gen_range(-1.0..1.0);
        last += (white - last) * LOWPASS_ALPHA;
        samples.push(last * AMBIENT_LEVEL);
    }
    AudioBuffer {
        samples,
        sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_bounded_and_sized() {
        let buf = brown_noise(2.0, 24_000);
        assert_eq!(buf.samples.len(), 48_000);
        assert!(buf.samples.iter().all(|s| s.abs() <= AMBIENT_LEVEL + 1e-6));
        // Not silence.
        assert!(buf.samples.iter().any(|s| s.abs() > 1e-4));
    }
}
