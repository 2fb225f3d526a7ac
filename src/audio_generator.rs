//! PCM test-signal generators.
//!
//! Deterministic tones, tone sequences, and seeded noise at i16 full scale
//! for exercising the demodulator and decoder without a transmitter on the
//! other end.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Nominal generator amplitude, backed off from full scale.
pub const AMPLITUDE: f64 = 0.9 * i16::MAX as f64;

/// A constant-frequency tone.
pub fn tone(freq_hz: f64, num_samples: usize, sample_rate: f64) -> Vec<i16> {
    let mut phase = 0.0f64;
    let step = TAU * freq_hz / sample_rate;
    (0..num_samples)
        .map(|_| {
            let s = (AMPLITUDE * phase.sin()) as i16;
            phase += step;
            if phase > TAU {
                phase -= TAU;
            }
            s
        })
        .collect()
}

/// Phase-continuous sequence of `(freq_hz, duration_ms)` tones.
///
/// Durations accumulate in floating point and each segment is cut at the
/// nearest whole sample, so long sequences do not drift.
pub fn tone_sequence(segments: &[(f64, f64)], sample_rate: f64) -> Vec<i16> {
    let mut out = Vec::new();
    let mut phase = 0.0f64;
    let mut elapsed_ms = 0.0f64;
    let mut emitted = 0usize;
    for &(freq_hz, duration_ms) in segments {
        elapsed_ms += duration_ms;
        let target = (elapsed_ms * sample_rate / 1000.0).round() as usize;
        let step = TAU * freq_hz / sample_rate;
        while emitted < target {
            out.push((AMPLITUDE * phase.sin()) as i16);
            phase += step;
            if phase > TAU {
                phase -= TAU;
            }
            emitted += 1;
        }
    }
    out
}

/// Uniform white noise from a seeded generator.
pub fn noise(num_samples: usize, seed: u64) -> Vec<i16> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..num_samples)
        .map(|_| rng.gen_range(i16::MIN..=i16::MAX))
        .collect()
}
