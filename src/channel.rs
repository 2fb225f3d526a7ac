//! Channel impairment simulation.
//!
//! Off-air SSTV arrives with noise and with a transmitter clock that never
//! quite matches the receiver's. These helpers reproduce both against a
//! clean sample buffer so the decoder's debouncing and slant correction
//! can be exercised deterministically.

use rand::Rng;
use rand_distr::StandardNormal;

/// Add white Gaussian noise with the given standard deviation (in i16
/// counts), saturating at full scale.
pub fn add_noise<R: Rng>(samples: &[i16], noise_std: f64, rng: &mut R) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let n: f64 = rng.sample::<f64, _>(StandardNormal);
            (s as f64 + n * noise_std)
                .round()
                .clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}

/// Resample by a constant ratio to model transmitter/receiver clock
/// mismatch: output sample `n` is the input at `n * ratio`, linearly
/// interpolated. A ratio below 1.0 stretches the stream, which the
/// receiver sees as lines arriving slow (positive slant).
pub fn clock_offset(samples: &[i16], ratio: f64) -> Vec<i16> {
    if samples.is_empty() {
        return Vec::new();
    }
    let out_len = ((samples.len() - 1) as f64 / ratio).floor() as usize;
    (0..out_len)
        .map(|n| {
            let pos = n as f64 * ratio;
            let idx = pos as usize;
            let frac = pos - idx as f64;
            let a = samples[idx] as f64;
            let b = samples[(idx + 1).min(samples.len() - 1)] as f64;
            (a + (b - a) * frac).round() as i16
        })
        .collect()
}
