//! Audio to instantaneous frequency.
//!
//! The front end turns real PCM into an analytic signal without a Hilbert
//! transform or any multiplier: mixing by Fs/4 only needs the cyclic
//! sequences {1, 0, -1, 0} and {0, -1, 0, 1}, the half-band filter then
//! removes the mirror image, and the inverse sequences shift the band back.
//! CORDIC converts each complex sample to phase, and the per-sample phase
//! difference is the instantaneous frequency.

use num_complex::Complex;

use super::cordic::rect_to_polar;
use super::filters::HalfBandFilter;

/// Lower clamp of the frequency estimate in Hz.
pub const FREQ_FLOOR_HZ: i32 = 1000;
/// Upper clamp of the frequency estimate in Hz.
pub const FREQ_CEIL_HZ: i32 = 2500;

/// Streaming frequency demodulator.
///
/// Feed one real sample, get one smoothed frequency estimate in Hz,
/// clamped to the SSTV band.
pub struct FrequencyDemodulator {
    sample_rate: i64,
    ssb_phase: u8,
    filter: HalfBandFilter,
    last_phase: i16,
    smoothed: i32,
}

impl FrequencyDemodulator {
    pub fn new(sample_rate: f64) -> Self {
        FrequencyDemodulator {
            sample_rate: sample_rate.round() as i64,
            ssb_phase: 0,
            filter: HalfBandFilter::new(),
            last_phase: 0,
            smoothed: 0,
        }
    }

    /// Demodulate one sample.
    pub fn process(&mut self, audio: i16) -> u16 {
        self.ssb_phase = (self.ssb_phase + 1) & 3;
        let a = (audio >> 1) as i32;

        // Mix up by Fs/4.
        let shifted = match self.ssb_phase {
            0 => Complex::new(a, 0),
            1 => Complex::new(0, -a),
            2 => Complex::new(-a, 0),
            _ => Complex::new(0, a),
        };

        let f = self.filter.filter(shifted);

        // Mix back down by Fs/4; the image is gone, leaving the analytic
        // signal at the original audio frequency.
        let (i, q) = match self.ssb_phase {
            0 => (-f.im, f.re),
            1 => (-f.re, -f.im),
            2 => (f.im, -f.re),
            _ => (f.re, f.im),
        };

        let (_, phase) = rect_to_polar(i as i16, q as i16);
        let delta = phase.wrapping_sub(self.last_phase) as i64;
        self.last_phase = phase;

        // One full turn per sample corresponds to Fs.
        let hz = ((delta * self.sample_rate) >> 16) as i32;
        // Rounded update; a pure floor parks the fixed point up to 7 Hz
        // below a steady input.
        self.smoothed = ((self.smoothed << 3) + hz - self.smoothed + 4) >> 3;
        self.smoothed.clamp(FREQ_FLOOR_HZ, FREQ_CEIL_HZ) as u16
    }

    pub fn reset(&mut self) {
        self.ssb_phase = 0;
        self.filter.reset();
        self.last_phase = 0;
        self.smoothed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f64, count: usize, fs: f64) -> Vec<i16> {
        (0..count)
            .map(|n| (amplitude * (std::f64::consts::TAU * freq * n as f64 / fs).sin()) as i16)
            .collect()
    }

    fn settled_estimates(freq: f64) -> Vec<u16> {
        let mut demod = FrequencyDemodulator::new(15000.0);
        sine(freq, 28000.0, 1500, 15000.0)
            .into_iter()
            .map(|s| demod.process(s))
            .skip(300)
            .collect()
    }

    #[test]
    fn steady_tone_reads_its_own_frequency() {
        for freq in [1200.0, 1500.0, 1900.0, 2300.0] {
            let out = settled_estimates(freq);
            let mean = out.iter().map(|&v| v as f64).sum::<f64>() / out.len() as f64;
            assert!(
                (mean - freq).abs() < 12.0,
                "tone {freq} Hz read back as {mean:.1} Hz"
            );
            for &v in &out {
                assert!(
                    (v as f64 - freq).abs() < 80.0,
                    "tone {freq} Hz had sample estimate {v}"
                );
            }
        }
    }

    #[test]
    fn silence_clamps_to_the_band_floor() {
        let mut demod = FrequencyDemodulator::new(15000.0);
        let mut last = 0;
        for _ in 0..100 {
            last = demod.process(0);
        }
        assert_eq!(last, FREQ_FLOOR_HZ as u16);
    }

    #[test]
    fn step_between_tones_settles_within_a_sync_pulse() {
        // 1900 -> 1200 must be recognisable well inside the shortest hsync
        // (4.862 ms = 72 samples at 15 kHz).
        let mut demod = FrequencyDemodulator::new(15000.0);
        for s in sine(1900.0, 28000.0, 1000, 15000.0) {
            demod.process(s);
        }
        let mut estimate = 0;
        for (n, s) in sine(1200.0, 28000.0, 200, 15000.0).into_iter().enumerate() {
            estimate = demod.process(s);
            if n == 40 {
                assert!(estimate < 1400, "estimate {estimate} after 40 samples");
            }
        }
        // Image leakage ripples the instantaneous estimate by up to
        // ~65 Hz at the bottom of the band.
        assert!((estimate as i32 - 1200).abs() < 70);
    }

    #[test]
    fn estimate_never_leaves_the_clamp_band() {
        let mut demod = FrequencyDemodulator::new(15000.0);
        for n in 0..5000i32 {
            // Deliberately harsh input: alternating extremes.
            let s = if n % 3 == 0 { i16::MAX } else { i16::MIN };
            let v = demod.process(s);
            assert!((FREQ_FLOOR_HZ as u16..=FREQ_CEIL_HZ as u16).contains(&v));
        }
    }
}
