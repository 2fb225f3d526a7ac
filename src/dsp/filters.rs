//! Half-band low-pass filtering for the complex baseband path.
//!
//! The demodulator mixes real audio up by Fs/4 before filtering, so the
//! filter's job is to pass everything below Fs/4 and knock down the mirror
//! image above it. A half-band FIR puts its transition band exactly there,
//! and the tap set below is chosen so every multiply is a shift-add.

use num_complex::Complex;

/// Symmetric half-band taps, numerators over 32: -1, 0, 9, 16, 9, 0, -1.
const TAPS: usize = 7;

/// Two-channel (I/Q) half-band low-pass filter.
///
/// Unit DC gain, a true null at Nyquist, and no multipliers wider than a
/// shift-add. State is a pair of seven-sample delay lines.
#[derive(Debug, Clone, Default)]
pub struct HalfBandFilter {
    i_line: [i32; TAPS],
    q_line: [i32; TAPS],
}

fn push(line: &mut [i32; TAPS], sample: i32) {
    line.copy_within(1.., 0);
    line[TAPS - 1] = sample;
}

fn tap_sum(line: &[i32; TAPS]) -> i32 {
    (9 * (line[2] + line[4]) + 16 * line[3] - line[0] - line[6]) >> 5
}

impl HalfBandFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one complex sample.
    pub fn filter(&mut self, iq: Complex<i32>) -> Complex<i32> {
        push(&mut self.i_line, iq.re);
        push(&mut self.q_line, iq.im);
        Complex::new(tap_sum(&self.i_line), tap_sum(&self.q_line))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut HalfBandFilter, input: impl Iterator<Item = i32>) -> Vec<i32> {
        input
            .map(|s| filter.filter(Complex::new(s, s)).re)
            .collect()
    }

    #[test]
    fn dc_passes_at_unit_gain() {
        let mut f = HalfBandFilter::new();
        let out = run(&mut f, std::iter::repeat(10000).take(32));
        assert_eq!(*out.last().unwrap(), 10000);
    }

    #[test]
    fn nyquist_is_nulled() {
        let mut f = HalfBandFilter::new();
        let out = run(&mut f, (0..32).map(|n| if n % 2 == 0 { 12000 } else { -12000 }));
        assert_eq!(*out.last().unwrap(), 0);
    }

    #[test]
    fn channels_are_independent() {
        let mut f = HalfBandFilter::new();
        let mut last = Complex::new(0, 0);
        for _ in 0..32 {
            last = f.filter(Complex::new(5000, -5000));
        }
        assert_eq!(last, Complex::new(5000, -5000));
    }

    #[test]
    fn passband_tone_survives() {
        // Fs/10 sits well inside the half-band passband.
        let mut f = HalfBandFilter::new();
        let input: Vec<i32> = (0..200)
            .map(|n| (10000.0 * (std::f64::consts::TAU * n as f64 / 10.0).sin()) as i32)
            .collect();
        let out = run(&mut f, input.iter().copied());
        let peak = out[50..].iter().map(|v| v.abs()).max().unwrap();
        assert!(peak > 9000, "passband tone attenuated to {peak}");
    }
}
