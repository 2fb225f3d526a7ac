//! Acceptance tests for the transmit side: header framing, VIS encoding,
//! tone frequency accuracy, and residue-exact timing.

use slowscan::encoder::{pixel_tone, LEADER_HZ, SYNC_HZ};
use slowscan::errors::EncodeError;
use slowscan::io::{CountingSink, RasterSource, SampleSink};
use slowscan::{AbortHandle, EncoderConfig, Mode, MsQ16, SstvEncoder};

const FS: f64 = 15_000.0;

/// Dominant frequency of a slice by zero-crossing count.
fn dominant_freq(samples: &[i16]) -> f64 {
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] < 0) != (w[1] < 0))
        .count();
    crossings as f64 * FS / (2.0 * samples.len() as f64)
}

/// Sink that records samples and raises the abort flag on first write, so
/// a transmission truncates right after its first scan line.
struct FirstRowOnly {
    samples: Vec<i16>,
    handle: AbortHandle,
}

impl SampleSink for FirstRowOnly {
    fn write_sample(&mut self, sample: i16) -> Result<(), EncodeError> {
        if self.samples.is_empty() {
            self.handle.abort();
        }
        self.samples.push(sample);
        Ok(())
    }
}

fn encode_prefix(mode: Mode) -> Vec<i16> {
    let mut encoder = SstvEncoder::new(EncoderConfig::default());
    let (width, height) = mode.image_size();
    let mut image = RasterSource::solid(width, height, [128, 128, 128]);
    let mut sink = FirstRowOnly {
        samples: Vec::new(),
        handle: encoder.abort_handle(),
    };
    encoder.generate_sstv(mode, &mut image, &mut sink).unwrap();
    sink.samples
}

#[test]
fn scottie_header_is_1900_1200_1900_then_vis() {
    let samples = encode_prefix(Mode::ScottieS1);

    // 300 ms / 10 ms / 300 ms at 15 kHz.
    assert!((dominant_freq(&samples[100..4_400]) - LEADER_HZ as f64).abs() < 20.0);
    // Only 130 usable samples, so zero-crossing resolution is coarse here.
    assert!((dominant_freq(&samples[4_510..4_640]) - SYNC_HZ as f64).abs() < 60.0);
    assert!((dominant_freq(&samples[4_750..9_050]) - LEADER_HZ as f64).abs() < 20.0);
    // VIS start bit.
    assert!((dominant_freq(&samples[9_200..9_550]) - SYNC_HZ as f64).abs() < 45.0);
}

#[test]
fn vis_bits_match_the_mode_table_with_even_parity() {
    for mode in Mode::ALL {
        let Some(vis) = mode.vis_code() else {
            continue;
        };
        let samples = encode_prefix(mode);

        // VIS slots are 30 ms (450 samples) from 610 ms in:
        // start, 8 data bits, parity, stop.
        let slot = |index: usize| {
            let start = 9_150 + index * 450;
            dominant_freq(&samples[start + 60..start + 390])
        };

        assert!((slot(0) - 1200.0).abs() < 45.0, "{mode}: start bit");
        assert!((slot(10) - 1200.0).abs() < 45.0, "{mode}: stop bit");

        let mut code = 0u8;
        for bit in 0..8 {
            let freq = slot(1 + bit);
            let one = (freq - 1100.0).abs() < (freq - 1300.0).abs();
            if one {
                code |= 1 << bit;
            }
        }
        assert_eq!(code, vis, "{mode}: decoded VIS code");
        assert_eq!(Mode::from_vis(code), Some(mode), "{mode}: reference table");

        let parity_freq = slot(9);
        let parity = (parity_freq - 1100.0).abs() < (parity_freq - 1300.0).abs();
        assert_eq!(
            (code.count_ones() + parity as u32) % 2,
            0,
            "{mode}: even parity"
        );
    }
}

#[test]
fn pixel_tones_are_linear_between_1500_and_2300() {
    let mut encoder = SstvEncoder::new(EncoderConfig::default());

    for (value, expected, tolerance) in [(0u8, 1500.0, 1.0), (128, 1900.0, 1.0), (255, 2297.0, 2.0)]
    {
        let mut sink = slowscan::io::BufferSink::new();
        encoder
            .generate_tone(pixel_tone(value), MsQ16::from_ms(1000), &mut sink)
            .unwrap();
        let measured = dominant_freq(&sink.samples);
        assert!(
            (measured - expected).abs() <= tolerance + 0.6,
            "value {value}: measured {measured:.1} Hz, expected {expected}"
        );
    }
}

#[test]
fn cumulative_tone_timing_never_drifts_a_sample() {
    let mut encoder = SstvEncoder::new(EncoderConfig::default());
    let mut sink = CountingSink::default();

    // Awkward fractional durations, the kind a pixel clock produces.
    let durations: Vec<u32> = (0..600)
        .map(|n| 10_000 + (n * 7_919) % 50_000) // raw Q16.16 milliseconds
        .collect();

    let mut expected = 0.0f64;
    for &raw in &durations {
        let duration = MsQ16::from_raw(raw);
        encoder.generate_tone(1700, duration, &mut sink).unwrap();
        expected += FS * raw as f64 / 65_536.0 / 1000.0;
    }

    assert!(
        (sink.count as f64 - expected).abs() < 1.0,
        "emitted {} samples, expected {expected:.3}",
        sink.count
    );
}
