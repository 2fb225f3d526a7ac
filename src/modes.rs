//! SSTV mode catalogue: VIS assignments, geometry, and line timing.
//!
//! Millisecond timings are the published per-mode constants; everything the
//! decoder compares against is pre-scaled to sample counts with eight
//! fractional bits so that line-length arithmetic keeps sub-sample
//! precision without floating point in the per-sample path.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fractional bits carried by every `samples_per_*` quantity.
pub const FRACTION_BITS: u32 = 8;
/// Fixed-point scale of the `samples_per_*` quantities.
pub const SAMPLE_SCALE: u32 = 1 << FRACTION_BITS;

/// Wire-format family. The family fixes the component ordering, the hsync
/// position, and the sample-to-pixel mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// G, B, R with a gap before each component; hsync ends the line.
    Martin,
    /// G, B, then hsync mid-line, then R.
    Scottie,
    /// Hsync, gap, then Y/Cr/Cb/Y covering two image rows per scan line.
    Pd,
    /// R, G, B contiguous; the hsync hides at the end of the line.
    Sc2,
    /// Luma plus alternating chroma, two image rows per pass. Encode only.
    Robot,
    /// Hsync plus a single luma scan. Encode only.
    Bw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    MartinM1,
    MartinM2,
    ScottieS1,
    ScottieS2,
    Pd50,
    Pd90,
    Pd120,
    Pd180,
    Sc2_120,
    Robot36,
    Robot72,
    Bw8,
    Bw12,
    Bw24,
    Bw36,
}

impl Mode {
    pub const ALL: [Mode; 15] = [
        Mode::MartinM1,
        Mode::MartinM2,
        Mode::ScottieS1,
        Mode::ScottieS2,
        Mode::Pd50,
        Mode::Pd90,
        Mode::Pd120,
        Mode::Pd180,
        Mode::Sc2_120,
        Mode::Robot36,
        Mode::Robot72,
        Mode::Bw8,
        Mode::Bw12,
        Mode::Bw24,
        Mode::Bw36,
    ];

    /// Modes the receiver can classify and decode. Robot and BW modes are
    /// transmit-only: their line structure carries no mapping the decoder
    /// implements.
    pub const DECODABLE: [Mode; 9] = [
        Mode::MartinM1,
        Mode::MartinM2,
        Mode::ScottieS1,
        Mode::ScottieS2,
        Mode::Pd50,
        Mode::Pd90,
        Mode::Pd120,
        Mode::Pd180,
        Mode::Sc2_120,
    ];

    pub fn family(self) -> Family {
        match self {
            Mode::MartinM1 | Mode::MartinM2 => Family::Martin,
            Mode::ScottieS1 | Mode::ScottieS2 => Family::Scottie,
            Mode::Pd50 | Mode::Pd90 | Mode::Pd120 | Mode::Pd180 => Family::Pd,
            Mode::Sc2_120 => Family::Sc2,
            Mode::Robot36 | Mode::Robot72 => Family::Robot,
            Mode::Bw8 | Mode::Bw12 | Mode::Bw24 | Mode::Bw36 => Family::Bw,
        }
    }

    /// The 8-bit VIS code transmitted ahead of the image. SC2-120 has no
    /// published assignment and cannot be transmitted.
    pub fn vis_code(self) -> Option<u8> {
        match self {
            Mode::MartinM1 => Some(44),
            Mode::MartinM2 => Some(45),
            Mode::ScottieS1 => Some(60),
            Mode::ScottieS2 => Some(61),
            Mode::Pd50 => Some(93),
            Mode::Pd90 => Some(94),
            Mode::Pd120 => Some(95),
            Mode::Pd180 => Some(97),
            Mode::Robot36 => Some(8),
            Mode::Robot72 => Some(12),
            Mode::Bw8 => Some(2),
            Mode::Bw12 => Some(6),
            Mode::Bw24 => Some(10),
            Mode::Bw36 => Some(14),
            Mode::Sc2_120 => None,
        }
    }

    pub fn from_vis(code: u8) -> Option<Mode> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.vis_code() == Some(code))
    }

    /// Image geometry as delivered to a pixel sink: width and total image
    /// rows (PD and Robot modes carry two image rows per scan line).
    pub fn image_size(self) -> (u16, u16) {
        match self {
            Mode::MartinM1 => (320, 256),
            Mode::MartinM2 => (160, 256),
            Mode::ScottieS1 => (320, 256),
            Mode::ScottieS2 => (160, 256),
            Mode::Pd50 | Mode::Pd90 => (320, 240),
            Mode::Pd120 | Mode::Pd180 => (640, 480),
            Mode::Sc2_120 => (320, 256),
            Mode::Robot36 | Mode::Robot72 => (320, 240),
            Mode::Bw8 | Mode::Bw12 => (160, 120),
            Mode::Bw24 | Mode::Bw36 => (320, 240),
        }
    }

    /// Scan lines per frame as the line-sync state machine counts them.
    pub fn scan_lines(self) -> u16 {
        let (_, rows) = self.image_size();
        match self.family() {
            Family::Pd | Family::Robot => rows / 2,
            _ => rows,
        }
    }

    pub fn hsync_ms(self) -> f64 {
        match self {
            Mode::MartinM1 | Mode::MartinM2 => 4.862,
            Mode::ScottieS1 | Mode::ScottieS2 => 9.0,
            Mode::Pd50 | Mode::Pd90 | Mode::Pd120 | Mode::Pd180 => 20.0,
            Mode::Sc2_120 => 5.0,
            Mode::Robot36 => 7.5,
            Mode::Robot72 => 9.0,
            Mode::Bw8 => 10.0,
            Mode::Bw12 => 7.0,
            Mode::Bw24 | Mode::Bw36 => 12.0,
        }
    }

    pub fn colour_gap_ms(self) -> f64 {
        match self {
            Mode::MartinM1 | Mode::MartinM2 => 0.572,
            Mode::ScottieS1 | Mode::ScottieS2 => 1.5,
            Mode::Pd50 | Mode::Pd90 | Mode::Pd120 | Mode::Pd180 => 2.08,
            Mode::Sc2_120 => 0.0,
            Mode::Robot36 => 4.5,
            Mode::Robot72 => 6.0,
            Mode::Bw8 | Mode::Bw12 | Mode::Bw24 | Mode::Bw36 => 0.0,
        }
    }

    /// Duration of one colour component scan across the full width.
    pub fn colour_line_ms(self) -> f64 {
        match self {
            Mode::MartinM1 => 146.432,
            Mode::MartinM2 => 73.216,
            Mode::ScottieS1 => 138.240,
            Mode::ScottieS2 => 88.064,
            Mode::Pd50 => 91.520,
            Mode::Pd90 => 170.240,
            Mode::Pd120 => 121.600,
            Mode::Pd180 => 183.040,
            Mode::Sc2_120 => 156.0,
            Mode::Robot36 => 90.0,
            Mode::Robot72 => 138.0,
            Mode::Bw8 => 56.0,
            Mode::Bw12 => 93.0,
            Mode::Bw24 => 88.0,
            Mode::Bw36 => 138.0,
        }
    }

    /// Mean scan-line period, hsync and gaps included.
    pub fn line_ms(self) -> f64 {
        let c = self.colour_line_ms();
        let g = self.colour_gap_ms();
        let h = self.hsync_ms();
        match self.family() {
            Family::Martin => 3.0 * c + 4.0 * g + h,
            Family::Scottie => 3.0 * c + 3.0 * g + h,
            Family::Pd => 4.0 * c + g + h,
            Family::Sc2 => 3.0 * c + h,
            // Luma plus (on average) one full-width chroma at half rate.
            Family::Robot => h + 3.0 + c + g + c / 2.0,
            Family::Bw => h + c,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::MartinM1 => "martin_m1",
            Mode::MartinM2 => "martin_m2",
            Mode::ScottieS1 => "scottie_s1",
            Mode::ScottieS2 => "scottie_s2",
            Mode::Pd50 => "pd_50",
            Mode::Pd90 => "pd_90",
            Mode::Pd120 => "pd_120",
            Mode::Pd180 => "pd_180",
            Mode::Sc2_120 => "sc2_120",
            Mode::Robot36 => "robot_36",
            Mode::Robot72 => "robot_72",
            Mode::Bw8 => "bw_8",
            Mode::Bw12 => "bw_12",
            Mode::Bw24 => "bw_24",
            Mode::Bw36 => "bw_36",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-mode timing quantized to a sample rate, all values carrying
/// [`FRACTION_BITS`] fractional bits.
#[derive(Debug, Clone, Copy)]
pub struct ModeTiming {
    pub mode: Mode,
    pub width: u16,
    pub scan_lines: u16,
    pub samples_per_line: u32,
    pub samples_per_colour_line: u32,
    pub samples_per_colour_gap: u32,
    pub samples_per_hsync: u32,
    pub samples_per_pixel: u32,
}

impl ModeTiming {
    pub fn new(mode: Mode, sample_rate: f64) -> Self {
        let per_ms = SAMPLE_SCALE as f64 * sample_rate / 1000.0;
        let (width, _) = mode.image_size();

        // Martin and Scottie syncs land between gap-prefixed components, so
        // their repeating colour period includes the gap; PD and SC2
        // components pack back to back.
        let colour_period_ms = match mode.family() {
            Family::Martin | Family::Scottie => mode.colour_line_ms() + mode.colour_gap_ms(),
            _ => mode.colour_line_ms(),
        };

        ModeTiming {
            mode,
            width,
            scan_lines: mode.scan_lines(),
            samples_per_line: (per_ms * mode.line_ms()) as u32,
            samples_per_colour_line: (per_ms * colour_period_ms) as u32,
            samples_per_colour_gap: (per_ms * mode.colour_gap_ms()) as u32,
            samples_per_hsync: (per_ms * mode.hsync_ms()) as u32,
            samples_per_pixel: (per_ms * mode.colour_line_ms() / width as f64) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn vis_codes_match_the_published_table() {
        let expected = [
            (Mode::Robot36, 8),
            (Mode::Robot72, 12),
            (Mode::MartinM1, 44),
            (Mode::MartinM2, 45),
            (Mode::ScottieS1, 60),
            (Mode::ScottieS2, 61),
            (Mode::Pd50, 93),
            (Mode::Pd90, 94),
            (Mode::Pd120, 95),
            (Mode::Pd180, 97),
            (Mode::Bw8, 2),
            (Mode::Bw12, 6),
            (Mode::Bw24, 10),
            (Mode::Bw36, 14),
        ];
        for (mode, code) in expected {
            assert_eq!(mode.vis_code(), Some(code), "{mode}");
            assert_eq!(Mode::from_vis(code), Some(mode));
        }
        assert_eq!(Mode::Sc2_120.vis_code(), None);
    }

    #[test]
    fn line_periods_are_distinct_beyond_the_match_window() {
        // Classification uses a +/-1% window on the line period, so every
        // pair of decodable modes must be more than 2% apart.
        for a in Mode::DECODABLE {
            for b in Mode::DECODABLE {
                if a == b {
                    continue;
                }
                let ratio = a.line_ms() / b.line_ms();
                assert!(
                    ratio < 0.98 || ratio > 1.02,
                    "{a} and {b} are only {ratio:.4} apart"
                );
            }
        }
    }

    #[test]
    fn martin_m1_timing_at_15k() {
        let t = ModeTiming::new(Mode::MartinM1, 15000.0);
        // 3 * 146.432 + 4 * 0.572 + 4.862 = 446.446 ms
        let expected = 446.446 * 15.0 * SAMPLE_SCALE as f64;
        assert_abs_diff_eq!(t.samples_per_line as f64, expected, epsilon = 1.0);
        assert_eq!(t.width, 320);
        assert_eq!(t.scan_lines, 256);
    }

    #[test]
    fn pd_modes_scan_half_their_rows() {
        assert_eq!(Mode::Pd120.image_size(), (640, 480));
        assert_eq!(Mode::Pd120.scan_lines(), 240);
        assert_eq!(Mode::Pd50.scan_lines(), 120);
    }

    #[test]
    fn sample_quantities_carry_the_fixed_point_scale() {
        let t = ModeTiming::new(Mode::ScottieS1, 15000.0);
        let unscaled = t.samples_per_hsync / SAMPLE_SCALE;
        // 9 ms at 15 kHz is 135 samples.
        assert_eq!(unscaled, 135);
    }
}
