//! SSTV receive state machine.
//!
//! The decoder never inspects the VIS header: mode identification rides on
//! the hsync cadence alone, which makes it robust to joining a
//! transmission mid-frame. A debounced detector turns the frequency stream
//! into sync events; the interval between events classifies the mode,
//! confirms it, and then paces a sample-to-pixel mapping that tolerates
//! transmitter clock drift by tracking the observed line period.

use crate::color::{rgb_to_rgb565, ycrcb_to_rgb565};
use crate::config::DecoderConfig;
use crate::dsp::demodulation::FrequencyDemodulator;
use crate::errors::{DecodeError, Result};
use crate::io::{PixelSink, SampleSource};
use crate::logging::SignalLogger;
use crate::modes::{Family, Mode, ModeTiming, SAMPLE_SCALE};

/// Frequencies below this are treated as sync-level by the hsync detector.
pub const SYNC_THRESHOLD_HZ: u16 = 1400;
/// Consecutive sub-threshold samples required to confirm an hsync.
pub const SYNC_CONFIRM_COUNT: u32 = 40;
/// Consecutive bad line lengths before a candidate mode is abandoned.
const CONFIRM_MISS_LIMIT: u32 = 4;

/// Channel index marking non-image regions (hsync, gaps).
pub const BLANK: u8 = 4;

const MAX_WIDTH: usize = 640;

/// Brightness of a pixel tone: 1500 Hz is black, 2300 Hz white.
pub fn frequency_to_brightness(freq: u16) -> u8 {
    let brightness = (freq as i32 - 1500) * 256 / 800;
    brightness.clamp(0, 255) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Detect,
    Confirm,
}

/// Debounced hsync detector.
///
/// Arms on a falling edge through [`SYNC_THRESHOLD_HZ`] and fires once the
/// tone has stayed low for [`SYNC_CONFIRM_COUNT`] net samples, so a noise
/// spike can neither trigger nor suppress a sync on its own.
#[derive(Debug, Clone)]
pub struct SyncDetector {
    state: SyncState,
    counter: u32,
    last_sample: u16,
    last_hsync_sample: u64,
}

impl SyncDetector {
    pub fn new() -> Self {
        SyncDetector {
            state: SyncState::Detect,
            counter: 0,
            last_sample: 0,
            last_hsync_sample: 0,
        }
    }

    /// Feed one frequency sample; returns the interval since the previous
    /// sync event when this sample completes one.
    pub fn update(&mut self, freq: u16, sample_number: u64) -> Option<u64> {
        let mut event = None;
        match self.state {
            SyncState::Detect => {
                if freq < SYNC_THRESHOLD_HZ && self.last_sample >= SYNC_THRESHOLD_HZ {
                    // The arming edge is the first sample of the pulse.
                    self.state = SyncState::Confirm;
                    self.counter = 1;
                }
            }
            SyncState::Confirm => {
                if freq < SYNC_THRESHOLD_HZ {
                    self.counter += 1;
                } else if self.counter > 0 {
                    self.counter -= 1;
                }
                if self.counter == SYNC_CONFIRM_COUNT {
                    event = Some(sample_number - self.last_hsync_sample);
                    self.last_hsync_sample = sample_number;
                    self.state = SyncState::Detect;
                }
            }
        }
        self.last_sample = freq;
        event
    }

    pub fn reset(&mut self) {
        self.state = SyncState::Detect;
        self.counter = 0;
    }
}

impl Default for SyncDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    DetectSync,
    ConfirmSync,
    DecodeLine,
}

/// One decoded component sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSample {
    pub x: u16,
    pub y: u16,
    /// Channel index; meaning depends on the mode family (RGB for Martin,
    /// Scottie and SC2; Y/Cr/Cb/Y-odd for PD).
    pub colour: u8,
    pub value: u8,
}

/// Outcome of feeding one sample to the decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeStep {
    pub pixel: Option<PixelSample>,
    /// Scan line that just finished, if one did.
    pub completed_line: Option<u16>,
    pub image_complete: bool,
}

/// SSTV decoder bound to an input sample rate.
///
/// Reusable across transmissions: after an image completes or times out
/// the machine re-arms detection by itself.
pub struct SstvDecoder {
    config: DecoderConfig,
    demod: FrequencyDemodulator,
    sync: SyncDetector,
    timings: Vec<ModeTiming>,
    timeout_samples: u64,

    state: DecoderState,
    current: Option<ModeTiming>,
    /// Drift-tracked line period, scaled by [`SAMPLE_SCALE`].
    mean_samples_per_line: u32,
    confirm_misses: u32,
    confirmed_sync_sample: u64,
    sample_number: u64,
    /// Position inside the frame, scaled by [`SAMPLE_SCALE`].
    image_sample: i64,
    sync_timeout: u64,

    pixel_accumulator: u32,
    pixel_count: u32,
    last_x: u16,
    last_y: u16,
    last_colour: u8,

    /// Component values of the line being assembled.
    line: [[u8; 4]; MAX_WIDTH],
    logger: SignalLogger,
}

impl SstvDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        let timings = Mode::DECODABLE
            .iter()
            .map(|&mode| ModeTiming::new(mode, config.sample_rate))
            .collect();
        let demod = FrequencyDemodulator::new(config.sample_rate);
        let timeout_samples = (config.timeout_secs as f64 * config.sample_rate) as u64;
        let logger = SignalLogger::new(config.log.clone());
        SstvDecoder {
            config,
            demod,
            sync: SyncDetector::new(),
            timings,
            timeout_samples,
            state: DecoderState::DetectSync,
            current: None,
            mean_samples_per_line: 0,
            confirm_misses: 0,
            confirmed_sync_sample: 0,
            sample_number: 0,
            image_sample: 0,
            sync_timeout: 0,
            pixel_accumulator: 0,
            pixel_count: 0,
            last_x: 0,
            last_y: 0,
            last_colour: BLANK,
            line: [[0; 4]; MAX_WIDTH],
            logger,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// The classified mode once detection has a candidate.
    pub fn mode(&self) -> Option<Mode> {
        self.current.map(|t| t.mode)
    }

    /// Current drift-tracked line period, scaled by [`SAMPLE_SCALE`].
    pub fn mean_samples_per_line(&self) -> u32 {
        self.mean_samples_per_line
    }

    pub fn logger(&self) -> &SignalLogger {
        &self.logger
    }

    /// Feed one audio sample through demodulation and the state machine.
    pub fn process_audio_sample(&mut self, sample: i16) -> DecodeStep {
        let freq = self.demod.process(sample);
        self.process_frequency_sample(freq)
    }

    /// Feed one already-demodulated frequency sample (Hz).
    pub fn process_frequency_sample(&mut self, freq: u16) -> DecodeStep {
        let sync_event = self.sync.update(freq, self.sample_number);

        let step = match self.state {
            DecoderState::DetectSync => {
                if let Some(line_length) = sync_event {
                    self.classify(line_length);
                }
                DecodeStep::default()
            }
            DecoderState::ConfirmSync => {
                if let Some(line_length) = sync_event {
                    self.confirm(line_length);
                }
                DecodeStep::default()
            }
            DecoderState::DecodeLine => self.decode_line_sample(freq, sync_event),
        };

        self.sample_number += 1;
        step
    }

    /// Pull samples from `source` until one image has been decoded into
    /// `sink`.
    ///
    /// The sink is opened when the first line completes, written one row
    /// at a time (two for PD modes), and closed when the frame is done.
    /// The stream ending first surfaces as [`DecodeError::SourceExhausted`].
    pub fn decode_image(
        &mut self,
        source: &mut dyn SampleSource,
        sink: &mut dyn PixelSink,
    ) -> Result<()> {
        let mut opened = false;
        let mut row565 = [0u16; MAX_WIDTH];

        loop {
            let Some(sample) = source.next_sample()? else {
                return Err(DecodeError::SourceExhausted.into());
            };
            let step = self.process_audio_sample(sample);

            if let Some(px) = step.pixel {
                if (px.x as usize) < MAX_WIDTH && px.colour < BLANK {
                    self.line[px.x as usize][px.colour as usize] = px.value;
                }
            }

            if let Some(row) = step.completed_line {
                if let Some(t) = self.current {
                    let family = t.mode.family();
                    let width = t.width as usize;
                    let image_height = match family {
                        Family::Pd => t.scan_lines * 2,
                        _ => t.scan_lines,
                    };
                    if !opened {
                        sink.open(t.width, image_height)?;
                        opened = true;
                    }
                    match family {
                        Family::Pd => {
                            for (x, out) in row565[..width].iter_mut().enumerate() {
                                let [luma, cr, cb, _] = self.line[x];
                                *out = ycrcb_to_rgb565(luma, cr, cb);
                            }
                            sink.write_row(&row565[..width], row * 2, t.width, image_height)?;
                            for (x, out) in row565[..width].iter_mut().enumerate() {
                                let [_, cr, cb, luma_odd] = self.line[x];
                                *out = ycrcb_to_rgb565(luma_odd, cr, cb);
                            }
                            sink.write_row(&row565[..width], row * 2 + 1, t.width, image_height)?;
                        }
                        _ => {
                            for (x, out) in row565[..width].iter_mut().enumerate() {
                                let [r, g, b, _] = self.line[x];
                                *out = rgb_to_rgb565(r, g, b);
                            }
                            sink.write_row(&row565[..width], row, t.width, image_height)?;
                        }
                    }
                }
            }

            if step.image_complete {
                if opened {
                    sink.close()?;
                }
                return Ok(());
            }
        }
    }

    /// `true` when `line_length` (in whole samples) is within one percent
    /// of a scaled nominal line period.
    fn within_window(line_length: u64, samples_per_line: u32) -> bool {
        let spl = samples_per_line as u64;
        let scale = SAMPLE_SCALE as u64;
        line_length > 99 * spl / (100 * scale) && line_length < 101 * spl / (100 * scale)
    }

    fn classify(&mut self, line_length: u64) {
        let mut best: Option<(ModeTiming, u64)> = None;
        for t in &self.timings {
            if Self::within_window(line_length, t.samples_per_line) {
                let error = (line_length as i64 * SAMPLE_SCALE as i64
                    - t.samples_per_line as i64)
                    .unsigned_abs();
                if best.map_or(true, |(_, e)| error < e) {
                    best = Some((*t, error));
                }
            }
        }
        if let Some((t, error)) = best {
            self.logger.debug(
                "MODE",
                format!(
                    "candidate {} (line {} samples, error {})",
                    t.mode,
                    line_length,
                    error as f64 / SAMPLE_SCALE as f64
                ),
            );
            self.mean_samples_per_line = t.samples_per_line;
            self.current = Some(t);
            self.confirm_misses = 0;
            self.state = DecoderState::ConfirmSync;
        }
    }

    fn confirm(&mut self, line_length: u64) {
        let Some(t) = self.current else {
            self.state = DecoderState::DetectSync;
            return;
        };
        if Self::within_window(line_length, t.samples_per_line) {
            self.logger
                .info("MODE", format!("locked {} at line {}", t.mode, line_length));
            self.state = DecoderState::DecodeLine;
            self.confirmed_sync_sample = self.sample_number;
            self.pixel_accumulator = 0;
            self.pixel_count = 0;
            self.last_x = 0;
            self.last_y = 0;
            self.last_colour = BLANK;
            self.image_sample = 0;
            self.sync_timeout = self.timeout_samples;
        } else {
            self.confirm_misses += 1;
            if self.confirm_misses == CONFIRM_MISS_LIMIT {
                self.logger.debug("MODE", "candidate rejected");
                self.state = DecoderState::DetectSync;
            }
        }
    }

    fn decode_line_sample(&mut self, freq: u16, sync_event: Option<u64>) -> DecodeStep {
        let mut step = DecodeStep::default();
        let Some(t) = self.current else {
            self.state = DecoderState::DetectSync;
            return step;
        };

        let (x, y, colour) = sample_to_pixel(&t, self.mean_samples_per_line, self.image_sample);

        if colour < BLANK {
            if x != self.last_x || colour != self.last_colour {
                if self.pixel_count > 0 && self.last_colour < BLANK {
                    step.pixel = Some(PixelSample {
                        x: self.last_x,
                        y: self.last_y,
                        colour: self.last_colour,
                        value: (self.pixel_accumulator / self.pixel_count) as u8,
                    });
                }
                if y > self.last_y {
                    step.completed_line = Some(self.last_y);
                }
                self.pixel_accumulator = 0;
                self.pixel_count = 0;
                self.last_x = x;
                self.last_y = y;
                self.last_colour = colour;
            }
        } else if self.pixel_count > 0 && self.last_colour < BLANK {
            // Entering a gap or hsync closes out the pixel in flight.
            step.pixel = Some(PixelSample {
                x: self.last_x,
                y: self.last_y,
                colour: self.last_colour,
                value: (self.pixel_accumulator / self.pixel_count) as u8,
            });
            self.pixel_accumulator = 0;
            self.pixel_count = 0;
            self.last_colour = BLANK;
        }

        if y >= t.scan_lines {
            self.logger.info("FRAME", format!("image complete ({})", t.mode));
            self.state = DecoderState::DetectSync;
            self.sync.reset();
            step.image_complete = true;
            return step;
        }

        if let Some(line_length) = sync_event {
            if Self::within_window(line_length, t.samples_per_line) {
                // Any good hsync keeps the image alive.
                self.sync_timeout = self.timeout_samples;
                let since_confirmed = self.sample_number - self.confirmed_sync_sample;
                let num_lines = (SAMPLE_SCALE as u64 * since_confirmed) as f64
                    / t.samples_per_line as f64;
                let num_lines = num_lines.round() as u64;
                if self.config.slant_correction && num_lines > 0 {
                    let measured = (SAMPLE_SCALE as u64 * since_confirmed / num_lines) as u32;
                    self.mean_samples_per_line = self.mean_samples_per_line
                        - (self.mean_samples_per_line >> 2)
                        + (measured >> 2);
                    self.logger.trace(
                        "SLANT",
                        format!(
                            "line period {} after {} lines",
                            self.mean_samples_per_line as f64 / SAMPLE_SCALE as f64,
                            num_lines
                        ),
                    );
                }
            }
        } else {
            self.sync_timeout = self.sync_timeout.saturating_sub(1);
            if self.sync_timeout == 0 {
                self.logger.warn("SYNC", "sync lost, re-arming detection");
                self.state = DecoderState::DetectSync;
                self.sync.reset();
                return step;
            }
        }

        if colour < BLANK {
            self.pixel_accumulator += frequency_to_brightness(freq) as u32;
            self.pixel_count += 1;
        }
        self.image_sample += SAMPLE_SCALE as i64;

        step
    }
}

/// Map a frame-relative sample offset to image coordinates.
///
/// Returns `(x, y, colour)` where `colour` is [`BLANK`] for offsets that
/// fall inside an hsync or gap.
fn sample_to_pixel(t: &ModeTiming, mean_samples_per_line: u32, image_sample: i64) -> (u16, u16, u8) {
    let mean = mean_samples_per_line as i64;
    let scl = t.samples_per_colour_line as i64;
    let spp = t.samples_per_pixel as i64;
    let hsync = t.samples_per_hsync as i64;
    if mean <= 0 {
        return (0, 0, BLANK);
    }

    let (x, y, colour) = match t.mode.family() {
        Family::Martin => {
            // Wire order G, B, R maps to channels 1, 2, 0; the fourth band
            // is the trailing gap and hsync.
            const CHANNEL: [u8; 4] = [1, 2, 0, BLANK];
            let y = image_sample / mean;
            let mut rem = image_sample - y * mean;
            let band = ((rem / scl) as usize).min(3);
            rem -= band as i64 * scl;
            (
                (rem / spp) as u16,
                y as u16,
                CHANNEL[band],
            )
        }
        Family::Scottie => {
            // The hsync sits between blue and red, so re-anchor to the
            // next full line by skipping the leading red period.
            const CHANNEL: [u8; 4] = [1, 2, 0, BLANK];
            let mut s = image_sample - scl - hsync;
            if s < 0 {
                return (0, 0, BLANK);
            }
            let y = s / mean;
            s -= y * mean;
            let band;
            if s < 2 * scl {
                band = (s / scl) as usize;
                s -= band as i64 * scl;
            } else {
                s -= 2 * scl + hsync;
                if s < 0 {
                    return (0, 0, BLANK);
                }
                band = (2 + s / scl) as usize;
            }
            ((s / spp) as u16, y as u16, CHANNEL[band.min(3)])
        }
        Family::Pd => {
            // Four contiguous bands: Y (even row), Cr, Cb, Y (odd row).
            let mut s = image_sample - hsync;
            if s < 0 {
                return (0, 0, BLANK);
            }
            let y = s / mean;
            s -= y * mean;
            let band = ((s / scl) as usize).min(4);
            s -= band as i64 * scl;
            let colour = if band >= 4 { BLANK } else { band as u8 };
            ((s / spp) as u16, y as u16, colour)
        }
        Family::Sc2 => {
            let y = image_sample / mean;
            let mut s = image_sample - y * mean;
            let band = (s / scl).min(3);
            if band >= 3 {
                return (0, y as u16, BLANK);
            }
            s -= band * scl;
            ((s / spp) as u16, y as u16, band as u8)
        }
        // Robot and BW carry no receive mapping.
        Family::Robot | Family::Bw => (0, 0, BLANK),
    };

    // The fractional sliver past a band's last pixel is not image content.
    if colour < BLANK && x >= t.width {
        return (x, y, BLANK);
    }
    (x, y, colour)
}
