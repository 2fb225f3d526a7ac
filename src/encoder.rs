//! SSTV transmit state machine.
//!
//! A transmission is a fixed tone program: calibration header, VIS code,
//! then the per-family line sequence, every tone a linear function of a
//! pixel value or a fixed sync/gap frequency. The only subtlety is timing:
//! tone durations rarely divide into whole samples, so the fractional
//! remainder of every tone is carried into the next one and cumulative
//! timing stays exact over a full frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::color::rgb_to_ycrcb;
use crate::config::EncoderConfig;
use crate::dsp::nco::Nco;
use crate::errors::{EncodeError, Result};
use crate::fixed::MsQ16;
use crate::io::{PixelSource, SampleSink};
use crate::logging::SignalLogger;
use crate::modes::{Family, Mode};

/// Black level of the pixel tone map in Hz.
pub const BLACK_HZ: u32 = 1500;
/// White level of the pixel tone map in Hz.
pub const WHITE_HZ: u32 = 2300;
/// Hsync and VIS framing frequency in Hz.
pub const SYNC_HZ: u32 = 1200;
/// Calibration leader frequency in Hz.
pub const LEADER_HZ: u32 = 1900;

/// Robot-family porch between hsync and luma, in ms.
const ROBOT_PORCH_MS: f64 = 3.0;

const MAX_WIDTH: usize = 640;

/// Tone frequency for an 8-bit component value.
pub fn pixel_tone(value: u8) -> u32 {
    BLACK_HZ + ((WHITE_HZ - BLACK_HZ) * value as u32) / 256
}

/// Cooperative cancellation handle; the encoder samples the flag between
/// rows and stops cleanly when it is raised.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// SSTV encoder bound to an output sample rate.
pub struct SstvEncoder {
    config: EncoderConfig,
    nco: Nco,
    /// Fractional-sample carry between tones, in Q16.
    residue: u32,
    abort: Arc<AtomicBool>,
    logger: SignalLogger,
    row_luma: [u8; MAX_WIDTH],
    row_luma_odd: [u8; MAX_WIDTH],
    row_cr: [u8; MAX_WIDTH],
    row_cb: [u8; MAX_WIDTH],
}

impl SstvEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        let nco = Nco::new(config.sample_rate);
        let logger = SignalLogger::new(config.log.clone());
        SstvEncoder {
            config,
            nco,
            residue: 0,
            abort: Arc::new(AtomicBool::new(false)),
            logger,
            row_luma: [0; MAX_WIDTH],
            row_luma_odd: [0; MAX_WIDTH],
            row_cr: [0; MAX_WIDTH],
            row_cb: [0; MAX_WIDTH],
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.abort))
    }

    pub fn logger(&self) -> &SignalLogger {
        &self.logger
    }

    /// Encode one image as a complete SSTV transmission.
    pub fn generate_sstv(
        &mut self,
        mode: Mode,
        image: &mut dyn PixelSource,
        sink: &mut dyn SampleSink,
    ) -> Result<()> {
        let vis = mode
            .vis_code()
            .ok_or(EncodeError::UnsupportedMode { mode })?;
        self.abort.store(false, Ordering::Relaxed);

        let (width, height) = mode.image_size();
        self.logger
            .info("FRAME", format!("transmit {mode} {width}x{height}"));

        // Calibration header.
        self.generate_tone(LEADER_HZ, MsQ16::from_ms(300), sink)?;
        self.generate_tone(SYNC_HZ, MsQ16::from_ms(10), sink)?;
        self.generate_tone(LEADER_HZ, MsQ16::from_ms(300), sink)?;
        self.generate_vis(vis, sink)?;

        match mode.family() {
            Family::Martin => self.generate_martin(mode, image, sink)?,
            Family::Scottie => self.generate_scottie(mode, image, sink)?,
            Family::Pd => self.generate_pd(mode, image, sink)?,
            Family::Robot => self.generate_robot(mode, image, sink)?,
            Family::Bw => self.generate_bw(mode, image, sink)?,
            // Unreachable: SC2 has no VIS code.
            Family::Sc2 => {}
        }
        Ok(())
    }

    /// Emit a tone, quantized to whole samples with the fractional part
    /// carried into the next call.
    pub fn generate_tone(
        &mut self,
        freq_hz: u32,
        duration: MsQ16,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let exact_q16 =
            (self.config.sample_rate * duration.raw() as f64 / 1000.0) as u64 + self.residue as u64;
        let samples = (exact_q16 >> 16) as u32;
        self.residue = (exact_q16 & 0xFFFF) as u32;
        self.output_samples(freq_hz, samples, sink)
    }

    fn output_samples(
        &mut self,
        freq_hz: u32,
        count: u32,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let step = self.nco.step_for(freq_hz);
        for _ in 0..count {
            sink.write_sample(self.nco.next_sample(step))?;
        }
        Ok(())
    }

    fn generate_vis_bit(
        &mut self,
        level: bool,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let freq = if level { 1100 } else { 1300 };
        self.generate_tone(freq, MsQ16::from_ms(30), sink)
    }

    fn generate_vis(
        &mut self,
        vis: u8,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        self.logger.debug("VIS", format!("code {vis:#04x}"));
        self.generate_tone(SYNC_HZ, MsQ16::from_ms(30), sink)?; // start bit
        let mut bits = vis;
        for _ in 0..8 {
            self.generate_vis_bit(bits & 1 == 1, sink)?;
            bits >>= 1;
        }
        // Even parity over the eight data bits.
        self.generate_vis_bit(vis.count_ones() & 1 == 1, sink)?;
        self.generate_tone(SYNC_HZ, MsQ16::from_ms(30), sink) // stop bit
    }

    fn aborted(&mut self) -> bool {
        if self.abort.load(Ordering::Relaxed) {
            self.logger.info("FRAME", "transmission aborted");
            true
        } else {
            false
        }
    }

    fn pixel_run(
        &mut self,
        image: &mut dyn PixelSource,
        width: u16,
        height: u16,
        y: u16,
        channel: u8,
        duration: MsQ16,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        for x in 0..width {
            let value = image.get_pixel(width, height, y, x, channel);
            self.generate_tone(pixel_tone(value), duration, sink)?;
        }
        Ok(())
    }

    fn generate_martin(
        &mut self,
        mode: Mode,
        image: &mut dyn PixelSource,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let (width, height) = mode.image_size();
        let hsync = MsQ16::from_ms_f64(mode.hsync_ms());
        let gap = MsQ16::from_ms_f64(mode.colour_gap_ms());
        let pixel = MsQ16::from_ms_f64(mode.colour_line_ms()).div(width as u32);

        for row in 0..height {
            // Wire order is green, blue, red, each behind a gap.
            for channel in [1u8, 2, 0] {
                self.generate_tone(BLACK_HZ, gap, sink)?;
                self.pixel_run(image, width, height, row, channel, pixel, sink)?;
            }
            self.generate_tone(BLACK_HZ, gap, sink)?;
            self.generate_tone(SYNC_HZ, hsync, sink)?;
            if self.aborted() {
                return Ok(());
            }
        }
        Ok(())
    }

    fn generate_scottie(
        &mut self,
        mode: Mode,
        image: &mut dyn PixelSource,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let (width, height) = mode.image_size();
        let hsync = MsQ16::from_ms_f64(mode.hsync_ms());
        let gap = MsQ16::from_ms_f64(mode.colour_gap_ms());
        let pixel = MsQ16::from_ms_f64(mode.colour_line_ms()).div(width as u32);

        for row in 0..height {
            // Green and blue lead; the hsync sits mid-line before red.
            self.generate_tone(BLACK_HZ, gap, sink)?;
            self.pixel_run(image, width, height, row, 1, pixel, sink)?;
            self.generate_tone(BLACK_HZ, gap, sink)?;
            self.pixel_run(image, width, height, row, 2, pixel, sink)?;
            self.generate_tone(SYNC_HZ, hsync, sink)?;
            self.generate_tone(BLACK_HZ, gap, sink)?;
            self.pixel_run(image, width, height, row, 0, pixel, sink)?;
            if self.aborted() {
                return Ok(());
            }
        }
        Ok(())
    }

    fn fill_ycrcb_row(
        &mut self,
        image: &mut dyn PixelSource,
        width: u16,
        height: u16,
        y: u16,
        odd: bool,
    ) {
        for x in 0..width {
            let r = image.get_pixel(width, height, y, x, 0);
            let g = image.get_pixel(width, height, y, x, 1);
            let b = image.get_pixel(width, height, y, x, 2);
            let (luma, cr, cb) = rgb_to_ycrcb(r, g, b);
            if odd {
                self.row_luma_odd[x as usize] = luma;
            } else {
                self.row_luma[x as usize] = luma;
            }
            self.row_cr[x as usize] = cr;
            self.row_cb[x as usize] = cb;
        }
    }

    fn component_run(
        &mut self,
        component: Component,
        width: u16,
        duration: MsQ16,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        for x in 0..width as usize {
            let value = match component {
                Component::Luma => self.row_luma[x],
                Component::LumaOdd => self.row_luma_odd[x],
                Component::Cr => self.row_cr[x],
                Component::Cb => self.row_cb[x],
            };
            self.generate_tone(pixel_tone(value), duration, sink)?;
        }
        Ok(())
    }

    fn generate_pd(
        &mut self,
        mode: Mode,
        image: &mut dyn PixelSource,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let (width, height) = mode.image_size();
        let hsync = MsQ16::from_ms_f64(mode.hsync_ms());
        let gap = MsQ16::from_ms_f64(mode.colour_gap_ms());
        let pixel = MsQ16::from_ms_f64(mode.colour_line_ms()).div(width as u32);

        for row in (0..height).step_by(2) {
            // Chroma is shared by the row pair; average the two rows.
            self.fill_ycrcb_row(image, width, height, row, false);
            let (even_cr, even_cb) = (self.row_cr, self.row_cb);
            self.fill_ycrcb_row(image, width, height, row + 1, true);
            for x in 0..width as usize {
                self.row_cr[x] = ((even_cr[x] as u16 + self.row_cr[x] as u16) / 2) as u8;
                self.row_cb[x] = ((even_cb[x] as u16 + self.row_cb[x] as u16) / 2) as u8;
            }

            self.generate_tone(SYNC_HZ, hsync, sink)?;
            self.generate_tone(BLACK_HZ, gap, sink)?;
            self.component_run(Component::Luma, width, pixel, sink)?;
            self.component_run(Component::Cr, width, pixel, sink)?;
            self.component_run(Component::Cb, width, pixel, sink)?;
            self.component_run(Component::LumaOdd, width, pixel, sink)?;
            if self.aborted() {
                return Ok(());
            }
        }
        Ok(())
    }

    fn generate_robot(
        &mut self,
        mode: Mode,
        image: &mut dyn PixelSource,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let (width, height) = mode.image_size();
        let hsync = MsQ16::from_ms_f64(mode.hsync_ms());
        let porch = MsQ16::from_ms_f64(ROBOT_PORCH_MS);
        let gap = MsQ16::from_ms_f64(mode.colour_gap_ms());
        let pixel = MsQ16::from_ms_f64(mode.colour_line_ms()).div(width as u32);
        let chroma = pixel.halved();
        let full_chroma = mode == Mode::Robot72;

        for row in (0..height).step_by(2) {
            self.fill_ycrcb_row(image, width, height, row, false);
            self.generate_tone(SYNC_HZ, hsync, sink)?;
            self.generate_tone(BLACK_HZ, porch, sink)?;
            self.component_run(Component::Luma, width, pixel, sink)?;
            self.generate_tone(BLACK_HZ, gap, sink)?;
            self.component_run(Component::Cr, width, chroma, sink)?;
            if full_chroma {
                self.generate_tone(WHITE_HZ, gap, sink)?;
                self.component_run(Component::Cb, width, chroma, sink)?;
            }

            self.fill_ycrcb_row(image, width, height, row + 1, false);
            self.generate_tone(SYNC_HZ, hsync, sink)?;
            self.generate_tone(BLACK_HZ, porch, sink)?;
            self.component_run(Component::Luma, width, pixel, sink)?;
            if full_chroma {
                self.generate_tone(BLACK_HZ, gap, sink)?;
                self.component_run(Component::Cr, width, chroma, sink)?;
            }
            self.generate_tone(WHITE_HZ, gap, sink)?;
            self.component_run(Component::Cb, width, chroma, sink)?;
            if self.aborted() {
                return Ok(());
            }
        }
        Ok(())
    }

    fn generate_bw(
        &mut self,
        mode: Mode,
        image: &mut dyn PixelSource,
        sink: &mut dyn SampleSink,
    ) -> std::result::Result<(), EncodeError> {
        let (width, height) = mode.image_size();
        let hsync = MsQ16::from_ms_f64(mode.hsync_ms());
        let pixel = MsQ16::from_ms_f64(mode.colour_line_ms()).div(width as u32);

        for row in 0..height {
            self.fill_ycrcb_row(image, width, height, row, false);
            self.generate_tone(SYNC_HZ, hsync, sink)?;
            self.component_run(Component::Luma, width, pixel, sink)?;
            if self.aborted() {
                return Ok(());
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Component {
    Luma,
    LumaOdd,
    Cr,
    Cb,
}
