//! Numerically controlled oscillator for tone synthesis.
//!
//! A 32-bit phase accumulator indexes a 1024-entry full-wave sine table;
//! the top ten phase bits select the entry. Frequency changes between
//! tones keep the accumulator, so tone boundaries are phase-continuous.

use std::f64::consts::TAU;

const TABLE_LEN: usize = 1024;
const PHASE_SHIFT: u32 = 22; // 32-bit phase -> 10-bit table index

/// Full-scale i16 sine table.
#[derive(Clone)]
pub struct SineTable {
    entries: [i16; TABLE_LEN],
}

impl SineTable {
    pub fn new() -> Self {
        let mut entries = [0i16; TABLE_LEN];
        for (idx, entry) in entries.iter_mut().enumerate() {
            *entry = (32767.0 * (TAU * idx as f64 / TABLE_LEN as f64).sin()).round() as i16;
        }
        SineTable { entries }
    }

    pub fn lookup(&self, phase: u32) -> i16 {
        self.entries[(phase >> PHASE_SHIFT) as usize]
    }
}

impl Default for SineTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase-accumulator oscillator bound to a sample rate.
pub struct Nco {
    sample_rate: f64,
    phase: u32,
    table: SineTable,
}

impl Nco {
    pub fn new(sample_rate: f64) -> Self {
        Nco {
            sample_rate,
            phase: 0,
            table: SineTable::new(),
        }
    }

    /// Per-sample phase step for a tone frequency.
    pub fn step_for(&self, freq_hz: u32) -> u32 {
        (((freq_hz as u64) << 32) as f64 / self.sample_rate) as u32
    }

    /// Emit one sample and advance the accumulator by `step`.
    pub fn next_sample(&mut self, step: u32) -> i16 {
        let sample = self.table.lookup(self.phase);
        self.phase = self.phase.wrapping_add(step);
        sample
    }
}
