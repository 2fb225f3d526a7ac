//! Slow-scan television for Rust.
//!
//! This crate implements both directions of the SSTV analog picture
//! protocols used on the amateur bands: a transmitter that turns an image
//! into a timed sequence of audio tones, and a receiver that demodulates
//! an audio stream, classifies the mode from its hsync cadence, corrects
//! for clock drift, and reconstructs the image.
//!
//! The core is pure signal processing over integer samples. All I/O —
//! audio capture and playback, image files, framebuffers — lives behind
//! the four capability traits in [`io`], injected into the frame-level
//! operations:
//!
//! ```no_run
//! use slowscan::io::{BufferSink, RasterSource};
//! use slowscan::{EncoderConfig, Mode, SstvEncoder};
//!
//! let mut encoder = SstvEncoder::new(EncoderConfig::default());
//! let mut image = RasterSource::solid(320, 256, [0, 128, 255]);
//! let mut sink = BufferSink::new();
//! encoder.generate_sstv(Mode::MartinM1, &mut image, &mut sink).unwrap();
//! // sink.samples now holds the transmission as 16-bit PCM.
//! ```
//!
//! Decoding mirrors this with a [`io::SampleSource`] and [`io::PixelSink`]
//! via [`SstvDecoder::decode_image`], or sample by sample through
//! [`SstvDecoder::process_audio_sample`] for streaming hosts.

pub mod audio_generator;
pub mod channel;
pub mod color;
pub mod config;
pub mod decoder;
pub mod dsp;
pub mod encoder;
pub mod errors;
pub mod fixed;
pub mod io;
pub mod logging;
pub mod modes;

pub use config::{DecoderConfig, EncoderConfig};
pub use decoder::{DecodeStep, DecoderState, PixelSample, SstvDecoder, SyncDetector};
pub use encoder::{AbortHandle, SstvEncoder};
pub use errors::{DecodeError, EncodeError, Result, SstvError};
pub use fixed::MsQ16;
pub use modes::{Family, Mode, ModeTiming};
