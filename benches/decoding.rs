use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slowscan::dsp::demodulation::FrequencyDemodulator;
use slowscan::io::{BufferSink, BufferSource, ImageSink, RasterSource};
use slowscan::{DecoderConfig, EncoderConfig, Mode, SstvDecoder, SstvEncoder};

fn benchmark_demodulation(c: &mut Criterion) {
    let samples = slowscan::audio_generator::tone(1900.0, 15_000, 15_000.0);

    c.bench_function("demodulate_one_second", |b| {
        b.iter(|| {
            let mut demod = FrequencyDemodulator::new(15_000.0);
            let mut last = 0u16;
            for &s in &samples {
                last = demod.process(black_box(s));
            }
            last
        })
    });
}

fn benchmark_frame_decoding(c: &mut Criterion) {
    let mut encoder = SstvEncoder::new(EncoderConfig::default());
    let mut image = RasterSource::solid(160, 256, [128, 128, 128]);
    let mut sink = BufferSink::new();
    encoder
        .generate_sstv(Mode::MartinM2, &mut image, &mut sink)
        .unwrap();
    let mut samples = sink.samples;
    samples.extend(slowscan::audio_generator::tone(
        1900.0,
        4 * (Mode::MartinM2.line_ms() * 15.0) as usize,
        15_000.0,
    ));

    c.bench_function("decode_martin_m2_frame", |b| {
        b.iter(|| {
            let mut decoder = SstvDecoder::new(DecoderConfig::default());
            let mut source = BufferSource::new(samples.clone());
            let mut out = ImageSink::new();
            decoder.decode_image(&mut source, &mut out).unwrap();
            out.rows_written.iter().filter(|&&w| w).count()
        })
    });
}

criterion_group!(benches, benchmark_demodulation, benchmark_frame_decoding);
criterion_main!(benches);
