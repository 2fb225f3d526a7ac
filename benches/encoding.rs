use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slowscan::io::{CountingSink, RasterSource};
use slowscan::{EncoderConfig, Mode, MsQ16, SstvEncoder};

fn benchmark_tone_generation(c: &mut Criterion) {
    let mut encoder = SstvEncoder::new(EncoderConfig::default());

    c.bench_function("generate_tone_100ms", |b| {
        b.iter(|| {
            let mut sink = CountingSink::default();
            encoder
                .generate_tone(black_box(1900), MsQ16::from_ms(100), &mut sink)
                .unwrap();
            sink.count
        })
    });
}

fn benchmark_frame_encoding(c: &mut Criterion) {
    let mut encoder = SstvEncoder::new(EncoderConfig::default());
    let mut image = RasterSource::from_fn(160, 120, |x, y| {
        [(x & 0xFF) as u8, (y & 0xFF) as u8, ((x + y) & 0xFF) as u8]
    });

    c.bench_function("encode_bw8_frame", |b| {
        b.iter(|| {
            let mut sink = CountingSink::default();
            encoder
                .generate_sstv(Mode::Bw8, &mut image, &mut sink)
                .unwrap();
            sink.count
        })
    });
}

criterion_group!(benches, benchmark_tone_generation, benchmark_frame_encoding);
criterion_main!(benches);
