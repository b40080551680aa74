use criterion::{Criterion, black_box, criterion_group, criterion_main};

use qr_reader::utils::binarization;
use qr_reader::{Detector, GreyImage, decode_luminance};
use qrcodegen::{QrCode, QrCodeEcc, QrSegment, Version};

fn render(qr: &QrCode, scale: usize, border: usize) -> (Vec<u8>, usize) {
    let size = qr.size() as usize;
    let total = (size + 2 * border) * scale;
    let mut pixels = vec![255u8; total * total];
    for y in 0..size {
        for x in 0..size {
            if qr.get_module(x as i32, y as i32) {
                for dy in 0..scale {
                    let row = ((border + y) * scale + dy) * total;
                    for dx in 0..scale {
                        pixels[row + (border + x) * scale + dx] = 0;
                    }
                }
            }
        }
    }
    (pixels, total)
}

fn encode(text: &str, version: u8) -> QrCode {
    let segments = vec![QrSegment::make_bytes(text.as_bytes())];
    QrCode::encode_segments_advanced(
        &segments,
        QrCodeEcc::Medium,
        Version::new(version),
        Version::new(version),
        None,
        false,
    )
    .unwrap()
}

fn bench_full_decode(c: &mut Criterion) {
    let (small, small_size) = render(&encode("benchmark payload", 2), 4, 4);
    let (large, large_size) = render(&encode("a considerably longer benchmark payload", 20), 3, 4);

    c.bench_function("decode_v2", |b| {
        b.iter(|| decode_luminance(black_box(&small), small_size, small_size).unwrap())
    });
    c.bench_function("decode_v20", |b| {
        b.iter(|| decode_luminance(black_box(&large), large_size, large_size).unwrap())
    });
}

fn bench_stages(c: &mut Criterion) {
    let (pixels, size) = render(&encode("benchmark payload", 5), 4, 4);
    let source = GreyImage::new(pixels, size, size).unwrap();
    let binary = binarization::binarize(&source).unwrap();

    c.bench_function("binarize_v5", |b| {
        b.iter(|| binarization::binarize(black_box(&source)).unwrap())
    });
    c.bench_function("detect_v5", |b| {
        b.iter(|| Detector::new(black_box(&binary)).detect().unwrap())
    });
}

criterion_group!(benches, bench_full_decode, bench_stages);
criterion_main!(benches);
