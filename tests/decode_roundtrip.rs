//! End-to-end decoding tests: encode with qrcodegen, rasterise to
//! luminance, run the full pipeline.

use qr_reader::{DecodeError, ECLevel, decode_luminance};
use qrcodegen::{QrCode, QrCodeEcc, QrSegment, QrSegmentMode, Version};

/// Render a symbol into a greyscale raster: dark modules 0, light 255.
fn render(qr: &QrCode, scale: usize, border: usize) -> (Vec<u8>, usize, usize) {
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
    (pixels, total, total)
}

fn mirror_horizontal(pixels: &mut [u8], width: usize, height: usize) {
    for y in 0..height {
        pixels[y * width..(y + 1) * width].reverse();
    }
}

fn encode_pinned(
    segments: &[QrSegment],
    ecc: QrCodeEcc,
    min_version: u8,
    max_version: u8,
) -> QrCode {
    QrCode::encode_segments_advanced(
        segments,
        ecc,
        Version::new(min_version),
        Version::new(max_version),
        None,
        false,
    )
    .expect("payload must fit the pinned version range")
}

#[test]
fn decodes_hello_world() {
    let qr = QrCode::encode_text("Hello world!", QrCodeEcc::Medium).unwrap();
    let (pixels, width, height) = render(&qr, 4, 4);
    let decoded = decode_luminance(&pixels, width, height).unwrap();
    assert_eq!(decoded.text, "Hello world!");
    assert!(!decoded.mirrored);
    assert_eq!(decoded.byte_segments.len(), 1);
    assert_eq!(decoded.byte_segments[0], b"Hello world!");
}

#[test]
fn decodes_mirrored_image() {
    let qr = QrCode::encode_text("Hello world!", QrCodeEcc::Medium).unwrap();
    let (mut pixels, width, height) = render(&qr, 4, 4);
    mirror_horizontal(&mut pixels, width, height);
    let decoded = decode_luminance(&pixels, width, height).unwrap();
    assert_eq!(decoded.text, "Hello world!");
    assert!(decoded.mirrored);
}

#[test]
fn decodes_pure_numeric_payload() {
    let digits = "123456789012345678901234567890";
    let segments = vec![QrSegment::make_numeric(digits)];
    let qr = encode_pinned(&segments, QrCodeEcc::Medium, 1, 5);
    let (pixels, width, height) = render(&qr, 4, 4);
    let decoded = decode_luminance(&pixels, width, height).unwrap();
    assert_eq!(decoded.text, digits);
    // Pure numeric mode produces no byte segments.
    assert!(decoded.byte_segments.is_empty());
}

#[test]
fn decodes_full_alphanumeric_charset() {
    let text = "ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890 $%*+-./:";
    let segments = vec![QrSegment::make_alphanumeric(text)];
    let qr = encode_pinned(&segments, QrCodeEcc::Quartile, 1, 10);
    let (pixels, width, height) = render(&qr, 4, 4);
    let decoded = decode_luminance(&pixels, width, height).unwrap();
    assert_eq!(decoded.text, text);
}

#[test]
fn decodes_kanji_mode() {
    let text = "茗荷茗荷茗荷茗荷";
    // Build the 13-bit kanji segment by hand from the Shift_JIS bytes.
    let (sjis, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
    assert!(!had_errors);
    let mut bits: Vec<bool> = Vec::new();
    for pair in sjis.chunks(2) {
        let code = ((pair[0] as u16) << 8) | pair[1] as u16;
        let offset = if code < 0xE040 { 0x8140 } else { 0xC140 };
        let shifted = code - offset;
        let value = ((shifted >> 8) as u32) * 0x0C0 + (shifted & 0xFF) as u32;
        for i in (0..13).rev() {
            bits.push((value >> i) & 1 != 0);
        }
    }
    let num_chars = sjis.len() / 2;
    let segments = vec![QrSegment::new(QrSegmentMode::Kanji, num_chars, bits)];
    let qr = encode_pinned(&segments, QrCodeEcc::Quartile, 1, 10);

    let (pixels, width, height) = render(&qr, 4, 4);
    let decoded = decode_luminance(&pixels, width, height).unwrap();
    assert_eq!(decoded.text, text);
}

#[test]
fn corrects_damaged_symbol() {
    let url = "https://smiley.codes/qrcode/";
    let segments = vec![QrSegment::make_bytes(url.as_bytes())];
    let qr = encode_pinned(&segments, QrCodeEcc::High, 4, 4);

    let scale = 4;
    let border = 4;
    let (mut pixels, width, height) = render(&qr, scale, border);
    // Invert a 6x6-module patch of the data area. Interleaving spreads the
    // hit codewords across blocks, well within the High-level tolerance.
    for module_y in 9..15 {
        for module_x in 16..22 {
            for dy in 0..scale {
                let row = ((border + module_y) * scale + dy) * width;
                for dx in 0..scale {
                    let index = row + (border + module_x) * scale + dx;
                    pixels[index] = 255 - pixels[index];
                }
            }
        }
    }

    let decoded = decode_luminance(&pixels, width, height).unwrap();
    assert_eq!(decoded.text, url);
    assert_eq!(decoded.ec_level, ECLevel::H);
}

#[test]
fn decodes_tiny_rendering_via_histogram_fallback() {
    // One pixel per module with a quiet zone: 33px for a version 2 symbol,
    // under the 40px cutoff that forces the histogram binarizer.
    let url = "https://smiley.codes/qrcode/";
    let segments = vec![QrSegment::make_bytes(url.as_bytes())];
    let qr = encode_pinned(&segments, QrCodeEcc::Low, 2, 2);
    let (pixels, width, height) = render(&qr, 1, 4);
    assert!(width < 40 && height < 40);
    let decoded = decode_luminance(&pixels, width, height).unwrap();
    assert_eq!(decoded.text, url);
}

#[test]
fn rejects_overwhelming_damage() {
    let qr = QrCode::encode_text("destroyed beyond repair", QrCodeEcc::Low).unwrap();
    let (mut pixels, width, height) = render(&qr, 4, 4);
    // Wipe the majority of the data area.
    for y in height / 3..height {
        for x in width / 3..width {
            pixels[y * width + x] = if (x / 4 + y / 4) % 2 == 0 { 0 } else { 255 };
        }
    }
    assert!(decode_luminance(&pixels, width, height).is_err());
}

#[test]
fn round_trips_every_version_and_level() {
    let levels = [
        (QrCodeEcc::Low, ECLevel::L),
        (QrCodeEcc::Medium, ECLevel::M),
        (QrCodeEcc::Quartile, ECLevel::Q),
        (QrCodeEcc::High, ECLevel::H),
    ];
    for version in 1..=40u8 {
        for &(encoder_level, expected_level) in &levels {
            // Short enough for the tightest capacity (version 1 at H).
            let text = format!("v{}{:?}", version, expected_level);
            let segments = vec![QrSegment::make_bytes(text.as_bytes())];
            let qr = encode_pinned(&segments, encoder_level, version, version);
            let (pixels, width, height) = render(&qr, 3, 4);
            let decoded = decode_luminance(&pixels, width, height)
                .unwrap_or_else(|err| panic!("v{} {:?}: {}", version, expected_level, err));
            assert_eq!(decoded.text, text);
            assert_eq!(decoded.version.number(), version);
            assert_eq!(decoded.ec_level, expected_level);
        }
    }
}

#[test]
fn error_kinds_are_distinguishable() {
    // A blank frame has no symbol at all.
    let blank = vec![255u8; 120 * 120];
    assert!(matches!(
        decode_luminance(&blank, 120, 120),
        Err(DecodeError::NotFound(_))
    ));
}
