//! Decode a QR code from an image file and print its payload.

use std::env;
use std::process::ExitCode;

use qr_reader::{GreyImage, decode};

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: qrscan <image>");
            return ExitCode::FAILURE;
        }
    };

    let img = match image::open(&path) {
        Ok(img) => img.to_luma8(),
        Err(err) => {
            eprintln!("qrscan: {}: {}", path, err);
            return ExitCode::FAILURE;
        }
    };
    let (width, height) = (img.width() as usize, img.height() as usize);
    let source = match GreyImage::new(img.into_raw(), width, height) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("qrscan: {}: {}", path, err);
            return ExitCode::FAILURE;
        }
    };

    match decode(&source) {
        Ok(qr) => {
            println!("{}", qr.text);
            eprintln!(
                "version {}, level {:?}, mask {:?}{}",
                qr.version.number(),
                qr.ec_level,
                qr.mask_pattern,
                if qr.mirrored { ", mirrored" } else { "" }
            );
            if let Some(sa) = qr.structured_append {
                eprintln!(
                    "structured append: symbol {} of {}, parity {:#04x}",
                    (sa.sequence >> 4) + 1,
                    (sa.sequence & 0x0F) + 1,
                    sa.parity
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("qrscan: {}: {}", path, err);
            ExitCode::FAILURE
        }
    }
}
