//! Synthetic cable images.
//!
//! Deterministic stand-ins for camera captures: a cable body drawn across a
//! noisy background with a connector block whose colour depends on the cable
//! type. Used by the mock camera, the demo binary and tests.

use std::io::Cursor;

use anyhow::{anyhow, Result};
use image::{ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cable::CableType;

fn connector_color(cable_type: CableType) -> Rgb<u8> {
    match cable_type {
        CableType::UsbA => Rgb([180, 180, 190]),
        CableType::UsbC => Rgb([40, 40, 45]),
        CableType::Lightning => Rgb([235, 235, 235]),
        CableType::MicroUsb => Rgb([60, 60, 120]),
        CableType::MiniUsb => Rgb([120, 60, 60]),
        CableType::Usb30 => Rgb([30, 70, 200]),
        CableType::Thunderbolt => Rgb([200, 170, 40]),
    }
}

/// Raw RGB pixels for a synthetic capture.
pub fn cable_pixels(cable_type: CableType, width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed ^ cable_type.index() as u64);
    let base: u8 = rng.gen_range(150..=220);
    let mut img = RgbImage::from_fn(width, height, |_, _| {
        let noise: u8 = rng.gen_range(0..12);
        let v = base.saturating_sub(noise);
        Rgb([v, v, v])
    });

    let band_top = height * 2 / 5;
    let band_bottom = (height * 3 / 5).max(band_top + 1);
    let plug_start = width * 3 / 5;
    let plug_end = (width * 4 / 5).max(plug_start + 1);
    let connector = connector_color(cable_type);

    for y in band_top..band_bottom.min(height) {
        for x in 0..width {
            let pixel = if (plug_start..plug_end).contains(&x) {
                connector
            } else if x < plug_start {
                Rgb([20, 20, 20])
            } else {
                continue;
            };
            img.put_pixel(x, y, pixel);
        }
    }
    img
}

/// Encode pixels into the given container.
pub fn encode(img: &RgbImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)
        .map_err(|e| anyhow!("failed to encode synthetic {:?} image: {}", format, e))?;
    Ok(out.into_inner())
}

/// PNG-encoded synthetic capture.
pub fn cable_image(cable_type: CableType, width: u32, height: u32, seed: u64) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(anyhow!("synthetic image must be at least 1x1"));
    }
    encode(&cable_pixels(cable_type, width, height, seed), ImageFormat::Png)
}
