//! Shared image fixtures for the integration tests.

use std::path::{Path, PathBuf};

/// A smooth, non-symmetric test pattern.
pub fn pattern_image(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        let fx = x as f32 / width as f32;
        let fy = y as f32 / height as f32;
        let v = 128.0
            + 100.0 * (fx * std::f32::consts::TAU).sin() * (fy * std::f32::consts::PI).cos();
        image::Rgb([v as u8, (fx * 255.0) as u8, (fy * 255.0) as u8])
    })
}

/// The pattern with every channel inverted.
pub fn inverted_pattern(width: u32, height: u32) -> image::RgbImage {
    let mut img = pattern_image(width, height);
    image::imageops::invert(&mut img);
    img
}

/// Save an image under `dir`, format chosen by the extension of `name`.
pub fn save(dir: &Path, name: &str, img: &image::RgbImage) -> PathBuf {
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// File name of a path as a `String`.
pub fn name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
