//! Decoding, resizing and encoding of thumbnail images

use crate::storage::atomic_write;
use crate::thumbnail::ImageError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use std::path::Path;

/// Target size and encoding of written thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailBox {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Pixel area read from the image header, without decoding the pixels
pub fn probe_area(bytes: &[u8]) -> Result<u64, ImageError> {
    let (w, h) = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()?;
    Ok(u64::from(w) * u64::from(h))
}

/// Shrinks `image` to fit inside the box, preserving aspect ratio
///
/// Images already inside the box are left at their size.
pub fn fit_within(image: DynamicImage, target: &ThumbnailBox) -> DynamicImage {
    let (w, h) = image.dimensions();
    if w <= target.width && h <= target.height {
        return image;
    }
    image.resize(target.width, target.height, FilterType::Lanczos3)
}

/// Crops the top of `image` to the box's aspect ratio, then resizes it to the box
///
/// Used for rendered page captures, where the top of the page is the
/// interesting part.
pub fn crop_to_box(image: DynamicImage, target: &ThumbnailBox) -> DynamicImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image;
    }

    let target_ratio = f64::from(target.width) / f64::from(target.height);
    let ratio = f64::from(w) / f64::from(h);

    let cropped = if ratio > target_ratio {
        let crop_w = ((f64::from(h) * target_ratio).round() as u32).clamp(1, w);
        let x = (w - crop_w) / 2;
        image.crop_imm(x, 0, crop_w, h)
    } else {
        let crop_h = ((f64::from(w) / target_ratio).round() as u32).clamp(1, h);
        image.crop_imm(0, 0, w, crop_h)
    };

    cropped.resize_exact(target.width, target.height, FilterType::Lanczos3)
}

/// Encodes `image` as RGB JPEG and atomically writes it to `path`
pub fn write_jpeg(image: &DynamicImage, target: &ThumbnailBox, path: &Path) -> Result<(), ImageError> {
    let rgb: RgbImage = image.to_rgb8();

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, target.jpeg_quality);
    DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;

    atomic_write(path, &encoded).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes a static image, fits it into the box and writes it
pub fn process_static(bytes: &[u8], target: &ThumbnailBox, path: &Path) -> Result<(), ImageError> {
    let image = fit_within(decode(bytes)?, target);
    write_jpeg(&image, target, path)
}

/// Decodes a rendered page capture, crops it to the box and writes it
pub fn process_render(bytes: &[u8], target: &ThumbnailBox, path: &Path) -> Result<(), ImageError> {
    let image = crop_to_box(decode(bytes)?, target);
    write_jpeg(&image, target, path)
}
