//! Local image processing with the `image` crate
//!
//! Decoding and resampling are CPU-bound, so every operation runs on the
//! blocking thread pool.

use crate::types::{ImageMetadata, ImageProcessor};
use anyhow::{Context, Result};
use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Transparent margin around cropped content, as a share of its longest side
pub const CONTENT_PADDING_RATIO: f64 = 0.05;

/// Angles closer than this to a multiple of 90 degrees use exact rotations
const RIGHT_ANGLE_EPSILON: f64 = 1e-6;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalImageProcessor;

impl LocalImageProcessor {
    pub fn new() -> Self {
        Self
    }
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("Image processing task panicked")?
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(buffer.into_inner())
}

/// Bounding box `(x, y, width, height)` of pixels with non-zero alpha
fn content_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > 0 {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

pub fn crop_to_content_sync(bytes: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(bytes)
        .context("Failed to decode image")?
        .to_rgba8();

    let Some((x, y, width, height)) = content_bounds(&image) else {
        return Ok(bytes.to_vec());
    };

    let content = imageops::crop_imm(&image, x, y, width, height).to_image();
    let longest = width.max(height);
    let padding = (longest as f64 * CONTENT_PADDING_RATIO).floor() as u32;
    let side = longest + 2 * padding;

    let mut canvas = RgbaImage::new(side, side);
    let offset_x = (side - width) / 2;
    let offset_y = (side - height) / 2;
    imageops::overlay(&mut canvas, &content, offset_x as i64, offset_y as i64);

    encode_png(&DynamicImage::ImageRgba8(canvas))
}

fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let fetch = |px: f64, py: f64| -> [f64; 4] {
        if px < 0.0 || py < 0.0 || px >= image.width() as f64 || py >= image.height() as f64 {
            return [0.0; 4];
        }
        let p = image.get_pixel(px as u32, py as u32);
        [p[0] as f64, p[1] as f64, p[2] as f64, p[3] as f64]
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1.0, y0);
    let p01 = fetch(x0, y0 + 1.0);
    let p11 = fetch(x0 + 1.0, y0 + 1.0);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Counter-clockwise rotation onto an expanded, transparent canvas
fn rotate_arbitrary(image: &RgbaImage, degrees: f64) -> RgbaImage {
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (image.width() as f64, image.height() as f64);

    let out_w = (w * cos.abs() + h * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil().max(1.0) as u32;

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ocx, ocy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    RgbaImage::from_fn(out_w, out_h, |x, y| {
        // Pixel centers, relative to the output center; y grows downwards
        let dx = x as f64 + 0.5 - ocx;
        let dy = y as f64 + 0.5 - ocy;
        let sx = dx * cos - dy * sin + cx - 0.5;
        let sy = dx * sin + dy * cos + cy - 0.5;
        sample_bilinear(image, sx, sy)
    })
}

pub fn rotate_image(image: DynamicImage, angle: f64) -> DynamicImage {
    let normalized = angle.rem_euclid(360.0);
    let quarter_turns = (normalized / 90.0).round();

    if (normalized - quarter_turns * 90.0).abs() < RIGHT_ANGLE_EPSILON {
        // `image` rotates clockwise
        return match quarter_turns as i64 % 4 {
            1 => image.rotate270(),
            2 => image.rotate180(),
            3 => image.rotate90(),
            _ => image,
        };
    }

    DynamicImage::ImageRgba8(rotate_arbitrary(&image.to_rgba8(), normalized))
}

fn thumbnail_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    path.with_file_name(format!("{}_thumb.png", stem))
}

#[async_trait::async_trait]
impl ImageProcessor for LocalImageProcessor {
    async fn crop_to_content(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        blocking(move || crop_to_content_sync(&bytes)).await
    }

    async fn rotate(&self, path: &Path, angle: f64) -> Result<()> {
        if angle.rem_euclid(360.0) == 0.0 {
            return Ok(());
        }

        let path = path.to_path_buf();
        blocking(move || {
            let image = image::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            rotate_image(image, angle)
                .save_with_format(&path, ImageFormat::Png)
                .with_context(|| format!("Failed to save {}", path.display()))
        })
        .await
    }

    async fn generate_thumbnail(&self, path: &Path, width: u32) -> Result<PathBuf> {
        if width == 0 {
            anyhow::bail!("Thumbnail width must be positive");
        }

        let path = path.to_path_buf();
        blocking(move || {
            let image = image::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let height = ((image.height() as f64 * width as f64) / image.width().max(1) as f64)
                .round()
                .max(1.0) as u32;

            let thumbnail = image.resize_exact(width, height, FilterType::Lanczos3);
            let target = thumbnail_path(&path);
            DynamicImage::ImageRgba8(thumbnail.to_rgba8())
                .save_with_format(&target, ImageFormat::Png)
                .with_context(|| format!("Failed to save {}", target.display()))?;
            Ok(target)
        })
        .await
    }

    async fn metadata(&self, path: &Path) -> Result<ImageMetadata> {
        let path = path.to_path_buf();
        blocking(move || {
            let size = std::fs::metadata(&path)
                .with_context(|| format!("Failed to stat {}", path.display()))?
                .len();
            let reader = ImageReader::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?
                .with_guessed_format()
                .context("Failed to detect image format")?;
            let format = reader
                .format()
                .context("Unrecognized image format")?;
            let (width, height) = reader
                .into_dimensions()
                .context("Failed to read image dimensions")?;

            Ok(ImageMetadata {
                width,
                height,
                size: size as i64,
                mime_type: format.to_mime_type().to_string(),
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Transparent canvas with an opaque red rectangle
    fn sample_png(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> Vec<u8> {
        let (rx, ry, rw, rh) = rect;
        let image = RgbaImage::from_fn(width, height, |x, y| {
            if x >= rx && x < rx + rw && y >= ry && y < ry + rh {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        encode_png(&DynamicImage::ImageRgba8(image)).unwrap()
    }

    #[test]
    fn test_crop_centers_content_on_padded_square() {
        let input = sample_png(200, 100, (10, 20, 40, 20));

        let output = crop_to_content_sync(&input).unwrap();
        let image = image::load_from_memory(&output).unwrap().to_rgba8();

        // 40 + 2 * floor(40 * 0.05)
        assert_eq!(image.dimensions(), (44, 44));
        assert_eq!(content_bounds(&image), Some((2, 12, 40, 20)));
    }

    #[test]
    fn test_crop_without_content_returns_input() {
        let input = sample_png(16, 16, (0, 0, 0, 0));
        assert_eq!(crop_to_content_sync(&input).unwrap(), input);
    }

    #[test]
    fn test_crop_rejects_garbage() {
        assert!(crop_to_content_sync(b"not an image").is_err());
    }

    #[test]
    fn test_right_angle_rotations_swap_dimensions() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(30, 10));
        assert_eq!(rotate_image(image.clone(), 90.0).width(), 10);
        assert_eq!(rotate_image(image.clone(), -90.0).height(), 30);
        assert_eq!(rotate_image(image.clone(), 180.0).width(), 30);
        assert_eq!(rotate_image(image, 360.0).width(), 30);
    }

    #[test]
    fn test_counter_clockwise_quarter_turn() {
        // Single opaque pixel at the right edge moves to the top edge
        let mut source = RgbaImage::new(3, 3);
        source.put_pixel(2, 1, Rgba([255, 255, 255, 255]));

        let rotated = rotate_image(DynamicImage::ImageRgba8(source), 90.0).to_rgba8();

        assert_eq!(rotated.get_pixel(1, 0)[3], 255);
    }

    #[test]
    fn test_arbitrary_rotation_expands_canvas() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255])));
        let rotated = rotate_image(image, 45.0).to_rgba8();

        assert!(rotated.width() > 140 && rotated.width() < 143);
        // Corners fall outside the source and stay transparent
        assert_eq!(rotated.get_pixel(0, 0)[3], 0);
        let center = rotated.get_pixel(rotated.width() / 2, rotated.height() / 2);
        assert_eq!(center[3], 255);
    }

    #[tokio::test]
    async fn test_thumbnail_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("processed_front.png");
        std::fs::write(&path, sample_png(600, 400, (0, 0, 600, 400))).unwrap();

        let processor = LocalImageProcessor::new();
        let thumb = processor.generate_thumbnail(&path, 300).await.unwrap();

        assert_eq!(thumb, temp_dir.path().join("processed_front_thumb.png"));
        let metadata = processor.metadata(&thumb).await.unwrap();
        assert_eq!((metadata.width, metadata.height), (300, 200));
        assert_eq!(metadata.mime_type, "image/png");
        assert!(metadata.size > 0);
    }

    #[tokio::test]
    async fn test_rotate_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("processed_back.png");
        std::fs::write(&path, sample_png(40, 20, (0, 0, 40, 20))).unwrap();

        let processor = LocalImageProcessor::new();
        processor.rotate(&path, 270.0).await.unwrap();

        let metadata = processor.metadata(&path).await.unwrap();
        assert_eq!((metadata.width, metadata.height), (20, 40));
    }

    #[tokio::test]
    async fn test_zero_rotation_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("processed_back.png");
        let bytes = sample_png(40, 20, (0, 0, 10, 10));
        std::fs::write(&path, &bytes).unwrap();

        LocalImageProcessor::new().rotate(&path, 0.0).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }
}
