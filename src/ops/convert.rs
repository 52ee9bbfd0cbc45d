// ============================================================================
// IMAGE -> GRID CONVERTER
// ============================================================================
//
// decode -> quality resize to the intermediate size -> unsharp mask ->
// nearest-neighbour resize to the grid -> quantize (skip near-transparent)

use std::sync::mpsc;
use std::time::Duration;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, Rgba32FImage, RgbaImage};

use crate::canvas::{Cell, PixelGrid};
use crate::components::colors::Rgb;
use crate::error::{BoardError, Result};
use crate::ops::filters::unsharp_mask;
use crate::ops::render::{RenderOptions, encode_png, render};
use crate::{DEFAULT_BACKGROUND, GRID_CELLS, GRID_PITCH, log_err, log_info};

/// Largest accepted source edge, in pixels.
pub const MAX_SOURCE_DIMENSION: u32 = 10000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvertOptions {
    /// Edge of the square intermediate raster.
    pub intermediate_size: u32,
    /// Cells per edge of the output grid.
    pub grid_cells: u32,
    /// Logical units between stored cell keys.
    pub pitch: u32,
    pub sharpen_amount: f32,
    pub blur_radius: u32,
    /// Pixels with alpha below this produce no cell.
    pub alpha_threshold: u8,
    /// Preview background.
    pub background: Rgb,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            intermediate_size: 256,
            grid_cells: GRID_CELLS,
            pitch: GRID_PITCH,
            sharpen_amount: 0.5,
            blur_radius: 1,
            alpha_threshold: 10,
            background: DEFAULT_BACKGROUND,
        }
    }
}

/// Output of one conversion.
#[derive(Clone, Debug)]
pub struct Conversion {
    pub grid: PixelGrid,
    /// `grid_cells * pitch` square preview for display only.
    pub preview: RgbaImage,
}

impl Conversion {
    pub fn preview_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.preview)
    }
}

pub fn validate_image_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(BoardError::InvalidInput(
            "Image dimensions cannot be zero".to_string(),
        ));
    }
    if width > MAX_SOURCE_DIMENSION || height > MAX_SOURCE_DIMENSION {
        return Err(BoardError::InvalidInput(format!(
            "Image dimensions too large (max {0}x{0})",
            MAX_SOURCE_DIMENSION
        )));
    }
    Ok(())
}

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) and convert them.
pub fn convert_image_bytes(bytes: &[u8], opts: &ConvertOptions) -> Result<Conversion> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            log_err!("Image decode failed: {}", e);
            return Err(e.into());
        }
    };
    convert_image(&img, opts)
}

/// Convert an already-decoded image.  Deterministic for identical input.
pub fn convert_image(img: &DynamicImage, opts: &ConvertOptions) -> Result<Conversion> {
    validate_image_dimensions(img.width(), img.height())?;
    if opts.intermediate_size == 0 || opts.grid_cells == 0 {
        return Err(BoardError::InvalidInput(
            "Conversion sizes must be non-zero".to_string(),
        ));
    }

    let size = opts.intermediate_size;
    let resized = imageops::resize(
        &premultiply(&img.to_rgba8()),
        size,
        size,
        FilterType::CatmullRom,
    );
    let intermediate = unpremultiply(&resized);
    let sharpened = unsharp_mask(&intermediate, opts.sharpen_amount, opts.blur_radius);
    let small = resize_nearest(&sharpened, opts.grid_cells);
    let grid = quantize(&small, opts);

    let preview = render(
        &grid,
        &RenderOptions {
            grid_width: opts.grid_cells,
            grid_height: opts.grid_cells,
            scale: opts.pitch,
            background: opts.background,
            pitch: opts.pitch,
        },
    );

    log_info!(
        "Converted {}x{} image to {} cells",
        img.width(),
        img.height(),
        grid.len()
    );
    Ok(Conversion { grid, preview })
}

/// Straight RGBA8 -> premultiplied float RGBA, so transparent texels carry no
/// color into their neighbours while resampling.
fn premultiply(src: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0.map(|c| c as f32 / 255.0);
        Rgba([r * a, g * a, b * a, a])
    })
}

fn unpremultiply(src: &Rgba32FImage) -> RgbaImage {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let a = a.clamp(0.0, 1.0);
        if channel(a) == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        Rgba([channel(r / a), channel(g / a), channel(b / a), channel(a)])
    })
}

/// Nearest-neighbour downscale to `out x out`, sampling each output pixel's
/// centre: `src = floor((dst + 0.5) * in / out)`.
fn resize_nearest(src: &RgbaImage, out: u32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let sample = |d: u32, len: u32| {
        let s = ((d as u64 * 2 + 1) * len as u64) / (out as u64 * 2);
        (s as u32).min(len - 1)
    };
    RgbaImage::from_fn(out, out, |x, y| *src.get_pixel(sample(x, w), sample(y, h)))
}

fn quantize(small: &RgbaImage, opts: &ConvertOptions) -> PixelGrid {
    small
        .enumerate_pixels()
        .filter(|(_, _, p)| p[3] >= opts.alpha_threshold)
        .map(|(x, y, p)| {
            (
                Cell::new(x * opts.pitch, y * opts.pitch),
                Rgb::new(p[0], p[1], p[2]),
            )
        })
        .collect()
}

// ============================================================================
// BACKGROUND QUEUE - last submission wins
// ============================================================================

struct ConversionResult {
    token: u64,
    result: Result<Conversion>,
}

/// Runs conversions off the caller's thread.  Only the result of the most
/// recent [`submit`](Self::submit) is ever handed back; anything older is
/// dropped on arrival.
pub struct ConversionQueue {
    options: ConvertOptions,
    sender: mpsc::Sender<ConversionResult>,
    receiver: mpsc::Receiver<ConversionResult>,
    /// Token of the newest submission; 0 means nothing submitted.
    current_token: u64,
    pending: usize,
}

impl ConversionQueue {
    pub fn new(options: ConvertOptions) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            options,
            sender,
            receiver,
            current_token: 0,
            pending: 0,
        }
    }

    /// Start converting `bytes`.  Supersedes any conversion still running.
    pub fn submit(&mut self, bytes: Vec<u8>) -> u64 {
        self.current_token = self.current_token.wrapping_add(1);
        let token = self.current_token;
        let sender = self.sender.clone();
        let opts = self.options;
        self.pending += 1;
        rayon::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                convert_image_bytes(&bytes, &opts)
            }))
            .unwrap_or_else(|_| {
                Err(BoardError::InvalidInput("Image conversion panicked".to_string()))
            });
            let _ = sender.send(ConversionResult { token, result });
        });
        token
    }

    /// Forget any in-flight conversion.
    pub fn cancel(&mut self) {
        self.current_token = self.current_token.wrapping_add(1);
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub fn current_token(&self) -> u64 {
        self.current_token
    }

    /// Non-blocking.  Returns the newest submission's result once it is
    /// ready; stale results are discarded.
    pub fn poll(&mut self) -> Option<Result<Conversion>> {
        let mut latest = None;
        while let Ok(msg) = self.receiver.try_recv() {
            if let Some(result) = self.accept(msg) {
                latest = Some(result);
            }
        }
        latest
    }

    /// Block up to `timeout` for the newest submission's result.
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<Conversion>> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(msg) => {
                    if let Some(result) = self.accept(msg) {
                        return Some(result);
                    }
                }
                Err(_) => return None,
            }
        }
    }

    fn accept(&mut self, msg: ConversionResult) -> Option<Result<Conversion>> {
        self.pending = self.pending.saturating_sub(1);
        if msg.token != self.current_token {
            log_info!("Discarding stale conversion #{}", msg.token);
            return None;
        }
        Some(msg.result)
    }
}

impl Default for ConversionQueue {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        encode_png(img).unwrap()
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(validate_image_dimensions(0, 5).is_err());
        assert!(validate_image_dimensions(10001, 5).is_err());
        assert!(validate_image_dimensions(10000, 10000).is_ok());
    }

    #[test]
    fn rejects_undecodable_bytes() {
        let err = convert_image_bytes(b"definitely not an image", &ConvertOptions::default());
        assert!(matches!(err, Err(BoardError::Decode(_))));
    }

    #[test]
    fn nearest_samples_pixel_centres() {
        let src = RgbaImage::from_fn(256, 256, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let out = resize_nearest(&src, 64);
        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!(*out.get_pixel(0, 0), Rgba([2, 2, 0, 255]));
        assert_eq!(*out.get_pixel(10, 63), Rgba([42, 254, 0, 255]));
    }

    #[test]
    fn solid_image_fills_every_cell() {
        let img = RgbaImage::from_pixel(100, 40, Rgba([200, 30, 60, 255]));
        let conv = convert_image(&DynamicImage::ImageRgba8(img), &ConvertOptions::default()).unwrap();
        assert_eq!(conv.grid.len(), 64 * 64);
        assert_eq!(conv.grid.get(Cell::new(504, 504)), Some(Rgb::new(200, 30, 60)));
        assert_eq!(conv.preview.dimensions(), (512, 512));
        assert_eq!(*conv.preview.get_pixel(511, 0), Rgba([200, 30, 60, 255]));
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let img = RgbaImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgba([255, 255, 255, 0])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let conv = convert_image(&DynamicImage::ImageRgba8(img), &ConvertOptions::default()).unwrap();
        assert!(conv.grid.get(Cell::new(0, 0)).is_none());
        assert!(conv.grid.get(Cell::new(504, 0)).is_some());
        assert!(conv.grid.iter().all(|(c, _)| c.x >= 200));
        // background shows through in the preview
        assert_eq!(*conv.preview.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn hidden_color_under_transparency_does_not_bleed() {
        let img = RgbaImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgba([255, 255, 255, 0])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let conv = convert_image(&DynamicImage::ImageRgba8(img), &ConvertOptions::default()).unwrap();
        assert!(!conv.grid.is_empty());
        for (cell, color) in conv.grid.iter() {
            assert!(
                color.b > 200 && color.r < 60 && color.g < 60,
                "cell {:?} bled to {:?}",
                cell,
                color
            );
        }
        let edge = conv.grid.get(Cell::new(256, 0)).or(conv.grid.get(Cell::new(264, 0)));
        assert!(edge.is_some_and(|c| c.b > 200 && c.r < 60));
    }

    #[test]
    fn conversion_is_deterministic() {
        let img = RgbaImage::from_fn(97, 61, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8, 255])
        });
        let bytes = png_bytes(&img);
        let opts = ConvertOptions::default();
        let a = convert_image_bytes(&bytes, &opts).unwrap();
        let b = convert_image_bytes(&bytes, &opts).unwrap();
        assert_eq!(a.grid, b.grid);
    }

    #[test]
    fn queue_returns_only_latest_submission() {
        let red = png_bytes(&RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])));
        let blue = png_bytes(&RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])));

        let mut queue = ConversionQueue::default();
        queue.submit(red);
        let latest = queue.submit(blue);
        assert_eq!(queue.current_token(), latest);

        let conv = queue.wait(Duration::from_secs(30)).unwrap().unwrap();
        assert_eq!(conv.grid.get(Cell::new(0, 0)), Some(Rgb::new(0, 0, 255)));
    }

    #[test]
    fn cancelled_result_is_dropped() {
        let bytes = png_bytes(&RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        let mut queue = ConversionQueue::default();
        queue.submit(bytes);
        queue.cancel();
        assert!(queue.wait(Duration::from_millis(2000)).is_none());
    }
}
