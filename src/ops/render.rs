// ============================================================================
// GRID RENDERER - pixel grid -> thumbnail raster
// ============================================================================

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use rayon::prelude::*;
use serde_json::Value;

use crate::canvas::{Cell, PixelGrid};
use crate::components::colors::{Rgb, hex_to_rgb};
use crate::error::Result;
use crate::{DEFAULT_BACKGROUND, GRID_CELLS, GRID_PITCH, log_warn};

/// Substituted for any color string that fails validation.
pub const FALLBACK_COLOR: Rgb = Rgb::new(0xff, 0x00, 0xff);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Cells across.
    pub grid_width: u32,
    /// Cells down.
    pub grid_height: u32,
    /// Output pixels per cell edge.
    pub scale: u32,
    pub background: Rgb,
    /// Spacing of stored keys; keys are divided by this to get cell indices.
    pub pitch: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            grid_width: GRID_CELLS,
            grid_height: GRID_CELLS,
            scale: 1,
            background: DEFAULT_BACKGROUND,
            pitch: GRID_PITCH,
        }
    }
}

impl RenderOptions {
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn with_background(mut self, background: Rgb) -> Self {
        self.background = background;
        self
    }

    fn output_size(&self) -> (u32, u32) {
        let scale = self.scale.max(1);
        (
            self.grid_width.saturating_mul(scale),
            self.grid_height.saturating_mul(scale),
        )
    }
}

/// 1×1 black image returned whenever there is nothing sensible to draw.
pub fn placeholder() -> RgbaImage {
    RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]))
}

/// Render a typed grid.  Cells that land outside the raster are skipped.
pub fn render(grid: &PixelGrid, opts: &RenderOptions) -> RgbaImage {
    render_cells(grid.iter(), opts)
}

/// Render raw pixel data as it arrives from storage or the wire.
///
/// Never fails: `None`, `null` and non-object values give the 1×1
/// placeholder; a string is parsed as JSON once; unparsable keys are skipped
/// and unparsable colors are drawn in [`FALLBACK_COLOR`].
pub fn render_value(value: Option<&Value>, opts: &RenderOptions) -> RgbaImage {
    let parsed;
    let map = match value {
        Some(Value::Object(map)) => map,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => {
                parsed = map;
                &parsed
            }
            _ => return placeholder(),
        },
        _ => return placeholder(),
    };

    let mut fallbacks = 0usize;
    let cells: Vec<(Cell, Rgb)> = map
        .iter()
        .filter_map(|(key, color)| {
            let cell = Cell::from_key(key)?;
            let rgb = render_color(color).unwrap_or_else(|| {
                fallbacks += 1;
                FALLBACK_COLOR
            });
            Some((cell, rgb))
        })
        .collect();
    if fallbacks > 0 {
        log_warn!("Rendered {} cell(s) with invalid colors as fallback", fallbacks);
    }
    render_cells(cells.into_iter(), opts)
}

/// Render many grids at once.  Output order matches input order.
pub fn render_gallery(grids: &[PixelGrid], opts: &RenderOptions) -> Vec<RgbaImage> {
    grids.par_iter().map(|g| render(g, opts)).collect()
}

/// Encode a raster as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// `#rrggbb` or `#rgb` only, with no surrounding whitespace.
fn render_color(value: &Value) -> Option<Rgb> {
    match value.as_str() {
        Some(s) if s.starts_with('#') && s.trim_end() == s => hex_to_rgb(s).ok(),
        _ => None,
    }
}

fn render_cells(cells: impl Iterator<Item = (Cell, Rgb)>, opts: &RenderOptions) -> RgbaImage {
    let (w, h) = opts.output_size();
    if w == 0 || h == 0 {
        return placeholder();
    }
    let mut img = RgbaImage::from_pixel(w, h, opts.background.to_rgba());
    let scale = opts.scale.max(1);
    let pitch = opts.pitch.max(1);

    for (cell, color) in cells {
        let (cx, cy) = (cell.x / pitch, cell.y / pitch);
        if cx >= opts.grid_width || cy >= opts.grid_height {
            continue;
        }
        let px = color.to_rgba();
        for y in cy * scale..(cy + 1) * scale {
            for x in cx * scale..(cx + 1) * scale {
                img.put_pixel(x, y, px);
            }
        }
    }
    img
}
