use image::{Rgba, RgbaImage};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BoardError, Result};

// ============================================================================
// Rgb / Hsv value types
// ============================================================================

/// An opaque 8-bit sRGB color.  Serializes as lowercase `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from unbounded channel values, clamping each to `0..=255`.
    pub fn from_channels(r: i32, g: i32, b: i32) -> Self {
        Self {
            r: r.clamp(0, 255) as u8,
            g: g.clamp(0, 255) as u8,
            b: b.clamp(0, 255) as u8,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    pub fn to_hsv(self) -> Hsv {
        rgb_to_hsv(self)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Rgb {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        hex_to_rgb(s)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex_to_rgb(&s).map_err(serde::de::Error::custom)
    }
}

/// HSV triple: hue in degrees `[0, 360)`, saturation and value in percent
/// `[0, 100]`.  Kept as floats so conversions stay lossless; use
/// [`Hsv::rounded`] for display.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    pub fn new(h: f32, s: f32, v: f32) -> Self {
        Self { h, s, v }
    }

    /// Integer representation shown in the slider inputs.
    pub fn rounded(self) -> (u16, u8, u8) {
        let h = self.h.round().rem_euclid(360.0) as u16;
        let s = self.s.round().clamp(0.0, 100.0) as u8;
        let v = self.v.round().clamp(0.0, 100.0) as u8;
        (h, s, v)
    }

    pub fn to_rgb(self) -> Rgb {
        hsv_to_rgb(self)
    }
}

// -- Colour-space conversions -----------------------------------

/// Parse `#rrggbb`, `rrggbb` or `#rgb`.  Anything else is rejected.
pub fn hex_to_rgb(hex: &str) -> Result<Rgb> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BoardError::InvalidColor(format!("'{}' is not a hex color", hex)));
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let parsed = match digits.len() {
        6 => channel(&digits[0..2])
            .zip(channel(&digits[2..4]))
            .zip(channel(&digits[4..6]))
            .map(|((r, g), b)| Rgb::new(r, g, b)),
        // Shorthand only with the leading '#', like CSS.
        3 if trimmed.starts_with('#') => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            expand(0)
                .zip(expand(1))
                .zip(expand(2))
                .map(|((r, g), b)| Rgb::new(r, g, b))
        }
        _ => None,
    };
    parsed.ok_or_else(|| BoardError::InvalidColor(format!("'{}' is not a hex color", hex)))
}

/// Format channels as lowercase `#rrggbb`, clamping each to `0..=255` first.
pub fn rgb_to_hex(r: i32, g: i32, b: i32) -> String {
    Rgb::from_channels(r, g, b).to_hex()
}

pub fn rgb_to_hsv(rgb: Rgb) -> Hsv {
    let r = rgb.r as f32 / 255.0;
    let g = rgb.g as f32 / 255.0;
    let b = rgb.b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;

    let h = if d == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / d) % 6.0)
    } else if max == g {
        60.0 * (((b - r) / d) + 2.0)
    } else {
        60.0 * (((r - g) / d) + 4.0)
    };
    let h = wrap_hue(h);
    let s = if max == 0.0 { 0.0 } else { d / max * 100.0 };
    Hsv::new(h, s, max * 100.0)
}

pub fn hsv_to_rgb(hsv: Hsv) -> Rgb {
    let h = hsv.h.rem_euclid(360.0);
    let s = hsv.s.clamp(0.0, 100.0) / 100.0;
    let v = hsv.v.clamp(0.0, 100.0) / 100.0;

    let h6 = h / 60.0;
    let c = v * s;
    let x = c * (1.0 - ((h6 % 2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h6 as i32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb::from_channels(
        ((r + m) * 255.0).round() as i32,
        ((g + m) * 255.0).round() as i32,
        ((b + m) * 255.0).round() as i32,
    )
}

// ============================================================================
// ColorState: hex / RGB / HSV kept in sync
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgbChannel {
    Red,
    Green,
    Blue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HsvComponent {
    Hue,
    Saturation,
    Value,
}

/// The current drawing color in all three representations.  Every setter
/// recomputes the other two, so they always denote the same color.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorState {
    rgb: Rgb,
    hsv: Hsv,
    hex: String,
}

impl Default for ColorState {
    fn default() -> Self {
        Self::new(crate::DEFAULT_DRAW_COLOR)
    }
}

impl ColorState {
    pub fn new(rgb: Rgb) -> Self {
        Self {
            rgb,
            hsv: rgb_to_hsv(rgb),
            hex: rgb.to_hex(),
        }
    }

    pub fn rgb(&self) -> Rgb {
        self.rgb
    }

    pub fn hsv(&self) -> Hsv {
        self.hsv
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Accepts `#rrggbb`, `rrggbb` or `#rgb`.  On error nothing changes.
    pub fn set_hex(&mut self, input: &str) -> Result<()> {
        let rgb = hex_to_rgb(input)?;
        self.set_rgb(rgb);
        Ok(())
    }

    pub fn set_rgb(&mut self, rgb: Rgb) {
        self.rgb = rgb;
        self.hsv = rgb_to_hsv(rgb);
        self.hex = rgb.to_hex();
    }

    pub fn set_rgb_channel(&mut self, channel: RgbChannel, value: i32) {
        let v = value.clamp(0, 255) as u8;
        let mut rgb = self.rgb;
        match channel {
            RgbChannel::Red => rgb.r = v,
            RgbChannel::Green => rgb.g = v,
            RgbChannel::Blue => rgb.b = v,
        }
        self.set_rgb(rgb);
    }

    /// Store `hsv` as given (hue wrapped, the rest clamped) so the hue survives zero saturation,
    /// then derive RGB and hex from it.
    pub fn set_hsv(&mut self, hsv: Hsv) {
        let hsv = Hsv::new(
            wrap_hue(hsv.h),
            hsv.s.clamp(0.0, 100.0),
            hsv.v.clamp(0.0, 100.0),
        );
        self.hsv = hsv;
        self.rgb = hsv_to_rgb(hsv);
        self.hex = self.rgb.to_hex();
    }

    pub fn set_hsv_component(&mut self, component: HsvComponent, value: f32) {
        let mut hsv = self.hsv;
        match component {
            HsvComponent::Hue => hsv.h = value,
            HsvComponent::Saturation => hsv.s = value,
            HsvComponent::Value => hsv.v = value,
        }
        self.set_hsv(hsv);
    }

    /// Click/drag on the hue strip: picks a fully saturated, full-value hue.
    pub fn set_hue_from_slider(&mut self, x: f32, width: f32) {
        let hue = hue_at_offset(x, width);
        self.set_hsv(Hsv::new(hue, 100.0, 100.0));
    }

    /// Indicator position on a hue strip of `width` pixels.
    pub fn hue_indicator(&self, width: f32) -> f32 {
        hue_indicator_offset(self.hsv.h, width)
    }
}

// ============================================================================
// Hue strip
// ============================================================================

/// Render the hue selection strip: a linear gradient through stops every 30°
/// at full saturation and value.
pub fn hue_gradient(width: u32, height: u32) -> RgbaImage {
    let stops: Vec<Rgb> = (0..=12)
        .map(|i| hsv_to_rgb(Hsv::new(i as f32 * 30.0, 100.0, 100.0)))
        .collect();
    let w = width.max(1) as f32;

    RgbaImage::from_fn(width, height, |x, _| {
        let hue = (x as f32 + 0.5) / w * 360.0;
        let seg = ((hue / 30.0).floor() as usize).min(11);
        let t = (hue - seg as f32 * 30.0) / 30.0;
        let (a, b) = (stops[seg], stops[seg + 1]);
        let lerp = |p: u8, q: u8| (p as f32 + (q as f32 - p as f32) * t).round() as u8;
        Rgba([lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b), 255])
    })
}

/// Horizontal position of the hue indicator on a strip of `width` pixels.
pub fn hue_indicator_offset(hue: f32, width: f32) -> f32 {
    hue.clamp(0.0, 360.0) / 360.0 * width
}

/// Hue (whole degrees) under a pointer at `x` on a strip of `width` pixels.
pub fn hue_at_offset(x: f32, width: f32) -> f32 {
    if width <= 0.0 {
        return 0.0;
    }
    wrap_hue((x.clamp(0.0, width) / width * 360.0).round())
}

/// Fold any angle into `[0, 360)`; non-finite input becomes 0.
pub fn wrap_hue(h: f32) -> f32 {
    if !h.is_finite() {
        return 0.0;
    }
    let h = h.rem_euclid(360.0);
    // rem_euclid can round up to 360.0 for tiny negative input
    if h >= 360.0 { 0.0 } else { h }
}
