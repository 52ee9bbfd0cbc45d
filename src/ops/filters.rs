// ============================================================================
// IMAGE FILTERS - box blur, unsharp mask
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Store a channel average the way an 8-bit clamped buffer would: round half
/// to even, then clamp.
#[inline(always)]
fn to_u8(v: f32) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Separable box blur over the RGB channels.  Alpha is copied through.
///
/// Each output channel is the mean of the `2 * radius + 1` taps that fall
/// inside the image (taps past an edge are dropped, not clamped), rounded to
/// 8 bits.  The vertical pass reads the rounded horizontal result.
pub fn box_blur(src: &RgbaImage, radius: u32) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 || radius == 0 {
        return src.clone();
    }
    let r = radius as isize;
    let stride = w * 4;

    // --- Horizontal pass (parallel by row) ---
    let src_raw = src.as_raw();
    let mut horiz = src.clone();
    horiz.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let lo = (x as isize - r).max(0) as usize;
            let hi = (x as isize + r).min(w as isize - 1) as usize;
            let count = (hi - lo + 1) as f32;
            for c in 0..3 {
                let sum: u32 = (lo..=hi).map(|sx| row_in[sx * 4 + c] as u32).sum();
                row_out[x * 4 + c] = to_u8(sum as f32 / count);
            }
        }
    });

    // --- Vertical pass over the horizontal result ---
    let horiz_raw = horiz.as_raw();
    let mut out = horiz.clone();
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let lo = (y as isize - r).max(0) as usize;
        let hi = (y as isize + r).min(h as isize - 1) as usize;
        let count = (hi - lo + 1) as f32;
        for x in 0..w {
            for c in 0..3 {
                let sum: u32 = (lo..=hi)
                    .map(|sy| horiz_raw[sy * stride + x * 4 + c] as u32)
                    .sum();
                row_out[x * 4 + c] = to_u8(sum as f32 / count);
            }
        }
    });

    out
}

/// Unsharp mask: `original + amount * (original - blurred)` per RGB channel,
/// clamped to `[0, 255]`, with a box blur of `radius` as the blurred copy.
/// Alpha is untouched.
pub fn unsharp_mask(src: &RgbaImage, amount: f32, radius: u32) -> RgbaImage {
    let blurred = box_blur(src, radius);
    let stride = src.width() as usize * 4;
    if stride == 0 {
        return src.clone();
    }
    let src_raw = src.as_raw();
    let blur_raw = blurred.as_raw();
    let mut out = src.clone();

    out.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_start = y * stride;
        for (pi, px) in row_out.chunks_exact_mut(4).enumerate() {
            let si = row_start + pi * 4;
            for c in 0..3 {
                let s = src_raw[si + c] as f32;
                let b = blur_raw[si + c] as f32;
                px[c] = to_u8(s + amount * (s - b));
            }
        }
    });

    out
}
