use rayon::prelude::*;

use crate::assets::decode::PreparedFrame;
use crate::foundation::core::Rect;
use crate::foundation::math::mul_div255_u8;
use crate::render::surface::Surface;

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Draw `frame` scaled into `dest` (device pixels) with bilinear filtering.
///
/// Pixels whose centers fall outside `dest` or the surface are untouched.
pub fn draw_frame(surface: &mut Surface, frame: &PreparedFrame, dest: Rect, opacity: f32) {
    if opacity <= 0.0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
        return;
    }
    let sw = surface.width();
    let sh = surface.height();

    let x_start = dest.x0.floor().max(0.0) as u32;
    let x_end = (dest.x1.ceil().max(0.0) as u32).min(sw);
    let y_start = dest.y0.floor().max(0.0) as usize;
    let y_end = (dest.y1.ceil().max(0.0) as usize).min(sh as usize);
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let scale_x = f64::from(frame.width) / dest.width();
    let scale_y = f64::from(frame.height) / dest.height();
    let src = frame.rgba8_premul.as_slice();
    let stride = sw as usize * 4;

    surface
        .data_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .skip(y_start)
        .take(y_end - y_start)
        .for_each(|(y, row)| {
            let cy = y as f64 + 0.5;
            if cy < dest.y0 || cy >= dest.y1 {
                return;
            }
            let fy = (cy - dest.y0) * scale_y - 0.5;
            for x in x_start..x_end {
                let cx = f64::from(x) + 0.5;
                if cx < dest.x0 || cx >= dest.x1 {
                    continue;
                }
                let fx = (cx - dest.x0) * scale_x - 0.5;
                let s = sample_bilinear(src, frame.width, frame.height, fx, fy);
                let i = x as usize * 4;
                let d = [row[i], row[i + 1], row[i + 2], row[i + 3]];
                row[i..i + 4].copy_from_slice(&over(d, s, opacity));
            }
        });
}

fn sample_bilinear(src: &[u8], w: u32, h: u32, fx: f64, fy: f64) -> PremulRgba8 {
    let max_x = f64::from(w - 1);
    let max_y = f64::from(h - 1);
    let fx = fx.clamp(0.0, max_x);
    let fy = fy.clamp(0.0, max_y);

    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - f64::from(x0);
    let ty = fy - f64::from(y0);

    let at = |x: u32, y: u32| (y as usize * w as usize + x as usize) * 4;
    let (p00, p10, p01, p11) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(src[p00 + c]) * (1.0 - tx) + f64::from(src[p10 + c]) * tx;
        let bottom = f64::from(src[p01 + c]) * (1.0 - tx) + f64::from(src[p11 + c]) * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    // Keep premultiplied invariant (color <= alpha) after rounding.
    for c in 0..3 {
        out[c] = out[c].min(out[3]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
