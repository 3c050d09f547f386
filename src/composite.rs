//! Layered sprite previews: centered source-over compositing on a shared canvas.

use image::{Rgba, RgbaImage};

use crate::foundation::core::Canvas;

pub type PremulRgba8 = [u8; 4];

/// Source-over on premultiplied RGBA8.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

pub fn premultiply(px: [u8; 4]) -> PremulRgba8 {
    let a = u16::from(px[3]);
    match a {
        0 => [0, 0, 0, 0],
        255 => px,
        _ => [
            mul_div255(u16::from(px[0]), a),
            mul_div255(u16::from(px[1]), a),
            mul_div255(u16::from(px[2]), a),
            px[3],
        ],
    }
}

pub fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    match a {
        0 => [0, 0, 0, 0],
        255 => px,
        _ => {
            let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
            [un(px[0]), un(px[1]), un(px[2]), px[3]]
        }
    }
}

/// Top-left offset that centers a `width x height` layer on `canvas`.
///
/// Uses floor division, so a layer larger than the canvas gets a negative offset.
pub fn centered_offset(canvas: Canvas, width: u32, height: u32) -> (i64, i64) {
    let dx = i64::from(canvas.width) - i64::from(width);
    let dy = i64::from(canvas.height) - i64::from(height);
    (dx.div_euclid(2), dy.div_euclid(2))
}

/// Draw `layers` bottom to top, each centered on a transparent `canvas`.
pub fn composite_layers(layers: &[RgbaImage], canvas: Canvas) -> RgbaImage {
    let cw = i64::from(canvas.width);
    let ch = i64::from(canvas.height);
    let mut buf = vec![[0u8; 4]; canvas.width as usize * canvas.height as usize];

    for layer in layers {
        let (ox, oy) = centered_offset(canvas, layer.width(), layer.height());
        for (x, y, px) in layer.enumerate_pixels() {
            let dx = ox + i64::from(x);
            let dy = oy + i64::from(y);
            if dx < 0 || dy < 0 || dx >= cw || dy >= ch {
                continue;
            }
            let idx = (dy * cw + dx) as usize;
            buf[idx] = over(buf[idx], premultiply(px.0));
        }
    }

    RgbaImage::from_fn(canvas.width, canvas.height, |x, y| {
        Rgba(unpremultiply(buf[(y as usize) * canvas.width as usize + x as usize]))
    })
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
