//! Binary occupancy masks derived from sprite transparency.

use image::{DynamicImage, Rgba, RgbaImage};

/// Alpha cut-off used when extracting outline polygons.
pub const EXTRACT_ALPHA_THRESHOLD: u8 = 10;
/// Alpha cut-off used when splitting limbs: any non-zero alpha is occupied.
pub const SPLIT_ALPHA_THRESHOLD: u8 = 0;

const BACKGROUND_RGB: [u8; 3] = [255, 255, 255];

/// Same-size boolean grid; `true` marks an occupied pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl AlphaMask {
    /// Derive a mask from `img`.
    ///
    /// Images with an alpha channel mark pixels whose alpha exceeds `alpha_threshold`.
    /// Images without one treat pure white as background and everything else as occupied.
    pub fn from_image(img: &DynamicImage, alpha_threshold: u8) -> Self {
        if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            Self::from_fn(rgba.width(), rgba.height(), |x, y| {
                rgba.get_pixel(x, y)[3] > alpha_threshold
            })
        } else {
            let rgb = img.to_rgb8();
            Self::from_fn(rgb.width(), rgb.height(), |x, y| {
                rgb.get_pixel(x, y).0 != BACKGROUND_RGB
            })
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Occupancy at `(x, y)`; pixels outside the grid are unoccupied.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.cells[y as usize * self.width as usize + x as usize]
    }

    pub(crate) fn get_signed(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.get(x, y),
            _ => false,
        }
    }

    /// Number of occupied pixels.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// Occupied coordinates in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c)
            .map(move |(i, _)| ((i % w) as u32, (i / w) as u32))
    }

    /// Clear every pixel of `rgba` that this mask marks unoccupied.
    ///
    /// Used to turn the white background of an RGB source into transparency.
    pub fn key_background(&self, rgba: &mut RgbaImage) {
        for (x, y, px) in rgba.enumerate_pixels_mut() {
            if !self.get(x, y) {
                *px = Rgba([0, 0, 0, 0]);
            }
        }
    }
}
