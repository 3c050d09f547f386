//! Materialize a cluster's bounding box as its own image.

use image::{RgbaImage, imageops};

use crate::{
    cluster::RegionBox,
    foundation::error::{SpriteError, SpriteResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionExtractor {
    /// Keep the source canvas size and paste the region back at its original offset.
    /// When `false`, the output is cropped tightly to the region.
    pub preserve_position: bool,
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self {
            preserve_position: true,
        }
    }
}

impl RegionExtractor {
    pub fn extract(&self, source: &RgbaImage, region: RegionBox) -> SpriteResult<RgbaImage> {
        validate_region(region, source.width(), source.height())?;

        let cropped = imageops::crop_imm(
            source,
            region.x1,
            region.y1,
            region.width(),
            region.height(),
        )
        .to_image();

        if !self.preserve_position {
            return Ok(cropped);
        }

        let mut canvas = RgbaImage::new(source.width(), source.height());
        imageops::replace(
            &mut canvas,
            &cropped,
            i64::from(region.x1),
            i64::from(region.y1),
        );
        Ok(canvas)
    }
}

fn validate_region(region: RegionBox, width: u32, height: u32) -> SpriteResult<()> {
    if region.x2 <= region.x1 || region.y2 <= region.y1 {
        return Err(SpriteError::invalid_region(format!(
            "degenerate box ({}, {}, {}, {})",
            region.x1, region.y1, region.x2, region.y2
        )));
    }
    if region.x2 > width || region.y2 > height {
        return Err(SpriteError::invalid_region(format!(
            "box ({}, {}, {}, {}) exceeds {width}x{height} source",
            region.x1, region.y1, region.x2, region.y2
        )));
    }
    Ok(())
}
