//! Spritecut prepares 2D character sprite assets offline.
//!
//! Two independent pipelines consume the same [`AlphaMask`] primitive:
//!
//! - polygon extraction: mask → [`longest_contour`] → [`simplify`] → [`BoundingBox`], one
//!   [`SpriteRecord`] per sprite;
//! - limb splitting: mask → [`RegionClusterer`] → [`RegionExtractor`], one image per limb.
//!
//! A third, [`composite_layers`], stacks sprite parts into centered previews. [`Pipeline`]
//! drives all three over files on disk from a [`PipelineConfig`].
#![forbid(unsafe_code)]

mod foundation;

pub mod bounds;
pub mod cluster;
pub mod composite;
pub mod config;
pub mod contour;
pub mod extract;
pub mod io;
pub mod mask;
pub mod pipeline;
pub mod record;
pub mod simplify;

pub use crate::foundation::core::{Canvas, Point, Rect};
pub use crate::foundation::error::{SpriteError, SpriteResult};

pub use crate::bounds::BoundingBox;
pub use crate::cluster::{
    Axis, LimbRole, PixelCluster, RegionBox, RegionClusterer, Segmentation, label_limbs,
};
pub use crate::composite::composite_layers;
pub use crate::config::{
    CompositeConfig, CompositeOutput, ExtractConfig, PipelineConfig, SplitConfig, SplitJob,
};
pub use crate::contour::{Contour, find_contours, longest_contour};
pub use crate::extract::RegionExtractor;
pub use crate::mask::AlphaMask;
pub use crate::pipeline::{
    BatchReport, FileFailure, Pipeline, PolygonBatch, split_image, sprite_record,
};
pub use crate::record::{Polygon, PolygonReport, SpriteRecord};
pub use crate::simplify::simplify;
