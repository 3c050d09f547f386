//! JSON configuration for the three pipelines.
//!
//! Every field has a default, so `{}` is a valid (if idle) configuration. Relative paths in a
//! file loaded with [`PipelineConfig::from_path`] resolve against that file's directory.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::{
    cluster::{Axis, DEFAULT_GAP_THRESHOLD, RegionClusterer},
    extract::RegionExtractor,
    foundation::{
        core::Canvas,
        error::{SpriteError, SpriteResult},
    },
    mask::{EXTRACT_ALPHA_THRESHOLD, SPLIT_ALPHA_THRESHOLD},
    simplify::DEFAULT_TOLERANCE,
};

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub extract: ExtractConfig,
    pub split: SplitConfig,
    pub composite: CompositeConfig,
    /// Process files of a batch on a rayon pool.
    pub parallel: bool,
    /// Worker count for parallel batches; `None` uses rayon's default.
    pub threads: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    pub alpha_threshold: u8,
    pub tolerance: f64,
    /// Directory of sprites; the polygon pipeline is skipped by `run` when unset.
    pub input_dir: Option<PathBuf>,
    pub output: PathBuf,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: EXTRACT_ALPHA_THRESHOLD,
            tolerance: DEFAULT_TOLERANCE,
            input_dir: None,
            output: PathBuf::from("sprite_polygons.json"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    pub alpha_threshold: u8,
    pub gap_threshold: u32,
    pub axis: Axis,
    pub preserve_position: bool,
    pub jobs: Vec<SplitJob>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: SPLIT_ALPHA_THRESHOLD,
            gap_threshold: DEFAULT_GAP_THRESHOLD,
            axis: Axis::Horizontal,
            preserve_position: true,
            jobs: Vec::new(),
        }
    }
}

impl SplitConfig {
    pub fn clusterer(&self) -> RegionClusterer {
        RegionClusterer {
            gap_threshold: self.gap_threshold,
            axis: self.axis,
        }
    }

    pub fn extractor(&self) -> RegionExtractor {
        RegionExtractor {
            preserve_position: self.preserve_position,
        }
    }
}

/// One dual-limb source; outputs land at `<prefix>-back.png` and `<prefix>-front.png`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitJob {
    pub input: PathBuf,
    pub prefix: PathBuf,
}

impl SplitJob {
    pub fn output_for(&self, role: &str) -> PathBuf {
        let mut name = self
            .prefix
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!("-{role}.png"));
        self.prefix.with_file_name(name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositeConfig {
    /// Shared canvas; defaults to the largest layer extent across all outputs.
    pub canvas: Option<Canvas>,
    pub outputs: Vec<CompositeOutput>,
}

/// Layers are drawn in list order, first at the bottom.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeOutput {
    pub output: PathBuf,
    pub layers: Vec<PathBuf>,
}

impl PipelineConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> SpriteResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| SpriteError::validation(format!("parse pipeline config JSON: {e}")))
    }

    /// Load, resolve relative paths against the file's directory, and validate.
    pub fn from_path(path: impl AsRef<Path>) -> SpriteResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SpriteError::validation(format!("open pipeline config '{}': {e}", path.display()))
        })?;
        let mut cfg = Self::from_reader(BufReader::new(f))?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        cfg.resolve_paths(root);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn resolve_paths(&mut self, root: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };

        if let Some(dir) = self.extract.input_dir.as_mut() {
            join(dir);
        }
        join(&mut self.extract.output);
        for job in &mut self.split.jobs {
            join(&mut job.input);
            join(&mut job.prefix);
        }
        for out in &mut self.composite.outputs {
            join(&mut out.output);
            out.layers.iter_mut().for_each(join);
        }
    }

    pub fn validate(&self) -> SpriteResult<()> {
        let tol = self.extract.tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(SpriteError::validation(format!(
                "extract.tolerance must be a finite value >= 0, got {tol}"
            )));
        }
        if self.threads == Some(0) {
            return Err(SpriteError::validation("'threads' must be >= 1 when set"));
        }
        for job in &self.split.jobs {
            if job.prefix.file_name().is_none() {
                return Err(SpriteError::validation(format!(
                    "split job for '{}' needs a non-empty prefix",
                    job.input.display()
                )));
            }
        }
        if let Some(canvas) = self.composite.canvas {
            canvas.validate()?;
        }
        for out in &self.composite.outputs {
            if out.layers.is_empty() {
                return Err(SpriteError::validation(format!(
                    "composite output '{}' has no layers",
                    out.output.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg = PipelineConfig::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.extract.alpha_threshold, 10);
        assert_eq!(cfg.extract.tolerance, 2.0);
        assert_eq!(cfg.split.alpha_threshold, 0);
        assert_eq!(cfg.split.gap_threshold, 20);
        assert_eq!(cfg.split.axis, Axis::Horizontal);
        assert!(cfg.split.preserve_position);
        assert!(!cfg.parallel);
        cfg.validate().unwrap();
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = PipelineConfig::from_reader(r#"{ "split": { "gap": 3 } }"#.as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("validation error:"));
    }

    #[test]
    fn parses_all_sections() {
        let json = r#"{
            "extract": { "input_dir": "sprites", "tolerance": 1.5 },
            "split": {
                "axis": "vertical",
                "preserve_position": false,
                "jobs": [{ "input": "arms.png", "prefix": "out/arm" }]
            },
            "composite": {
                "canvas": { "width": 64, "height": 32 },
                "outputs": [{ "output": "full.png", "layers": ["body.png", "head.png"] }]
            },
            "parallel": true,
            "threads": 2
        }"#;
        let mut cfg = PipelineConfig::from_reader(json.as_bytes()).unwrap();
        cfg.resolve_paths(Path::new("/assets"));
        cfg.validate().unwrap();

        assert_eq!(cfg.extract.input_dir, Some(PathBuf::from("/assets/sprites")));
        assert_eq!(cfg.extract.output, PathBuf::from("/assets/sprite_polygons.json"));
        assert_eq!(cfg.split.axis, Axis::Vertical);
        assert!(!cfg.split.extractor().preserve_position);
        assert_eq!(cfg.split.clusterer().gap_threshold, 20);
        assert_eq!(
            cfg.split.jobs[0].output_for("back"),
            PathBuf::from("/assets/out/arm-back.png")
        );
        assert_eq!(cfg.composite.outputs[0].layers[1], PathBuf::from("/assets/head.png"));
        assert_eq!(cfg.threads, Some(2));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = PipelineConfig::default();
        cfg.extract.tolerance = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.threads = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.composite.canvas = Some(Canvas {
            width: 0,
            height: 5,
        });
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.composite.outputs.push(CompositeOutput {
            output: PathBuf::from("x.png"),
            layers: vec![],
        });
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.split.jobs.push(SplitJob {
            input: PathBuf::from("legs.png"),
            prefix: PathBuf::from(""),
        });
        assert!(cfg.validate().is_err());
    }
}
