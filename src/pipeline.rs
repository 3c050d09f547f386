//! Batch pipelines: polygon extraction, limb splitting and preview compositing.
//!
//! Every file of a batch is processed independently. A failing file is logged and recorded in
//! the batch report; the remaining files are still attempted. Outputs are written only after a
//! file's processing has fully succeeded.

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;

use crate::{
    cluster::{LimbRole, Segmentation, label_limbs},
    composite::composite_layers,
    config::{CompositeOutput, PipelineConfig, SplitConfig, SplitJob},
    contour::longest_contour,
    foundation::{
        core::Canvas,
        error::{SpriteError, SpriteResult},
    },
    io::{encode_png, list_pngs, load_image, write_all_atomic, write_json_atomic, write_png_atomic},
    mask::AlphaMask,
    record::{PolygonReport, SpriteRecord, open_ring},
    simplify::simplify,
};

/// A file that could not be processed, with its rendered error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: String,
}

impl FileFailure {
    fn new(file: &Path, err: &SpriteError) -> Self {
        Self {
            file: file.to_path_buf(),
            error: err.to_string(),
        }
    }
}

/// Files written by a batch and the inputs that failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn absorb(&mut self, other: BatchReport) {
        self.written.extend(other.written);
        self.failures.extend(other.failures);
    }
}

/// Records for the sprites that decoded, plus the ones that did not.
#[derive(Clone, Debug, Default)]
pub struct PolygonBatch {
    pub records: PolygonReport,
    pub failures: Vec<FileFailure>,
}

/// Outline polygon of one decoded sprite.
///
/// Mask → longest boundary ring → Douglas-Peucker → bounds. A sprite with no occupied pixels
/// yields an empty polygon and no bounds.
pub fn sprite_record(img: &DynamicImage, alpha_threshold: u8, tolerance: f64) -> SpriteRecord {
    let mask = AlphaMask::from_image(img, alpha_threshold);
    let ring = longest_contour(&mask);
    SpriteRecord::from_polygon(open_ring(simplify(&ring, tolerance)))
}

/// Separate the limbs of one decoded source image, labelled by axis order.
///
/// Returns fewer than two images when fewer clusters exist; extra clusters are dropped. Both
/// cases, and an empty source, are logged as warnings.
pub fn split_image(
    img: &DynamicImage,
    cfg: &SplitConfig,
) -> SpriteResult<Vec<(LimbRole, RgbaImage)>> {
    let mask = AlphaMask::from_image(img, cfg.alpha_threshold);
    let mut rgba = img.to_rgba8();
    if !img.color().has_alpha() {
        mask.key_background(&mut rgba);
    }

    let clusters = cfg.clusterer().cluster(&mask);
    match Segmentation::classify(clusters.len()) {
        Segmentation::Empty => tracing::warn!("no occupied pixels; nothing to split"),
        Segmentation::Under(n) => tracing::warn!(found = n, "found {n} limb(s), expected 2"),
        Segmentation::Over(n) => {
            tracing::warn!(found = n, "found {n} limbs, expected 2; keeping the first two")
        }
        Segmentation::Exact => {}
    }

    let extractor = cfg.extractor();
    label_limbs(clusters)
        .into_iter()
        .map(|(role, cluster)| Ok((role, extractor.extract(&rgba, cluster.bbox())?)))
        .collect()
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> SpriteResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build a record for every PNG directly inside `dir`, keyed by file name.
    #[tracing::instrument(skip(self, dir), fields(dir = %dir.display()))]
    pub fn extract_polygons(&self, dir: &Path) -> SpriteResult<PolygonBatch> {
        let files = list_pngs(dir)?;
        tracing::info!(files = files.len(), "extracting polygons");

        let results = self.map_files(&files, |path| self.polygon_for(path))?;

        let mut batch = PolygonBatch::default();
        for (path, res) in files.iter().zip(results) {
            match res {
                Ok(rec) => {
                    batch.records.insert(file_key(path), rec);
                }
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "polygon extraction failed");
                    batch.failures.push(FileFailure::new(path, &e));
                }
            }
        }
        Ok(batch)
    }

    fn polygon_for(&self, path: &Path) -> SpriteResult<SpriteRecord> {
        let img = load_image(path)?;
        let cfg = &self.config.extract;
        let rec = sprite_record(&img, cfg.alpha_threshold, cfg.tolerance);

        let name = file_key(path);
        match &rec.bounds {
            Some(b) => tracing::info!(
                file = %name,
                points = rec.point_count,
                "size {:.1} x {:.1}, center ({:.1}, {:.1})",
                b.width,
                b.height,
                b.center.x,
                b.center.y
            ),
            None => tracing::warn!(file = %name, "no occupied pixels; empty polygon"),
        }
        Ok(rec)
    }

    pub fn write_polygon_report(&self, batch: &PolygonBatch, out: &Path) -> SpriteResult<()> {
        write_json_atomic(out, &batch.records)?;
        tracing::info!(
            out = %out.display(),
            sprites = batch.records.len(),
            "wrote polygon report"
        );
        Ok(())
    }

    /// Split one dual-limb source into `<prefix>-back.png` and `<prefix>-front.png`.
    #[tracing::instrument(skip(self, job), fields(input = %job.input.display()))]
    pub fn split_limbs(&self, job: &SplitJob) -> SpriteResult<Vec<PathBuf>> {
        let img = load_image(&job.input)?;
        let limbs = split_image(&img, &self.config.split)?;

        let encoded = limbs
            .iter()
            .map(|(role, limb)| encode_png(limb).map(|bytes| (job.output_for(role.name()), bytes)))
            .collect::<SpriteResult<Vec<_>>>()?;
        let outputs: Vec<(&Path, &[u8])> = encoded
            .iter()
            .map(|(out, bytes)| (out.as_path(), bytes.as_slice()))
            .collect();
        write_all_atomic(&outputs)?;

        let mut written = Vec::with_capacity(encoded.len());
        for ((role, _), (out, _)) in limbs.iter().zip(encoded) {
            tracing::info!(out = %out.display(), "saved {} limb", role.name());
            written.push(out);
        }
        Ok(written)
    }

    pub fn split_all(&self) -> SpriteResult<BatchReport> {
        let jobs = &self.config.split.jobs;
        let results = self.map_files(jobs, |job| self.split_limbs(job))?;

        let mut report = BatchReport::default();
        for (job, res) in jobs.iter().zip(results) {
            match res {
                Ok(paths) => report.written.extend(paths),
                Err(e) => {
                    tracing::error!(file = %job.input.display(), error = %e, "limb split failed");
                    report.failures.push(FileFailure::new(&job.input, &e));
                }
            }
        }
        Ok(report)
    }

    /// Draw one preview from already decoded layers.
    pub fn composite(
        &self,
        output: &CompositeOutput,
        layers: &[RgbaImage],
        canvas: Canvas,
    ) -> SpriteResult<PathBuf> {
        let img = composite_layers(layers, canvas);
        write_png_atomic(&output.output, &img)?;
        tracing::info!(
            out = %output.output.display(),
            layers = layers.len(),
            "saved {}x{} preview",
            canvas.width,
            canvas.height
        );
        Ok(output.output.clone())
    }

    /// Render every configured preview on one shared canvas.
    #[tracing::instrument(skip(self))]
    pub fn composite_all(&self) -> SpriteResult<BatchReport> {
        let outputs = &self.config.composite.outputs;
        let decoded = self.map_files(outputs, |out| {
            out.layers
                .iter()
                .map(|p| load_image(p).map(|img| img.to_rgba8()))
                .collect::<SpriteResult<Vec<_>>>()
        })?;

        let mut report = BatchReport::default();
        let canvas = self.config.composite.canvas.or_else(|| {
            Canvas::enclosing(
                decoded
                    .iter()
                    .flatten()
                    .flatten()
                    .map(|img| img.dimensions()),
            )
        });

        for (out, layers) in outputs.iter().zip(decoded) {
            let res = layers.and_then(|layers| {
                let canvas = canvas.ok_or_else(|| SpriteError::validation("no layers decoded"))?;
                self.composite(out, &layers, canvas)
            });
            match res {
                Ok(path) => report.written.push(path),
                Err(e) => {
                    tracing::error!(file = %out.output.display(), error = %e, "composite failed");
                    report.failures.push(FileFailure::new(&out.output, &e));
                }
            }
        }
        Ok(report)
    }

    /// Run every configured pipeline: polygons (when `extract.input_dir` is set), limb
    /// splits, then previews. An unreadable input directory or unwritable report is recorded
    /// as a failure and the later stages still run.
    pub fn run(&self) -> SpriteResult<BatchReport> {
        let mut report = BatchReport::default();

        if let Some(dir) = &self.config.extract.input_dir {
            let out = &self.config.extract.output;
            match self.extract_polygons(dir) {
                Ok(batch) => {
                    match self.write_polygon_report(&batch, out) {
                        Ok(()) => report.written.push(out.clone()),
                        Err(e) => {
                            tracing::error!(
                                out = %out.display(),
                                error = %e,
                                "polygon report not written"
                            );
                            report.failures.push(FileFailure::new(out, &e));
                        }
                    }
                    report.failures.extend(batch.failures);
                }
                Err(e) => {
                    tracing::error!(
                        dir = %dir.display(),
                        error = %e,
                        "polygon extraction skipped"
                    );
                    report.failures.push(FileFailure::new(dir, &e));
                }
            }
        }
        report.absorb(self.split_all()?);
        report.absorb(self.composite_all()?);
        Ok(report)
    }

    fn map_files<T, R, F>(&self, items: &[T], f: F) -> SpriteResult<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if !self.config.parallel || items.len() < 2 {
            return Ok(items.iter().map(f).collect());
        }
        let pool = build_thread_pool(self.config.threads)?;
        Ok(pool.install(|| items.par_iter().map(f).collect()))
    }
}

fn build_thread_pool(threads: Option<usize>) -> SpriteResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(SpriteError::validation("'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SpriteError::validation(format!("failed to build rayon thread pool: {e}")))
}

fn file_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage, Rgba};

    use super::*;
    use crate::foundation::core::Point;

    #[test]
    fn transparent_sprite_has_no_polygon() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(50, 50));
        let rec = sprite_record(&img, 10, 2.0);
        assert_eq!(rec.point_count, 0);
        assert!(rec.polygon.is_empty());
        assert!(rec.bounds.is_none());
    }

    #[test]
    fn opaque_square_yields_four_corners() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(30, 30, |x, y| {
            if (10..20).contains(&x) && (10..20).contains(&y) {
                Rgba([200, 10, 10, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }));
        let rec = sprite_record(&img, 10, 2.0);
        assert_eq!(rec.point_count, 4);

        let b = rec.bounds.unwrap();
        assert!((b.x - 9.5).abs() <= 0.5 && (b.y - 9.5).abs() <= 0.5);
        assert!((b.width - 10.0).abs() <= 1.0 && (b.height - 10.0).abs() <= 1.0);
        assert!((b.center - Point::new(14.5, 14.5)).hypot() <= 0.5);
    }

    #[test]
    fn faint_alpha_is_ignored_by_extraction() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 10])));
        assert_eq!(sprite_record(&img, 10, 2.0).point_count, 0);
    }

    #[test]
    fn split_labels_left_limb_back() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(100, 100, |x, y| {
            let inside_y = (40..60).contains(&y);
            if inside_y && (10..30).contains(&x) {
                Rgba([255, 0, 0, 255])
            } else if inside_y && (70..90).contains(&x) {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }));
        let limbs = split_image(&img, &SplitConfig::default()).unwrap();
        assert_eq!(limbs.len(), 2);

        let (role, back) = &limbs[0];
        assert_eq!(*role, LimbRole::Back);
        assert_eq!(back.dimensions(), (100, 100));
        assert_eq!(back.get_pixel(15, 45).0, [255, 0, 0, 255]);
        assert_eq!(back.get_pixel(75, 45).0[3], 0);

        let (role, front) = &limbs[1];
        assert_eq!(*role, LimbRole::Front);
        assert_eq!(front.get_pixel(75, 45).0, [0, 0, 255, 255]);
        assert_eq!(front.get_pixel(15, 45).0[3], 0);
    }

    #[test]
    fn split_of_rgb_source_keys_out_white() {
        let mut src = RgbImage::from_pixel(60, 10, Rgb([255, 255, 255]));
        for y in 2..8 {
            for x in 5..10 {
                src.put_pixel(x, y, Rgb([0, 0, 0]));
                src.put_pixel(x + 40, y, Rgb([9, 9, 9]));
            }
        }
        let cfg = SplitConfig {
            preserve_position: false,
            ..SplitConfig::default()
        };
        let limbs = split_image(&DynamicImage::ImageRgb8(src), &cfg).unwrap();
        assert_eq!(limbs.len(), 2);
        assert_eq!(limbs[0].1.dimensions(), (5, 6));
        assert_eq!(limbs[1].1.get_pixel(0, 0).0, [9, 9, 9, 255]);
    }

    #[test]
    fn empty_split_source_yields_nothing() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(20, 20));
        assert!(split_image(&img, &SplitConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn zero_threads_are_rejected() {
        assert!(build_thread_pool(Some(0)).is_err());
        assert!(build_thread_pool(Some(1)).is_ok());
    }
}
