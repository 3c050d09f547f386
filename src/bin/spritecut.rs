use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "spritecut", version)]
struct Cli {
    /// Log debug detail.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract outline polygons for every PNG in a directory into a JSON report.
    Polygons(PolygonsArgs),
    /// Split an image holding two limbs into `<prefix>-back.png` and `<prefix>-front.png`.
    Split(SplitArgs),
    /// Stack sprite layers, centered, into one preview PNG.
    Composite(CompositeArgs),
    /// Run every pipeline described by a JSON config file.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Process files in parallel.
    #[arg(long)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct PolygonsArgs {
    /// Directory of sprite PNGs.
    #[arg(long)]
    dir: PathBuf,

    /// Output JSON path.
    #[arg(long, default_value = "sprite_polygons.json")]
    out: PathBuf,

    /// Alpha values above this count as occupied.
    #[arg(long, default_value_t = spritecut::mask::EXTRACT_ALPHA_THRESHOLD)]
    alpha_threshold: u8,

    /// Maximum simplification error in pixels.
    #[arg(long, default_value_t = spritecut::simplify::DEFAULT_TOLERANCE)]
    tolerance: f64,

    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Args, Debug)]
struct SplitArgs {
    /// Input PNG holding both limbs.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output prefix; `-back.png` and `-front.png` are appended.
    #[arg(long)]
    prefix: PathBuf,

    /// Alpha values above this count as occupied.
    #[arg(long, default_value_t = spritecut::mask::SPLIT_ALPHA_THRESHOLD)]
    alpha_threshold: u8,

    /// Minimum positional jump, in pixels, that separates two limbs.
    #[arg(long, default_value_t = spritecut::cluster::DEFAULT_GAP_THRESHOLD)]
    gap: u32,

    /// Axis along which the limbs are laid out.
    #[arg(long, value_enum, default_value_t = AxisChoice::Horizontal)]
    axis: AxisChoice,

    /// Crop each limb to its bounds instead of keeping the source canvas.
    #[arg(long)]
    crop: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AxisChoice {
    Horizontal,
    Vertical,
}

#[derive(Args, Debug)]
struct CompositeArgs {
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Canvas width; defaults to the widest layer.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Canvas height; defaults to the tallest layer.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Layer PNGs, bottom first.
    #[arg(required = true)]
    layers: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Pipeline config JSON.
    #[arg(long)]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let report = match cli.cmd {
        Command::Polygons(args) => cmd_polygons(args)?,
        Command::Split(args) => cmd_split(args)?,
        Command::Composite(args) => cmd_composite(args)?,
        Command::Run(args) => cmd_run(args)?,
    };
    finish(report)
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_polygons(args: PolygonsArgs) -> anyhow::Result<spritecut::BatchReport> {
    let mut config = spritecut::PipelineConfig {
        parallel: args.batch.parallel,
        threads: args.batch.threads,
        ..Default::default()
    };
    config.extract.alpha_threshold = args.alpha_threshold;
    config.extract.tolerance = args.tolerance;

    let pipeline = spritecut::Pipeline::new(config)?;
    let batch = pipeline
        .extract_polygons(&args.dir)
        .with_context(|| format!("scan sprite dir '{}'", args.dir.display()))?;
    pipeline
        .write_polygon_report(&batch, &args.out)
        .with_context(|| format!("write report '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(spritecut::BatchReport {
        written: vec![args.out],
        failures: batch.failures,
    })
}

fn cmd_split(args: SplitArgs) -> anyhow::Result<spritecut::BatchReport> {
    let mut config = spritecut::PipelineConfig::default();
    config.split.alpha_threshold = args.alpha_threshold;
    config.split.gap_threshold = args.gap;
    config.split.axis = match args.axis {
        AxisChoice::Horizontal => spritecut::Axis::Horizontal,
        AxisChoice::Vertical => spritecut::Axis::Vertical,
    };
    config.split.preserve_position = !args.crop;
    config.split.jobs.push(spritecut::SplitJob {
        input: args.in_path,
        prefix: args.prefix,
    });

    Ok(spritecut::Pipeline::new(config)?.split_all()?)
}

fn cmd_composite(args: CompositeArgs) -> anyhow::Result<spritecut::BatchReport> {
    let mut config = spritecut::PipelineConfig::default();
    config.composite.canvas = match (args.width, args.height) {
        (Some(width), Some(height)) => Some(spritecut::Canvas::new(width, height)?),
        _ => None,
    };
    config.composite.outputs.push(spritecut::CompositeOutput {
        output: args.out,
        layers: args.layers,
    });

    Ok(spritecut::Pipeline::new(config)?.composite_all()?)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<spritecut::BatchReport> {
    let config = spritecut::PipelineConfig::from_path(&args.config)
        .with_context(|| format!("load config '{}'", args.config.display()))?;
    Ok(spritecut::Pipeline::new(config)?.run()?)
}

fn finish(report: spritecut::BatchReport) -> anyhow::Result<()> {
    for path in &report.written {
        tracing::debug!(out = %path.display(), "written");
    }
    if report.is_clean() {
        return Ok(());
    }
    for f in &report.failures {
        eprintln!("failed: {}: {}", f.file.display(), f.error);
    }
    anyhow::bail!("{} file(s) failed", report.failures.len())
}
