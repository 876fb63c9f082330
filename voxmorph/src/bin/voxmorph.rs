//! voxmorph command-line interface
//!
//! # Examples
//!
//! ```bash
//! # Dilate in 8 blocks with a 3x3x3 cube
//! voxmorph run --input volume.npy --shape 512 512 256 --blocks 8 --op grey_dilation
//!
//! # Compress once, then filter several times reusing the artifact
//! voxmorph compress --input volume.npy --shape 512 512 256 --work-dir work
//! voxmorph run --input volume.npy --shape 512 512 256 --blocks 8 --op erode \
//!     --work-dir work --reuse-compressed
//!
//! # Rebuild the merged volume from an existing slab stream
//! voxmorph merge --shape 512 512 256 --work-dir work
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use log::{info, warn};
use std::path::PathBuf;
use voxmorph::block::{DEFAULT_HALO, Pipeline, PipelineConfig, WORK_DIR_ENV};
use voxmorph::io::{ClosedStream, VolumeAssembler};
use voxmorph::morph::{MorphOp, StructuringElement};
use voxmorph::{MemoryProbe, NullProbe, SystemMemoryProbe, VolumeShape};

/// Blocked grey-scale morphology for volumes larger than memory
#[derive(Parser, Debug)]
#[command(name = "voxmorph")]
#[command(version)]
#[command(about = "Blocked grey-scale morphology for volumes larger than memory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding compressed/ and output/
    #[arg(long, global = true, env = WORK_DIR_ENV, default_value = ".")]
    work_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Flatten, compress, filter in blocks and merge
    Run(RunArgs),

    /// Write the compressed matrix only
    Compress(VolumeArgs),

    /// Merge an existing slab stream into a volume
    Merge(ShapeArgs),
}

#[derive(Args, Debug)]
struct ShapeArgs {
    /// Volume dimensions
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], required = true)]
    shape: Vec<usize>,
}

#[derive(Args, Debug)]
struct VolumeArgs {
    /// Input .npy volume (little-endian f32, C order)
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    shape: ShapeArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    volume: VolumeArgs,

    /// Number of slabs along X
    #[arg(short, long)]
    blocks: usize,

    /// Operation (grey_dilation or grey_erosion)
    #[arg(long)]
    op: String,

    /// Structuring element
    #[arg(long, value_enum, default_value_t = SelKind::Cube)]
    se: SelKind,

    /// Structuring element edge length (cube) or diameter (ball)
    #[arg(long, default_value_t = 3)]
    se_size: usize,

    /// Halo depth in X layers
    #[arg(long, default_value_t = DEFAULT_HALO)]
    halo: usize,

    /// Reload an existing compressed matrix instead of rebuilding it
    #[arg(long)]
    reuse_compressed: bool,

    /// Sample free memory at each checkpoint and report the average usage
    #[arg(long)]
    memory: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SelKind {
    Cube,
    Cross,
    Ball,
}

impl ShapeArgs {
    fn volume_shape(&self) -> anyhow::Result<VolumeShape> {
        match self.shape.as_slice() {
            &[x, y, z] => Ok(VolumeShape::new(x, y, z)?),
            other => anyhow::bail!("expected 3 dimensions, got {}", other.len()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_command(cli.work_dir, args),
        Commands::Compress(args) => compress_command(cli.work_dir, args),
        Commands::Merge(args) => merge_command(cli.work_dir, args),
    }
}

fn structuring_element(kind: SelKind, size: usize) -> anyhow::Result<StructuringElement> {
    let sel = match kind {
        SelKind::Cube => StructuringElement::cube(size)?,
        SelKind::Cross => StructuringElement::cross()?,
        SelKind::Ball => StructuringElement::ball(size / 2)?,
    };
    Ok(sel)
}

fn run_command(work_dir: PathBuf, args: RunArgs) -> anyhow::Result<()> {
    // reject unknown operators before touching the input
    let op: MorphOp = args.op.parse()?;
    let shape = args.volume.shape.volume_shape()?;
    let sel = structuring_element(args.se, args.se_size)?;
    let config = PipelineConfig::new(&args.volume.input, shape)
        .with_work_dir(work_dir)
        .with_halo(args.halo);

    let probe: Box<dyn MemoryProbe> = if args.memory {
        Box::new(SystemMemoryProbe::new())
    } else {
        Box::new(NullProbe)
    };
    let mut pipeline = Pipeline::new(config, sel, probe)
        .with_context(|| format!("cannot open {}", args.volume.input.display()))?;

    let merged = if args.reuse_compressed {
        let matrix = match pipeline.load_compressed() {
            Ok(matrix) => matrix,
            Err(e) if e.is_recoverable() => {
                warn!("{e}; rebuilding compressed matrix");
                {
                    let view = pipeline.convert_to_2d()?;
                    pipeline.compressed_storage(&view)?;
                }
                pipeline.load_compressed()?
            }
            Err(e) => return Err(e.into()),
        };
        let stream = pipeline.morphology(&matrix, args.blocks, op)?;
        drop(matrix);
        pipeline.merge_blocks(&stream)?
    } else {
        pipeline.run(args.blocks, op.name())?
    };

    if args.memory {
        match pipeline.memory_summary() {
            Some(summary) => info!("{summary}"),
            None => warn!("not enough memory samples for a summary"),
        }
    }
    info!("{} written to {}", op.verb(), merged.display());
    Ok(())
}

fn compress_command(work_dir: PathBuf, args: VolumeArgs) -> anyhow::Result<()> {
    let shape = args.shape.volume_shape()?;
    let config = PipelineConfig::new(&args.input, shape).with_work_dir(work_dir);
    let compressed = config.compressed_path();
    let pipeline = Pipeline::new(config, StructuringElement::cube(1)?, NullProbe)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let view = pipeline.convert_to_2d()?;
    let matrix = pipeline.compressed_storage(&view)?;
    info!(
        "{} stored entries of {} written to {}",
        matrix.nnz(),
        shape.len(),
        compressed.display()
    );
    Ok(())
}

fn merge_command(work_dir: PathBuf, args: ShapeArgs) -> anyhow::Result<()> {
    let shape = args.volume_shape()?;
    // the input is not read when merging
    let config = PipelineConfig::new("", shape).with_work_dir(work_dir);
    let stream = ClosedStream::from_existing(config.stream_path())?;
    let merged = VolumeAssembler::new(shape).assemble(&stream, config.merged_path())?;
    info!("merged {} values into {}", stream.elements(), merged.display());
    Ok(())
}
