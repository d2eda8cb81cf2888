use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radartrail::assets::decode::decode_file;
use radartrail::assets::inspect::report;
use radartrail::effects::shade::ShadeKind;
use radartrail::pipeline::batch::{DEFAULT_BLUR_RADIUS, DEFAULT_MONTAGE_NAME};
use radartrail::{
    BlendOptions, CancelToken, DEFAULT_QUEUE_CAPACITY, DirSink, FrameSink, SaveReport, TileGrid,
    TrailConfig, run_blend, run_blur, run_montage, run_shade, run_to_gray,
};

#[derive(Parser, Debug)]
#[command(name = "radartrail", version)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a frame sequence with its fading trail and coverage, then add fade-out frames.
    Blend(BlendArgs),
    /// Box blur indexed frames through the output palette.
    Blur(BlurArgs),
    /// Slope shade frames.
    Shade(ShadeArgs),
    /// Tile same-size frames into one image.
    Montage(MontageArgs),
    /// Convert 32-bit gray frames to 8-bit indexed gray.
    #[command(name = "togray")]
    ToGray(ToGrayArgs),
    /// Print size, depth, palette and index usage of images.
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Image files or directories (directories contribute their files, one level deep).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Only take files with this extension from directories.
    #[arg(long, default_value = "png")]
    ext: String,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Saves allowed in flight before blending waits for the writer.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue: usize,
}

#[derive(Args, Debug)]
struct BlendArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Fade frames after the last frame (overrides `extra-frames` from the config).
    #[arg(long)]
    extra_frames: Option<u32>,

    /// Also write the final history layers as overlay.png and bottom.png.
    #[arg(long)]
    dump_layers: bool,
}

#[derive(Args, Debug)]
struct BlurArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Blur radius in pixels.
    #[arg(long, default_value_t = DEFAULT_BLUR_RADIUS)]
    radius: u32,
}

#[derive(Args, Debug)]
struct ShadeArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Shading variant: slope, smoothed or blurred.
    #[arg(long, default_value = "slope")]
    variant: ShadeKind,
}

#[derive(Args, Debug)]
struct MontageArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Configuration JSON; its in-palette seeds the montage palette.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Tile grid as COLUMNSxROWS, or COLUMNS alone to derive the rows.
    #[arg(long)]
    tiles: TileGrid,

    /// Output file name.
    #[arg(long, default_value = DEFAULT_MONTAGE_NAME)]
    name: String,
}

#[derive(Args, Debug)]
struct ToGrayArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue: usize,
}

#[derive(Args, Debug)]
struct DumpArgs {
    #[command(flatten)]
    input: InputArgs,
}

/// Ctrl-C and SIGTERM cancel the run; the drivers stop at the next frame boundary and queued
/// saves still finish.
#[cfg(unix)]
fn cancel_on_interrupt(cancel: &CancelToken) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, cancel.flag()) {
            tracing::warn!(signal, error = %err, "cannot install signal handler");
        }
    }
}

#[cfg(not(unix))]
fn cancel_on_interrupt(_cancel: &CancelToken) {}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancelToken::new();
    cancel_on_interrupt(&cancel);
    match cli.cmd {
        Command::Blend(args) => cmd_blend(args, &cancel),
        Command::Blur(args) => cmd_blur(args, &cancel),
        Command::Shade(args) => cmd_shade(args, &cancel),
        Command::Montage(args) => cmd_montage(args, &cancel),
        Command::ToGray(args) => cmd_to_gray(args, &cancel),
        Command::Dump(args) => cmd_dump(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn has_ext(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Expand directories into their files and return every input path sorted.
fn collect_inputs(args: &InputArgs) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in &args.inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input)
                .with_context(|| format!("list directory '{}'", input.display()))?;
            for entry in entries {
                let path = entry
                    .with_context(|| format!("list directory '{}'", input.display()))?
                    .path();
                if path.is_file() && has_ext(&path, &args.ext) {
                    paths.push(path);
                }
            }
        } else {
            paths.push(input.clone());
        }
    }
    paths.sort();
    paths.dedup();
    if paths.is_empty() {
        anyhow::bail!("no images to process");
    }
    Ok(paths)
}

fn open_output(args: &OutputArgs) -> anyhow::Result<(TrailConfig, DirSink)> {
    let config = TrailConfig::from_path(&args.config)?;
    let sink = DirSink::new(&args.out, args.queue)?;
    Ok((config, sink))
}

fn log_report(report: SaveReport, out: &Path) {
    eprintln!(
        "wrote {} file(s) to {} ({} failed)",
        report.saved,
        out.display(),
        report.failed
    );
}

fn cmd_blend(args: BlendArgs, cancel: &CancelToken) -> anyhow::Result<()> {
    let paths = collect_inputs(&args.input)?;
    let (config, mut sink) = open_output(&args.output)?;
    let options = BlendOptions {
        dump_layers: args.dump_layers,
        extra_frames: args.extra_frames,
    };
    let stats = run_blend(&paths, &config, &options, &mut sink, cancel)?;
    let report = sink.finish()?;
    eprintln!(
        "blended {} of {} frame(s), {} skipped, {} fade frame(s)",
        stats.processed, stats.frames, stats.skipped, stats.fade_frames
    );
    log_report(report, &args.output.out);
    Ok(())
}

fn cmd_blur(args: BlurArgs, cancel: &CancelToken) -> anyhow::Result<()> {
    let paths = collect_inputs(&args.input)?;
    let (config, mut sink) = open_output(&args.output)?;
    let stats = run_blur(&paths, &config, args.radius, &mut sink, cancel)?;
    let report = sink.finish()?;
    eprintln!("blurred {} file(s), {} skipped", stats.processed, stats.skipped);
    log_report(report, &args.output.out);
    Ok(())
}

fn cmd_shade(args: ShadeArgs, cancel: &CancelToken) -> anyhow::Result<()> {
    let paths = collect_inputs(&args.input)?;
    let (config, mut sink) = open_output(&args.output)?;
    let stats = run_shade(&paths, &config, args.variant, &mut sink, cancel)?;
    let report = sink.finish()?;
    eprintln!("shaded {} file(s), {} skipped", stats.processed, stats.skipped);
    log_report(report, &args.output.out);
    Ok(())
}

fn cmd_montage(args: MontageArgs, cancel: &CancelToken) -> anyhow::Result<()> {
    let paths = collect_inputs(&args.input)?;
    let config = args.config.as_deref().map(TrailConfig::from_path).transpose()?;
    let mut sink = DirSink::new(&args.out, 1)?;
    let stats = run_montage(
        &paths,
        config.as_ref().map(|c| &c.in_palette),
        args.tiles,
        &args.name,
        &mut sink,
        cancel,
    )?;
    let report = sink.finish()?;
    eprintln!(
        "montaged {} tile(s), {} skipped, {} color(s) added",
        stats.tiles, stats.skipped, stats.colors_added
    );
    log_report(report, &args.out);
    Ok(())
}

fn cmd_to_gray(args: ToGrayArgs, cancel: &CancelToken) -> anyhow::Result<()> {
    let paths = collect_inputs(&args.input)?;
    let mut sink = DirSink::new(&args.out, args.queue)?;
    let stats = run_to_gray(&paths, &mut sink, cancel)?;
    let report = sink.finish()?;
    eprintln!("converted {} file(s), {} skipped", stats.processed, stats.skipped);
    log_report(report, &args.out);
    Ok(())
}

fn cmd_dump(args: DumpArgs) -> anyhow::Result<()> {
    for path in collect_inputs(&args.input)? {
        match decode_file(&path) {
            Ok(buffer) => println!("{}", report(&path.display().to_string(), &buffer)),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "cannot read image"
                );
            }
        }
    }
    Ok(())
}
