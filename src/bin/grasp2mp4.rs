use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing::{info, warn};

use grasp2mp4::{
    DearkDecoder, EncodeConfig, FfmpegEncoder, ImageCache, Script, Timing, extract_assets,
    is_deark_on_path, is_ffmpeg_on_path, run_script,
};

#[derive(Parser, Debug)]
#[command(name = "grasp2mp4", version, about = "Render GRASP GL animations to MP4")]
struct Cli {
    /// Input GL container.
    gl_path: PathBuf,

    /// Directory the per-script MP4 files are written to.
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Overwrite MP4 files that already exist.
    #[arg(long)]
    force: bool,

    /// Output frame rate.
    #[arg(long, default_value_t = 60)]
    rate: u32,

    /// Render speed percentage; 100 is real time, 200 twice as fast.
    #[arg(long, default_value_t = 100)]
    speed: u32,

    /// Maximum output duration per script, in seconds.
    #[arg(long, default_value_t = 300)]
    max_duration: u32,

    /// Keep the temporary extraction directory for inspection.
    #[arg(long)]
    keep: bool,

    /// Only log errors.
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log per-instruction detail.
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if !is_deark_on_path() {
        anyhow::bail!("deark is required to extract GL containers, but was not found on PATH");
    }
    if !is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg is required for MP4 encoding, but was not found on PATH");
    }

    let timing = Timing::with_speed(cli.rate, cli.speed)?;
    let max_frames = u64::from(cli.max_duration) * u64::from(cli.rate);

    let work_dir = std::env::temp_dir().join(format!("grasp2mp4-{}", std::process::id()));
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("create working dir '{}'", work_dir.display()))?;

    let result = render_container(&cli, timing, max_frames, &work_dir);

    if cli.keep {
        info!(dir = %work_dir.display(), "keeping working directory");
    } else if let Err(e) = std::fs::remove_dir_all(&work_dir) {
        warn!(dir = %work_dir.display(), error = %e, "failed to clean working directory");
    }
    result
}

fn render_container(
    cli: &Cli,
    timing: Timing,
    max_frames: u64,
    work_dir: &Path,
) -> anyhow::Result<()> {
    let extracted = extract_assets(&cli.gl_path, work_dir)?;
    if extracted.scripts.is_empty() {
        anyhow::bail!("'{}' contains no animation scripts", cli.gl_path.display());
    }
    info!(
        container = %cli.gl_path.display(),
        scripts = extracted.scripts.len(),
        "container extracted"
    );

    for source in extracted.scripts {
        let out_path = cli.out_dir.join(format!("{}.mp4", source.name));
        if out_path.exists() && !cli.force {
            info!(out = %out_path.display(), "output exists, skipping (use --force to redo)");
            continue;
        }

        let script = Script::from(source);
        info!(script = %script.name(), lines = script.len(), "interpreting");

        // Decoder scratch space is per script so prepared files never clash.
        let decoder = DearkDecoder::new(work_dir.join(format!("decode-{}", script.name())));
        let mut cache = ImageCache::new(extracted.catalog.clone(), Box::new(decoder));

        let output = run_script(&script, &mut cache, timing, max_frames)?;
        let Some(mode) = output.mode else {
            warn!(script = %script.name(), "script never set a video mode, nothing to encode");
            continue;
        };
        if output.frames.is_empty() {
            warn!(script = %script.name(), "script produced no frames, nothing to encode");
            continue;
        }

        let encoder = FfmpegEncoder::new(EncodeConfig {
            width: mode.width,
            height: mode.height,
            rate: cli.rate,
            out_path: out_path.clone(),
            overwrite: true,
        });
        encoder.encode(&output.frames)?;
    }
    Ok(())
}
