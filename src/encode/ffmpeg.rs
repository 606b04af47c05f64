use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::info;

use crate::foundation::error::{GraspError, GraspResult};
use crate::vm::state::{FrameEvent, FrameSequence};

/// Output parameters for one MP4 encode.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub rate: u32,
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

/// Spawns the system `ffmpeg` and streams raw RGBA frames to its stdin.
///
/// Repeat markers in the sequence are realized by writing the previous
/// frame's bytes again, so the encoder sees a plain constant-rate stream.
pub struct FfmpegEncoder {
    config: EncodeConfig,
}

impl FfmpegEncoder {
    /// Encoder for one output file.
    pub fn new(config: EncodeConfig) -> Self {
        Self { config }
    }

    /// Encode the whole sequence into the configured MP4 file.
    pub fn encode(&self, frames: &FrameSequence) -> GraspResult<()> {
        let cfg = &self.config;
        if cfg.rate == 0 {
            return Err(GraspError::config("frame rate must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(GraspError::config("frame width/height must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(GraspError::config(
                "frame width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if frames.is_empty() {
            return Err(GraspError::config("refusing to encode an empty frame sequence"));
        }

        ensure_parent_dir(&cfg.out_path)?;
        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(GraspError::config(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(GraspError::config(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if cfg.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.rate.to_string(),
            "-i",
            "pipe:0",
        ]);
        // Output: h264 + yuv420p for broad compatibility.
        cmd.args([
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            GraspError::config(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GraspError::config("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| GraspError::config("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok::<_, std::io::Error>(stderr_bytes)
        });

        use std::io::Write as _;
        let mut last: Option<&[u8]> = None;
        for event in frames.events() {
            let bytes = match event {
                FrameEvent::Image(frame) => {
                    if frame.width() != cfg.width || frame.height() != cfg.height {
                        return Err(GraspError::config(format!(
                            "frame size mismatch: got {}x{}, expected {}x{}",
                            frame.width(),
                            frame.height(),
                            cfg.width,
                            cfg.height
                        )));
                    }
                    last = Some(frame.data());
                    frame.data()
                }
                // push_repeats never emits a leading repeat.
                FrameEvent::Repeat => last
                    .ok_or_else(|| GraspError::config("repeat marker before the first frame"))?,
            };
            stdin.write_all(bytes).map_err(|e| {
                GraspError::config(format!("failed to write frame to ffmpeg stdin: {e}"))
            })?;
        }

        drop(stdin);
        let status = child
            .wait()
            .map_err(|e| GraspError::config(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| GraspError::config("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| GraspError::config(format!("ffmpeg stderr read failed: {e}")))?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(GraspError::config(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        info!(
            out = %cfg.out_path.display(),
            frames = frames.len(),
            rate = cfg.rate,
            "mp4 written"
        );
        Ok(())
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> GraspResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
