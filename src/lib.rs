//! grasp2mp4 renders GRASP GL animation containers into MP4 video.
//!
//! The pipeline has three stages:
//!
//! - Extract scripts and raster assets from the `.GL` container and decode
//!   the DOS-era pictures and clippings into RGBA bitmaps ([`extract_assets`],
//!   [`ImageCache`])
//! - Interpret each script line by line, producing an ordered
//!   [`FrameSequence`] of rendered frames and hold markers ([`run_script`])
//! - Stream the sequence into the system `ffmpeg` ([`FfmpegEncoder`])
//!
//! Interpretation is deterministic and single-threaded; the only parallelism
//! is the bounded clip-decode phase inside the motion commands. The two
//! external tools, `deark` and `ffmpeg`, are reached through narrow seams so
//! tests can substitute an in-memory [`ImageDecoder`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod encode;
mod foundation;
mod render;
mod vm;

pub use crate::assets::cache::{AssetKind, CacheKey, ImageCache};
pub use crate::assets::decode::{DearkDecoder, ImageDecoder};
pub use crate::assets::extract::{AssetCatalog, ExtractedAssets, ScriptSource, extract_assets};
pub use crate::assets::is_deark_on_path;
pub use crate::encode::ffmpeg::{EncodeConfig, FfmpegEncoder, ensure_parent_dir, is_ffmpeg_on_path};
pub use crate::foundation::error::{GraspError, GraspResult};
pub use crate::foundation::timing::{MAX_FADE_SPEED, SLOWEST_FADE_MS, Timing};
pub use crate::render::bitmap::{Bitmap, Rgba8};
pub use crate::vm::dispatch::{Interpreter, RunOutput, Step, run_script};
pub use crate::vm::mode::{VideoMode, lookup as lookup_video_mode};
pub use crate::vm::program::{Line, Script};
pub use crate::vm::state::{ExecState, FrameEvent, FrameSequence};
