use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;

use crate::assets::run_deark;
use crate::foundation::error::GraspResult;
use crate::render::bitmap::Bitmap;

/// Decodes one legacy raster asset into a [`Bitmap`], optionally remapped
/// through a palette asset.
///
/// Implementations must be callable from worker threads: the clip-prepare
/// phase of motion commands decodes several assets in parallel.
pub trait ImageDecoder: Send + Sync {
    /// Decode `asset`; when `palette` is set, remap through its color table.
    fn decode(&self, asset: &Path, palette: Option<&Path>) -> GraspResult<Bitmap>;
}

/// Production decoder: shells out to deark's `pcpaint` module and reads the
/// resulting PNG back through the `image` crate.
#[derive(Debug)]
pub struct DearkDecoder {
    work_dir: PathBuf,
    seq: AtomicU64,
}

impl DearkDecoder {
    /// Decoder writing intermediate PNG files under `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            seq: AtomicU64::new(0),
        }
    }
}

impl ImageDecoder for DearkDecoder {
    fn decode(&self, asset: &Path, palette: Option<&Path>) -> GraspResult<Bitmap> {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let out_dir = self.work_dir.join(format!("prep-{n:06}"));
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("create decode dir '{}'", out_dir.display()))?;

        let mut args: Vec<OsString> = vec![
            "-od".into(),
            out_dir.clone().into(),
            "-o".into(),
            "img".into(),
            "-m".into(),
            "pcpaint".into(),
        ];
        if let Some(pal) = palette {
            args.push("-file2".into());
            args.push(pal.into());
        }
        args.push(asset.into());
        run_deark(args)?;

        let png = out_dir.join("img.000.png");
        let img = image::open(&png)
            .with_context(|| format!("read decoded png '{}'", png.display()))?
            .to_rgba8();
        Ok(Bitmap::from_rgba_image(img))
    }
}
