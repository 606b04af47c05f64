use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::debug;

use crate::assets::run_deark;
use crate::foundation::error::GraspResult;

/// One animation script pulled out of a GL container.
#[derive(Clone, Debug)]
pub struct ScriptSource {
    /// Script name, the container member's file stem.
    pub name: String,
    /// Raw script text, one entry per line. Blank and comment lines are
    /// kept; the interpreter classifies lines lazily during execution.
    pub lines: Vec<String>,
}

/// Named raster assets addressed by scripts.
///
/// Lookups are case-insensitive (DOS file names), and every asset is
/// registered under both its bare stem and its full file name since scripts
/// reference either spelling.
#[derive(Clone, Debug, Default)]
pub struct AssetCatalog {
    pics: HashMap<String, PathBuf>,
    clips: HashMap<String, PathBuf>,
}

impl AssetCatalog {
    /// Register a picture asset under `name`.
    pub fn insert_pic(&mut self, name: &str, path: PathBuf) {
        self.pics.insert(name.to_ascii_lowercase(), path);
    }

    /// Register a clipping asset under `name`.
    pub fn insert_clip(&mut self, name: &str, path: PathBuf) {
        self.clips.insert(name.to_ascii_lowercase(), path);
    }

    /// Resolve a picture name to its extracted file path.
    pub fn pic_path(&self, name: &str) -> Option<&Path> {
        self.pics.get(&name.to_ascii_lowercase()).map(PathBuf::as_path)
    }

    /// Resolve a clipping name to its extracted file path.
    pub fn clip_path(&self, name: &str) -> Option<&Path> {
        self.clips.get(&name.to_ascii_lowercase()).map(PathBuf::as_path)
    }
}

/// Everything extracted from one GL container.
#[derive(Clone, Debug, Default)]
pub struct ExtractedAssets {
    /// Scripts in name order.
    pub scripts: Vec<ScriptSource>,
    /// Raster assets the scripts may reference.
    pub catalog: AssetCatalog,
}

/// Extract scripts and raster assets from `container` into `work_dir` using
/// the system `deark` binary.
///
/// Container members are classified by extension: `.txt` is a script,
/// `.pic` a picture, `.clp` a clipping. Anything else is ignored.
pub fn extract_assets(container: &Path, work_dir: &Path) -> GraspResult<ExtractedAssets> {
    let out_dir = work_dir.join("gl-files");
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create extraction dir '{}'", out_dir.display()))?;

    run_deark([
        OsArg::from("-od"),
        out_dir.clone().into(),
        "-o".into(),
        "_".into(),
        container.to_path_buf().into(),
    ])?;

    let mut files = Vec::new();
    collect_files(&out_dir, &mut files)?;
    files.sort();

    let mut extracted = ExtractedAssets::default();
    for path in files {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            continue;
        };

        // deark names every output `_.NNN.<original>`; restore the original.
        let clean = strip_extract_prefix(&file_name);
        let path = if clean != file_name {
            let renamed = path.with_file_name(clean);
            std::fs::rename(&path, &renamed)
                .with_context(|| format!("rename extracted file '{}'", path.display()))?;
            renamed
        } else {
            path
        };

        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "txt" => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("read script '{}'", path.display()))?;
                extracted.scripts.push(ScriptSource {
                    name: stem,
                    lines: split_script_lines(&text),
                });
            }
            "pic" => {
                extracted.catalog.insert_pic(&stem, path.clone());
                extracted.catalog.insert_pic(&name, path);
            }
            "clp" => {
                extracted.catalog.insert_clip(&stem, path.clone());
                extracted.catalog.insert_clip(&name, path);
            }
            _ => debug!(file = %path.display(), "ignoring unrecognized container member"),
        }
    }

    extracted.scripts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(extracted)
}

type OsArg = std::ffi::OsString;

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> GraspResult<()> {
    let rd = std::fs::read_dir(dir)
        .with_context(|| format!("list extraction dir '{}'", dir.display()))?;
    for entry in rd {
        let entry = entry.with_context(|| format!("read extraction dir '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Strip the `_.NNN.` prefix deark puts on output file names.
fn strip_extract_prefix(name: &str) -> &str {
    let Some(rest) = name.strip_prefix("_.") else {
        return name;
    };
    match rest.split_once('.') {
        Some((digits, tail))
            if !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && !tail.is_empty() =>
        {
            tail
        }
        _ => name,
    }
}

/// Split script text into lines, tolerating `\r\n` and bare-`\r` endings
/// (some GL containers carry classic-Mac style scripts).
fn split_script_lines(text: &str) -> Vec<String> {
    if text.contains('\n') {
        text.replace('\r', "")
            .split('\n')
            .map(str::to_string)
            .collect()
    } else {
        text.split('\r').map(str::to_string).collect()
    }
}
