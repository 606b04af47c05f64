use std::ffi::OsStr;
use std::process::Command;

use anyhow::Context as _;

use crate::foundation::error::{GraspError, GraspResult};

pub mod cache;
pub mod decode;
pub mod extract;

/// Run the system `deark` binary with `args`, capturing its output.
pub(crate) fn run_deark<I, S>(args: I) -> GraspResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let out = Command::new("deark")
        .args(args)
        .output()
        .context("spawn deark (is it installed and on PATH?)")?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(GraspError::decode(format!(
            "deark exited with status {}: {}",
            out.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Return `true` when `deark` can be invoked from `PATH`.
pub fn is_deark_on_path() -> bool {
    Command::new("deark")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
