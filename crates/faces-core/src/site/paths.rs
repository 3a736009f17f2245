use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Resolve `path` and refuse anything that lands outside `base_dir`.
pub fn safe_path(path: &Path, base_dir: &Path) -> Result<PathBuf> {
    let abs_path = absolute(path)?;
    let abs_base = absolute(base_dir)?;
    if !abs_path.starts_with(&abs_base) {
        bail!("Unsafe file path detected: {}", path.display());
    }
    Ok(abs_path)
}
