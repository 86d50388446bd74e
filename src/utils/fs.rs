use anyhow::{bail, Context};
use std::io;
use std::path::{Path, PathBuf};
use std::{env, fs};

/// Make a path absolute, relative to the current directory.
///
/// The path is not canonicalized, so it doesn't need to exist.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Replace `target` with `source`.
///
/// The target gets deleted first, and then the source moved in. If the process dies in between,
/// the target is gone. Moving falls back to copying if a rename is not possible, e.g. when crossing
/// file systems.
pub fn replace_file(source: &Path, target: &Path) -> anyhow::Result<()> {
    if !source.is_file() {
        bail!("Missing signed file: {}", source.display());
    }
    fs::remove_file(target).with_context(|| format!("Delete original file: {}", target.display()))?;
    move_file(source, target)
}

fn move_file(source: &Path, target: &Path) -> anyhow::Result<()> {
    if let Err(err) = fs::rename(source, target) {
        log::debug!("Unable to rename, falling back to copy: {err}");
        fs::copy(source, target).with_context(|| {
            format!("Move file '{}' to {}", source.display(), target.display())
        })?;
        fs::remove_file(source)?;
    }

    Ok(())
}
