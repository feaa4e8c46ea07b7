//! Directory replacement for file-stores.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum CopyError {
  #[error("source directory {} does not exist", .0.display())]
  MissingSource(PathBuf),

  #[error("failed to walk {}: {message}", path.display())]
  Walk { path: PathBuf, message: String },

  #[error("failed to remove {}: {source}", path.display())]
  Remove { path: PathBuf, source: io::Error },

  #[error("failed to copy to {}: {source}", path.display())]
  Copy { path: PathBuf, source: io::Error },
}

/// Replace `dest` wholesale with a copy of `src`.
///
/// Anything previously under `dest` is removed first; nothing is merged.
/// Symlinks are recreated, special files are skipped.
pub fn replace_dir(src: &Path, dest: &Path) -> Result<u64, CopyError> {
  if !src.is_dir() {
    return Err(CopyError::MissingSource(src.to_path_buf()));
  }

  match fs::remove_dir_all(dest) {
    Ok(()) => {}
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(source) => {
      return Err(CopyError::Remove {
        path: dest.to_path_buf(),
        source,
      });
    }
  }

  let mut files = 0;
  for entry in WalkDir::new(src).sort_by_file_name() {
    let entry = entry.map_err(|e| CopyError::Walk {
      path: src.to_path_buf(),
      message: e.to_string(),
    })?;
    let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dest.join(rel);
    let copy_err = |source| CopyError::Copy {
      path: target.clone(),
      source,
    };

    let file_type = entry.file_type();
    if file_type.is_dir() {
      fs::create_dir_all(&target).map_err(copy_err)?;
    } else if file_type.is_file() {
      fs::copy(entry.path(), &target).map_err(copy_err)?;
      files += 1;
    } else if file_type.is_symlink() {
      let link = fs::read_link(entry.path()).map_err(copy_err)?;
      symlink(&link, &target).map_err(copy_err)?;
    }
  }

  Ok(files)
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
  std::os::windows::fs::symlink_file(original, link)
}
