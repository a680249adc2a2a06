//! Filesystem helpers shared by the pipeline and the target builders.
//!
//! Directory walks and tree copies are blocking and run on tokio's blocking
//! pool so sibling targets keep making progress while one of them copies.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::types::BarnError;

/// Removes `dir` if present and recreates it empty.
///
/// Idempotent: calling it on a missing or already-empty directory is fine.
pub async fn clean_directory(dir: &Path) -> Result<(), BarnError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(BarnError::fs(dir, e)),
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BarnError::fs(dir, e))
}

/// Creates `dir` and its parents if they do not exist.
pub async fn ensure_dir(dir: &Path) -> Result<(), BarnError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BarnError::fs(dir, e))
}

/// Recursively collects regular files under `dir` whose name ends with `.{extension}`.
///
/// Results are sorted so repeated builds copy artifacts in a stable order.
/// A missing `dir` is a [`BarnError::Filesystem`].
pub async fn find_files_with_extension(
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, BarnError> {
    let dir = dir.to_path_buf();
    let suffix = format!(".{extension}");
    blocking(move || find_files_matching(&dir, |name| name.ends_with(&suffix))).await
}

/// Every regular file under `dir`, relative to `dir`, sorted.
pub async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, BarnError> {
    let dir = dir.to_path_buf();
    blocking(move || {
        let files = find_files_matching(&dir, |_| true)?;
        Ok(files
            .into_iter()
            .filter_map(|f| f.strip_prefix(&dir).ok().map(Path::to_path_buf))
            .collect())
    })
    .await
}

fn find_files_matching(
    dir: &Path,
    matches: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, BarnError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| walk_error(e, dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && matches(name)
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Copies `src` into `dest_dir`, keeping its file name. Creates `dest_dir` if needed.
///
/// Returns the destination path.
pub async fn copy_file_into(src: &Path, dest_dir: &Path) -> Result<PathBuf, BarnError> {
    let file_name = src.file_name().ok_or_else(|| {
        BarnError::fs(
            src,
            std::io::Error::new(ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    ensure_dir(dest_dir).await?;
    let dest = dest_dir.join(file_name);
    tokio::fs::copy(src, &dest)
        .await
        .map_err(|e| BarnError::fs(src, e))?;
    Ok(dest)
}

/// Recursively copies the contents of `src` onto `dest`, preserving structure.
///
/// `dest` is created if absent; existing files with the same relative path
/// are overwritten, unrelated files in `dest` are left alone. Symbolic links
/// are recreated as links, not followed, so framework `Versions/Current`
/// links and dangling links survive the copy.
pub async fn copy_tree(src: &Path, dest: &Path) -> Result<(), BarnError> {
    let src = src.to_path_buf();
    let dest = dest.to_path_buf();
    blocking(move || copy_dir_recursive(&src, &dest)).await
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), BarnError> {
    std::fs::create_dir_all(dest).map_err(|e| BarnError::fs(dest, e))?;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(e, src))?;
        let path = entry.path();
        let relative = path.strip_prefix(src).map_err(|_| {
            BarnError::fs(
                path,
                std::io::Error::new(ErrorKind::InvalidInput, "path escapes copy source"),
            )
        })?;
        let dest_path = dest.join(relative);
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_symlink(path, &dest_path)?;
        } else if file_type.is_dir() {
            std::fs::create_dir_all(&dest_path).map_err(|e| BarnError::fs(&dest_path, e))?;
        } else {
            std::fs::copy(path, &dest_path).map_err(|e| BarnError::fs(path, e))?;
        }
    }
    Ok(())
}

/// Recreates the link at `dest` with the same (possibly dangling) target.
fn copy_symlink(src: &Path, dest: &Path) -> Result<(), BarnError> {
    let link = std::fs::read_link(src).map_err(|e| BarnError::fs(src, e))?;
    match std::fs::symlink_metadata(dest) {
        Ok(existing) if existing.is_dir() => {
            std::fs::remove_dir_all(dest).map_err(|e| BarnError::fs(dest, e))?
        }
        Ok(_) => std::fs::remove_file(dest).map_err(|e| BarnError::fs(dest, e))?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(BarnError::fs(dest, e)),
    }
    make_symlink(&link, dest).map_err(|e| BarnError::fs(dest, e))
}

#[cfg(unix)]
fn make_symlink(link: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, dest)
}

#[cfg(windows)]
fn make_symlink(link: &Path, dest: &Path) -> std::io::Result<()> {
    let resolved = dest.parent().map(|p| p.join(link));
    if resolved.is_some_and(|p| p.is_dir()) {
        std::os::windows::fs::symlink_dir(link, dest)
    } else {
        std::os::windows::fs::symlink_file(link, dest)
    }
}

fn walk_error(e: walkdir::Error, root: &Path) -> BarnError {
    let path = e.path().unwrap_or(root).to_path_buf();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    BarnError::fs(path, source)
}

/// Removes a file or directory tree. A missing path is not an error.
pub async fn remove_if_present(path: &Path) -> Result<(), BarnError> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(BarnError::fs(path, e)),
    };
    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BarnError::fs(path, e)),
    }
}

/// Resolves `path` against the current directory without touching the filesystem.
pub fn absolute(path: &Path) -> Result<PathBuf, BarnError> {
    std::path::absolute(path).map_err(|e| BarnError::fs(path, e))
}

async fn blocking<T, F>(f: F) -> Result<T, BarnError>
where
    F: FnOnce() -> Result<T, BarnError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BarnError::Task(e.to_string()))?
}
