//! Archive materialization: unpack a template archive and place it at the target
//!
//! Two placement modes exist. A fresh directory receives the archive directly.
//! An existing directory is never extracted into; the archive is staged in a
//! temporary directory first and then merged file by file. In both modes an
//! archive whose only top-level entry is a folder is flattened so the project
//! root never contains a redundant wrapper folder.

use crate::error::ScaffoldError;
use crate::pipeline::steps;
use crate::tracker::Tracker;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;

/// How the target directory relates to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Target was freshly created for this project and is empty
    NewDirectory,
    /// Target already exists (usually the current directory) and is merged into
    MergeIntoExisting,
}

/// A directory that now contains the unpacked template
#[derive(Debug)]
pub struct MaterializedProject {
    /// Absolute path of the project root
    pub path: PathBuf,
    /// Whether a single wrapper folder was removed
    pub flattened: bool,
    /// Non-fatal failures to remove staging paths or the archive
    pub cleanup_errors: Vec<ScaffoldError>,
}

/// Unpack `archive` into `target` according to `mode`.
///
/// For [`PlacementMode::NewDirectory`] the target must already exist and be
/// empty. Staging directories are removed on every exit path; the archive
/// itself is left to the caller.
pub fn materialize(
    archive: &Path,
    target: &Path,
    mode: PlacementMode,
    tracker: &mut Tracker,
) -> Result<MaterializedProject, ScaffoldError> {
    let file = File::open(archive).map_err(|e| extract_failed(archive, None, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| extract_failed(archive, None, e))?;
    tracker.complete(steps::ZIP_LIST, Some(&format!("{} entries", zip.len())));

    let mut cleanup_errors = Vec::new();
    let flattened = match mode {
        PlacementMode::NewDirectory => {
            extract_entries(&mut zip, archive, target)?;
            let items = top_level_items(target)?;
            tracker.start(
                steps::EXTRACT,
                Some(&format!("{} top-level items", items.len())),
            );

            match single_root(&items) {
                Some(root) => {
                    flatten_into(root, target)?;
                    true
                }
                None => false,
            }
        }
        PlacementMode::MergeIntoExisting => {
            let staging = tempfile::Builder::new()
                .prefix(".specify-staging-")
                .tempdir()
                .map_err(|e| materialize_failed(&std::env::temp_dir(), None, false, e))?;

            extract_entries(&mut zip, archive, staging.path())?;
            let items = top_level_items(staging.path())?;
            tracker.start(
                steps::EXTRACT,
                Some(&format!("staged {} items", items.len())),
            );

            let root = single_root(&items);
            let source = root.unwrap_or(staging.path());
            let merged = merge_into(source, target)?;
            tracker.start(
                steps::EXTRACT,
                Some(&format!("merged {} files into {}", merged, target.display())),
            );

            let staging_path = staging.path().to_path_buf();
            if let Err(source) = staging.close() {
                tracing::warn!(
                    path = %staging_path.display(),
                    error = %source,
                    "failed to remove staging directory"
                );
                cleanup_errors.push(ScaffoldError::CleanupFailed {
                    path: staging_path,
                    source,
                });
            }
            root.is_some()
        }
    };

    if flattened {
        tracker.complete(steps::FLATTEN, None);
    } else {
        tracker.skip(steps::FLATTEN, Some("no single root folder"));
    }

    Ok(MaterializedProject {
        path: target.to_path_buf(),
        flattened,
        cleanup_errors,
    })
}

fn extract_failed(
    archive: &Path,
    entries_processed: Option<usize>,
    source: impl Into<crate::error::BoxError>,
) -> ScaffoldError {
    ScaffoldError::ExtractFailed {
        archive: archive.to_path_buf(),
        entries_processed,
        source: source.into(),
    }
}

fn materialize_failed(
    path: &Path,
    entries_processed: Option<usize>,
    partial_merge: bool,
    source: io::Error,
) -> ScaffoldError {
    ScaffoldError::MaterializeFailed {
        path: path.to_path_buf(),
        entries_processed,
        partial_merge,
        source,
    }
}

/// Write every archive entry under `dest`, returning the number of entries processed
fn extract_entries(
    zip: &mut ZipArchive<File>,
    archive: &Path,
    dest: &Path,
) -> Result<usize, ScaffoldError> {
    let count = zip.len();
    for index in 0..count {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| extract_failed(archive, Some(index), e))?;

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| materialize_failed(&out_path, Some(index), false, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| materialize_failed(parent, Some(index), false, e))?;
        }
        let mut out = File::create(&out_path)
            .map_err(|e| materialize_failed(&out_path, Some(index), false, e))?;

        match copy_entry(&mut entry, &mut out) {
            Ok(()) => {}
            Err(CopyError::Read(e)) => return Err(extract_failed(archive, Some(index), e)),
            Err(CopyError::Write(e)) => {
                return Err(materialize_failed(&out_path, Some(index), false, e))
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                    .map_err(|e| materialize_failed(&out_path, Some(index), false, e))?;
            }
        }
    }
    tracing::debug!(entries = count, dest = %dest.display(), "extracted archive");
    Ok(count)
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Copy one entry in bounded chunks, keeping decompression and write failures apart
fn copy_entry(entry: &mut impl Read, out: &mut impl Write) -> Result<(), CopyError> {
    let mut buffer = [0u8; 8192];
    loop {
        let read = match entry.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        out.write_all(&buffer[..read]).map_err(CopyError::Write)?;
    }
    out.flush().map_err(CopyError::Write)
}

fn top_level_items(dir: &Path) -> Result<Vec<PathBuf>, ScaffoldError> {
    let read_dir = fs::read_dir(dir).map_err(|e| materialize_failed(dir, None, false, e))?;
    read_dir
        .map(|entry| {
            entry
                .map(|e| e.path())
                .map_err(|e| materialize_failed(dir, None, false, e))
        })
        .collect()
}

/// The wrapper folder, when extraction produced exactly one directory
fn single_root(items: &[PathBuf]) -> Option<&Path> {
    match items {
        [only] if only.is_dir() => Some(only.as_path()),
        _ => None,
    }
}

/// Move the contents of `root` up into `target` and remove the emptied wrapper.
///
/// The wrapper is first parked under a hidden holding directory so that a
/// child sharing the wrapper's name cannot collide with it.
fn flatten_into(root: &Path, target: &Path) -> Result<(), ScaffoldError> {
    let holding = tempfile::Builder::new()
        .prefix(".flatten-")
        .tempdir_in(target)
        .map_err(|e| materialize_failed(target, None, false, e))?;
    let parked = holding.path().join("root");
    fs::rename(root, &parked).map_err(|e| materialize_failed(root, None, false, e))?;

    let children = fs::read_dir(&parked).map_err(|e| materialize_failed(&parked, None, false, e))?;
    for child in children {
        let child = child.map_err(|e| materialize_failed(&parked, None, false, e))?;
        let dest = target.join(child.file_name());
        fs::rename(child.path(), &dest).map_err(|e| materialize_failed(&dest, None, false, e))?;
    }

    let holding_path = holding.path().to_path_buf();
    holding
        .close()
        .map_err(|e| materialize_failed(&holding_path, None, false, e))
}

/// Copy staged top-level items into `target`, returning the number of files written.
///
/// Directories that already exist are merged file by file, everything else is
/// copied whole; existing files are overwritten. Not transactional: a failure
/// leaves whatever was already copied in place.
fn merge_into(source: &Path, target: &Path) -> Result<usize, ScaffoldError> {
    let mut written = 0usize;
    let partial = |path: &Path, written: usize, e: io::Error| {
        materialize_failed(path, Some(written), true, e)
    };

    let items = fs::read_dir(source).map_err(|e| partial(source, written, e))?;
    for item in items {
        let item = item.map_err(|e| partial(source, written, e))?;
        let item_path = item.path();
        let dest = target.join(item.file_name());

        if item_path.is_dir() {
            if dest.is_dir() {
                tracing::debug!(dir = %dest.display(), "merging into existing directory");
            }
            copy_tree(&item_path, &dest, &mut written)
                .map_err(|(path, e)| partial(&path, written, e))?;
        } else {
            if dest.exists() {
                tracing::debug!(file = %dest.display(), "overwriting existing file");
            }
            fs::copy(&item_path, &dest).map_err(|e| partial(&dest, written, e))?;
            written += 1;
        }
    }
    Ok(written)
}

/// Recursively copy `src` into `dest`, creating directories as needed and
/// overwriting files that already exist
fn copy_tree(src: &Path, dest: &Path, written: &mut usize) -> Result<(), (PathBuf, io::Error)> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| (src.to_path_buf(), io::Error::from(e)))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| (entry.path().to_path_buf(), io::Error::new(io::ErrorKind::Other, e)))?;
        let dest_path = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| (dest_path.clone(), e))?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(|e| (parent.to_path_buf(), e))?;
            }
            fs::copy(entry.path(), &dest_path).map_err(|e| (dest_path.clone(), e))?;
            *written += 1;
        }
    }
    Ok(())
}
