//! Safe extraction of npm-style plugin tarballs.
//!
//! Every entry must live under the `package/` directory npm puts at the top
//! of a packed archive. The prefix is stripped on the way out, so
//! `package/dist/index.js` lands at `<target>/dist/index.js`.
//!
//! Guards, all checked before an entry's bytes are written:
//! - entries outside `package/` abort the extraction
//! - entries declaring more than the configured ceiling abort the extraction
//! - only regular files and directories are accepted
//! - `..`, absolute and drive-prefixed paths are rejected, and the final
//!   path is re-checked against the canonical target after symlink
//!   resolution

use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;

use crate::error::{InstallError, InstallResult};

/// Top-level directory every archive entry must live under.
pub const PACKAGE_PREFIX: &str = "package";

/// What an extraction wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Canonical path of the extraction root.
    pub root: PathBuf,
    /// Regular files written.
    pub files: usize,
    /// Directory entries created.
    pub directories: usize,
    /// Sum of the declared sizes of the written files.
    pub bytes: u64,
}

/// Extract a gzip-compressed tarball into `target`.
///
/// Any existing directory at `target` is removed first so nothing from a
/// previous install survives. Extraction is not atomic: an error part way
/// through leaves the entries written so far in place.
///
/// # Errors
///
/// Returns [`InstallError::PathOutsidePrefix`], [`InstallError::EntryTooLarge`],
/// [`InstallError::UnsafeEntryType`] or [`InstallError::PathTraversal`] for
/// hostile entries, [`InstallError::Extraction`] for undecodable or empty
/// archives, and [`InstallError::Io`] if the target cannot be prepared.
pub fn extract_archive(
    data: &[u8],
    target: &Path,
    max_entry_size: u64,
) -> InstallResult<ExtractSummary> {
    let dest = prepare_target(target)?;

    let mut archive = Archive::new(GzDecoder::new(data));
    // Never restore setuid/setgid or other mode bits from the archive.
    archive.set_preserve_permissions(false);

    let mut summary = ExtractSummary {
        root: dest.clone(),
        files: 0,
        directories: 0,
        bytes: 0,
    };
    let mut entry_count = 0usize;

    for entry_result in archive
        .entries()
        .map_err(|e| extraction(format!("failed to read archive entries: {e}")))?
    {
        let mut entry =
            entry_result.map_err(|e| extraction(format!("failed to read archive entry: {e}")))?;

        let entry_type = entry.header().entry_type();
        if is_metadata_entry(entry_type) {
            continue;
        }
        entry_count = entry_count.saturating_add(1);

        let entry_path = entry
            .path()
            .map_err(|e| extraction(format!("failed to read entry path: {e}")))?
            .into_owned();
        let display_path = entry_path.display().to_string();

        let Ok(stripped) = entry_path.strip_prefix(PACKAGE_PREFIX) else {
            return Err(InstallError::PathOutsidePrefix {
                path: display_path,
                prefix: format!("{PACKAGE_PREFIX}/"),
            });
        };

        // A PAX `size` record overrides the basic header and decides how many
        // bytes get written, so both must stay under the ceiling.
        let declared = entry
            .header()
            .size()
            .map_err(|e| extraction(format!("failed to read entry size: {e}")))?;
        let effective = entry.size();
        let size = declared.max(effective);
        if size > max_entry_size {
            return Err(InstallError::EntryTooLarge {
                path: display_path,
                size,
                limit: max_entry_size,
            });
        }

        if !matches!(entry_type, EntryType::Regular | EntryType::Directory) {
            return Err(InstallError::UnsafeEntryType {
                entry_type: format!("{entry_type:?}"),
                path: display_path,
            });
        }

        validate_relative_path(stripped, &display_path)?;
        let target_path = dest.join(stripped);
        if !target_path.starts_with(&dest) {
            return Err(InstallError::PathTraversal { path: display_path });
        }

        if entry_type == EntryType::Directory {
            if stripped.as_os_str().is_empty() {
                continue;
            }
            std::fs::create_dir_all(&target_path).map_err(|e| {
                extraction(format!(
                    "failed to create directory {}: {e}",
                    target_path.display()
                ))
            })?;
            summary.directories = summary.directories.saturating_add(1);
            continue;
        }

        if stripped.as_os_str().is_empty() {
            return Err(extraction(format!(
                "entry {display_path} would overwrite the extraction root"
            )));
        }

        if let Some(parent) = target_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                extraction(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        ensure_within(&target_path, &dest, &display_path)?;

        entry
            .unpack(&target_path)
            .map_err(|e| extraction(format!("failed to unpack {display_path}: {e}")))?;
        debug!(path = %stripped.display(), size = effective, "extracted entry");

        summary.files = summary.files.saturating_add(1);
        summary.bytes = summary.bytes.saturating_add(effective);
    }

    if entry_count == 0 {
        return Err(extraction("archive is empty".to_string()));
    }

    Ok(summary)
}

/// Remove whatever is at `target` and recreate it empty.
fn prepare_target(target: &Path) -> InstallResult<PathBuf> {
    if target.exists() {
        debug!(path = %target.display(), "removing previous extraction directory");
        std::fs::remove_dir_all(target).map_err(|e| InstallError::io(target, e))?;
    }
    std::fs::create_dir_all(target).map_err(|e| InstallError::io(target, e))?;
    target
        .canonicalize()
        .map_err(|e| InstallError::io(target, e))
}

/// Headers the tar reader consumes for bookkeeping; they are never written.
fn is_metadata_entry(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::XGlobalHeader
            | EntryType::XHeader
            | EntryType::GNULongName
            | EntryType::GNULongLink
    )
}

/// Reject `..`, root and drive-prefix components.
fn validate_relative_path(path: &Path, display_path: &str) -> InstallResult<()> {
    let escapes = path.is_absolute()
        || path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(InstallError::PathTraversal {
            path: display_path.to_string(),
        });
    }
    Ok(())
}

/// Symlink-aware boundary check, run once the parent directory exists.
fn ensure_within(target: &Path, dest: &Path, display_path: &str) -> InstallResult<()> {
    let canonical_parent = target
        .parent()
        .ok_or_else(|| InstallError::PathTraversal {
            path: display_path.to_string(),
        })?
        .canonicalize()
        .map_err(|e| extraction(format!("failed to canonicalize path for boundary check: {e}")))?;
    let canonical_target = canonical_parent.join(target.file_name().unwrap_or_default());
    if !canonical_target.starts_with(dest) {
        return Err(InstallError::PathTraversal {
            path: display_path.to_string(),
        });
    }
    Ok(())
}

fn extraction(message: String) -> InstallError {
    InstallError::Extraction { message }
}
