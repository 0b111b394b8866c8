use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::report::ReportRelocateBuilder;
use crate::spec::{EnumCopyDirectoryConflictStrategy, EnumCopyFileConflictStrategy};

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Canonical form of `path`; for a path that does not exist yet, the parent is
/// canonicalized and the last component re-attached.
fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    if let (Some(path_parent), Some(name)) = (path.parent(), path.file_name())
        && let Ok(resolved_parent) = fs::canonicalize(path_parent)
    {
        return resolved_parent.join(name);
    }
    _absolutize_path(path)
}

/// `true` when `path` equals `base` or lies below it.
pub(crate) fn is_within(path: &Path, base: &Path) -> bool {
    _normalize_path(path).starts_with(_normalize_path(base))
}

pub(crate) fn is_overlap(path_a: &Path, path_b: &Path) -> bool {
    let path_a_resolved = _normalize_path(path_a);
    let path_b_resolved = _normalize_path(path_b);
    path_a_resolved.starts_with(&path_b_resolved) || path_b_resolved.starts_with(&path_a_resolved)
}

/// `true` when both paths resolve to the same existing file (links followed).
pub(crate) fn is_same_file(path_a: &Path, path_b: &Path) -> bool {
    let (Ok(stat_a), Ok(stat_b)) = (fs::metadata(path_a), fs::metadata(path_b)) else {
        return false;
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        stat_a.dev() == stat_b.dev() && stat_a.ino() == stat_b.ino()
    }
    #[cfg(not(unix))]
    {
        let _ = (stat_a, stat_b);
        _normalize_path(path_a) == _normalize_path(path_b)
    }
}

/// Final file path for copying `path_src` to `path_target`.
///
/// An existing directory target receives the file under its original base name;
/// any other target (existing file or missing path) is written literally.
pub(crate) fn derive_file_target(path_src: &Path, path_target: &Path) -> PathBuf {
    if path_target.is_dir()
        && let Some(name) = path_src.file_name()
    {
        return path_target.join(name);
    }
    path_target.to_path_buf()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ConflictRules

/// Decide whether an existing destination directory blocks descending into it.
pub(crate) fn should_skip_dir_conflict(
    path_dst: &Path,
    rule_conflict: EnumCopyDirectoryConflictStrategy,
    builder_report: &mut ReportRelocateBuilder,
) -> bool {
    if !path_dst.exists() {
        return false;
    }
    if !path_dst.is_dir() {
        builder_report.add_error(
            path_dst.to_path_buf(),
            format!(
                "Destination is a file, expected directory: {}",
                path_dst.display()
            ),
        );
        return true;
    }

    match rule_conflict {
        EnumCopyDirectoryConflictStrategy::Merge => false,
        EnumCopyDirectoryConflictStrategy::Skip => {
            builder_report.add_skipped();
            true
        }
        EnumCopyDirectoryConflictStrategy::Error => {
            builder_report.add_error(
                path_dst.to_path_buf(),
                format!("Destination exists: {}", path_dst.display()),
            );
            true
        }
    }
}

/// Decide whether an existing destination file blocks writing to it.
pub(crate) fn should_skip_file_conflict(
    path_dst: &Path,
    rule_conflict: EnumCopyFileConflictStrategy,
    builder_report: &mut ReportRelocateBuilder,
) -> bool {
    if fs::symlink_metadata(path_dst).is_err() {
        return false;
    }
    if path_dst.is_dir() {
        builder_report.add_error(
            path_dst.to_path_buf(),
            format!("Destination is a directory: {}", path_dst.display()),
        );
        return true;
    }

    match rule_conflict {
        EnumCopyFileConflictStrategy::Overwrite => false,
        EnumCopyFileConflictStrategy::Skip => {
            builder_report.add_skipped();
            true
        }
        EnumCopyFileConflictStrategy::Error => {
            builder_report.add_error(
                path_dst.to_path_buf(),
                format!("Destination exists: {}", path_dst.display()),
            );
            true
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileOperations

pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> Result<(), io::Error> {
    let target = fs::read_link(path_src)?;

    // A stale destination (file or link) is replaced, like a file overwrite.
    if let Ok(meta_dst) = fs::symlink_metadata(path_dst)
        && !meta_dst.is_dir()
    {
        fs::remove_file(path_dst)?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

/// Byte-for-byte copy; metadata follows only when `if_preserve_metadata` is set.
pub(crate) fn copy_file_bytes(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> Result<u64, io::Error> {
    let n_bytes = fs::copy(path_file_src, path_file_dst)?;
    if if_preserve_metadata {
        #[cfg(target_os = "linux")]
        {
            apply_metadata_linux(path_file_src, path_file_dst)?;
        }
    }
    Ok(n_bytes)
}

#[cfg(target_os = "linux")]
fn apply_metadata_linux(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let Ok(iter_xattr_names) = xattr::list(path_file_src) else {
        return;
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                path = %path_file_dst.display(),
                "xattr {} not copied: {e}",
                name.to_string_lossy()
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
