//! Relocation specification models and top-level error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::conf::{
    C_PATH_DIR_APP_DST, C_PATH_DIR_APP_SRC, C_PATH_DIR_BUNDLES_DST, C_PATH_DIR_BUNDLES_SRC,
    C_PATH_FILE_SENTINEL,
};
use crate::report::ReportRelocate;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCopySymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    #[default]
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Existing destination file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCopyFileConflictStrategy {
    /// Replace destination file with source file.
    #[default]
    Overwrite,
    /// Keep destination file and skip current source file.
    Skip,
    /// Record an error and skip this file.
    Error,
}

/// Existing destination directory conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCopyDirectoryConflictStrategy {
    /// Reuse destination directory and continue copying children into it.
    #[default]
    Merge,
    /// Do not descend/copy into an already existing destination directory.
    Skip,
    /// Record an error when destination directory already exists.
    Error,
}

/// Final state of one [`crate::run_plan`] call.
#[derive(Debug, Clone)]
pub enum EnumRunOutcome {
    /// The sentinel file was present; nothing was touched.
    SkippedBySentinel(PathBuf),
    /// All passes ran; the report may still carry per-entry errors.
    Completed(ReportRelocate),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options shared by copy, delete and relocate operations.
#[derive(Debug, Clone, Default)]
pub struct SpecRelocateOptions {
    /// Conflict behavior for destination files.
    pub rule_conflict_file: EnumCopyFileConflictStrategy,
    /// Conflict behavior for destination directories.
    pub rule_conflict_dir: EnumCopyDirectoryConflictStrategy,
    /// Symlink handling behavior.
    pub rule_symlink: EnumCopySymlinkStrategy,
    /// Copy permissions, timestamps and xattrs along with file bytes (Linux only).
    pub if_preserve_metadata: bool,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
    /// Delete a pass source tree even if its copy stage recorded errors.
    pub if_delete_on_error: bool,
    /// Treat a missing pass source tree as an empty one.
    pub if_allow_missing_source: bool,
    /// Run independent passes on a thread pool.
    pub if_parallel_passes: bool,
}

/// One relocation pass: move the children of `path_dir_src` under `path_dir_dst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRelocatePass {
    /// Source tree whose immediate children are relocated, then removed.
    pub path_dir_src: PathBuf,
    /// Destination root, created when absent.
    pub path_dir_dst: PathBuf,
}

impl SpecRelocatePass {
    pub fn new(path_dir_src: impl Into<PathBuf>, path_dir_dst: impl Into<PathBuf>) -> Self {
        Self {
            path_dir_src: path_dir_src.into(),
            path_dir_dst: path_dir_dst.into(),
        }
    }
}

/// A full relocation run: sentinel guard plus ordered passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRelocatePlan {
    /// Working root all default paths are resolved against.
    pub path_dir_root: PathBuf,
    /// Marker file whose presence skips the whole run.
    pub path_file_sentinel: PathBuf,
    /// Passes, executed in order unless running in parallel.
    pub passes: Vec<SpecRelocatePass>,
}

impl SpecRelocatePlan {
    /// The packaging layout: `dist/app` into the root, `dist/bundles` into `bundles`.
    pub fn default_for(path_dir_root: impl AsRef<Path>) -> Self {
        let path_dir_root = path_dir_root.as_ref();
        Self {
            path_dir_root: path_dir_root.to_path_buf(),
            path_file_sentinel: path_dir_root.join(C_PATH_FILE_SENTINEL),
            passes: vec![
                SpecRelocatePass::new(
                    path_dir_root.join(C_PATH_DIR_APP_SRC),
                    path_dir_root.join(C_PATH_DIR_APP_DST),
                ),
                SpecRelocatePass::new(
                    path_dir_root.join(C_PATH_DIR_BUNDLES_SRC),
                    path_dir_root.join(C_PATH_DIR_BUNDLES_DST),
                ),
            ],
        }
    }
}

/// One copy/delete failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// "Top-level call failed" errors (setup stage of a pass or run).
#[derive(Debug, Error)]
pub enum RelocateError {
    /// Sentinel existence could not be determined.
    #[error("Failed to check sentinel {}: {source}", path.display())]
    SentinelCheckFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Pass source tree does not exist.
    #[error("Source does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// Pass source path is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Listing the immediate children of a pass source failed.
    #[error("Failed to list directory {}: {source}", path.display())]
    ListDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Pass destination lies inside the tree that is removed afterwards.
    #[error(
        "Destination {} lies inside source {}",
        path_dir_dst.display(),
        path_dir_src.display()
    )]
    DestinationInsideSource {
        path_dir_src: PathBuf,
        path_dir_dst: PathBuf,
    },
    /// Destination root initialization failed.
    #[error("Failed to initialize destination {}: {message}", path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
