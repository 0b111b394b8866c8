//! Packaging layout constants.
//!
//! All paths are relative to the package root the relocator runs in.

/// Presence of this file marks a repository clone; the run is skipped.
pub const C_PATH_FILE_SENTINEL: &str = "deploy_key.enc";
/// Compiled application modules produced by the build.
pub const C_PATH_DIR_APP_SRC: &str = "dist/app";
/// Application modules land directly in the package root.
pub const C_PATH_DIR_APP_DST: &str = ".";
/// UMD bundles produced by the build.
pub const C_PATH_DIR_BUNDLES_SRC: &str = "dist/bundles";
/// Bundles land in a `bundles` directory under the package root.
pub const C_PATH_DIR_BUNDLES_DST: &str = "bundles";

/// Prefix used by one-line report summaries.
pub const C_REPORT_PREFIX: &str = "[RELOCATE]";
