use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use pkgroot_io_fs::conf::{
    C_PATH_DIR_APP_DST, C_PATH_DIR_APP_SRC, C_PATH_DIR_BUNDLES_DST, C_PATH_DIR_BUNDLES_SRC,
    C_PATH_FILE_SENTINEL,
};
use pkgroot_io_fs::{
    EnumCopyDirectoryConflictStrategy, EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy,
    SpecRelocateOptions, SpecRelocatePass, SpecRelocatePlan,
};

/// Move compiled modules from dist/ into the package root so they can be
/// imported directly, then remove the emptied build directories.
///
/// Does nothing when the sentinel file exists (repository clone).
#[derive(Debug, Parser)]
#[command(name = "pkgroot", author, version, about)]
pub struct Cli {
    /// Package root; every other path is resolved against it
    #[arg(long, env = "PKGROOT_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Sentinel file whose presence skips the run
    #[arg(long, env = "PKGROOT_SENTINEL", default_value = C_PATH_FILE_SENTINEL)]
    pub sentinel: PathBuf,

    /// Application output tree
    #[arg(long, env = "PKGROOT_APP_SRC", default_value = C_PATH_DIR_APP_SRC)]
    pub app_src: PathBuf,

    /// Destination of the application modules
    #[arg(long, env = "PKGROOT_APP_DST", default_value = C_PATH_DIR_APP_DST)]
    pub app_dst: PathBuf,

    /// Bundle output tree
    #[arg(long, env = "PKGROOT_BUNDLES_SRC", default_value = C_PATH_DIR_BUNDLES_SRC)]
    pub bundles_src: PathBuf,

    /// Destination of the bundles
    #[arg(long, env = "PKGROOT_BUNDLES_DST", default_value = C_PATH_DIR_BUNDLES_DST)]
    pub bundles_dst: PathBuf,

    /// Report what would happen without touching the filesystem
    #[arg(long, env = "PKGROOT_DRY_RUN")]
    pub dry_run: bool,

    /// Copy permissions, timestamps and extended attributes (Linux)
    #[arg(long)]
    pub preserve_metadata: bool,

    /// Run the two passes concurrently when they touch disjoint paths
    #[arg(long)]
    pub parallel_passes: bool,

    /// Remove a source tree even if copying out of it failed
    #[arg(long)]
    pub delete_on_error: bool,

    /// Treat a missing source tree as empty instead of failing
    #[arg(long, env = "PKGROOT_ALLOW_MISSING_SOURCE")]
    pub allow_missing_source: bool,

    /// Existing destination file: overwrite, skip or error
    #[arg(long, value_parser = parse_rule_conflict_file, default_value = "overwrite")]
    pub on_file_conflict: EnumCopyFileConflictStrategy,

    /// Existing destination directory: merge, skip or error
    #[arg(long, value_parser = parse_rule_conflict_dir, default_value = "merge")]
    pub on_dir_conflict: EnumCopyDirectoryConflictStrategy,

    /// Symlinks in the source trees: dereference, copy or skip
    #[arg(long, value_parser = parse_rule_symlink, default_value = "dereference")]
    pub symlinks: EnumCopySymlinkStrategy,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn to_plan(&self) -> SpecRelocatePlan {
        let path_dir_root = self.root.as_path();
        SpecRelocatePlan {
            path_dir_root: path_dir_root.to_path_buf(),
            path_file_sentinel: resolve(path_dir_root, &self.sentinel),
            passes: vec![
                SpecRelocatePass::new(
                    resolve(path_dir_root, &self.app_src),
                    resolve(path_dir_root, &self.app_dst),
                ),
                SpecRelocatePass::new(
                    resolve(path_dir_root, &self.bundles_src),
                    resolve(path_dir_root, &self.bundles_dst),
                ),
            ],
        }
    }

    pub fn to_options(&self) -> SpecRelocateOptions {
        SpecRelocateOptions {
            rule_conflict_file: self.on_file_conflict,
            rule_conflict_dir: self.on_dir_conflict,
            rule_symlink: self.symlinks,
            if_preserve_metadata: self.preserve_metadata,
            if_dry_run: self.dry_run,
            if_delete_on_error: self.delete_on_error,
            if_allow_missing_source: self.allow_missing_source,
            if_parallel_passes: self.parallel_passes,
        }
    }
}

fn resolve(path_dir_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    path_dir_root.join(path)
}

fn parse_rule_conflict_file(value: &str) -> Result<EnumCopyFileConflictStrategy, String> {
    match value {
        "overwrite" => Ok(EnumCopyFileConflictStrategy::Overwrite),
        "skip" => Ok(EnumCopyFileConflictStrategy::Skip),
        "error" => Ok(EnumCopyFileConflictStrategy::Error),
        _ => Err(format!(
            "Invalid file conflict strategy: `{value}`. Expected one of: ['overwrite', 'skip', 'error']"
        )),
    }
}

fn parse_rule_conflict_dir(value: &str) -> Result<EnumCopyDirectoryConflictStrategy, String> {
    match value {
        "merge" => Ok(EnumCopyDirectoryConflictStrategy::Merge),
        "skip" => Ok(EnumCopyDirectoryConflictStrategy::Skip),
        "error" => Ok(EnumCopyDirectoryConflictStrategy::Error),
        _ => Err(format!(
            "Invalid directory conflict strategy: `{value}`. Expected one of: ['merge', 'skip', 'error']"
        )),
    }
}

fn parse_rule_symlink(value: &str) -> Result<EnumCopySymlinkStrategy, String> {
    match value {
        "dereference" => Ok(EnumCopySymlinkStrategy::Dereference),
        "copy" => Ok(EnumCopySymlinkStrategy::CopySymlinks),
        "skip" => Ok(EnumCopySymlinkStrategy::SkipSymlinks),
        _ => Err(format!(
            "Invalid symlink strategy: `{value}`. Expected one of: ['dereference', 'copy', 'skip']"
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use pkgroot_io_fs::{
        EnumCopyDirectoryConflictStrategy, EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy,
        SpecRelocatePlan,
    };

    use super::Cli;

    #[test]
    fn no_arguments_reproduce_the_default_layout() {
        let cli = Cli::try_parse_from(["pkgroot"]).expect("parse");
        assert_eq!(cli.to_plan(), SpecRelocatePlan::default_for("."));

        let spec_options = cli.to_options();
        assert_eq!(
            spec_options.rule_conflict_file,
            EnumCopyFileConflictStrategy::Overwrite
        );
        assert_eq!(
            spec_options.rule_conflict_dir,
            EnumCopyDirectoryConflictStrategy::Merge
        );
        assert_eq!(
            spec_options.rule_symlink,
            EnumCopySymlinkStrategy::Dereference
        );
        assert!(!spec_options.if_dry_run);
        assert!(!spec_options.if_parallel_passes);
    }

    #[test]
    fn paths_resolve_against_root_unless_absolute() {
        let cli = Cli::try_parse_from([
            "pkgroot",
            "--root",
            "/pkg",
            "--bundles-dst",
            "umd",
            "--app-src",
            "/elsewhere/app",
        ])
        .expect("parse");
        let spec_plan = cli.to_plan();

        assert_eq!(spec_plan.path_file_sentinel, PathBuf::from("/pkg/deploy_key.enc"));
        assert_eq!(spec_plan.passes[0].path_dir_src, PathBuf::from("/elsewhere/app"));
        assert_eq!(spec_plan.passes[1].path_dir_dst, PathBuf::from("/pkg/umd"));
    }

    #[test]
    fn strategies_parse_and_reject_unknown_values() {
        let cli = Cli::try_parse_from([
            "pkgroot",
            "--on-file-conflict",
            "skip",
            "--on-dir-conflict",
            "error",
            "--symlinks",
            "copy",
        ])
        .expect("parse");
        let spec_options = cli.to_options();
        assert_eq!(
            spec_options.rule_conflict_file,
            EnumCopyFileConflictStrategy::Skip
        );
        assert_eq!(
            spec_options.rule_conflict_dir,
            EnumCopyDirectoryConflictStrategy::Error
        );
        assert_eq!(
            spec_options.rule_symlink,
            EnumCopySymlinkStrategy::CopySymlinks
        );

        assert!(Cli::try_parse_from(["pkgroot", "--symlinks", "follow"]).is_err());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["pkgroot", "-v", "-q"]).is_err());
        let cli = Cli::try_parse_from(["pkgroot", "-vv"]).expect("parse");
        assert_eq!(cli.verbose, 2);
    }
}
