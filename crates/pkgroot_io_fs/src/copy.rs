//! Recursive entry copy: directories are merged by base name, files are
//! written byte-for-byte.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::report::{ReportRelocate, ReportRelocateBuilder};
use crate::spec::{EnumCopySymlinkStrategy, SpecRelocateOptions};
use crate::util::{
    copy_file_bytes, create_symbolic_link, derive_file_target, is_same_file, is_within,
    should_skip_dir_conflict, should_skip_file_conflict,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumEntryKind {
    Dir,
    File,
    Symlink,
    Special,
}

#[derive(Debug)]
pub(crate) struct SpecCopyContext<'a> {
    spec_options: &'a SpecRelocateOptions,
    builder_report: ReportRelocateBuilder,
    /// `(dev, ino)` of the directories on the current recursion path.
    set_ancestor_dirs: HashSet<(u64, u64)>,
}

/// Copy `path_src` (file or directory tree) under `path_dir_dst_parent`.
///
/// A directory source is recreated as `path_dir_dst_parent/<basename>` and
/// merged into when it already exists. A file source follows the same target
/// rule as [`copy_file`].
///
/// Per-entry failures are collected in the returned report; the traversal
/// never stops on the first failing entry.
pub fn copy_entry<P, Q>(
    path_src: P,
    path_dir_dst_parent: Q,
    spec_options: &SpecRelocateOptions,
) -> ReportRelocate
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mut spec_cp_ctx = SpecCopyContext::new(spec_options);
    spec_cp_ctx.copy_entry(path_src.as_ref(), path_dir_dst_parent.as_ref(), false);
    spec_cp_ctx.into_builder().build()
}

/// Copy one file to `path_target`.
///
/// - `path_target` is an existing directory: written as `path_target/<basename>`.
/// - `path_target` is an existing file: overwritten (see `rule_conflict_file`).
/// - `path_target` does not exist: created at exactly that path.
pub fn copy_file<P, Q>(
    path_file_src: P,
    path_target: Q,
    spec_options: &SpecRelocateOptions,
) -> ReportRelocate
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_file_src = path_file_src.as_ref();
    let mut spec_cp_ctx = SpecCopyContext::new(spec_options);
    let path_file_dst = derive_file_target(path_file_src, path_target.as_ref());
    spec_cp_ctx.copy_file_to(path_file_src, &path_file_dst);
    spec_cp_ctx.into_builder().build()
}

impl<'a> SpecCopyContext<'a> {
    pub(crate) fn new(spec_options: &'a SpecRelocateOptions) -> Self {
        Self {
            spec_options,
            builder_report: ReportRelocateBuilder::default(),
            set_ancestor_dirs: HashSet::new(),
        }
    }

    pub(crate) fn into_builder(self) -> ReportRelocateBuilder {
        self.builder_report
    }

    /// Top-level entry. Unless `if_parent_is_dir` is set, the destination
    /// parent may be a missing path or a file (see [`copy_file`]).
    pub(crate) fn copy_entry(
        &mut self,
        path_src: &Path,
        path_dir_dst_parent: &Path,
        if_parent_is_dir: bool,
    ) {
        let Some(enum_kind) = self.inspect_entry(path_src) else {
            return;
        };
        self.copy_kind(path_src, enum_kind, path_dir_dst_parent, if_parent_is_dir);
    }

    fn copy_kind(
        &mut self,
        path_src: &Path,
        enum_kind: EnumEntryKind,
        path_dir_dst_parent: &Path,
        if_parent_is_dir: bool,
    ) {
        match enum_kind {
            EnumEntryKind::Dir => self.copy_dir_into(path_src, path_dir_dst_parent),
            EnumEntryKind::File => {
                let path_file_dst = if if_parent_is_dir {
                    join_base_name(path_dir_dst_parent, path_src)
                } else {
                    derive_file_target(path_src, path_dir_dst_parent)
                };
                self.copy_file_to(path_src, &path_file_dst);
            }
            EnumEntryKind::Symlink => {
                self.copy_symlink_into(path_src, path_dir_dst_parent, if_parent_is_dir)
            }
            EnumEntryKind::Special => self.skip_special(path_src),
        }
    }

    fn inspect_entry(&mut self, path_src: &Path) -> Option<EnumEntryKind> {
        match fs::symlink_metadata(path_src) {
            Ok(meta_src) => {
                let cfg_file_type = meta_src.file_type();
                Some(if cfg_file_type.is_symlink() {
                    EnumEntryKind::Symlink
                } else if cfg_file_type.is_dir() {
                    EnumEntryKind::Dir
                } else if cfg_file_type.is_file() {
                    EnumEntryKind::File
                } else {
                    EnumEntryKind::Special
                })
            }
            Err(e) => {
                self.builder_report
                    .add_error(path_src.to_path_buf(), e.to_string());
                None
            }
        }
    }

    fn copy_dir_into(&mut self, path_dir_src: &Path, path_dir_dst_parent: &Path) {
        self.builder_report.add_scanned();

        let Some(name_dir) = path_dir_src.file_name() else {
            self.builder_report.add_error(
                path_dir_src.to_path_buf(),
                format!("Source has no base name: {}", path_dir_src.display()),
            );
            return;
        };
        let path_dir_dst = path_dir_dst_parent.join(name_dir);

        if is_within(&path_dir_dst, path_dir_src) {
            self.builder_report.add_error(
                path_dir_dst,
                format!(
                    "Source and destination overlap: {} -> {}",
                    path_dir_src.display(),
                    path_dir_dst_parent.display()
                ),
            );
            return;
        }

        let Ok(key_dir) = self.enter_dir(path_dir_src) else {
            return;
        };
        self.copy_dir_body(path_dir_src, &path_dir_dst);
        if let Some(key_dir) = key_dir {
            self.set_ancestor_dirs.remove(&key_dir);
        }
    }

    fn copy_dir_body(&mut self, path_dir_src: &Path, path_dir_dst: &Path) {
        if should_skip_dir_conflict(
            path_dir_dst,
            self.spec_options.rule_conflict_dir,
            &mut self.builder_report,
        ) {
            return;
        }

        if !path_dir_dst.exists() {
            if self.spec_options.if_dry_run {
                debug!(path = %path_dir_dst.display(), "would create directory");
                self.builder_report.add_skipped();
            } else if let Err(e) = fs::create_dir(path_dir_dst) {
                self.builder_report
                    .add_error(path_dir_dst.to_path_buf(), e.to_string());
                return;
            } else {
                debug!(path = %path_dir_dst.display(), "created directory");
                self.builder_report.add_copied();
            }
        }

        let iter_entries = match fs::read_dir(path_dir_src) {
            Ok(iter) => iter,
            Err(e) => {
                self.builder_report.add_error(
                    path_dir_src.to_path_buf(),
                    format!("Failed to read directory {} ({e})", path_dir_src.display()),
                );
                return;
            }
        };

        let mut l_children: Vec<(PathBuf, EnumEntryKind)> = Vec::new();
        for _entry_res in iter_entries {
            let entry = match _entry_res {
                Ok(v) => v,
                Err(e) => {
                    self.builder_report.add_error(
                        path_dir_src.to_path_buf(),
                        format!(
                            "Failed to read directory entry under {} ({e})",
                            path_dir_src.display()
                        ),
                    );
                    continue;
                }
            };
            let path_entry = entry.path();
            let enum_kind = match entry.file_type() {
                Ok(t) if t.is_symlink() => EnumEntryKind::Symlink,
                Ok(t) if t.is_dir() => EnumEntryKind::Dir,
                Ok(t) if t.is_file() => EnumEntryKind::File,
                Ok(_) => EnumEntryKind::Special,
                Err(e) => {
                    self.builder_report
                        .add_error(path_entry, format!("Failed to inspect entry ({e})"));
                    continue;
                }
            };
            l_children.push((path_entry, enum_kind));
        }
        l_children.sort_by(|a, b| a.0.cmp(&b.0));

        for (path_child, enum_kind) in l_children {
            self.copy_kind(&path_child, enum_kind, path_dir_dst, true);
        }
    }

    /// `if_parent_is_dir` is set while walking a tree, where the parent is
    /// known to be (or, in dry-run, to become) a directory.
    fn copy_symlink_into(
        &mut self,
        path_link_src: &Path,
        path_dir_dst_parent: &Path,
        if_parent_is_dir: bool,
    ) {
        let path_dst = if if_parent_is_dir {
            join_base_name(path_dir_dst_parent, path_link_src)
        } else {
            derive_file_target(path_link_src, path_dir_dst_parent)
        };

        match self.spec_options.rule_symlink {
            EnumCopySymlinkStrategy::SkipSymlinks => {
                self.builder_report.add_scanned();
                self.builder_report
                    .add_warning(format!("Symlink skipped: {}", path_link_src.display()));
                self.builder_report.add_skipped();
            }
            EnumCopySymlinkStrategy::CopySymlinks => {
                self.builder_report.add_scanned();
                if should_skip_file_conflict(
                    &path_dst,
                    self.spec_options.rule_conflict_file,
                    &mut self.builder_report,
                ) {
                    return;
                }
                if self.spec_options.if_dry_run {
                    debug!(path = %path_dst.display(), "would create symlink");
                    self.builder_report.add_skipped();
                    return;
                }
                match create_symbolic_link(path_link_src, &path_dst) {
                    Ok(()) => {
                        debug!(path = %path_dst.display(), "created symlink");
                        self.builder_report.add_copied();
                    }
                    Err(e) => self.builder_report.add_error(path_dst, e.to_string()),
                }
            }
            EnumCopySymlinkStrategy::Dereference => match fs::metadata(path_link_src) {
                Ok(meta_target) if meta_target.is_dir() => {
                    self.copy_dir_into(path_link_src, path_dir_dst_parent);
                }
                Ok(meta_target) if meta_target.is_file() => {
                    self.copy_file_to(path_link_src, &path_dst);
                }
                Ok(_) => {
                    self.builder_report.add_scanned();
                    self.builder_report.add_warning(format!(
                        "Special file target skipped: {}",
                        path_link_src.display()
                    ));
                    self.builder_report.add_skipped();
                }
                Err(e) => {
                    self.builder_report.add_scanned();
                    self.builder_report.add_error(
                        path_link_src.to_path_buf(),
                        format!("Broken symlink: {} ({e})", path_link_src.display()),
                    );
                }
            },
        }
    }

    /// Copy one regular file to an already-resolved destination path.
    fn copy_file_to(&mut self, path_file_src: &Path, path_file_dst: &Path) {
        self.builder_report.add_scanned();

        // Copying a file onto itself would truncate it before reading.
        if is_same_file(path_file_src, path_file_dst) {
            self.builder_report.add_warning(format!(
                "Source and destination are the same file: {}",
                path_file_dst.display()
            ));
            self.builder_report.add_skipped();
            return;
        }

        if should_skip_file_conflict(
            path_file_dst,
            self.spec_options.rule_conflict_file,
            &mut self.builder_report,
        ) {
            return;
        }

        if self.spec_options.if_dry_run {
            debug!(
                src = %path_file_src.display(),
                dst = %path_file_dst.display(),
                "would copy file"
            );
            self.builder_report.add_skipped();
            return;
        }

        match copy_file_bytes(
            path_file_src,
            path_file_dst,
            self.spec_options.if_preserve_metadata,
        ) {
            Ok(n_bytes) => {
                debug!(
                    src = %path_file_src.display(),
                    dst = %path_file_dst.display(),
                    n_bytes,
                    "copied file"
                );
                self.builder_report.add_copied();
            }
            Err(e) => self
                .builder_report
                .add_error(path_file_dst.to_path_buf(), e.to_string()),
        }
    }

    fn skip_special(&mut self, path_src: &Path) {
        self.builder_report.add_scanned();
        self.builder_report
            .add_warning(format!("Special file skipped: {}", path_src.display()));
        self.builder_report.add_skipped();
    }

    /// Symlink loop guard, only relevant when links are followed.
    ///
    /// `Ok(Some(key))` means the directory was pushed onto the ancestor set and
    /// must be removed again once its subtree is done. `Err(())` means it is
    /// already an ancestor (or could not be inspected) and must not be entered.
    pub(crate) fn enter_dir(&mut self, path_dir_src: &Path) -> Result<Option<(u64, u64)>, ()> {
        if self.spec_options.rule_symlink != EnumCopySymlinkStrategy::Dereference {
            return Ok(None);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            match fs::metadata(path_dir_src) {
                Ok(stat_dir) => {
                    let key_dir = (stat_dir.dev(), stat_dir.ino());
                    if !self.set_ancestor_dirs.insert(key_dir) {
                        self.builder_report.add_warning(format!(
                            "Symlink loop detected: {}",
                            path_dir_src.display()
                        ));
                        return Err(());
                    }
                    Ok(Some(key_dir))
                }
                Err(e) => {
                    self.builder_report.add_error(
                        path_dir_src.to_path_buf(),
                        format!("Failed to stat directory {} ({e})", path_dir_src.display()),
                    );
                    Err(())
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = path_dir_src;
            Ok(None)
        }
    }
}

fn join_base_name(path_dir: &Path, path_src: &Path) -> PathBuf {
    match path_src.file_name() {
        Some(name) => path_dir.join(name),
        None => path_dir.to_path_buf(),
    }
}
