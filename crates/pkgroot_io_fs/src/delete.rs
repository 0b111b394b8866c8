//! Depth-first tree removal.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::report::{ReportRelocate, ReportRelocateBuilder};
use crate::spec::SpecRelocateOptions;

/// Remove `path` and everything below it.
///
/// A missing path is a no-op. Symlinks are removed, never followed. A
/// directory is removed only after all of its children were removed; when a
/// child fails, its ancestors are left in place and only the child's error is
/// reported.
pub fn delete_tree<P: AsRef<Path>>(path: P, spec_options: &SpecRelocateOptions) -> ReportRelocate {
    let mut builder_report = ReportRelocateBuilder::default();
    delete_tree_with(path.as_ref(), spec_options.if_dry_run, &mut builder_report);
    builder_report.build()
}

pub(crate) fn delete_tree_with(
    path: &Path,
    if_dry_run: bool,
    builder_report: &mut ReportRelocateBuilder,
) {
    let meta_entry = match fs::symlink_metadata(path) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            builder_report.add_error(path.to_path_buf(), e.to_string());
            return;
        }
    };

    if !meta_entry.is_dir() {
        let if_dir_link = meta_entry.file_type().is_symlink() && path.is_dir();
        delete_leaf(path, if_dir_link, if_dry_run, builder_report);
        return;
    }

    let iter_entries = match fs::read_dir(path) {
        Ok(iter) => iter,
        Err(e) => {
            builder_report.add_error(
                path.to_path_buf(),
                format!("Failed to read directory {} ({e})", path.display()),
            );
            return;
        }
    };

    let n_errors_before = builder_report.error_count();
    for _entry_res in iter_entries {
        match _entry_res {
            Ok(entry) => delete_tree_with(&entry.path(), if_dry_run, builder_report),
            Err(e) => builder_report.add_error(
                path.to_path_buf(),
                format!(
                    "Failed to read directory entry under {} ({e})",
                    path.display()
                ),
            ),
        }
    }
    if builder_report.error_count() > n_errors_before {
        return;
    }

    if if_dry_run {
        debug!(path = %path.display(), "would remove directory");
        builder_report.add_deleted();
        return;
    }
    match fs::remove_dir(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed directory");
            builder_report.add_deleted();
        }
        Err(e) => builder_report.add_error(path.to_path_buf(), e.to_string()),
    }
}

fn delete_leaf(
    path: &Path,
    if_dir_link: bool,
    if_dry_run: bool,
    builder_report: &mut ReportRelocateBuilder,
) {
    if if_dry_run {
        debug!(path = %path.display(), "would remove file");
        builder_report.add_deleted();
        return;
    }

    // Windows directory symlinks must be removed as directories.
    let res_remove = if cfg!(windows) && if_dir_link {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };

    match res_remove {
        Ok(()) => {
            debug!(path = %path.display(), "removed file");
            builder_report.add_deleted();
        }
        Err(e) => builder_report.add_error(path.to_path_buf(), e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::delete_tree;
    use crate::spec::SpecRelocateOptions;

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    #[test]
    fn delete_tree_missing_path_is_noop() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let report = delete_tree(tmp.path().join("absent"), &SpecRelocateOptions::default());
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.cnt_deleted, 0);
    }

    #[test]
    fn delete_tree_removes_nested_levels() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path().join("dist/app");
        write_text(&root.join("a/b/c/leaf.js"), "leaf");
        write_text(&root.join("a/top.js"), "top");
        std::fs::create_dir_all(root.join("empty")).expect("mkdir");

        let report = delete_tree(&root, &SpecRelocateOptions::default());
        assert_eq!(report.error_count(), 0);
        // app, a, b, c, empty + two files
        assert_eq!(report.cnt_deleted, 7);
        assert!(!root.exists());
        assert!(tmp.path().join("dist").is_dir());
    }

    #[test]
    fn delete_tree_single_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("lone.js");
        write_text(&path_file, "x");

        let report = delete_tree(&path_file, &SpecRelocateOptions::default());
        assert_eq!(report.cnt_deleted, 1);
        assert!(!path_file.exists());
    }

    #[test]
    fn delete_tree_dry_run_keeps_everything() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path().join("tree");
        write_text(&root.join("x/y.js"), "y");

        let spec_options = SpecRelocateOptions {
            if_dry_run: true,
            ..SpecRelocateOptions::default()
        };
        let report = delete_tree(&root, &spec_options);
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.cnt_deleted, 3);
        assert!(root.join("x/y.js").exists());
    }

    #[cfg(unix)]
    #[test]
    fn delete_tree_does_not_follow_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let outside = tmp.path().join("outside");
        write_text(&outside.join("keep.js"), "keep");
        let root = tmp.path().join("tree");
        std::fs::create_dir_all(&root).expect("mkdir");
        symlink(&outside, root.join("link")).expect("symlink");

        let report = delete_tree(&root, &SpecRelocateOptions::default());
        assert_eq!(report.error_count(), 0);
        assert!(!root.exists());
        assert!(outside.join("keep.js").exists());
    }
}
