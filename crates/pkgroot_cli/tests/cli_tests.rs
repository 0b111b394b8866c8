//! CLI integration tests running the real `pkgroot` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn pkgroot_cmd(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pkgroot").unwrap();
    cmd.current_dir(root).env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("PKGROOT_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

fn write_file(root: &Path, path: &str, content: &str) {
    let path_file = root.join(path);
    if let Some(parent) = path_file.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path_file, content).unwrap();
}

fn build_package() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "package.json", r#"{"name":"ngx-widgets"}"#);
    write_file(temp.path(), "dist/app/dropdown/index.js", "export * from './dropdown';");
    write_file(temp.path(), "dist/app/dropdown/dropdown.js", "export class DropDownModule {}");
    write_file(temp.path(), "dist/app/index.js", "export * from './dropdown';");
    write_file(temp.path(), "dist/bundles/ngx-widgets.umd.js", "(function(){})();");
    temp
}

#[test]
fn test_help_output() {
    let temp = TempDir::new().unwrap();
    pkgroot_cmd(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--sentinel"));
}

#[test]
fn test_relocates_package_without_arguments() {
    let temp = build_package();
    let root = temp.path();

    pkgroot_cmd(root)
        .assert()
        .success()
        .stderr(predicate::str::contains("[RELOCATE]"))
        .stderr(predicate::str::contains("errors=0"));

    assert_eq!(
        std::fs::read_to_string(root.join("dropdown/index.js")).unwrap(),
        "export * from './dropdown';"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("dropdown/dropdown.js")).unwrap(),
        "export class DropDownModule {}"
    );
    assert!(root.join("index.js").is_file());
    assert_eq!(
        std::fs::read(root.join("bundles/ngx-widgets.umd.js")).unwrap(),
        b"(function(){})();"
    );
    assert!(root.join("package.json").is_file());
    assert!(!root.join("dist/app").exists());
    assert!(!root.join("dist/bundles").exists());
}

#[test]
fn test_sentinel_skips_everything() {
    let temp = build_package();
    let root = temp.path();
    write_file(root, "deploy_key.enc", "encrypted");

    pkgroot_cmd(root)
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing to relocate"));

    assert!(root.join("dist/app/dropdown/index.js").exists());
    assert!(root.join("dist/bundles/ngx-widgets.umd.js").exists());
    assert!(!root.join("dropdown").exists());
    assert!(!root.join("bundles").exists());
}

#[test]
fn test_root_flag_targets_other_directory() {
    let temp = build_package();
    let cwd = TempDir::new().unwrap();

    pkgroot_cmd(cwd.path())
        .arg("--root")
        .arg(temp.path())
        .assert()
        .success();

    assert!(temp.path().join("bundles/ngx-widgets.umd.js").exists());
    assert!(!cwd.path().join("bundles").exists());
}

#[test]
fn test_dry_run_leaves_tree_untouched() {
    let temp = build_package();
    let root = temp.path();

    pkgroot_cmd(root)
        .arg("--dry-run")
        .assert()
        .success()
        .stderr(predicate::str::contains("copied=0"));

    assert!(root.join("dist/app/dropdown/index.js").exists());
    assert!(!root.join("dropdown").exists());
    assert!(!root.join("bundles").exists());
}

#[test]
fn test_missing_bundles_fails_unless_allowed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_file(root, "dist/app/dropdown/index.js", "index");

    pkgroot_cmd(root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source does not exist"));

    // The app pass ran before the bundles pass failed.
    assert!(root.join("dropdown/index.js").exists());

    write_file(root, "dist/app/dropdown/index.js", "index");
    pkgroot_cmd(root)
        .arg("--allow-missing-source")
        .assert()
        .success();
    assert!(!root.join("dist/app").exists());
}

#[test]
fn test_copy_error_exits_nonzero_and_keeps_source() {
    let temp = build_package();
    let root = temp.path();
    write_file(root, "dropdown", "a file where a directory is expected");

    pkgroot_cmd(root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected directory"));

    assert!(root.join("dist/app/dropdown/index.js").exists());
    assert!(root.join("bundles/ngx-widgets.umd.js").exists());
    assert!(!root.join("dist/bundles").exists());
}

#[test]
fn test_invalid_strategy_is_usage_error() {
    let temp = TempDir::new().unwrap();
    pkgroot_cmd(temp.path())
        .args(["--on-file-conflict", "replace"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid file conflict strategy"));
}

#[test]
fn test_parallel_passes_relocate_both_trees() {
    let temp = build_package();
    let root = temp.path();

    pkgroot_cmd(root)
        .arg("--parallel-passes")
        .assert()
        .success();

    assert!(root.join("dropdown/dropdown.js").exists());
    assert!(root.join("bundles/ngx-widgets.umd.js").exists());
    assert!(!root.join("dist/app").exists());
    assert!(!root.join("dist/bundles").exists());
}
