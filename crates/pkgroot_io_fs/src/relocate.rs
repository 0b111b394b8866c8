//! Pass and plan orchestration: sentinel guard, copy stage, delete stage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::conf::C_REPORT_PREFIX;
use crate::copy::SpecCopyContext;
use crate::delete::delete_tree_with;
use crate::report::{ReportRelocate, ReportRelocateBuilder};
use crate::spec::{
    EnumRunOutcome, RelocateError, SpecRelocateOptions, SpecRelocatePass, SpecRelocatePlan,
};
use crate::util::{is_overlap, is_within};

/// Whether the sentinel marker exists (links are followed).
pub fn is_sentinel_present<P: AsRef<Path>>(path_file_sentinel: P) -> Result<bool, RelocateError> {
    let path_file_sentinel = path_file_sentinel.as_ref();
    fs::exists(path_file_sentinel).map_err(|e| RelocateError::SentinelCheckFailed {
        path: path_file_sentinel.to_path_buf(),
        source: e,
    })
}

/// Relocate the immediate children of `pass.path_dir_src` under
/// `pass.path_dir_dst`, then remove the source tree.
///
/// Returns [`RelocateError`] only for setup failures (missing source, bad
/// destination, unlistable source). Per-entry failures are kept in the
/// report; when any occurred, the source tree is kept unless
/// `if_delete_on_error` is set.
pub fn relocate_pass(
    spec_pass: &SpecRelocatePass,
    spec_options: &SpecRelocateOptions,
) -> Result<ReportRelocate, RelocateError> {
    let path_dir_src = &spec_pass.path_dir_src;
    let path_dir_dst = &spec_pass.path_dir_dst;
    let mut builder_report = ReportRelocateBuilder::default();

    match fs::metadata(path_dir_src) {
        Ok(meta_src) if meta_src.is_dir() => {}
        Ok(_) => return Err(RelocateError::SourceNotDirectory(path_dir_src.clone())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if !spec_options.if_allow_missing_source {
                return Err(RelocateError::SourceNotFound(path_dir_src.clone()));
            }
            builder_report.add_warning(format!(
                "Source does not exist, pass skipped: {}",
                path_dir_src.display()
            ));
            return Ok(builder_report.build());
        }
        Err(e) => {
            return Err(RelocateError::ListDirectoryFailed {
                path: path_dir_src.clone(),
                source: e,
            });
        }
    }

    if is_within(path_dir_dst, path_dir_src) {
        return Err(RelocateError::DestinationInsideSource {
            path_dir_src: path_dir_src.clone(),
            path_dir_dst: path_dir_dst.clone(),
        });
    }

    info!(
        src = %path_dir_src.display(),
        dst = %path_dir_dst.display(),
        "relocating"
    );

    ensure_destination_root(path_dir_dst, spec_options.if_dry_run, &mut builder_report)?;
    let l_children = list_children(path_dir_src)?;

    let mut spec_cp_ctx = SpecCopyContext::new(spec_options);
    // Links pointing back at the pass source count as loops.
    let _ = spec_cp_ctx.enter_dir(path_dir_src);
    for path_child in &l_children {
        spec_cp_ctx.copy_entry(path_child, path_dir_dst, true);
    }
    builder_report.merge(spec_cp_ctx.into_builder());

    let n_errors_copy = builder_report.error_count();
    if n_errors_copy > 0 && !spec_options.if_delete_on_error {
        builder_report.add_warning(format!(
            "Copy stage failed with {n_errors_copy} error(s); keeping source {}",
            path_dir_src.display()
        ));
    } else {
        delete_tree_with(path_dir_src, spec_options.if_dry_run, &mut builder_report);
    }

    let report = builder_report.build();
    info!(
        "{}",
        report.format(&format!("{C_REPORT_PREFIX} {}", path_dir_src.display()))
    );
    Ok(report)
}

/// Run the whole plan: sentinel guard, then every pass.
///
/// Passes run in order. With `if_parallel_passes` they run on a thread pool,
/// provided no pass writes or removes a path another pass touches; otherwise
/// the run falls back to sequential execution with a warning.
pub fn run_plan(
    spec_plan: &SpecRelocatePlan,
    spec_options: &SpecRelocateOptions,
) -> Result<EnumRunOutcome, RelocateError> {
    if is_sentinel_present(&spec_plan.path_file_sentinel)? {
        info!(
            sentinel = %spec_plan.path_file_sentinel.display(),
            "sentinel present, skipping relocation"
        );
        return Ok(EnumRunOutcome::SkippedBySentinel(
            spec_plan.path_file_sentinel.clone(),
        ));
    }

    let mut report_total = ReportRelocate::default();
    let mut if_parallel = spec_options.if_parallel_passes && spec_plan.passes.len() > 1;
    if if_parallel && !are_passes_disjoint(&spec_plan.passes) {
        let mut builder_report = ReportRelocateBuilder::default();
        builder_report.add_warning(
            "Passes touch overlapping paths; running sequentially.".to_string(),
        );
        report_total.merge(builder_report.build());
        if_parallel = false;
    }

    if !if_parallel {
        for spec_pass in &spec_plan.passes {
            report_total.merge(relocate_pass(spec_pass, spec_options)?);
        }
        return Ok(EnumRunOutcome::Completed(report_total));
    }

    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(spec_plan.passes.len())
        .build();
    let l_results: Vec<Result<ReportRelocate, RelocateError>> = match thread_pool {
        Ok(thread_pool) => thread_pool.install(|| {
            spec_plan
                .passes
                .par_iter()
                .map(|spec_pass| relocate_pass(spec_pass, spec_options))
                .collect()
        }),
        Err(e) => {
            warn!("Failed to initialize thread pool ({e}); fallback to sequential passes.");
            spec_plan
                .passes
                .iter()
                .map(|spec_pass| relocate_pass(spec_pass, spec_options))
                .collect()
        }
    };

    for res_pass in l_results {
        report_total.merge(res_pass?);
    }
    Ok(EnumRunOutcome::Completed(report_total))
}

fn ensure_destination_root(
    path_dir_dst: &Path,
    if_dry_run: bool,
    builder_report: &mut ReportRelocateBuilder,
) -> Result<(), RelocateError> {
    if path_dir_dst.is_dir() {
        return Ok(());
    }
    if path_dir_dst.exists() {
        return Err(RelocateError::DestinationInitFailed {
            path: path_dir_dst.to_path_buf(),
            message: "Destination exists and is not a directory.".to_string(),
        });
    }
    if if_dry_run {
        info!(path = %path_dir_dst.display(), "would create destination");
        return Ok(());
    }
    fs::create_dir_all(path_dir_dst).map_err(|e| RelocateError::DestinationInitFailed {
        path: path_dir_dst.to_path_buf(),
        message: e.to_string(),
    })?;
    builder_report.add_copied();
    Ok(())
}

fn list_children(path_dir_src: &Path) -> Result<Vec<PathBuf>, RelocateError> {
    let map_err = |e: io::Error| RelocateError::ListDirectoryFailed {
        path: path_dir_src.to_path_buf(),
        source: e,
    };
    let mut l_children = Vec::new();
    for _entry_res in fs::read_dir(path_dir_src).map_err(map_err)? {
        l_children.push(_entry_res.map_err(map_err)?.path());
    }
    l_children.sort();
    Ok(l_children)
}

/// Paths a pass may create, overwrite or remove.
fn derive_pass_footprint(spec_pass: &SpecRelocatePass) -> Vec<PathBuf> {
    let mut l_paths = vec![spec_pass.path_dir_src.clone()];
    if !spec_pass.path_dir_dst.exists() {
        l_paths.push(spec_pass.path_dir_dst.clone());
    }
    if let Ok(iter_entries) = fs::read_dir(&spec_pass.path_dir_src) {
        l_paths.extend(
            iter_entries
                .filter_map(Result::ok)
                .map(|entry| spec_pass.path_dir_dst.join(entry.file_name())),
        );
    }
    l_paths
}

fn are_passes_disjoint(l_passes: &[SpecRelocatePass]) -> bool {
    let l_footprints: Vec<Vec<PathBuf>> = l_passes.iter().map(derive_pass_footprint).collect();
    for (n_idx, l_paths_a) in l_footprints.iter().enumerate() {
        for l_paths_b in &l_footprints[n_idx + 1..] {
            let b_overlap = l_paths_a
                .iter()
                .any(|path_a| l_paths_b.iter().any(|path_b| is_overlap(path_a, path_b)));
            if b_overlap {
                return false;
            }
        }
    }
    true
}
