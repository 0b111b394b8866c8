//! `pkgroot_io_fs` v1:
//! Rust-side relocation engine for packaging build output.
//!
//! Moves compiled modules out of a nested `dist/` directory into the package
//! root so that submodules can be imported directly, then removes the
//! emptied build directories.
//!
//! - `conf`     : packaging layout constants
//! - `copy`     : recursive entry copy
//! - `delete`   : depth-first tree removal
//! - `relocate` : sentinel guard and pass orchestration
//! - `spec`     : enums/options/plans/errors
//! - `report`   : run-time report model
//! - `util`     : shared helper functions

pub mod conf;
pub mod copy;
pub mod delete;
pub mod relocate;
pub mod report;
pub mod spec;
mod util;

pub use copy::{copy_entry, copy_file};
pub use delete::delete_tree;
pub use relocate::{is_sentinel_present, relocate_pass, run_plan};
pub use report::{ReportRelocate, ReportRelocateBuilder};
pub use spec::{
    EnumCopyDirectoryConflictStrategy, EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy,
    EnumRunOutcome, RelocateError, SpecCopyError, SpecRelocateOptions, SpecRelocatePass,
    SpecRelocatePlan,
};
