mod cli;
mod logging;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pkgroot_io_fs::{EnumRunOutcome, run_plan};
use tracing::{error, info};

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` means the run finished but some entries failed.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let spec_plan = cli.to_plan();
    let spec_options = cli.to_options();

    let outcome = run_plan(&spec_plan, &spec_options).with_context(|| {
        format!(
            "relocation under {} failed",
            spec_plan.path_dir_root.display()
        )
    })?;

    match outcome {
        EnumRunOutcome::SkippedBySentinel(path_file_sentinel) => {
            info!(
                "{} found, nothing to relocate",
                path_file_sentinel.display()
            );
            Ok(true)
        }
        EnumRunOutcome::Completed(report) => {
            if report.is_success() {
                info!("{report}");
            } else {
                error!("{report}");
                for spec_error in &report.errors {
                    error!("  {}: {}", spec_error.path.display(), spec_error.exception);
                }
            }
            Ok(report.is_success())
        }
    }
}
