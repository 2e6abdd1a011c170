//! Rebuild command - build the cache once and persist the snapshot.

use std::collections::BTreeSet;

use sensorcache::update::RebuildReport;
use tracing::warn;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the rebuild command.
pub struct RebuildArgs {
    pub threads: Option<usize>,
    pub offerings: Vec<String>,
    pub procedures: Vec<String>,
    pub strict: bool,
}

impl RebuildArgs {
    fn is_partial(&self) -> bool {
        !self.offerings.is_empty() || !self.procedures.is_empty()
    }
}

/// Run the rebuild command.
pub fn run(runner: &CliRunner, args: RebuildArgs) -> Result<(), CliError> {
    runner.log_startup("rebuild");
    let controller = runner.create_controller()?;
    let threads = runner.threads(args.threads);

    let errors = if args.is_partial() {
        // Partial rebuilds extend the persisted snapshot.
        match controller.warm_start() {
            Ok(true) => {}
            Ok(false) => println!("No persisted snapshot, rebuilding everything"),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable snapshot");
                println!("Snapshot unreadable ({}), rebuilding everything", e);
            }
        }
        let offerings: BTreeSet<String> = args.offerings.into_iter().collect();
        let procedures: BTreeSet<String> = args.procedures.into_iter().collect();
        controller.trigger_partial_rebuild(offerings, procedures, threads)
    } else {
        controller.trigger_full_rebuild(threads)
    };

    if let Some(report) = controller.last_report() {
        println!("{}", format_report(&report));
    }
    if let Some(path) = &runner.config().cache.snapshot_file {
        println!("Snapshot: {}", path.display());
    }

    if !errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &errors {
            println!("  - {}", error);
        }
        if args.strict {
            return Err(CliError::RebuildErrors(errors.len()));
        }
    }

    Ok(())
}

/// One-block summary of a finished rebuild.
pub fn format_report(report: &RebuildReport) -> String {
    format!(
        "Rebuild ({}) finished in {:.2}s on {} thread(s)\n  \
         Offerings:            {}\n  \
         Procedures:           {}\n  \
         Observable properties: {}\n  \
         Features of interest: {}\n  \
         Result templates:     {}\n  \
         Errors:               {}",
        report.scope,
        report.elapsed.as_secs_f64(),
        report.threads,
        report.counts.offerings,
        report.counts.procedures,
        report.counts.observable_properties,
        report.counts.features_of_interest,
        report.counts.result_templates,
        report.errors,
    )
}
