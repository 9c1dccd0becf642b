//! Change log collection across a job's run history

use tracing::info;

use crate::error::Result;
use crate::run::{BuildResult, ChangeLogEntry, ChangeLogHistory};

/// Change entries to report for run `number`.
///
/// A failed run reports every entry since the last successful run (both
/// ends included, most recent run first), or nothing if the job never
/// succeeded. Any other result reports only the run's own entries.
pub fn collect_change_log(
    history: &dyn ChangeLogHistory,
    number: u64,
    result: Option<BuildResult>,
) -> Result<Vec<ChangeLogEntry>> {
    if result != Some(BuildResult::Failure) {
        info!(
            "[#{}] Current build is not a failure, collecting change logs of current build",
            number
        );
        return entries_of(history, number, number);
    }

    info!(
        "[#{}] Current build is a failure, collecting all change logs till last successful build",
        number
    );
    let Some(last_success) = history.previous_successful_build(number) else {
        info!("[#{}] No previous successful build", number);
        return Ok(Vec::new());
    };
    info!("[#{}] Previous successful build : {}", number, last_success);

    let mut cumulative = Vec::new();
    let mut cursor = Some(number);
    while let Some(visited) = cursor {
        if visited < last_success {
            break;
        }
        cumulative.extend(entries_of(history, number, visited)?);
        cursor = history.previous_build(visited);
    }
    Ok(cumulative)
}

fn entries_of(
    history: &dyn ChangeLogHistory,
    build_number: u64,
    run: u64,
) -> Result<Vec<ChangeLogEntry>> {
    info!(
        "[#{}] Collecting change log set for run : {}",
        build_number, run
    );
    Ok(history.change_sets(run)?.into_iter().flatten().collect())
}
