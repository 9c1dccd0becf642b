//! Build run model as seen by the notifier

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

use crate::error::Result;

/// Environment variable snapshot of a run.
pub type EnvVars = HashMap<String, String>;

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl BuildResult {
    /// Only successful and failed runs are reported.
    pub fn is_notifiable(self) -> bool {
        matches!(self, BuildResult::Success | BuildResult::Failure)
    }
}

/// One VCS commit recorded against a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub message: String,
    pub commit_id: String,
    /// Author's unique id, not the display name.
    pub author: String,
    /// Milliseconds since epoch, `-1` when unknown.
    pub timestamp: i64,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

/// The commits of one SCM checkout of a run.
pub type ChangeLogSet = Vec<ChangeLogEntry>;

/// Read access to a job's run history, for hosts that record change sets.
///
/// Runs are addressed by build number.
pub trait ChangeLogHistory {
    /// Change sets of the given run, in recording order.
    fn change_sets(&self, number: u64) -> Result<Vec<ChangeLogSet>>;

    /// Number of the run preceding `number`, if any.
    fn previous_build(&self, number: u64) -> Option<u64>;

    /// Number of the most recent successful run before `number`, if any.
    fn previous_successful_build(&self, number: u64) -> Option<u64>;
}

/// A completed run handed to the notifier by the CI host.
pub trait BuildRun: Sync {
    fn number(&self) -> u64;

    /// Full name of the parent job.
    fn job_name(&self) -> &str;

    /// Path of the parent job, e.g. `job/api/`.
    fn job_url(&self) -> &str;

    /// Path of this run, e.g. `job/api/17/`.
    fn url(&self) -> &str;

    fn start_time_millis(&self) -> i64;

    /// `None` while the run is still in progress.
    fn result(&self) -> Option<BuildResult>;

    fn environment(&self) -> Result<EnvVars>;

    /// The accumulated console log.
    fn log_reader(&self) -> Result<Box<dyn Read + '_>>;

    /// `Some` only if the host can enumerate change sets for this run.
    fn change_log_history(&self) -> Option<&dyn ChangeLogHistory> {
        None
    }
}
