//! Assembly of the build notification payload

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::changelog::collect_change_log;
use crate::error::{NotifierError, Result};
use crate::logs::extract_run_logs;
use crate::run::{BuildResult, BuildRun, ChangeLogEntry};
use crate::source::{SourceEvent, repository_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failure,
}

impl From<Option<BuildResult>> for JobStatus {
    fn from(result: Option<BuildResult>) -> Self {
        match result {
            Some(BuildResult::Success) => JobStatus::Success,
            _ => JobStatus::Failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub name: String,
    pub id: String,
    pub build_number: u64,
    /// Seconds between the run start and the notification.
    pub duration: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub url: String,
    pub logs: Vec<String>,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDetails {
    pub url: Option<String>,
    #[serde(flatten)]
    pub event: SourceEvent,
    /// Absent when the host cannot enumerate change sets.
    #[serde(rename = "changeLog", skip_serializing_if = "Option::is_none")]
    pub change_log: Option<Vec<ChangeLogEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub job: JobDetails,
    pub source: SourceDetails,
}

impl Payload {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Whole seconds from `start_ms` to `now_ms`, rounded up, never negative.
pub fn duration_seconds(start_ms: i64, now_ms: i64) -> i64 {
    let elapsed = now_ms.saturating_sub(start_ms).max(0);
    elapsed / 1000 + i64::from(elapsed % 1000 != 0)
}

#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    max_log_lines: Option<usize>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_log_lines(mut self, max_log_lines: Option<usize>) -> Self {
        self.max_log_lines = max_log_lines;
        self
    }

    /// Build the payload for `run`, using `now` as its end time.
    ///
    /// Failures reading the environment, the log or the change sets are
    /// returned as [`NotifierError::PayloadAssembly`].
    pub fn build(&self, run: &dyn BuildRun, now: DateTime<Utc>) -> Result<Payload> {
        let number = run.number();
        self.assemble(run, now)
            .map_err(|e| match e {
                e @ NotifierError::PayloadAssembly { .. } => e,
                other => NotifierError::PayloadAssembly {
                    build_number: number,
                    message: other.to_string(),
                },
            })
    }

    fn assemble(&self, run: &dyn BuildRun, now: DateTime<Utc>) -> Result<Payload> {
        let number = run.number();
        let env = run.environment()?;

        let start_time = run.start_time_millis();
        let end_time = now.timestamp_millis();

        info!("[#{}] Extracting run logs", number);
        let logs = extract_run_logs(number, run.log_reader()?, self.max_log_lines)?;

        let job = JobDetails {
            name: run.job_name().to_string(),
            id: run.job_url().to_string(),
            build_number: number,
            duration: duration_seconds(start_time, end_time),
            start_time,
            end_time,
            url: run.url().to_string(),
            logs,
            status: JobStatus::from(run.result()),
        };

        let change_log = match run.change_log_history() {
            Some(history) => Some(collect_change_log(history, number, run.result())?),
            None => {
                debug!("[#{}] Run does not record change sets", number);
                None
            }
        };

        let source = SourceDetails {
            url: repository_url(&env),
            event: SourceEvent::from_env(number, &env),
            change_log,
        };

        Ok(Payload { job, source })
    }
}
