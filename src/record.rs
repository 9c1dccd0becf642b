//! JSON run record emitted by a CI post-build step

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{NotifierError, Result};
use crate::run::{BuildResult, BuildRun, ChangeLogHistory, ChangeLogSet, EnvVars};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRef {
    pub full_name: String,
    pub url: String,
}

/// An earlier run of the same job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRun {
    pub number: u64,
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub change_sets: Vec<ChangeLogSet>,
}

/// A completed run as described by the CI host.
///
/// `change_sets` being present means the host records change sets, which
/// enables change log collection over `history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub job: JobRef,
    pub number: u64,
    pub url: String,
    pub start_time_millis: i64,
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub environment: EnvVars,
    /// Inline console log.
    #[serde(default)]
    pub log: Option<String>,
    /// Console log on disk, read when `log` is absent.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub change_sets: Option<Vec<ChangeLogSet>>,
    #[serde(default)]
    pub history: Vec<HistoricalRun>,
}

impl RunRecord {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            NotifierError::ConfigError(format!(
                "Failed to open run record '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn earlier_runs(&self, number: u64) -> impl Iterator<Item = &HistoricalRun> {
        self.history.iter().filter(move |r| r.number < number)
    }
}

impl ChangeLogHistory for RunRecord {
    fn change_sets(&self, number: u64) -> Result<Vec<ChangeLogSet>> {
        if number == self.number {
            return Ok(self.change_sets.clone().unwrap_or_default());
        }
        Ok(self
            .history
            .iter()
            .find(|r| r.number == number)
            .map(|r| r.change_sets.clone())
            .unwrap_or_default())
    }

    fn previous_build(&self, number: u64) -> Option<u64> {
        self.earlier_runs(number).map(|r| r.number).max()
    }

    fn previous_successful_build(&self, number: u64) -> Option<u64> {
        self.earlier_runs(number)
            .filter(|r| r.result == Some(BuildResult::Success))
            .map(|r| r.number)
            .max()
    }
}

impl BuildRun for RunRecord {
    fn number(&self) -> u64 {
        self.number
    }

    fn job_name(&self) -> &str {
        &self.job.full_name
    }

    fn job_url(&self) -> &str {
        &self.job.url
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn start_time_millis(&self) -> i64 {
        self.start_time_millis
    }

    fn result(&self) -> Option<BuildResult> {
        self.result
    }

    fn environment(&self) -> Result<EnvVars> {
        Ok(self.environment.clone())
    }

    fn log_reader(&self) -> Result<Box<dyn Read + '_>> {
        match (&self.log, &self.log_file) {
            (Some(log), _) => Ok(Box::new(log.as_bytes())),
            (None, Some(path)) => Ok(Box::new(BufReader::new(File::open(path)?))),
            (None, None) => Ok(Box::new(std::io::empty())),
        }
    }

    fn change_log_history(&self) -> Option<&dyn ChangeLogHistory> {
        self.change_sets.as_ref().map(|_| self as &dyn ChangeLogHistory)
    }
}
