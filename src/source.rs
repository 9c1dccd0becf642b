//! Classification of the VCS event that triggered a run

use serde::Serialize;
use tracing::info;

use crate::run::EnvVars;

/// Triggering event, tagged by `eventType` in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "eventType")]
pub enum SourceEvent {
    #[serde(rename = "PR", rename_all = "camelCase")]
    PullRequest {
        pr_id: Option<String>,
        pr_source_branch: Option<String>,
        pr_target_branch: Option<String>,
        pr_link: Option<String>,
    },
    #[serde(rename = "PUSH", rename_all = "camelCase")]
    Push {
        branch: Option<String>,
        commit: Option<String>,
        prev_commit: Option<String>,
    },
    #[serde(rename = "OTHER")]
    Other,
}

impl SourceEvent {
    /// Classify from environment variables. Multibranch variables win over
    /// the GitHub pull request builder ones, which win over plain git.
    pub fn from_env(build_number: u64, env: &EnvVars) -> Self {
        let get = |key: &str| env.get(key).cloned();

        if env.contains_key("CHANGE_ID") {
            info!("[#{}] Identified git event: PR (CHANGE_ID)", build_number);
            SourceEvent::PullRequest {
                pr_id: get("CHANGE_ID"),
                pr_source_branch: get("CHANGE_BRANCH"),
                pr_target_branch: get("CHANGE_TARGET"),
                pr_link: get("CHANGE_URL"),
            }
        } else if env.contains_key("ghprbPullId") {
            info!("[#{}] Identified git event: PR (ghprbPullId)", build_number);
            SourceEvent::PullRequest {
                pr_id: get("ghprbPullId"),
                pr_source_branch: get("ghprbSourceBranch"),
                pr_target_branch: get("ghprbTargetBranch"),
                pr_link: get("ghprbPullLink"),
            }
        } else if env.contains_key("GIT_BRANCH") {
            info!("[#{}] Identified git event: PUSH", build_number);
            SourceEvent::Push {
                branch: get("GIT_BRANCH"),
                commit: get("GIT_COMMIT"),
                prev_commit: get("GIT_PREVIOUS_COMMIT"),
            }
        } else {
            info!("[#{}] Unidentified git event", build_number);
            SourceEvent::Other
        }
    }
}

/// Repository URL of the run, taken from `GIT_URL` whatever the event.
pub fn repository_url(env: &EnvVars) -> Option<String> {
    env.get("GIT_URL").cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn change_id_wins_over_ghprb() {
        let vars = env(&[
            ("CHANGE_ID", "42"),
            ("CHANGE_BRANCH", "feature"),
            ("CHANGE_TARGET", "main"),
            ("CHANGE_URL", "https://github.com/o/r/pull/42"),
            ("ghprbPullId", "7"),
            ("GIT_BRANCH", "origin/feature"),
        ]);
        let event = SourceEvent::from_env(1, &vars);
        assert_eq!(
            event,
            SourceEvent::PullRequest {
                pr_id: Some("42".to_string()),
                pr_source_branch: Some("feature".to_string()),
                pr_target_branch: Some("main".to_string()),
                pr_link: Some("https://github.com/o/r/pull/42".to_string()),
            }
        );
    }

    #[test]
    fn ghprb_variables_make_a_pr() {
        let vars = env(&[
            ("ghprbPullId", "7"),
            ("ghprbSourceBranch", "fix"),
            ("ghprbTargetBranch", "dev"),
            ("ghprbPullLink", "https://github.com/o/r/pull/7"),
            ("GIT_BRANCH", "origin/fix"),
        ]);
        match SourceEvent::from_env(1, &vars) {
            SourceEvent::PullRequest {
                pr_id,
                pr_target_branch,
                ..
            } => {
                assert_eq!(pr_id.as_deref(), Some("7"));
                assert_eq!(pr_target_branch.as_deref(), Some("dev"));
            }
            other => panic!("expected PR event, got {:?}", other),
        }
    }

    #[test]
    fn git_branch_makes_a_push() {
        let vars = env(&[("GIT_BRANCH", "main"), ("GIT_COMMIT", "abc")]);
        let value = serde_json::to_value(SourceEvent::from_env(1, &vars)).unwrap();
        assert_eq!(
            value,
            json!({
                "eventType": "PUSH",
                "branch": "main",
                "commit": "abc",
                "prevCommit": null,
            })
        );
    }

    #[test]
    fn no_vcs_variables_is_other() {
        let value = serde_json::to_value(SourceEvent::from_env(1, &EnvVars::new())).unwrap();
        assert_eq!(value, json!({ "eventType": "OTHER" }));
    }

    #[test]
    fn pr_serializes_camel_case() {
        let vars = env(&[("CHANGE_ID", "42")]);
        let value = serde_json::to_value(SourceEvent::from_env(1, &vars)).unwrap();
        assert_eq!(value["eventType"], "PR");
        assert_eq!(value["prId"], "42");
        assert!(value.get("prSourceBranch").is_some());
        assert!(value.get("branch").is_none());
    }

    #[test]
    fn repository_url_from_git_url() {
        let vars = env(&[("GIT_URL", "https://github.com/o/r")]);
        assert_eq!(
            repository_url(&vars).as_deref(),
            Some("https://github.com/o/r")
        );
        assert_eq!(repository_url(&EnvVars::new()), None);
    }
}
