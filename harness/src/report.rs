//! Aggregated results of a harness run and their text rendering.

use crate::scenario::{ScenarioResult, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report to '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub duration_ms: u64,
    /// `None` when the scenario passed.
    pub failure: Option<String>,
}

impl ScenarioOutcome {
    pub fn from_result(name: &str, elapsed: Duration, result: ScenarioResult<()>) -> Self {
        Self {
            name: name.to_string(),
            duration_ms: elapsed.as_millis() as u64,
            failure: result.err().map(|e| e.to_string()),
        }
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TierStatus {
    /// Every scenario of the tier ran.
    Completed,
    /// The tier could not start, e.g. the service never became ready.
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierReport {
    pub tier: Tier,
    pub status: TierStatus,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl TierReport {
    pub fn completed(tier: Tier, outcomes: Vec<ScenarioOutcome>) -> Self {
        Self {
            tier,
            status: TierStatus::Completed,
            outcomes,
        }
    }

    pub fn aborted(tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            tier,
            status: TierStatus::Aborted {
                reason: reason.into(),
            },
            outcomes: Vec::new(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TierStatus::Aborted { .. })
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// An aborted tier never counts as a success.
    pub fn is_success(&self) -> bool {
        !self.is_aborted() && self.failed() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tiers: Vec<TierReport>,
}

impl SuiteReport {
    pub fn new(started_at: DateTime<Utc>, tiers: Vec<TierReport>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            tiers,
        }
    }

    pub fn passed(&self) -> usize {
        self.tiers.iter().map(TierReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.tiers.iter().map(TierReport::failed).sum()
    }

    pub fn is_success(&self) -> bool {
        self.tiers.iter().all(TierReport::is_success)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Human-readable report, as written to the report file.
    pub fn render_text(&self) -> String {
        const STAMP: &str = "%Y-%m-%d %H:%M:%S UTC";
        let mut lines = vec![
            "Defect tracker contract test report".to_string(),
            format!("Started:  {}", self.started_at.format(STAMP)),
            format!("Finished: {}", self.finished_at.format(STAMP)),
            format!("Duration: {}ms", self.duration().num_milliseconds()),
        ];

        for tier in &self.tiers {
            lines.push(String::new());
            lines.push(match &tier.status {
                TierStatus::Completed => format!(
                    "[{}] {} passed, {} failed",
                    tier.tier,
                    tier.passed(),
                    tier.failed()
                ),
                TierStatus::Aborted { reason } => format!("[{}] ABORTED: {}", tier.tier, reason),
            });
            for outcome in &tier.outcomes {
                let verdict = if outcome.passed() { "PASS" } else { "FAIL" };
                lines.push(format!(
                    "  {} {} ({}ms)",
                    verdict, outcome.name, outcome.duration_ms
                ));
                if let Some(failure) = &outcome.failure {
                    lines.push(format!("       {}", failure));
                }
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "Result: {} ({} passed, {} failed)",
            if self.is_success() { "SUCCESS" } else { "FAILURE" },
            self.passed(),
            self.failed()
        ));

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    pub fn write_to(&self, path: &Path) -> ReportResult<()> {
        let io_error = |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.render_text()).map_err(io_error)?;
        info!("Report written to {}", path.display());
        Ok(())
    }

    /// Console summary printed at the end of a run.
    pub fn print_summary(&self) {
        println!("\n--- Test Summary ---");
        for tier in &self.tiers {
            match &tier.status {
                TierStatus::Completed => println!(
                    "[{}] {} passed, {} failed",
                    tier.tier,
                    tier.passed(),
                    tier.failed()
                ),
                TierStatus::Aborted { reason } => {
                    println!("[{}] aborted: {}", tier.tier, reason)
                }
            }
            for outcome in tier.outcomes.iter().filter(|o| !o.passed()) {
                println!(
                    "  ✗ {}: {}",
                    outcome.name,
                    outcome.failure.as_deref().unwrap_or_default()
                );
            }
        }

        if self.is_success() {
            println!("✓ All {} scenarios passed", self.passed());
        } else {
            println!(
                "✗ Test run failed ({} passed, {} failed)",
                self.passed(),
                self.failed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioError;

    fn outcome(name: &str, failure: Option<&str>) -> ScenarioOutcome {
        ScenarioOutcome {
            name: name.to_string(),
            duration_ms: 3,
            failure: failure.map(str::to_string),
        }
    }

    #[test]
    fn test_outcome_from_result() {
        let ok = ScenarioOutcome::from_result("ok", Duration::from_millis(12), Ok(()));
        assert!(ok.passed());
        assert_eq!(ok.duration_ms, 12);

        let err = ScenarioError::Assertion {
            message: "status: expected 201, got 500".to_string(),
        };
        let failed = ScenarioOutcome::from_result("bad", Duration::ZERO, Err(err));
        assert_eq!(
            failed.failure.as_deref(),
            Some("Assertion failed: status: expected 201, got 500")
        );
    }

    #[test]
    fn test_aborted_tier_is_failure() {
        let tier = TierReport::aborted(Tier::Integration, "service not ready");
        assert!(tier.is_aborted());
        assert_eq!(tier.failed(), 0);
        assert!(!tier.is_success());

        let suite = SuiteReport::new(Utc::now(), vec![tier]);
        assert!(!suite.is_success());
    }

    #[test]
    fn test_suite_counts() {
        let unit = TierReport::completed(
            Tier::Unit,
            vec![outcome("a", None), outcome("b", Some("boom"))],
        );
        let integration = TierReport::completed(Tier::Integration, vec![outcome("c", None)]);
        let suite = SuiteReport::new(Utc::now(), vec![unit, integration]);

        assert_eq!(suite.passed(), 2);
        assert_eq!(suite.failed(), 1);
        assert!(!suite.is_success());
    }

    #[test]
    fn test_render_text() {
        let suite = SuiteReport::new(
            Utc::now(),
            vec![
                TierReport::completed(
                    Tier::Unit,
                    vec![outcome("email", None), outcome("csv", Some("double quoted"))],
                ),
                TierReport::aborted(Tier::Integration, "not ready"),
            ],
        );
        let text = suite.render_text();
        assert!(text.contains("[unit] 1 passed, 1 failed"));
        assert!(text.contains("PASS email"));
        assert!(text.contains("FAIL csv"));
        assert!(text.contains("double quoted"));
        assert!(text.contains("[integration] ABORTED: not ready"));
        assert!(text.contains("Result: FAILURE"));
    }

    #[test]
    fn test_render_text_layout() {
        let suite = SuiteReport::new(
            Utc::now(),
            vec![TierReport::completed(
                Tier::Unit,
                vec![outcome("email", None), outcome("csv", Some("double quoted"))],
            )],
        );
        let text = suite.render_text();
        assert!(text.ends_with("(1 passed, 1 failed)\n"));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Defect tracker contract test report");
        assert!(lines[1].starts_with("Started:  ") && lines[1].ends_with(" UTC"));
        assert!(lines[3].starts_with("Duration: "));
        assert_eq!(
            &lines[4..],
            &[
                "",
                "[unit] 1 passed, 1 failed",
                "  PASS email (3ms)",
                "  FAIL csv (3ms)",
                "       double quoted",
                "",
                "Result: FAILURE (1 passed, 1 failed)",
            ]
        );
    }

    #[test]
    fn test_write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.txt");
        let suite = SuiteReport::new(
            Utc::now(),
            vec![TierReport::completed(Tier::Unit, vec![outcome("a", None)])],
        );

        suite.write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Result: SUCCESS (1 passed, 0 failed)"));
    }
}
