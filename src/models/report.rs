//! Diff results, change reports and run outcomes.

use std::fmt;

use serde::Serialize;

/// Output of the diff engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffResult {
    /// The engine reported its "no differences" sentinel
    NoDifferences,
    /// Raw, line-oriented report as printed by the engine
    Differences(String),
}

/// Human-readable outcome of a diff, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReport {
    NoChange,
    Changed(String),
}

impl ChangeReport {
    /// Text to deliver, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::NoChange => None,
            Self::Changed(text) => Some(text.as_str()),
        }
    }
}

/// How a single pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RunOutcome {
    /// No baseline existed; the observed document became the baseline
    Bootstrapped,
    /// The engine found no differences
    Unchanged,
    /// Drift was detected; `notified` is false if delivery failed
    Changed { notified: bool },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrapped => write!(f, "bootstrapped"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Changed { notified: true } => write!(f, "changed (notified)"),
            Self::Changed { notified: false } => write!(f, "changed (notification failed)"),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub outcome: RunOutcome,
    /// Fingerprint of the baseline compared against (equal to latest on bootstrap)
    pub baseline_fingerprint: String,
    pub latest_fingerprint: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_change_report_text() {
        assert_eq!(ChangeReport::NoChange.text(), None);
        assert_eq!(ChangeReport::Changed("- POST /users".into()).text(), Some("- POST /users"));
    }

    #[test]
    fn test_run_report_json_is_flat() {
        let report = RunReport {
            outcome: RunOutcome::Changed { notified: false },
            baseline_fingerprint: "aaa".into(),
            latest_fingerprint: "bbb".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "outcome": "changed",
                "notified": false,
                "baseline_fingerprint": "aaa",
                "latest_fingerprint": "bbb"
            })
        );

        let report = RunReport {
            outcome: RunOutcome::Bootstrapped,
            baseline_fingerprint: "aaa".into(),
            latest_fingerprint: "aaa".into(),
        };
        assert_eq!(serde_json::to_value(&report).unwrap()["outcome"], "bootstrapped");
    }
}
