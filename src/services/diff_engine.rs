// src/services/diff_engine.rs

//! Diff engine boundary.
//!
//! The structural comparison itself is delegated to an external program
//! (openapi-diff in a container by default). The watcher only hands it two
//! JSON files and classifies what it prints.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::{DiffConfig, DiffResult, SpecDocument};

/// File name the baseline is written under inside the scratch directory.
const BASELINE_NAME: &str = "baseline.json";
/// File name the latest document is written under inside the scratch directory.
const LATEST_NAME: &str = "latest.json";
/// Maximum stderr bytes quoted in an error.
const STDERR_EXCERPT: usize = 512;

/// Computes a structural diff between two documents.
#[async_trait]
pub trait DiffEngine: Send + Sync {
    async fn diff(&self, baseline: &SpecDocument, latest: &SpecDocument) -> Result<DiffResult>;
}

/// Runs an external diff program over two JSON files.
#[derive(Debug, Clone)]
pub struct ProcessDiffEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    sentinel: String,
}

impl ProcessDiffEngine {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        sentinel: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            sentinel: sentinel.into(),
        }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
            config.no_changes_sentinel.clone(),
        )
    }

    /// Substitute `{dir}`, `{baseline}` and `{latest}` in the argument list.
    fn render_args(&self, dir: &Path) -> Vec<String> {
        let dir = dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{dir}", &dir)
                    .replace("{baseline}", BASELINE_NAME)
                    .replace("{latest}", LATEST_NAME)
            })
            .collect()
    }

    /// Classify the fully drained standard output.
    fn classify(&self, stdout: String) -> Result<DiffResult> {
        if stdout.trim().is_empty() {
            return Err(AppError::diff_engine("engine produced no output"));
        }
        if !self.sentinel.is_empty() && stdout.trim_start().starts_with(&self.sentinel) {
            return Ok(DiffResult::NoDifferences);
        }
        Ok(DiffResult::Differences(stdout))
    }
}

#[async_trait]
impl DiffEngine for ProcessDiffEngine {
    async fn diff(&self, baseline: &SpecDocument, latest: &SpecDocument) -> Result<DiffResult> {
        let scratch = tempfile::Builder::new()
            .prefix("spec-watch-")
            .tempdir()
            .map_err(|e| AppError::diff_engine(format!("cannot create scratch dir: {e}")))?;

        for (name, doc) in [(BASELINE_NAME, baseline), (LATEST_NAME, latest)] {
            let bytes = serde_json::to_vec(doc)?;
            tokio::fs::write(scratch.path().join(name), bytes)
                .await
                .map_err(|e| AppError::diff_engine(format!("cannot stage {name}: {e}")))?;
        }

        let args = self.render_args(scratch.path());
        log::debug!("Spawning diff engine: {} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::diff_engine(format!("failed to start '{}': {e}", self.program)))?;

        // Output is only inspected once the process has exited.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                AppError::diff_engine(format!(
                    "engine did not finish within {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| AppError::diff_engine(format!("failed to collect output: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(AppError::diff_engine(format!(
                "engine exited with {}: {}",
                output.status, excerpt
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| AppError::diff_engine("engine output is not valid UTF-8"))?;
        self.classify(stdout)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn engine(script: &str, timeout: Duration) -> ProcessDiffEngine {
        ProcessDiffEngine::new(
            "sh",
            vec![
                "-c".into(),
                script.into(),
                "sh".into(),
                "{dir}/{baseline}".into(),
                "{dir}/{latest}".into(),
            ],
            timeout,
            "No differences",
        )
    }

    fn docs() -> (SpecDocument, SpecDocument) {
        (
            SpecDocument::new(json!({ "paths": { "/users": { "get": {} } } })),
            SpecDocument::new(
                json!({ "paths": { "/users": { "get": {}, "post": {} } } }),
            ),
        )
    }

    #[test]
    fn test_render_args() {
        let engine = ProcessDiffEngine::from_config(&DiffConfig::default());
        let args = engine.render_args(Path::new("/tmp/work"));
        assert!(args.contains(&"/tmp/work:/specs".to_string()));
        assert!(args.contains(&"/specs/baseline.json".to_string()));
        assert!(args.contains(&"/specs/latest.json".to_string()));
    }

    #[test]
    fn test_classify() {
        let engine = engine("", Duration::from_secs(1));
        assert_eq!(
            engine
                .classify("No differences. Specifications are equivalents\n".into())
                .unwrap(),
            DiffResult::NoDifferences
        );
        assert_eq!(
            engine.classify("\n  No differences.".into()).unwrap(),
            DiffResult::NoDifferences
        );
        assert!(matches!(
            engine.classify("- POST /users\n".into()).unwrap(),
            DiffResult::Differences(_)
        ));
        assert!(engine.classify("   \n".into()).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_sees_both_files() {
        let (baseline, latest) = docs();
        let script = r#"if cmp -s "$1" "$2"; then echo "No differences"; else echo "- POST /users"; fi"#;
        let result = engine(script, Duration::from_secs(10))
            .diff(&baseline, &latest)
            .await
            .unwrap();
        assert_eq!(result, DiffResult::Differences("- POST /users\n".into()));

        let result = engine(script, Duration::from_secs(10))
            .diff(&baseline, &baseline)
            .await
            .unwrap();
        assert_eq!(result, DiffResult::NoDifferences);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_multi_chunk_output_is_fully_drained() {
        let (baseline, latest) = docs();
        let script = r#"echo "- POST /users"; sleep 0.2; echo "- DELETE /users/{id}""#;
        let result = engine(script, Duration::from_secs(10))
            .diff(&baseline, &latest)
            .await
            .unwrap();
        assert_eq!(
            result,
            DiffResult::Differences("- POST /users\n- DELETE /users/{id}\n".into())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let (baseline, latest) = docs();
        let err = engine("echo boom >&2; exit 3", Duration::from_secs(10))
            .diff(&baseline, &latest)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DiffEngine(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_error() {
        let (baseline, latest) = docs();
        let err = engine("sleep 5", Duration::from_millis(200))
            .diff(&baseline, &latest)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not finish within 200ms"));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let (baseline, latest) = docs();
        let engine = ProcessDiffEngine::new(
            "spec-watch-no-such-binary",
            vec![],
            Duration::from_secs(1),
            "No differences",
        );
        let err = engine.diff(&baseline, &latest).await.unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}
