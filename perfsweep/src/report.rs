//! Per-case results and the JSON-lines results log.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::exec::Outcome;
use crate::params::ParameterSet;
use crate::render::CommandLine;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Succeeded,
    Failed,
    /// Already succeeded in a previous run recorded in the results log.
    Skipped,
}

/// Everything known about one parameter set after the runner is done with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub index: usize,
    pub params: ParameterSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandLine>,
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl CaseResult {
    pub fn succeeded(&self) -> bool {
        self.status == CaseStatus::Succeeded
    }
}

/// Ordered collection of case results for one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub results: Vec<CaseResult>,
}

impl SweepReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn count(&self, status: CaseStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(CaseStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(CaseStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CaseStatus::Skipped)
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} cases: {} succeeded, {} failed",
            self.len(),
            self.succeeded(),
            self.failed()
        );
        let skipped = self.skipped();
        if skipped > 0 {
            line.push_str(&format!(", {skipped} skipped"));
        }
        line
    }
}

/// Append-only JSON-lines log, flushed after every case.
pub struct ResultsLog {
    path: PathBuf,
    file: File,
}

impl ResultsLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, result: &CaseResult) -> Result<()> {
        let mut line = serde_json::to_string(result)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Read every entry of a results log. A missing file reads as empty.
pub fn read_results(path: &Path) -> Result<Vec<CaseResult>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = serde_json::from_str(&line).map_err(|source| Error::ResultsLog {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        out.push(result);
    }
    Ok(out)
}

/// Command lines that already ran successfully according to `path`.
pub fn completed_commands(path: &Path) -> Result<HashSet<CommandLine>> {
    Ok(read_results(path)?
        .into_iter()
        .filter(CaseResult::succeeded)
        .filter_map(|r| r.command)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn result(index: usize, status: CaseStatus, concurrency: i64) -> CaseResult {
        let mut command = CommandLine::new("genai-perf");
        command.arg("--concurrency").arg(concurrency.to_string());
        CaseResult {
            index,
            params: ParameterSet::new().with("concurrency", concurrency),
            command: Some(command),
            status,
            reason: (status == CaseStatus::Failed).then(|| "exit status 1".to_string()),
            outcome: Some(Outcome {
                status: Some(if status == CaseStatus::Failed { 1 } else { 0 }),
                elapsed: Duration::from_millis(250),
                ..Outcome::default()
            }),
        }
    }

    #[test]
    fn log_appends_and_reads_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("runs").join("sweep.jsonl");

        let mut log = ResultsLog::open(&path).expect("open");
        log.append(&result(0, CaseStatus::Succeeded, 1)).expect("append");
        log.append(&result(1, CaseStatus::Failed, 3)).expect("append");
        drop(log);

        // Reopening appends rather than truncating.
        let mut log = ResultsLog::open(&path).expect("reopen");
        log.append(&result(2, CaseStatus::Succeeded, 5)).expect("append");

        let entries = read_results(&path).expect("read");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].status, CaseStatus::Failed);
        assert_eq!(entries[1].reason.as_deref(), Some("exit status 1"));
        assert_eq!(
            entries[2].params.get("concurrency").map(ToString::to_string),
            Some("5".to_string())
        );
    }

    #[test]
    fn completed_commands_ignores_failures() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("sweep.jsonl");
        let mut log = ResultsLog::open(&path).expect("open");
        log.append(&result(0, CaseStatus::Succeeded, 1)).expect("append");
        log.append(&result(1, CaseStatus::Failed, 3)).expect("append");

        let done = completed_commands(&path).expect("completed");
        assert_eq!(done.len(), 1);
        assert!(done.contains(&result(0, CaseStatus::Succeeded, 1).command.unwrap()));
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempdir().expect("tempdir");
        assert!(read_results(&dir.path().join("absent.jsonl"))
            .expect("read")
            .is_empty());
    }

    #[test]
    fn malformed_line_names_the_line() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.jsonl");
        let good = serde_json::to_string(&result(0, CaseStatus::Succeeded, 1)).unwrap();
        fs::write(&path, format!("{good}\n\nnot json\n")).unwrap();

        match read_results(&path) {
            Err(Error::ResultsLog { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected results log error, got {other:?}"),
        }
    }

    #[test]
    fn summary_mentions_skips_only_when_present() {
        let mut report = SweepReport {
            results: vec![
                result(0, CaseStatus::Succeeded, 1),
                result(1, CaseStatus::Failed, 3),
            ],
        };
        assert_eq!(report.summary_line(), "2 cases: 1 succeeded, 1 failed");
        assert!(!report.all_succeeded());

        report.results.push(result(2, CaseStatus::Skipped, 5));
        assert_eq!(
            report.summary_line(),
            "3 cases: 1 succeeded, 1 failed, 1 skipped"
        );
    }
}
