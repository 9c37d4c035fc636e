//! Workload files (`*.toml`) and the user workload directory
//! (`~/.perfsweep/workloads/`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use perfsweep::{ExecOptions, FixedConfig, ParameterSet, SweepMatrix};

use crate::workloads;

/// How the sweep runs, independent of what it runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Capture profiler stdout/stderr instead of streaming it to the terminal.
    #[serde(default)]
    pub capture: bool,
    /// Per-invocation timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    /// JSON-lines results log, relative to the current directory.
    #[serde(default)]
    pub results: Option<PathBuf>,
}

impl RunConfig {
    pub fn exec_options(&self) -> Result<ExecOptions> {
        let timeout = match self.timeout_secs {
            None => None,
            Some(secs) if secs > 0.0 => match Duration::try_from_secs_f64(secs) {
                Ok(timeout) => Some(timeout),
                Err(_) => bail!("timeout of {secs}s is out of range"),
            },
            Some(secs) => bail!("timeout must be a positive number of seconds, got {secs}"),
        };
        Ok(ExecOptions {
            capture: self.capture,
            timeout,
        })
    }
}

/// A complete sweep definition: profiler options, run options and the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub description: Option<String>,
    pub profiler: FixedConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(flatten)]
    pub matrix: SweepMatrix,
}

impl Workload {
    pub fn parameter_sets(&self) -> Result<Vec<ParameterSet>> {
        Ok(self.matrix.expand()?)
    }
}

/// Where a workload was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadSource {
    Builtin(&'static str),
    File(PathBuf),
}

impl std::fmt::Display for WorkloadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadSource::Builtin(name) => write!(f, "builtin:{name}"),
            WorkloadSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Return `~/.perfsweep/`.
pub fn perfsweep_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".perfsweep")
}

/// Return `~/.perfsweep/workloads/`.
pub fn user_workloads_dir() -> PathBuf {
    workloads_dir_with_home(&perfsweep_home())
}

fn workloads_dir_with_home(home: &Path) -> PathBuf {
    home.join("workloads")
}

pub fn parse_workload(contents: &str, origin: &str) -> Result<Workload> {
    toml::from_str(contents).with_context(|| format!("Failed to parse {origin}"))
}

pub fn load_workload_from(path: &Path) -> Result<Workload> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_workload(&contents, &path.display().to_string())
}

/// Resolve a workload by name: built-ins first, then
/// `~/.perfsweep/workloads/<name>.toml`.
pub fn resolve_workload(name: &str) -> Result<(Workload, WorkloadSource)> {
    resolve_workload_with_home(name, &perfsweep_home())
}

fn resolve_workload_with_home(name: &str, home: &Path) -> Result<(Workload, WorkloadSource)> {
    if let Some((builtin_name, contents)) = workloads::builtin(name) {
        let workload = parse_workload(contents, &format!("builtin workload '{name}'"))?;
        return Ok((workload, WorkloadSource::Builtin(builtin_name)));
    }

    let path = workloads_dir_with_home(home).join(format!("{name}.toml"));
    if path.is_file() {
        let workload = load_workload_from(&path)?;
        log::debug!(target: "config", "loaded workload '{name}' from {}", path.display());
        return Ok((workload, WorkloadSource::File(path)));
    }

    bail!(
        "Unknown workload '{}'. Built-ins: {}. User workloads live in {}",
        name,
        workloads::names().join(", "),
        workloads_dir_with_home(home).display()
    )
}

/// User workload files as `(name, path)`, sorted by name.
pub fn list_user_workloads() -> Result<Vec<(String, PathBuf)>> {
    list_user_workloads_in(&user_workloads_dir())
}

fn list_user_workloads_in(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            out.push((stem.to_string(), path.clone()));
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfsweep::ParamValue;
    use tempfile::tempdir;

    const CUSTOM: &str = r#"
description = "custom"

[profiler]
program = "my-profiler"
subcommand = []
model = "m"
url = "http://host:8000"

[run]
capture = true
timeout_secs = 2.5
results = "out/results.jsonl"

[[cases]]
name = "warmup"
concurrency = 1
input_type = "query"

[[grid]]
axes = [{ param = "concurrency", values = [2, 4] }]
"#;

    #[test]
    fn parses_profiler_run_and_matrix() {
        let workload = parse_workload(CUSTOM, "test").expect("parse");
        assert_eq!(workload.profiler.program, "my-profiler");
        assert!(workload.profiler.subcommand.is_empty());
        assert_eq!(workload.profiler.url_flag, "--url");
        assert!(!workload.profiler.bindings.is_empty());

        let options = workload.run.exec_options().expect("options");
        assert!(options.capture);
        assert_eq!(options.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(
            workload.run.results.as_deref(),
            Some(Path::new("out/results.jsonl"))
        );

        let sets = workload.parameter_sets().expect("sets");
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].label(), Some("warmup"));
        assert_eq!(sets[0].get("input_type"), Some(&ParamValue::from("query")));
        assert_eq!(sets[2].get("concurrency"), Some(&ParamValue::Int(4)));
    }

    #[test]
    fn rejects_non_positive_timeout() {
        let run = RunConfig {
            timeout_secs: Some(0.0),
            ..RunConfig::default()
        };
        assert!(run.exec_options().is_err());
    }

    #[test]
    fn rejects_timeout_too_large_for_duration() {
        for secs in [1e20, f64::INFINITY] {
            let run = RunConfig {
                timeout_secs: Some(secs),
                ..RunConfig::default()
            };
            let err = run.exec_options().expect_err("out of range");
            assert!(err.to_string().contains("out of range"), "{err}");
        }
    }

    #[test]
    fn misspelled_profiler_option_is_an_error() {
        let contents = "[profiler]\nmodel = \"m\"\nurl = \"http://h:1\"\n\
                        extra_input = [\"truncate:END\"]\n";
        let err = parse_workload(contents, "typo").expect_err("unknown key");
        assert!(format!("{err:#}").contains("extra_input"), "{err:#}");
    }

    #[test]
    fn missing_profiler_section_is_an_error() {
        assert!(parse_workload("[[cases]]\nconcurrency = 1\n", "test").is_err());
    }

    #[test]
    fn builtin_wins_over_user_file() {
        let temp = tempdir().expect("tempdir");
        let home = temp.path().join(".perfsweep");
        let dir = workloads_dir_with_home(&home);
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("embedder.toml"), CUSTOM).expect("write");

        let (_, source) = resolve_workload_with_home("embedder", &home).expect("resolve");
        assert_eq!(source, WorkloadSource::Builtin("embedder"));
    }

    #[test]
    fn resolves_user_workload_by_name() {
        let temp = tempdir().expect("tempdir");
        let home = temp.path().join(".perfsweep");
        let dir = workloads_dir_with_home(&home);
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("nightly.toml"), CUSTOM).expect("write");
        std::fs::write(dir.join("notes.txt"), "ignored").expect("write");

        let (workload, source) = resolve_workload_with_home("nightly", &home).expect("resolve");
        assert_eq!(workload.description.as_deref(), Some("custom"));
        assert_eq!(source, WorkloadSource::File(dir.join("nightly.toml")));

        let listed = list_user_workloads_in(&dir).expect("list");
        assert_eq!(listed, vec![("nightly".to_string(), dir.join("nightly.toml"))]);
    }

    #[test]
    fn unknown_workload_lists_builtins() {
        let temp = tempdir().expect("tempdir");
        let err = resolve_workload_with_home("nope", temp.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("embedder"));
        assert!(msg.contains("reranker"));
    }
}
