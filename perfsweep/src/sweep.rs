//! The sweep loop: render, execute, report, continue.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};

use crate::exec::{ExecOptions, Executor, ProcessExecutor};
use crate::params::ParameterSet;
use crate::render::{render_command, CommandLine, FixedConfig};
use crate::report::{CaseResult, CaseStatus, ResultsLog, SweepReport};

/// Drives one sweep through an [`Executor`], writing operator-facing
/// progress lines to `out`.
pub struct SweepRunner<E, W> {
    executor: E,
    out: W,
    out_failed: bool,
    options: ExecOptions,
    results_log: Option<ResultsLog>,
    completed: HashSet<CommandLine>,
}

impl<E: Executor, W: Write> SweepRunner<E, W> {
    pub fn new(executor: E, out: W) -> Self {
        Self {
            executor,
            out,
            out_failed: false,
            options: ExecOptions::default(),
            results_log: None,
            completed: HashSet::new(),
        }
    }

    pub fn options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    /// Append every case result to `log` as soon as the case finishes.
    pub fn results_log(mut self, log: ResultsLog) -> Self {
        self.results_log = Some(log);
        self
    }

    /// Commands to skip because they already succeeded in an earlier run.
    pub fn skip_completed(mut self, completed: HashSet<CommandLine>) -> Self {
        self.completed = completed;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_parts(self) -> (E, W) {
        (self.executor, self.out)
    }

    /// Run every parameter set in order.
    ///
    /// Nothing stops the sweep early: failing cases, results-log errors and
    /// a progress writer that went away (`perfsweep run | head`) are logged
    /// and the next case runs anyway.
    pub fn run(&mut self, sets: &[ParameterSet], fixed: &FixedConfig) -> SweepReport {
        let total = sets.len();
        let mut report = SweepReport::default();
        log::info!(target: "sweep", "starting sweep of {total} cases");

        for (index, params) in sets.iter().enumerate() {
            let result = self.run_case(index, total, params, fixed);
            report.results.push(result);
        }

        if total > 0 {
            self.say(format_args!("\n{}", report.summary_line()));
        }
        log::info!(target: "sweep", "{}", report.summary_line());
        report
    }

    fn run_case(
        &mut self,
        index: usize,
        total: usize,
        params: &ParameterSet,
        fixed: &FixedConfig,
    ) -> CaseResult {
        let tag = format!("[{}/{}]", index + 1, total);

        let command = match render_command(params, fixed) {
            Ok(command) => command,
            Err(err) => {
                log::warn!(target: "sweep", "case {} not rendered: {err}", index + 1);
                let result = CaseResult {
                    index,
                    params: params.clone(),
                    command: None,
                    status: CaseStatus::Failed,
                    reason: Some(err.to_string()),
                    outcome: None,
                };
                self.record(&result);
                self.say(format_args!("\n✗ {tag} {}: {err}", params.describe()));
                return result;
            }
        };

        if self.completed.contains(&command) {
            let result = CaseResult {
                index,
                params: params.clone(),
                command: Some(command),
                status: CaseStatus::Skipped,
                reason: None,
                outcome: None,
            };
            self.record(&result);
            self.say(format_args!(
                "\n↷ {tag} Skipping (already succeeded): {}",
                params.describe()
            ));
            return result;
        }

        self.say(format_args!("\n▶ {tag} Running: {}", params.describe()));
        self.flush();
        log::info!(target: "sweep", "{}", command.display());

        let outcome = self.executor.execute(&command, &self.options);
        let reason = outcome.failure_reason();
        let result = CaseResult {
            index,
            params: params.clone(),
            command: Some(command),
            status: if reason.is_none() {
                CaseStatus::Succeeded
            } else {
                CaseStatus::Failed
            },
            reason,
            outcome: Some(outcome),
        };
        self.record(&result);

        let Some(outcome) = result.outcome.as_ref() else {
            return result;
        };
        match &result.reason {
            None => {
                self.say(format_args!(
                    "✓ {tag} ok in {:.1}s",
                    outcome.elapsed.as_secs_f64()
                ));
                if let Some(stdout) = outcome.stdout.as_deref().filter(|s| !s.is_empty()) {
                    self.say(format_args!("Output:\n{}", stdout.trim_end()));
                }
            }
            Some(reason) => {
                self.say(format_args!("✗ {tag} Command failed: {reason}"));
                if let Some(stderr) = outcome.stderr.as_deref().filter(|s| !s.is_empty()) {
                    self.say(format_args!("Error output:\n{}", stderr.trim_end()));
                }
                log::warn!(target: "sweep", "case {} failed: {reason}", index + 1);
            }
        }
        result
    }

    fn record(&mut self, result: &CaseResult) {
        let Some(results) = self.results_log.as_mut() else {
            return;
        };
        if let Err(err) = results.append(result) {
            log::error!(
                target: "sweep",
                "failed to record case {} in {}: {err}",
                result.index + 1,
                results.path().display()
            );
        }
    }

    /// Write one progress line. After the first write error the writer is
    /// left alone for the rest of the sweep.
    fn say(&mut self, line: fmt::Arguments<'_>) {
        if self.out_failed {
            return;
        }
        if let Err(err) = writeln!(self.out, "{line}") {
            self.output_lost(err);
        }
    }

    fn flush(&mut self) {
        if self.out_failed {
            return;
        }
        if let Err(err) = self.out.flush() {
            self.output_lost(err);
        }
    }

    fn output_lost(&mut self, err: io::Error) {
        self.out_failed = true;
        log::warn!(target: "sweep", "progress output lost ({err}); sweep continues");
    }
}

/// Run a sweep with real child processes, printing progress to stdout.
pub fn run_sweep(
    sets: &[ParameterSet],
    fixed: &FixedConfig,
    options: ExecOptions,
) -> SweepReport {
    let stdout = io::stdout();
    SweepRunner::new(ProcessExecutor, stdout.lock())
        .options(options)
        .run(sets, fixed)
}
