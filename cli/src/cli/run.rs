use std::collections::HashSet;
use std::io;

use anyhow::{bail, Context, Result};

use perfsweep::{report, ProcessExecutor, ResultsLog, SweepRunner};

use super::select::load_selected;
use super::RunArgs;

/// Run a workload (`perfsweep run`)
pub(super) fn cmd_run(args: RunArgs) -> Result<()> {
    let selected = load_selected(&args.select)?;
    let workload = &selected.workload;

    let mut run_config = workload.run.clone();
    if args.capture {
        run_config.capture = true;
    }
    if args.no_capture {
        run_config.capture = false;
    }
    if args.timeout.is_some() {
        run_config.timeout_secs = args.timeout;
    }
    if args.results.is_some() {
        run_config.results = args.results.clone();
    }
    let options = run_config.exec_options()?;

    if args.resume && run_config.results.is_none() {
        bail!("--resume needs a results file (--results or [run].results)");
    }

    log::info!(
        target: "config",
        "workload {} with {} cases",
        selected.source,
        selected.sets.len()
    );

    let completed = match (&run_config.results, args.resume) {
        (Some(path), true) => {
            let done = report::completed_commands(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            log::info!(target: "config", "{} completed cases in {}", done.len(), path.display());
            done
        }
        _ => HashSet::new(),
    };

    let stdout = io::stdout();
    let mut runner = SweepRunner::new(ProcessExecutor, stdout.lock())
        .options(options)
        .skip_completed(completed);
    if let Some(path) = &run_config.results {
        let results = ResultsLog::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        runner = runner.results_log(results);
    }

    let report = runner.run(&selected.sets, &workload.profiler);

    if args.strict && !report.all_succeeded() {
        bail!("{} of {} cases failed", report.failed(), report.len());
    }
    Ok(())
}
