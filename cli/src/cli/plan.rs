use std::io::{self, Write};

use anyhow::Result;

use perfsweep::render_command;

use super::select::{load_selected, Selected};
use super::{ignore_closed_stdout, PlanArgs};

/// Dry run (`perfsweep plan`): print each rendered command, spawn nothing.
pub(super) fn cmd_plan(args: PlanArgs) -> Result<()> {
    let selected = load_selected(&args.select)?;
    let total = selected.sets.len();

    let stdout = io::stdout();
    let Some(invalid) = ignore_closed_stdout(write_plan(&mut stdout.lock(), &selected))? else {
        return Ok(());
    };
    if invalid > 0 {
        log::warn!(target: "config", "{invalid} of {total} cases cannot be rendered");
    }
    Ok(())
}

/// Write the plan and return how many cases failed to render.
fn write_plan(out: &mut impl Write, selected: &Selected) -> io::Result<usize> {
    let total = selected.sets.len();
    writeln!(out, "# {} ({} cases)", selected.source, total)?;
    if let Some(description) = &selected.workload.description {
        writeln!(out, "# {description}")?;
    }

    let mut invalid = 0usize;
    for (index, params) in selected.sets.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "# [{}/{}] {}", index + 1, total, params.describe())?;
        match render_command(params, &selected.workload.profiler) {
            Ok(command) => writeln!(out, "{}", command.display())?,
            Err(err) => {
                invalid += 1;
                writeln!(out, "# error: {err}")?;
            }
        }
    }
    out.flush()?;
    Ok(invalid)
}
