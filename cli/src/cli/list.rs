use std::io::{self, Write};

use anyhow::Result;

use crate::config::{list_user_workloads, load_workload_from, parse_workload, user_workloads_dir};
use crate::workloads;

use super::ignore_closed_stdout;

/// One row of `perfsweep list`: case count and description, or why the file
/// could not be used.
type Entry = (String, std::result::Result<(usize, String), String>);

/// List workloads (`perfsweep list`)
pub(super) fn cmd_list() -> Result<()> {
    let mut builtin = Vec::new();
    for name in workloads::names() {
        if let Some((_, contents)) = workloads::builtin(name) {
            let workload = parse_workload(contents, name)?;
            let cases = workload.matrix.expand()?.len();
            builtin.push((
                name.to_string(),
                Ok((cases, workload.description.unwrap_or_default())),
            ));
        }
    }

    let user = list_user_workloads()?
        .into_iter()
        .map(|(name, path)| {
            let entry = match load_workload_from(&path) {
                Ok(workload) => match workload.matrix.expand() {
                    Ok(sets) => Ok((sets.len(), workload.description.unwrap_or_default())),
                    Err(err) => Err(err.to_string()),
                },
                Err(err) => Err(format!("{err:#}")),
            };
            (name, entry)
        })
        .collect::<Vec<Entry>>();

    let stdout = io::stdout();
    ignore_closed_stdout(write_list(&mut stdout.lock(), &builtin, &user))?;
    Ok(())
}

fn write_list(out: &mut impl Write, builtin: &[Entry], user: &[Entry]) -> io::Result<()> {
    writeln!(out, "Built-in workloads:")?;
    for entry in builtin {
        write_entry(out, entry)?;
    }

    writeln!(out)?;
    writeln!(out, "User workloads ({}):", user_workloads_dir().display())?;
    if user.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for entry in user {
        write_entry(out, entry)?;
    }
    out.flush()
}

fn write_entry(out: &mut impl Write, (name, entry): &Entry) -> io::Result<()> {
    match entry {
        Ok((cases, description)) => {
            writeln!(out, "  {name:<16} {cases:>4} cases  {description}")
        }
        Err(err) => writeln!(out, "  {name:<16} invalid: {err}"),
    }
}
