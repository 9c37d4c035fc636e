use anyhow::{anyhow, Result};

use perfsweep::{ParamValue, ParameterSet};

use crate::config::{load_workload_from, resolve_workload, Workload, WorkloadSource};

use super::SelectArgs;

/// A workload with CLI overrides applied and its cases expanded.
pub(super) struct Selected {
    pub workload: Workload,
    pub source: WorkloadSource,
    pub sets: Vec<ParameterSet>,
}

pub(super) fn load_selected(args: &SelectArgs) -> Result<Selected> {
    let (mut workload, source) = match (&args.workload, &args.file) {
        (_, Some(path)) => (load_workload_from(path)?, WorkloadSource::File(path.clone())),
        (Some(name), None) => resolve_workload(name)?,
        (None, None) => return Err(anyhow!("Specify a workload with --workload or --file")),
    };

    apply_overrides(&mut workload, args);

    let filter = parse_filters(&args.only)?;
    let all = workload.parameter_sets()?;
    let total = all.len();
    let sets: Vec<ParameterSet> = all.into_iter().filter(|s| s.matches(&filter)).collect();
    if !filter.is_empty() {
        log::info!(target: "config", "--only kept {} of {} cases", sets.len(), total);
    }

    Ok(Selected {
        workload,
        source,
        sets,
    })
}

fn apply_overrides(workload: &mut Workload, args: &SelectArgs) {
    if let Some(model) = &args.model {
        workload.profiler.model = model.clone();
    }
    if let Some(url) = &args.url {
        workload.profiler.url = url.clone();
    }
    if let Some(tool) = &args.tool {
        workload.profiler.program = tool.clone();
    }
}

/// Parse repeated `--only PARAM=VALUE` flags.
pub(super) fn parse_filters(raw: &[String]) -> Result<Vec<(String, ParamValue)>> {
    raw.iter()
        .map(|item| {
            let (name, value) = item
                .split_once('=')
                .ok_or_else(|| anyhow!("--only expects PARAM=VALUE, got '{item}'"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(anyhow!("--only expects PARAM=VALUE, got '{item}'"));
            }
            Ok((name.to_string(), ParamValue::parse_loose(value.trim())))
        })
        .collect()
}
