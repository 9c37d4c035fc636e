mod list;
mod plan;
mod run;
mod select;

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

use perfsweep::logging::{self, LogFormat};

/// Log output format (CLI argument)
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(super) enum CliLogFormat {
    /// Human-readable colored output
    Human,
    /// One JSON object per line
    Json,
}

#[derive(Parser)]
#[command(
    name = "perfsweep",
    about = "Run an inference profiler across a matrix of benchmark parameters",
    version
)]
pub(super) struct Cli {
    /// Increase verbosity (-v=info, -vv=debug, -vvv=trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format (default: human for TTY, json for pipes)
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<CliLogFormat>,

    /// Filter log output by scope (glob pattern, e.g. "sweep*", "!sweep::exec")
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(super) enum Commands {
    /// Run every case of a workload through the profiler
    Run(RunArgs),
    /// Print the commands a run would execute, without executing them
    Plan(PlanArgs),
    /// List built-in and user workloads
    List,
}

/// Which workload to load and how to override it.
#[derive(Args, Clone, Debug)]
pub(super) struct SelectArgs {
    /// Built-in or user workload name (see `perfsweep list`)
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    pub workload: Option<String>,

    /// Path to a workload TOML file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Override the model identifier
    #[arg(short, long, env = "PERFSWEEP_MODEL")]
    pub model: Option<String>,

    /// Override the target service URL
    #[arg(short, long, env = "PERFSWEEP_URL")]
    pub url: Option<String>,

    /// Override the profiler executable
    #[arg(long, env = "PERFSWEEP_TOOL")]
    pub tool: Option<String>,

    /// Keep only cases where PARAM equals VALUE (repeatable)
    #[arg(long = "only", value_name = "PARAM=VALUE")]
    pub only: Vec<String>,
}

#[derive(Args, Debug)]
pub(super) struct RunArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Capture profiler output and print it after each case
    #[arg(long, conflicts_with = "no_capture")]
    pub capture: bool,

    /// Stream profiler output straight to the terminal
    #[arg(long)]
    pub no_capture: bool,

    /// Kill an invocation after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Append each case result to this JSON-lines file
    #[arg(long, value_name = "PATH")]
    pub results: Option<PathBuf>,

    /// Skip cases that already succeeded according to the results file
    #[arg(long)]
    pub resume: bool,

    /// Exit with status 1 if any case failed
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub(super) struct PlanArgs {
    #[command(flatten)]
    pub select: SelectArgs,
}

/// Configure the logger based on verbosity flags
fn configure_logging(verbose: u8, log_format: Option<CliLogFormat>, log_filter: Option<&str>) {
    let level = logging::level_for_verbosity(verbose);

    let format = match log_format {
        Some(CliLogFormat::Json) => LogFormat::Json,
        Some(CliLogFormat::Human) => LogFormat::Human,
        None if io::stderr().is_terminal() => LogFormat::Human,
        None => LogFormat::Json,
    };

    logging::init(level, format, log_filter);
}

fn run_inner() -> Result<()> {
    let parsed = Cli::parse();

    // Configure logging before any operations
    configure_logging(
        parsed.verbose,
        parsed.log_format,
        parsed.log_filter.as_deref(),
    );

    match parsed.command {
        None => {
            print_usage();
            Ok(())
        }
        Some(Commands::Run(args)) => run::cmd_run(args),
        Some(Commands::Plan(args)) => plan::cmd_plan(args),
        Some(Commands::List) => list::cmd_list(),
    }
}

pub fn run() -> i32 {
    if let Err(err) = run_inner() {
        eprintln!("Error: {err:#}");
        1
    } else {
        0
    }
}

/// `Ok(None)` when stdout was closed under us (`perfsweep plan | head -1`).
pub(super) fn ignore_closed_stdout<T>(result: io::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            log::debug!(target: "config", "stdout closed: {err}");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn print_usage() {
    let mut cmd = Cli::command();
    let _ = cmd.print_help();
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let cmd = Cli::command();
        let matches = cmd.try_get_matches_from(args)?;
        Cli::from_arg_matches(&matches)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_builtin_workload() {
        let cli = parse(&[
            "perfsweep",
            "run",
            "-w",
            "embedder",
            "--timeout",
            "600",
            "--results",
            "runs/embed.jsonl",
            "--resume",
            "--only",
            "input_type=query",
        ])
        .expect("parse should succeed");

        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.select.workload.as_deref(), Some("embedder"));
                assert_eq!(args.timeout, Some(600.0));
                assert_eq!(args.results, Some(PathBuf::from("runs/embed.jsonl")));
                assert!(args.resume);
                assert_eq!(args.select.only, vec!["input_type=query"]);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn parse_plan_with_file_and_overrides() {
        let cli = parse(&[
            "perfsweep",
            "-vv",
            "plan",
            "--file",
            "sweep.toml",
            "--url",
            "http://localhost:9000",
            "--tool",
            "/opt/bin/genai-perf",
        ])
        .expect("parse should succeed");

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Plan(args)) => {
                assert_eq!(args.select.file, Some(PathBuf::from("sweep.toml")));
                assert_eq!(args.select.url.as_deref(), Some("http://localhost:9000"));
                assert_eq!(args.select.tool.as_deref(), Some("/opt/bin/genai-perf"));
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn reject_workload_and_file_together() {
        assert!(parse(&["perfsweep", "run", "-w", "embedder", "-f", "x.toml"]).is_err());
    }

    #[test]
    fn reject_run_without_selection() {
        assert!(parse(&["perfsweep", "run"]).is_err());
    }

    #[test]
    fn reject_capture_and_no_capture() {
        let args = ["perfsweep", "run", "-w", "embedder", "--capture", "--no-capture"];
        assert!(parse(&args).is_err());
    }

    #[test]
    fn parse_list_with_global_flags() {
        let cli = parse(&["perfsweep", "list", "--log-format", "json"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::List)));
        assert!(matches!(cli.log_format, Some(CliLogFormat::Json)));
    }
}
