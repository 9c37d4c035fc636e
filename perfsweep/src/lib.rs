//! Parameter-sweep runner for external inference profilers.
//!
//! A sweep is an ordered list of [`ParameterSet`]s. Each set is rendered into
//! an explicit argument vector by combining it with a [`FixedConfig`], run as
//! a child process, and reported on before moving to the next set. Failures
//! are recorded and never stop the sweep.
//!
//! # Example
//!
//! ```no_run
//! use perfsweep::{ExecOptions, FixedConfig, ParameterSet};
//!
//! let fixed = FixedConfig::new("nvidia/nv-embedqa-e5-v5", "http://localhost:8000");
//! let sets = vec![
//!     ParameterSet::new()
//!         .with("input_type", "query")
//!         .with("input_tokens", 20)
//!         .with("batch_size", 1)
//!         .with("concurrency", 5),
//! ];
//! let report = perfsweep::run_sweep(&sets, &fixed, ExecOptions::default());
//! println!("{}", report.summary_line());
//! ```

pub mod error;
pub mod exec;
pub mod logging;
pub mod matrix;
pub mod params;
pub mod render;
pub mod report;
pub mod sweep;

pub use error::Error;
pub use exec::{execute, ExecOptions, Executor, Outcome, ProcessExecutor};
pub use logging::LogFormat;
pub use matrix::{Axis, Grid, SweepMatrix};
pub use params::{ParamValue, ParameterSet};
pub use render::{render_command, Binding, CommandLine, FixedConfig};
pub use report::{CaseResult, CaseStatus, ResultsLog, SweepReport};
pub use sweep::{run_sweep, SweepRunner};

pub type Result<T> = std::result::Result<T, Error>;
