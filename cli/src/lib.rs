mod cli;
pub mod config;
pub mod workloads;

pub use cli::run;
