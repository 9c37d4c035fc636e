//! Command rendering: parameter set + fixed configuration -> argument vector.
//!
//! Commands are always built as explicit argument lists. The shell-quoted
//! form produced by [`CommandLine::display`] is for operators to read and
//! copy; it is never handed to a shell.

use std::fmt;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::params::ParameterSet;
use crate::Result;

/// Flag used for per-case and fixed extra inputs.
pub const EXTRA_INPUTS_FLAG: &str = "--extra-inputs";

/// How a parameter name maps onto the command line.
///
/// Exactly one of `flag` or `extra_input` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    pub param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extra_input: bool,
}

impl Binding {
    pub fn flag(param: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            flag: Some(flag.into()),
            extra_input: false,
        }
    }

    pub fn extra_input(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            flag: None,
            extra_input: true,
        }
    }

    /// Bindings for the stock `genai-perf profile` options.
    pub fn defaults() -> Vec<Binding> {
        vec![
            Binding::flag("batch_size", "--batch-size"),
            Binding::flag("batch_size_text", "--batch-size-text"),
            Binding::flag("input_tokens", "--synthetic-input-tokens-mean"),
            Binding::flag("input_tokens_stddev", "--synthetic-input-tokens-stddev"),
            Binding::flag("output_tokens", "--output-tokens-mean"),
            Binding::extra_input("input_type"),
            Binding::flag("num_dataset_entries", "--num-dataset-entries"),
            Binding::flag("measurement_interval", "--measurement-interval"),
            Binding::flag("request_rate", "--request-rate"),
            Binding::flag("concurrency", "--concurrency"),
        ]
    }

    fn validate(&self) -> Result<()> {
        match (&self.flag, self.extra_input) {
            (Some(_), false) | (None, true) => Ok(()),
            _ => Err(Error::InvalidBinding(self.param.clone())),
        }
    }
}

fn default_program() -> String {
    "genai-perf".to_string()
}

fn default_subcommand() -> Vec<String> {
    vec!["profile".to_string()]
}

fn default_url_flag() -> String {
    "--url".to_string()
}

/// Invocation options that stay constant across the whole sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_subcommand")]
    pub subcommand: Vec<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub service_kind: Option<String>,
    #[serde(default)]
    pub endpoint_type: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_url_flag")]
    pub url_flag: String,
    /// `key:value` pairs passed as `--extra-inputs` on every invocation.
    #[serde(default)]
    pub extra_inputs: Vec<String>,
    #[serde(default)]
    pub input_file: Option<String>,
    #[serde(default)]
    pub verbose: bool,
    /// Appended verbatim after every generated argument except `-v`.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Options that must be present in each parameter set or in this config.
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default = "Binding::defaults")]
    pub bindings: Vec<Binding>,
}

impl Default for FixedConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            subcommand: default_subcommand(),
            model: String::new(),
            service_kind: None,
            endpoint_type: None,
            url: String::new(),
            url_flag: default_url_flag(),
            extra_inputs: Vec::new(),
            input_file: None,
            verbose: false,
            extra_args: Vec::new(),
            required: Vec::new(),
            bindings: Binding::defaults(),
        }
    }
}

impl FixedConfig {
    pub fn new(model: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Value of a fixed option by its configuration name.
    fn fixed_option(&self, name: &str) -> Option<&str> {
        let value = match name {
            "program" => Some(self.program.as_str()),
            "model" => Some(self.model.as_str()),
            "url" => Some(self.url.as_str()),
            "service_kind" => self.service_kind.as_deref(),
            "endpoint_type" => self.endpoint_type.as_deref(),
            "input_file" => self.input_file.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }

    fn binding_for(&self, param: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.param == param)
    }
}

/// A fully-formed external command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    fn pair(&mut self, flag: &str, value: impl Into<String>) {
        self.args.push(flag.to_string());
        self.args.push(value.into());
    }

    /// Build a [`Command`] with the rendered program and arguments.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Shell-quoted rendering for display.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Render one parameter set into a command line.
///
/// Argument order: program, subcommand, model, service kind, endpoint type,
/// input file, bound parameters in binding order, fixed extra inputs, URL,
/// extra arguments, `-v`.
pub fn render_command(params: &ParameterSet, fixed: &FixedConfig) -> Result<CommandLine> {
    if fixed.program.is_empty() {
        return Err(Error::missing("program"));
    }
    if fixed.model.is_empty() {
        return Err(Error::missing("model"));
    }
    if fixed.url.is_empty() {
        return Err(Error::missing("url"));
    }
    for name in &fixed.required {
        if !params.contains(name) && fixed.fixed_option(name).is_none() {
            return Err(Error::missing(name.clone()));
        }
    }
    for binding in &fixed.bindings {
        binding.validate()?;
    }
    for (name, _) in params.iter() {
        if fixed.binding_for(name).is_none() {
            return Err(Error::UnboundParameter(name.to_string()));
        }
    }

    let mut cmd = CommandLine::new(fixed.program.clone());
    cmd.args.extend(fixed.subcommand.iter().cloned());
    cmd.pair("-m", fixed.model.clone());
    if let Some(kind) = &fixed.service_kind {
        cmd.pair("--service-kind", kind.clone());
    }
    if let Some(endpoint) = &fixed.endpoint_type {
        cmd.pair("--endpoint-type", endpoint.clone());
    }
    if let Some(input_file) = &fixed.input_file {
        cmd.pair("--input-file", input_file.clone());
    }

    for binding in &fixed.bindings {
        let Some(value) = params.get(&binding.param) else {
            continue;
        };
        match &binding.flag {
            Some(flag) => cmd.pair(flag, value.to_string()),
            None => cmd.pair(EXTRA_INPUTS_FLAG, format!("{}:{}", binding.param, value)),
        }
    }

    for extra in &fixed.extra_inputs {
        if !extra.contains(':') {
            return Err(Error::InvalidExtraInput(extra.clone()));
        }
        cmd.pair(EXTRA_INPUTS_FLAG, extra.clone());
    }

    cmd.pair(&fixed.url_flag, fixed.url.clone());
    cmd.args.extend(fixed.extra_args.iter().cloned());
    if fixed.verbose {
        cmd.arg("-v");
    }
    Ok(cmd)
}
