//! Shell writers
//!
//! A writer turns a small instruction set (variables, commands, control
//! flow, filesystem operations and log lines) into text for one dialect.
//! Writers are single use: build one per stage script, emit, then call
//! `finish`.

pub mod ansi;
pub mod bash;
pub mod cmd;
pub mod powershell;

pub use bash::BashWriter;
pub use cmd::CmdWriter;
pub use powershell::PowerShellWriter;

use girder_core::domain::shell::{HostOs, ShellKind};
use girder_core::{FeatureSet, GeneratorError, Result, ValueSegment, Variable};

use crate::quote::Quoter;

/// Dialect-neutral emission contract
pub trait ShellWriter {
    /// Dialect this writer emits
    fn shell(&self) -> ShellKind;

    /// Scratch directory owned by the script
    fn tmp_dir(&self) -> &str;

    /// Appends one raw line at the current indent
    fn line(&mut self, text: &str);

    /// Exits with the last command's status when it failed
    fn check_for_errors(&mut self);

    /// Sets and exports a variable; file variables export the path of a
    /// file under `tmp_dir` holding the value
    fn variable(&mut self, variable: &Variable);

    /// Sets and exports `key` as text joined with the backing paths of
    /// file variables, each rendered as [`tmp_file`](Self::tmp_file) does
    fn variable_with_paths(&mut self, key: &str, segments: &[ValueSegment]);

    /// Runs a command with literal arguments, then checks its status
    fn command(&mut self, exe: &str, args: &[&str]);

    /// Like `command`, but variable references in arguments expand
    fn command_arg_expand(&mut self, exe: &str, args: &[&str]);

    fn if_directory(&mut self, path: &str);
    fn if_file(&mut self, path: &str);

    /// Opens a block taken when the command succeeds, output discarded
    fn if_cmd(&mut self, exe: &str, args: &[&str]);

    /// Opens a block taken when the command succeeds, output kept
    fn if_cmd_with_output(&mut self, exe: &str, args: &[&str]);

    fn else_branch(&mut self);
    fn end_if(&mut self);

    fn cd(&mut self, path: &str);
    fn mk_dir(&mut self, path: &str);

    /// Creates `tmp_dir/<name>` and returns its path
    fn mk_tmp_dir(&mut self, name: &str) -> String;

    fn rm_dir(&mut self, path: &str);
    fn rm_file(&mut self, path: &str);
    fn rm_files_recursive(&mut self, path: &str, pattern: &str);

    /// Absolute path of `tmp_dir/<name>`, not created
    fn tmp_file(&mut self, name: &str) -> String;

    fn absolute(&mut self, path: &str) -> String;
    fn join(&self, elements: &[&str]) -> String;

    /// Interpolation token for an environment variable
    fn env_variable_key(&self, name: &str) -> String;

    fn printf(&mut self, text: &str);
    fn notice(&mut self, text: &str);
    fn warning(&mut self, text: &str);
    fn error(&mut self, text: &str);
    fn empty_line(&mut self);

    /// Opens a collapsible log section
    fn section_start(&mut self, id: &str, header: &str);
    fn section_end(&mut self, id: &str);

    /// "Running on ..." banner of the prepare stage
    fn host_banner(&mut self, hostname: Option<&str>);

    /// Materializes the full script
    fn finish(&mut self, trace: bool) -> Result<String>;
}

/// Settings captured when a writer is built
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub shell: ShellKind,
    pub tmp_dir: String,
    pub features: FeatureSet,
    pub host_os: HostOs,
    /// Report the exit status through the trap line (bash only)
    pub trap_exit: bool,
}

impl WriterOptions {
    pub fn new(shell: ShellKind, tmp_dir: impl Into<String>) -> Self {
        Self {
            shell,
            tmp_dir: tmp_dir.into(),
            features: FeatureSet::default(),
            host_os: HostOs::default(),
            trap_exit: false,
        }
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    pub fn with_host_os(mut self, host_os: HostOs) -> Self {
        self.host_os = host_os;
        self
    }

    pub fn with_trap_exit(mut self, trap_exit: bool) -> Self {
        self.trap_exit = trap_exit;
        self
    }
}

/// Builds the writer for `options.shell`
pub fn new_writer(options: WriterOptions) -> Box<dyn ShellWriter> {
    match options.shell {
        ShellKind::Sh | ShellKind::Bash => Box::new(BashWriter::new(options)),
        ShellKind::Cmd => Box::new(CmdWriter::new(options)),
        ShellKind::Powershell | ShellKind::Pwsh => Box::new(PowerShellWriter::new(options)),
    }
}

/// Buffer and control-flow state shared by every writer
#[derive(Debug)]
pub(crate) struct WriterState {
    buffer: String,
    indent: i64,
    eol: &'static str,
    quoter: Quoter,
    tmp_dir: String,
    failure: Option<GeneratorError>,
}

impl WriterState {
    pub(crate) fn new(quoter: Quoter, tmp_dir: String, eol: &'static str) -> Self {
        Self {
            buffer: String::new(),
            indent: 0,
            eol,
            quoter,
            tmp_dir,
            failure: None,
        }
    }

    pub(crate) fn eol(&self) -> &'static str {
        self.eol
    }

    pub(crate) fn tmp_dir(&self) -> &str {
        &self.tmp_dir
    }

    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent.max(0) {
            self.buffer.push_str("  ");
        }
        self.buffer.push_str(text);
        self.buffer.push_str(self.eol);
    }

    pub(crate) fn indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn unindent(&mut self) {
        self.indent -= 1;
        if self.indent < 0 {
            self.fail(GeneratorError::UnbalancedControlFlow(self.indent));
        }
    }

    pub(crate) fn fail(&mut self, error: GeneratorError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }

    pub(crate) fn guard(&mut self, input: &str) {
        if let Err(error) = self.quoter.check(input) {
            self.fail(error);
        }
    }

    pub(crate) fn quote(&mut self, input: &str) -> String {
        self.guard(input);
        self.quoter.quote(input)
    }

    pub(crate) fn quote_variable(&mut self, input: &str) -> String {
        self.guard(input);
        self.quoter.quote_variable(input)
    }

    pub(crate) fn quote_expand(&mut self, input: &str) -> String {
        self.guard(input);
        self.quoter.quote_expand(input)
    }

    /// Validates text that is emitted without quoting
    pub(crate) fn raw(&mut self, input: &str) -> String {
        self.guard(input);
        input.to_string()
    }

    /// Hands out the body once every block is closed and nothing failed
    pub(crate) fn take_body(&mut self) -> Result<String> {
        if let Some(error) = self.failure.take() {
            return Err(error);
        }
        if self.indent != 0 {
            return Err(GeneratorError::UnbalancedControlFlow(self.indent));
        }
        Ok(std::mem::take(&mut self.buffer))
    }
}

/// Joins path elements with `separator`; Windows separators also replace `/`
pub(crate) fn join_with(separator: char, elements: &[&str]) -> String {
    let mut out = String::new();
    for element in elements.iter().filter(|element| !element.is_empty()) {
        let element: String = element
            .chars()
            .map(|c| if separator == '\\' && c == '/' { separator } else { c })
            .collect();
        if out.is_empty() {
            out = element;
            continue;
        }
        if !out.ends_with(separator) {
            out.push(separator);
        }
        out.push_str(element.trim_start_matches(separator));
    }
    out
}

/// `C:\x`, `C:/x`, `\x` and `/x` are absolute for Windows dialects
pub(crate) fn is_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/');
    drive || path.starts_with('\\') || path.starts_with('/')
}
