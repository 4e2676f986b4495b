//! sh/bash writer
//!
//! The body is collected line by line, then handed to `eval` as a single
//! quoted word so a partially transferred script never runs.

use girder_core::domain::shell::ShellKind;
use girder_core::{Result, ValueSegment, Variable};

use super::{ShellWriter, WriterOptions, WriterState, ansi, join_with};
use crate::quote::Quoter;
use crate::trap;

const EXIT_CODE_CHECK: &str =
    "_runner_exit_code=$?; if [ $_runner_exit_code -ne 0 ]; then exit $_runner_exit_code; fi";

/// Writer for `sh` and `bash`
#[derive(Debug)]
pub struct BashWriter {
    state: WriterState,
    shell: ShellKind,
    check_for_errors: bool,
    use_new_eval: bool,
    trap_exit: bool,
}

impl BashWriter {
    pub fn new(options: WriterOptions) -> Self {
        let quoter = Quoter::for_shell(options.shell, &options.features);
        Self {
            state: WriterState::new(quoter, options.tmp_dir, "\n"),
            shell: options.shell,
            check_for_errors: options.features.enable_bash_exit_code_check,
            use_new_eval: options.features.use_new_eval_strategy,
            trap_exit: options.trap_exit,
        }
    }

    fn quote(&mut self, input: &str) -> String {
        self.state.quote(input)
    }

    // Paths from `absolute` start with `$PWD`, which has to stay expandable
    fn quote_path(&mut self, path: &str) -> String {
        if path == "$PWD" {
            return "\"$PWD\"".to_string();
        }
        match path.strip_prefix("$PWD/") {
            Some(rest) => format!("\"$PWD\"/{}", self.quote(rest)),
            None => self.quote(path),
        }
    }

    fn build_command(&mut self, exe: &str, args: &[&str], expand: bool) -> String {
        let mut words = vec![self.quote(exe)];
        for arg in args {
            let word = if expand {
                self.state.quote_expand(arg)
            } else {
                self.quote(arg)
            };
            words.push(word);
        }
        words.join(" ")
    }

    fn echo(&mut self, colored: &str) {
        let word = self.quote(colored);
        self.state.line(&format!("echo {}", word));
    }

    fn section_id(id: &str) -> String {
        id.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl ShellWriter for BashWriter {
    fn shell(&self) -> ShellKind {
        self.shell
    }

    fn tmp_dir(&self) -> &str {
        self.state.tmp_dir()
    }

    fn line(&mut self, text: &str) {
        self.state.line(text);
    }

    fn check_for_errors(&mut self) {
        if self.check_for_errors {
            self.state.line(EXIT_CODE_CHECK);
        }
    }

    fn variable(&mut self, variable: &Variable) {
        let key = self.quote(&variable.key);

        if variable.file {
            let tmp_dir = self.state.tmp_dir().to_string();
            let tmp_dir = self.quote_path(&tmp_dir);
            let file = self.tmp_file(&variable.key);
            let file = self.quote_path(&file);
            let value = self.state.quote_variable(&variable.value);

            self.state.line(&format!("mkdir -p {}", tmp_dir));
            self.state.line(&format!("printf '%s' {} > {}", value, file));
            self.state.line(&format!("chmod 0700 {}", file));
            self.state.line(&format!("export {}={}", key, file));
        } else {
            let value = self.state.quote_variable(&variable.value);
            self.state.line(&format!("export {}={}", key, value));
        }
    }

    fn variable_with_paths(&mut self, key: &str, segments: &[ValueSegment]) {
        let key = self.quote(key);
        let mut value = String::new();
        for segment in segments {
            match segment {
                ValueSegment::Text(text) => value.push_str(&self.state.quote_variable(text)),
                ValueSegment::FilePath(name) => {
                    let file = self.tmp_file(name);
                    value.push_str(&self.quote_path(&file));
                }
            }
        }
        self.state.line(&format!("export {}={}", key, value));
    }

    fn command(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, false);
        self.state.line(&line);
        self.check_for_errors();
    }

    fn command_arg_expand(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, true);
        self.state.line(&line);
        self.check_for_errors();
    }

    fn if_directory(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("if [ -d {} ]; then", path));
        self.state.indent();
    }

    fn if_file(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("if [ -e {} ]; then", path));
        self.state.indent();
    }

    fn if_cmd(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, false);
        self.state.line(&format!("if {} >/dev/null 2>&1; then", line));
        self.state.indent();
    }

    fn if_cmd_with_output(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, false);
        self.state.line(&format!("if {}; then", line));
        self.state.indent();
    }

    fn else_branch(&mut self) {
        self.state.unindent();
        self.state.line("else");
        self.state.indent();
    }

    fn end_if(&mut self) {
        self.state.unindent();
        self.state.line("fi");
    }

    fn cd(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("cd {}", path));
        self.check_for_errors();
    }

    fn mk_dir(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("mkdir -p {}", path));
    }

    fn mk_tmp_dir(&mut self, name: &str) -> String {
        let path = join_with('/', &[self.state.tmp_dir(), name]);
        self.mk_dir(&path);
        path
    }

    fn rm_dir(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("rm -r -f {}", path));
    }

    fn rm_file(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("rm -f {}", path));
    }

    fn rm_files_recursive(&mut self, path: &str, pattern: &str) {
        let path = self.quote_path(path);
        let pattern = self.quote(pattern);
        self.state.line(&format!("if [ -d {} ]; then", path));
        self.state.indent();
        self.state
            .line(&format!("find {} -name {} -type f -exec rm -f {{}} +", path, pattern));
        self.state.unindent();
        self.state.line("fi");
    }

    fn tmp_file(&mut self, name: &str) -> String {
        let path = join_with('/', &[self.state.tmp_dir(), name]);
        self.absolute(&path)
    }

    fn absolute(&mut self, path: &str) -> String {
        if path.starts_with('/') {
            return path.to_string();
        }
        join_with('/', &["$PWD", path])
    }

    fn join(&self, elements: &[&str]) -> String {
        join_with('/', elements)
    }

    fn env_variable_key(&self, name: &str) -> String {
        format!("${}", name)
    }

    fn printf(&mut self, text: &str) {
        self.echo(&ansi::plain(text));
    }

    fn notice(&mut self, text: &str) {
        self.echo(&ansi::notice(text));
    }

    fn warning(&mut self, text: &str) {
        self.echo(&ansi::warning(text));
    }

    fn error(&mut self, text: &str) {
        self.echo(&ansi::error(text));
    }

    fn empty_line(&mut self) {
        self.state.line("echo");
    }

    fn section_start(&mut self, id: &str, header: &str) {
        let id = Self::section_id(id);
        let header = self.quote(&ansi::notice(header));
        self.state.line(&format!(
            "printf 'section_start:%s:%s\\r\\033[0K%s\\n' \"$(date +%s)\" {} {}",
            id, header
        ));
    }

    fn section_end(&mut self, id: &str) {
        let id = Self::section_id(id);
        self.state.line(&format!(
            "printf 'section_end:%s:%s\\r\\033[0K\\n' \"$(date +%s)\" {}",
            id
        ));
    }

    fn host_banner(&mut self, hostname: Option<&str>) {
        let text = match hostname {
            Some(hostname) if !hostname.is_empty() => {
                format!("Running on $(hostname) via {}...", hostname)
            }
            _ => "Running on $(hostname)...".to_string(),
        };
        let word = self.quote(&text);
        self.state.line(&format!("echo {}", word));
    }

    fn finish(&mut self, trace: bool) -> Result<String> {
        let body = self.state.take_body()?;
        let body = self.state.quote(&body);
        let eol = self.state.eol();

        let mut script = String::new();
        script.push_str(&format!("#!/usr/bin/env {}{}{}", self.shell.as_str(), eol, eol));

        if trace {
            script.push_str("set -o xtrace");
            script.push_str(eol);
        }

        script.push_str("if set -o | grep pipefail > /dev/null; then set -o pipefail; fi; set -o errexit");
        script.push_str(eol);
        script.push_str("set +o noclobber");
        script.push_str(eol);

        if self.trap_exit {
            script.push_str(&trap::bash_trap_prelude());
            script.push_str(eol);
        }

        if self.use_new_eval {
            script.push_str(&format!(": | (eval {}){}", body, eol));
        } else {
            script.push_str(&format!(": | eval {}{}", body, eol));
        }

        script.push_str("exit 0");
        script.push_str(eol);
        Ok(script)
    }
}
