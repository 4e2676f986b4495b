//! cmd.exe writer
//!
//! Scripts run with delayed expansion so `!errorlevel!` reflects the last
//! command inside parenthesized blocks. Sections are not rendered.

use girder_core::domain::shell::ShellKind;
use girder_core::{Result, ValueSegment, Variable};

use super::{ShellWriter, WriterOptions, WriterState, ansi, is_windows_absolute, join_with};
use crate::quote::{Quoter, cmd as batch};

const CERTIFICATE_END: &str = "-----END CERTIFICATE-----\n";

/// Writer for Windows batch files
#[derive(Debug)]
pub struct CmdWriter {
    state: WriterState,
    disable_delayed_error_level_expansion: bool,
}

impl CmdWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self {
            state: WriterState::new(Quoter::Cmd, options.tmp_dir, "\r\n"),
            disable_delayed_error_level_expansion: options
                .features
                .cmd_disable_delayed_error_level_expansion,
        }
    }

    fn error_level(&self, check: &str) -> String {
        if self.disable_delayed_error_level_expansion {
            check.replace('!', "%")
        } else {
            check.to_string()
        }
    }

    fn check_error_level(&mut self) {
        let check = self.error_level("IF !errorlevel! NEQ 0 exit /b !errorlevel!");
        self.state.line(&check);
        self.state.line("");
    }

    fn quote_path(&mut self, path: &str) -> String {
        let path = join_with('\\', &[path]);
        self.state.quote_expand(&path)
    }

    fn build_command(&mut self, exe: &str, args: &[&str], expand: bool) -> String {
        let mut words = vec![self.state.quote_expand(exe)];
        for arg in args {
            let word = if expand {
                self.state.quote_expand(arg)
            } else {
                self.state.quote(arg)
            };
            words.push(word);
        }
        words.join(" ")
    }

    fn echo(&mut self, colored: &str) {
        self.state.guard(colored);
        self.state.line(&format!("echo {}", batch::escape_variable(colored)));
    }
}

/// Splits a PEM bundle after each certificate, dropping blank pieces
fn split_certificates(value: &str) -> Vec<&str> {
    value
        .split_inclusive(CERTIFICATE_END)
        .filter(|piece| !piece.trim_matches([' ', '\n']).is_empty())
        .collect()
}

impl ShellWriter for CmdWriter {
    fn shell(&self) -> ShellKind {
        ShellKind::Cmd
    }

    fn tmp_dir(&self) -> &str {
        self.state.tmp_dir()
    }

    fn line(&mut self, text: &str) {
        self.state.line(text);
    }

    fn check_for_errors(&mut self) {
        self.check_error_level();
    }

    fn variable(&mut self, variable: &Variable) {
        let key = self.state.quote_variable(&variable.key);

        if variable.file {
            let tmp_dir = self.state.tmp_dir().to_string();
            let tmp_dir = self.quote_path(&tmp_dir);
            let file = self.tmp_file(&variable.key);
            let file = self.quote_path(&file);

            self.state.line(&format!("md {} 2>NUL 1>NUL", tmp_dir));
            self.state.line(&format!("echo. 2> {}", file));
            for certificate in split_certificates(&variable.value) {
                let value = self.state.quote_variable(certificate);
                self.state.line(&format!("echo {} >> {}", value, file));
            }
            self.state.line(&format!("SET {}={}", key, file));
        } else {
            let value = self.state.quote_variable(&variable.value);
            self.state.line(&format!("SET {}={}", key, value));
        }
    }

    fn variable_with_paths(&mut self, key: &str, segments: &[ValueSegment]) {
        let key = self.state.quote_variable(key);
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
        self.state.line(&format!("SET {}={}", key, value));
    }

    fn command(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, false);
        self.state.line(&line);
        self.check_error_level();
    }

    fn command_arg_expand(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, true);
        self.state.line(&line);
        self.check_error_level();
    }

    fn if_directory(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("IF EXIST {} (", path));
        self.state.indent();
    }

    fn if_file(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("IF EXIST {} (", path));
        self.state.indent();
    }

    fn if_cmd(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, true);
        self.state.line(&format!("{} 2>NUL 1>NUL", line));
        let check = self.error_level("IF !errorlevel! EQU 0 (");
        self.state.line(&check);
        self.state.indent();
    }

    fn if_cmd_with_output(&mut self, exe: &str, args: &[&str]) {
        let line = self.build_command(exe, args, true);
        self.state.line(&line);
        let check = self.error_level("IF !errorlevel! EQU 0 (");
        self.state.line(&check);
        self.state.indent();
    }

    fn else_branch(&mut self) {
        self.state.unindent();
        self.state.line(") ELSE (");
        self.state.indent();
    }

    fn end_if(&mut self) {
        self.state.unindent();
        self.state.line(")");
    }

    fn cd(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("cd /D {}", path));
        self.check_error_level();
    }

    fn mk_dir(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!(
            "dir {} 2>NUL 1>NUL || md {} 2>NUL 1>NUL",
            path, path
        ));
    }

    fn mk_tmp_dir(&mut self, name: &str) -> String {
        let path = join_with('\\', &[self.state.tmp_dir(), name]);
        self.mk_dir(&path);
        path
    }

    fn rm_dir(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("rd /s /q {} 2>NUL 1>NUL", path));
    }

    fn rm_file(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("del /f /q {} 2>NUL 1>NUL", path));
    }

    fn rm_files_recursive(&mut self, path: &str, pattern: &str) {
        let target = join_with('\\', &[path, pattern]);
        let target = self.quote_path(&target);
        self.state.line(&format!("del /s /f /q {} 2>NUL 1>NUL", target));
    }

    fn tmp_file(&mut self, name: &str) -> String {
        let path = join_with('\\', &[self.state.tmp_dir(), name]);
        self.absolute(&path)
    }

    fn absolute(&mut self, path: &str) -> String {
        if is_windows_absolute(path) {
            return join_with('\\', &[path]);
        }
        join_with('\\', &["%CD%", path])
    }

    fn join(&self, elements: &[&str]) -> String {
        join_with('\\', elements)
    }

    fn env_variable_key(&self, name: &str) -> String {
        format!("%{}%", name)
    }

    fn printf(&mut self, text: &str) {
        self.echo(&format!("{}{}", ansi::plain(text), ansi::RESET));
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
        self.state.line("echo.");
    }

    fn section_start(&mut self, _id: &str, _header: &str) {}

    fn section_end(&mut self, _id: &str) {}

    fn host_banner(&mut self, hostname: Option<&str>) {
        match hostname {
            Some(hostname) if !hostname.is_empty() => {
                self.state.guard(hostname);
                self.state.line(&format!(
                    "echo Running on %COMPUTERNAME% via {}...",
                    batch::escape(hostname)
                ));
            }
            _ => self.state.line("echo Running on %COMPUTERNAME%..."),
        }
        self.warning("DEPRECATION: CMD shell is deprecated and will no longer be supported");
    }

    fn finish(&mut self, trace: bool) -> Result<String> {
        let body = self.state.take_body()?;

        let mut script = String::new();
        script.push_str(if trace { "@echo on\r\n" } else { "@echo off\r\n" });
        script.push_str("setlocal enableextensions\r\n");
        script.push_str("setlocal enableDelayedExpansion\r\n");
        script.push_str("set nl=^\r\n\r\n\r\n");
        script.push_str(&body);
        Ok(script)
    }
}
