//! PowerShell writer for Windows PowerShell (`powershell`) and PowerShell
//! Core (`pwsh`)

use girder_core::domain::shell::{HostOs, ShellKind};
use girder_core::{Result, ValueSegment, Variable};

use super::{ShellWriter, WriterOptions, WriterState, ansi, is_windows_absolute, join_with};
use crate::quote::Quoter;

const ERROR_CHECK: &str = "if(!$?) { Exit &{if($LASTEXITCODE) {$LASTEXITCODE} else {1}} }";
const BOM: &str = "\u{feff}";

/// Writer for both PowerShell editions
#[derive(Debug)]
pub struct PowerShellWriter {
    state: WriterState,
    shell: ShellKind,
    separator: char,
    resolve_paths: bool,
}

impl PowerShellWriter {
    pub fn new(options: WriterOptions) -> Self {
        // pwsh follows the host's separator, Windows PowerShell is always CRLF and backslash
        let windows = options.shell == ShellKind::Powershell || options.host_os == HostOs::Windows;
        let eol = if windows { "\r\n" } else { "\n" };
        Self {
            state: WriterState::new(Quoter::PowerShell, options.tmp_dir, eol),
            shell: options.shell,
            separator: if windows { '\\' } else { '/' },
            resolve_paths: options.features.use_powershell_path_resolver,
        }
    }

    fn check_error_level(&mut self) {
        self.state.line(ERROR_CHECK);
        self.state.line("");
    }

    fn from_slash(&self, path: &str) -> String {
        join_with(self.separator, &[path])
    }

    // Path expression; `$CurrentDirectory` prefixes from `absolute` still expand
    fn quote_path(&mut self, path: &str) -> String {
        if self.resolve_paths {
            let quoted = self.state.quote_expand(path);
            return format!(
                "$ExecutionContext.SessionState.Path.GetUnresolvedProviderPathFromPSPath({})",
                quoted
            );
        }
        let path = self.from_slash(path);
        self.state.quote_expand(&path)
    }

    fn build_command(&mut self, exe: &str, args: &[&str], expand: bool) -> String {
        let mut words = vec![self.state.quote(exe)];
        for arg in args {
            let word = if expand {
                self.state.quote_expand(arg)
            } else {
                self.state.quote(arg)
            };
            words.push(word);
        }
        format!("& {}", words.join(" "))
    }

    fn if_in_try_catch(&mut self, command: &str) {
        self.state.line("Set-Variable -Name cmdErr -Value $false");
        self.state.line("Try {");
        self.state.indent();
        self.state.line(command);
        self.state
            .line("if(!$?) { throw &{if($LASTEXITCODE) {$LASTEXITCODE} else {1}} }");
        self.state.unindent();
        self.state.line("} Catch {");
        self.state.indent();
        self.state.line("Set-Variable -Name cmdErr -Value $true");
        self.state.unindent();
        self.state.line("}");
        self.state.line("if(!$cmdErr) {");
        self.state.indent();
    }

    fn remove_item(&mut self, path: &str, path_type: &str, recurse: bool) {
        let path = self.quote_path(path);
        let flags = if recurse { "-Force -Recurse" } else { "-Force" };
        self.state.line(&format!(
            "if( (Get-Command -Name Remove-Item2 -Module NTFSSecurity -ErrorAction SilentlyContinue) -and (Test-Path {} -PathType {}) ) {{",
            path, path_type
        ));
        self.state.indent();
        self.state.line(&format!("Remove-Item2 {} {}", flags, path));
        self.state.unindent();
        self.state.line(&format!("}} elseif(Test-Path {}) {{", path));
        self.state.indent();
        self.state.line(&format!("Remove-Item {} {}", flags, path));
        self.state.unindent();
        self.state.line("}");
        self.state.line("");
    }

    fn echo(&mut self, colored: &str) {
        let word = self.state.quote_variable(colored);
        self.state.line(&format!("echo {}", word));
    }
}

impl ShellWriter for PowerShellWriter {
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
        self.check_error_level();
    }

    fn variable(&mut self, variable: &Variable) {
        let key = self.state.raw(&variable.key);

        if variable.file {
            let tmp_dir = self.state.tmp_dir().to_string();
            let tmp_dir = self.quote_path(&tmp_dir);
            let file = self.tmp_file(&variable.key);
            let file = self.quote_path(&file);
            let value = self.state.quote_variable(&variable.value);

            self.state.line(&format!(
                "New-Item -ItemType directory -Force -Path {} | out-null",
                tmp_dir
            ));
            self.state
                .line(&format!("[System.IO.File]::WriteAllText({}, {})", file, value));
            self.state.line(&format!("${}={}", key, file));
        } else {
            let value = self.state.quote_variable(&variable.value);
            self.state.line(&format!("${}={}", key, value));
        }

        self.state.line(&format!("$env:{}=${}", key, key));
    }

    fn variable_with_paths(&mut self, key: &str, segments: &[ValueSegment]) {
        let key = self.state.raw(key);
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                ValueSegment::Text(text) => parts.push(self.state.quote_variable(text)),
                ValueSegment::FilePath(name) => {
                    let file = self.tmp_file(name);
                    parts.push(self.quote_path(&file));
                }
            }
        }
        self.state.line(&format!("${}={}", key, parts.join(" + ")));
        self.state.line(&format!("$env:{}=${}", key, key));
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
        self.state.line(&format!("if(Test-Path {} -PathType Container) {{", path));
        self.state.indent();
    }

    fn if_file(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("if(Test-Path {} -PathType Leaf) {{", path));
        self.state.indent();
    }

    fn if_cmd(&mut self, exe: &str, args: &[&str]) {
        let command = format!("{} 2>$null", self.build_command(exe, args, false));
        self.if_in_try_catch(&command);
    }

    fn if_cmd_with_output(&mut self, exe: &str, args: &[&str]) {
        let command = self.build_command(exe, args, false);
        self.if_in_try_catch(&command);
    }

    fn else_branch(&mut self) {
        self.state.unindent();
        self.state.line("} else {");
        self.state.indent();
    }

    fn end_if(&mut self) {
        self.state.unindent();
        self.state.line("}");
    }

    fn cd(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!("cd {}", path));
        self.check_error_level();
    }

    fn mk_dir(&mut self, path: &str) {
        let path = self.quote_path(path);
        self.state.line(&format!(
            "New-Item -ItemType directory -Force -Path {} | out-null",
            path
        ));
    }

    fn mk_tmp_dir(&mut self, name: &str) -> String {
        let path = join_with(self.separator, &[self.state.tmp_dir(), name]);
        self.mk_dir(&path);
        path
    }

    fn rm_dir(&mut self, path: &str) {
        self.remove_item(path, "Container", true);
    }

    fn rm_file(&mut self, path: &str) {
        self.remove_item(path, "Leaf", false);
    }

    fn rm_files_recursive(&mut self, path: &str, pattern: &str) {
        let path = self.quote_path(path);
        let pattern = self.state.quote(pattern);
        self.state.line(&format!("if(Test-Path {} -PathType Container) {{", path));
        self.state.indent();
        self.state.line(&format!(
            "Get-ChildItem -Path {} -Filter {} -Recurse | ?{{ -not $_.PSIsContainer }} | ForEach-Object {{ Remove-Item -Force $_.FullName }}",
            path, pattern
        ));
        self.state.unindent();
        self.state.line("}");
    }

    fn tmp_file(&mut self, name: &str) -> String {
        let path = join_with(self.separator, &[self.state.tmp_dir(), name]);
        self.absolute(&path)
    }

    fn absolute(&mut self, path: &str) -> String {
        if self.resolve_paths || is_windows_absolute(path) {
            return self.from_slash(path);
        }
        self.state.line(&format!(
            "$CurrentDirectory = (Resolve-Path .{}).Path",
            self.separator
        ));
        join_with(self.separator, &["$CurrentDirectory", path])
    }

    fn join(&self, elements: &[&str]) -> String {
        join_with(self.separator, elements)
    }

    fn env_variable_key(&self, name: &str) -> String {
        format!("$env:{}", name)
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
        self.state.line("echo \"\"");
    }

    fn section_start(&mut self, _id: &str, _header: &str) {}

    fn section_end(&mut self, _id: &str) {}

    fn host_banner(&mut self, hostname: Option<&str>) {
        let suffix = match hostname {
            Some(hostname) if !hostname.is_empty() => {
                let quoted = self.state.quote_variable(hostname);
                let inner = quoted
                    .strip_prefix('"')
                    .and_then(|rest| rest.strip_suffix('"'))
                    .unwrap_or(&quoted);
                format!(" via {}", inner)
            }
            _ => String::new(),
        };
        self.state.line(&format!(
            "echo \"Running on $([Environment]::MachineName){}...\"",
            suffix
        ));
    }

    fn finish(&mut self, trace: bool) -> Result<String> {
        self.state.line("");
        let body = self.state.take_body()?;
        let eol = self.state.eol();

        let mut script = String::new();
        if self.shell == ShellKind::Powershell {
            script.push_str(BOM);
            script.push_str("#requires -PSEdition Desktop");
        } else {
            script.push_str("#requires -PSEdition Core");
        }
        script.push_str(eol);
        script.push_str(eol);

        if trace {
            script.push_str("Set-PSDebug -Trace 2");
            script.push_str(eol);
        }

        if self.shell == ShellKind::Pwsh {
            script.push_str("$ErrorActionPreference = \"Stop\"");
            script.push_str(eol);
            script.push_str(eol);
        }

        script.push_str(&body);
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::FeatureSet;
    use girder_core::features::USE_POWERSHELL_PATH_RESOLVER;

    fn writer(shell: ShellKind) -> PowerShellWriter {
        PowerShellWriter::new(WriterOptions::new(shell, "C:\\builds\\p.tmp"))
    }

    fn body(mut writer: PowerShellWriter) -> String {
        writer.state.take_body().unwrap()
    }

    #[test]
    fn test_command_form() {
        let mut w = writer(ShellKind::Powershell);
        w.command("echo", &["Hello World"]);
        assert_eq!(
            body(w),
            "& \"echo\" \"Hello World\"\r\nif(!$?) { Exit &{if($LASTEXITCODE) {$LASTEXITCODE} else {1}} }\r\n\r\n"
        );
    }

    #[test]
    fn test_variable_is_literal() {
        let mut w = writer(ShellKind::Pwsh);
        w.variable(&Variable::new("PRICE", "$5 #1"));
        assert_eq!(body(w), "$PRICE=\"`$5 `#1\"\n$env:PRICE=$PRICE\n");
    }

    #[test]
    fn test_file_variable() {
        let mut w = writer(ShellKind::Powershell);
        w.variable(&Variable::file("CA", "pem"));
        let out = body(w);
        assert!(out.contains("New-Item -ItemType directory -Force -Path \"C:\\builds\\p.tmp\" | out-null\r\n"));
        assert!(out.contains("[System.IO.File]::WriteAllText(\"C:\\builds\\p.tmp\\CA\", \"pem\")\r\n"));
        assert!(out.contains("$CA=\"C:\\builds\\p.tmp\\CA\"\r\n$env:CA=$CA\r\n"));
    }

    #[test]
    fn test_variable_with_paths_matches_file_variable() {
        let mut w = writer(ShellKind::Powershell);
        w.variable_with_paths("REF", &[ValueSegment::FilePath("CA".to_string())]);
        w.variable_with_paths(
            "OPTS",
            &[
                ValueSegment::Text("--ca ".to_string()),
                ValueSegment::FilePath("CA".to_string()),
            ],
        );
        let out = body(w);
        assert!(out.contains("$REF=\"C:\\builds\\p.tmp\\CA\"\r\n$env:REF=$REF\r\n"));
        assert!(out.contains("$OPTS=\"--ca \" + \"C:\\builds\\p.tmp\\CA\"\r\n"));
    }

    #[test]
    fn test_relative_paths_resolve_at_run_time() {
        let mut w = PowerShellWriter::new(WriterOptions::new(ShellKind::Powershell, "p.tmp"));
        let file = w.tmp_file("KEY");
        assert_eq!(file, "$CurrentDirectory\\p.tmp\\KEY");
        w.rm_file(&file);
        let out = body(w);
        assert!(out.starts_with("$CurrentDirectory = (Resolve-Path .\\).Path\r\n"));
        assert!(out.contains("Remove-Item -Force \"$CurrentDirectory\\p.tmp\\KEY\"\r\n"));
    }

    #[test]
    fn test_path_resolver_flag() {
        let features = FeatureSet::default().with(USE_POWERSHELL_PATH_RESOLVER, true);
        let mut w = PowerShellWriter::new(
            WriterOptions::new(ShellKind::Pwsh, "p.tmp").with_features(features),
        );
        assert_eq!(w.absolute("x"), "x");
        w.cd("project");
        assert!(body(w).starts_with(
            "cd $ExecutionContext.SessionState.Path.GetUnresolvedProviderPathFromPSPath(\"project\")\n"
        ));
    }

    #[test]
    fn test_if_cmd_try_catch() {
        let mut w = writer(ShellKind::Pwsh);
        w.if_cmd("git", &["lfs", "version"]);
        w.else_branch();
        w.end_if();
        let out = body(w);
        assert!(out.contains("  & \"git\" \"lfs\" \"version\" 2>$null\n"));
        assert!(out.contains("if(!$cmdErr) {\n} else {\n}\n"));
    }

    #[test]
    fn test_finish_headers() {
        let mut w = writer(ShellKind::Powershell);
        w.empty_line();
        let script = w.finish(true).unwrap();
        assert!(script.starts_with("\u{feff}#requires -PSEdition Desktop\r\n\r\nSet-PSDebug -Trace 2\r\n"));
        assert!(!script.contains("$ErrorActionPreference"));

        let mut w = writer(ShellKind::Pwsh);
        w.empty_line();
        let script = w.finish(false).unwrap();
        assert!(script.starts_with("#requires -PSEdition Core\n\n$ErrorActionPreference = \"Stop\"\n\n"));
        assert!(script.ends_with("echo \"\"\n\n"));
    }

    #[test]
    fn test_pwsh_on_windows_uses_crlf() {
        let mut w = PowerShellWriter::new(
            WriterOptions::new(ShellKind::Pwsh, "C:\\t").with_host_os(HostOs::Windows),
        );
        w.empty_line();
        assert_eq!(body(w), "echo \"\"\r\n");
    }
}
