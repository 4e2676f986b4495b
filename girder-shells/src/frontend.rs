//! Shell frontend
//!
//! Decides how an executor invokes a stage script: which binary, which
//! arguments, stdin or file delivery, and the argv used inside containers.

use girder_core::domain::shell::{HostOs, ShellConfiguration, ShellKind, ShellType};
use girder_core::{JobContext, Result};
use tracing::debug;

use crate::trap;
use crate::writer::{ShellWriter, WriterOptions, new_writer};

const POSIX_SHELL_CANDIDATES: [&str; 7] = [
    "/usr/local/bin/bash",
    "/usr/bin/bash",
    "/bin/bash",
    "/usr/local/bin/sh",
    "/usr/bin/sh",
    "/bin/sh",
    "/busybox/sh",
];

const POWERSHELL_STDIN_ARGS: [&str; 11] = [
    "-NoProfile",
    "-NoLogo",
    "-InputFormat",
    "text",
    "-OutputFormat",
    "text",
    "-NonInteractive",
    "-ExecutionPolicy",
    "Bypass",
    "-Command",
    "-",
];

const POWERSHELL_FILE_ARGS: [&str; 5] = [
    "-NoProfile",
    "-NonInteractive",
    "-ExecutionPolicy",
    "Bypass",
    "-Command",
];

/// Per-dialect invocation and writer construction for one job
#[derive(Debug, Clone, Copy)]
pub struct ShellFrontend<'a> {
    job: &'a JobContext,
}

impl<'a> ShellFrontend<'a> {
    pub fn new(job: &'a JobContext) -> Self {
        Self { job }
    }

    pub fn shell(&self) -> ShellKind {
        self.job.shell_kind
    }

    /// Builds the invocation for this job's shell
    pub fn configuration(&self) -> Result<ShellConfiguration> {
        let config = match self.job.shell_kind {
            ShellKind::Sh | ShellKind::Bash => self.posix_configuration(),
            ShellKind::Cmd => cmd_configuration(),
            ShellKind::Powershell | ShellKind::Pwsh => self.powershell_configuration(),
        };
        debug!(
            "Shell configuration for job {}: {} {:?} (pass_file={})",
            self.job.job_id, config.command, config.arguments, config.pass_file
        );
        Ok(config)
    }

    /// Fresh writer for one stage script
    pub fn writer(&self) -> Box<dyn ShellWriter> {
        let options = WriterOptions::new(self.job.shell_kind, self.job.tmp_dir.clone())
            .with_features(self.job.features())
            .with_host_os(self.job.host_os)
            .with_trap_exit(self.job.trap_exit && self.job.shell_kind.is_posix());
        new_writer(options)
    }

    /// Launcher script reporting the exit status of a PowerShell stage
    ///
    /// Only meaningful when the job sets `trap_exit`; bash scripts carry the
    /// trap themselves.
    pub fn exit_report_launcher(
        &self,
        script_path: &str,
        log_file: Option<&str>,
    ) -> Result<Option<String>> {
        if !self.job.trap_exit || !self.job.shell_kind.is_powershell() {
            return Ok(None);
        }
        trap::powershell_launcher(self.job.shell_kind, script_path, log_file).map(Some)
    }

    fn posix_configuration(&self) -> ShellConfiguration {
        let shell = self.job.shell_kind.as_str();
        let login = self.job.shell_type == ShellType::Login;
        let login_flag = "-l";

        let cmd_line = if login {
            format!("{} {}", shell, login_flag)
        } else {
            shell.to_string()
        };

        let mut config = ShellConfiguration {
            extension: self.job.shell_kind.extension().to_string(),
            docker_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                detect_shell_script(if login { login_flag } else { "" }),
            ],
            ..Default::default()
        };

        match self.job.user.as_deref().filter(|user| !user.is_empty()) {
            Some(user) => {
                config.command = "su".to_string();
                if self.job.host_os == HostOs::Linux {
                    config.arguments.push("-s".to_string());
                    config.arguments.push(format!("/bin/{}", shell));
                }
                config.arguments.push(user.to_string());
                config.arguments.push("-c".to_string());
                config.arguments.push(cmd_line.clone());
            }
            None => {
                config.command = shell.to_string();
                if login {
                    config.arguments.push(login_flag.to_string());
                }
            }
        }
        config.cmd_line = cmd_line;
        config
    }

    fn powershell_configuration(&self) -> ShellConfiguration {
        let shell = self.job.shell_kind.as_str();
        let stdin = self.job.executor_kind.supports_stdin_script()
            && !self.job.features().disable_powershell_stdin;

        let arguments: Vec<String> = if stdin {
            POWERSHELL_STDIN_ARGS.iter().map(|arg| arg.to_string()).collect()
        } else {
            POWERSHELL_FILE_ARGS.iter().map(|arg| arg.to_string()).collect()
        };

        let mut docker_command = vec![shell.to_string()];
        docker_command.extend(POWERSHELL_STDIN_ARGS.iter().map(|arg| arg.to_string()));

        ShellConfiguration {
            command: shell.to_string(),
            cmd_line: format!("{} {}", shell, arguments.join(" ")),
            arguments,
            pass_file: !stdin,
            extension: self.job.shell_kind.extension().to_string(),
            docker_command,
        }
    }
}

fn cmd_configuration() -> ShellConfiguration {
    ShellConfiguration {
        command: "cmd".to_string(),
        arguments: vec!["/C".to_string()],
        cmd_line: "cmd /C".to_string(),
        pass_file: true,
        extension: ShellKind::Cmd.extension().to_string(),
        docker_command: Vec::new(),
    }
}

/// Probe script run by `sh -c` that execs the first POSIX shell found
fn detect_shell_script(args: &str) -> String {
    let mut script = String::new();
    for (i, candidate) in POSIX_SHELL_CANDIDATES.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "elif" };
        script.push_str(&format!("{} [ -x {} ]; then\n", keyword, candidate));
        if args.is_empty() {
            script.push_str(&format!("\texec {}\n", candidate));
        } else {
            script.push_str(&format!("\texec {} {}\n", candidate, args));
        }
    }
    script.push_str("else\n\techo shell not found\n\texit 1\nfi\n\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::domain::shell::ExecutorKind;
    use girder_core::features::DISABLE_POWERSHELL_STDIN;

    fn job(shell: ShellKind) -> JobContext {
        let mut job = JobContext::new(1, "/builds/group/project", "/builds/group/project.tmp");
        job.shell_kind = shell;
        job
    }

    #[test]
    fn test_bash_configuration() {
        let job = job(ShellKind::Bash);
        let config = ShellFrontend::new(&job).configuration().unwrap();
        assert_eq!(config.command, "bash");
        assert!(config.arguments.is_empty());
        assert!(!config.pass_file);
        assert_eq!(config.extension, "sh");
        assert_eq!(config.docker_command[..2], ["sh", "-c"]);
        assert!(config.docker_command[2].starts_with("if [ -x /usr/local/bin/bash ]; then\n\texec /usr/local/bin/bash\n"));
        assert!(config.docker_command[2].contains("elif [ -x /busybox/sh ]; then"));
    }

    #[test]
    fn test_login_shell_flags() {
        let mut bash = job(ShellKind::Bash);
        bash.shell_type = ShellType::Login;
        let config = ShellFrontend::new(&bash).configuration().unwrap();
        assert_eq!(config.arguments, vec!["-l"]);
        assert!(config.docker_command[2].contains("exec /bin/bash -l\n"));

        let mut sh = job(ShellKind::Sh);
        sh.shell_type = ShellType::Login;
        let config = ShellFrontend::new(&sh).configuration().unwrap();
        assert_eq!(config.command, "sh");
        assert_eq!(config.arguments, vec!["-l"]);
    }

    #[test]
    fn test_su_wrapping() {
        let mut linux = job(ShellKind::Bash);
        linux.user = Some("builder".to_string());
        let config = ShellFrontend::new(&linux).configuration().unwrap();
        assert_eq!(config.command, "su");
        assert_eq!(config.arguments, vec!["-s", "/bin/bash", "builder", "-c", "bash"]);

        let mut darwin = job(ShellKind::Bash);
        darwin.user = Some("builder".to_string());
        darwin.host_os = HostOs::Darwin;
        darwin.shell_type = ShellType::Login;
        let config = ShellFrontend::new(&darwin).configuration().unwrap();
        assert_eq!(config.arguments, vec!["builder", "-c", "bash -l"]);
    }

    #[test]
    fn test_cmd_configuration() {
        let job = job(ShellKind::Cmd);
        let config = ShellFrontend::new(&job).configuration().unwrap();
        assert_eq!(config.command, "cmd");
        assert_eq!(config.arguments, vec!["/C"]);
        assert!(config.pass_file);
        assert_eq!(config.extension, "cmd");
        assert_eq!(config.cmd_line, "cmd /C");
    }

    #[test]
    fn test_powershell_stdin_versus_file() {
        let mut pod = job(ShellKind::Pwsh);
        pod.executor_kind = ExecutorKind::Kubernetes;
        let config = ShellFrontend::new(&pod).configuration().unwrap();
        assert!(!config.pass_file);
        assert_eq!(config.arguments.last().map(String::as_str), Some("-"));
        assert_eq!(config.docker_command[0], "pwsh");

        let local = job(ShellKind::Powershell);
        let config = ShellFrontend::new(&local).configuration().unwrap();
        assert!(config.pass_file);
        assert_eq!(config.extension, "ps1");
        assert_eq!(config.arguments.last().map(String::as_str), Some("-Command"));
        assert_eq!(config.docker_command.last().map(String::as_str), Some("-"));

        pod.feature_flags.insert(DISABLE_POWERSHELL_STDIN.to_string(), true);
        let config = ShellFrontend::new(&pod).configuration().unwrap();
        assert!(config.pass_file);
    }

    #[test]
    fn test_exit_report_launcher() {
        let mut job = job(ShellKind::Pwsh);
        assert_eq!(
            ShellFrontend::new(&job).exit_report_launcher("/s.ps1", None).unwrap(),
            None
        );
        job.trap_exit = true;
        let launcher = ShellFrontend::new(&job)
            .exit_report_launcher("/s.ps1", None)
            .unwrap()
            .unwrap();
        assert!(launcher.contains("-File \"/s.ps1\""));
    }

    #[test]
    fn test_writer_follows_job_shell() {
        let job = job(ShellKind::Cmd);
        let writer = ShellFrontend::new(&job).writer();
        assert_eq!(writer.shell(), ShellKind::Cmd);
        assert_eq!(writer.tmp_dir(), "/builds/group/project.tmp");
    }
}
