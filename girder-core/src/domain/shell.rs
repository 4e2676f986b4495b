//! Shell dialects, executors and the invocation configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GeneratorError;

/// Target shell dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    Sh,
    #[default]
    Bash,
    Cmd,
    /// Windows PowerShell 5 (Desktop edition)
    Powershell,
    /// PowerShell Core
    Pwsh,
}

impl ShellKind {
    pub const ALL: [ShellKind; 5] = [
        ShellKind::Sh,
        ShellKind::Bash,
        ShellKind::Cmd,
        ShellKind::Powershell,
        ShellKind::Pwsh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShellKind::Sh => "sh",
            ShellKind::Bash => "bash",
            ShellKind::Cmd => "cmd",
            ShellKind::Powershell => "powershell",
            ShellKind::Pwsh => "pwsh",
        }
    }

    /// True for `sh` and `bash`
    pub fn is_posix(&self) -> bool {
        matches!(self, ShellKind::Sh | ShellKind::Bash)
    }

    /// True for both PowerShell editions
    pub fn is_powershell(&self) -> bool {
        matches!(self, ShellKind::Powershell | ShellKind::Pwsh)
    }

    /// Script file extension used in file mode
    pub fn extension(&self) -> &'static str {
        match self {
            ShellKind::Sh | ShellKind::Bash => "sh",
            ShellKind::Cmd => "cmd",
            ShellKind::Powershell | ShellKind::Pwsh => "ps1",
        }
    }
}

impl FromStr for ShellKind {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| GeneratorError::InvalidJobContext(format!("unknown shell: {}", s)))
    }
}

impl std::fmt::Display for ShellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the shell starts as a login shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    Login,
    #[default]
    Normal,
}

/// Executor backend that will run the generated script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    #[default]
    Shell,
    Docker,
    DockerWindows,
    Kubernetes,
    Virtualbox,
    Parallels,
    Custom,
}

impl ExecutorKind {
    /// Executors able to feed the script to the shell over stdin
    pub fn supports_stdin_script(&self) -> bool {
        matches!(
            self,
            ExecutorKind::Docker
                | ExecutorKind::DockerWindows
                | ExecutorKind::Kubernetes
                | ExecutorKind::Virtualbox
                | ExecutorKind::Parallels
        )
    }

    /// The shell executor shares its environment with the host
    pub fn is_shared_env(&self) -> bool {
        matches!(self, ExecutorKind::Shell | ExecutorKind::Custom)
    }
}

/// Operating system of the worker running the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    #[default]
    Linux,
    Darwin,
    Freebsd,
    Windows,
}

/// How an executor must invoke the generated script
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShellConfiguration {
    /// Binary to run (absolute path or basename)
    pub command: String,

    /// Arguments after the binary
    pub arguments: Vec<String>,

    /// Single-line form of `command` and `arguments`, used when wrapped in `su`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cmd_line: String,

    /// Write the script to a file and append its path instead of piping stdin
    pub pass_file: bool,

    /// Script file extension in file mode
    pub extension: String,

    /// Canonical argv for container exec
    pub docker_command: Vec<String>,
}

impl ShellConfiguration {
    /// Full argv for running the script at `script_path` (file mode only)
    pub fn argv_for_file(&self, script_path: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.arguments.len() + 2);
        argv.push(self.command.clone());
        argv.extend(self.arguments.iter().cloned());
        if self.pass_file {
            argv.push(script_path.to_string());
        }
        argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_kind_parse() {
        assert_eq!("pwsh".parse::<ShellKind>().unwrap(), ShellKind::Pwsh);
        assert!("zsh".parse::<ShellKind>().is_err());
        assert_eq!(ShellKind::default(), ShellKind::Bash);
    }

    #[test]
    fn test_shell_kind_families() {
        assert!(ShellKind::Sh.is_posix());
        assert!(!ShellKind::Cmd.is_posix());
        assert!(ShellKind::Powershell.is_powershell());
        assert_eq!(ShellKind::Pwsh.extension(), "ps1");
    }

    #[test]
    fn test_executor_stdin_support() {
        assert!(ExecutorKind::Kubernetes.supports_stdin_script());
        assert!(ExecutorKind::DockerWindows.supports_stdin_script());
        assert!(!ExecutorKind::Shell.supports_stdin_script());
        assert!(!ExecutorKind::Custom.supports_stdin_script());
    }

    #[test]
    fn test_executor_serde_name() {
        let kind: ExecutorKind = serde_json::from_str("\"docker_windows\"").unwrap();
        assert_eq!(kind, ExecutorKind::DockerWindows);
    }

    #[test]
    fn test_argv_for_file() {
        let config = ShellConfiguration {
            command: "cmd".to_string(),
            arguments: vec!["/C".to_string()],
            pass_file: true,
            extension: "cmd".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.argv_for_file("script.cmd"),
            vec!["cmd", "/C", "script.cmd"]
        );
    }
}
