//! Dialect quoting
//!
//! Every string that reaches a generated script passes through the
//! `Quoter` of that script's dialect. A string quoted for one dialect is
//! never valid input for another.

pub mod bash;
pub mod cmd;
pub mod powershell;

pub use bash::BashEscapeMode;

use girder_core::domain::shell::ShellKind;
use girder_core::{FeatureSet, GeneratorError, Result};

/// Quoting rules for one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoter {
    Bash(BashEscapeMode),
    Cmd,
    PowerShell,
}

impl Quoter {
    /// Quoter for `shell`, honoring the escape flags in `features`
    pub fn for_shell(shell: ShellKind, features: &FeatureSet) -> Self {
        match shell {
            ShellKind::Sh | ShellKind::Bash => Quoter::Bash(BashEscapeMode::from_features(features)),
            ShellKind::Cmd => Quoter::Cmd,
            ShellKind::Powershell | ShellKind::Pwsh => Quoter::PowerShell,
        }
    }

    pub fn dialect(&self) -> &'static str {
        match self {
            Quoter::Bash(_) => "bash",
            Quoter::Cmd => "cmd",
            Quoter::PowerShell => "powershell",
        }
    }

    /// Literal word the shell reads back as `input`
    pub fn quote(&self, input: &str) -> String {
        match self {
            Quoter::Bash(mode) => bash::quote(input, *mode),
            Quoter::Cmd => cmd::quote_command(input),
            Quoter::PowerShell => powershell::quote(input),
        }
    }

    /// Literal for the value side of a variable assignment
    pub fn quote_variable(&self, input: &str) -> String {
        match self {
            Quoter::Bash(mode) => bash::quote(input, *mode),
            Quoter::Cmd => cmd::escape_variable(input),
            Quoter::PowerShell => powershell::quote_variable(input),
        }
    }

    /// Quoted word in which the dialect's variable references still expand
    pub fn quote_expand(&self, input: &str) -> String {
        match self {
            Quoter::Bash(_) => bash::quote_expand(input),
            Quoter::Cmd => cmd::quote(input),
            Quoter::PowerShell => powershell::quote_expand(input),
        }
    }

    /// Reverses `quote`
    pub fn unquote(&self, word: &str) -> Option<String> {
        match self {
            Quoter::Bash(_) => bash::unquote(word),
            Quoter::Cmd => cmd::unquote(word),
            Quoter::PowerShell => powershell::unquote(word),
        }
    }

    /// Rejects strings the dialect cannot carry
    pub fn check(&self, input: &str) -> Result<()> {
        if input.contains('\0') {
            return Err(GeneratorError::quoting(
                self.dialect(),
                "NUL bytes cannot appear in a script",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::features::POSIXLY_CORRECT_ESCAPES;

    #[test]
    fn test_for_shell() {
        let features = FeatureSet::default();
        assert_eq!(
            Quoter::for_shell(ShellKind::Sh, &features),
            Quoter::Bash(BashEscapeMode::AnsiC)
        );
        assert_eq!(Quoter::for_shell(ShellKind::Cmd, &features), Quoter::Cmd);
        assert_eq!(Quoter::for_shell(ShellKind::Pwsh, &features), Quoter::PowerShell);

        let posix = features.with(POSIXLY_CORRECT_ESCAPES, true);
        assert_eq!(
            Quoter::for_shell(ShellKind::Bash, &posix),
            Quoter::Bash(BashEscapeMode::Posix)
        );
    }

    #[test]
    fn test_nul_is_unsupported() {
        for quoter in [Quoter::Bash(BashEscapeMode::AnsiC), Quoter::Cmd, Quoter::PowerShell] {
            let err = quoter.check("a\0b").unwrap_err();
            assert_eq!(err.kind(), "quoting_unsupported");
            assert!(quoter.check("fine").is_ok());
        }
    }

    #[test]
    fn test_dialects_differ() {
        let bash = Quoter::Bash(BashEscapeMode::AnsiC);
        assert_eq!(bash.quote("a & b"), "$'a & b'");
        assert_eq!(Quoter::Cmd.quote_variable("a & b"), "a ^& b");
        assert_eq!(Quoter::PowerShell.quote("a & b"), "\"a & b\"");
    }
}
