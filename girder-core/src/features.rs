//! Feature flags read by the generator
//!
//! Flags are a plain value captured per generation call. They are built
//! from the job's flag map, then `FF_*` job variables, then any explicit
//! overrides from the process configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::variables::{Variables, parse_bool};

pub const POSIXLY_CORRECT_ESCAPES: &str = "FF_POSIXLY_CORRECT_ESCAPES";
pub const USE_NEW_SHELL_ESCAPE: &str = "FF_USE_NEW_SHELL_ESCAPE";
pub const ENABLE_BASH_EXIT_CODE_CHECK: &str = "FF_ENABLE_BASH_EXIT_CODE_CHECK";
pub const USE_NEW_EVAL_STRATEGY: &str = "FF_USE_NEW_EVAL_STRATEGY";
pub const CMD_DISABLE_DELAYED_ERROR_LEVEL_EXPANSION: &str =
    "FF_CMD_DISABLE_DELAYED_ERROR_LEVEL_EXPANSION";
pub const USE_POWERSHELL_PATH_RESOLVER: &str = "FF_USE_POWERSHELL_PATH_RESOLVER";
pub const HASH_CACHE_KEYS: &str = "FF_HASH_CACHE_KEYS";
pub const SECRET_RESOLVING_FAILS_IF_MISSING: &str = "FF_SECRET_RESOLVING_FAILS_IF_MISSING";
pub const CLEAN_UP_FAILED_CACHE_EXTRACT: &str = "FF_CLEAN_UP_FAILED_CACHE_EXTRACT";
pub const DISABLE_POWERSHELL_STDIN: &str = "FF_DISABLE_POWERSHELL_STDIN";

/// Description of a known flag
#[derive(Debug, Clone, Copy)]
pub struct FlagDefinition {
    pub name: &'static str,
    pub default: bool,
    pub description: &'static str,
}

/// Every flag the generator understands, with its default
pub const FLAGS: &[FlagDefinition] = &[
    FlagDefinition {
        name: POSIXLY_CORRECT_ESCAPES,
        default: false,
        description: "Quote sh/bash strings with POSIX single quotes",
    },
    FlagDefinition {
        name: USE_NEW_SHELL_ESCAPE,
        default: true,
        description: "Quote sh/bash strings with ANSI-C quoting; off selects the legacy escaper",
    },
    FlagDefinition {
        name: ENABLE_BASH_EXIT_CODE_CHECK,
        default: false,
        description: "Emit an explicit exit code test after each bash script line",
    },
    FlagDefinition {
        name: USE_NEW_EVAL_STRATEGY,
        default: false,
        description: "Evaluate the bash body inside a subshell",
    },
    FlagDefinition {
        name: CMD_DISABLE_DELAYED_ERROR_LEVEL_EXPANSION,
        default: false,
        description: "Check %errorlevel% instead of !errorlevel! in cmd scripts",
    },
    FlagDefinition {
        name: USE_POWERSHELL_PATH_RESOLVER,
        default: false,
        description: "Resolve PowerShell paths at run time",
    },
    FlagDefinition {
        name: HASH_CACHE_KEYS,
        default: false,
        description: "Address cache archives by the sha256 of their key",
    },
    FlagDefinition {
        name: SECRET_RESOLVING_FAILS_IF_MISSING,
        default: true,
        description: "Fail when a referenced secret does not exist",
    },
    FlagDefinition {
        name: CLEAN_UP_FAILED_CACHE_EXTRACT,
        default: false,
        description: "Remove cache paths after a failed extraction",
    },
    FlagDefinition {
        name: DISABLE_POWERSHELL_STDIN,
        default: false,
        description: "Always pass PowerShell scripts as files",
    },
];

/// Snapshot of all feature flags for one generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub posixly_correct_escapes: bool,
    pub use_new_shell_escape: bool,
    pub enable_bash_exit_code_check: bool,
    pub use_new_eval_strategy: bool,
    pub cmd_disable_delayed_error_level_expansion: bool,
    pub use_powershell_path_resolver: bool,
    pub hash_cache_keys: bool,
    pub secret_resolving_fails_if_missing: bool,
    pub clean_up_failed_cache_extract: bool,
    pub disable_powershell_stdin: bool,
}

impl Default for FeatureSet {
    fn default() -> Self {
        let mut features = Self {
            posixly_correct_escapes: false,
            use_new_shell_escape: false,
            enable_bash_exit_code_check: false,
            use_new_eval_strategy: false,
            cmd_disable_delayed_error_level_expansion: false,
            use_powershell_path_resolver: false,
            hash_cache_keys: false,
            secret_resolving_fails_if_missing: false,
            clean_up_failed_cache_extract: false,
            disable_powershell_stdin: false,
        };
        for flag in FLAGS {
            features.set(flag.name, flag.default);
        }
        features
    }
}

impl FeatureSet {
    /// Builds the set from a flag map, leaving unnamed flags at their default
    pub fn from_map(flags: &BTreeMap<String, bool>) -> Self {
        let mut features = Self::default();
        for (name, value) in flags {
            if !features.set(name, *value) {
                debug!("Ignoring unknown feature flag {}", name);
            }
        }
        features
    }

    /// Applies `FF_*` job variables on top of the current values
    pub fn apply_variables(&mut self, variables: &Variables) {
        for flag in FLAGS {
            if let Some(value) = variables.value(flag.name) {
                self.set(flag.name, parse_bool(value));
            }
        }
    }

    /// Sets a flag by name; returns false for unknown names
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        let slot = match name {
            POSIXLY_CORRECT_ESCAPES => &mut self.posixly_correct_escapes,
            USE_NEW_SHELL_ESCAPE => &mut self.use_new_shell_escape,
            ENABLE_BASH_EXIT_CODE_CHECK => &mut self.enable_bash_exit_code_check,
            USE_NEW_EVAL_STRATEGY => &mut self.use_new_eval_strategy,
            CMD_DISABLE_DELAYED_ERROR_LEVEL_EXPANSION => {
                &mut self.cmd_disable_delayed_error_level_expansion
            }
            USE_POWERSHELL_PATH_RESOLVER => &mut self.use_powershell_path_resolver,
            HASH_CACHE_KEYS => &mut self.hash_cache_keys,
            SECRET_RESOLVING_FAILS_IF_MISSING => &mut self.secret_resolving_fails_if_missing,
            CLEAN_UP_FAILED_CACHE_EXTRACT => &mut self.clean_up_failed_cache_extract,
            DISABLE_POWERSHELL_STDIN => &mut self.disable_powershell_stdin,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Reads a flag by name
    pub fn get(&self, name: &str) -> Option<bool> {
        let value = match name {
            POSIXLY_CORRECT_ESCAPES => self.posixly_correct_escapes,
            USE_NEW_SHELL_ESCAPE => self.use_new_shell_escape,
            ENABLE_BASH_EXIT_CODE_CHECK => self.enable_bash_exit_code_check,
            USE_NEW_EVAL_STRATEGY => self.use_new_eval_strategy,
            CMD_DISABLE_DELAYED_ERROR_LEVEL_EXPANSION => {
                self.cmd_disable_delayed_error_level_expansion
            }
            USE_POWERSHELL_PATH_RESOLVER => self.use_powershell_path_resolver,
            HASH_CACHE_KEYS => self.hash_cache_keys,
            SECRET_RESOLVING_FAILS_IF_MISSING => self.secret_resolving_fails_if_missing,
            CLEAN_UP_FAILED_CACHE_EXTRACT => self.clean_up_failed_cache_extract,
            DISABLE_POWERSHELL_STDIN => self.disable_powershell_stdin,
            _ => return None,
        };
        Some(value)
    }

    /// Builder-style override
    pub fn with(mut self, name: &str, value: bool) -> Self {
        self.set(name, value);
        self
    }
}
