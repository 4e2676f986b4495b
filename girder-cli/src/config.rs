//! CLI configuration
//!
//! Process-level settings read from `GIRDER_*` environment variables and
//! refined by command-line flags.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use girder_core::FeatureSet;
use girder_core::domain::shell::ShellKind;
use girder_core::domain::variables::parse_bool;

const FLAG_ENV_PREFIX: &str = "GIRDER_";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Shell used when the job document does not name one
    pub default_shell: Option<ShellKind>,

    /// Deadline for resolving all secrets of a job
    pub secret_timeout: Duration,

    /// JSON cache backend document
    pub cache_config: Option<PathBuf>,

    /// Force the trap exit reporter on every job
    pub trap_exit: bool,

    /// Feature flags that win over the job's own settings
    pub flag_overrides: BTreeMap<String, bool>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            default_shell: None,
            secret_timeout: girder_secrets::DEFAULT_TIMEOUT,
            cache_config: None,
            trap_exit: false,
            flag_overrides: BTreeMap::new(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - GIRDER_SHELL (optional, default shell)
    /// - GIRDER_SECRET_TIMEOUT (optional, seconds, default: 30)
    /// - GIRDER_CACHE_CONFIG (optional, path to the cache backend JSON)
    /// - GIRDER_TRAP_EXIT (optional, boolean)
    /// - GIRDER_FF_<NAME> (optional, boolean override of flag FF_<NAME>)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit variable list
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> anyhow::Result<Self> {
        let mut config = Self::new();

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(FLAG_ENV_PREFIX) else {
                continue;
            };
            match name {
                "SHELL" if !value.is_empty() => {
                    let shell = value
                        .parse::<ShellKind>()
                        .map_err(|e| anyhow::anyhow!("GIRDER_SHELL: {}", e))?;
                    config.default_shell = Some(shell);
                }
                "SECRET_TIMEOUT" => {
                    let secs = value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| anyhow::anyhow!("GIRDER_SECRET_TIMEOUT must be a number of seconds"))?;
                    config.secret_timeout = Duration::from_secs(secs);
                }
                "CACHE_CONFIG" if !value.is_empty() => {
                    config.cache_config = Some(PathBuf::from(value));
                }
                "TRAP_EXIT" => config.trap_exit = parse_bool(&value),
                flag if flag.starts_with("FF_") => {
                    config.flag_overrides.insert(flag.to_string(), parse_bool(&value));
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Adds a feature flag override
    pub fn with_flag_override(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flag_overrides.insert(name.into(), value);
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret_timeout.is_zero() {
            anyhow::bail!("secret_timeout must be greater than 0");
        }

        if let Some(path) = &self.cache_config {
            if !path.is_file() {
                anyhow::bail!("cache config {} does not exist", path.display());
            }
        }

        let known = FeatureSet::default();
        for name in self.flag_overrides.keys() {
            if known.get(name).is_none() {
                anyhow::bail!("unknown feature flag {}", name);
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.secret_timeout, Duration::from_secs(30));
        assert!(config.default_shell.is_none());
        assert!(!config.trap_exit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_vars() {
        let config = Config::from_vars(vars(&[
            ("GIRDER_SHELL", "pwsh"),
            ("GIRDER_SECRET_TIMEOUT", "5"),
            ("GIRDER_TRAP_EXIT", "true"),
            ("GIRDER_FF_HASH_CACHE_KEYS", "1"),
            ("GIRDER_FF_USE_NEW_SHELL_ESCAPE", "false"),
            ("PATH", "/usr/bin"),
        ]))
        .unwrap();

        assert_eq!(config.default_shell, Some(ShellKind::Pwsh));
        assert_eq!(config.secret_timeout, Duration::from_secs(5));
        assert!(config.trap_exit);
        assert_eq!(config.flag_overrides.get("FF_HASH_CACHE_KEYS"), Some(&true));
        assert_eq!(config.flag_overrides.get("FF_USE_NEW_SHELL_ESCAPE"), Some(&false));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_vars() {
        assert!(Config::from_vars(vars(&[("GIRDER_SHELL", "fish")])).is_err());
        assert!(Config::from_vars(vars(&[("GIRDER_SECRET_TIMEOUT", "soon")])).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.secret_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.secret_timeout = Duration::from_secs(1);

        config.cache_config = Some(PathBuf::from("/nonexistent/cache.json"));
        assert!(config.validate().is_err());
        config.cache_config = None;

        let config = config.with_flag_override("FF_NOT_A_FLAG", true);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_flag_override() {
        let config = Config::default()
            .with_flag_override("FF_HASH_CACHE_KEYS", true)
            .with_flag_override("FF_USE_NEW_EVAL_STRATEGY", false);

        assert_eq!(config.flag_overrides.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_must_exist() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config {
            cache_config: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
