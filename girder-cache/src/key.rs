//! Cache key derivation
//!
//! A user key is expanded against the job variables, sanitized into a
//! relative path (or hashed when `FF_HASH_CACHE_KEYS` is on), and turned
//! into the local archive path handed to the helper.

use girder_core::JobContext;
use sha2::{Digest, Sha256};

/// Archive file name inside each key directory
pub const ARCHIVE_NAME: &str = "cache.zip";

/// Result of sanitizing a raw key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedKey {
    /// Empty when the raw key could not be turned into a usable path
    pub key: String,
    /// Set when the key changed or was rejected
    pub warning: Option<String>,
}

/// Addressing for one cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// Key shown in the job log
    pub human: String,
    /// Key used in object names and archive paths
    pub object_key: String,
    /// Archive path relative to the project directory when possible
    pub archive_file: String,
}

/// Outcome of resolving a user key
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyResolution {
    /// `None` disables the cache entry
    pub key: Option<CacheKey>,
    pub warning: Option<String>,
}

/// Hex sha256 of a key
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Turns a raw key into a relative path that cannot escape its base
///
/// `%2F`/`%2E` are decoded, `\` becomes `/`, `.` and `..` are resolved
/// against a virtual root and trailing blanks of the last element are
/// dropped.
pub fn sanitize_key(raw: &str) -> SanitizedKey {
    if raw.is_empty() {
        return SanitizedKey {
            key: String::new(),
            warning: None,
        };
    }

    let decoded = raw
        .replace("%2e", ".")
        .replace("%2E", ".")
        .replace("%2f", "/")
        .replace("%2F", "/")
        .replace('\\', "/");

    let mut parts = clean_components(&decoded);
    loop {
        let Some(last) = parts.last_mut() else {
            break;
        };
        let trimmed = last.trim_end().to_string();
        match trimmed.as_str() {
            "" | "." => {
                parts.pop();
            }
            ".." => {
                parts.pop();
                parts.pop();
            }
            _ => {
                *last = trimmed;
                break;
            }
        }
    }

    let key = parts.join("/");
    let warning = if key.is_empty() {
        Some(format!("cache key {:?} could not be sanitized", raw))
    } else if key != raw {
        Some(format!("cache key {:?} sanitized to {:?}", raw, key))
    } else {
        None
    };

    SanitizedKey { key, warning }
}

/// Resolves the cache entry for `user_key`
///
/// An empty user key defaults to `<job_name>/<ref_name>`. With `hash`
/// the key is used verbatim for display and its sha256 addresses the
/// archive.
pub fn resolve_key(job: &JobContext, user_key: &str, hash: bool) -> KeyResolution {
    let raw = if user_key.is_empty() {
        job.default_cache_key()
    } else {
        job.expand(user_key)
    };

    let (human, warning) = if hash {
        (raw, None)
    } else {
        let sanitized = sanitize_key(&raw);
        (sanitized.key, sanitized.warning)
    };

    if human.is_empty() {
        return KeyResolution { key: None, warning };
    }

    let object_key = if hash { hash_key(&human) } else { human.clone() };
    let archive_file = archive_path(&job.cache_dir, &job.project_dir, &object_key);

    KeyResolution {
        key: Some(CacheKey {
            human,
            object_key,
            archive_file,
        }),
        warning,
    }
}

/// `<cache_dir>/<key>/cache.zip`, relative to `project_dir` when both are absolute
pub fn archive_path(cache_dir: &str, project_dir: &str, key: &str) -> String {
    let file = [cache_dir.trim_end_matches(['/', '\\']), key, ARCHIVE_NAME]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

    if is_absolute(&file) && is_absolute(project_dir) {
        relative_path(project_dir, &file)
    } else {
        file
    }
}

fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

fn clean_components(path: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other.to_string()),
        }
    }
    parts
}

fn relative_path(base: &str, target: &str) -> String {
    let base = clean_components(base);
    let target = clean_components(target);
    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base.len() - common];
    parts.extend(target[common..].iter().cloned());
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::Variable;

    fn job() -> JobContext {
        let mut job = JobContext::new(1, "/builds/group/project", "/builds/group/project.tmp");
        job.job_name = "test".to_string();
        job.repo.ref_name = "main".to_string();
        job
    }

    #[test]
    fn test_sanitize_keeps_clean_keys() {
        let sanitized = sanitize_key("deps/linux");
        assert_eq!(sanitized.key, "deps/linux");
        assert_eq!(sanitized.warning, None);
    }

    #[test]
    fn test_sanitize_blocks_traversal() {
        assert_eq!(sanitize_key("../../etc/passwd").key, "etc/passwd");
        assert_eq!(sanitize_key("%2E%2E%2Fsecret").key, "secret");
        assert_eq!(sanitize_key("a\\b").key, "a/b");
        assert!(sanitize_key("a\\b").warning.unwrap().contains("sanitized to"));
    }

    #[test]
    fn test_sanitize_trims_last_element() {
        assert_eq!(sanitize_key("key  ").key, "key");
        assert_eq!(sanitize_key("key/  ").key, "key");
        let rejected = sanitize_key("..");
        assert_eq!(rejected.key, "");
        assert!(rejected.warning.unwrap().contains("could not be sanitized"));
    }

    #[test]
    fn test_resolve_default_key() {
        let resolved = resolve_key(&job(), "", false);
        let key = resolved.key.unwrap();
        assert_eq!(key.human, "test/main");
        assert_eq!(key.archive_file, "cache/test/main/cache.zip");
    }

    #[test]
    fn test_resolve_expands_variables() {
        let mut job = job();
        job.variables.push(Variable::new("CI_COMMIT_REF_SLUG", "feature-x"));
        let key = resolve_key(&job, "deps-$CI_COMMIT_REF_SLUG", false).key.unwrap();
        assert_eq!(key.human, "deps-feature-x");

        assert_eq!(resolve_key(&job, "$UNDEFINED", false).key, None);
    }

    #[test]
    fn test_resolve_hashed() {
        let key = resolve_key(&job(), "k1", true).key.unwrap();
        assert_eq!(key.human, "k1");
        assert_eq!(key.object_key.len(), 64);
        assert_eq!(key.object_key, hash_key("k1"));
        assert!(key.archive_file.ends_with(&format!("{}/cache.zip", key.object_key)));
    }

    #[test]
    fn test_hash_key_digest() {
        assert_eq!(
            hash_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(archive_path(".cache", "/builds/p", "k1"), ".cache/k1/cache.zip");
        assert_eq!(archive_path("/builds/p/.cache", "/builds/p", "k1"), ".cache/k1/cache.zip");
        assert_eq!(archive_path("/cache", "/builds/p", "k1"), "../../cache/k1/cache.zip");
    }
}
