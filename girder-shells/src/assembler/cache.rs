//! restore_cache and archive_cache stages
//!
//! Each cache entry listing paths (or `untracked`) becomes one helper
//! invocation. Restore walks the entry key, its fallback keys and
//! `CACHE_FALLBACK_KEY` until one extraction succeeds.

use girder_cache::{CacheKey, resolve_key};
use girder_core::domain::job::{CacheOptions, CachePolicy};
use girder_core::{GeneratorError, Result};
use tracing::{debug, warn};

use super::{Emission, StageContext};

const FALLBACK_KEY_VARIABLE: &str = "CACHE_FALLBACK_KEY";
const PROTECTED_SUFFIX: &str = "-protected";

pub(crate) fn write_restore_cache(ctx: &mut StageContext<'_>) -> Result<Emission> {
    let job = ctx.job;
    let entries: Vec<&CacheOptions> = job
        .options
        .cache
        .iter()
        .filter(|options| !options.archiver_args().is_empty())
        .collect();
    if entries.is_empty() {
        return Ok(Emission::Skip);
    }

    ctx.write_exports();
    ctx.cd_project_dir();

    for options in entries {
        let Some(key) = resolve(ctx, &options.key) else {
            continue;
        };

        if !entry_policy(ctx, options, &key)?.allows_pull() {
            ctx.w
                .notice(&format!("Not downloading cache {} due to policy", key.human));
            continue;
        }

        let mut keys = vec![key];
        for fallback in &options.fallback_keys {
            if job.expand(fallback).is_empty() {
                continue;
            }
            if let Some(key) = resolve(ctx, fallback) {
                keys.push(key);
            }
        }
        if let Some(key) = fallback_key_variable(ctx) {
            keys.push(key);
        }

        let paths = options.paths.clone();
        ctx.guard_helper("Extracting cache", |ctx| write_extract(ctx, &keys, &paths));
    }

    Ok(Emission::Written)
}

pub(crate) fn write_archive_cache(ctx: &mut StageContext<'_>) -> Result<Emission> {
    let job = ctx.job;
    let entries: Vec<&CacheOptions> = job
        .options
        .cache
        .iter()
        .filter(|options| options.when.applies(job.job_status))
        .filter(|options| !options.archiver_args().is_empty())
        .collect();
    if entries.is_empty() {
        return Ok(Emission::Skip);
    }

    ctx.write_exports();
    ctx.cd_project_dir();

    for options in entries {
        let Some(key) = resolve(ctx, &options.key) else {
            continue;
        };

        if !entry_policy(ctx, options, &key)?.allows_push() {
            ctx.w
                .notice(&format!("Not uploading cache {} due to policy", key.human));
            continue;
        }

        let mut args = vec![
            "cache-archiver".to_string(),
            "--file".to_string(),
            key.archive_file.clone(),
        ];
        args.extend(options.archiver_args());
        if let Some(url) = cache_url(ctx, &key, true) {
            args.push("--url".to_string());
            args.push(url);
        }

        let helper = job.runner_helper_cmd.as_str();
        ctx.guard_helper("Creating cache", |ctx| {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            ctx.w.notice(&format!("Creating cache {}...", key.human));
            ctx.w.if_cmd_with_output(helper, &args);
            ctx.w.notice("Created cache");
            ctx.w.else_branch();
            ctx.w.warning("Failed to create cache");
            ctx.w.end_if();
        });
    }

    Ok(Emission::Written)
}

/// Resolves a user key, surfacing sanitizer warnings in the job log
fn resolve(ctx: &mut StageContext<'_>, user_key: &str) -> Option<CacheKey> {
    let resolution = resolve_key(ctx.job, user_key, ctx.features.hash_cache_keys);
    if let Some(warning) = &resolution.warning {
        ctx.w.warning(warning);
    }
    if resolution.key.is_none() {
        debug!("Cache key {:?} is empty, entry disabled", user_key);
    }
    resolution.key
}

fn entry_policy(
    ctx: &StageContext<'_>,
    options: &CacheOptions,
    key: &CacheKey,
) -> Result<CachePolicy> {
    ctx.job
        .expand(&options.policy)
        .parse::<CachePolicy>()
        .map_err(|error| match error {
            GeneratorError::InvalidJobContext(message) => {
                GeneratorError::InvalidJobContext(format!("{} for {}", message, key.human))
            }
            other => other,
        })
}

fn fallback_key_variable(ctx: &mut StageContext<'_>) -> Option<CacheKey> {
    let job = ctx.job;
    let raw = job.variables.value(FALLBACK_KEY_VARIABLE)?;
    if raw.is_empty() {
        return None;
    }

    let key = resolve(ctx, raw)?;
    if key.human.ends_with(PROTECTED_SUFFIX) {
        ctx.w.warning(&format!(
            "{} {:?} not allowed to end in {:?}",
            FALLBACK_KEY_VARIABLE, key.human, PROTECTED_SUFFIX
        ));
        return None;
    }
    Some(key)
}

/// Signed URL for `key`; failures only cost the `--url` argument
fn cache_url(ctx: &mut StageContext<'_>, key: &CacheKey, upload: bool) -> Option<String> {
    let result = if upload {
        ctx.signer.upload_url(ctx.job, &key.object_key)
    } else {
        ctx.signer.download_url(ctx.job, &key.object_key)
    };

    match result {
        Ok(url) => url,
        Err(error) => {
            let error = GeneratorError::from(error);
            warn!("No URL for cache {} ({}): {}", key.human, error.kind(), error);
            ctx.w
                .warning(&format!("Failed to obtain URL for cache {}", key.human));
            None
        }
    }
}

/// Tries `keys` in order, each attempt nested in the failure branch of
/// the previous one
fn write_extract(ctx: &mut StageContext<'_>, keys: &[CacheKey], paths: &[String]) {
    let Some((key, fallbacks)) = keys.split_first() else {
        return;
    };

    ctx.w.notice(&format!("Checking cache for {}...", key.human));

    let mut args = vec![
        "cache-extractor".to_string(),
        "--file".to_string(),
        key.archive_file.clone(),
    ];
    if let Some(url) = cache_url(ctx, key, false) {
        args.push("--url".to_string());
        args.push(url);
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let helper = ctx.job.runner_helper_cmd.as_str();
    ctx.w.if_cmd_with_output(helper, &args);
    ctx.w.notice("Successfully extracted cache");
    ctx.w.else_branch();
    ctx.w.warning("Failed to extract cache");

    if ctx.features.clean_up_failed_cache_extract {
        for path in paths {
            ctx.w.printf(&format!("Removing {}", path));
            ctx.w.rm_dir(path);
        }
    }

    write_extract(ctx, fallbacks, paths);
    ctx.w.end_if();
}
