//! get_sources stage
//!
//! Brings `project_dir` to the job's commit: fetch into an existing
//! checkout or clone from scratch, check out the commit, then update
//! submodules. Hook scripts run around it unless git is disabled.

use girder_core::domain::job::{GitStrategy, SubmoduleStrategy};
use girder_core::{Result, Variable};
use tracing::debug;

use super::{Emission, StageContext};

pub(crate) const GIT_SSL_CA_INFO: &str = "GIT_SSL_CAINFO";
pub(crate) const GIT_SSL_CERT: &str = "GIT_SSL_CERT";
pub(crate) const GIT_SSL_KEY: &str = "GIT_SSL_KEY";
pub(crate) const GIT_TEMPLATE_DIR: &str = "git-template";

const LOCK_FILES: &[&str] = &[
    "index.lock",
    "shallow.lock",
    "HEAD.lock",
    "config.lock",
    "hooks/post-checkout",
];

const FULL_REFSPECS: &[&str] = &["+refs/heads/*:refs/remotes/origin/*", "+refs/tags/*:refs/tags/*"];

pub(crate) fn write_get_sources(ctx: &mut StageContext<'_>) -> Result<Emission> {
    // Both are resolved before anything is written so a bad value fails the stage
    let strategy = ctx.job.git_strategy()?;
    let submodules = ctx.job.git_submodule_strategy()?;
    debug!(
        "Job {} sources: strategy {:?}, submodules {:?}",
        ctx.job.job_id, strategy, submodules
    );

    ctx.write_exports();
    ctx.w.variable(&Variable::new("GIT_TERMINAL_PROMPT", "0"));
    ctx.w.variable(&Variable::new("GCM_INTERACTIVE", "Never"));
    ctx.write_tls_variables(&[GIT_SSL_CA_INFO, GIT_SSL_CERT, GIT_SSL_KEY]);

    if !ctx.job.executor_kind.is_shared_env() {
        write_git_ssl_config(ctx);
    }

    let uses_git = matches!(strategy, GitStrategy::Clone | GitStrategy::Fetch);
    if uses_git {
        let pre_clone = ctx.job.pre_clone_script.clone();
        ctx.write_hook("pre_clone_script", &pre_clone);
    }

    if !ctx.job.is_lfs_smudge_disabled() {
        ctx.w.variable(&Variable::new("GIT_LFS_SKIP_SMUDGE", "1"));
    }

    let project_dir = ctx.job.project_dir.clone();
    match strategy {
        GitStrategy::Fetch => {
            let template = write_template_dir(ctx);
            write_fetch(ctx, &template, submodules);
        }
        GitStrategy::Clone => {
            let template = write_template_dir(ctx);
            write_clone(ctx, &template);
        }
        GitStrategy::None => {
            ctx.w.notice("Skipping Git repository setup");
            ctx.w.mk_dir(&project_dir);
        }
        GitStrategy::Empty => {
            ctx.w
                .notice("Skipping Git repository setup and creating an empty build directory");
            ctx.w.rm_dir(&project_dir);
            ctx.w.mk_dir(&project_dir);
        }
    }

    if uses_git {
        write_checkout(ctx);
        write_submodules(ctx, submodules);
        let post_clone = ctx.job.post_clone_script.clone();
        ctx.write_hook("post_clone_script", &post_clone);
    }

    Ok(Emission::Written)
}

/// `scheme://host[:port]` of the repository URL, credentials stripped
fn remote_host(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if scheme.is_empty() || host.is_empty() {
        return None;
    }
    Some(format!("{}://{}", scheme, host))
}

fn write_git_ssl_config(ctx: &mut StageContext<'_>) {
    let documents = [
        (&ctx.job.tls_ca_chain, GIT_SSL_CA_INFO, "sslCAInfo"),
        (&ctx.job.tls_cert, GIT_SSL_CERT, "sslCert"),
        (&ctx.job.tls_key, GIT_SSL_KEY, "sslKey"),
    ];
    if documents
        .iter()
        .all(|(document, _, _)| document.as_deref().unwrap_or_default().is_empty())
    {
        return;
    }

    let Some(host) = remote_host(&ctx.job.repo.url) else {
        ctx.w
            .warning("git SSL config: Can't get repository host.");
        return;
    };

    for (document, variable, setting) in documents {
        if document.as_deref().unwrap_or_default().is_empty() {
            continue;
        }
        let key = format!("http.{}.{}", host, setting);
        let value = ctx.w.env_variable_key(variable);
        ctx.w
            .command_arg_expand("git", &["config", "--global", key.as_str(), value.as_str()]);
    }
}

fn write_template_dir(ctx: &mut StageContext<'_>) -> String {
    let template = ctx.w.mk_tmp_dir(GIT_TEMPLATE_DIR);
    let config = ctx.w.join(&[template.as_str(), "config"]);
    for (key, value) in [
        ("init.defaultBranch", "none"),
        ("fetch.recurseSubmodules", "false"),
        ("credential.interactive", "never"),
        ("gc.autoDetach", "false"),
    ] {
        ctx.w.command("git", &["config", "-f", config.as_str(), key, value]);
    }
    template
}

fn write_lock_cleanup(ctx: &mut StageContext<'_>, submodules: SubmoduleStrategy) {
    let git_dir = ctx.w.join(&[ctx.job.project_dir.as_str(), ".git"]);
    let modules_dir = ctx.w.join(&[git_dir.as_str(), "modules"]);
    let clean_modules = submodules != SubmoduleStrategy::None;

    for &file in LOCK_FILES {
        let path = ctx.w.join(&[git_dir.as_str(), file]);
        ctx.w.rm_file(&path);
        if clean_modules {
            let name = file.rsplit('/').next().unwrap_or(file);
            ctx.w.rm_files_recursive(&modules_dir, name);
        }
    }

    let refs_dir = ctx.w.join(&[git_dir.as_str(), "refs"]);
    ctx.w.rm_files_recursive(&refs_dir, "*.lock");
}

fn write_fetch(ctx: &mut StageContext<'_>, template: &str, submodules: SubmoduleStrategy) {
    let job = ctx.job;
    let depth = job.git_depth();
    let git_dir = ctx.w.join(&[job.project_dir.as_str(), ".git"]);

    ctx.w.if_directory(&git_dir);
    if depth > 0 {
        ctx.w
            .notice(&format!("Fetching changes with git depth set to {}...", depth));
    } else {
        ctx.w.notice("Fetching changes...");
    }
    ctx.cd_project_dir();
    write_lock_cleanup(ctx, submodules);
    ctx.w
        .command("git", &["config", "fetch.recurseSubmodules", "false"]);

    let clean_flags = job.git_clean_flags();
    if !clean_flags.is_empty() {
        let mut args = vec!["clean"];
        args.extend(clean_flags.iter().map(String::as_str));
        ctx.w.command("git", &args);
    }
    ctx.w.command("git", &["reset", "--hard"]);
    ctx.w
        .command("git", &["remote", "set-url", "origin", job.repo.url.as_str()]);

    let fetch_flags = job.git_fetch_flags();
    if depth > 0 {
        let depth = depth.to_string();
        let refspec = if job.repo.is_tag {
            format!("+refs/tags/{0}:refs/tags/{0}", job.repo.ref_name)
        } else {
            format!("+refs/heads/{0}:refs/remotes/origin/{0}", job.repo.ref_name)
        };
        let mut args = vec!["fetch", "--depth", depth.as_str(), "origin"];
        args.extend(fetch_flags.iter().map(String::as_str));
        args.push(&refspec);
        ctx.w.command("git", &args);
    } else {
        let mut args = vec!["fetch", "origin"];
        args.extend(fetch_flags.iter().map(String::as_str));
        args.extend_from_slice(FULL_REFSPECS);

        let shallow = ctx.w.join(&[git_dir.as_str(), "shallow"]);
        ctx.w.if_file(&shallow);
        let mut unshallow = args.clone();
        unshallow.push("--unshallow");
        ctx.w.command("git", &unshallow);
        ctx.w.else_branch();
        ctx.w.command("git", &args);
        ctx.w.end_if();
    }

    ctx.w.else_branch();
    write_clone(ctx, template);
    ctx.w.end_if();
}

fn write_clone(ctx: &mut StageContext<'_>, template: &str) {
    let job = ctx.job;
    let depth = job.git_depth();
    let ref_name = job.repo.ref_name.as_str();

    ctx.w.rm_dir(&job.project_dir);
    match (depth, ref_name.is_empty()) {
        (0, true) => ctx.w.notice("Cloning repository..."),
        (0, false) => ctx.w.notice(&format!("Cloning repository for {}...", ref_name)),
        (depth, _) => ctx.w.notice(&format!(
            "Cloning repository for {} with git depth set to {}...",
            ref_name, depth
        )),
    }

    let depth_arg = depth.to_string();
    let mut args = vec!["clone", "--no-checkout"];
    if depth > 0 {
        args.extend(["--depth", depth_arg.as_str()]);
        if !ref_name.is_empty() {
            args.extend(["--branch", ref_name]);
        }
    }
    args.extend([job.repo.url.as_str(), job.project_dir.as_str(), "--template", template]);
    ctx.w.command("git", &args);
    ctx.cd_project_dir();
}

fn write_checkout(ctx: &mut StageContext<'_>) {
    let job = ctx.job;
    if !job.git_checkout() {
        ctx.w.notice("Skipping Git checkout");
        return;
    }

    let short_sha: String = job.repo.sha.chars().take(8).collect();
    ctx.w.notice(&format!(
        "Checking out {} as {}...",
        short_sha, job.repo.ref_name
    ));
    ctx.w.command("git", &["checkout", "-f", "-q", job.repo.sha.as_str()]);

    let clean_flags = job.git_clean_flags();
    if !clean_flags.is_empty() {
        let mut args = vec!["clean"];
        args.extend(clean_flags.iter().map(String::as_str));
        ctx.w.command("git", &args);
    }

    if !job.is_lfs_smudge_disabled() {
        ctx.w.if_cmd("git", &["lfs", "version"]);
        ctx.w.command("git", &["lfs", "pull"]);
        ctx.w.empty_line();
        ctx.w.end_if();
    }
}

fn write_submodules(ctx: &mut StageContext<'_>, strategy: SubmoduleStrategy) {
    let recursive = match strategy {
        SubmoduleStrategy::None => {
            ctx.w.notice("Skipping Git submodules setup");
            return;
        }
        SubmoduleStrategy::Normal => false,
        SubmoduleStrategy::Recursive => true,
    };

    if recursive {
        ctx.w
            .notice("Updating/initializing submodules recursively...");
    } else {
        ctx.w.notice("Updating/initializing submodules...");
    }

    let mut sync = vec!["submodule", "sync"];
    let mut update = vec!["submodule", "update", "--init"];
    let mut foreach = vec!["submodule", "foreach"];
    if recursive {
        sync.push("--recursive");
        update.push("--recursive");
        foreach.push("--recursive");
    }

    let mut clean_flags = ctx.job.git_clean_flags();
    if clean_flags.is_empty() {
        clean_flags.push("-ffdx".to_string());
    }
    let clean = format!("git clean {}", clean_flags.join(" "));
    let mut foreach_clean = foreach.clone();
    foreach_clean.push(&clean);
    let mut foreach_reset = foreach.clone();
    foreach_reset.push("git reset --hard");

    ctx.w.command("git", &["submodule", "init"]);
    ctx.w.command("git", &sync);
    ctx.w.command("git", &foreach_clean);
    ctx.w.command("git", &foreach_reset);

    ctx.w.if_cmd_with_output("git", &update);
    ctx.w.notice("Updated submodules");
    ctx.w.command("git", &sync);
    ctx.w.else_branch();
    ctx.w.warning("Updating submodules failed. Retrying...");
    ctx.w.command("git", &sync);
    ctx.w.command("git", &update);
    ctx.w.command("git", &foreach_reset);
    ctx.w.end_if();

    ctx.w.command("git", &foreach_clean);

    if !ctx.job.is_lfs_smudge_disabled() {
        ctx.w.if_cmd("git", &["lfs", "version"]);
        ctx.w.notice("Pulling LFS files...");
        foreach.push("git lfs pull");
        ctx.w.command("git", &foreach);
        ctx.w.end_if();
    }
}
