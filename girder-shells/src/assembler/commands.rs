//! user_script and after_script stages

use girder_core::Result;

use super::{Emission, StageContext};

pub(crate) fn write_user_script(ctx: &mut StageContext<'_>) -> Result<Emission> {
    let job = ctx.job;
    if job.commands.trim().is_empty()
        && job.pre_build_script.trim().is_empty()
        && job.post_build_script.trim().is_empty()
    {
        return Ok(Emission::Skip);
    }

    ctx.write_exports();
    ctx.cd_project_dir();

    ctx.write_hook("pre_build_script", &job.pre_build_script);
    let lines: Vec<&str> = job.commands.lines().collect();
    ctx.write_commands(&lines);
    ctx.write_hook("post_build_script", &job.post_build_script);

    Ok(Emission::Written)
}

pub(crate) fn write_after_script(ctx: &mut StageContext<'_>) -> Result<Emission> {
    let job = ctx.job;
    if job.options.after_script.iter().all(|entry| entry.trim().is_empty()) {
        return Ok(Emission::Skip);
    }

    ctx.write_exports();
    ctx.cd_project_dir();

    ctx.w.notice("Running after script...");
    let entries: Vec<&str> = job.options.after_script.iter().map(String::as_str).collect();
    ctx.write_commands(&entries);

    Ok(Emission::Written)
}
