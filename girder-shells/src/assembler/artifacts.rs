//! download_artifacts and upload_artifacts stages

use girder_core::Result;
use girder_core::domain::job::ArtifactOptions;

use super::{Emission, StageContext};

pub(crate) fn write_download_artifacts(ctx: &mut StageContext<'_>) -> Result<Emission> {
    let job = ctx.job;
    let dependencies = job.dependencies_with_artifacts();
    if dependencies.is_empty() {
        return Ok(Emission::Skip);
    }

    ctx.write_exports();
    ctx.cd_project_dir();

    let helper = job.runner_helper_cmd.as_str();
    for dependency in dependencies {
        let id = dependency.id.to_string();
        let args = [
            "artifacts-downloader",
            "--url",
            job.runner_url.as_str(),
            "--token",
            dependency.token.as_str(),
            "--id",
            id.as_str(),
        ];

        ctx.guard_helper("Artifacts downloading", |ctx| {
            let label = if dependency.name.is_empty() {
                id.clone()
            } else {
                format!("{} ({})", dependency.name, id)
            };
            ctx.w
                .notice(&format!("Downloading artifacts for {}...", label));
            ctx.w.command(helper, &args);
        });
    }

    Ok(Emission::Written)
}

/// Helper arguments for one artifact entry; `None` when it selects no files
fn uploader_args(job_url: &str, token: &str, job_id: &str, artifact: &ArtifactOptions) -> Option<Vec<String>> {
    let mut selection = Vec::new();
    for path in &artifact.paths {
        selection.push("--path".to_string());
        selection.push(path.clone());
    }
    for path in &artifact.exclude {
        selection.push("--exclude".to_string());
        selection.push(path.clone());
    }
    if artifact.untracked {
        selection.push("--untracked".to_string());
    }
    if selection.is_empty() {
        return None;
    }

    let mut args: Vec<String> = [
        "artifacts-uploader",
        "--url",
        job_url,
        "--token",
        token,
        "--id",
        job_id,
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();
    args.extend(selection);

    for (flag, value) in [
        ("--name", &artifact.name),
        ("--expire-in", &artifact.expire_in),
        ("--artifact-format", &artifact.artifact_format),
        ("--artifact-type", &artifact.artifact_type),
    ] {
        if !value.is_empty() {
            args.push(flag.to_string());
            args.push(value.clone());
        }
    }

    Some(args)
}

pub(crate) fn write_upload_artifacts(ctx: &mut StageContext<'_>) -> Result<Emission> {
    let job = ctx.job;
    if job.runner_url.is_empty() {
        return Ok(Emission::Skip);
    }

    let job_id = job.job_id.to_string();
    let uploads: Vec<Vec<String>> = job
        .options
        .artifacts
        .iter()
        .filter(|artifact| artifact.when.applies(job.job_status))
        .filter_map(|artifact| uploader_args(&job.runner_url, &job.token, &job_id, artifact))
        .collect();
    if uploads.is_empty() {
        return Ok(Emission::Skip);
    }

    ctx.write_exports();
    ctx.cd_project_dir();

    let helper = job.runner_helper_cmd.as_str();
    for args in uploads {
        ctx.guard_helper("Uploading artifacts", |ctx| {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            ctx.w.notice("Uploading artifacts...");
            ctx.w.command(helper, &args);
        });
    }

    Ok(Emission::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ScriptGenerator;
    use crate::assembler::tests::{bash_body, bash_job};
    use girder_core::BuildStage;
    use girder_core::domain::job::{Dependency, JobStatus, When};

    fn dependency(id: i64, artifacts_file: &str) -> Dependency {
        Dependency {
            id,
            token: format!("token-{}", id),
            name: "compile".to_string(),
            artifacts_file: artifacts_file.to_string(),
        }
    }

    #[test]
    fn test_download_only_dependencies_with_artifacts() {
        let mut job = bash_job();
        job.options.dependencies = vec![dependency(7, "artifacts.zip"), dependency(8, "")];
        let body = bash_body(BuildStage::DownloadArtifacts, &job);
        assert!(body.contains(
            "  gitlab-runner-helper artifacts-downloader --url https://ci.example.com --token token-7 --id 7\n"
        ));
        assert!(body.contains("Downloading artifacts for compile (7)..."));
        assert!(!body.contains("token-8"));
    }

    #[test]
    fn test_download_skipped_without_artifacts() {
        let mut job = bash_job();
        job.options.dependencies = vec![dependency(8, "")];
        let generated = ScriptGenerator::default()
            .generate(BuildStage::DownloadArtifacts, &job)
            .unwrap();
        assert!(generated.is_skip());
    }

    #[test]
    fn test_uploader_argument_order() {
        let artifact = ArtifactOptions {
            name: "report".to_string(),
            paths: vec!["out/".to_string()],
            exclude: vec!["out/tmp".to_string()],
            untracked: true,
            expire_in: "1 week".to_string(),
            artifact_format: "zip".to_string(),
            artifact_type: "archive".to_string(),
            ..Default::default()
        };
        let args = uploader_args("https://ci", "tok", "1", &artifact).unwrap();
        assert_eq!(
            args,
            [
                "artifacts-uploader",
                "--url",
                "https://ci",
                "--token",
                "tok",
                "--id",
                "1",
                "--path",
                "out/",
                "--exclude",
                "out/tmp",
                "--untracked",
                "--name",
                "report",
                "--expire-in",
                "1 week",
                "--artifact-format",
                "zip",
                "--artifact-type",
                "archive",
            ]
        );
        assert_eq!(uploader_args("u", "t", "1", &ArtifactOptions::default()), None);
    }

    #[test]
    fn test_upload_stage() {
        let mut job = bash_job();
        job.options.artifacts.push(ArtifactOptions {
            paths: vec!["dist".to_string()],
            ..Default::default()
        });
        let body = bash_body(BuildStage::UploadArtifacts, &job);
        assert!(body.contains("Uploading artifacts..."));
        assert!(body.contains(
            "  gitlab-runner-helper artifacts-uploader --url https://ci.example.com --token job-token --id 1 --path dist\n"
        ));
    }

    #[test]
    fn test_upload_skips() {
        let mut job = bash_job();
        job.options.artifacts.push(ArtifactOptions {
            paths: vec!["dist".to_string()],
            when: When::OnFailure,
            ..Default::default()
        });
        let generator = ScriptGenerator::default();
        assert!(generator.generate(BuildStage::UploadArtifacts, &job).unwrap().is_skip());

        job.job_status = JobStatus::Failed;
        assert!(!generator.generate(BuildStage::UploadArtifacts, &job).unwrap().is_skip());

        job.runner_url.clear();
        assert!(generator.generate(BuildStage::UploadArtifacts, &job).unwrap().is_skip());
    }
}
