//! Runs generated scripts through a real bash when one is installed

use std::path::Path;
use std::process::{Command, Output};

use girder_core::features::{POSIXLY_CORRECT_ESCAPES, USE_NEW_SHELL_ESCAPE};
use girder_core::{BuildStage, JobContext, Variable};
use girder_shells::trap::decode_stream;
use girder_shells::{ScriptGenerator, StageScript};
use tempfile::TempDir;

const TRICKY: &str = "it's \"quoted\" $HOME `id` \\ back\ttab\nnew line ünïcode !#&;|*?";

fn has_bash() -> bool {
    Command::new("bash")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

struct Workspace {
    _root: TempDir,
    project: String,
    tmp: String,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("project");
        let tmp = root.path().join("project.tmp");
        std::fs::create_dir_all(&project).unwrap();
        Self {
            project: project.to_string_lossy().into_owned(),
            tmp: tmp.to_string_lossy().into_owned(),
            _root: root,
        }
    }

    fn job(&self) -> JobContext {
        let mut job = JobContext::new(1, self.project.clone(), self.tmp.clone());
        job.job_name = "exec".to_string();
        job
    }

    fn run(&self, stage: BuildStage, job: &JobContext) -> Output {
        self.run_as(&format!("{}.sh", stage), stage, job)
    }

    fn run_as(&self, file_name: &str, stage: BuildStage, job: &JobContext) -> Output {
        let script = match ScriptGenerator::default().generate(stage, job).unwrap() {
            StageScript::Script(script) => script,
            StageScript::Skip => panic!("{} was skipped", stage),
        };
        let path = Path::new(&self.project).join(file_name);
        std::fs::write(&path, script).unwrap();
        Command::new("bash")
            .arg(&path)
            .current_dir(&self.project)
            .output()
            .unwrap()
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(Path::new(&self.project).join(name)).unwrap()
    }
}

#[test]
fn test_variables_survive_every_escape_mode() {
    if !has_bash() {
        eprintln!("bash not available, skipping");
        return;
    }

    let modes = [
        ("ansi-c", vec![(USE_NEW_SHELL_ESCAPE, true)]),
        ("posix", vec![(POSIXLY_CORRECT_ESCAPES, true)]),
        ("legacy", vec![(USE_NEW_SHELL_ESCAPE, false)]),
    ];
    for (mode, flags) in modes {
        let workspace = Workspace::new();
        let mut job = workspace.job();
        for (flag, value) in flags {
            job.feature_flags.insert(flag.to_string(), value);
        }
        job.variables.push(Variable::new("TRICKY", TRICKY).with_raw());
        job.commands = "printf '%s' \"$TRICKY\" > value.txt".to_string();

        let output = workspace.run(BuildStage::UserScript, &job);
        assert!(output.status.success(), "{}: {:?}", mode, output);
        assert_eq!(workspace.read("value.txt"), TRICKY, "{}", mode);
    }
}

#[test]
fn test_file_variable_written_and_cleaned_up() {
    if !has_bash() {
        eprintln!("bash not available, skipping");
        return;
    }

    let workspace = Workspace::new();
    let mut job = workspace.job();
    job.variables
        .push(Variable::file("CERT", "-----BEGIN-----\nline 'two'\n-----END-----"));
    job.commands = "cat \"$CERT\" > cert.txt".to_string();

    let output = workspace.run(BuildStage::UserScript, &job);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        workspace.read("cert.txt"),
        "-----BEGIN-----\nline 'two'\n-----END-----"
    );
    let backing = Path::new(&workspace.tmp).join("CERT");
    assert!(backing.exists());

    let output = workspace.run(BuildStage::CleanupFileVariables, &job);
    assert!(output.status.success(), "{:?}", output);
    assert!(!backing.exists());
}

#[test]
fn test_failing_command_stops_the_script() {
    if !has_bash() {
        eprintln!("bash not available, skipping");
        return;
    }

    let workspace = Workspace::new();
    let mut job = workspace.job();
    job.commands = "sh -c 'exit 3'\ntouch not-reached".to_string();

    let output = workspace.run(BuildStage::UserScript, &job);
    assert_eq!(output.status.code(), Some(3));
    assert!(!Path::new(&workspace.project).join("not-reached").exists());
}

#[test]
fn test_trap_reports_exit_code() {
    if !has_bash() {
        eprintln!("bash not available, skipping");
        return;
    }

    let workspace = Workspace::new();
    let mut job = workspace.job();
    job.trap_exit = true;
    job.commands = "sh -c 'exit 3'".to_string();

    let output = workspace.run(BuildStage::UserScript, &job);
    assert_eq!(output.status.code(), Some(0));

    let report = decode_stream(output.stdout.as_slice()).unwrap().unwrap();
    assert_eq!(report.command_exit_code, 3);
    assert!(report.script.ends_with("user_script.sh"));
}

#[test]
fn test_trap_report_escapes_script_path() {
    if !has_bash() {
        eprintln!("bash not available, skipping");
        return;
    }

    let workspace = Workspace::new();
    let mut job = workspace.job();
    job.trap_exit = true;
    job.commands = "true".to_string();

    let output = workspace.run_as("odd \"name\\.sh", BuildStage::UserScript, &job);
    assert_eq!(output.status.code(), Some(0));

    let report = decode_stream(output.stdout.as_slice()).unwrap().unwrap();
    assert_eq!(report.command_exit_code, 0);
    assert!(report.script.ends_with("odd \"name\\.sh"));
}
