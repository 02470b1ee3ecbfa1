use assert_cmd::Command;
use serde_json::Value;
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct MmjRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
}

impl MmjRun {
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// The structured error printed on stderr (stdout is never a TTY here).
    pub fn error_json(&self) -> Value {
        let start = self.stderr.find("{\n  \"error\"").expect("structured error on stderr");
        serde_json::from_str(&self.stderr[start..]).expect("valid error JSON")
    }
}

pub fn run_mmj<I, S>(root: &Path, args: I) -> MmjRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_mmj_with_env(root, args, std::iter::empty::<(String, String)>())
}

pub fn run_mmj_with_env<I, S, E, K, V>(root: &Path, args: I, env_vars: E) -> MmjRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    run_mmj_inner(root, args, env_vars, None)
}

/// Run with `input` piped to stdin, for commands that ask questions.
pub fn run_mmj_with_stdin<I, S>(root: &Path, args: I, input: &str) -> MmjRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_mmj_inner(root, args, std::iter::empty::<(String, String)>(), Some(input))
}

fn run_mmj_inner<I, S, E, K, V>(root: &Path, args: I, env_vars: E, input: Option<&str>) -> MmjRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mmj"));
    cmd.current_dir(root);
    for var in ["JIRA_TOKEN", "JIRA_USER", "JIRA_PASS", "MMJ_CONFIG"] {
        cmd.env_remove(var);
    }
    cmd.args(args);
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "mindmap_jira=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", root);
    if let Some(input) = input {
        cmd.write_stdin(input);
    }

    let start = Instant::now();
    let output = cmd.output().expect("run mmj");
    let duration = start.elapsed();

    MmjRun {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status,
        duration,
    }
}

/// Env with a dummy token, for commands that only need cached metadata.
pub fn token_env() -> [(&'static str, &'static str); 1] {
    [("JIRA_TOKEN", "test-token")]
}
