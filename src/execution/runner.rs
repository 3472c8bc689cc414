//! External Command Runners
//!
//! Process spawning for the three external executor kinds: plain
//! shell commands, cluster-CLI subcommands, and companion-tool
//! subcommands. Each runner exposes the same blocking
//! `run(command, args, env, cwd)` capability; routing between them
//! is the dispatcher's job.
//!
//! # Binary Resolution Priority
//!
//! The cluster CLI and companion tool binaries are resolved once per
//! process, in order:
//! 1. Environment override (`OPSFLOW_KUBECTL` / `OPSFLOW_TOOL`)
//! 2. Next to the opsflow executable
//! 3. System PATH

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use log::{debug, info};
use once_cell::sync::Lazy;

use crate::workflow::VariableMap;

/// Lazily-resolved path to the cluster-control CLI binary.
pub static KUBECTL_PATH: Lazy<PathBuf> = Lazy::new(|| resolve_binary("OPSFLOW_KUBECTL", "kubectl"));

/// Lazily-resolved path to the companion admin tool binary.
pub static TOOL_PATH: Lazy<PathBuf> = Lazy::new(|| resolve_binary("OPSFLOW_TOOL", "opsctl"));

fn resolve_binary(env_var: &str, name: &str) -> PathBuf {
    if let Ok(overridden) = std::env::var(env_var) {
        info!("Using {} override for {}: {}", env_var, name, overridden);
        return PathBuf::from(overridden);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled = exe_dir.join(name);
            if bundled.exists() {
                info!("Using bundled {}: {}", name, bundled.display());
                return bundled;
            }
        }
    }

    debug!("Using {} from PATH", name);
    PathBuf::from(name)
}

/// Captured result of one external command.
#[derive(Debug)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// True if the command exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable exit status for logs and reports.
    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    fn from_output(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A single blocking `run` capability shared by all executors.
pub trait CommandRunner {
    /// Runs `command` with `args`, blocking until it completes.
    fn run(
        &self,
        command: &str,
        args: &[String],
        env: &VariableMap,
        cwd: &Path,
    ) -> io::Result<CommandOutput>;
}

fn spawn(
    program: &Path,
    prefix_arg: Option<&str>,
    args: &[String],
    env: &VariableMap,
    cwd: &Path,
) -> io::Result<CommandOutput> {
    let mut cmd = Command::new(program);
    if let Some(prefix) = prefix_arg {
        cmd.arg(prefix);
    }
    cmd.args(args);
    cmd.envs(env);
    cmd.current_dir(cwd);

    debug!(
        "Running: {} {}{}",
        program.display(),
        prefix_arg.map(|p| format!("{} ", p)).unwrap_or_default(),
        args.join(" ")
    );

    cmd.output().map(CommandOutput::from_output)
}

/// Runs the step command directly as a program on PATH.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(
        &self,
        command: &str,
        args: &[String],
        env: &VariableMap,
        cwd: &Path,
    ) -> io::Result<CommandOutput> {
        spawn(Path::new(command), None, args, env, cwd)
    }
}

/// Runs the step command as a subcommand of the cluster CLI.
pub struct KubectlRunner;

impl CommandRunner for KubectlRunner {
    fn run(
        &self,
        command: &str,
        args: &[String],
        env: &VariableMap,
        cwd: &Path,
    ) -> io::Result<CommandOutput> {
        spawn(&KUBECTL_PATH, Some(command), args, env, cwd)
    }
}

/// Runs the step command as a subcommand of the companion tool.
pub struct ToolRunner;

impl CommandRunner for ToolRunner {
    fn run(
        &self,
        command: &str,
        args: &[String],
        env: &VariableMap,
        cwd: &Path,
    ) -> io::Result<CommandOutput> {
        spawn(&TOOL_PATH, Some(command), args, env, cwd)
    }
}
