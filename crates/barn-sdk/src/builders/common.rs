//! Command runner shared by every target builder.
//!
//! All external toolchains are invoked through [`run_tool`], which captures
//! their output and turns a non-zero exit into [`BarnError::ToolchainFailure`]
//! carrying the tool's stderr verbatim. In dry-run mode commands are printed
//! and skipped.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::types::BarnError;

/// Number of trailing stdout lines reported when a failing tool wrote nothing to stderr.
const STDOUT_TAIL_LINES: usize = 40;

/// Options shared by all builders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Log every command line and the output of successful commands.
    pub verbose: bool,
    /// Print commands instead of running them.
    pub dry_run: bool,
}

/// An external command to run, with a human-readable description used in errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    description: String,
    program: String,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Creates a command. `description` names the step, e.g. `"xcodebuild archive"`.
    pub fn new(description: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Working directory of the process. Relative program paths such as
    /// `./gradlew` are resolved against it.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments as lossy UTF-8 strings.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Renders the command line for logs and dry-run output.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in self.arg_strings() {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("'{arg}'"));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    fn resolved_program(&self) -> PathBuf {
        let program = Path::new(&self.program);
        match &self.current_dir {
            Some(dir) if program.is_relative() && program.components().count() > 1 => {
                dir.join(program)
            }
            _ => program.to_path_buf(),
        }
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs `cmd` to completion.
///
/// # Errors
///
/// [`BarnError::ToolchainFailure`] when the process cannot be spawned
/// (`code: None`, OS error as stderr) or exits unsuccessfully.
pub async fn run_tool(cmd: &ToolCommand, options: RunOptions) -> Result<ToolOutput, BarnError> {
    if options.dry_run {
        match cmd.working_dir() {
            Some(dir) => println!("[dry-run] (in {}) {}", dir.display(), cmd.command_line()),
            None => println!("[dry-run] {}", cmd.command_line()),
        }
        return Ok(ToolOutput::default());
    }

    tracing::debug!(
        description = cmd.description(),
        cwd = ?cmd.working_dir(),
        "running {}",
        cmd.command_line()
    );
    if options.verbose {
        println!("  Running: {}", cmd.command_line());
    }

    let mut command = tokio::process::Command::new(cmd.resolved_program());
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cmd.working_dir() {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|e| BarnError::ToolchainFailure {
            description: cmd.description().to_string(),
            code: None,
            stderr: format!("failed to start {}: {e}", cmd.program()),
        })?;

    if !output.status.success() {
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if stderr.trim().is_empty() {
            stderr = stdout_tail(&output.stdout);
        }
        tracing::debug!(
            description = cmd.description(),
            code = ?output.status.code(),
            "command failed"
        );
        return Err(BarnError::ToolchainFailure {
            description: cmd.description().to_string(),
            code: output.status.code(),
            stderr,
        });
    }

    if options.verbose && !output.stdout.is_empty() {
        tracing::debug!(
            description = cmd.description(),
            "{}",
            String::from_utf8_lossy(&output.stdout).trim_end()
        );
    }

    Ok(ToolOutput {
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Runs a step whose failure must not fail the build; failures are logged as warnings.
///
/// Returns whether the step succeeded.
pub async fn run_best_effort(cmd: &ToolCommand, options: RunOptions) -> bool {
    match run_tool(cmd, options).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("{} failed, continuing: {e}", cmd.description());
            false
        }
    }
}

/// Path of `path` relative to `base`, or `path` itself when it lies outside `base`.
pub(crate) fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

fn stdout_tail(stdout: &[u8]) -> String {
    let text = String::from_utf8_lossy(stdout);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDOUT_TAIL_LINES);
    lines[start..].join("\n")
}
