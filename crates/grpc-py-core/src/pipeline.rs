//! The `create` and `clean` commands.
//!
//! `create` runs three external steps in order (protoc, ruff check, ruff
//! format) and stops at the first one that fails. `clean` deletes the files
//! `create` would have produced.
//!
//! Neither command prints anything itself. Progress goes through a
//! [`Reporter`], so the binary decides how it looks and tests can record it.

use crate::error::{Error, Result};
use crate::naming::{self, GeneratedFiles};
use crate::tool::{CommandLine, ToolRunner, Toolchain};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Output directories for the three generated files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    /// `--python_out`
    pub python: PathBuf,
    /// `--grpc_python_out`
    pub grpc_python: PathBuf,
    /// `--pyi_out`
    pub pyi: PathBuf,
}

impl OutputDirs {
    /// Uses `dir` for all three outputs
    pub fn uniform(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            python: dir.clone(),
            grpc_python: dir.clone(),
            pyi: dir,
        }
    }

    /// The directories in `python`, `grpc_python`, `pyi` order
    pub fn as_array(&self) -> [&Path; 3] {
        [
            self.python.as_path(),
            self.grpc_python.as_path(),
            self.pyi.as_path(),
        ]
    }

    /// Pairs each directory with the file generated into it
    pub fn pair<'a>(&'a self, files: &'a GeneratedFiles) -> [(&'a Path, &'a str); 3] {
        [
            (self.python.as_path(), files.python.as_str()),
            (self.grpc_python.as_path(), files.grpc_python.as_str()),
            (self.pyi.as_path(), files.pyi.as_str()),
        ]
    }

    /// Creates every directory that does not exist yet
    pub fn ensure_exist(&self) -> Result<()> {
        for dir in self.as_array() {
            if !dir.is_dir() {
                debug!("Creating {}", dir.display());
            }
            fs::create_dir_all(dir).map_err(|e| Error::directory_create(dir, e))?;
        }
        Ok(())
    }
}

/// Input of the `create` command
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Absolute path to the `.proto` file
    pub proto_file: PathBuf,
    /// Where generated files go
    pub outputs: OutputDirs,
}

/// One external step of `create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Running protoc on the named proto file
    Generate {
        /// Base name of the proto file
        proto_filename: String,
    },
    /// `ruff check --fix`
    Lint,
    /// `ruff format`
    Format,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate { .. } => f.write_str("code generation"),
            Self::Lint => f.write_str("lint"),
            Self::Format => f.write_str("format"),
        }
    }
}

/// Outcome of a step or a single removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Finished successfully
    Done,
    /// Failed
    Failed,
}

/// What `clean` did with one generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    /// The file existed and was deleted
    Removed(PathBuf),
    /// The file did not exist
    Skipped(PathBuf),
}

/// Receives progress from `create` and `clean`.
///
/// All methods default to doing nothing.
pub trait Reporter {
    /// A `create` step is about to run
    fn step_started(&mut self, step: &Step) {
        let _ = step;
    }

    /// A `create` step finished
    fn step_finished(&mut self, step: &Step, status: StepStatus) {
        let _ = (step, status);
    }

    /// protoc reported success for `file` in `dir`
    fn generated(&mut self, file: &str, dir: &Path) {
        let _ = (file, dir);
    }

    /// `clean` is starting for `proto_file`
    fn clean_started(&mut self, proto_file: &Path) {
        let _ = proto_file;
    }

    /// `file` exists and is about to be removed
    fn removal_started(&mut self, file: &str) {
        let _ = file;
    }

    /// Removal of `file` finished
    fn removal_finished(&mut self, file: &str, status: StepStatus) {
        let _ = (file, status);
    }

    /// `file` does not exist
    fn skipped(&mut self, file: &str) {
        let _ = file;
    }

    /// `clean` went through every file without a failed removal
    fn clean_finished(&mut self) {}
}

/// A reporter that discards all progress
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Generates bindings for `request.proto_file`, then lints and formats them.
pub fn create(
    request: &GenerationRequest,
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let proto_file = &request.proto_file;
    if !proto_file.exists() {
        return Err(Error::proto_file_not_found(proto_file));
    }
    if !proto_file.is_file() {
        return Err(Error::not_a_file(proto_file));
    }

    let proto_filename = naming::proto_file_name(proto_file)?;
    let files = GeneratedFiles::from_proto_name(proto_filename)?;
    let proto_dir = proto_file.parent().unwrap_or_else(|| Path::new("."));
    let outputs = &request.outputs;

    outputs.ensure_exist()?;

    let generate = Step::Generate {
        proto_filename: proto_filename.to_string(),
    };
    let command = toolchain.protoc(
        proto_dir,
        proto_filename,
        &outputs.python,
        &outputs.grpc_python,
        &outputs.pyi,
    );
    run_step(&generate, &command, runner, reporter)?;

    for (dir, file) in outputs.pair(&files) {
        reporter.generated(file, dir);
    }

    let dirs = outputs.as_array();
    run_step(&Step::Lint, &toolchain.lint(&dirs), runner, reporter)?;
    run_step(&Step::Format, &toolchain.format(&dirs), runner, reporter)?;

    info!("Generated bindings for {}", proto_filename);
    Ok(())
}

fn run_step(
    step: &Step,
    command: &CommandLine,
    runner: &dyn ToolRunner,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    reporter.step_started(step);

    let code = match runner.run(command) {
        Ok(code) => code,
        Err(e) => {
            reporter.step_finished(step, StepStatus::Failed);
            return Err(e);
        }
    };

    if code == Some(0) {
        reporter.step_finished(step, StepStatus::Done);
        Ok(())
    } else {
        warn!("{} exited with {:?}", command.program, code);
        reporter.step_finished(step, StepStatus::Failed);
        Err(Error::tool_failed(step.to_string(), code))
    }
}

/// Deletes the files generated from `proto_file`.
///
/// `proto_file` need not exist; only its base name is used. Each file is
/// handled independently. If any removal fails the remaining files are
/// still processed and [`Error::RemoveFailed`] is returned at the end.
pub fn clean(
    proto_file: &Path,
    outputs: &OutputDirs,
    reporter: &mut dyn Reporter,
) -> Result<Vec<CleanOutcome>> {
    let files = GeneratedFiles::from_proto_path(proto_file)?;
    reporter.clean_started(proto_file);

    let mut outcomes = Vec::with_capacity(3);
    let mut failures = 0;

    for (dir, file) in outputs.pair(&files) {
        let path = dir.join(file);
        // symlink_metadata so a dangling link still counts as present
        if path.symlink_metadata().is_err() {
            debug!("{} not found", path.display());
            reporter.skipped(file);
            outcomes.push(CleanOutcome::Skipped(path));
            continue;
        }

        reporter.removal_started(file);
        match fs::remove_file(&path) {
            Ok(()) => {
                reporter.removal_finished(file, StepStatus::Done);
                outcomes.push(CleanOutcome::Removed(path));
            }
            Err(e) => {
                warn!("{}", Error::file_remove(&path, e));
                reporter.removal_finished(file, StepStatus::Failed);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(Error::RemoveFailed { count: failures });
    }

    reporter.clean_finished();
    Ok(outcomes)
}
