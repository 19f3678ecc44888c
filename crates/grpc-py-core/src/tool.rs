//! External tool invocation.
//!
//! The pipeline never spawns processes directly. It builds a
//! [`CommandLine`] and hands it to a [`ToolRunner`], which reports the exit
//! code. [`ProcessRunner`] is the real implementation; tests plug in fakes.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Default interpreter used to run `grpc_tools.protoc`
#[cfg(windows)]
pub const DEFAULT_PYTHON: &str = "python";
/// Default interpreter used to run `grpc_tools.protoc`
#[cfg(not(windows))]
pub const DEFAULT_PYTHON: &str = "python3";

/// Default lint/format executable
pub const DEFAULT_RUFF: &str = "ruff";

/// Default per-process timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Module run by the interpreter to compile protos
const PROTOC_MODULE: &str = "grpc_tools.protoc";

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name or path, looked up on `PATH`
    pub program: String,
    /// Arguments passed verbatim
    pub args: Vec<OsString>,
}

impl CommandLine {
    /// Creates a command line with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns true if any argument equals `needle`
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs external programs to completion.
///
/// Returns the exit code, or `None` if the process was terminated by a
/// signal.
pub trait ToolRunner {
    /// Run `command` and wait for it to exit
    fn run(&self, command: &CommandLine) -> Result<Option<i32>>;
}

/// Spawns real processes with inherited standard streams
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl ProcessRunner {
    /// Creates a runner with the default timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout, `None` waits forever
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how often a running child is polled
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn wait_with_timeout(
        &self,
        child: &mut Child,
        program: &str,
        timeout: Duration,
    ) -> Result<ExitStatus> {
        let started = Instant::now();
        loop {
            let polled = child.try_wait().map_err(|source| Error::ToolWait {
                program: program.to_string(),
                source,
            })?;
            if let Some(status) = polled {
                return Ok(status);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!("Killing {} after {:?}", program, elapsed);
                if let Err(e) = child.kill() {
                    warn!("Failed to kill {}: {}", program, e);
                }
                // Reap so the child does not linger as a zombie
                let _ = child.wait();
                return Err(Error::ToolTimeout {
                    program: program.to_string(),
                    timeout,
                });
            }

            trace!("{} still running after {:?}", program, elapsed);
            thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &CommandLine) -> Result<Option<i32>> {
        let executable = which::which(&command.program).map_err(|source| Error::ToolNotFound {
            program: command.program.clone(),
            source,
        })?;

        debug!("Running {}", command);
        trace!("Resolved {} to {}", command.program, executable.display());

        let mut child = Command::new(&executable)
            .args(&command.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::ToolSpawn {
                program: command.program.clone(),
                source,
            })?;

        let status = match self.timeout {
            Some(timeout) if !timeout.is_zero() => {
                self.wait_with_timeout(&mut child, &command.program, timeout)?
            }
            _ => child.wait().map_err(|source| Error::ToolWait {
                program: command.program.clone(),
                source,
            })?,
        };

        debug!("{} exited with {}", command.program, status);
        Ok(status.code())
    }
}

/// The external programs the pipeline drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Interpreter with `grpcio-tools` installed
    pub python: String,
    /// `ruff` executable
    pub ruff: String,
    /// Per-process timeout, `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            ruff: DEFAULT_RUFF.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl Toolchain {
    /// Sets the interpreter
    pub fn python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Sets the ruff executable
    pub fn ruff(mut self, ruff: impl Into<String>) -> Self {
        self.ruff = ruff.into();
        self
    }

    /// Sets the timeout in seconds, `0` disables it
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    /// A [`ProcessRunner`] honoring this toolchain's timeout
    pub fn runner(&self) -> ProcessRunner {
        ProcessRunner::new().timeout(self.timeout)
    }

    /// `<python> -m grpc_tools.protoc -I=<dir> --python_out=<dir> --grpc_python_out=<dir>
    /// --pyi_out=<dir> <file>`
    pub fn protoc(
        &self,
        proto_dir: &Path,
        proto_filename: &str,
        python_out: &Path,
        grpc_python_out: &Path,
        pyi_out: &Path,
    ) -> CommandLine {
        CommandLine::new(&self.python)
            .args(["-m", PROTOC_MODULE])
            .arg(flag("-I=", proto_dir))
            .arg(flag("--python_out=", python_out))
            .arg(flag("--grpc_python_out=", grpc_python_out))
            .arg(flag("--pyi_out=", pyi_out))
            .arg(proto_filename)
    }

    /// `<ruff> check --no-cache --fix <dirs>`
    pub fn lint(&self, dirs: &[&Path]) -> CommandLine {
        CommandLine::new(&self.ruff)
            .args(["check", "--no-cache", "--fix"])
            .args(dirs.iter().copied())
    }

    /// `<ruff> format --no-cache <dirs>`
    pub fn format(&self, dirs: &[&Path]) -> CommandLine {
        CommandLine::new(&self.ruff)
            .args(["format", "--no-cache"])
            .args(dirs.iter().copied())
    }
}

fn flag(name: &str, value: &Path) -> OsString {
    let mut arg = OsString::from(name);
    arg.push(value);
    arg
}
