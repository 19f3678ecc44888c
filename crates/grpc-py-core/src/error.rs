//! Error types for the grpc-py-core library.
//!
//! Every failure a command can hit is a variant of [`Error`]: bad user
//! input, filesystem errors, external tool failures and configuration
//! problems.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for grpc-py operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all grpc-py operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input proto file does not exist
    #[error("file '{path}' does not exist")]
    ProtoFileNotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Input proto path exists but is not a regular file
    #[error("'{path}' is not a file")]
    NotAFile {
        /// Offending path
        path: PathBuf,
    },

    /// File name does not end in `.proto`
    #[error("'{name}' is not a .proto file name")]
    InvalidProtoFile {
        /// The rejected file name
        name: String,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a generated file
    #[error("failed to remove file '{path}': {source}")]
    FileRemove {
        /// Path to the file that failed to be removed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// One or more generated files could not be removed
    #[error("{count} generated file(s) could not be removed")]
    RemoveFailed {
        /// Number of failed removals
        count: usize,
    },

    /// External program is not on `PATH`
    #[error("'{program}' not found: {source}")]
    ToolNotFound {
        /// Program name as configured
        program: String,
        /// Lookup error
        #[source]
        source: which::Error,
    },

    /// External program could not be started
    #[error("failed to start '{program}': {source}")]
    ToolSpawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Waiting on an external program failed
    #[error("failed to wait for '{program}': {source}")]
    ToolWait {
        /// Program being waited on
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// External program ran but exited unsuccessfully
    #[error("{step} failed ({})", exit_description(.code))]
    ToolFailed {
        /// Pipeline step that failed
        step: String,
        /// Exit code, `None` if the process was killed by a signal
        code: Option<i32>,
    },

    /// External program exceeded the configured timeout and was killed
    #[error("'{program}' did not finish within {}s and was killed", .timeout.as_secs())]
    ToolTimeout {
        /// Program that timed out
        program: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// Project configuration file exists but could not be read
    #[error("failed to read config '{path}': {source}")]
    ConfigRead {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Project configuration file is not valid TOML
    #[error("failed to parse config '{path}': {source}")]
    ConfigParse {
        /// Path to the configuration file
        path: PathBuf,
        /// TOML parse error
        #[source]
        source: toml::de::Error,
    },

    /// A recognized `[tool.grpc-py]` key has the wrong type
    #[error("invalid [tool.grpc-py] settings in '{path}': {source}")]
    InvalidSetting {
        /// Path to the configuration file
        path: PathBuf,
        /// Deserialization error
        #[source]
        source: toml::de::Error,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl Error {
    /// Creates a new missing proto file error
    pub fn proto_file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ProtoFileNotFound { path: path.into() }
    }

    /// Creates a new not-a-file error
    pub fn not_a_file(path: impl Into<PathBuf>) -> Self {
        Self::NotAFile { path: path.into() }
    }

    /// Creates a new invalid proto file name error
    pub fn invalid_proto_file(name: impl Into<String>) -> Self {
        Self::InvalidProtoFile { name: name.into() }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file removal error
    pub fn file_remove(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRemove {
            path: path.into(),
            source,
        }
    }

    /// Creates a new failed step error
    pub fn tool_failed(step: impl Into<String>, code: Option<i32>) -> Self {
        Self::ToolFailed {
            step: step.into(),
            code,
        }
    }

    /// Returns true if the error came from running an external program
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. }
                | Self::ToolSpawn { .. }
                | Self::ToolWait { .. }
                | Self::ToolFailed { .. }
                | Self::ToolTimeout { .. }
        )
    }
}
