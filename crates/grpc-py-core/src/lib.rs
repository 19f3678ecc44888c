//! # grpc-py-core
//!
//! Library behind `grpc_cli`, a front-end for generating gRPC Python
//! bindings with `grpc_tools.protoc` and tidying them with `ruff`.
//!
//! ## Architecture
//!
//! - [`project`]: project root discovery and default paths
//! - [`config`]: the `[tool.grpc-py]` table in `pyproject.toml`
//! - [`naming`]: names of the files generated from a `.proto`
//! - [`tool`]: external program invocation
//! - [`pipeline`]: the `create` and `clean` commands
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```no_run
//! use grpc_py_core::{pipeline, GenerationRequest, NullReporter, OutputDirs, Settings};
//! use std::path::Path;
//!
//! let settings = Settings::discover(std::env::current_dir()?)?;
//! let request = GenerationRequest {
//!     proto_file: settings.resolve_proto(Path::new("greeter.proto")),
//!     outputs: OutputDirs::uniform(&settings.out_dir),
//! };
//!
//! let runner = settings.toolchain.runner();
//! pipeline::create(&request, &settings.toolchain, &runner, &mut NullReporter)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`ToolRunner`]: replace process spawning, e.g. in tests
//! - [`Reporter`]: decide how progress is shown
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod config;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod project;
pub mod tool;

// Re-export primary types for convenience
pub use config::{ToolConfig, ToolSettings};
pub use error::{Error, Result};
pub use naming::GeneratedFiles;
pub use pipeline::{
    CleanOutcome, GenerationRequest, NullReporter, OutputDirs, Reporter, Step, StepStatus,
};
pub use project::{find_project_root, Settings};
pub use tool::{CommandLine, ProcessRunner, ToolRunner, Toolchain};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
