//! Generated file names.
//!
//! `grpc_tools.protoc` writes one module per output kind, named after the
//! proto file. Both `create` and `clean` derive names through
//! [`GeneratedFiles::from_proto_name`] so they always agree.

use crate::error::{Error, Result};
use std::path::Path;

/// Extension every input file must carry
pub const PROTO_EXTENSION: &str = ".proto";

/// Suffix of the message module (`--python_out`)
pub const PYTHON_SUFFIX: &str = "_pb2.py";

/// Suffix of the service stub module (`--grpc_python_out`)
pub const GRPC_SUFFIX: &str = "_pb2_grpc.py";

/// Suffix of the type stub (`--pyi_out`)
pub const PYI_SUFFIX: &str = "_pb2.pyi";

/// The three file names generated from a single proto file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFiles {
    /// Message module, e.g. `greeter_pb2.py`
    pub python: String,
    /// Service stubs, e.g. `greeter_pb2_grpc.py`
    pub grpc_python: String,
    /// Type hints, e.g. `greeter_pb2.pyi`
    pub pyi: String,
}

impl GeneratedFiles {
    /// Derives the generated names from a proto file name such as `greeter.proto`.
    ///
    /// Only the trailing `.proto` is replaced; the rest of the name is kept
    /// as-is, dots and hyphens included.
    pub fn from_proto_name(name: &str) -> Result<Self> {
        let stem = name
            .strip_suffix(PROTO_EXTENSION)
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| Error::invalid_proto_file(name))?;

        Ok(Self {
            python: format!("{stem}{PYTHON_SUFFIX}"),
            grpc_python: format!("{stem}{GRPC_SUFFIX}"),
            pyi: format!("{stem}{PYI_SUFFIX}"),
        })
    }

    /// Derives the generated names from the base name of `path`
    pub fn from_proto_path(path: &Path) -> Result<Self> {
        Self::from_proto_name(proto_file_name(path)?)
    }
}

/// Returns the base name of `path` as UTF-8
pub fn proto_file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::invalid_proto_file(path.display().to_string()))
}
