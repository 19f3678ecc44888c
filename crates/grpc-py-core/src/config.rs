//! `[tool.grpc-py]` configuration.
//!
//! The table is read from the project's `pyproject.toml`. Any key may be
//! present in the raw [`ToolConfig`]; the keys this tool understands are
//! exposed through [`ToolSettings`].

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outer table holding per-tool sections
const TOOL_NAMESPACE: &str = "tool";

/// Name of this tool's section under `[tool]`
pub const TOOL_NAME: &str = "grpc-py";

/// Raw contents of the `[tool.grpc-py]` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolConfig {
    /// File the table was read from, if any
    source: Option<PathBuf>,
    table: toml::Table,
}

/// Typed view of the keys grpc-py understands
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolSettings {
    /// Directory holding `.proto` files, relative to the project root
    pub proto_dir: Option<PathBuf>,
    /// Shared output directory, relative to the project root
    pub out_dir: Option<PathBuf>,
    /// Interpreter used to run `grpc_tools.protoc`
    pub python: Option<String>,
    /// Lint/format executable
    pub ruff: Option<String>,
    /// Per-process timeout in seconds, `0` disables it
    pub timeout: Option<u64>,
}

impl ToolConfig {
    /// Loads the table from `path`.
    ///
    /// A missing file yields an empty config. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(path, &content)
    }

    /// Parses `content` as a TOML document and extracts `[tool.grpc-py]`
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let mut document: toml::Table = content.parse().map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        let table = match document.remove(TOOL_NAMESPACE) {
            Some(toml::Value::Table(mut tools)) => match tools.remove(TOOL_NAME) {
                Some(toml::Value::Table(table)) => table,
                Some(other) => {
                    warn!(
                        "Ignoring [{}.{}] in {}: expected a table, found {}",
                        TOOL_NAMESPACE,
                        TOOL_NAME,
                        path.display(),
                        other.type_str()
                    );
                    toml::Table::new()
                }
                None => toml::Table::new(),
            },
            Some(other) => {
                warn!(
                    "Ignoring [{}] in {}: expected a table, found {}",
                    TOOL_NAMESPACE,
                    path.display(),
                    other.type_str()
                );
                toml::Table::new()
            }
            None => toml::Table::new(),
        };

        Ok(Self {
            source: Some(path.to_path_buf()),
            table,
        })
    }

    /// Returns true if no keys were configured
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Looks up a raw value
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.table.get(key)
    }

    /// Returns the file the table was read from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Deserializes the recognized keys. Unknown keys are ignored.
    pub fn settings(&self) -> Result<ToolSettings> {
        toml::Value::Table(self.table.clone())
            .try_into()
            .map_err(|source| Error::InvalidSetting {
                path: self.source.clone().unwrap_or_default(),
                source,
            })
    }
}
