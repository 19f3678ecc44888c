//! Project discovery and default paths.
//!
//! A project is identified by its `pyproject.toml`. Everything the commands
//! need to know about their surroundings is resolved once into [`Settings`]
//! and passed down explicitly.

use crate::config::{ToolConfig, ToolSettings};
use crate::error::Result;
use crate::tool::Toolchain;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File whose presence marks the project root
pub const MARKER_FILE: &str = "pyproject.toml";

/// Default directory for `.proto` sources, relative to the root
pub const DEFAULT_PROTO_DIR: &str = "protos";

/// Default directory for generated modules, relative to the root
pub const DEFAULT_OUT_DIR: &str = "grpc_generated";

/// Returns the nearest directory at or above `start` containing [`MARKER_FILE`]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    find_marker_dir(start, MARKER_FILE)
}

fn find_marker_dir(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_file())
        .map(Path::to_path_buf)
}

/// Everything resolved at startup
#[derive(Debug, Clone)]
pub struct Settings {
    /// Working directory relative paths are resolved against
    pub cwd: PathBuf,
    /// Discovered project root, if any
    pub root: Option<PathBuf>,
    /// Directory holding `.proto` sources
    pub proto_dir: PathBuf,
    /// Default output directory for all three generated files
    pub out_dir: PathBuf,
    /// Raw `[tool.grpc-py]` table
    pub tool_config: ToolConfig,
    /// External programs and their timeout
    pub toolchain: Toolchain,
}

impl Settings {
    /// Discovers the project around `cwd` and applies its `[tool.grpc-py]` table.
    ///
    /// Without a project root, defaults are placed under `cwd`.
    pub fn discover(cwd: impl Into<PathBuf>) -> Result<Self> {
        let cwd = cwd.into();
        let root = find_project_root(&cwd);

        let tool_config = match &root {
            Some(root) => ToolConfig::load(&root.join(MARKER_FILE))?,
            None => {
                debug!("No {} found above {}", MARKER_FILE, cwd.display());
                ToolConfig::default()
            }
        };
        let tool_settings = tool_config.settings()?;

        let settings = Self::from_parts(cwd, root, tool_config, tool_settings);
        debug!(
            "Resolved root={:?} proto_dir={} out_dir={}",
            settings.root,
            settings.proto_dir.display(),
            settings.out_dir.display()
        );
        Ok(settings)
    }

    fn from_parts(
        cwd: PathBuf,
        root: Option<PathBuf>,
        tool_config: ToolConfig,
        tool_settings: ToolSettings,
    ) -> Self {
        let base = root.clone().unwrap_or_else(|| cwd.clone());
        let proto_dir = base.join(
            tool_settings
                .proto_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROTO_DIR)),
        );
        let out_dir = base.join(
            tool_settings
                .out_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
        );

        let mut toolchain = Toolchain::default();
        if let Some(python) = tool_settings.python {
            toolchain = toolchain.python(python);
        }
        if let Some(ruff) = tool_settings.ruff {
            toolchain = toolchain.ruff(ruff);
        }
        if let Some(secs) = tool_settings.timeout {
            toolchain = toolchain.timeout_secs(secs);
        }

        Self {
            cwd,
            root,
            proto_dir,
            out_dir,
            tool_config,
            toolchain,
        }
    }

    /// Makes `path` absolute by joining it onto the working directory
    pub fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Resolves a user-supplied proto path.
    ///
    /// The path itself wins if it exists. Otherwise a relative path is
    /// tried under [`Settings::proto_dir`]. If neither exists the
    /// absolutized original is returned so validation can report it.
    pub fn resolve_proto(&self, path: &Path) -> PathBuf {
        let direct = self.absolutize(path);
        if direct.exists() || path.is_absolute() {
            return direct;
        }

        let in_proto_dir = self.proto_dir.join(path);
        if in_proto_dir.exists() {
            debug!("Found {} under {}", path.display(), self.proto_dir.display());
            return in_proto_dir;
        }
        direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_find_root_in_start_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(MARKER_FILE), "").unwrap();

        assert_eq!(
            find_project_root(temp_dir.path()),
            Some(temp_dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_find_nearest_ancestor() {
        let temp_dir = TempDir::new().unwrap();
        let outer = temp_dir.path();
        let inner = outer.join("services/billing");
        let deep = inner.join("src/pkg");
        fs::create_dir_all(&deep).unwrap();
        fs::write(outer.join(MARKER_FILE), "").unwrap();
        fs::write(inner.join(MARKER_FILE), "").unwrap();

        assert_eq!(find_project_root(&deep), Some(inner.clone()));
        assert_eq!(
            find_project_root(&outer.join("services")),
            Some(outer.to_path_buf())
        );
    }

    #[test]
    fn test_marker_directory_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a");
        fs::create_dir_all(nested.join(MARKER_FILE)).unwrap();

        assert_ne!(find_project_root(&nested), Some(nested.clone()));
    }

    #[test]
    fn test_no_root() {
        let temp_dir = TempDir::new().unwrap();
        let deep = temp_dir.path().join("x/y/z");
        fs::create_dir_all(&deep).unwrap();

        // A marker name nothing on the host carries walks all the way up
        assert_eq!(find_marker_dir(&deep, "grpc-py-absent-marker.toml"), None);

        // A real pyproject.toml above the temp dir is possible, but never inside it
        if let Some(root) = find_project_root(&deep) {
            assert!(!root.starts_with(temp_dir.path()));
        }
    }

    #[test]
    fn test_marker_search_finds_custom_marker() {
        let temp_dir = TempDir::new().unwrap();
        let marker = "grpc-py-test-marker.toml";
        fs::write(temp_dir.path().join(marker), "").unwrap();
        let deep = temp_dir.path().join("a/b/c");
        fs::create_dir_all(&deep).unwrap();

        assert_eq!(
            find_marker_dir(&deep, marker),
            Some(temp_dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_defaults_under_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let cwd = root.join("app");
        fs::create_dir_all(&cwd).unwrap();
        fs::write(root.join(MARKER_FILE), "[project]\nname = \"demo\"\n").unwrap();

        let settings = Settings::discover(&cwd).unwrap();
        assert_eq!(settings.root.as_deref(), Some(root));
        assert_eq!(settings.proto_dir, root.join("protos"));
        assert_eq!(settings.out_dir, root.join("grpc_generated"));
        assert_eq!(settings.toolchain, Toolchain::default());
        assert!(settings.tool_config.is_empty());
    }

    #[test]
    fn test_tool_settings_applied() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(
            root.join(MARKER_FILE),
            r#"
[tool.grpc-py]
proto-dir = "schema"
out-dir = "pkg/gen"
python = "python3.12"
timeout = 0
"#,
        )
        .unwrap();

        let settings = Settings::discover(root).unwrap();
        assert_eq!(settings.proto_dir, root.join("schema"));
        assert_eq!(settings.out_dir, root.join("pkg/gen"));
        assert_eq!(settings.toolchain.python, "python3.12");
        assert_eq!(settings.toolchain.ruff, "ruff");
        assert_eq!(settings.toolchain.timeout, None);
    }

    #[test]
    fn test_without_root_uses_cwd() {
        let tool_settings = ToolSettings {
            timeout: Some(7),
            ..Default::default()
        };
        let settings = Settings::from_parts(
            PathBuf::from("/work"),
            None,
            ToolConfig::default(),
            tool_settings,
        );

        assert_eq!(settings.proto_dir, PathBuf::from("/work/protos"));
        assert_eq!(settings.out_dir, PathBuf::from("/work/grpc_generated"));
        assert_eq!(settings.toolchain.timeout, Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_malformed_config_fails_discovery() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(MARKER_FILE), "[tool.grpc-py\n").unwrap();

        assert!(Settings::discover(temp_dir.path()).is_err());
    }

    #[test]
    fn test_resolve_proto() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(MARKER_FILE), "").unwrap();
        fs::create_dir_all(root.join("protos")).unwrap();
        fs::write(root.join("protos/greeter.proto"), "syntax = \"proto3\";").unwrap();
        fs::write(root.join("local.proto"), "syntax = \"proto3\";").unwrap();

        let settings = Settings::discover(root).unwrap();
        assert_eq!(
            settings.resolve_proto(Path::new("local.proto")),
            root.join("local.proto")
        );
        assert_eq!(
            settings.resolve_proto(Path::new("greeter.proto")),
            root.join("protos/greeter.proto")
        );
        assert_eq!(
            settings.resolve_proto(Path::new("missing.proto")),
            root.join("missing.proto")
        );
    }
}
