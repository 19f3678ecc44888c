//! grpc_cli - Generate gRPC Python bindings from .proto files
//!
//! Runs `grpc_tools.protoc` on a proto file, then `ruff check --fix` and
//! `ruff format` on the output. `clean` removes what `create` generated.

mod report;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use grpc_py_core::{pipeline, GenerationRequest, OutputDirs, Settings};
use report::ConsoleReporter;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// CLI tool for gRPC Python code generation
#[derive(Parser, Debug)]
#[command(name = "grpc_cli")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version information
    #[arg(short = 'v', long)]
    version: bool,

    /// Verbosity level (--verbose, --verbose --verbose, ...)
    #[arg(long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Python interpreter with grpcio-tools installed
    #[arg(long, env = "GRPC_PY_PYTHON", global = true, value_name = "EXE")]
    python: Option<String>,

    /// ruff executable used for linting and formatting
    #[arg(long, env = "GRPC_PY_RUFF", global = true, value_name = "EXE")]
    ruff: Option<String>,

    /// Seconds to wait for each external tool (0 = no limit)
    #[arg(long, env = "GRPC_PY_TIMEOUT", global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create Python files from proto file
    Create(ProtoArgs),
    /// Clean generated grpc Python files
    Clean(ProtoArgs),
}

#[derive(Args, Debug)]
struct ProtoArgs {
    /// Proto file to process
    proto_file: PathBuf,

    /// Output directory for serialization/deserialization Python files, e.g. xxx_pb2.py
    /// [default: <root>/grpc_generated]
    #[arg(long = "python_out", value_name = "DIR")]
    python_out: Option<PathBuf>,

    /// Output directory for gRPC stub and server Python code, e.g. xxx_pb2_grpc.py
    /// [default: <root>/grpc_generated]
    #[arg(long = "grpc_python_out", value_name = "DIR")]
    grpc_python_out: Option<PathBuf>,

    /// Output directory for Python type hint stubs, e.g. xxx_pb2.pyi
    /// [default: <root>/grpc_generated]
    #[arg(long = "pyi_out", value_name = "DIR")]
    pyi_out: Option<PathBuf>,
}

impl ProtoArgs {
    /// Resolves the three output directories against the settings
    fn outputs(&self, settings: &Settings) -> OutputDirs {
        let resolve = |dir: &Option<PathBuf>| match dir {
            Some(dir) => settings.absolutize(dir),
            None => settings.out_dir.clone(),
        };
        OutputDirs {
            python: resolve(&self.python_out),
            grpc_python: resolve(&self.grpc_python_out),
            pyi: resolve(&self.pyi_out),
        }
    }
}

fn version_info() -> String {
    format!(
        "grpc_cli {} ({}/{})",
        grpc_py_core::VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", version_info());
        return Ok(());
    }

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
    let settings = load_settings(&cli, cwd)?;

    let color = !cli.no_color && io::stdout().is_terminal();
    match command {
        Command::Create(args) => run_create(&settings, args, color),
        Command::Clean(args) => run_clean(&settings, args, color),
    }
}

/// Discovers the project and layers command-line overrides on top
fn load_settings(cli: &Cli, cwd: PathBuf) -> Result<Settings> {
    let mut settings = Settings::discover(cwd).context("Failed to load project settings")?;

    if let Some(python) = &cli.python {
        settings.toolchain = settings.toolchain.python(python);
    }
    if let Some(ruff) = &cli.ruff {
        settings.toolchain = settings.toolchain.ruff(ruff);
    }
    if let Some(secs) = cli.timeout {
        settings.toolchain = settings.toolchain.timeout_secs(secs);
    }

    debug!("Settings: {:?}", settings);
    Ok(settings)
}

fn run_create(settings: &Settings, args: &ProtoArgs, color: bool) -> Result<()> {
    let request = GenerationRequest {
        proto_file: settings.resolve_proto(&args.proto_file),
        outputs: args.outputs(settings),
    };
    let runner = settings.toolchain.runner();
    let mut reporter = ConsoleReporter::new(io::stdout(), color);

    pipeline::create(&request, &settings.toolchain, &runner, &mut reporter).with_context(|| {
        format!(
            "Failed to create bindings for {}",
            display_name(&args.proto_file)
        )
    })
}

fn run_clean(settings: &Settings, args: &ProtoArgs, color: bool) -> Result<()> {
    let outputs = args.outputs(settings);
    let mut reporter = ConsoleReporter::new(io::stdout(), color);

    pipeline::clean(&args.proto_file, &outputs, &mut reporter).with_context(|| {
        format!(
            "Failed to clean bindings for {}",
            display_name(&args.proto_file)
        )
    })?;
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let cli = Cli::try_parse_from(["grpc_cli", "-v"]).unwrap();
        assert!(cli.version);
        assert!(cli.command.is_none());
        assert!(version_info().starts_with(&format!("grpc_cli {} (", grpc_py_core::VERSION)));
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "grpc_cli",
            "create",
            "protos/greeter.proto",
            "--python_out",
            "out/py",
            "--pyi_out=out/pyi",
        ])
        .unwrap();

        let Some(Command::Create(args)) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.proto_file, PathBuf::from("protos/greeter.proto"));
        assert_eq!(args.python_out, Some(PathBuf::from("out/py")));
        assert_eq!(args.grpc_python_out, None);
        assert_eq!(args.pyi_out, Some(PathBuf::from("out/pyi")));
    }

    #[test]
    fn test_clean_requires_proto_file() {
        assert!(Cli::try_parse_from(["grpc_cli", "clean"]).is_err());
    }

    #[test]
    fn test_outputs_default_and_override() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("pyproject.toml"), "").unwrap();
        let settings = Settings::discover(root).unwrap();

        let cli = Cli::try_parse_from([
            "grpc_cli",
            "clean",
            "greeter.proto",
            "--grpc_python_out",
            "stubs",
        ])
        .unwrap();
        let Some(Command::Clean(args)) = cli.command else {
            panic!("expected clean");
        };

        assert_eq!(
            args.outputs(&settings),
            OutputDirs {
                python: root.join("grpc_generated"),
                grpc_python: root.join("stubs"),
                pyi: root.join("grpc_generated"),
            }
        );
    }

    #[test]
    fn test_overrides_beat_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(
            root.join("pyproject.toml"),
            "[tool.grpc-py]\nruff = \"ruff-from-config\"\ntimeout = 30\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "grpc_cli",
            "--python",
            "/venv/bin/python",
            "--timeout",
            "0",
            "create",
            "greeter.proto",
        ])
        .unwrap();
        let settings = load_settings(&cli, root.to_path_buf()).unwrap();

        assert_eq!(settings.toolchain.python, "/venv/bin/python");
        assert_eq!(settings.toolchain.ruff, "ruff-from-config");
        assert_eq!(settings.toolchain.timeout, None);
    }
}
