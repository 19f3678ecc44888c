//! Colored console output for command progress.

use crossterm::style::{Color, Stylize};
use grpc_py_core::{Reporter, Step, StepStatus};
use std::io::Write;
use std::path::Path;

/// Writes human-readable progress lines to `out`.
///
/// Write errors are ignored: losing a status line must not abort a
/// half-finished generation.
pub struct ConsoleReporter<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn status(&mut self, status: StepStatus) {
        let line = match status {
            StepStatus::Done => self.paint("Done", Color::Green),
            StepStatus::Failed => self.paint("Failed", Color::Red),
        };
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn step_started(&mut self, step: &Step) {
        let _ = match step {
            // No newline: protoc is usually silent, so "Done" lands on the same line
            Step::Generate { proto_filename } => {
                let name = self.paint(proto_filename, Color::Yellow);
                write!(self.out, "Generating Python files from {name}...")
            }
            Step::Lint => writeln!(self.out, "\nLinting generated files..."),
            Step::Format => writeln!(self.out, "Formatting generated files..."),
        };
        let _ = self.out.flush();
    }

    fn step_finished(&mut self, step: &Step, status: StepStatus) {
        self.status(status);
        if status == StepStatus::Done && !matches!(step, Step::Generate { .. }) {
            let _ = writeln!(self.out);
        }
    }

    fn generated(&mut self, file: &str, dir: &Path) {
        let file = self.paint(file, Color::Yellow);
        let dir = self.paint(&dir.display().to_string(), Color::Yellow);
        let _ = writeln!(self.out, "Generated {file} under {dir}.");
    }

    fn clean_started(&mut self, proto_file: &Path) {
        let name = self.paint(&proto_file.display().to_string(), Color::Yellow);
        let _ = writeln!(self.out, "Cleaning generated Python files from {name}...");
    }

    fn removal_started(&mut self, file: &str) {
        let file = self.paint(file, Color::Yellow);
        let _ = write!(self.out, "Removing {file}...");
        let _ = self.out.flush();
    }

    fn removal_finished(&mut self, _file: &str, status: StepStatus) {
        self.status(status);
    }

    fn skipped(&mut self, file: &str) {
        let file = self.paint(file, Color::Yellow);
        let skipped = self.paint("Skipped.", Color::Yellow);
        let _ = writeln!(self.out, "File {file} not found. {skipped}");
    }

    fn clean_finished(&mut self) {
        self.status(StepStatus::Done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn output(reporter: ConsoleReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_create_output() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        let generate = Step::Generate {
            proto_filename: "greeter.proto".to_string(),
        };
        reporter.step_started(&generate);
        reporter.step_finished(&generate, StepStatus::Done);
        reporter.generated("greeter_pb2.py", Path::new("/work/grpc_generated"));
        reporter.step_started(&Step::Lint);
        reporter.step_finished(&Step::Lint, StepStatus::Failed);

        assert_eq!(
            output(reporter),
            "Generating Python files from greeter.proto...Done\n\
             Generated greeter_pb2.py under /work/grpc_generated.\n\
             \n\
             Linting generated files...\n\
             Failed\n"
        );
    }

    #[test]
    fn test_clean_output() {
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        reporter.clean_started(Path::new("protos/greeter.proto"));
        reporter.removal_started("greeter_pb2.py");
        reporter.removal_finished("greeter_pb2.py", StepStatus::Done);
        reporter.skipped("greeter_pb2.pyi");
        reporter.clean_finished();

        assert_eq!(
            output(reporter),
            "Cleaning generated Python files from protos/greeter.proto...\n\
             Removing greeter_pb2.py...Done\n\
             File greeter_pb2.pyi not found. Skipped.\n\
             Done\n"
        );
    }

    #[test]
    fn test_colored_status() {
        let mut reporter = ConsoleReporter::new(Vec::new(), true);
        reporter.clean_finished();
        reporter.removal_finished("greeter_pb2.py", StepStatus::Failed);

        assert_eq!(
            output(reporter),
            format!("{}\n{}\n", "Done".with(Color::Green), "Failed".with(Color::Red))
        );
    }
}
