//! Subprocess invocation of the tool under test.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One fully constructed call to the tool under test.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// The file the tool was asked to produce via `-o`.
    pub output_path: PathBuf,
}

/// Result of one blocking invocation, with stderr fully drained.
#[derive(Debug)]
pub struct RunOutcome {
    /// Non-zero exit, or the declared output file was not created. A zero
    /// exit with a missing output file is still a crash.
    pub crashed: bool,
    pub stderr: String,
}

impl Invocation {
    /// `<tool> [-K<engine>] -T<format> <flags...> -o <output> <input>`.
    /// `-K` is omitted when the engine is empty.
    pub fn build(
        tool: &Path,
        engine: &str,
        format: &str,
        flags: &[String],
        output_path: &Path,
        input_path: &Path,
    ) -> Self {
        let mut args = Vec::with_capacity(flags.len() + 4);
        if !engine.is_empty() {
            args.push(format!("-K{engine}"));
        }
        args.push(format!("-T{format}"));
        args.extend(flags.iter().cloned());
        args.push("-o".to_string());
        args.push(output_path.display().to_string());
        args.push(input_path.display().to_string());
        Self {
            program: tool.to_path_buf(),
            args,
            output_path: output_path.to_path_buf(),
        }
    }

    /// The command line as printed for reproduction.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Runs the tool to completion. stdout is inherited; stderr is captured
    /// so the driver can surface it regardless of pass/fail.
    pub fn run(&self) -> Result<RunOutcome> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| Error::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let crashed = !output.status.success() || !self.output_path.exists();
        Ok(RunOutcome {
            crashed,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
