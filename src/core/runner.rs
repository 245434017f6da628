//! Packaging tool process execution
//!
//! The build orchestrator talks to the packager through the [`Packager`]
//! trait so tests can swap in a fake. [`SystemPackager`] runs the real
//! executable with argv-style arguments (never through a shell), inherits
//! stdout/stderr so the packager's own output streams to the terminal, and
//! blocks until the child exits. There is no cancellation.

use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};

use super::error::{PackError, Result};
use super::version::ToolVersion;

/// Package spec installed by [`install_packager`]
pub const PACKAGER_PACKAGE: &str = "pyinstaller";

/// Default interpreter used for `pip install`
#[cfg(windows)]
pub const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
pub const DEFAULT_PYTHON: &str = "python3";

/// Something that can probe for and run the packaging tool.
pub trait Packager {
    /// Executable name or path, used as the first command token
    fn tool(&self) -> &str;

    /// Check that the tool is installed (`<tool> --version`).
    fn probe(&self) -> Result<ToolVersion>;

    /// Run `command` in `cwd` and wait for it to exit.
    ///
    /// `command[0]` is the executable. A non-zero exit is
    /// [`PackError::ToolInvocation`] carrying the exit code.
    fn run(&self, command: &[String], cwd: &Path) -> Result<()>;
}

/// Runs the packager installed on this machine
#[derive(Debug, Clone)]
pub struct SystemPackager {
    tool: String,
}

impl SystemPackager {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }
}

impl Packager for SystemPackager {
    fn tool(&self) -> &str {
        &self.tool
    }

    fn probe(&self) -> Result<ToolVersion> {
        let cmd = format!("{} --version", self.tool);
        let output = Command::new(&self.tool)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.tool, &cmd, e))?;

        if !output.status.success() {
            return Err(PackError::ToolInvocation {
                cmd,
                code: output.status.code(),
            });
        }

        Ok(ToolVersion::parse(&String::from_utf8_lossy(&output.stdout)))
    }

    fn run(&self, command: &[String], cwd: &Path) -> Result<()> {
        run_blocking(command, cwd)
    }
}

/// Install the packager with `<python> -m pip install pyinstaller==<version>`.
pub fn install_packager(python: &str, version: &str) -> Result<()> {
    let command = vec![
        python.to_string(),
        "-m".to_string(),
        "pip".to_string(),
        "install".to_string(),
        format!("{}=={}", PACKAGER_PACKAGE, version),
    ];
    run_blocking(&command, Path::new("."))
}

fn run_blocking(command: &[String], cwd: &Path) -> Result<()> {
    let (program, args) = command.split_first().ok_or_else(|| PackError::Spawn {
        cmd: String::new(),
        reason: "empty command".to_string(),
    })?;
    let cmd = command.join(" ");

    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| PackError::Spawn {
            cmd: cmd.clone(),
            reason: e.to_string(),
        })?;

    if !status.success() {
        return Err(PackError::ToolInvocation {
            cmd,
            code: status.code(),
        });
    }

    Ok(())
}

fn spawn_error(tool: &str, cmd: &str, e: std::io::Error) -> PackError {
    match e.kind() {
        ErrorKind::NotFound => PackError::ToolMissing(tool.to_string()),
        _ => PackError::Spawn {
            cmd: cmd.to_string(),
            reason: e.to_string(),
        },
    }
}
