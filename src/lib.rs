//! Command-line front-end for packaging Python scripts with PyInstaller
//!
//! pybox turns a handful of build options into the exact PyInstaller command
//! line, runs it, and keeps a log of successful builds.
//!
//! # Example
//!
//! ```
//! use pybox::{render_command, BuildOptions};
//!
//! let options = BuildOptions::new("app.py")
//!     .onefile(true)
//!     .hidden_import("foo")
//!     .hidden_import("bar");
//!
//! assert_eq!(
//!     render_command(&options),
//!     ["pyinstaller", "--onefile", "--hidden-import", "foo", "--hidden-import", "bar", "app.py"]
//! );
//! ```
//!
//! # Dependency auto-detection
//!
//! [`extract_dependencies`] scans a script for top-level `import x` and
//! `from x import y` lines and merges in the package names from a
//! `requirements.txt` next to it. The result is meant to be fed back in as
//! hidden imports.
//!
//! # Building
//!
//! [`Builder`] checks the inputs, probes the packager, runs it in the
//! script's directory, and appends the previewed command to a
//! [`HistoryStore`] when the packager exits with code 0.

pub mod core;

pub use crate::core::build::{BuildReport, Builder};
pub use crate::core::command::{
    invocation_command, parse_command, preview_string, render_command, render_command_with,
    with_output_name, PACKAGER,
};
pub use crate::core::config::Config;
pub use crate::core::deps::{extract_dependencies, DependencySet};
pub use crate::core::error::{PackError, Result};
pub use crate::core::history::{HistoryEntry, HistoryStore, JsonHistory};
pub use crate::core::options::BuildOptions;
pub use crate::core::output;
pub use crate::core::runner::{install_packager, Packager, SystemPackager};
pub use crate::core::version::ToolVersion;
