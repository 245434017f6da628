//! Packager version parsing
//!
//! `pyinstaller --version` prints a bare version such as `6.3.0`. Partial
//! versions (`6.3`) are padded so they still compare as semver.

use semver::{Version, VersionReq};
use std::fmt;

/// Version reported by the packaging tool's `--version` probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    /// Trimmed probe output, for display
    pub raw: String,
    /// Parsed version, if the output looked like one
    pub version: Option<Version>,
}

impl ToolVersion {
    /// Parse probe output. Only the first line is considered.
    pub fn parse(output: &str) -> Self {
        let raw = output.lines().next().unwrap_or("").trim().to_string();
        let version = Version::parse(&raw)
            .or_else(|_| Version::parse(&pad_version(&raw)))
            .ok();
        Self { raw, version }
    }

    /// Whether this is exactly the `pinned` version (e.g. `6.3.0`).
    ///
    /// Unparseable versions never match.
    pub fn matches_pin(&self, pinned: &str) -> bool {
        let Some(version) = &self.version else {
            return false;
        };
        VersionReq::parse(&format!("={}", pad_version(pinned)))
            .map(|req| req.matches(version))
            .unwrap_or(false)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}", v),
            None if self.raw.is_empty() => write!(f, "unknown"),
            None => write!(f, "{}", self.raw),
        }
    }
}

/// Pad a version string to be semver-compatible (X.Y.Z)
fn pad_version(version: &str) -> String {
    let parts: Vec<&str> = version.split('.').collect();
    match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    }
}
