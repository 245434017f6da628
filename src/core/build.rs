//! Build orchestration
//!
//! One build attempt:
//!
//! 1. check the source (and icon, if any) exist
//! 2. probe the packager, unless the caller already did
//! 3. render the preview and the invoked argv (`--name` spliced in)
//! 4. run the packager in the source file's directory and wait
//! 5. on success, append the preview to the history store
//!
//! A failed run never writes history. A history write failure after a
//! successful run is only a warning.

use std::path::{Path, PathBuf};

use super::command::{invocation_command, preview_string, render_command_with};
use super::error::{PackError, Result};
use super::history::{HistoryEntry, HistoryStore};
use super::options::BuildOptions;
use super::output;
use super::runner::Packager;
use super::version::ToolVersion;

/// Directory PyInstaller writes bundles into, next to the source
pub const DIST_DIR: &str = "dist";

/// What a successful build produced
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Preview command, as recorded in history
    pub preview: Vec<String>,
    /// Command that was actually executed
    pub invoked: Vec<String>,
    /// Packager version reported by the probe
    pub tool_version: ToolVersion,
    /// `dist/` directory next to the source
    pub output_dir: PathBuf,
    /// Expected executable inside `output_dir`
    pub artifact: Option<PathBuf>,
}

/// Runs builds against a packager and records them in a history store.
pub struct Builder<'a, P: Packager, H: HistoryStore> {
    packager: &'a P,
    history: &'a H,
}

impl<'a, P: Packager, H: HistoryStore> Builder<'a, P, H> {
    pub fn new(packager: &'a P, history: &'a H) -> Self {
        Self { packager, history }
    }

    /// Preview command for `options` with this builder's packager.
    pub fn preview(&self, options: &BuildOptions) -> Vec<String> {
        render_command_with(self.packager.tool(), options)
    }

    /// Run one build. Blocks until the packager exits.
    pub fn build(&self, options: &BuildOptions) -> Result<BuildReport> {
        check_inputs(options)?;
        let tool_version = self.packager.probe()?;
        output::debug(&format!("{} {}", self.packager.tool(), tool_version));
        self.build_with_version(options, tool_version)
    }

    /// Run one build against a packager the caller already probed.
    pub fn build_with_version(
        &self,
        options: &BuildOptions,
        tool_version: ToolVersion,
    ) -> Result<BuildReport> {
        check_inputs(options)?;
        let source = Path::new(&options.source);

        let preview = self.preview(options);
        let invoked = invocation_command(self.packager.tool(), options);
        let cwd = source_dir(source);
        output::debug(&format!("running in {}: {}", cwd.display(), invoked.join(" ")));

        self.packager.run(&invoked, &cwd)?;

        let entry = HistoryEntry::now(options.source.clone(), preview_string(&preview));
        if let Err(e) = self.history.append(entry) {
            output::warning(&format!("build succeeded but history was not saved: {}", e));
        }

        let output_dir = cwd.join(DIST_DIR);
        let artifact = artifact_path(&output_dir, options);

        Ok(BuildReport {
            preview,
            invoked,
            tool_version,
            output_dir,
            artifact,
        })
    }
}

fn check_inputs(options: &BuildOptions) -> Result<()> {
    let source = Path::new(&options.source);
    if options.source.is_empty() || !source.is_file() {
        return Err(PackError::NotFound(source.to_path_buf()));
    }
    if let Some(icon) = options.icon_path()
        && !Path::new(icon).is_file()
    {
        return Err(PackError::NotFound(PathBuf::from(icon)));
    }
    Ok(())
}

/// Directory the packager runs in: the source file's parent.
pub fn source_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Where the packager will put the executable.
///
/// `--onefile` produces `dist/<name>[.exe]`; otherwise the bundle is a
/// directory `dist/<name>/` containing `<name>[.exe]`.
pub fn artifact_path(output_dir: &Path, options: &BuildOptions) -> Option<PathBuf> {
    let name = match options.output_name() {
        Some(n) => n.to_string(),
        None => BuildOptions::default_name(Path::new(&options.source))?,
    };
    let file = format!("{}{}", name, std::env::consts::EXE_SUFFIX);

    if options.onefile {
        Some(output_dir.join(file))
    } else {
        Some(output_dir.join(&name).join(file))
    }
}
