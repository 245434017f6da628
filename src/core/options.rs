//! Build options collected from user input
//!
//! A [`BuildOptions`] value is built fresh for each build attempt and thrown
//! away once the command line has been rendered. It owns no resources.

use std::path::Path;

/// Everything needed to render one packager command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Python script to package
    pub source: String,
    /// Output name override (`--name`), only applied at invocation time
    pub name: Option<String>,
    /// Bundle into a single executable (`--onefile`)
    pub onefile: bool,
    /// Hide the console window (`--noconsole`)
    pub noconsole: bool,
    /// Icon file (`--icon`)
    pub icon: Option<String>,
    /// Hidden imports; each entry may itself be a comma-separated list
    pub hidden_imports: Vec<String>,
    /// Extra data files/directories; each entry may be a `;`-separated list
    pub resources: Vec<String>,
}

impl BuildOptions {
    /// Options for `source` with everything else off.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn onefile(mut self, on: bool) -> Self {
        self.onefile = on;
        self
    }

    pub fn noconsole(mut self, on: bool) -> Self {
        self.noconsole = on;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Add a hidden import unless an identical entry is already listed.
    pub fn hidden_import(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.hidden_imports.contains(&name) {
            self.hidden_imports.push(name);
        }
        self
    }

    pub fn resource(mut self, path: impl Into<String>) -> Self {
        self.resources.push(path.into());
        self
    }

    /// Icon path if one is set and non-empty.
    pub fn icon_path(&self) -> Option<&str> {
        self.icon.as_deref().filter(|s| !s.is_empty())
    }

    /// Output name if one is set and non-empty.
    pub fn output_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|s| !s.is_empty())
    }

    /// Hidden import names: entries split on `,`, trimmed, empties and
    /// repeats dropped, first occurrence kept.
    pub fn hidden_import_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in split_entries(&self.hidden_imports, ',') {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Resource paths: entries split on `;`, trimmed, empties dropped.
    pub fn resource_paths(&self) -> Vec<&str> {
        split_entries(&self.resources, ';').collect()
    }

    /// Default output name for a script: its file stem (`app.py` -> `app`).
    pub fn default_name(source: &Path) -> Option<String> {
        source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
    }
}

fn split_entries(entries: &[String], sep: char) -> impl Iterator<Item = &str> {
    entries
        .iter()
        .flat_map(move |entry| entry.split(sep))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
