//! Build history log
//!
//! Successful builds are appended to a JSON file:
//!
//! ```json
//! [
//!     {
//!         "timestamp": "2024-01-15 10:30:00",
//!         "file": "/home/me/tool/app.py",
//!         "command": "pyinstaller --onefile /home/me/tool/app.py"
//!     }
//! ]
//! ```
//!
//! The file is rewritten wholesale on every append and reset to `[]` on
//! clear. A missing or corrupt file reads as an empty history; a file that
//! cannot be read at all is an error and is never overwritten.

use chrono::Local;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::error::{PackError, Result};
use super::output;

/// Default history file name
pub const HISTORY_FILE: &str = "build_history.json";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One successful build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub file: String,
    pub command: String,
}

impl HistoryEntry {
    /// Entry stamped with the current local time.
    pub fn now(file: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            file: file.into(),
            command: command.into(),
        }
    }
}

/// Append-only store of build history entries.
pub trait HistoryStore {
    /// All entries, oldest first. Unreadable history is empty.
    fn entries(&self) -> Vec<HistoryEntry>;

    /// Append one entry.
    fn append(&self, entry: HistoryEntry) -> Result<()>;

    /// Remove every entry.
    fn clear(&self) -> Result<()>;
}

/// History persisted as a JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonHistory {
    path: PathBuf,
}

impl JsonHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the history file strictly: a missing file is empty, a corrupt
    /// one is an error.
    pub fn read(&self) -> Result<Vec<HistoryEntry>> {
        match self.read_raw()? {
            Some(content) => serde_json::from_str(&content).map_err(|e| self.persistence(e)),
            None => Ok(Vec::new()),
        }
    }

    /// File content, or `None` when there is no history file yet.
    fn read_raw(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(c) => Ok(Some(c)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.persistence(e)),
        }
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.persistence(e))?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        entries
            .serialize(&mut ser)
            .map_err(|e| self.persistence(e))?;

        // Write to a sibling then rename so readers never see a half file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &buf).map_err(|e| self.persistence(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.persistence(e))
    }

    fn lock(&self) -> Result<HistoryLock> {
        let lock_path = self.path.with_extension("json.lock");
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.persistence(e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.persistence(e))?;
        file.lock_exclusive().map_err(|e| self.persistence(e))?;
        Ok(HistoryLock { file })
    }

    fn persistence(&self, e: impl std::fmt::Display) -> PackError {
        PackError::Persistence {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

impl HistoryStore for JsonHistory {
    fn entries(&self) -> Vec<HistoryEntry> {
        match self.read() {
            Ok(entries) => entries,
            Err(e) => {
                output::warning(&format!("{}; treating history as empty", e));
                Vec::new()
            }
        }
    }

    fn append(&self, entry: HistoryEntry) -> Result<()> {
        let _lock = self.lock()?;
        // Only a corrupt file is replaced; an unreadable one is left alone
        let mut entries: Vec<HistoryEntry> = match self.read_raw()? {
            Some(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                output::warning(&format!(
                    "history error ({}): {}; starting a new history",
                    self.path.display(),
                    e
                ));
                Vec::new()
            }),
            None => Vec::new(),
        };
        entries.push(entry);
        self.write(&entries)
    }

    fn clear(&self) -> Result<()> {
        let _lock = self.lock()?;
        self.write(&[])
    }
}

/// Exclusive advisory lock held while the history file is rewritten
#[derive(Debug)]
struct HistoryLock {
    file: File,
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Render entries newest first, the way `pybox history` prints them.
pub fn format_entries(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "history is empty\n".to_string();
    }

    let mut text = String::new();
    for entry in entries.iter().rev() {
        text.push_str(&format!("[{}]\n", entry.timestamp));
        text.push_str(&format!("File: {}\n", entry.file));
        text.push_str(&format!("Command: {}\n", entry.command));
        text.push_str(&"-".repeat(50));
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> JsonHistory {
        JsonHistory::new(dir.path().join(HISTORY_FILE))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).entries().is_empty());
        assert!(store(&dir).read().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_reload() {
        let dir = TempDir::new().unwrap();
        let history = store(&dir);

        history
            .append(HistoryEntry::now("/work/a.py", "pyinstaller /work/a.py"))
            .unwrap();
        history
            .append(HistoryEntry::now("/work/b.py", "pyinstaller --onefile /work/b.py"))
            .unwrap();

        let reloaded = JsonHistory::new(history.path()).entries();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[0].file, "/work/a.py");
        assert_eq!(reloaded[1].command, "pyinstaller --onefile /work/b.py");
    }

    #[test]
    fn test_file_is_json_array_with_string_fields() {
        let dir = TempDir::new().unwrap();
        let history = store(&dir);
        history
            .append(HistoryEntry::now("app.py", "pyinstaller app.py"))
            .unwrap();

        let raw = std::fs::read_to_string(history.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert!(first["timestamp"].is_string());
        assert_eq!(first["file"], "app.py");
        assert_eq!(first["command"], "pyinstaller app.py");
        assert!(raw.contains("\n        \"file\""), "expected 4-space indent:\n{raw}");
    }

    #[test]
    fn test_clear_writes_empty_array() {
        let dir = TempDir::new().unwrap();
        let history = store(&dir);
        history
            .append(HistoryEntry::now("app.py", "pyinstaller app.py"))
            .unwrap();
        history.clear().unwrap();

        assert!(history.entries().is_empty());
        let raw = std::fs::read_to_string(history.path()).unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let history = store(&dir);
        std::fs::write(history.path(), "{not json").unwrap();

        assert!(matches!(history.read(), Err(PackError::Persistence { .. })));
        assert!(history.entries().is_empty());

        // Appending replaces the corrupt content
        history
            .append(HistoryEntry::now("app.py", "pyinstaller app.py"))
            .unwrap();
        assert_eq!(history.read().unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        // A directory at the history path fails to read with an I/O error
        let history = store(&dir);
        std::fs::create_dir(history.path()).unwrap();
        std::fs::write(history.path().join("old.json"), "keep").unwrap();

        let result = history.append(HistoryEntry::now("new.py", "pyinstaller new.py"));

        assert!(matches!(result, Err(PackError::Persistence { .. })));
        assert!(history.path().is_dir());
        assert_eq!(
            std::fs::read_to_string(history.path().join("old.json")).unwrap(),
            "keep"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_keeps_existing_entries() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let history = store(&dir);
        history
            .append(HistoryEntry::now("old.py", "pyinstaller old.py"))
            .unwrap();
        std::fs::set_permissions(history.path(), std::fs::Permissions::from_mode(0o200)).unwrap();

        // Root reads through the mode bits; nothing to check there
        if std::fs::read(history.path()).is_ok() {
            return;
        }

        let result = history.append(HistoryEntry::now("new.py", "pyinstaller new.py"));
        assert!(matches!(result, Err(PackError::Persistence { .. })));

        std::fs::set_permissions(history.path(), std::fs::Permissions::from_mode(0o600)).unwrap();
        let entries = history.read().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file, "old.py");
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let history = JsonHistory::new(dir.path().join("nested/state").join(HISTORY_FILE));
        history
            .append(HistoryEntry::now("app.py", "pyinstaller app.py"))
            .unwrap();
        assert_eq!(history.entries().len(), 1);
    }

    #[test]
    fn test_timestamp_format() {
        let entry = HistoryEntry::now("app.py", "pyinstaller app.py");
        assert!(
            chrono::NaiveDateTime::parse_from_str(&entry.timestamp, TIMESTAMP_FORMAT).is_ok(),
            "unexpected timestamp {}",
            entry.timestamp
        );
    }

    #[test]
    fn test_format_entries_newest_first() {
        let entries = vec![
            HistoryEntry {
                timestamp: "2024-01-15 10:00:00".to_string(),
                file: "old.py".to_string(),
                command: "pyinstaller old.py".to_string(),
            },
            HistoryEntry {
                timestamp: "2024-01-16 10:00:00".to_string(),
                file: "new.py".to_string(),
                command: "pyinstaller new.py".to_string(),
            },
        ];
        let text = format_entries(&entries);
        let new_pos = text.find("new.py").unwrap();
        let old_pos = text.find("old.py").unwrap();
        assert!(new_pos < old_pos);
        assert!(text.contains(&"-".repeat(50)));
    }

    #[test]
    fn test_format_empty_history() {
        assert_eq!(format_entries(&[]), "history is empty\n");
    }
}
