//! Dependency auto-detection for Python scripts
//!
//! Combines two sources into one [`DependencySet`]:
//!
//! - a line-anchored regex scan of the script for `import x` and
//!   `from x[.y] import ...` statements
//! - an optional `requirements.txt` next to the script
//!
//! The scan is a heuristic. Indented (conditional) imports, `importlib` calls
//! and the second half of `import a, b` are not seen.
//!
//! ## Manifest format
//!
//! ```text
//! # comment
//! requests==2.31.0
//! numpy >= 1.26
//! rich
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::error::{PackError, Result};
use super::output;

/// Manifest file looked up next to the source file
pub const MANIFEST_FILE: &str = "requirements.txt";

/// Version-pin operators, stripped in this order
const VERSION_OPERATORS: [&str; 3] = ["==", ">=", "<="];

/// Extracted module/package names. Ordered only so output is stable.
pub type DependencySet = BTreeSet<String>;

/// `from pkg.sub import x` or `import pkg`, anchored at column 0
static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:from\s+(\w+)(?:\.\w+)*\s+import|import\s+(\w+))").unwrap()
});

/// Extract the dependencies of a Python source file.
///
/// Fails with [`PackError::NotFound`] if `source` does not exist and with
/// [`PackError::Read`] if it is not valid UTF-8 text. An unreadable manifest
/// adds nothing.
pub fn extract_dependencies(source: &Path) -> Result<DependencySet> {
    if !source.exists() {
        return Err(PackError::NotFound(source.to_path_buf()));
    }

    let content = read_text(source)?;
    let mut deps = scan_imports(&content);

    if let Some(manifest) = find_manifest(source) {
        match read_text(&manifest) {
            Ok(text) => deps.extend(parse_manifest(&text)),
            Err(e) => output::warning(&format!("{}; ignoring manifest", e)),
        }
    }

    Ok(deps)
}

/// Top-level module names imported by `content`, private names excluded.
pub fn scan_imports(content: &str) -> DependencySet {
    IMPORT_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
        .filter(|name| !name.is_empty() && !name.starts_with('_'))
        .map(str::to_string)
        .collect()
}

/// Locate `requirements.txt` in the same directory as `source`.
pub fn find_manifest(source: &Path) -> Option<PathBuf> {
    let dir = match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let manifest = dir.join(MANIFEST_FILE);
    manifest.is_file().then_some(manifest)
}

/// Package names declared in a manifest.
pub fn parse_manifest(content: &str) -> DependencySet {
    content.lines().filter_map(parse_manifest_line).collect()
}

/// Package name of a single manifest line.
///
/// Returns `None` for blank lines, comments, and lines that are only a pin
/// (e.g. `==1.0`).
pub fn parse_manifest_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let name = VERSION_OPERATORS
        .iter()
        .fold(line, |acc, op| acc.split(op).next().unwrap_or(acc))
        .trim();

    (!name.is_empty()).then(|| name.to_string())
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PackError::NotFound(path.to_path_buf()),
        _ => PackError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;
    String::from_utf8(bytes).map_err(|e| PackError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn set(names: &[&str]) -> DependencySet {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn write_source(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("app.py");
        std::fs::write(&path, content).unwrap();
        path
    }

    // ==================== Import scanning ====================

    #[test]
    fn test_scan_plain_and_from_imports() {
        let src = "import os\nfrom json import loads\nimport sys.path\n";
        assert_eq!(scan_imports(src), set(&["os", "json", "sys"]));
    }

    #[test]
    fn test_scan_takes_top_level_of_dotted_from() {
        let src = "from PyQt6.QtWidgets import QApplication\n";
        assert_eq!(scan_imports(src), set(&["PyQt6"]));
    }

    #[test]
    fn test_scan_skips_private_names() {
        let src = "import _internal\nfrom _private.mod import x\nimport ok\n";
        assert_eq!(scan_imports(src), set(&["ok"]));
    }

    #[test]
    fn test_scan_requires_column_zero() {
        let src = "if True:\n    import os\n  from json import loads\n";
        assert!(scan_imports(src).is_empty());
    }

    #[test]
    fn test_scan_ignores_relative_from() {
        let src = "from . import sibling\nfrom .pkg import thing\n";
        assert!(scan_imports(src).is_empty());
    }

    #[test]
    fn test_scan_only_first_of_multi_import() {
        let src = "import os, sys\n";
        assert_eq!(scan_imports(src), set(&["os"]));
    }

    #[test]
    fn test_scan_crlf_lines() {
        let src = "import os\r\nfrom json import dumps\r\n";
        assert_eq!(scan_imports(src), set(&["os", "json"]));
    }

    // ==================== Manifest parsing ====================

    #[test]
    fn test_manifest_line_pins() {
        assert_eq!(parse_manifest_line("requests==2.31.0").as_deref(), Some("requests"));
        assert_eq!(parse_manifest_line("numpy >= 1.26").as_deref(), Some("numpy"));
        assert_eq!(parse_manifest_line("  rich<=13  ").as_deref(), Some("rich"));
        assert_eq!(parse_manifest_line("click").as_deref(), Some("click"));
    }

    #[test]
    fn test_manifest_line_skips_comments_and_blanks() {
        assert_eq!(parse_manifest_line(""), None);
        assert_eq!(parse_manifest_line("   "), None);
        assert_eq!(parse_manifest_line("# pinned for CI"), None);
        assert_eq!(parse_manifest_line("   # indented comment"), None);
    }

    #[test]
    fn test_manifest_line_only_pin_is_dropped() {
        assert_eq!(parse_manifest_line("==1.0.0"), None);
        assert_eq!(parse_manifest_line(" >= 2"), None);
    }

    #[test]
    fn test_manifest_line_first_operator_wins() {
        assert_eq!(parse_manifest_line("a>=1,<=2").as_deref(), Some("a"));
        assert_eq!(parse_manifest_line("b<=2==3").as_deref(), Some("b"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_manifest_line_yields_trimmed_name(
            name in "[A-Za-z][A-Za-z0-9_.-]{0,20}",
            lead in "[ \t]{0,3}",
            gap in "[ \t]{0,3}",
            tail in "[ \t]{0,3}",
            op in prop::sample::select(VERSION_OPERATORS.to_vec()),
            (major, minor, patch) in (0u32..100, 0u32..100, 0u32..100),
        ) {
            let line = format!("{lead}{name}{gap}{op}{major}.{minor}.{patch}{tail}");
            prop_assert_eq!(parse_manifest_line(&line), Some(name.clone()));
        }
    }

    // ==================== extract_dependencies ====================

    #[test]
    fn test_extract_scenario_with_manifest() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            "import os\nfrom json import loads\nimport _internal\n\nprint(loads('{}'))\n",
        );
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            "# runtime deps\nrequests==2.31.0\n",
        )
        .unwrap();

        let deps = extract_dependencies(&source).unwrap();
        assert_eq!(deps, set(&["os", "json", "requests"]));
    }

    #[test]
    fn test_extract_no_imports_no_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "print('hello')\n");
        assert!(extract_dependencies(&source).unwrap().is_empty());
    }

    #[test]
    fn test_extract_duplicates_collapse() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "import requests\nfrom requests import get\n");
        std::fs::write(dir.path().join(MANIFEST_FILE), "requests>=2\n").unwrap();
        assert_eq!(extract_dependencies(&source).unwrap(), set(&["requests"]));
    }

    #[test]
    fn test_extract_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = extract_dependencies(&dir.path().join("missing.py"));
        assert!(matches!(result, Err(PackError::NotFound(_))));
    }

    #[test]
    fn test_extract_non_utf8_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.py");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x69]).unwrap();
        let result = extract_dependencies(&path);
        assert!(matches!(result, Err(PackError::Read { .. })));
    }

    #[test]
    fn test_extract_non_utf8_manifest_keeps_imports() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "import os\n");
        std::fs::write(dir.path().join(MANIFEST_FILE), [0xff, 0xfe, 0x0a]).unwrap();

        assert_eq!(extract_dependencies(&source).unwrap(), set(&["os"]));
    }

    #[test]
    fn test_find_manifest_absent() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "");
        assert!(find_manifest(&source).is_none());
    }

    #[test]
    fn test_find_manifest_ignores_directory() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "");
        std::fs::create_dir(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(find_manifest(&source).is_none());
    }
}
