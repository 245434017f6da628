//! Packager command-line assembly
//!
//! Renders [`BuildOptions`] into the argv handed to PyInstaller. Token order
//! is fixed:
//!
//! ```text
//! pyinstaller [--onefile] [--noconsole] [--icon <path>]
//!             [--hidden-import <name>]... [--add-data=<path><sep>.]...
//!             <source>
//! ```
//!
//! `--name <name>` is not part of the preview. It is spliced in right before
//! the source token when the command is actually invoked (see
//! [`with_output_name`]).

use super::options::BuildOptions;

/// Default packaging tool executable
pub const PACKAGER: &str = "pyinstaller";

/// Separator between source and destination in `--add-data`
#[cfg(windows)]
pub const DATA_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const DATA_SEPARATOR: char = ':';

const ADD_DATA_PREFIX: &str = "--add-data=";

/// Render the preview command using the default packager.
pub fn render_command(options: &BuildOptions) -> Vec<String> {
    render_command_with(PACKAGER, options)
}

/// Render the preview command with `tool` as the first token.
pub fn render_command_with(tool: &str, options: &BuildOptions) -> Vec<String> {
    let mut command = vec![tool.to_string()];

    if options.onefile {
        command.push("--onefile".to_string());
    }
    if options.noconsole {
        command.push("--noconsole".to_string());
    }
    if let Some(icon) = options.icon_path() {
        command.push("--icon".to_string());
        command.push(icon.to_string());
    }
    for name in options.hidden_import_names() {
        command.push("--hidden-import".to_string());
        command.push(name.to_string());
    }
    for path in options.resource_paths() {
        command.push(format!("{}{}{}.", ADD_DATA_PREFIX, path, DATA_SEPARATOR));
    }
    if !options.source.is_empty() {
        command.push(options.source.clone());
    }

    command
}

/// The argv actually executed: the preview plus `--name`, if one is set.
pub fn invocation_command(tool: &str, options: &BuildOptions) -> Vec<String> {
    let preview = render_command_with(tool, options);
    match options.output_name() {
        Some(name) => with_output_name(&preview, &options.source, name),
        None => preview,
    }
}

/// Insert `--name <name>` immediately before the last `source` token.
///
/// Falls back to appending at the end when `source` is not in `command`.
pub fn with_output_name(command: &[String], source: &str, name: &str) -> Vec<String> {
    let mut out = command.to_vec();
    // The source is rendered last; search from the end, never the tool token
    let position = out
        .iter()
        .skip(1)
        .rposition(|t| t == source)
        .map(|i| i + 1);

    match position {
        Some(i) => {
            out.insert(i, name.to_string());
            out.insert(i, "--name".to_string());
        }
        None => {
            out.push("--name".to_string());
            out.push(name.to_string());
        }
    }
    out
}

/// Join tokens the way the preview and the history log show them.
pub fn preview_string(command: &[String]) -> String {
    command.join(" ")
}

/// Recover [`BuildOptions`] from a rendered or invoked command.
///
/// Returns `None` for unknown flags or a flag missing its value.
pub fn parse_command(command: &[String]) -> Option<BuildOptions> {
    let mut options = BuildOptions::default();
    let mut tokens = command.iter().skip(1);

    while let Some(token) = tokens.next() {
        match token.as_str() {
            "--onefile" => options.onefile = true,
            "--noconsole" => options.noconsole = true,
            "--icon" => options.icon = Some(tokens.next()?.clone()),
            "--name" => options.name = Some(tokens.next()?.clone()),
            "--hidden-import" => {
                options.hidden_imports.push(tokens.next()?.clone());
            }
            t if t.starts_with(ADD_DATA_PREFIX) => {
                let spec = &t[ADD_DATA_PREFIX.len()..];
                let suffix = format!("{}.", DATA_SEPARATOR);
                let path = spec.strip_suffix(suffix.as_str())?;
                options.resources.push(path.to_string());
            }
            t if t.starts_with("--") => return None,
            t => options.source = t.to_string(),
        }
    }

    Some(options)
}
