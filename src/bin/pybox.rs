//! pybox CLI - package Python scripts with PyInstaller
//!
//! Usage:
//!   pybox deps <script>              Show auto-detected dependencies
//!   pybox preview <script> [opts]    Print the PyInstaller command
//!   pybox build <script> [opts]      Run PyInstaller and record the build
//!   pybox history [--clear]          Show or clear build history
//!   pybox probe                      Check that PyInstaller is installed
//!   pybox install                    Install the pinned PyInstaller release

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pybox::core::history::format_entries;
use pybox::{
    install_packager, output, preview_string, render_command_with, BuildOptions, Builder, Config,
    HistoryStore, JsonHistory, PackError, Packager, SystemPackager, ToolVersion,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pybox")]
#[command(about = "Package Python scripts into standalone executables with PyInstaller")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short = 'c', long, global = true, env = "PYBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Packaging tool executable (overrides config)
    #[arg(long, global = true, env = "PYBOX_TOOL")]
    tool: Option<String>,

    /// Build history file (overrides config)
    #[arg(long, global = true, env = "PYBOX_HISTORY")]
    history_file: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show dependencies detected from imports and requirements.txt
    Deps {
        /// Python script to scan
        source: PathBuf,
    },

    /// Print the command that `build` would preview
    Preview {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Run PyInstaller on a script
    Build {
        #[command(flatten)]
        args: BuildArgs,

        /// Install PyInstaller first if it is missing
        #[arg(long)]
        install: bool,
    },

    /// Show build history, newest first
    History {
        /// Remove all history entries
        #[arg(long)]
        clear: bool,
    },

    /// Check whether the packaging tool is installed
    Probe,

    /// Install the pinned PyInstaller release with pip
    Install,
}

#[derive(Args)]
struct BuildArgs {
    /// Python script to package
    source: PathBuf,

    /// Name of the executable (defaults to the script name)
    #[arg(short, long)]
    name: Option<String>,

    /// Let PyInstaller pick the name
    #[arg(long, conflicts_with = "name")]
    no_name: bool,

    /// Bundle into a single executable
    #[arg(long, conflicts_with = "onedir")]
    onefile: bool,

    /// Bundle into a directory
    #[arg(long)]
    onedir: bool,

    /// Hide the console window
    #[arg(long)]
    noconsole: bool,

    /// Icon file (.ico)
    #[arg(short, long)]
    icon: Option<String>,

    /// Hidden import; repeatable, comma-separated lists allowed
    #[arg(long = "hidden-import", value_name = "NAMES")]
    hidden_imports: Vec<String>,

    /// Extra data file or directory; repeatable, `;`-separated lists allowed
    #[arg(long = "add-data", value_name = "PATHS")]
    resources: Vec<String>,

    /// Add auto-detected dependencies to the --hidden-import list (merged,
    /// not replacing names given explicitly)
    #[arg(long)]
    auto_deps: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    output::set_verbose(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::from(exit_status_for(&e))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(tool) = cli.tool {
        config.tool = tool;
    }
    if let Some(path) = cli.history_file {
        config.history_file = path;
    }
    config.tool = resolve_tool(&config.tool)?;
    output::debug(&format!("history file: {}", config.history_file.display()));

    match cli.command {
        Commands::Deps { source } => show_deps(&source)?,

        Commands::Preview { args } => {
            let options = build_options(&args, &config)?;
            let preview = render_command_with(&config.tool, &options);
            println!("{}", preview_string(&preview));
            output::debug(&format!(
                "invoked as: {}",
                pybox::invocation_command(&config.tool, &options).join(" ")
            ));
        }

        Commands::Build { args, install } => {
            let options = build_options(&args, &config)?;
            build(&options, &config, install)?;
        }

        Commands::History { clear } => {
            let history = JsonHistory::new(&config.history_file);
            if clear {
                history.clear().context("Failed to clear history")?;
                output::success("History cleared");
            } else {
                print!("{}", format_entries(&history.entries()));
            }
        }

        Commands::Probe => {
            let packager = SystemPackager::new(&config.tool);
            probe(&packager, &config)?;
        }

        Commands::Install => install(&config)?,
    }

    Ok(())
}

/// Turn CLI flags into build options.
fn build_options(args: &BuildArgs, config: &Config) -> Result<BuildOptions> {
    // The packager runs in the script's directory, so always hand it an absolute path
    let source = std::path::absolute(&args.source)
        .with_context(|| format!("Invalid source path: {}", args.source.display()))?;

    let onefile = if args.onefile {
        true
    } else if args.onedir {
        false
    } else {
        config.onefile
    };

    let mut options = BuildOptions::new(source.to_string_lossy())
        .onefile(onefile)
        .noconsole(args.noconsole);

    if !args.no_name {
        options.name = args
            .name
            .clone()
            .or_else(|| BuildOptions::default_name(&source));
    }
    if let Some(icon) = &args.icon {
        options = options.with_icon(icon.clone());
    }
    for entry in &args.hidden_imports {
        options = options.hidden_import(entry.clone());
    }
    for entry in &args.resources {
        options = options.resource(entry.clone());
    }

    if args.auto_deps {
        let deps = pybox::extract_dependencies(&source)
            .with_context(|| format!("Failed to detect dependencies of {}", source.display()))?;
        output::debug(&format!("auto-detected: {}", join_names(&deps)));
        for dep in deps {
            options = options.hidden_import(dep);
        }
    }

    Ok(options)
}

fn show_deps(source: &Path) -> Result<()> {
    let deps = pybox::extract_dependencies(source)
        .with_context(|| format!("Failed to detect dependencies of {}", source.display()))?;

    if deps.is_empty() {
        output::info("No dependencies found");
        return Ok(());
    }

    output::info(&format!("Found {} dependencies:", deps.len()));
    for dep in &deps {
        output::list_item(dep);
    }
    println!();
    println!("--hidden-import \"{}\"", join_names(&deps));
    Ok(())
}

fn build(options: &BuildOptions, config: &Config, install_missing: bool) -> Result<()> {
    let packager = SystemPackager::new(&config.tool);
    let history = JsonHistory::new(&config.history_file);

    let version = match probe(&packager, config) {
        Ok(version) => version,
        Err(e) if install_missing && is_tool_missing(&e) => {
            install(config)?;
            probe(&packager, config)?
        }
        Err(e) if is_tool_missing(&e) => {
            return Err(e.context("Run `pybox install` or pass --install"));
        }
        Err(e) => return Err(e),
    };

    output::action(&format!("Building {}", options.source));
    output::detail(&pybox::invocation_command(&config.tool, options).join(" "));

    let report = Builder::new(&packager, &history)
        .build_with_version(options, version)
        .context("Build failed")?;

    output::success("Executable created");
    output::info(&format!("Output directory: {}", report.output_dir.display()));
    if let Some(artifact) = report.artifact {
        if artifact.exists() {
            output::info(&format!("Executable: {}", artifact.display()));
        } else {
            output::debug(&format!("expected executable not found: {}", artifact.display()));
        }
    }
    Ok(())
}

fn probe(packager: &SystemPackager, config: &Config) -> Result<ToolVersion> {
    let pb = output::spinner(&format!("Checking {}", packager.tool()));
    match packager.probe() {
        Ok(version) => {
            output::progress_success(pb, &format!("{} {}", packager.tool(), version));
            if !version.matches_pin(&config.pinned_version) {
                output::debug(&format!(
                    "installed version differs from pinned {}",
                    config.pinned_version
                ));
            }
            Ok(version)
        }
        Err(e) => {
            output::progress_fail(pb, &format!("{} unavailable", packager.tool()));
            Err(e.into())
        }
    }
}

fn install(config: &Config) -> Result<()> {
    output::action(&format!(
        "Installing pyinstaller=={} with {}",
        config.pinned_version, config.python
    ));
    install_packager(&config.python, &config.pinned_version)
        .context("Failed to install PyInstaller")?;
    output::success("PyInstaller installed");
    Ok(())
}

/// Make a relative tool path absolute; bare names are left for PATH lookup.
fn resolve_tool(tool: &str) -> Result<String> {
    let path = Path::new(tool);
    if path.components().count() > 1 && path.is_relative() {
        let abs = std::path::absolute(path)
            .with_context(|| format!("Invalid tool path: {}", tool))?;
        return Ok(abs.to_string_lossy().into_owned());
    }
    Ok(tool.to_string())
}

fn join_names<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_tool_missing(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<PackError>(), Some(PackError::ToolMissing(_)))
}

/// Surface the packager's own exit code; everything else is 1.
fn exit_status_for(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<PackError>())
        .and_then(PackError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
