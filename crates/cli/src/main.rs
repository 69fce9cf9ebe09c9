//! mergescan command-line tool.
//!
//! Reports the merge conflicts of a git repository (or a single file) as
//! JSON for automated resolvers, or as tables for people. Also generates and
//! validates the configuration file.

mod output;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mergescan_core::{ConflictReporter, ScanConfig};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Find and classify merge-conflict blocks.
#[derive(Parser, Debug)]
#[command(
    name = "mergescan",
    version,
    about = "Find and classify merge-conflict blocks for automated resolution"
)]
struct Cli {
    /// Path to the TOML configuration file.
    /// [default: <config dir>/mergescan/config.toml, if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides RUST_LOG and
    /// the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report every conflicted file of a repository.
    Scan {
        /// Repository path (any directory inside the work tree).
        repo: Option<PathBuf>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Emit single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Analyze a single file, inside a repository or not.
    File {
        /// File to scan for conflict markers.
        path: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        /// [default: <config dir>/mergescan/config.toml]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Init { output } => {
            init_logging(cli.log_level.as_deref(), None);
            cmd_init(output)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            init_logging(cli.log_level.as_deref(), None);
            cmd_validate(cli.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scan {
            repo,
            format,
            compact,
        } => {
            let config = prepare_config(cli.config.as_deref(), cli.log_level.as_deref())?;
            cmd_scan(&config, repo, format, compact)
        }
        Commands::File { path, format } => {
            let config = prepare_config(cli.config.as_deref(), cli.log_level.as_deref())?;
            let reporter =
                ConflictReporter::from_config(&config).context("invalid configuration")?;
            cmd_file(&reporter, &path, format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Install the stderr subscriber. Level precedence: `--log-level`, then
/// `RUST_LOG`, then the config file, then `warn`.
///
/// An unparsable level is reported on stderr and replaced by `warn`.
fn init_logging(cli_level: Option<&str>, config_level: Option<&str>) {
    let filter = match cli_level {
        Some(level) => parse_filter(level, "--log-level"),
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => parse_filter(config_level.unwrap_or("warn"), "log.level"),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn parse_filter(level: &str, source: &str) -> EnvFilter {
    match EnvFilter::try_new(level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!(
                "{}",
                style::warn(&format!("invalid {source} {level:?} ({e}), using warn"))
            );
            EnvFilter::new("warn")
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mergescan").join("config.toml"))
}

/// Resolve the config file: an explicit path must exist, the default path
/// is optional. Returns the path actually loaded, if any.
fn load_config(explicit: Option<&Path>) -> Result<(ScanConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok((ScanConfig::default(), None)),
        },
    };
    let config = ScanConfig::load_from_file(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    Ok((config, Some(path)))
}

/// Load the configuration and install logging at the level it names.
fn prepare_config(config_path: Option<&Path>, log_level: Option<&str>) -> Result<ScanConfig> {
    let (config, loaded) = match load_config(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(log_level, None);
            return Err(e);
        }
    };
    init_logging(log_level, Some(&config.log.level));
    match &loaded {
        Some(path) => debug!(path = %path.display(), "using configuration file"),
        None => debug!("no configuration file, using built-in defaults"),
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

/// Scan and print. Invalid configuration and git failures both produce the
/// error report, so callers parsing JSON always get an object.
fn cmd_scan(
    config: &ScanConfig,
    repo: Option<PathBuf>,
    format: OutputFormat,
    compact: bool,
) -> Result<ExitCode> {
    let repo = match repo {
        Some(path) => path,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };

    match ConflictReporter::scan_with_config(config, &repo) {
        Ok(report) => {
            match format {
                OutputFormat::Json => print_json(&report, compact)?,
                OutputFormat::Table => output::print_report(&report),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "error": e.to_string(), "files": [] }));
                }
                OutputFormat::Table => eprintln!("{}", style::error(&e.to_string())),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_file(reporter: &ConflictReporter, path: &Path, format: OutputFormat) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("not a file: {}", path.display());
    }

    let rel_path = path.to_string_lossy();
    let report = reporter.report_file(Path::new(""), &rel_path);
    match format {
        OutputFormat::Json => print_json(&report, false)?,
        OutputFormat::Table => output::print_file(&report),
    }
    Ok(())
}

fn cmd_init(output: Option<PathBuf>) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => default_config_path().context(
            "cannot determine the user config directory; pass --output explicitly",
        )?,
    };

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    let body = ScanConfig::default()
        .to_toml()
        .context("failed to render default configuration")?;
    let contents = format!(
        "# mergescan configuration\n\
         # Every section is optional; omitted keys use the values shown here.\n\n{body}"
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, contents).context("failed to write config file")?;

    let written = format!("Default configuration written to {}", output.display());
    println!("{}", style::success(&written));
    println!();
    println!("Next steps:");
    println!("  1. Adjust the pattern tables or lock-file list for your ecosystems");
    println!(
        "  2. Validate with: mergescan validate --config {}",
        output.display()
    );
    Ok(())
}

fn cmd_validate(config_path: Option<&Path>) -> Result<()> {
    let (config, loaded) = load_config(config_path)?;
    match &loaded {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!(
            "{}",
            style::dim("No configuration file found, validating built-in defaults")
        ),
    }
    println!();
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All values are valid and every pattern compiles"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Log level        : {}", config.log.level);
    println!("  Context lines    : {}", config.scan.context_lines);
    println!("  Binary sniff     : {} bytes", config.scan.binary_sniff_bytes);
    println!(
        "  Superset guard   : larger <= smaller x {} + {}",
        config.classifier.superset_ratio, config.classifier.superset_slack
    );
    println!("  Import patterns  : {}", config.classifier.import_patterns.len());
    println!("  Lock files       : {}", config.files.lock_files.join(", "));
    println!();
    println!("{}", style::success("Configuration is valid."));
    Ok(())
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("failed to serialize report")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["mergescan", "scan"]).unwrap();
        match cli.command {
            Commands::Scan {
                repo,
                format,
                compact,
            } => {
                assert!(repo.is_none());
                assert_eq!(format, OutputFormat::Json);
                assert!(!compact);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mergescan",
            "scan",
            "/tmp/repo",
            "--format",
            "table",
            "--compact",
            "--config",
            "/tmp/mergescan.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/mergescan.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Commands::Scan {
                format: OutputFormat::Table,
                compact: true,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_file_requires_path() {
        assert!(Cli::try_parse_from(["mergescan", "file"]).is_err());
        let cli = Cli::try_parse_from(["mergescan", "file", "src/lib.rs"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::File { ref path, .. } if path == Path::new("src/lib.rs")
        ));
    }

    #[test]
    fn test_load_config_explicit_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_config_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergescan.toml");
        std::fs::write(&path, "[scan]\ncontext_lines = 7\n").unwrap();
        let (config, loaded) = load_config(Some(&path)).unwrap();
        assert_eq!(config.scan.context_lines, 7);
        assert_eq!(loaded, Some(path));
    }

    #[test]
    fn test_init_writes_loadable_config_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        cmd_init(Some(path.clone())).unwrap();
        let config = ScanConfig::load_and_validate(&path).unwrap();
        assert_eq!(config.scan.context_lines, 3);

        assert!(cmd_init(Some(path)).is_err());
    }

    #[test]
    fn test_file_command_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ConflictReporter::default();
        assert!(cmd_file(&reporter, dir.path(), OutputFormat::Json).is_err());
    }

    #[test]
    fn test_parse_filter_falls_back_on_invalid_level() {
        assert_eq!(parse_filter("debug", "--log-level").to_string(), "debug");
        assert_eq!(parse_filter("debug=verbose", "--log-level").to_string(), "warn");
    }

    #[test]
    fn test_scan_with_invalid_config_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ScanConfig::default();
        config.classifier.import_patterns = vec!["(".into()];
        let code = cmd_scan(
            &config,
            Some(dir.path().to_path_buf()),
            OutputFormat::Json,
            true,
        )
        .unwrap();
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::FAILURE));
    }
}
