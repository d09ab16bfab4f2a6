//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use eadhier_core::{EadHierarchyRefinery, RefineContext};
use eadhier_markup::EadReader;
use eadhier_shared::{
    AppConfig, LevelConfig, RefineOutput, init_config, load_config, load_config_from, load_levels_from,
    parse_levels_setting,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// eadhier: build collection hierarchies from EAD finding aids.
#[derive(Parser)]
#[command(
    name = "eadhier",
    version,
    about = "Map the components of an EAD <dsc> block onto a nested import record tree.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.eadhier/eadhier.toml.
    #[arg(long, global = true, env = "EADHIER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Map an EAD finding aid's component hierarchy to import records.
    Map(MapArgs),

    /// Print the refinery's availability status.
    Status,

    /// Print the refinery's settings schema.
    Settings,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `eadhier map`.
#[derive(Args)]
pub(crate) struct MapArgs {
    /// EAD XML file to read.
    ead: PathBuf,

    /// Level mappings file (TOML, or JSON with a .json extension).
    #[arg(short, long)]
    levels: Option<PathBuf>,

    /// Level mappings as an inline JSON object.
    #[arg(long, conflicts_with = "levels")]
    levels_json: Option<String>,

    /// Destination element the refinery is attached to.
    #[arg(long)]
    destination: Option<String>,

    /// Entity table of the bound import mapping.
    #[arg(long)]
    bound_table: Option<String>,

    /// Emit compact JSON.
    #[arg(long)]
    compact: bool,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays JSON.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "eadhier=info",
        1 => "eadhier=debug",
        _ => "eadhier=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Map(args) => cmd_map(args, &config),
        Command::Status => cmd_status(),
        Command::Settings => cmd_settings(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

fn cmd_map(args: MapArgs, config: &AppConfig) -> Result<()> {
    let output = refine_ead(&args, config)?;

    let json = if args.compact || !config.defaults.pretty {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), top_level = output.children.len(), "wrote hierarchy");
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Read the EAD file and run the refinery over it with the resolved settings.
///
/// An empty level configuration is treated as no configuration at all.
fn refine_ead(args: &MapArgs, config: &AppConfig) -> Result<RefineOutput> {
    let levels = resolve_levels(args, config)?;
    if levels.is_empty() {
        warn!("no level mappings configured; output will be empty");
    }

    let reader = EadReader::from_file(&args.ead)?;
    let destination = args
        .destination
        .as_deref()
        .unwrap_or(&config.defaults.destination);
    let bound_table = args
        .bound_table
        .as_deref()
        .or(config.defaults.bound_table.as_deref());

    let mut ctx = RefineContext::new(destination).with_reader(&reader);
    if !levels.is_empty() {
        ctx = ctx.with_levels(&levels);
    }
    if let Some(table) = bound_table {
        ctx = ctx.bound_to(table);
    }

    EadHierarchyRefinery
        .refine(&ctx)
        .ok_or_else(|| eyre!("invocation context rejected (destination '{destination}')"))
}

/// `--levels` file, then `--levels-json`, then the config file's `[levels]`.
fn resolve_levels(args: &MapArgs, config: &AppConfig) -> Result<LevelConfig> {
    if let Some(path) = &args.levels {
        return Ok(load_levels_from(path)?);
    }
    if let Some(json) = &args.levels_json {
        return Ok(parse_levels_setting(json)?);
    }
    Ok(config.levels.clone())
}

fn cmd_status() -> Result<()> {
    let status = EadHierarchyRefinery.check_status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn cmd_settings() -> Result<()> {
    let schema = EadHierarchyRefinery.settings_schema();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn map_args_parse() {
        let cli = Cli::try_parse_from([
            "eadhier",
            "-v",
            "map",
            "finding_aid.xml",
            "--levels",
            "levels.toml",
            "--bound-table",
            "ca_collections",
            "--compact",
        ])
        .expect("parse args");
        assert_eq!(cli.verbose, 1);
        let Command::Map(args) = cli.command else {
            panic!("expected map command");
        };
        assert_eq!(args.ead, PathBuf::from("finding_aid.xml"));
        assert_eq!(args.bound_table.as_deref(), Some("ca_collections"));
        assert!(args.compact);
    }

    #[test]
    fn levels_sources_conflict() {
        let result = Cli::try_parse_from([
            "eadhier",
            "map",
            "a.xml",
            "--levels",
            "l.toml",
            "--levels-json",
            "{}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn inline_levels_take_precedence_over_config() {
        let cli = Cli::try_parse_from([
            "eadhier",
            "map",
            "a.xml",
            "--levels-json",
            r#"{"file":{"table":"ca_collections","type":"file"}}"#,
        ])
        .expect("parse args");
        let Command::Map(args) = cli.command else {
            panic!("expected map command");
        };
        let levels = resolve_levels(&args, &AppConfig::default()).expect("levels");
        assert_eq!(levels.len(), 1);
        assert!(levels.contains_key("file"));
    }

    const EAD_FIXTURE: &str = "../../fixtures/ead/finding_aid.xml";

    fn map_args(extra: &[&str]) -> MapArgs {
        let argv = ["eadhier", "map", EAD_FIXTURE].into_iter().chain(extra.iter().copied());
        let cli = Cli::try_parse_from(argv).expect("parse args");
        let Command::Map(args) = cli.command else {
            panic!("expected map command");
        };
        args
    }

    #[test]
    fn empty_levels_are_treated_as_missing() {
        let args = map_args(&["--levels-json", "{}"]);
        let output = refine_ead(&args, &AppConfig::default()).expect("refine");
        assert!(output.children.is_empty());

        // No --levels flag and no [levels] in the config behaves the same.
        let args = map_args(&[]);
        let output = refine_ead(&args, &AppConfig::default()).expect("refine");
        assert!(output.children.is_empty());
    }

    #[test]
    fn rejected_context_is_an_error() {
        let args = map_args(&[
            "--levels",
            "../../fixtures/levels/levels.toml",
            "--destination",
            "ca_collections.preferred_labels",
        ]);
        let err = refine_ead(&args, &AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("ca_collections.preferred_labels"));

        let args = map_args(&[
            "--levels",
            "../../fixtures/levels/levels.toml",
            "--bound-table",
            "ca_objects",
        ]);
        assert!(refine_ead(&args, &AppConfig::default()).is_err());
    }

    #[test]
    fn config_defaults_fill_unset_flags() {
        let mut config = AppConfig::default();
        config.defaults.bound_table = Some("ca_objects".into());
        let args = map_args(&["--levels", "../../fixtures/levels/levels.json"]);
        assert!(refine_ead(&args, &config).is_err());

        let args = map_args(&[
            "--levels",
            "../../fixtures/levels/levels.json",
            "--bound-table",
            "ca_collections",
        ]);
        let output = refine_ead(&args, &config).expect("refine");
        assert!(!output.children.is_empty());
    }
}
