use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metagrate::app::App;
use metagrate::config::{ConfigLoader, ConfigOverrides, DEFAULT_OUTPUT};
use metagrate::error::MetagrateError;
use metagrate::output::{HumanOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "metagrate")]
#[command(about = "Migrate curator tags between versions of Fragalysis metadata exports")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Migrate tags from SOURCE onto TEMPLATE")]
    Migrate(MigrateArgs),
    #[command(about = "Compare tags for common observations in two metadata files")]
    Diff(DiffArgs),
}

#[derive(Args)]
struct MigrateArgs {
    source: Utf8PathBuf,

    template: Utf8PathBuf,

    #[arg(long, short, help = format!("Output path [default: {DEFAULT_OUTPUT}]"))]
    output: Option<Utf8PathBuf>,

    /// Keep TEMPLATE site aliases and match legacy long codes by observation
    #[arg(long)]
    no_rename_sites: bool,

    /// Keep TEMPLATE rows that have no SOURCE partner
    #[arg(long)]
    allow_unmatched_template: bool,

    /// Curator tag category to migrate (repeatable)
    #[arg(long = "tag-category", value_name = "CATEGORY")]
    tag_categories: Vec<String>,

    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct DiffArgs {
    a: Utf8PathBuf,

    b: Utf8PathBuf,

    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MetagrateError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MetagrateError) -> u8 {
    if error.is_validation() {
        2
    } else if error.is_input() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Migrate(args) => run_migrate(args, output_mode),
        Commands::Diff(args) => run_diff(args, output_mode),
    }
}

fn run_migrate(args: MigrateArgs, output_mode: OutputMode) -> miette::Result<()> {
    let MigrateArgs {
        source,
        template,
        output,
        no_rename_sites,
        allow_unmatched_template,
        tag_categories,
        config,
    } = args;

    let config = ConfigLoader::resolve(config.as_deref())?.apply(ConfigOverrides {
        output,
        no_rename_sites,
        tag_categories,
        allow_unmatched_template,
    });

    let app = App::new(config);
    let result = app.migrate(&source, &template)?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_migrate(&result).into_diagnostic(),
        OutputMode::Interactive => HumanOutput::print_migrate(&result).into_diagnostic(),
    }
}

fn run_diff(args: DiffArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let app = App::new(config);
    let result = app.diff(&args.a, &args.b)?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_diff(&result).into_diagnostic(),
        OutputMode::Interactive => HumanOutput::print_diff(&result).into_diagnostic(),
    }
}
