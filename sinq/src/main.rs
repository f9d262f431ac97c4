//! sinq: Survey Inquiry - interactive inspector for tabular survey data.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;
mod repl;

/// Environment variable holding a tracing filter (e.g. `survey=debug`).
const LOG_ENV: &str = "SINQ_LOG";

#[derive(Parser)]
#[command(name = "sinq")]
#[command(about = "Survey Inquiry - inspect survey questions, answers and distributions")]
#[command(version)]
struct Cli {
    /// Survey workbook (.xlsx) or JSON dump to load (default: data_file from config)
    #[arg(short = 'f', long = "file", global = true)]
    file: Option<PathBuf>,

    /// Config directory (default: $SINQ_HOME, then the platform config dir)
    #[arg(long = "config-dir", global = true)]
    config_dir: Option<PathBuf>,

    /// Neither read nor write the survey cache
    #[arg(long = "no-cache", global = true)]
    no_cache: bool,

    /// Ignore any existing cache and re-read the workbook
    #[arg(long = "rebuild-cache", global = true, conflicts_with = "no_cache")]
    rebuild_cache: bool,

    /// Log more (-v info, -vv debug); overrides SINQ_LOG
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (default)
    Shell,

    /// Run one inspector command line and exit (e.g. sinq run "analyze Employment")
    Run {
        /// Command and arguments; several words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },

    /// Manage the survey cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Write the loaded survey as a JSON dump (.json, or .json.gz to compress)
    Dump {
        /// Output file
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Read the workbook and (re)write its cache
    Build,

    /// Remove the cache file
    Clear,

    /// Show cache location, age and freshness
    Info,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let env = match commands::Env::resolve(
        cli.config_dir.as_deref(),
        cli.file,
        cli.no_cache,
        cli.rebuild_cache,
    ) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => repl::run(&env),
        Commands::Run { line } => commands::run_line(&env, &line.join(" ")),
        Commands::Cache { action } => match action {
            CacheAction::Build => commands::cache_build(&env),
            CacheAction::Clear => commands::cache_clear(&env),
            CacheAction::Info => commands::cache_info(&env),
        },
        Commands::Dump { out } => commands::dump(&env, &out),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
