//! Point d'entrée CLI pour hatake

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, EnvFilter};

use areamap::AreamapError;
use hatake_pg::AppSettings;

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, DbArgs};

/// Rattacher les codes postaux japonais aux zones de prévision météo
#[derive(Parser)]
#[command(name = "hatake")]
#[command(author, version)]
#[command(about = "Résoudre les codes postaux en zones météo et mesurer la couverture")]
#[command(long_about = "Résout un code postal ou un fragment d'adresse en zone de prévision météo.\n\nLes données viennent de PostgreSQL (variables PG* ou DATABASE_URL) ou d'un snapshot JSON avec --snapshot.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON (défaut : env HATAKE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Utiliser un snapshot JSON au lieu de PostgreSQL
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(flatten)]
    db: DbArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            exit_code_for(&err)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = AppSettings::resolve(cli.config.as_deref())?;
    debug!(settings = ?settings, "Settings loaded");

    let ctx = cli::CommandContext {
        settings,
        db: cli.db,
        snapshot: cli.snapshot,
    };
    cli::run(&ctx, cli.command).await
}

/// 2 pour un code postal absent, 1 pour toute autre erreur
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<AreamapError>() {
        Some(e) if e.is_not_found() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_file(false)
        .with_line_number(false)
        .init();
}
