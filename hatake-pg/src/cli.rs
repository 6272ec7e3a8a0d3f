//! Définition et implémentation des commandes CLI
//!
//! - `resolve`, `summarize`, `analyze`: PostgreSQL ou snapshot JSON
//! - `map`, `reset-mapping`, `stats`, `init-schema`, `snapshot`: PostgreSQL

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use deadpool_postgres::Pool;
use tracing::{info, warn};

use areamap::diagnostics::{self, MappingDiagnostics};
use areamap::{
    AddressStore, CoverageReport, MemoryStore, Reporter, Resolution, ResolvedMapping, Resolver,
    Snapshot, SummaryStats,
};
use hatake_pg::db::pool::{create_pool, test_connection, DatabaseConfig};
use hatake_pg::db::schema::{create_schema, table_counts};
use hatake_pg::{mapping, AppSettings, PgStore};

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a postal code (1000001, 100-0001, 〒100-0001) or an address fragment
    Resolve {
        /// Postal code or address fragment
        query: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Compute mapping statistics on demand
    Summarize {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Include per-prefecture and per-rule breakdown
        #[arg(long)]
        detailed: bool,
    },

    /// Store weather area mappings for postal codes that have none
    Map {
        /// Postal codes per transaction (défaut : config / 100)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Resolve without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all stored weather area mappings
    ResetMapping {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show row counts and stored mapping statistics
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Analyze why postal codes fail to map
    Analyze {
        /// Number of unmapped postal codes to inspect (défaut : config / 100)
        #[arg(long)]
        sample: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create tables and indexes
    InitSchema {
        /// Drop schema before creating it
        #[arg(long)]
        drop: bool,
    },

    /// Dump postal codes and weather areas to a JSON snapshot
    Snapshot {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Connexion PostgreSQL, surcharge les variables d'environnement
#[derive(Args, Debug, Clone, Default)]
pub struct DbArgs {
    /// PostgreSQL host (défaut : env PGHOST / DATABASE_URL / localhost)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / hatake)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long, global = true)]
    pub ssl: Option<String>,
}

/// Contexte partagé par les commandes
pub struct CommandContext {
    pub settings: AppSettings,
    pub db: DbArgs,
    pub snapshot: Option<PathBuf>,
}

/// Store ouvert et description de sa source
struct OpenedStore {
    store: Arc<dyn AddressStore>,
    source: String,
}

/// Exécute une commande
pub async fn run(ctx: &CommandContext, command: Commands) -> Result<()> {
    match command {
        Commands::Resolve { query, json } => cmd_resolve(ctx, &query, json).await,
        Commands::Summarize { json, detailed } => cmd_summarize(ctx, json, detailed).await,
        Commands::Map {
            batch_size,
            report,
            dry_run,
        } => {
            let batch_size = batch_size.unwrap_or(ctx.settings.batch_size);
            cmd_map(ctx, batch_size, report.as_deref(), dry_run).await
        }
        Commands::ResetMapping { yes } => cmd_reset_mapping(ctx, yes).await,
        Commands::Stats { json } => cmd_stats(ctx, json).await,
        Commands::Analyze { sample, json } => {
            let sample = sample.unwrap_or(ctx.settings.sample_size);
            cmd_analyze(ctx, sample, json).await
        }
        Commands::InitSchema { drop } => cmd_init_schema(ctx, drop).await,
        Commands::Snapshot { output } => cmd_snapshot(ctx, &output).await,
    }
}

/// Exécute la commande resolve
async fn cmd_resolve(ctx: &CommandContext, query: &str, json: bool) -> Result<()> {
    let opened = open_store(ctx).await?;
    let resolution = Resolver::new(opened.store).resolve(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    match &resolution {
        Resolution::Single(mapping) => println!("{}", format_mapping(mapping)),
        Resolution::Many(mappings) if mappings.is_empty() => {
            println!("No postal code matches {:?}", query);
        }
        Resolution::Many(mappings) => {
            for mapping in mappings {
                println!("{}", format_mapping(mapping));
            }
            println!(
                "\n{} postal codes, {} mapped",
                resolution.len(),
                resolution.mapped()
            );
        }
    }
    Ok(())
}

/// Exécute la commande summarize
async fn cmd_summarize(ctx: &CommandContext, json: bool, detailed: bool) -> Result<()> {
    let opened = open_store(ctx).await?;
    let reporter = Reporter::new(opened.store);

    if detailed {
        let coverage = reporter.coverage().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&coverage)?);
        } else {
            print_summary(&opened.source, &coverage.summary);
            print_coverage(&coverage);
        }
    } else {
        let stats = reporter.summarize().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print_summary(&opened.source, &stats);
        }
    }
    Ok(())
}

/// Exécute la commande map
async fn cmd_map(
    ctx: &CommandContext,
    batch_size: usize,
    report_path: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let report = if dry_run {
        // Un snapshot ne stocke pas de rattachement: tous les codes sont à traiter
        let (pending, areas, source) = match &ctx.snapshot {
            Some(_) => {
                let opened = open_store(ctx).await?;
                (
                    opened.store.all_postal_records().await?,
                    opened.store.all_weather_areas().await?,
                    opened.source,
                )
            }
            None => {
                let store = PgStore::new(connect(ctx).await?, &ctx.settings.schema);
                (
                    store.unmapped_postal_records().await?,
                    store.all_weather_areas().await?,
                    format!("PostgreSQL schema {}", ctx.settings.schema),
                )
            }
        };
        println!("Dry run on {} ({} postal codes)", source, pending.len());
        mapping::plan(&pending, areas, batch_size)
    } else {
        let pool = require_database(ctx, "map").await?;
        mapping::map_unmapped(&pool, &ctx.settings.schema, batch_size).await?
    };

    report.display();
    info!(summary = %report.summary(), status = ?report.status, "Mapping finished");

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        println!("Report saved to {}", path.display());
    }
    Ok(())
}

/// Exécute la commande reset-mapping
async fn cmd_reset_mapping(ctx: &CommandContext, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to clear stored mappings without --yes");
    }
    let pool = require_database(ctx, "reset-mapping").await?;
    let cleared = mapping::reset_mapping(&pool, &ctx.settings.schema).await?;
    println!("Cleared {} stored mappings", cleared);
    Ok(())
}

/// Exécute la commande stats
async fn cmd_stats(ctx: &CommandContext, json: bool) -> Result<()> {
    let pool = require_database(ctx, "stats").await?;
    let counts = table_counts(&pool, &ctx.settings.schema).await?;
    let stored = mapping::stored_statistics(&pool, &ctx.settings.schema).await?;

    if json {
        let value = serde_json::json!({ "tables": counts, "stored_mapping": stored });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== Database statistics ({}) ===", ctx.settings.schema);
    println!("Postal codes: {}", counts.postal_codes);
    println!("Weather areas: {}", counts.weather_areas);
    println!("Prefectures: {}", counts.prefectures);
    println!(
        "Stored mappings: {} / {} ({:.1}%)",
        stored.mapped_count,
        stored.total_postal_codes,
        stored.mapping_rate * 100.0
    );
    Ok(())
}

/// Exécute la commande analyze
async fn cmd_analyze(ctx: &CommandContext, sample: usize, json: bool) -> Result<()> {
    let opened = open_store(ctx).await?;
    let report = diagnostics::analyze(&*opened.store, sample).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_diagnostics(&opened.source, &report);
    }
    Ok(())
}

/// Exécute la commande init-schema
async fn cmd_init_schema(ctx: &CommandContext, drop: bool) -> Result<()> {
    let pool = require_database(ctx, "init-schema").await?;
    create_schema(&pool, &ctx.settings.schema, drop).await?;
    println!("Schema {} ready", ctx.settings.schema);
    Ok(())
}

/// Exécute la commande snapshot
async fn cmd_snapshot(ctx: &CommandContext, output: &Path) -> Result<()> {
    let pool = require_database(ctx, "snapshot").await?;
    let store = PgStore::new(pool, &ctx.settings.schema);

    let snapshot = Snapshot {
        postal_codes: store.all_postal_records().await?,
        weather_areas: store.all_weather_areas().await?,
    };
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(output, json)
        .with_context(|| format!("Cannot write snapshot to {}", output.display()))?;

    println!(
        "Snapshot written to {}: {} postal codes, {} weather areas (version {})",
        output.display(),
        snapshot.postal_codes.len(),
        snapshot.weather_areas.len(),
        snapshot_version(output)?
    );
    Ok(())
}

/// Ouvre le snapshot si `--snapshot` est donné, PostgreSQL sinon
async fn open_store(ctx: &CommandContext) -> Result<OpenedStore> {
    match &ctx.snapshot {
        Some(path) => {
            let start = Instant::now();
            let store = MemoryStore::load(path)?;
            let version = snapshot_version(path)?;
            info!(
                path = %path.display(),
                version = %version,
                postal_codes = store.postal_count(),
                weather_areas = store.area_count(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Snapshot loaded"
            );
            Ok(OpenedStore {
                store: Arc::new(store),
                source: format!("snapshot {} (version {})", path.display(), version),
            })
        }
        None => {
            let pool = connect(ctx).await?;
            let store = PgStore::new(pool, &ctx.settings.schema)
                .with_search_limit(ctx.settings.search_limit);
            Ok(OpenedStore {
                store: Arc::new(store),
                source: format!("PostgreSQL schema {}", ctx.settings.schema),
            })
        }
    }
}

/// Connexion PostgreSQL obligatoire: `--snapshot` n'a pas de sens ici
async fn require_database(ctx: &CommandContext, command: &str) -> Result<Pool> {
    if ctx.snapshot.is_some() {
        anyhow::bail!("`{}` needs PostgreSQL and cannot run on --snapshot", command);
    }
    connect(ctx).await
}

async fn connect(ctx: &CommandContext) -> Result<Pool> {
    let mut db_config = DatabaseConfig::from_env();
    apply_database_overrides(&mut db_config, &ctx.db);
    info!(target_db = %db_config.display_target(), "Connecting to PostgreSQL");

    let pool = create_pool(&db_config).await?;
    test_connection(&pool)
        .await
        .with_context(|| format!("Cannot reach {}", db_config.display_target()))?;
    Ok(pool)
}

fn apply_database_overrides(config: &mut DatabaseConfig, args: &DbArgs) {
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(database) = &args.database {
        config.dbname = database.clone();
    }
    if let Some(user) = &args.user {
        config.user = user.clone();
    }
    if let Some(password) = &args.password {
        config.password = Some(password.clone());
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ssl) = &args.ssl {
        match ssl.parse() {
            Ok(mode) => config.ssl_mode = mode,
            Err(e) => warn!("{e}, keeping {:?}", config.ssl_mode),
        }
    }
}

/// Une ligne par code postal
fn format_mapping(mapping: &ResolvedMapping) -> String {
    let place = format!(
        "{} {}{}",
        mapping.postal_code, mapping.prefecture, mapping.city
    );
    match &mapping.area {
        Some(found) => format!(
            "{}  ->  {} {} {} [{:?}]",
            place, found.area.area_code, found.area.region, found.area.city, found.matched_by
        ),
        None => format!("{}  ->  (no weather area)", place),
    }
}

fn print_summary(source: &str, stats: &SummaryStats) {
    println!("=== Mapping statistics ===");
    println!("Source: {}", source);
    println!("Postal codes: {}", stats.total_postal_codes);
    println!("Mapped: {}", stats.mapped_count);
    println!("Unmapped: {}", stats.unmapped_count);
    println!("Mapping rate: {:.1}%", stats.mapping_rate * 100.0);
}

fn print_coverage(coverage: &CoverageReport) {
    if !coverage.by_rule.is_empty() {
        println!("\n--- BY RULE ---");
        for (kind, count) in &coverage.by_rule {
            println!("  {:?}: {}", kind, count);
        }
    }

    let worst = coverage.worst_prefectures(10);
    if !worst.is_empty() {
        println!("\n--- MOST UNMAPPED PREFECTURES ---");
        for (prefecture, stats) in worst {
            println!(
                "  {}: {} / {} unmapped ({:.1}% mapped)",
                prefecture,
                stats.unmapped_count,
                stats.total_postal_codes,
                stats.mapping_rate * 100.0
            );
        }
    }
}

fn print_diagnostics(source: &str, report: &MappingDiagnostics) {
    println!("=== Mapping diagnostics ===");
    println!("Source: {}", source);
    println!("Postal codes: {}", report.total_postal_codes);
    println!("Unmapped: {}", report.total_unmapped);
    println!("Weather areas: {}", report.total_weather_areas);
    println!("Sample size: {}", report.sample_size);

    if !report.prefectures_without_areas.is_empty() {
        println!("\n--- PREFECTURES WITHOUT WEATHER AREAS ---");
        for (prefecture, count) in &report.prefectures_without_areas {
            println!("  {}: {} postal codes", prefecture, count);
        }
    }

    if !report.city_issues.is_empty() {
        println!("\n--- UNRECOGNIZED CITIES ---");
        for (prefecture, issues) in &report.city_issues {
            println!("  {} ({})", prefecture, issues.len());
            for issue in issues.iter().take(5) {
                println!(
                    "    {} {}: available {}",
                    issue.postal_code,
                    issue.city,
                    issue.available_cities.join(", ")
                );
            }
            if issues.len() > 5 {
                println!("    ... and {} more", issues.len() - 5);
            }
        }
    }

    if !report.pattern_counts.is_empty() {
        println!("\n--- CITY PATTERNS ---");
        for (pattern, count) in &report.pattern_counts {
            println!("  {}: {}", pattern, count);
        }
    }
}

/// Version d'un snapshot: 16 premiers caractères hexadécimaux du hash blake3
pub fn snapshot_version(path: &Path) -> Result<String> {
    let mut checksum = compute_file_checksum(path)?;
    checksum.truncate(16);
    Ok(checksum)
}

fn compute_file_checksum(path: &Path) -> Result<String> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 65536];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
