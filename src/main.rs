mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tvshelf::config::{self, Config};
use tvshelf::scanner::{probe, ScanOptions, Scanner};
use tvshelf::server;
use tvshelf_common::{ScanStatus, ScanType};
use tvshelf_db::pool::{get_conn, init_pool, DbPool};
use tvshelf_db::queries::scan_history;
use tvshelf_parser::ParsedFilename;

/// Open the configured database and fail scans left over from a previous run.
fn open_database(config: &Config) -> Result<DbPool> {
    let path = &config.database.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    tracing::info!("Initializing database at {}", path.display());
    let pool = init_pool(&path.to_string_lossy())?;

    let conn = get_conn(&pool)?;
    match scan_history::reset_orphaned_scans(&conn) {
        Ok(count) if count > 0 => {
            tracing::info!(
                "Marked {} interrupted scans from previous session as failed",
                count
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to reset interrupted scans: {}", e),
    }
    Ok(pool)
}

fn load(config_path: Option<&Path>) -> Result<Config> {
    let config = config::load_config_or_default(config_path)?;
    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting tvshelf server");
    let db_pool = open_database(&config)?;
    server::start_server(config, db_pool).await
}

async fn run_scan(config_path: Option<&Path>, options: ScanOptions) -> Result<()> {
    let config = Arc::new(load(config_path)?);
    let db_pool = open_database(&config)?;
    let scanner = Scanner::new(db_pool, config);

    let interrupt = {
        let scanner = scanner.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling scan");
                scanner.cancel_all();
            }
        })
    };

    let history = scanner.scan(options).await?;
    interrupt.abort();

    println!("Scan {} {}", history.id, history.status);
    println!("  Type:    {}", history.scan_type);
    println!("  Scanned: {}", history.files_scanned);
    println!("  Added:   {}", history.files_added);
    println!("  Updated: {}", history.files_updated);
    println!("  Deleted: {}", history.files_deleted);
    if !history.errors.is_empty() {
        println!("  Errors:  {}", history.errors.len());
        for err in &history.errors {
            match &err.file_path {
                Some(path) => println!("    [{}] {}: {}", err.phase, path, err.message),
                None => println!("    [{}] {}", err.phase, err.message),
            }
        }
    }

    if history.status == ScanStatus::Failed {
        anyhow::bail!("Scan failed");
    }
    Ok(())
}

#[derive(Serialize)]
struct ParseOutput<'a> {
    path: &'a Path,
    parsed: Option<ParsedFilename>,
}

fn parse_paths(paths: &[PathBuf], json: bool) -> Result<()> {
    let results: Vec<ParseOutput> = paths
        .iter()
        .map(|p| ParseOutput {
            path: p,
            parsed: tvshelf_parser::parse(p),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &results {
        match &result.parsed {
            Some(p) => {
                print!(
                    "{}: {} S{:02}E{:02}",
                    result.path.display(),
                    p.show_name,
                    p.season_number,
                    p.episode_number
                );
                if let Some(year) = p.year {
                    print!(" ({})", year);
                }
                if let Some(ref title) = p.episode_title {
                    print!(" \"{}\"", title);
                }
                println!(" [{:?}]", p.convention);
            }
            None => println!("{}: not recognized", result.path.display()),
        }
    }
    Ok(())
}

fn show_history(config_path: Option<&Path>, limit: u32) -> Result<()> {
    let config = load(config_path)?;
    let pool = open_database(&config)?;
    let conn = get_conn(&pool)?;
    let scans = scan_history::list_recent(&conn, limit)?;

    if scans.is_empty() {
        println!("No scans recorded");
        return Ok(());
    }
    for scan in scans {
        println!(
            "{}  {:<9} {:<11} {}  scanned={} added={} updated={} deleted={} errors={}",
            scan.id,
            scan.status,
            scan.scan_type,
            scan.started_at.format("%Y-%m-%d %H:%M:%S"),
            scan.files_scanned,
            scan.files_added,
            scan.files_updated,
            scan.files_deleted,
            scan.errors.len()
        );
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    println!("Checking external tools...\n");

    let tool = probe::check_ffprobe(config.tools.ffprobe_path.as_deref());
    let status = if tool.available { "✓" } else { "✗" };
    print!("{} {}", status, tool.name);
    if let Some(ref version) = tool.version {
        print!(" ({})", version);
    }
    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }
    println!("\n");

    if tool.available {
        println!("All required tools are available!");
    } else {
        println!("ffprobe is missing. Install it or set scanner.skip_metadata = true.");
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.database.path.display());
    println!("  Media paths: {}", config.library.media_paths.len());
    for path in &config.library.media_paths {
        println!("    {}", path.display());
    }
    println!(
        "  Batch size: {}, yield interval: {}",
        config.scanner.batch_size, config.scanner.yield_interval
    );
    for warning in config.warnings() {
        println!("  ! {}", warning);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tvshelf=trace,tvshelf_db=debug,tvshelf_common=debug,tower_http=debug".to_string()
        } else {
            "tvshelf=info,tvshelf_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Scan {
            incremental,
            skip_metadata,
            concurrency,
        } => {
            let options = ScanOptions {
                scan_type: if incremental {
                    ScanType::Incremental
                } else {
                    ScanType::Full
                },
                skip_metadata: skip_metadata.then_some(true),
                concurrency,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_scan(cli.config.as_deref(), options))
        }
        Commands::Parse { paths, json } => parse_paths(&paths, json),
        Commands::History { limit } => show_history(cli.config.as_deref(), limit),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Version => {
            println!("tvshelf {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
