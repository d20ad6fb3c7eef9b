mod api;
mod cli;
mod clock;
mod config;
mod db;
mod engine;
mod error;
mod export;
mod model;
mod notify;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::db::Database;
use crate::export::ExportKind;
use anyhow::{Context, Result, bail};
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Config { command } => handle_config_command(command),
        Commands::Stats { from, to } => handle_stats(from, to),
        Commands::Export { kind, from, to } => handle_export(kind, from, to),
    }
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);

    info!("pank service started");

    tokio::select! {
        api_result = api::run_server(shared_config) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn handle_status() -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let today = Local::now().date_naive();
    let today_records = database.attendances_between(&config.company_id, today, today)?;

    println!("pank status");
    println!("- company_id: {}", config.company_id);
    println!("- employees: {}", database.employee_count(&config.company_id)?);
    println!(
        "- present_today: {}",
        today_records.iter().filter(|r| r.has_arrived()).count()
    );
    println!(
        "- late_today: {}",
        today_records.iter().filter(|r| r.is_late()).count()
    );
    println!(
        "- latest_attendance_date: {}",
        database
            .latest_attendance_date(&config.company_id)?
            .map(clock::format_date)
            .unwrap_or_else(|| "none".to_string())
    );
    println!("- api_port: {}", config.api_port);

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path) {
        Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    if config.export_dir.exists() {
        println!("[OK] export dir exists: {}", config.export_dir.display());
    } else {
        println!("[WARN] export dir missing: {}", config.export_dir.display());
        issues.push("export dir missing".to_string());
    }

    if config.verification_ttl_minutes > 0 {
        println!(
            "[OK] verification TTL: {} minute(s)",
            config.verification_ttl_minutes
        );
    } else {
        println!("[WARN] verification_ttl_minutes must be positive");
        issues.push("invalid verification ttl".to_string());
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_stats(from: Option<String>, to: Option<String>) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let today = Local::now().date_naive();
    let (from, to) = resolve_range(from, to)?;

    let statistics = engine::load_statistics(&database, &config.company_id, from, to, today)?;

    println!(
        "Statistics {} .. {}",
        clock::format_date(from),
        clock::format_date(to)
    );
    println!("- total_employees: {}", statistics.total_employees);
    println!("- attendance_rate: {:.1}%", statistics.attendance_rate);
    println!("- total_penalties: {}", statistics.total_penalties);
    println!(
        "- average_productivity: {:.1}",
        statistics.average_productivity
    );
    println!("{}", serde_json::to_string_pretty(&statistics)?);

    Ok(())
}

fn handle_export(kind: String, from: Option<String>, to: Option<String>) -> Result<()> {
    let config = load_config()?;
    let kind = match ExportKind::parse(&kind) {
        Some(kind) => kind,
        None => bail!("Unknown export kind: {kind}. Use attendance, employees, reports or penalties."),
    };
    let (from, to) = resolve_range(from, to)?;

    let database = Database::open(&config.db_path)?;
    let dataset = export::build_dataset(&database, kind, &config.company_id, from, to)?;
    let saved = export::save_export(&dataset, kind, &config.export_dir, from, to)?;

    println!("Export written: {} row(s)", dataset.rows.len());
    println!("- CSV: {}", saved.csv_path.display());
    println!("- JSON: {}", saved.json_path.display());

    Ok(())
}

fn resolve_range(from: Option<String>, to: Option<String>) -> Result<(NaiveDate, NaiveDate)> {
    let today = Local::now().date_naive();
    let to = to.as_deref().map(parse_date).transpose()?.unwrap_or(today);
    let from = from
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or(to - Duration::days(29));

    if from > to {
        bail!("--from must not be after --to");
    }

    Ok((from, to))
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `pank config set` first.".to_string())
}
