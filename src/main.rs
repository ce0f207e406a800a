use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::info;
use std::path::Path;

use sacraments_screen::cli::{Cli, Commands, ConfigSubcommands, Session, StepReport, parse_script};
use sacraments_screen::cli::DEMO_SCRIPT;
use sacraments_screen::config::Config;
use sacraments_screen::sacraments::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logger to file (truncate on each run)
    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| config.settings.log_file_or_default());
    init_logging(&log_path, &config.settings.log_level)?;
    info!("Starting sacraments-screen");

    match cli.command {
        Commands::Run { script } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script: {:?}", script))?;
            run_script(&text, &config).await
        }
        Commands::Demo => run_script(DEMO_SCRIPT, &config).await,
        Commands::Config(config_commands) => match config_commands.command {
            ConfigSubcommands::Show => {
                let content = toml::to_string_pretty(&config)
                    .context("Failed to serialize config to TOML")?;
                println!("{}", content);
                Ok(())
            }
            ConfigSubcommands::Path => {
                println!("{}", Config::get_config_path()?.display());
                Ok(())
            }
            ConfigSubcommands::Init => {
                match &cli.config {
                    Some(path) => config.save_to(path)?,
                    None => config.save()?,
                }
                println!("{}", "Config written".green());
                Ok(())
            }
        },
    }
}

fn init_logging(path: &Path, level: &str) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {:?}", path))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

async fn run_script(text: &str, config: &Config) -> Result<()> {
    let steps = parse_script(text)?;
    let mut session = Session::new(
        config.settings.controller_settings(),
        MemoryStore::with_sample_data(),
    );
    let reports = session.run(steps).await?;
    for report in &reports {
        print_report(report)?;
    }
    info!("Script finished after {} steps", reports.len());
    Ok(())
}

fn print_report(report: &StepReport) -> Result<()> {
    let failed = report.outcome.get("ok") == Some(&serde_json::Value::Bool(false));
    let op = if failed {
        report.op.red().bold()
    } else {
        report.op.cyan().bold()
    };
    let outcome = if report.op == "snapshot" {
        serde_json::to_string_pretty(&report.outcome)?
    } else {
        serde_json::to_string(&report.outcome)?
    };
    println!("{} {} {}", format!("[{:>2}]", report.index).dimmed(), op, outcome);
    Ok(())
}
