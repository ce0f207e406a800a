use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sacraments-screen")]
#[command(about = "Drive the sacraments screen coordination layer headlessly")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file (overrides the config file)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a JSON script of screen actions against an in-memory parish store
    Run {
        /// Path to the script (a JSON array of steps)
        script: PathBuf,
    },
    /// Run the built-in demonstration script
    Demo,
    /// Configuration management
    Config(ConfigCommands),
}

#[derive(Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Show the effective configuration as TOML
    Show,
    /// Print the default config file location
    Path,
    /// Write the effective configuration to the config file
    Init,
}
