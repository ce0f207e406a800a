pub mod app;
pub mod script;

pub use app::{Cli, Commands, ConfigCommands, ConfigSubcommands};
pub use script::{DEMO_SCRIPT, Session, Step, StepReport, parse_script};
