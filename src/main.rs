use clap::Parser;
use elwf::cli::Cli;
use elwf::config::AppConfig;
use elwf::error::{ElwfError, Result};
use tracing::{debug, error};

mod main_runtime;

use main_runtime::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    let _log_guard = init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("config: {e}");
        }
        return Err(ElwfError::Validation(errors.join("; ")));
    }
    debug!(config_dir = %cli.config.display(), "configuration loaded");

    if let Err(e) = cli.command.run(&config) {
        error!("{e:#}");
        return Err(e.into());
    }
    Ok(())
}
