mod app;
mod cli;
mod config;
mod output;
mod utils;

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, warn};

use cli::Cli;
use config::{Config, ConfigOrigin};

fn main() -> ExitCode {
    let (config, origin) = Config::load();
    let cli = Cli::parse().with_config(&config);

    utils::init_logging(
        cli.log_level(),
        cli.log_format.unwrap_or_default(),
        cli.use_color(),
    );
    match &origin {
        ConfigOrigin::File(path) => debug!(path = %path.display(), "loaded config"),
        ConfigOrigin::Invalid { path, error } => {
            warn!(path = %path.display(), error = %error, "ignoring unreadable config");
        }
        ConfigOrigin::Default => {}
    }

    match app::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            app::report_error(&e, cli.json);
            ExitCode::FAILURE
        }
    }
}
