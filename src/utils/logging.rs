use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

/// Environment variable holding a full `tracing` filter, e.g. `ratecard=debug`
pub(crate) const LOG_ENV: &str = "RATECARD_LOG";

/// Install the stderr subscriber. `RATECARD_LOG` wins over `level`.
pub(crate) fn init_logging(level: &str, format: LogFormat, use_color: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Compact => builder.compact().with_ansi(use_color).try_init(),
        LogFormat::Json => builder.json().with_ansi(false).try_init(),
    };
    if let Err(e) = installed {
        eprintln!("Warning: failed to install logger: {e}");
    }
}
