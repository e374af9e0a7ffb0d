use std::str::ParseBoolError;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Default)]
pub struct LoggingConfig {
    /// Allow debug logging from noisy dependencies
    pub allow_noisy: bool,
}

#[derive(Debug, Error)]
pub enum LoggingConfigError {
    #[error("failed to parse ADIMPORT_LOGGING_ALLOW_NOISY")]
    InvalidAllowNoisy(ParseBoolError),
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, LoggingConfigError> {
        let allow_noisy = std::env::var("ADIMPORT_LOGGING_ALLOW_NOISY")
            .ok()
            .map(|value| value.parse::<bool>())
            .transpose()
            .map_err(LoggingConfigError::InvalidAllowNoisy)?
            .unwrap_or_default();

        Ok(Self { allow_noisy })
    }
}

/// Install the global subscriber, logs are written to stderr so they
/// don't interleave with the import report
pub fn init_logging(config: LoggingConfig) -> eyre::Result<()> {
    let filter = filter_layer(config.allow_noisy)?;

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        // Display source code file paths
        .with_file(true)
        // Display source code line numbers
        .with_line_number(true)
        // Don't display the event's target (module path)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(())
}

/// Filter from `RUST_LOG`, only warnings are shown by default
pub fn filter_layer(allow_noisy: bool) -> Result<EnvFilter, ParseError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    if allow_noisy {
        return Ok(filter);
    }

    // Increase logging requirements for noisy dependencies
    Ok(filter.add_directive("ldap3=warn".parse()?))
}
