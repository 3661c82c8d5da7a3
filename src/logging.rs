//! Log subscriber setup.

use crate::config::LoggerConfig;
use crate::error::{DdnsError, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggerConfig) -> Result<()> {
    let level = parse_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!config.disable_color)
        .with_target(false);

    let installed = if config.disable_timestamp {
        builder.without_time().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| DdnsError::Config(format!("Failed to set up logger: {}", e)))
}

fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .trim()
        .parse()
        .map_err(|_| DdnsError::Config(format!("Invalid logger level: {}", level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level(" info ").unwrap(), LevelFilter::INFO);
        assert!(parse_level("verbose").is_err());
    }
}
