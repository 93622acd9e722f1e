//! Structured logging setup.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! The filter comes from `KB_LOG` when set (standard `EnvFilter` syntax),
//! else from `[logging].level`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_ENV: &str = "KB_LOG";

/// Install the global subscriber. Calling it again is a no-op.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig {
            level: "not a [valid filter".to_string(),
        };
        init(&config);
        init(&LoggingConfig::default());
        tracing::info!("still logging");
    }
}
