use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub log_level: String,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            with_target: true,
        }
    }
}

/// Install the global subscriber: `RUST_LOG` (or `log_level`) filter and a stdout fmt layer.
///
/// Calling it again once a subscriber is set is a no-op, which keeps tests and
/// repeated bootstraps safe. Returns whether this call installed the subscriber.
pub fn init_tracing(config: &LogConfig) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stdout_layer = fmt::layer()
        .with_target(config.with_target)
        .with_thread_ids(false);

    Registry::default()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let cfg = LogConfig::default();
        init_tracing(&cfg);
        assert!(!init_tracing(&cfg));
    }
}
