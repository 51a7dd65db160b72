//! Logging setup for hosts embedding the drill services.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a compact fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Returns `false` if a
/// global subscriber was already set, which is not an error.
pub fn init_logging(default_level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let _ = init_logging(Level::DEBUG);
        assert!(!init_logging(Level::INFO));
    }
}
