use std::env;

const DEFAULT_DB_URL: &str = "sqlite:drill.sqlite3";

/// Endpoint and credentials for completion notices.
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl NotifierConfig {
    /// Reads `DRILL_NOTIFY_URL` and `DRILL_NOTIFY_API_KEY`.
    ///
    /// Returns `None` when either is unset or blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("DRILL_NOTIFY_API_KEY").ok()?;
        let endpoint = env::var("DRILL_NOTIFY_URL").ok()?;
        Self::from_parts(endpoint, api_key)
    }

    fn from_parts(endpoint: String, api_key: String) -> Option<Self> {
        if api_key.trim().is_empty() || endpoint.trim().is_empty() {
            return None;
        }
        Some(Self {
            endpoint: endpoint.trim().to_owned(),
            api_key,
        })
    }
}

/// Runtime configuration, resolved from the environment.
#[derive(Clone, Debug)]
pub struct DrillConfig {
    pub database_url: String,
    pub notifier: Option<NotifierConfig>,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_URL.into(),
            notifier: None,
        }
    }
}

impl DrillConfig {
    /// Reads `DRILL_DB_URL` (default `sqlite:drill.sqlite3`) and the notifier
    /// variables.
    #[must_use]
    pub fn from_env() -> Self {
        let database_url = env::var("DRILL_DB_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.into());
        Self {
            database_url,
            notifier: NotifierConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_notifier_values_disable_notifications() {
        assert!(NotifierConfig::from_parts("https://example.test/hook".into(), " ".into()).is_none());
        assert!(NotifierConfig::from_parts(String::new(), "key".into()).is_none());
    }

    #[test]
    fn endpoint_is_trimmed() {
        let config =
            NotifierConfig::from_parts(" https://example.test/hook ".into(), "key".into()).unwrap();
        assert_eq!(config.endpoint, "https://example.test/hook");
    }

    #[test]
    fn default_config_points_at_local_sqlite() {
        let config = DrillConfig::default();
        assert_eq!(config.database_url, "sqlite:drill.sqlite3");
        assert!(config.notifier.is_none());
    }
}
