use std::path::PathBuf;
use std::time::Duration;

/// Process configuration, read once from `CLASSALLOC_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    /// Base URL of the remote data source; `None` runs from the local journal only.
    pub source_url: Option<String>,
    pub source_timeout: Duration,
    pub sync_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5433,
            bind: "0.0.0.0".into(),
            data_dir: PathBuf::from("./data"),
            password: "classalloc".into(),
            max_connections: 256,
            compact_threshold: 1000,
            metrics_port: None,
            tls_cert: None,
            tls_key: None,
            source_url: None,
            source_timeout: Duration::from_millis(5000),
            sync_interval: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable numbers fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Self {
            port: lookup("CLASSALLOC_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            bind: lookup("CLASSALLOC_BIND").unwrap_or(defaults.bind),
            data_dir: lookup("CLASSALLOC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            password: lookup("CLASSALLOC_PASSWORD").unwrap_or(defaults.password),
            max_connections: parsed("CLASSALLOC_MAX_CONNECTIONS")
                .map(|n| n as usize)
                .unwrap_or(defaults.max_connections),
            compact_threshold: parsed("CLASSALLOC_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
            metrics_port: lookup("CLASSALLOC_METRICS_PORT").and_then(|s| s.parse().ok()),
            tls_cert: lookup("CLASSALLOC_TLS_CERT"),
            tls_key: lookup("CLASSALLOC_TLS_KEY"),
            source_url: lookup("CLASSALLOC_SOURCE_URL").filter(|s| !s.trim().is_empty()),
            source_timeout: parsed("CLASSALLOC_SOURCE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.source_timeout),
            sync_interval: parsed("CLASSALLOC_SYNC_INTERVAL_SECS")
                .filter(|&s| s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]), Config::default());
    }

    #[test]
    fn overrides_are_read() {
        let c = config(&[
            ("CLASSALLOC_PORT", "6000"),
            ("CLASSALLOC_DATA_DIR", "/var/lib/classalloc"),
            ("CLASSALLOC_COMPACT_THRESHOLD", "50"),
            ("CLASSALLOC_SOURCE_URL", "http://campus.local/api"),
            ("CLASSALLOC_SOURCE_TIMEOUT_MS", "250"),
            ("CLASSALLOC_METRICS_PORT", "9100"),
        ]);
        assert_eq!(c.port, 6000);
        assert_eq!(c.data_dir, PathBuf::from("/var/lib/classalloc"));
        assert_eq!(c.compact_threshold, 50);
        assert_eq!(c.source_url.as_deref(), Some("http://campus.local/api"));
        assert_eq!(c.source_timeout, Duration::from_millis(250));
        assert_eq!(c.metrics_port, Some(9100));
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let c = config(&[
            ("CLASSALLOC_PORT", "not-a-port"),
            ("CLASSALLOC_MAX_CONNECTIONS", "-3"),
            ("CLASSALLOC_SYNC_INTERVAL_SECS", "0"),
            ("CLASSALLOC_SOURCE_URL", "  "),
        ]);
        assert_eq!(c.port, 5433);
        assert_eq!(c.max_connections, 256);
        assert_eq!(c.sync_interval, Duration::from_secs(5));
        assert_eq!(c.source_url, None);
    }
}
