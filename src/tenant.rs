use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell};

use crate::config::Config;
use crate::engine::Engine;
use crate::limits::*;
use crate::source::{DataSource, HttpSource};
use crate::sync;

#[derive(Debug, Clone)]
struct RemoteSettings {
    base_url: String,
    timeout: Duration,
}

/// Per-tenant engines, keyed by the sanitised database name of the pgwire
/// connection, which is also the journal's file stem. Each tenant gets its own
/// Engine, journal and sync task.
pub struct TenantManager {
    /// One cell per journal file. A cell is filled at most once, so a journal
    /// is never opened by two engines.
    engines: DashMap<String, Arc<OnceCell<Arc<Engine>>>>,
    data_dir: PathBuf,
    compact_threshold: u64,
    sync_interval: Duration,
    remote: Option<RemoteSettings>,
    /// Guards slot insertion against `MAX_TENANTS`. Never held across a bootstrap.
    creating: Mutex<()>,
}

impl TenantManager {
    pub fn new(data_dir: PathBuf, compact_threshold: u64) -> Self {
        Self {
            engines: DashMap::new(),
            data_dir,
            compact_threshold,
            sync_interval: Duration::from_secs(5),
            remote: None,
            creating: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut tm = Self::new(config.data_dir.clone(), config.compact_threshold);
        tm.sync_interval = config.sync_interval;
        if let Some(url) = &config.source_url {
            tm = tm.with_remote(url, config.source_timeout);
        }
        tm
    }

    pub fn with_remote(mut self, base_url: &str, timeout: Duration) -> Self {
        self.remote = Some(RemoteSettings {
            base_url: base_url.to_string(),
            timeout,
        });
        self
    }

    /// Number of tenants with a live engine.
    pub fn len(&self) -> usize {
        self.engines.iter().filter(|cell| cell.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get or lazily create (and bootstrap) the engine for `tenant`.
    ///
    /// Names that sanitise to the same file stem share one engine. Creating
    /// one tenant never waits on another tenant's bootstrap.
    pub async fn get_or_create(&self, tenant: &str) -> io::Result<Arc<Engine>> {
        if tenant.len() > MAX_TENANT_NAME_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "tenant name too long"));
        }
        let name = sanitize(tenant);
        if name.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty tenant name"));
        }

        if let Some(cell) = self.engines.get(&name) {
            if let Some(engine) = cell.value().get() {
                return Ok(engine.clone());
            }
        }

        let cell = {
            let _creating = self.creating.lock().await;
            let existing = self.engines.get(&name).map(|cell| cell.value().clone());
            match existing {
                Some(cell) => cell,
                None => {
                    if self.engines.len() >= MAX_TENANTS {
                        return Err(io::Error::other("too many tenants"));
                    }
                    let cell = Arc::new(OnceCell::new());
                    self.engines.insert(name.clone(), cell.clone());
                    cell
                }
            }
        };

        let engine = cell.get_or_try_init(|| self.start_engine(&name)).await?.clone();
        metrics::gauge!(crate::observability::TENANTS_ACTIVE).set(self.len() as f64);
        Ok(engine)
    }

    async fn start_engine(&self, name: &str) -> io::Result<Arc<Engine>> {
        let source: Option<Arc<dyn DataSource>> = match &self.remote {
            Some(remote) => {
                let http = HttpSource::new(&remote.base_url, name, remote.timeout)
                    .map_err(|e| io::Error::other(e.to_string()))?;
                Some(Arc::new(http))
            }
            None => None,
        };

        let journal_path = self.data_dir.join(format!("{name}.journal"));
        let engine = Arc::new(Engine::new(journal_path, source)?);
        engine
            .bootstrap()
            .await
            .map_err(|e| io::Error::other(e.to_string()))?;

        let sync_engine = engine.clone();
        let interval = self.sync_interval;
        let threshold = self.compact_threshold;
        tokio::spawn(async move {
            sync::run_sync(sync_engine, interval, threshold).await;
        });

        tracing::info!("tenant {name} ready");
        Ok(engine)
    }
}

/// Keep only characters that are safe in a file name.
fn sanitize(tenant: &str) -> String {
    tenant
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
