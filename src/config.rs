use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub publishing: PublishingConfig,
    pub monitoring: MonitoringConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// How often the worker emits one averaged snapshot to the push channel.
    pub emit_interval_ms: u64,
    /// Max snapshots kept in the broadcast channel (slow sessions may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub sample_interval_ms: u64,
    #[serde(default = "default_top_processes")]
    pub top_processes: usize,
    /// How often to log app stats (attached sessions, snapshots emitted) at INFO level.
    pub stats_log_interval_secs: u64,
}

fn default_top_processes() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root directory for the persisted shortcut collections.
    pub path: String,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.publishing.emit_interval_ms > 0,
            "publishing.emit_interval_ms must be > 0, got {}",
            self.publishing.emit_interval_ms
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms <= self.publishing.emit_interval_ms,
            "monitoring.sample_interval_ms must not exceed publishing.emit_interval_ms, got {} > {}",
            self.monitoring.sample_interval_ms,
            self.publishing.emit_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.top_processes > 0,
            "monitoring.top_processes must be > 0, got {}",
            self.monitoring.top_processes
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(!self.store.path.is_empty(), "store.path must be non-empty");
        Ok(())
    }
}
