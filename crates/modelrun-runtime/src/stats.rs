//! Out-of-band usage stats and the persisted toggle that gates them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use modelrun_core::ErrorKind;
use tracing::{info, warn};

use crate::{Api, Timings};

#[derive(Clone, Debug)]
pub struct StatsEvent {
    pub api: Api,
    pub model: String,
    pub duration: Duration,
    pub timings: Timings,
    pub error: Option<ErrorKind>,
}

pub trait StatsSink: Send + Sync + 'static {
    fn record(&self, event: &StatsEvent);
}

/// Logs every event at `info` under the `modelrun::stats` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingStatsSink;

impl StatsSink for TracingStatsSink {
    fn record(&self, event: &StatsEvent) {
        info!(
            target: "modelrun::stats",
            api = %event.api,
            model = %event.model,
            duration_us = event.duration.as_micros() as u64,
            validate_us = event.timings.validate_us,
            backend_us = event.timings.backend_us,
            bind_us = event.timings.bind_us,
            error = event.error.map(|k| k.as_str()),
            "api call"
        );
    }
}

/// Where the stats toggle survives restarts.
pub trait SettingsStore: Send + Sync + 'static {
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;
    fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, bool>>,
}

impl SettingsStore for MemorySettingsStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `key=value` pair per line.
///
/// Reads and writes go straight to disk on the calling thread.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<Vec<(String, String)>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        Ok(raw
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let entries = self.read_all()?;
        match entries.iter().rev().find(|(k, _)| k == key) {
            None => Ok(None),
            Some((_, v)) => v
                .parse()
                .map(Some)
                .with_context(|| format!("setting `{key}` is not a bool: {v}")),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.retain(|(k, _)| k != key);
        entries.push((key.to_string(), value.to_string()));

        let body: String = entries.iter().map(|(k, v)| format!("{k}={v}\n")).collect();
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        std::fs::write(&self.path, body)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Per-app toggle plus the sink it gates. Enabled unless explicitly disabled.
pub struct StatsRecorder {
    enabled: AtomicBool,
    key: String,
    settings: Arc<dyn SettingsStore>,
    sink: Arc<dyn StatsSink>,
}

impl StatsRecorder {
    pub fn new(app_name: &str, settings: Arc<dyn SettingsStore>, sink: Arc<dyn StatsSink>) -> Self {
        let key = format!("stats_collection_enabled.{app_name}");
        let enabled = match settings.get_bool(&key) {
            Ok(value) => value.unwrap_or(true),
            Err(err) => {
                warn!(error = ?err, "failed to read stats setting, keeping default");
                true
            }
        };
        Self {
            enabled: AtomicBool::new(enabled),
            key,
            settings,
            sink,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Flips the toggle and persists it before returning.
    ///
    /// The write runs on the calling thread and may block on I/O when the
    /// settings store is file backed. From async code, call it through
    /// `tokio::task::spawn_blocking`.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        if let Err(err) = self.settings.set_bool(&self.key, enabled) {
            warn!(error = ?err, enabled, "failed to persist stats setting");
        }
    }

    pub fn record(&self, event: StatsEvent) {
        if self.is_enabled() {
            self.sink.record(&event);
        }
    }
}
