use std::sync::Arc;

use modelrun_core::{Backend, Device};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::info;

use crate::{
    MainContext, MemorySettingsStore, ModelLoader, ModelManager, OfflineModelManager,
    SettingsStore, StatsRecorder, StatsSink, TracingStatsSink,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("app name must not be empty")]
    EmptyName,
    #[error("no inference backend configured")]
    MissingBackend,
    #[error("app must be configured from within a Tokio runtime")]
    NoRuntime,
    #[error("failed to start the main context: {0}")]
    MainContext(#[from] std::io::Error),
}

/// A configured app. Holding one is the precondition for building
/// interpreters; clones share the same collaborators and main context.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppInner>,
}

struct AppInner {
    name: String,
    device: Device,
    loader: Arc<dyn ModelLoader>,
    manager: Arc<dyn ModelManager>,
    stats: StatsRecorder,
    main: MainContext,
    runtime: Handle,
}

impl AppContext {
    pub fn builder(name: impl Into<String>) -> AppBuilder {
        AppBuilder {
            name: name.into(),
            device: Device::Cpu,
            loader: None,
            manager: None,
            settings: None,
            sink: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn device(&self) -> &Device {
        &self.inner.device
    }

    pub fn loader(&self) -> &Arc<dyn ModelLoader> {
        &self.inner.loader
    }

    pub fn model_manager(&self) -> &Arc<dyn ModelManager> {
        &self.inner.manager
    }

    pub fn stats(&self) -> &StatsRecorder {
        &self.inner.stats
    }

    pub fn main_context(&self) -> &MainContext {
        &self.inner.main
    }

    pub fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }
}

pub struct AppBuilder {
    name: String,
    device: Device,
    loader: Option<Arc<dyn ModelLoader>>,
    manager: Option<Arc<dyn ModelManager>>,
    settings: Option<Arc<dyn SettingsStore>>,
    sink: Option<Arc<dyn StatsSink>>,
}

impl AppBuilder {
    pub fn backend(self, backend: impl Backend) -> Self {
        self.loader(Arc::new(backend))
    }

    pub fn loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn model_manager(mut self, manager: impl ModelManager) -> Self {
        self.manager = Some(Arc::new(manager));
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn stats_sink(mut self, sink: Arc<dyn StatsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn configure(self) -> Result<AppContext, ConfigError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let loader = self.loader.ok_or(ConfigError::MissingBackend)?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        let main = MainContext::spawn()?;

        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(MemorySettingsStore::default()) as Arc<dyn SettingsStore>);
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingStatsSink) as Arc<dyn StatsSink>);
        let stats = StatsRecorder::new(&name, settings, sink);

        info!(
            app = %name,
            backend = loader.backend_name(),
            stats_enabled = stats.is_enabled(),
            "app configured"
        );

        Ok(AppContext {
            inner: Arc::new(AppInner {
                name,
                device: self.device,
                loader,
                manager: self
                    .manager
                    .unwrap_or_else(|| Arc::new(OfflineModelManager) as Arc<dyn ModelManager>),
                stats,
                main,
                runtime,
            }),
        })
    }
}
