use crate::config::SessionConfig;
use crate::protocol::ProtocolClient;
use crate::roster::{InlineExecutor, RosterExecutor};
use crate::session::Session;
use crate::settings::{SettingsService, SettingsStore};
use anyhow::{Result, anyhow};
use log::info;
use sfcore::types::events::{EventBus, EventHandler};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct SessionBuilder {
    protocol: Option<Arc<dyn ProtocolClient>>,
    settings: Option<Arc<SettingsService>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    executor: Option<Arc<dyn RosterExecutor>>,
    config: SessionConfig,
    event_handlers: Vec<Arc<dyn EventHandler>>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: Arc<dyn ProtocolClient>) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Use an already loaded settings service.
    pub fn with_settings(mut self, settings: Arc<SettingsService>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Load settings from `store` when building.
    pub fn with_settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Context that applies roster mutations. Defaults to [`InlineExecutor`].
    pub fn with_executor(mut self, executor: Arc<dyn RosterExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    pub async fn build(self) -> Result<Arc<Session>> {
        let protocol = self
            .protocol
            .ok_or_else(|| anyhow!("A protocol client is required to build a session"))?;

        let settings = match (self.settings, self.settings_store) {
            (Some(_), Some(_)) => {
                return Err(anyhow!("Use either with_settings or with_settings_store, not both"));
            }
            (Some(settings), None) => settings,
            (None, Some(store)) => Arc::new(
                SettingsService::load(store)
                    .await
                    .map_err(|e| anyhow!("Failed to load settings: {}", e))?,
            ),
            (None, None) => {
                info!(target: "Session", "No settings store configured, keeping settings in memory");
                Arc::new(SettingsService::in_memory())
            }
        };

        if self.config.max_reconnect_attempts == 0 {
            return Err(anyhow!("max_reconnect_attempts must be at least 1"));
        }

        let event_bus = EventBus::new();
        for handler in self.event_handlers {
            event_bus.add_handler(handler);
        }

        let executor: Arc<dyn RosterExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(InlineExecutor),
        };

        Ok(Arc::new(Session::new(
            protocol,
            settings,
            self.config,
            event_bus,
            executor,
        )))
    }
}
