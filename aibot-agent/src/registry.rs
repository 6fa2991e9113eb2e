// ABOUTME: Maps the config's `backend.type` name to the factory that starts that backend.
// ABOUTME: The default set is mock, chat and agent; unknown names report what is available.

use crate::handle::AgentHandle;
use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Starts a backend from its `[backend]` settings table.
pub type BackendFactory = Box<dyn Fn(&Value) -> Result<AgentHandle> + Send + Sync>;

/// Backend factories keyed by type name. Iteration order is the sorted name order.
pub struct AgentRegistry {
    factories: BTreeMap<&'static str, BackendFactory>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Adds a backend type. A later registration under the same name replaces the earlier one.
    pub fn register<F>(mut self, name: &'static str, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<AgentHandle> + Send + Sync + 'static,
    {
        self.factories.insert(name, Box::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Starts the backend registered as `name`, passing it the raw settings.
    pub fn create(&self, name: &str, settings: &Value) -> Result<AgentHandle> {
        let Some(factory) = self.factories.get(name) else {
            bail!(
                "Unknown backend type '{}' (available: {})",
                name,
                self.available().join(", ")
            );
        };
        let handle = factory(settings)?;
        tracing::info!(backend_type = name, backend = handle.name(), "Backend started");
        Ok(handle)
    }

    pub fn available(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        use crate::backends::chat::ChatCompletionBackend;
        use crate::backends::mock::MockBackend;
        use crate::backends::tool_agent::ToolAgentBackend;

        Self::new()
            .register("mock", MockBackend::factory())
            .register("chat", ChatCompletionBackend::factory())
            .register("agent", ToolAgentBackend::factory())
    }
}
