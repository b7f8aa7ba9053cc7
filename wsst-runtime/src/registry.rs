use crate::error::RuntimeError;
#[doc(hidden)]
pub use linkme::{self, distributed_slice};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use wsst_core::Scenario;

/// An array created at link-time which stores the names of each scenario and their respective
/// constructor.
#[doc(hidden)]
#[distributed_slice]
pub static WSST_SCENARIOS: [(&'static str, fn() -> Arc<dyn Scenario>)];

/// Scenarios known to the runtime, by name.
#[derive(Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Arc<dyn Scenario>>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every scenario registered with `#[scenario]` in the final binary.
    pub fn linked() -> Self {
        let mut registry = Self::new();
        for (name, constructor) in WSST_SCENARIOS.iter() {
            debug!("Found linked scenario {name}");
            registry
                .scenarios
                .insert(name.to_string(), constructor());
        }
        registry
    }

    /// Add a scenario under its own name, replacing any scenario with the same name.
    pub fn register(&mut self, scenario: Arc<dyn Scenario>) {
        self.scenarios.insert(scenario.name().to_string(), scenario);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Scenario>, RuntimeError> {
        self.scenarios
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::NoScenario {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
