//! Scenarios - the domain actions a matched command triggers
//!
//! The interpreter only ever asks a scenario for its feedback message and
//! awaits its execution; what a scenario actually does is up to the catalog.

mod exec;

pub use exec::{DEFAULT_TIMEOUT, ExecScenario, run_program};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// A domain action with spoken feedback
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Catalog name of the scenario
    fn name(&self) -> &str;

    /// Message spoken and displayed before the scenario runs
    fn feedback_message(&self) -> String;

    /// Perform the action and return the text to speak when done
    ///
    /// # Errors
    ///
    /// Returns error if the action fails
    async fn execute(&self) -> Result<String>;
}

/// Scenario with a fixed result text
#[derive(Debug, Clone)]
pub struct StaticScenario {
    name: String,
    feedback: String,
    result: String,
    delay: Option<Duration>,
}

impl StaticScenario {
    /// Create a scenario that answers immediately
    pub fn new(
        name: impl Into<String>,
        feedback: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            feedback: feedback.into(),
            result: result.into(),
            delay: None,
        }
    }

    /// Simulate work by waiting before the result is reported
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Scenario for StaticScenario {
    fn name(&self) -> &str {
        &self.name
    }

    fn feedback_message(&self) -> String {
        self.feedback.clone()
    }

    async fn execute(&self) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.result.clone())
    }
}

/// Named scenarios available to the command table
#[derive(Default, Clone)]
pub struct ScenarioCatalog {
    scenarios: HashMap<String, Arc<dyn Scenario>>,
}

impl ScenarioCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scenario under its own name, replacing any previous one
    pub fn insert(&mut self, scenario: Arc<dyn Scenario>) {
        let name = scenario.name().to_string();
        if self.scenarios.insert(name.clone(), scenario).is_some() {
            tracing::warn!(scenario = %name, "scenario replaced in catalog");
        }
    }

    /// Look up a scenario by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Scenario>> {
        self.scenarios.get(name).cloned()
    }

    /// Look up a scenario that a command refers to
    ///
    /// # Errors
    ///
    /// Returns error if no scenario with that name exists
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Scenario>> {
        self.get(name)
            .ok_or_else(|| Error::Config(format!("unknown scenario: {name}")))
    }

    /// Sorted scenario names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scenarios.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered scenarios
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Check if the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl std::fmt::Debug for ScenarioCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioCatalog")
            .field("scenarios", &self.names())
            .finish()
    }
}
