//! Scenario execution cycles

use std::sync::Arc;

use super::{CycleOutcome, Interpreter};
use crate::scenario::Scenario;

impl Interpreter {
    /// Announce, execute and report one scenario
    ///
    /// The feedback message is shown and spoken while the scenario executes.
    /// The result is spoken only once both have finished, and the cycle
    /// resolves when that result has been spoken.
    pub async fn run_cycle(&self, scenario: &Arc<dyn Scenario>) -> CycleOutcome {
        let name = scenario.name().to_string();
        let message = scenario.feedback_message();

        self.status.set(&message);
        let ((), result) = tokio::join!(self.feedback.speak(&message), scenario.execute());
        self.status.clear();

        match result {
            Ok(text) => {
                tracing::info!(scenario = %name, result = %text, "scenario completed");
                self.feedback.speak(&text).await;
                CycleOutcome::Completed {
                    scenario: name,
                    result: text,
                }
            }
            Err(e) => {
                tracing::warn!(scenario = %name, error = %e, "scenario failed");
                CycleOutcome::Failed {
                    scenario: name,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run scenario cycles one at a time, pausing before each
    ///
    /// A failing scenario does not stop the ones after it.
    pub async fn run_sequence(&self, scenarios: &[Arc<dyn Scenario>]) -> Vec<CycleOutcome> {
        let mut cycles = Vec::with_capacity(scenarios.len());

        for (index, scenario) in scenarios.iter().enumerate() {
            tokio::time::sleep(self.settings.sequence_delay).await;
            tracing::debug!(
                step = index + 1,
                total = scenarios.len(),
                scenario = scenario.name(),
                "sequence step"
            );
            cycles.push(self.run_cycle(scenario).await);
        }

        cycles
    }
}
