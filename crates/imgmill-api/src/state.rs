//! API application state and health tracking.

use std::sync::Mutex;

use imgmill_config::ImgmillConfig;
use imgmill_events::EventBus;
use imgmill_pipeline::Orchestrator;
use imgmill_telemetry::Metrics;

pub(crate) struct ApiState {
    pub(crate) telemetry: Metrics,
    pub(crate) events: EventBus,
    pub(crate) orchestrator: Orchestrator,
    health_degraded: Mutex<Vec<String>>,
}

impl ApiState {
    pub(crate) fn new(config: &ImgmillConfig, events: EventBus, telemetry: Metrics) -> Self {
        let orchestrator = Orchestrator::new(
            events.clone(),
            telemetry.clone(),
            config.pipeline.clone(),
        );
        Self {
            telemetry,
            events,
            orchestrator,
            health_degraded: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add_degraded_component(&self, component: &str) {
        if let Ok(mut degraded) = self.health_degraded.lock() {
            if !degraded.iter().any(|entry| entry == component) {
                degraded.push(component.to_string());
            }
        }
    }

    pub(crate) fn current_health_degraded(&self) -> Vec<String> {
        self.health_degraded
            .lock()
            .map(|degraded| degraded.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_components_are_deduplicated() -> anyhow::Result<()> {
        let state = ApiState::new(
            &ImgmillConfig::default(),
            EventBus::with_capacity(8),
            Metrics::new()?,
        );
        state.add_degraded_component("pipeline");
        state.add_degraded_component("pipeline");
        assert_eq!(state.current_health_degraded(), vec!["pipeline"]);
        Ok(())
    }
}
