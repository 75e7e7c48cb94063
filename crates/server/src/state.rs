//! Application state shared across handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use tone_config::Settings;
use tone_core::traits::LLMClient;
use tone_pipeline::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub llm: Arc<dyn LLMClient>,
    pub settings: Arc<Settings>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(settings: Settings, llm: Arc<dyn LLMClient>, metrics_handle: PrometheusHandle) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(llm.clone(), settings.pipeline.clone()));
        Self {
            orchestrator,
            llm,
            settings: Arc::new(settings),
            metrics_handle,
        }
    }
}
