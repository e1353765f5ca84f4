// src/api/state.rs
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::explainer::Explainer;
use crate::providers::LlmProvider;
use crate::providers::ollama::OllamaProvider;
use crate::runner::Pipeline;
use crate::sandbox::{CodeRunner, ProcessSandbox};

/// Everything a handler needs, built once at startup and shared by all workers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Pipeline,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wires the real subprocess sandbox and Ollama provider.
    pub fn new(config: AppConfig) -> Self {
        let provider = Arc::new(OllamaProvider::new(Client::new(), config.ollama.clone()));
        let runner = Arc::new(ProcessSandbox::new(config.sandbox.clone()));
        Self::with_collaborators(config, runner, provider)
    }

    pub fn with_collaborators(
        config: AppConfig,
        runner: Arc<dyn CodeRunner>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let explainer = Arc::new(Explainer::new(provider, config.ollama.clone()));
        Self {
            config: Arc::new(config),
            pipeline: Pipeline::new(runner, explainer),
            started_at: Utc::now(),
        }
    }
}
