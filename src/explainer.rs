// src/explainer.rs
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::sync::Semaphore;

use crate::config::OllamaConfig;
use crate::errors::{Result, ServiceError};
use crate::providers::{ExplanationRequest, LlmProvider};

static EXCEPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][\w.]*(?:Error|Exception|Interrupt|Exit|Warning)):?\s*(.*)$").expect("valid regex")
});

/// Builds the prompt asking for a line-by-line explanation of working code.
pub fn reasoning_prompt(code: &str) -> String {
    format!(
        r#"You are a patient programming tutor.

Explain the following code line by line in exactly 3 short points.
Keep each point to one or two sentences.

CODE:
{}

Your explanation:"#,
        code
    )
}

/// Builds the prompt asking why a run failed and how to fix it.
pub fn debug_prompt(code: &str, failure: &str) -> String {
    let summary = error_summary(failure)
        .map(|s| format!("The program failed with: {}\n\n", s))
        .unwrap_or_default();

    format!(
        r#"You are an expert debugger.

{}CODE:
{}

ERROR OUTPUT:
{}

INSTRUCTIONS:
1. Explain why this error occurred
2. Provide a corrected version of the code
3. Return only the explanation and the solution, nothing else

Your answer:"#,
        summary, code, failure
    )
}

/// Finds the final `SomeError: message` line of a traceback.
pub fn error_summary(failure: &str) -> Option<String> {
    failure
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| EXCEPTION_LINE.is_match(line))
        .map(str::to_string)
}

/// Produces natural-language explanations through an [`LlmProvider`].
///
/// Generation parameters come from configuration; callers only choose the
/// prompt. Concurrent calls to the backend are capped.
pub struct Explainer {
    provider: Arc<dyn LlmProvider>,
    config: OllamaConfig,
    permits: Semaphore,
}

impl Explainer {
    pub fn new(provider: Arc<dyn LlmProvider>, config: OllamaConfig) -> Self {
        let permits = Semaphore::new(config.max_concurrent);
        Self { provider, config, permits }
    }

    /// Explain working code. Uses the provider's default timeout.
    pub async fn explain_code(&self, code: &str) -> Result<String> {
        let request = self.request(reasoning_prompt(code), None);
        self.generate(&request).await
    }

    /// Explain why `code` failed with `failure`. Uses the long debug timeout.
    pub async fn explain_failure(&self, code: &str, failure: &str) -> Result<String> {
        if let Some(summary) = error_summary(failure) {
            log::info!("Asking for an explanation of: {}", summary);
        }
        let request = self.request(debug_prompt(code, failure), Some(self.config.debug_timeout));
        self.generate(&request).await
    }

    fn request(&self, prompt: String, timeout: Option<std::time::Duration>) -> ExplanationRequest {
        ExplanationRequest {
            model: self.config.model.clone(),
            prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.num_predict,
            timeout,
        }
    }

    /// Queue time for a permit is charged to the request's own timeout.
    async fn generate(&self, request: &ExplanationRequest) -> Result<String> {
        let budget = request.timeout.unwrap_or(self.config.timeout);
        let call = async {
            let _permit = match self.permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => return Err(ServiceError::CapacityClosed("explainer")),
            };
            self.provider.generate(request).await
        };
        tokio::time::timeout(budget, call).await.map_err(|_| ServiceError::Timeout)?
    }
}
