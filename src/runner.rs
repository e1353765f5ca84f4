// src/runner.rs
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ServiceError;
use crate::explainer::Explainer;
use crate::sandbox::{CodeRunner, ExecutionStatus};

pub const NO_CODE_MESSAGE: &str = "No code provided.";
pub const NO_EXPLANATION_MESSAGE: &str = "No explanation available.";
pub const EXPLANATION_MARKER: &str = "🤖 AI Explanation:";
pub const EMPTY_EXPLANATION_MARKER: &str = "🤖 AI did not return any explanation.";
pub const EXPLANATION_TIMEOUT_MESSAGE: &str = "⚠️ AI explanation timed out. The model took too long to respond.";

/// Which collaborator was unusable, as opposed to the submitted code failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Sandbox,
    Inference,
}

/// What a handler tells the client: always some text, sometimes a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub text: String,
    pub fault: Option<Fault>,
}

impl Outcome {
    fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), fault: None }
    }

    fn faulted(text: impl Into<String>, fault: Fault) -> Self {
        Self { text: text.into(), fault: Some(fault) }
    }
}

fn contact_error(e: &ServiceError) -> String {
    format!("⚠️ Error contacting AI model: {}", e)
}

/// Composes the sandbox and the explainer into the two request flows.
#[derive(Clone)]
pub struct Pipeline {
    runner: Arc<dyn CodeRunner>,
    explainer: Arc<Explainer>,
}

impl Pipeline {
    pub fn new(runner: Arc<dyn CodeRunner>, explainer: Arc<Explainer>) -> Self {
        Self { runner, explainer }
    }

    /// Explain the submitted code. Never fails; backend problems become text.
    pub async fn reasoning(&self, code: &str) -> Outcome {
        let start = Instant::now();
        let outcome = match self.explainer.explain_code(code).await {
            Ok(text) if text.is_empty() => {
                log::warn!("Model returned an empty explanation");
                Outcome::ok(NO_EXPLANATION_MESSAGE)
            }
            Ok(text) => Outcome::ok(text),
            Err(ServiceError::Timeout) => {
                log::warn!("Reasoning timed out after {}ms", start.elapsed().as_millis());
                Outcome::ok(EXPLANATION_TIMEOUT_MESSAGE)
            }
            Err(e) => {
                log::error!("Reasoning failed: {}", e);
                Outcome::faulted(contact_error(&e), Fault::Inference)
            }
        };
        log::info!("Reasoning completed in {}ms", start.elapsed().as_millis());
        outcome
    }

    /// Run the submitted code and, if it fails, append an explanation of the failure.
    pub async fn debug(&self, code: &str) -> Outcome {
        if code.trim().is_empty() {
            return Outcome::ok(NO_CODE_MESSAGE);
        }

        let result = self.runner.run(code).await;
        let output = result.output().to_string();

        match result.status {
            ExecutionStatus::Exited(0) => return Outcome::ok(output),
            ExecutionStatus::TimedOut => return Outcome::ok(output),
            ExecutionStatus::LaunchFailed => return Outcome::faulted(output, Fault::Sandbox),
            ExecutionStatus::Exited(_) | ExecutionStatus::Signaled => {}
        }

        log::info!("Code failed with {:?}, requesting an explanation", result.status);

        // Output printed before the failure must not hide the error itself.
        let failure = result.failure_text();
        let output = if failure == output { output } else { format!("{}\n{}", output, failure) };

        match self.explainer.explain_failure(code, result.failure_text()).await {
            Ok(text) if text.is_empty() => Outcome::ok(format!("{}\n\n{}", output, EMPTY_EXPLANATION_MARKER)),
            Ok(text) => Outcome::ok(format!("{}\n\n{}\n{}", output, EXPLANATION_MARKER, text)),
            Err(ServiceError::Timeout) => {
                log::warn!("Debug explanation timed out");
                Outcome::ok(format!("{}\n\n{}", output, EXPLANATION_TIMEOUT_MESSAGE))
            }
            Err(e) => {
                log::error!("Debug explanation failed: {}", e);
                Outcome::faulted(format!("{}\n\n{}", output, contact_error(&e)), Fault::Inference)
            }
        }
    }
}
