// src/models.rs
use serde::{Deserialize, Serialize};

/// Body of both `/reasoning` and `/debug`.
#[derive(Deserialize, Debug, Clone)]
pub struct CodeSubmission {
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReasoningResponse {
    pub reasoning: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DebugResponse {
    pub output: String,
}
