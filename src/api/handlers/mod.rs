// src/api/handlers/mod.rs
mod health;
mod code;

pub use health::health_check;
pub use code::{debug, reasoning, status_for};
