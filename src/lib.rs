// src/lib.rs
pub mod api;
pub mod banner;
pub mod config;
pub mod errors;
pub mod explainer;
pub mod models;
pub mod providers;
pub mod runner;
pub mod sandbox;
pub mod stream;
