// src/config.rs
use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{Result, ServiceError};

/// How handler outcomes are mapped onto HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Always answer 200 and explain failures in the body.
    Legacy,
    /// Answer 5xx when the sandbox or the model backend is unusable.
    Strict,
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ResponseMode::Legacy),
            "strict" => Ok(ResponseMode::Strict),
            other => Err(format!("unknown response mode '{}', expected 'legacy' or 'strict'", other)),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
    pub response_mode: ResponseMode,
}

/// Configuration for the Ollama provider and the explanation calls made through it.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub num_predict: u32,
    /// Applied to every call that does not set its own timeout.
    pub timeout: Duration,
    /// Explanations of failed runs can be long; they get a larger budget.
    pub debug_timeout: Duration,
    pub max_concurrent: usize,
}

/// Configuration for the subprocess sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub interpreter: String,
    pub exec_flag: String,
    pub timeout: Duration,
    pub max_concurrent: usize,
}

/// High-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ollama: OllamaConfig,
    pub sandbox: SandboxConfig,
}

/// Optional on-disk configuration. Every key may be omitted.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub ollama: OllamaSection,
    pub sandbox: SandboxSection,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub allowed_origin: Option<String>,
    pub response_mode: Option<ResponseMode>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct OllamaSection {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub num_predict: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub debug_timeout_secs: Option<u64>,
    pub max_concurrent: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SandboxSection {
    pub interpreter: Option<String>,
    pub exec_flag: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_concurrent: Option<usize>,
}

impl FileConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl AppConfig {
    /// Load configuration from the optional config file, then the environment.
    pub fn load() -> Result<Self> {
        let file = match config_file_path() {
            Some(path) => {
                log::info!("Reading configuration from {}", path.display());
                FileConfig::read(&path)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(&file, |key| std::env::var(key).ok())
    }

    /// Merge file values with variables from `env`. Variables win over the file,
    /// the file wins over built-in defaults.
    pub fn resolve<F>(file: &FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: pick(&env, "HOST", file.server.host.clone(), "127.0.0.1".to_string())?,
            port: pick(&env, "PORT", file.server.port, 5000)?,
            allowed_origin: pick(
                &env,
                "ALLOWED_ORIGIN",
                file.server.allowed_origin.clone(),
                "http://localhost:5173".to_string(),
            )?,
            response_mode: pick(&env, "RESPONSE_MODE", file.server.response_mode, ResponseMode::Legacy)?,
        };

        let ollama = OllamaConfig {
            api_base: pick(
                &env,
                "OLLAMA_API_BASE",
                file.ollama.api_base.clone(),
                "http://localhost:11434".to_string(),
            )?,
            model: pick(&env, "OLLAMA_MODEL", file.ollama.model.clone(), "llama3".to_string())?,
            temperature: pick(&env, "OLLAMA_TEMPERATURE", file.ollama.temperature, 0.2)?,
            num_predict: pick(&env, "OLLAMA_NUM_PREDICT", file.ollama.num_predict, 512)?,
            timeout: Duration::from_secs(pick(&env, "OLLAMA_TIMEOUT_SECS", file.ollama.timeout_secs, 60)?),
            debug_timeout: Duration::from_secs(pick(
                &env,
                "OLLAMA_DEBUG_TIMEOUT_SECS",
                file.ollama.debug_timeout_secs,
                120,
            )?),
            max_concurrent: pick(&env, "MAX_CONCURRENT_EXPLANATIONS", file.ollama.max_concurrent, 4)?,
        };

        let sandbox = SandboxConfig {
            interpreter: pick(
                &env,
                "SANDBOX_INTERPRETER",
                file.sandbox.interpreter.clone(),
                "python3".to_string(),
            )?,
            exec_flag: pick(&env, "SANDBOX_EXEC_FLAG", file.sandbox.exec_flag.clone(), "-c".to_string())?,
            timeout: Duration::from_secs(pick(&env, "SANDBOX_TIMEOUT_SECS", file.sandbox.timeout_secs, 5)?),
            max_concurrent: pick(&env, "MAX_CONCURRENT_EXECUTIONS", file.sandbox.max_concurrent, 4)?,
        };

        let config = AppConfig { server, ollama, sandbox };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ollama.max_concurrent == 0 || self.sandbox.max_concurrent == 0 {
            return Err(ServiceError::Config("concurrency limits must be at least 1".to_string()));
        }
        if self.sandbox.timeout.is_zero() || self.ollama.timeout.is_zero() || self.ollama.debug_timeout.is_zero() {
            return Err(ServiceError::Config("timeouts must be at least 1 second".to_string()));
        }
        if self.sandbox.interpreter.trim().is_empty() {
            return Err(ServiceError::Config("SANDBOX_INTERPRETER must not be empty".to_string()));
        }
        Ok(())
    }
}

/// `CODELENS_CONFIG` if set, otherwise `<config dir>/codelens/config.toml` when present.
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CODELENS_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let default = dirs::config_dir()?.join("codelens").join("config.toml");
    default.exists().then_some(default)
}

fn pick<T, F>(env: &F, key: &str, from_file: Option<T>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ServiceError::Config(format!("invalid value for {}: {}", key, e))),
        None => Ok(from_file.unwrap_or(default)),
    }
}
