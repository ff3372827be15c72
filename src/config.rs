use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ollama: OllamaConfig,
    pub auth: AuthConfig,
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub enabled: bool,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub num_predict: u32,
    pub num_ctx: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Delay between progress steps while an agent is simulated, in milliseconds.
    pub progress_step_ms: u64,
    /// Path to the business dataset JSON file.
    pub data_file: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5001".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_default(),
                enabled: env::var("USE_DATABASE")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            ollama: OllamaConfig {
                base_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
                timeout_secs: env::var("OLLAMA_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "90".to_string())
                    .parse()?,
                num_predict: env::var("OLLAMA_NUM_PREDICT")
                    .unwrap_or_else(|_| "250".to_string())
                    .parse()?,
                num_ctx: env::var("OLLAMA_NUM_CTX")
                    .unwrap_or_else(|_| "2048".to_string())
                    .parse()?,
            },
            auth: AuthConfig {
                secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "taskweave-secret-change-in-production".to_string()),
            },
            orchestrator: OrchestratorConfig {
                progress_step_ms: env::var("PROGRESS_STEP_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()?,
                data_file: env::var("DATA_FILE").unwrap_or_else(|_| "data/business.json".to_string()),
            },
        })
    }
}
