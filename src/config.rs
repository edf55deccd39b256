use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub weather: WeatherConfig,
    pub graph: GraphConfig,
    pub models: ModelConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// "openai" (any OpenAI-compatible endpoint) or "ollama" (local).
    pub provider: String,
    pub model: String,
    pub embedding_model: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

impl LLMConfig {
    /// A remote provider without an API key cannot serve requests;
    /// a local Ollama instance needs none.
    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "ollama" => true,
            _ => !self.api_key.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub tavily_api_key: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub enabled: bool,
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub yield_artifact_path: String,
    pub pest_endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub history_capacity: usize,
    pub kb_top_k: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| anyhow!("DATABASE_URL must be set"))?,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            llm: LLMConfig {
                provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "llama3.1".to_string()),
                embedding_model: env::var("LLM_EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "nomic-embed-text".to_string()),
                api_key: env::var("LLM_API_KEY").unwrap_or_default(),
                base_url: env::var("LLM_BASE_URL").ok(),
            },
            search: SearchConfig {
                tavily_api_key: env::var("TAVILY_API_KEY").unwrap_or_default(),
                max_results: env::var("SEARCH_MAX_RESULTS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
            },
            weather: WeatherConfig {
                api_key: env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
                base_url: env::var("OPENWEATHER_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5".to_string()),
                default_location: env::var("DEFAULT_LOCATION")
                    .unwrap_or_else(|_| "Nairobi".to_string()),
            },
            graph: GraphConfig {
                enabled: env::var("NEO4J_ENABLED")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
                url: env::var("NEO4J_URL").unwrap_or_else(|_| "http://localhost:7474".to_string()),
                database: env::var("NEO4J_DATABASE").unwrap_or_else(|_| "neo4j".to_string()),
                username: env::var("NEO4J_USERNAME").unwrap_or_else(|_| "neo4j".to_string()),
                password: env::var("NEO4J_PASSWORD").unwrap_or_default(),
            },
            models: ModelConfig {
                yield_artifact_path: env::var("YIELD_MODEL_PATH")
                    .unwrap_or_else(|_| "artifacts/yield_model.json".to_string()),
                pest_endpoint: env::var("PEST_INFERENCE_ENDPOINT").unwrap_or_default(),
            },
            agent: AgentConfig {
                max_iterations: env::var("AGENT_MAX_ITERATIONS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse::<u32>()?
                    .max(1),
                history_capacity: env::var("HISTORY_CAPACITY")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()?,
                kb_top_k: env::var("KB_TOP_K")
                    .unwrap_or_else(|_| "4".to_string())
                    .parse()?,
            },
        })
    }
}
