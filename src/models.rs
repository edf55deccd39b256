use crate::agent::{Orchestrator, SessionStore, StepRecord};
use crate::config::Config;
use crate::llm::LLM;
use crate::tools::{
    KnowledgeBaseTool, KnowledgeGraph, PestClassifier, ToolRegistry, WeatherTool, WebSearchTool,
    YieldModel,
};
use crate::tools::web_search::TavilyClient;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub llm: Option<Arc<LLM>>,
    pub registry: Arc<ToolRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionStore>,
    // Typed handles for the structured endpoints; the registry holds the
    // same Arcs behind `dyn Tool`.
    pub yield_model: Option<Arc<YieldModel>>,
    pub pest_classifier: Option<Arc<PestClassifier>>,
    pub knowledge_base: Option<Arc<KnowledgeBaseTool>>,
}

impl AppState {
    /// Build shared state from config: the LLM front, every tool the
    /// configuration can serve, and the session store. Missing credentials
    /// disable the corresponding tool rather than failing startup.
    pub fn new(pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let llm = if config.llm.is_configured() {
            Some(Arc::new(LLM::from_config(&config.llm).map_err(|e| {
                anyhow::anyhow!("building LLM provider: {e}")
            })?))
        } else {
            warn!("No LLM credentials configured; running with tool output only");
            None
        };

        let mut registry = ToolRegistry::new();

        let yield_model = match YieldModel::load(&config.models.yield_artifact_path) {
            Ok(model) => Some(Arc::new(model)),
            Err(e) => {
                warn!(error = %e, "Yield model unavailable");
                None
            }
        };
        if let Some(model) = &yield_model {
            registry.insert(model.clone());
        }

        let pest_classifier = if config.models.pest_endpoint.is_empty() {
            warn!("PEST_INFERENCE_ENDPOINT not set; pest classifier disabled");
            None
        } else {
            Some(Arc::new(PestClassifier::new(&config.models.pest_endpoint)))
        };
        if let Some(classifier) = &pest_classifier {
            registry.insert(classifier.clone());
        }

        let knowledge_base = llm.as_ref().map(|llm| {
            Arc::new(KnowledgeBaseTool::new(
                pool.clone(),
                llm.clone(),
                config.agent.kb_top_k,
            ))
        });
        if let Some(kb) = &knowledge_base {
            registry.insert(kb.clone());
        }

        if config.graph.enabled {
            registry.insert(Arc::new(KnowledgeGraph::new(&config.graph)));
        }

        if !config.search.tavily_api_key.is_empty() {
            registry.insert(Arc::new(WebSearchTool::new(TavilyClient::new(
                config.search.tavily_api_key.clone(),
                config.search.max_results,
            ))));
        }

        if !config.weather.api_key.is_empty() {
            registry.insert(Arc::new(WeatherTool::new(&config.weather)));
        }

        info!(tools = registry.len(), "Tool registry built");

        let registry = Arc::new(registry);
        // Routing rules compile their patterns here, once for the process.
        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            llm.clone(),
            config.agent.max_iterations,
        ));
        let sessions = Arc::new(SessionStore::new(config.agent.history_capacity));

        Ok(Self {
            pool,
            config,
            llm,
            registry,
            orchestrator,
            sessions,
            yield_model,
            pest_classifier,
            knowledge_base,
        })
    }
}

// Database rows

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct StoredMessage {
    pub id: uuid::Uuid,
    pub conversation_id: uuid::Uuid,
    pub role: String,
    pub content: String,
    pub tool_used: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// API Request/Response types

#[derive(Debug, serde::Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<uuid::Uuid>,
    pub image_base64: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_id: uuid::Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_used: Option<String>,
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, serde::Deserialize)]
pub struct YieldPredictRequest {
    pub features: HashMap<String, f64>,
}

#[derive(Debug, serde::Serialize)]
pub struct YieldPredictResponse {
    pub prediction: f64,
    pub unit: String,
    pub feature_order: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct PestClassifyRequest {
    pub image_base64: String,
}

#[derive(Debug, serde::Serialize)]
pub struct PestClassifyResponse {
    pub label: String,
    pub confidence: f32,
    pub advice: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct KbAddRequest {
    pub content: String,
    pub source: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct KbAddResponse {
    pub id: uuid::Uuid,
}

#[derive(Debug, serde::Deserialize)]
pub struct KbSearchParams {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
    pub tools: usize,
}
