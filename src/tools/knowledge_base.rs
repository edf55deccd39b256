//! Knowledge base tool (RAG)
//!
//! Embeds the query through the configured LLM provider and runs a cosine
//! search over the pgvector column in `kb_documents`. pgvector is reached
//! through plain SQL, no ORM layer.

use crate::llm::LLM;
use crate::tools::{Tool, ToolInput, ToolKind, ToolOutput};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct KnowledgeBaseTool {
    pool: PgPool,
    llm: Arc<LLM>,
    top_k: usize,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct KbHit {
    pub id: Uuid,
    pub content: String,
    pub source: Option<String>,
    pub score: f64,
}

/// pgvector input literal: `[0.1,0.2,...]`.
pub fn vector_literal(embedding: &[f32]) -> String {
    let mut out = String::with_capacity(embedding.len() * 10 + 2);
    out.push('[');
    for (i, v) in embedding.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
    out
}

impl KnowledgeBaseTool {
    pub fn new(pool: PgPool, llm: Arc<LLM>, top_k: usize) -> Self {
        Self {
            pool,
            llm,
            top_k: top_k.max(1),
        }
    }

    pub async fn add_document(&self, content: &str, source: Option<&str>) -> AppResult<Uuid> {
        if content.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "document content must not be empty".to_string(),
            ));
        }

        let embedding = self.llm.create_embedding(content).await?;
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO kb_documents (id, content, source, embedding) VALUES ($1, $2, $3, $4::vector)",
        )
        .bind(id)
        .bind(content)
        .bind(source)
        .bind(vector_literal(&embedding))
        .execute(&self.pool)
        .await?;

        info!(document_id = %id, source = source.unwrap_or("inline"), "Indexed knowledge base document");

        Ok(id)
    }

    pub async fn search(&self, query: &str, limit: Option<usize>) -> AppResult<Vec<KbHit>> {
        let embedding = self.llm.create_embedding(query).await?;
        let limit = limit.unwrap_or(self.top_k).clamp(1, 20) as i64;

        let hits: Vec<KbHit> = sqlx::query_as(
            r#"
            SELECT id, content, source, 1 - (embedding <=> $1::vector) AS score
            FROM kb_documents
            ORDER BY embedding <=> $1::vector
            LIMIT $2
            "#,
        )
        .bind(vector_literal(&embedding))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        info!(query_len = query.len(), hits = hits.len(), "Knowledge base search complete");

        Ok(hits)
    }
}

fn format_hits(hits: &[KbHit]) -> String {
    if hits.is_empty() {
        return "No relevant documents found in the knowledge base.".to_string();
    }

    let mut output = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let snippet: String = hit.content.chars().take(300).collect();
        output.push_str(&format!(
            "{}. [{}] (relevance {:.2})\n   {}\n",
            i + 1,
            hit.source.as_deref().unwrap_or("knowledge base"),
            hit.score,
            snippet
        ));
    }
    output
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn kind(&self) -> ToolKind {
        ToolKind::KnowledgeBase
    }

    fn description(&self) -> &'static str {
        "Looks up agronomy guidance in the local knowledge base (best practices, fertilizer, irrigation, soil management)"
    }

    async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
        let hits = self.search(&input.query, None).await?;

        Ok(ToolOutput {
            tool: self.kind(),
            content: format_hits(&hits),
            data: Some(serde_json::json!({ "hits": hits })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_literal() {
        assert_eq!(vector_literal(&[0.5, -1.0, 2.25]), "[0.5,-1,2.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }

    #[test]
    fn test_format_hits_empty() {
        assert!(format_hits(&[]).contains("No relevant documents"));
    }

    #[test]
    fn test_format_hits_snippets() {
        let hits = vec![KbHit {
            id: Uuid::new_v4(),
            content: "Top-dress maize with CAN three weeks after emergence.".to_string(),
            source: Some("fertilizer-guide.md".to_string()),
            score: 0.91,
        }];

        let formatted = format_hits(&hits);
        assert!(formatted.contains("fertilizer-guide.md"));
        assert!(formatted.contains("Top-dress maize"));
        assert!(formatted.contains("0.91"));
    }
}
