//! Knowledge graph tool
//!
//! Client for the Neo4j transactional HTTP API (`/db/{name}/tx/commit`).
//! Queries that already look like Cypher are passed through unchanged;
//! otherwise a small set of keyword-driven templates covers the common
//! crop/pest/treatment questions.

use crate::tools::{Tool, ToolInput, ToolKind, ToolOutput};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub struct KnowledgeGraph {
    client: Client,
    base_url: String,
    database: String,
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TxRequest {
    statements: Vec<Statement>,
}

#[derive(Serialize)]
struct Statement {
    statement: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    columns: Vec<String>,
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// A leading read keyword marks the query as raw Cypher to pass through.
pub fn is_cypher(query: &str) -> bool {
    let head = query
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_uppercase();
    matches!(head.as_str(), "MATCH" | "CALL" | "RETURN" | "WITH" | "UNWIND" | "OPTIONAL")
}

/// Grab the entity a template question is about: the last quoted phrase,
/// or the word after "affect"/"for"/"of".
pub fn extract_entity(query: &str) -> Option<String> {
    if let Some(start) = query.find('"') {
        if let Some(end) = query[start + 1..].find('"') {
            let quoted = query[start + 1..start + 1 + end].trim();
            if !quoted.is_empty() {
                return Some(quoted.to_string());
            }
        }
    }

    let lower = query.to_lowercase();
    for marker in ["affect ", "affects ", "for ", "of "] {
        if let Some(pos) = lower.rfind(marker) {
            // Offsets come from the lowercased copy; slice fallibly in case
            // lowercasing shifted byte positions.
            let Some(after) = query.get(pos + marker.len()..) else {
                continue;
            };
            let entity: String = after
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
                .collect();
            let entity = entity.trim().trim_end_matches('?').trim();
            if !entity.is_empty() {
                return Some(entity.to_string());
            }
        }
    }

    None
}

/// Map a natural-language graph question to a template Cypher statement.
fn template_for(query: &str) -> Option<(String, Value)> {
    let lower = query.to_lowercase();
    let entity = extract_entity(query)?;

    if lower.contains("pest") {
        return Some((
            "MATCH (c:Crop)-[:AFFECTED_BY]->(p:Pest) WHERE toLower(c.name) = toLower($name) \
             RETURN p.name AS pest, p.severity AS severity"
                .to_string(),
            serde_json::json!({ "name": entity }),
        ));
    }

    if lower.contains("treatment") || lower.contains("control") {
        return Some((
            "MATCH (p:Pest)-[:TREATED_WITH]->(t:Treatment) WHERE toLower(p.name) = toLower($name) \
             RETURN t.name AS treatment, t.kind AS kind"
                .to_string(),
            serde_json::json!({ "name": entity }),
        ));
    }

    if lower.contains("rotat") || lower.contains("companion") {
        return Some((
            "MATCH (c:Crop)-[:ROTATES_WITH]->(r:Crop) WHERE toLower(c.name) = toLower($name) \
             RETURN r.name AS rotation_partner"
                .to_string(),
            serde_json::json!({ "name": entity }),
        ));
    }

    None
}

fn render_rows(columns: &[String], rows: &[Vec<Value>]) -> String {
    if rows.is_empty() {
        return "The knowledge graph returned no matching records.".to_string();
    }

    let mut output = String::new();
    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .zip(row)
            .map(|(col, val)| {
                let rendered = match val {
                    Value::String(s) => s.clone(),
                    Value::Null => "null".to_string(),
                    other => other.to_string(),
                };
                format!("{col}: {rendered}")
            })
            .collect();
        output.push_str(&format!("- {}\n", line.join(", ")));
    }
    output
}

impl KnowledgeGraph {
    pub fn new(config: &crate::config::GraphConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    /// Execute one Cypher statement and return (columns, rows).
    pub async fn run_cypher(
        &self,
        statement: &str,
        parameters: Value,
    ) -> AppResult<(Vec<String>, Vec<Vec<Value>>)> {
        let url = format!("{}/db/{}/tx/commit", self.base_url, self.database);
        debug!(statement = %statement, "Executing Cypher");

        let body = TxRequest {
            statements: vec![Statement {
                statement: statement.to_string(),
                parameters,
            }],
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Tool {
                tool: "knowledge_graph",
                message: format!("Neo4j request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Tool {
                tool: "knowledge_graph",
                message: format!("Neo4j returned {status}: {text}"),
            });
        }

        let parsed: TxResponse = response.json().await.map_err(|e| AppError::Tool {
            tool: "knowledge_graph",
            message: format!("invalid Neo4j response: {e}"),
        })?;

        if let Some(err) = parsed.errors.first() {
            return Err(AppError::Tool {
                tool: "knowledge_graph",
                message: format!("{}: {}", err.code, err.message),
            });
        }

        let result = parsed.results.into_iter().next().ok_or(AppError::Tool {
            tool: "knowledge_graph",
            message: "Neo4j response had no result set".to_string(),
        })?;

        let rows = result.data.into_iter().map(|d| d.row).collect();
        Ok((result.columns, rows))
    }
}

#[async_trait]
impl Tool for KnowledgeGraph {
    fn kind(&self) -> ToolKind {
        ToolKind::KnowledgeGraph
    }

    fn description(&self) -> &'static str {
        "Queries the crop/pest/treatment knowledge graph for relationships (which pests affect a crop, treatments, rotation partners)"
    }

    async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
        let (statement, parameters) = if is_cypher(&input.query) {
            (input.query.clone(), serde_json::json!({}))
        } else {
            template_for(&input.query).ok_or_else(|| AppError::Tool {
                tool: "knowledge_graph",
                message: "could not map the question to a graph query".to_string(),
            })?
        };

        let (columns, rows) = self.run_cypher(&statement, parameters).await?;
        info!(rows = rows.len(), "Knowledge graph query complete");

        Ok(ToolOutput {
            tool: self.kind(),
            content: render_rows(&columns, &rows),
            data: Some(serde_json::json!({ "columns": columns, "rows": rows })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cypher() {
        assert!(is_cypher("MATCH (c:Crop) RETURN c.name"));
        assert!(is_cypher("  match (n) return n"));
        assert!(is_cypher("CALL db.labels()"));
        assert!(!is_cypher("which pests affect maize?"));
    }

    #[test]
    fn test_extract_entity() {
        assert_eq!(
            extract_entity("which pests affect maize?"),
            Some("maize".to_string())
        );
        assert_eq!(
            extract_entity("treatments for \"fall armyworm\" please"),
            Some("fall armyworm".to_string())
        );
        assert_eq!(extract_entity("show me the graph"), None);
    }

    #[test]
    fn test_template_selection() {
        let (statement, params) = template_for("which pests affect maize?").unwrap();
        assert!(statement.contains("AFFECTED_BY"));
        assert_eq!(params["name"], "maize");

        let (statement, _) = template_for("what treatment works for aphids").unwrap();
        assert!(statement.contains("TREATED_WITH"));

        assert!(template_for("hello there").is_none());
    }

    #[test]
    fn test_render_rows() {
        let columns = vec!["pest".to_string(), "severity".to_string()];
        let rows = vec![vec![
            Value::String("armyworm".to_string()),
            Value::String("high".to_string()),
        ]];

        let rendered = render_rows(&columns, &rows);
        assert!(rendered.contains("pest: armyworm"));
        assert!(rendered.contains("severity: high"));

        assert!(render_rows(&columns, &[]).contains("no matching records"));
    }
}
