//! ReAct orchestration loop
//!
//! A bounded retry loop alternating "pick a tool by keyword score" and "call
//! it": each iteration executes at most one tool, appends its output to the
//! synthesis context, and invokes text generation. The loop terminates on the
//! first successful generation or when the iteration budget is exhausted; LLM
//! unavailability degrades to a deterministic fallback reply, never an error.

use crate::llm::LLM;
use crate::router::{classify_with_llm, Router};
use crate::tools::{ToolInput, ToolKind, ToolOutput, ToolRegistry};
use crate::types::LLMMessage;
use std::sync::Arc;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are an agricultural assistant helping farmers with crop management, \
pests, weather, and market questions. Ground your answers in the tool observations provided; \
be practical and concise, and say so plainly when you are unsure.";

#[derive(Debug, Clone, serde::Serialize)]
pub struct StepRecord {
    pub iteration: u32,
    pub tool: Option<ToolKind>,
    pub outcome: String,
}

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub reply: String,
    pub tool_used: Option<ToolKind>,
    pub steps: Vec<StepRecord>,
}

pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    router: Router,
    llm: Option<Arc<LLM>>,
    max_iterations: u32,
}

impl Orchestrator {
    pub fn new(registry: Arc<ToolRegistry>, llm: Option<Arc<LLM>>, max_iterations: u32) -> Self {
        Self {
            registry,
            router: Router::new(),
            llm,
            max_iterations: max_iterations.max(1),
        }
    }

    pub async fn run(
        &self,
        query: &str,
        image_base64: Option<&str>,
        history: &[LLMMessage],
    ) -> AgentOutcome {
        let candidates = self.candidate_tools(query, image_base64.is_some()).await;
        info!(candidates = ?candidates, "Starting agent loop");

        let input = ToolInput {
            query: query.to_string(),
            image_base64: image_base64.map(String::from),
        };

        let mut steps: Vec<StepRecord> = Vec::new();
        let mut observations: Vec<ToolOutput> = Vec::new();
        let mut tool_used: Option<ToolKind> = None;
        let mut candidate_idx: usize = 0;

        for iteration in 1..=self.max_iterations {
            // A failed tool advances to the next-ranked candidate; after one
            // succeeds, later iterations retry generation only.
            let selected = if tool_used.is_none() {
                candidates.get(candidate_idx).copied()
            } else {
                None
            };

            if let Some(kind) = selected {
                match self.registry.get(kind) {
                    Some(tool) => match tool.run(&input).await {
                        Ok(output) => {
                            info!(iteration, tool = %kind, "Tool succeeded");
                            steps.push(StepRecord {
                                iteration,
                                tool: Some(kind),
                                outcome: "ok".to_string(),
                            });
                            tool_used.get_or_insert(kind);
                            observations.push(output);
                        }
                        Err(e) => {
                            warn!(iteration, tool = %kind, error = %e, "Tool failed");
                            steps.push(StepRecord {
                                iteration,
                                tool: Some(kind),
                                outcome: format!("failed: {e}"),
                            });
                            candidate_idx += 1;
                        }
                    },
                    None => {
                        steps.push(StepRecord {
                            iteration,
                            tool: Some(kind),
                            outcome: "not available".to_string(),
                        });
                        candidate_idx += 1;
                    }
                }
            }

            match self.synthesize(query, history, &observations).await {
                Some(reply) => {
                    steps.push(StepRecord {
                        iteration,
                        tool: None,
                        outcome: "generated".to_string(),
                    });
                    info!(iterations = iteration, "Agent loop complete");
                    return AgentOutcome {
                        reply,
                        tool_used,
                        steps,
                    };
                }
                None if self.llm.is_none() => break,
                None => {
                    steps.push(StepRecord {
                        iteration,
                        tool: None,
                        outcome: "generation failed".to_string(),
                    });
                }
            }
        }

        warn!("Agent loop exhausted without a generation, using fallback reply");
        AgentOutcome {
            reply: fallback_reply(query, &observations),
            tool_used,
            steps,
        }
    }

    /// Ranked tool candidates: an attached image short-circuits to the pest
    /// classifier; a zero-score query consults the LLM fallback.
    async fn candidate_tools(&self, query: &str, has_image: bool) -> Vec<ToolKind> {
        if has_image {
            return vec![ToolKind::PestClassifier];
        }

        let ranked: Vec<ToolKind> = self
            .router
            .ranked(query)
            .into_iter()
            .map(|(tool, _)| tool)
            .filter(|tool| self.registry.contains(*tool))
            .collect();

        if !ranked.is_empty() {
            return ranked;
        }

        if let Some(llm) = &self.llm {
            match classify_with_llm(llm, &self.registry.catalog(), query).await {
                Ok(Some(tool)) => return vec![tool],
                Ok(None) => {}
                Err(e) => warn!(error = %e, "LLM routing fallback failed"),
            }
        }

        Vec::new()
    }

    async fn synthesize(
        &self,
        query: &str,
        history: &[LLMMessage],
        observations: &[ToolOutput],
    ) -> Option<String> {
        let llm = self.llm.as_ref()?;

        let mut messages: Vec<LLMMessage> = history.to_vec();
        messages.push(LLMMessage::user(build_user_prompt(query, observations)));

        match llm
            .complete(messages, Some(SYSTEM_PROMPT.to_string()), Some(1024), Some(0.7))
            .await
        {
            Ok(response) if !response.content.trim().is_empty() => Some(response.content),
            Ok(_) => {
                warn!("LLM returned an empty generation");
                None
            }
            Err(e) => {
                warn!(error = %e, "LLM generation failed");
                None
            }
        }
    }
}

fn build_user_prompt(query: &str, observations: &[ToolOutput]) -> String {
    if observations.is_empty() {
        return query.to_string();
    }

    let mut prompt = format!("QUESTION: {query}\n\nTOOL OBSERVATIONS:\n");
    for output in observations {
        prompt.push_str(&format!("[{}]\n{}\n\n", output.tool, output.content));
    }
    prompt.push_str("Answer the question using the observations above. Cite figures from them where relevant.");
    prompt
}

/// Deterministic reply when no generation succeeded. Tool output, when any
/// was collected, is still worth returning verbatim.
fn fallback_reply(query: &str, observations: &[ToolOutput]) -> String {
    if observations.is_empty() {
        format!(
            "I received your question: \"{query}\"\n\n\
            I could not reach the language model to compose an answer. \
            Please check the LLM configuration and try again."
        )
    } else {
        let mut reply = String::from("Here is what I found:\n\n");
        for output in observations {
            reply.push_str(&format!("{}\n\n", output.content));
        }
        reply.push_str("(The language model was unavailable, so this is the raw tool output.)");
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LLMConfig;
    use crate::tools::{Tool, ToolRegistry};
    use crate::types::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubTool {
        kind: ToolKind,
        fail: bool,
    }

    struct CountingTool {
        kind: ToolKind,
        fail: bool,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        fn description(&self) -> &'static str {
            "counting stub"
        }

        async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Tool {
                    tool: "stub",
                    message: "boom".to_string(),
                });
            }
            Ok(ToolOutput {
                tool: self.kind,
                content: format!("observed: {}", input.query),
                data: None,
            })
        }
    }

    /// An adapter nothing listens on, so every generation attempt errors.
    fn unreachable_llm() -> Arc<LLM> {
        let config = LLMConfig {
            provider: "ollama".to_string(),
            model: "test".to_string(),
            embedding_model: "test".to_string(),
            api_key: String::new(),
            base_url: Some("http://127.0.0.1:9".to_string()),
        };
        Arc::new(LLM::from_config(&config).unwrap())
    }

    #[async_trait]
    impl Tool for StubTool {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        fn description(&self) -> &'static str {
            "stub"
        }

        async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
            if self.fail {
                return Err(AppError::Tool {
                    tool: "stub",
                    message: "boom".to_string(),
                });
            }
            Ok(ToolOutput {
                tool: self.kind,
                content: format!("observed: {}", input.query),
                data: None,
            })
        }
    }

    fn registry_with(tools: Vec<StubTool>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.insert(Arc::new(tool));
        }
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_no_llm_returns_tool_output_as_fallback() {
        let registry = registry_with(vec![StubTool {
            kind: ToolKind::Weather,
            fail: false,
        }]);
        let orchestrator = Orchestrator::new(registry, None, 3);

        let outcome = orchestrator
            .run("what is the weather in Eldoret?", None, &[])
            .await;

        assert_eq!(outcome.tool_used, Some(ToolKind::Weather));
        assert!(outcome.reply.contains("observed: what is the weather"));
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].outcome, "ok");
    }

    #[tokio::test]
    async fn test_no_llm_no_tool_match_apologizes() {
        let registry = registry_with(vec![]);
        let orchestrator = Orchestrator::new(registry, None, 3);

        let outcome = orchestrator.run("hello there", None, &[]).await;

        assert_eq!(outcome.tool_used, None);
        assert!(outcome.reply.contains("could not reach the language model"));
    }

    #[tokio::test]
    async fn test_image_short_circuits_to_pest_classifier() {
        let registry = registry_with(vec![
            StubTool {
                kind: ToolKind::Weather,
                fail: false,
            },
            StubTool {
                kind: ToolKind::PestClassifier,
                fail: false,
            },
        ]);
        let orchestrator = Orchestrator::new(registry, None, 3);

        let outcome = orchestrator
            .run("what is the weather doing to my crop?", Some("aGVsbG8="), &[])
            .await;

        assert_eq!(outcome.tool_used, Some(ToolKind::PestClassifier));
    }

    #[tokio::test]
    async fn test_failed_tool_is_recorded_not_fatal() {
        let registry = registry_with(vec![StubTool {
            kind: ToolKind::Weather,
            fail: true,
        }]);
        let orchestrator = Orchestrator::new(registry, None, 2);

        let outcome = orchestrator.run("weather in Eldoret", None, &[]).await;

        assert_eq!(outcome.tool_used, None);
        assert!(outcome.steps.iter().any(|s| s.outcome.starts_with("failed")));
        assert!(outcome.reply.contains("could not reach the language model"));
    }

    #[tokio::test]
    async fn test_successful_tool_is_not_followed_by_next_candidate() {
        let weather_calls = Arc::new(AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry.insert(Arc::new(CountingTool {
            kind: ToolKind::WebSearch,
            fail: false,
            calls: Arc::new(AtomicU32::new(0)),
        }));
        registry.insert(Arc::new(CountingTool {
            kind: ToolKind::Weather,
            fail: false,
            calls: weather_calls.clone(),
        }));

        let orchestrator = Orchestrator::new(Arc::new(registry), Some(unreachable_llm()), 3);

        // WebSearch outranks Weather here; with generation failing every
        // iteration, Weather must still never run.
        let outcome = orchestrator.run("latest weather news", None, &[]).await;

        assert_eq!(outcome.tool_used, Some(ToolKind::WebSearch));
        assert_eq!(weather_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            outcome
                .steps
                .iter()
                .filter(|s| s.tool.is_some())
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_tool_advances_to_next_candidate() {
        let weather_calls = Arc::new(AtomicU32::new(0));
        let mut registry = ToolRegistry::new();
        registry.insert(Arc::new(CountingTool {
            kind: ToolKind::WebSearch,
            fail: true,
            calls: Arc::new(AtomicU32::new(0)),
        }));
        registry.insert(Arc::new(CountingTool {
            kind: ToolKind::Weather,
            fail: false,
            calls: weather_calls.clone(),
        }));

        let orchestrator = Orchestrator::new(Arc::new(registry), Some(unreachable_llm()), 2);

        let outcome = orchestrator.run("latest weather news", None, &[]).await;

        assert_eq!(outcome.tool_used, Some(ToolKind::Weather));
        assert_eq!(weather_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_orchestrator_serves_repeated_runs() {
        let registry = registry_with(vec![StubTool {
            kind: ToolKind::Weather,
            fail: false,
        }]);
        let orchestrator = Arc::new(Orchestrator::new(registry, None, 3));

        let first = orchestrator.run("weather in Eldoret", None, &[]).await;
        let second = orchestrator.run("weather in Kitale", None, &[]).await;

        assert_eq!(first.tool_used, Some(ToolKind::Weather));
        assert_eq!(second.tool_used, Some(ToolKind::Weather));
    }

    #[test]
    fn test_build_user_prompt_includes_observations() {
        let observations = vec![ToolOutput {
            tool: ToolKind::Weather,
            content: "21°C, clear".to_string(),
            data: None,
        }];

        let prompt = build_user_prompt("should I spray today?", &observations);
        assert!(prompt.contains("QUESTION: should I spray today?"));
        assert!(prompt.contains("[weather]"));
        assert!(prompt.contains("21°C, clear"));

        assert_eq!(build_user_prompt("plain", &[]), "plain");
    }
}
