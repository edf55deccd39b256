//! Tool router
//!
//! A scoring function over regex/keyword matches against a static priority
//! table. The highest total score wins; ties break on rule priority, then on
//! table order. A zero score means "no tool" and is left to the LLM fallback.

pub mod llm_fallback;
pub mod rules;

pub use llm_fallback::classify_with_llm;
pub use rules::{builtin_rules, RouteRule};

use crate::tools::ToolKind;
use tracing::debug;

pub struct Router {
    rules: Vec<RouteRule>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    pub fn with_rules(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// All tools with a nonzero score, best first.
    pub fn ranked(&self, query: &str) -> Vec<(ToolKind, f32)> {
        let mut scored: Vec<(usize, ToolKind, f32, u8)> = self
            .rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| (idx, rule.tool, rule.score(query), rule.priority))
            .filter(|(_, _, score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.3.cmp(&a.3))
                .then(a.0.cmp(&b.0))
        });

        debug!(query_len = query.len(), candidates = scored.len(), "Routed query");

        scored
            .into_iter()
            .map(|(_, tool, score, _)| (tool, score))
            .collect()
    }

    /// The single best tool, or `None` when nothing matches.
    pub fn select(&self, query: &str) -> Option<ToolKind> {
        self.ranked(query).first().map(|(tool, _)| *tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_weather() {
        let router = Router::new();
        assert_eq!(
            router.select("What's the weather forecast in Eldoret?"),
            Some(ToolKind::Weather)
        );
    }

    #[test]
    fn test_select_yield() {
        let router = Router::new();
        assert_eq!(
            router.select("Can you predict the yield with rainfall_mm 500?"),
            Some(ToolKind::YieldModel)
        );
    }

    #[test]
    fn test_select_knowledge_base_for_practice_questions() {
        let router = Router::new();
        assert_eq!(
            router.select("How to apply fertilizer for maize planting?"),
            Some(ToolKind::KnowledgeBase)
        );
    }

    #[test]
    fn test_cypher_routes_to_graph() {
        let router = Router::new();
        assert_eq!(
            router.select("MATCH (c:Crop) RETURN c.name"),
            Some(ToolKind::KnowledgeGraph)
        );
    }

    #[test]
    fn test_no_match_returns_none() {
        let router = Router::new();
        assert_eq!(router.select("hello there"), None);
        assert!(router.ranked("hello there").is_empty());
    }

    #[test]
    fn test_ranked_orders_by_score() {
        let router = Router::new();
        let ranked = router.ranked("latest weather news and market prices");
        assert!(!ranked.is_empty());
        // WebSearch gets latest/news/market/price(s) hits, weather gets one.
        assert_eq!(ranked[0].0, ToolKind::WebSearch);
        assert!(ranked.iter().any(|(tool, _)| *tool == ToolKind::Weather));
    }

    #[test]
    fn test_tie_breaks_on_priority() {
        use crate::tools::ToolKind;
        let rules = vec![
            RouteRule {
                tool: ToolKind::WebSearch,
                keywords: &["maize"],
                patterns: vec![],
                weight: 1.0,
                priority: 1,
            },
            RouteRule {
                tool: ToolKind::Weather,
                keywords: &["maize"],
                patterns: vec![],
                weight: 1.0,
                priority: 2,
            },
        ];

        let router = Router::with_rules(rules);
        assert_eq!(router.select("maize"), Some(ToolKind::Weather));
    }
}
