//! Static routing rule table.
//!
//! One rule per tool: keyword list, optional regex patterns, a per-match
//! weight, and a priority used only to break score ties.

use crate::tools::ToolKind;
use regex::Regex;

pub struct RouteRule {
    pub tool: ToolKind,
    pub keywords: &'static [&'static str],
    pub patterns: Vec<Regex>,
    pub weight: f32,
    pub priority: u8,
}

impl RouteRule {
    fn new(
        tool: ToolKind,
        keywords: &'static [&'static str],
        patterns: &[&str],
        weight: f32,
        priority: u8,
    ) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self {
            tool,
            keywords,
            patterns,
            weight,
            priority,
        }
    }

    /// Weighted match score: `weight` once per matched keyword
    /// (case-insensitive substring) and once per matched pattern.
    pub fn score(&self, query: &str) -> f32 {
        let lower = query.to_lowercase();

        let keyword_hits = self
            .keywords
            .iter()
            .filter(|kw| lower.contains(*kw))
            .count();

        let pattern_hits = self.patterns.iter().filter(|re| re.is_match(query)).count();

        (keyword_hits + pattern_hits) as f32 * self.weight
    }
}

pub fn builtin_rules() -> Vec<RouteRule> {
    vec![
        RouteRule::new(
            ToolKind::Weather,
            &[
                "weather", "rain", "rainfall", "forecast", "temperature", "humidity", "frost",
                "drought", "sunny", "wind",
            ],
            &[r"(?i)\bweather\s+(in|at|for)\b", r"(?i)will it rain"],
            1.0,
            3,
        ),
        RouteRule::new(
            ToolKind::YieldModel,
            &[
                "yield", "harvest estimate", "production estimate", "tonnage", "output per",
                "predict yield", "expected harvest",
            ],
            &[r"(?i)\b(predict|estimate|expect)\w*\b.*\byield\b", r"(?i)\byield\b.*\bpredict\w*\b"],
            1.2,
            4,
        ),
        RouteRule::new(
            ToolKind::PestClassifier,
            &[
                "pest", "insect", "bug", "disease", "infestation", "infected", "larvae",
                "caterpillar", "aphid", "armyworm", "blight", "fungus", "eating my",
            ],
            &[r"(?i)what('s| is)\s+(wrong with|eating|attacking)"],
            1.0,
            5,
        ),
        RouteRule::new(
            ToolKind::KnowledgeGraph,
            &[
                "related to", "relationship", "knowledge graph", "which pests affect",
                "rotation partner", "rotate with", "companion crop", "cypher",
            ],
            &[r"(?i)^\s*(match|call|return|with|unwind|optional)\b"],
            1.5,
            2,
        ),
        RouteRule::new(
            ToolKind::WebSearch,
            &[
                "latest", "news", "price", "prices", "market", "current", "today", "recent",
                "subsidy", "regulation",
            ],
            &[r"(?i)\b(this (week|month|year)|right now)\b"],
            1.0,
            1,
        ),
        RouteRule::new(
            ToolKind::KnowledgeBase,
            &[
                "how to", "how do i", "best practice", "fertilizer", "fertiliser", "irrigation",
                "soil", "planting", "spacing", "mulch", "compost", "manure", "seed rate",
                "germination", "pruning", "weed",
            ],
            &[],
            0.8,
            0,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_scoring_counts_each_hit() {
        let rules = builtin_rules();
        let weather = rules
            .iter()
            .find(|r| r.tool == ToolKind::Weather)
            .unwrap();

        // "weather" keyword + "rain" keyword + "weather in" pattern
        let score = weather.score("What's the weather in Eldoret, will it rain?");
        assert!(score >= 3.0);

        assert_eq!(weather.score("how do I plant beans"), 0.0);
    }

    #[test]
    fn test_every_tool_has_one_rule() {
        let rules = builtin_rules();
        let mut tools: Vec<_> = rules.iter().map(|r| r.tool).collect();
        tools.sort_by_key(|t| t.as_str());
        tools.dedup();
        assert_eq!(tools.len(), rules.len());
    }
}
