//! LLM routing fallback
//!
//! When the keyword table scores nothing, the model is shown the tool catalog
//! and asked to name one tool or "none". Unparseable output maps to no tool
//! and is logged, never treated as an error.

use crate::llm::LLM;
use crate::tools::ToolKind;
use crate::types::{AppResult, LLMMessage};
use tracing::{debug, warn};

pub async fn classify_with_llm(
    llm: &LLM,
    catalog: &[(ToolKind, &'static str)],
    query: &str,
) -> AppResult<Option<ToolKind>> {
    if catalog.is_empty() {
        return Ok(None);
    }

    let tool_list = catalog
        .iter()
        .map(|(kind, description)| format!("- {}: {}", kind.as_str(), description))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "You route farmer questions to tools. Available tools:\n{tool_list}\n\n\
        QUESTION: {query}\n\n\
        Reply with exactly one tool name from the list, or \"none\" if no tool applies. \
        Reply with only that word."
    );

    let response = llm
        .complete(
            vec![LLMMessage::user(prompt)],
            None,
            Some(16),
            Some(0.0),
        )
        .await?;

    Ok(parse_tool_choice(&response.content, catalog))
}

fn parse_tool_choice(
    response: &str,
    catalog: &[(ToolKind, &'static str)],
) -> Option<ToolKind> {
    let normalized = response.trim().to_lowercase();

    if let Some(kind) = ToolKind::parse(&normalized) {
        return catalog.iter().any(|(k, _)| *k == kind).then_some(kind);
    }

    // Tolerate prose around the tool name; a tool name beats an
    // incidental "none" ("none of the others fit; use weather").
    for (kind, _) in catalog {
        if normalized.contains(kind.as_str()) {
            debug!(tool = %kind, "LLM fallback picked tool from prose");
            return Some(*kind);
        }
    }

    if normalized.contains("none") {
        return None;
    }

    warn!(response = %response.trim(), "LLM routing fallback produced no usable tool name");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<(ToolKind, &'static str)> {
        vec![
            (ToolKind::Weather, "weather"),
            (ToolKind::WebSearch, "search"),
        ]
    }

    #[test]
    fn test_parse_exact_name() {
        assert_eq!(
            parse_tool_choice("weather", &catalog()),
            Some(ToolKind::Weather)
        );
        assert_eq!(
            parse_tool_choice("  Web_Search \n", &catalog()),
            Some(ToolKind::WebSearch)
        );
    }

    #[test]
    fn test_parse_none_and_garbage() {
        assert_eq!(parse_tool_choice("none", &catalog()), None);
        assert_eq!(parse_tool_choice("I cannot decide", &catalog()), None);
    }

    #[test]
    fn test_parse_name_inside_prose() {
        assert_eq!(
            parse_tool_choice("I would use the weather tool here.", &catalog()),
            Some(ToolKind::Weather)
        );
    }

    #[test]
    fn test_tool_name_beats_incidental_none() {
        assert_eq!(
            parse_tool_choice("none of the others fit; use weather", &catalog()),
            Some(ToolKind::Weather)
        );
    }

    #[test]
    fn test_parse_rejects_tools_outside_catalog() {
        assert_eq!(parse_tool_choice("yield_model", &catalog()), None);
    }
}
