//! Best-effort extraction of the analysis JSON from model output.
//!
//! Models wrap JSON in prose or code fences despite instructions, so the
//! reply is scanned for the first balanced `{ ... }` object (string-aware)
//! and only that slice is decoded.

use serde_json::Value;

use super::AnalysisResult;

/// First balanced JSON object in `text`, braces inside strings ignored.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn score(value: &Value, key: &str) -> Option<f64> {
    let raw = value.get(key)?;
    let n = raw
        .as_f64()
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))?;
    n.is_finite().then(|| n.clamp(0.0, 1.0))
}

/// Decode an [`AnalysisResult`] from a model reply.
///
/// `relevanceScore` is required; `confidenceScore` defaults to 0.5 and
/// `description` to empty. Scores are clamped into `[0, 1]`.
pub fn parse_analysis(text: &str) -> Option<AnalysisResult> {
    let value: Value = serde_json::from_str(first_json_object(text)?).ok()?;
    let text_field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    Some(AnalysisResult {
        relevance_score: score(&value, "relevanceScore")?,
        confidence_score: score(&value, "confidenceScore").unwrap_or(0.5),
        description: text_field("description").unwrap_or_default(),
        reasoning: text_field("reasoning"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_object_inside_prose_and_fences() {
        let reply = "Sure! ```json\n{\"relevanceScore\": 0.8, \"note\": \"a } brace\"}\n``` done {x}";
        assert_eq!(
            first_json_object(reply),
            Some("{\"relevanceScore\": 0.8, \"note\": \"a } brace\"}")
        );
    }

    #[test]
    fn nested_and_escaped() {
        let reply = r#"{"a": {"b": "q\"}"}, "c": 1} trailing"#;
        assert_eq!(first_json_object(reply), Some(r#"{"a": {"b": "q\"}"}, "c": 1}"#));
    }

    #[test]
    fn unbalanced_is_none() {
        assert!(first_json_object("{\"relevanceScore\": 0.8").is_none());
        assert!(first_json_object("no json here").is_none());
    }

    #[test]
    fn parses_and_clamps() {
        let result = parse_analysis(
            r#"{"relevanceScore": 1.7, "confidenceScore": "0.4", "description": " Good match ", "reasoning": ""}"#,
        )
        .unwrap_or_else(|| panic!("should parse"));
        assert!((result.relevance_score - 1.0).abs() < f64::EPSILON);
        assert!((result.confidence_score - 0.4).abs() < f64::EPSILON);
        assert_eq!(result.description, "Good match");
        assert!(result.reasoning.is_none());
    }

    #[test]
    fn missing_relevance_is_rejected() {
        assert!(parse_analysis(r#"{"confidenceScore": 0.9}"#).is_none());
        assert!(parse_analysis(r#"{"relevanceScore": "high"}"#).is_none());
    }
}
