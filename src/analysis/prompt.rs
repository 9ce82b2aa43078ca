//! Prompt construction for relevance analysis.

use scout_search::FetchedContent;

/// Instructions sent as the system message of every analysis request.
pub const SYSTEM_PROMPT: &str = "You rate how relevant a web page is to a search query. \
Respond with a single JSON object and nothing else, in exactly this shape:\n\
{\"relevanceScore\": <number 0-1>, \"confidenceScore\": <number 0-1>, \
\"description\": \"<one sentence summary of the page for this query>\", \
\"reasoning\": \"<optional short justification>\"}\n\
relevanceScore: 1 means the page directly answers the query, 0 means unrelated. \
confidenceScore: how sure you are given the text you were shown.";

/// Cut `text` to at most `max_chars` characters.
///
/// Prefers ending on the last sentence terminator (`.`, `!`, `?`) that lies
/// past half the limit; otherwise cuts hard and appends `...`.
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    let boundary = head
        .char_indices()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, _)| i)
        .last()
        .filter(|&i| head[..i].chars().count() >= max_chars / 2);

    match boundary {
        Some(i) => head[..=i].to_string(),
        None => format!("{}...", head.trim_end()),
    }
}

/// User message describing `content` and `query`.
pub fn build_user_prompt(content: &FetchedContent, query: &str, max_chars: usize) -> String {
    let mut prompt = format!("Search query: {query}\n\nURL: {}\n", content.url);
    if !content.title.is_empty() {
        prompt.push_str(&format!("Title: {}\n", content.title));
    }
    if !content.description.is_empty() {
        prompt.push_str(&format!("Description: {}\n", content.description));
    }
    prompt.push_str(&format!("Content type: {}\n", content.content_type));
    if !content.body_text.is_empty() {
        prompt.push_str("\nPage text:\n");
        prompt.push_str(&truncate_content(&content.body_text, max_chars));
        prompt.push('\n');
    }
    prompt
}
