/// Default base URL of the local agent server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Path of the streaming chat endpoint.
pub const AGENT_CHAT_PATH: &str = "/agent-chat";

/// Normalize a base URL to the streaming chat endpoint.
///
/// Blank input falls back to [`DEFAULT_BASE_URL`]; an input already ending in
/// `/agent-chat` is kept as is.
pub fn normalize_chat_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(AGENT_CHAT_PATH) {
        return trimmed.to_string();
    }
    format!("{trimmed}{AGENT_CHAT_PATH}")
}
