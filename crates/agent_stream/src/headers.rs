use std::collections::BTreeMap;

use crate::config::ChatApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for streaming chat requests.
pub fn build_headers(config: &ChatApiConfig) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    let ua = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        headers.insert(key, value.trim().to_owned());
    }

    headers
}

fn default_user_agent() -> String {
    format!("agent-chat/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_headers_are_lowercased_and_override_defaults() {
        let config = ChatApiConfig::default()
            .insert_header(" X-Trace ", " abc ")
            .insert_header("Accept", "application/json");

        let headers = build_headers(&config);

        assert_eq!(headers.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(
            headers.get(HEADER_ACCEPT).map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn blank_user_agent_falls_back_to_default() {
        let config = ChatApiConfig::default().with_user_agent("   ");
        let headers = build_headers(&config);
        let ua = headers.get(HEADER_USER_AGENT).expect("user agent header");
        assert!(ua.starts_with("agent-chat/"));
    }
}
