use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::run::AgentStep;

/// Matches shorter than this many characters are treated as noise.
pub const MIN_SOURCE_LEN: usize = 10;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '"', '\'', ')', ']', '}'];

fn url_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r#"https?://[^\s,")\]}]+"#).expect("source URL regex must compile")
    })
}

/// Collect URLs referenced by the steps' input, output and thought, in order
/// of first appearance and without duplicates.
pub fn extract_sources(steps: &[AgentStep]) -> Vec<String> {
    let mut collector = SourceCollector::default();

    for step in steps {
        if let Some(input) = &step.input {
            collector.visit_value(input);
        }
        if let Some(output) = &step.output {
            collector.visit_value(output);
        }
        if let Some(thought) = &step.thought {
            collector.visit_text(thought);
        }
    }

    collector.urls
}

#[derive(Default)]
struct SourceCollector {
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl SourceCollector {
    fn visit_value(&mut self, value: &Value) {
        match value {
            Value::String(text) => self.visit_text(text),
            Value::Array(items) => items.iter().for_each(|item| self.visit_value(item)),
            Value::Object(map) => map.values().for_each(|item| self.visit_value(item)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    fn visit_text(&mut self, text: &str) {
        for found in url_regex().find_iter(text) {
            let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if url.chars().count() < MIN_SOURCE_LEN {
                continue;
            }
            if self.seen.insert(url.to_owned()) {
                self.urls.push(url.to_owned());
            }
        }
    }
}
