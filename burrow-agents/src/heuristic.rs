//! Heuristic text processor
//!
//! Rule-based stand-in for a language model. Filtering is whitespace
//! normalization plus truncation; sub-queries are sentences picked by
//! length, question phrases, and overlap with the query; the summary is a
//! markdown preview of every result.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use burrow_core::{ContentItem, ResultNode, MAX_FILTERED_CHARS};

use crate::{ProcessorError, TextProcessor};

/// Phrases that mark a sentence as question-like
const QUESTION_PHRASES: &[&str] = &[
    "what is",
    "how to",
    "why does",
    "explain",
    "difference between",
    "compare",
    "define",
];

/// Sentences starting with one of these are kept verbatim
const QUESTION_WORDS: &[&str] = &["what", "how", "why", "when", "where", "who"];

const QUESTION_PREFIX: &str = "What is meant by: ";

const ELLIPSIS: &str = "...";

/// Characters of each content item shown in a summary
pub const SUMMARY_PREVIEW_CHARS: usize = 200;

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").unwrap());

/// Selection rules for sub-query extraction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubQueryRules {
    pub min_words: usize,
    pub max_words: usize,
    pub max_queries: usize,
    /// Longest sentence embedded in a query before it is cut with an ellipsis
    pub max_sentence_chars: usize,
}

impl Default for SubQueryRules {
    fn default() -> Self {
        Self {
            min_words: 4,
            max_words: 20,
            max_queries: 5,
            max_sentence_chars: 100,
        }
    }
}

/// Rule-based text processor
#[derive(Debug, Clone)]
pub struct HeuristicProcessor {
    rules: SubQueryRules,
    max_content_chars: usize,
    preview_chars: usize,
}

impl Default for HeuristicProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicProcessor {
    pub fn new() -> Self {
        Self {
            rules: SubQueryRules::default(),
            max_content_chars: MAX_FILTERED_CHARS,
            preview_chars: SUMMARY_PREVIEW_CHARS,
        }
    }

    pub fn with_rules(mut self, rules: SubQueryRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &SubQueryRules {
        &self.rules
    }

    pub fn filter(&self, text: &str) -> String {
        filter_text(text, self.max_content_chars)
    }

    pub fn sub_queries(&self, query: &str, content: &[ContentItem]) -> Vec<String> {
        derive_sub_queries(query, content, &self.rules)
    }

    pub fn summary(&self, results: &[ResultNode]) -> String {
        render_summary(results, self.preview_chars)
    }
}

#[async_trait]
impl TextProcessor for HeuristicProcessor {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn filter_content(&self, text: &str) -> Result<String, ProcessorError> {
        Ok(self.filter(text))
    }

    async fn generate_sub_queries(
        &self,
        query: &str,
        content: &[ContentItem],
    ) -> Result<Vec<String>, ProcessorError> {
        Ok(self.sub_queries(query, content))
    }

    async fn summarize_results(&self, results: &[ResultNode]) -> Result<String, ProcessorError> {
        Ok(self.summary(results))
    }
}

/// Collapse whitespace runs and cap the length. Idempotent.
pub fn filter_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_chars).collect();
    truncated.trim_end().to_string()
}

/// Pick follow-up queries from the gathered content
pub fn derive_sub_queries(query: &str, content: &[ContentItem], rules: &SubQueryRules) -> Vec<String> {
    let combined = content
        .iter()
        .map(|item| item.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = combined.replace(['"', '\''], "");

    let query_lower = query.to_lowercase();
    let query_words: HashSet<&str> = words(&query_lower).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut selected = Vec::new();

    for candidate in SENTENCE_BOUNDARY.split(&cleaned) {
        let sentence = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
        let word_count = sentence.split_whitespace().count();

        if word_count < rules.min_words || word_count > rules.max_words {
            continue;
        }
        if !is_relevant(&sentence, &query_words) {
            continue;
        }

        if seen.insert(sentence.clone()) {
            selected.push(sentence);
            if selected.len() >= rules.max_queries {
                break;
            }
        }
    }

    debug!("Selected {} sub-query sentences", selected.len());

    selected
        .iter()
        .map(|sentence| as_question(sentence, rules.max_sentence_chars))
        .collect()
}

/// Markdown section per result: heading plus a preview bullet per source
pub fn render_summary(results: &[ResultNode], preview_chars: usize) -> String {
    results
        .iter()
        .map(|node| {
            let bullets = node
                .content
                .iter()
                .map(|item| format!("- {}", preview(&item.content, preview_chars)))
                .collect::<Vec<_>>()
                .join("\n");
            format!("## {}\n{}", node.query, bullets)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

fn is_relevant(sentence: &str, query_words: &HashSet<&str>) -> bool {
    let lower = sentence.to_lowercase();
    let shares_word = words(&lower).any(|word| query_words.contains(word));

    shares_word || QUESTION_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn starts_with_question_word(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    let first = words(&lower).next();
    first.is_some_and(|word| QUESTION_WORDS.contains(&word))
}

fn as_question(sentence: &str, max_chars: usize) -> String {
    let embedded = truncate_chars(sentence, max_chars);

    if starts_with_question_word(sentence) {
        embedded
    } else {
        format!("{}{}", QUESTION_PREFIX, embedded)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let head: String = text.chars().take(max_chars).collect();
    format!("{}{}", head, ELLIPSIS)
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&flat, max_chars)
}
