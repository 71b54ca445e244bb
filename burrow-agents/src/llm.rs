//! Model-backed text processor
//!
//! Same capability set as the heuristic processor, with each step delegated
//! to a chat model. Output is still held to the heuristic limits: filtered
//! text is re-normalized and sub-queries are capped.

use async_trait::async_trait;
use tracing::{debug, warn};

use burrow_core::{ContentItem, ResultNode};

use crate::{filter_text, HeuristicProcessor, ProcessorError, SharedBackend, SubQueryRules, TextProcessor};

/// System prompt for content cleaning
const FILTER_SYSTEM_PROMPT: &str = r#"
You clean text extracted from web pages for a research assistant.

Rules:
1. Remove navigation text, cookie notices, advertisements and boilerplate
2. Keep factual sentences about the page's main topic, in their original wording
3. Output ONLY the cleaned text, no commentary
"#;

/// System prompt for follow-up query generation
const SUB_QUERY_SYSTEM_PROMPT: &str = r#"
You are a research assistant planning the next step of a topic investigation.

Given the original query and text gathered about it, propose up to {max} follow-up questions that would deepen understanding of the topic.

Rules:
1. Output ONLY a JSON array of strings, e.g. ["What is ...?", "How does ...?"]
2. Each question must be answerable by a web search
3. Do not repeat the original query

Original query: {query}
"#;

/// System prompt for run summarization
const SUMMARY_SYSTEM_PROMPT: &str = r#"
You summarize the results of a recursive web research run.

The input lists each researched query with short previews of its sources.

Output Format:
## <query>
- key finding
- key finding

One section per query, in input order. Output markdown only.
"#;

/// Characters of raw page text sent for cleaning
const MAX_FILTER_INPUT_CHARS: usize = 4000;

/// Text processor backed by a chat model
pub struct LlmProcessor {
    backend: SharedBackend,
    heuristic: HeuristicProcessor,
    name: String,
}

impl LlmProcessor {
    pub fn new(backend: SharedBackend) -> Self {
        let name = format!("llm:{}", backend.model_name());
        Self {
            backend,
            heuristic: HeuristicProcessor::new(),
            name,
        }
    }

    /// Limits applied to model output and to the heuristic fallback
    pub fn with_rules(mut self, rules: SubQueryRules) -> Self {
        self.heuristic = self.heuristic.with_rules(rules);
        self
    }

    async fn ask(&self, system: &str, user: &str) -> Result<String, ProcessorError> {
        self.backend
            .generate(system, user)
            .await
            .map_err(|e| ProcessorError::Llm(e.to_string()))
    }
}

#[async_trait]
impl TextProcessor for LlmProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn filter_content(&self, text: &str) -> Result<String, ProcessorError> {
        let input = filter_text(text, MAX_FILTER_INPUT_CHARS);
        if input.is_empty() {
            return Ok(input);
        }

        let cleaned = self.ask(FILTER_SYSTEM_PROMPT, &input).await?;
        Ok(self.heuristic.filter(&cleaned))
    }

    async fn generate_sub_queries(
        &self,
        query: &str,
        content: &[ContentItem],
    ) -> Result<Vec<String>, ProcessorError> {
        let max = self.heuristic.rules().max_queries;
        let system = SUB_QUERY_SYSTEM_PROMPT
            .replace("{max}", &max.to_string())
            .replace("{query}", query);

        let gathered = content
            .iter()
            .map(|item| format!("Source: {}\n{}", item.source, item.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let response = self.ask(&system, &gathered).await?;

        match parse_query_list(&response, max) {
            Ok(queries) => {
                debug!("Model proposed {} sub-queries", queries.len());
                Ok(queries)
            }
            Err(e) => {
                warn!("Unusable sub-query reply ({}), using heuristic extraction", e);
                Ok(self.heuristic.sub_queries(query, content))
            }
        }
    }

    async fn summarize_results(&self, results: &[ResultNode]) -> Result<String, ProcessorError> {
        if results.is_empty() {
            return Ok(String::new());
        }

        let previews = self.heuristic.summary(results);
        self.ask(SUMMARY_SYSTEM_PROMPT, &previews).await
    }
}

/// Parse a JSON string array out of a model reply, tolerating surrounding prose
pub fn parse_query_list(reply: &str, max: usize) -> Result<Vec<String>, ProcessorError> {
    let start = reply
        .find('[')
        .ok_or_else(|| ProcessorError::Parse("no JSON array in reply".to_string()))?;
    let end = reply
        .rfind(']')
        .filter(|&end| end > start)
        .ok_or_else(|| ProcessorError::Parse("unterminated JSON array".to_string()))?;

    let queries: Vec<String> = serde_json::from_str(&reply[start..=end])
        .map_err(|e| ProcessorError::Parse(e.to_string()))?;

    Ok(queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(max)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmBackend, LlmError};
    use std::sync::Arc;

    struct MockBackend {
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl LlmBackend for MockBackend {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            self.reply
                .clone()
                .map_err(|_| LlmError::Api("service unavailable".to_string()))
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn processor(reply: Result<&str, ()>) -> LlmProcessor {
        LlmProcessor::new(Arc::new(MockBackend {
            reply: reply.map(str::to_string),
        }))
    }

    #[test]
    fn test_parse_query_list() {
        let reply = "Sure! Here you go:\n[\"What is a qubit?\", \"  \", \"How is decoherence measured?\"]\nGood luck.";
        assert_eq!(
            parse_query_list(reply, 5).unwrap(),
            vec!["What is a qubit?".to_string(), "How is decoherence measured?".to_string()]
        );

        assert!(parse_query_list("no list here", 5).is_err());
        assert!(parse_query_list("] backwards [", 5).is_err());
    }

    #[tokio::test]
    async fn test_rules_cap_model_queries() {
        let processor = processor(Ok(r#"["a b c d", "e f g h", "i j k l"]"#)).with_rules(SubQueryRules {
            max_queries: 2,
            ..SubQueryRules::default()
        });

        let queries = processor.generate_sub_queries("letters", &[]).await.unwrap();
        assert_eq!(queries, vec!["a b c d".to_string(), "e f g h".to_string()]);
    }

    #[test]
    fn test_parse_query_list_caps() {
        let reply = r#"["a", "b", "c", "d", "e", "f", "g"]"#;
        assert_eq!(parse_query_list(reply, 5).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_filter_output_normalized() {
        let processor = processor(Ok("  cleaned \n\n text  "));
        assert_eq!(processor.name(), "llm:mock");
        assert_eq!(processor.filter_content("raw page").await.unwrap(), "cleaned text");
    }

    #[tokio::test]
    async fn test_backend_error_surfaces() {
        let processor = processor(Err(()));
        let err = processor.filter_content("raw page").await.unwrap_err();
        assert!(matches!(err, ProcessorError::Llm(_)));
    }

    #[tokio::test]
    async fn test_unparseable_reply_uses_heuristic() {
        let processor = processor(Ok("I cannot produce JSON today."));
        let content = vec![ContentItem::new(
            "https://a.example",
            "Qubits store quantum information in superposition.",
        )];

        let queries = processor.generate_sub_queries("qubits", &content).await.unwrap();
        assert_eq!(
            queries,
            vec!["What is meant by: Qubits store quantum information in superposition".to_string()]
        );
    }
}
