//! Text processor capability

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use burrow_core::{ContentItem, ResultNode};

/// Errors from text processing
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Filtering, sub-query generation and summarization
#[async_trait]
pub trait TextProcessor: Send + Sync {
    /// Processor name for logs
    fn name(&self) -> &str;

    /// Normalize raw extracted text
    async fn filter_content(&self, text: &str) -> Result<String, ProcessorError>;

    /// Follow-up queries derived from the gathered content, at most 5
    async fn generate_sub_queries(
        &self,
        query: &str,
        content: &[ContentItem],
    ) -> Result<Vec<String>, ProcessorError>;

    /// Markdown summary of a run's results in completion order
    async fn summarize_results(&self, results: &[ResultNode]) -> Result<String, ProcessorError>;
}

/// Thread-safe reference to a text processor
pub type SharedProcessor = Arc<dyn TextProcessor>;
