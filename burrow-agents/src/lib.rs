//! Burrow Agents
//!
//! Text processing capabilities used by the research orchestrator:
//! - **filter_content**: Normalizes extracted page text
//! - **generate_sub_queries**: Derives follow-up queries from gathered text
//! - **summarize_results**: Renders a run's results as markdown
//!
//! Two interchangeable processors implement [`TextProcessor`]: the
//! rule-based [`HeuristicProcessor`] and the model-backed [`LlmProcessor`].

pub mod backend;
pub mod processor;
pub mod heuristic;
pub mod llm;

pub use backend::*;
pub use processor::*;
pub use heuristic::*;
pub use llm::*;
