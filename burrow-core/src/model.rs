//! Research result tree
//!
//! A run produces a tree of `ResultNode`s rooted at the user query. Each
//! node holds the filtered text gathered for its query and the nodes of the
//! sub-queries explored from that text.

use serde::{Deserialize, Serialize};

/// Filtered text extracted from one source URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// URL the text came from
    pub source: String,
    /// Filtered text
    pub content: String,
}

impl ContentItem {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Outcome of researching one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultNode {
    pub query: String,
    pub content: Vec<ContentItem>,
    pub sub_queries: Vec<ResultNode>,
}

impl ResultNode {
    /// A node with no sources and no children.
    ///
    /// Returned at the depth floor, when no source yields text, and when a
    /// branch fails.
    pub fn terminal(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            content: Vec::new(),
            sub_queries: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.content.is_empty() && self.sub_queries.is_empty()
    }

    /// Source URLs of this node only
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.content.iter().map(|item| item.source.as_str())
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self
            .sub_queries
            .iter()
            .map(ResultNode::node_count)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ResultNode {
        ResultNode {
            query: "root".to_string(),
            content: vec![ContentItem::new("https://a.example", "alpha")],
            sub_queries: vec![
                ResultNode {
                    query: "child".to_string(),
                    content: vec![ContentItem::new("https://b.example", "beta")],
                    sub_queries: vec![ResultNode::terminal("leaf")],
                },
                ResultNode::terminal("empty"),
            ],
        }
    }

    #[test]
    fn test_terminal_node() {
        let node = ResultNode::terminal("nothing here");
        assert!(node.is_terminal());
        assert_eq!(node.node_count(), 1);
    }

    #[test]
    fn test_tree_shape() {
        let tree = sample_tree();
        assert!(!tree.is_terminal());
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.sources().collect::<Vec<_>>(), vec!["https://a.example"]);
        assert_eq!(tree.sub_queries[0].node_count(), 2);
    }

    #[test]
    fn test_serializes_with_snake_case_fields() {
        let json = serde_json::to_value(sample_tree()).unwrap();
        assert_eq!(json["query"], "root");
        assert_eq!(json["content"][0]["source"], "https://a.example");
        assert_eq!(json["sub_queries"][0]["query"], "child");
    }
}
