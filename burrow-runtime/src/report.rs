//! Run persistence
//!
//! Writes one markdown document per result node, a summary document, and a
//! JSON dump of the flat results into a timestamped directory.

use chrono::Local;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

use burrow_core::ResultNode;

/// Characters never allowed in a document name
const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const MAX_FILENAME_CHARS: usize = 50;

const SUMMARY_DOCUMENT: &str = "summary.md";

const RESULTS_DOCUMENT: &str = "results.json";

/// Errors from persistence
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for named documents
pub trait DocumentSink {
    fn write_document(&self, name: &str, content: &str) -> Result<(), ReportError>;
}

/// Writes documents as files in one directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create `<base>_<YYYYmmdd_HHMMSS>`
    pub fn timestamped(base: impl AsRef<Path>) -> Result<Self, ReportError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let dir = PathBuf::from(format!("{}_{}", base.as_ref().display(), stamp));
        Self::at(dir)
    }

    pub fn at(dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentSink for DirectorySink {
    fn write_document(&self, name: &str, content: &str) -> Result<(), ReportError> {
        fs::write(self.dir.join(name), content)?;
        Ok(())
    }
}

/// Renders a run and hands the documents to a sink
pub struct ReportWriter<S: DocumentSink> {
    sink: S,
}

impl<S: DocumentSink> ReportWriter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Write every result node plus the summary and JSON dump.
    ///
    /// A failed node document is logged and skipped; the summary and JSON
    /// documents are required. Returns the number of documents written.
    pub fn write_run(&self, results: &[ResultNode], summary: &str) -> Result<usize, ReportError> {
        let mut written = 0;
        let mut used: HashSet<String> = HashSet::new();

        for node in results {
            let name = unique_name(&mut used, &sanitize_filename(&node.query));
            let document = format!("{}.md", name);

            match self.sink.write_document(&document, &render_result_document(node)) {
                Ok(()) => {
                    info!("Saved research results to: {}", document);
                    written += 1;
                }
                Err(e) => error!("Error creating markdown file {}: {}", document, e),
            }
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.sink.write_document(
            SUMMARY_DOCUMENT,
            &render_summary_document(&timestamp, results.len(), summary),
        )?;
        self.sink
            .write_document(RESULTS_DOCUMENT, &serde_json::to_string_pretty(results)?)?;

        info!("Saved research summary to: {}", SUMMARY_DOCUMENT);
        Ok(written + 2)
    }
}

/// Persist a run into a fresh timestamped directory under `base`
pub fn persist_run(base: impl AsRef<Path>, results: &[ResultNode], summary: &str) -> Result<PathBuf, ReportError> {
    let sink = DirectorySink::timestamped(base)?;
    let dir = sink.dir().to_path_buf();
    info!("Saving results to: {}", dir.display());

    ReportWriter::new(sink).write_run(results, summary)?;
    Ok(dir)
}

/// File-safe name for a query
pub fn sanitize_filename(query: &str) -> String {
    query
        .chars()
        .filter(|c| !UNSAFE_FILENAME_CHARS.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(MAX_FILENAME_CHARS)
        .collect()
}

/// First of `name`, `name_2`, `name_3`, ... not yet handed out
fn unique_name(used: &mut HashSet<String>, name: &str) -> String {
    let name = if name.is_empty() { "query" } else { name };

    let mut candidate = name.to_string();
    let mut suffix = 1;
    while used.contains(&candidate) {
        suffix += 1;
        candidate = format!("{}_{}", name, suffix);
    }

    used.insert(candidate.clone());
    candidate
}

pub fn render_result_document(node: &ResultNode) -> String {
    let content = node
        .content
        .iter()
        .map(|item| format!("### Source: {}\n{}", item.source, item.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let sub_queries = node
        .sub_queries
        .iter()
        .map(|child| format!("- {}", child.query))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Research Results: {}\n\n## Content\n\n{}\n\n## Sub-queries\n\n{}\n",
        node.query, content, sub_queries
    )
}

pub fn render_summary_document(timestamp: &str, total: usize, summary: &str) -> String {
    format!(
        "# Research Summary\n\nGenerated on: {}\n\n## Overview\n- Total queries researched: {}\n\n## Queries\n{}\n",
        timestamp, total, summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::ContentItem;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemorySink {
        documents: RefCell<Vec<(String, String)>>,
        fail_on: Option<&'static str>,
    }

    impl DocumentSink for MemorySink {
        fn write_document(&self, name: &str, content: &str) -> Result<(), ReportError> {
            if self.fail_on == Some(name) {
                return Err(ReportError::Io(std::io::Error::other("disk full")));
            }
            self.documents
                .borrow_mut()
                .push((name.to_string(), content.to_string()));
            Ok(())
        }
    }

    fn node(query: &str, sources: &[(&str, &str)], children: &[&str]) -> ResultNode {
        ResultNode {
            query: query.to_string(),
            content: sources
                .iter()
                .map(|(s, c)| ContentItem::new(*s, *c))
                .collect(),
            sub_queries: children.iter().map(|c| ResultNode::terminal(*c)).collect(),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("what is <quantum> computing?"), "what_is_quantum_computing");
        assert_eq!(sanitize_filename("a/b\\c|d:e*f\"g"), "abcdefg");
        assert_eq!(sanitize_filename(&"x".repeat(80)).chars().count(), 50);
    }

    #[test]
    fn test_render_result_document() {
        let doc = render_result_document(&node(
            "qubits",
            &[("https://a.example", "alpha"), ("https://b.example", "beta")],
            &["what is a qubit"],
        ));

        assert_eq!(
            doc,
            "# Research Results: qubits\n\n## Content\n\n\
             ### Source: https://a.example\nalpha\n\n\
             ### Source: https://b.example\nbeta\n\n\
             ## Sub-queries\n\n- what is a qubit\n"
        );
    }

    #[test]
    fn test_write_run_documents() {
        let results = vec![
            node("deep one", &[("https://d.example", "d")], &[]),
            node("root query", &[("https://r.example", "r")], &["deep one"]),
        ];
        let writer = ReportWriter::new(MemorySink::default());

        let written = writer.write_run(&results, "## summary").unwrap();
        assert_eq!(written, 4);

        let docs = writer.sink().documents.borrow();
        let names: Vec<&str> = docs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["deep_one.md", "root_query.md", "summary.md", "results.json"]);

        let summary = &docs[2].1;
        assert!(summary.contains("Total queries researched: 2"));
        assert!(summary.contains("## summary"));

        let parsed: Vec<ResultNode> = serde_json::from_str(&docs[3].1).unwrap();
        assert_eq!(parsed, results);
    }

    #[test]
    fn test_duplicate_names_get_suffix() {
        let results = vec![
            node("same?", &[("https://a.example", "a")], &[]),
            node("same", &[("https://b.example", "b")], &[]),
        ];
        let writer = ReportWriter::new(MemorySink::default());
        writer.write_run(&results, "").unwrap();

        let docs = writer.sink().documents.borrow();
        assert_eq!(docs[0].0, "same.md");
        assert_eq!(docs[1].0, "same_2.md");
    }

    #[test]
    fn test_suffixed_names_never_collide() {
        let results = vec![
            node("a", &[("https://a.example", "first")], &[]),
            node("a", &[("https://b.example", "second")], &[]),
            node("a_2", &[("https://c.example", "third")], &[]),
            node("", &[("https://d.example", "fourth")], &[]),
        ];
        let writer = ReportWriter::new(MemorySink::default());
        writer.write_run(&results, "").unwrap();

        let docs = writer.sink().documents.borrow();
        let names: Vec<&str> = docs.iter().take(4).map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a.md", "a_2.md", "a_2_2.md", "query.md"]);
    }

    #[test]
    fn test_failed_node_document_is_skipped() {
        let results = vec![node("bad", &[("https://a.example", "a")], &[])];
        let writer = ReportWriter::new(MemorySink {
            fail_on: Some("bad.md"),
            ..Default::default()
        });

        assert_eq!(writer.write_run(&results, "").unwrap(), 2);
    }

    #[test]
    fn test_persist_run_to_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("research_results");
        let results = vec![node("disk test", &[("https://a.example", "a")], &[])];

        let dir = persist_run(&base, &results, "## disk test\n- a").unwrap();

        assert!(dir.file_name().unwrap().to_string_lossy().starts_with("research_results_"));
        assert!(dir.join("disk_test.md").exists());
        assert!(dir.join("summary.md").exists());
        assert!(dir.join("results.json").exists());
    }
}
