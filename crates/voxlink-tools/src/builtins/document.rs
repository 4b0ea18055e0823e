use crate::args::ToolArgs;
use crate::context::ToolContext;
use crate::router::{AgentKind, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use voxlink_core::{VoxlinkError, VoxlinkResult};

/// Rows scoring at or below this similarity are not considered matches.
const MIN_SIMILARITY: f64 = 0.1;
/// How many matching rows come back.
const TOP_RESULTS: usize = 3;

/// Semantic lookup over the loaded tabular document: bag-of-words
/// vectors per row, ranked by cosine similarity against the query.
pub struct QueryDocumentTool {
    descriptor: ToolDescriptor,
}

impl QueryDocumentTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "query_document".to_string(),
                agent: AgentKind::Analyst,
                description: "Answer a question from the currently loaded document.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The question to answer from the document"
                        }
                    },
                    "required": ["query"]
                }),
            },
        }
    }
}

impl Default for QueryDocumentTool {
    fn default() -> Self {
        Self::new()
    }
}

fn term_counts(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *counts.entry(token.to_string()).or_insert(0.0) += 1.0;
    }
    counts
}

fn cosine_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let keys: HashSet<&String> = a.keys().chain(b.keys()).collect();
    let dot: f64 = keys
        .iter()
        .map(|k| a.get(*k).unwrap_or(&0.0) * b.get(*k).unwrap_or(&0.0))
        .sum();
    let mag_a: f64 = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let mag_b: f64 = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl ToolHandler for QueryDocumentTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn run(&self, args: ToolArgs, ctx: &ToolContext) -> VoxlinkResult<String> {
        let ToolArgs::QueryDocument { query } = args else {
            return Err(VoxlinkError::Tool("expected query_document arguments".into()));
        };
        let Some(document) = &ctx.document else {
            return Ok("No document is loaded. Please upload a document first.".to_string());
        };
        debug!(query = %query, rows = document.rows.len(), "document query");

        let query_vector = term_counts(&query);
        let mut scored: Vec<(&Vec<String>, f64)> = document
            .rows
            .iter()
            .map(|row| {
                let row_vector = term_counts(&row.join(" "));
                (row, cosine_similarity(&query_vector, &row_vector))
            })
            .filter(|(_, score)| *score > MIN_SIMILARITY)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        if scored.is_empty() {
            return Ok(
                "I could not find any information matching that query in the document."
                    .to_string(),
            );
        }

        let top = scored
            .iter()
            .take(TOP_RESULTS)
            .map(|(row, _)| {
                document
                    .headers
                    .iter()
                    .zip(row.iter())
                    .map(|(header, cell)| format!("{header}: {cell}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        Ok(format!(
            "Based on your query, here are the most relevant results from the document:\n{top}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxlink_core::DocumentData;

    fn context_with_document() -> ToolContext {
        let mut ctx = ToolContext::default();
        ctx.document = Some(DocumentData {
            headers: vec!["Name".into(), "Role".into()],
            rows: vec![
                vec!["Ada".into(), "compiler engineer".into()],
                vec!["Grace".into(), "systems architect".into()],
                vec!["Linus".into(), "kernel maintainer".into()],
            ],
        });
        ctx
    }

    #[tokio::test]
    async fn matching_rows_come_back_labelled_by_header() {
        let tool = QueryDocumentTool::new();
        let result = tool
            .run(
                ToolArgs::QueryDocument {
                    query: "who is the kernel maintainer".into(),
                },
                &context_with_document(),
            )
            .await
            .unwrap();
        assert!(result.contains("Name: Linus"));
        assert!(result.contains("Role: kernel maintainer"));
    }

    #[tokio::test]
    async fn unrelated_query_reports_no_match() {
        let tool = QueryDocumentTool::new();
        let result = tool
            .run(
                ToolArgs::QueryDocument {
                    query: "quarterly beet harvest".into(),
                },
                &context_with_document(),
            )
            .await
            .unwrap();
        assert!(result.contains("could not find"));
    }

    #[tokio::test]
    async fn missing_document_is_a_friendly_answer_not_an_error() {
        let tool = QueryDocumentTool::new();
        let result = tool
            .run(
                ToolArgs::QueryDocument {
                    query: "anything".into(),
                },
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert!(result.contains("No document is loaded"));
    }

    #[test]
    fn cosine_similarity_basics() {
        let a = term_counts("red blue red");
        let b = term_counts("red blue red");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);

        let c = term_counts("green yellow");
        assert_eq!(cosine_similarity(&a, &c), 0.0);

        let empty = term_counts("");
        assert_eq!(cosine_similarity(&a, &empty), 0.0);
    }
}
