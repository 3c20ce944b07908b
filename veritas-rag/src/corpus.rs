//! Loading fact-check articles from JSON Lines.
//!
//! Each non-blank line is one JSON object:
//!
//! ```json
//! {"id": "pf-1021", "claim": "...", "url": "https://...", "rating": "False", "text": "..."}
//! ```
//!
//! `text` (or `article`) is required. `id` may be a string or number and
//! defaults to `doc-{line}`. Every other string, number, or bool field is
//! kept as metadata; `url` also becomes the document's `source_uri`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::document::{Document, URL_KEY};
use crate::error::{RagError, Result};

const TEXT_FIELDS: [&str; 2] = ["text", "article"];

/// Read a JSON Lines corpus from disk.
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let documents = parse_jsonl(&content)?;
    info!(path = %path.display(), document_count = documents.len(), "loaded corpus");
    Ok(documents)
}

/// Parse JSON Lines content into documents.
pub fn parse_jsonl(content: &str) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| RagError::CorpusError { line: line_no, message: e.to_string() })?;
        let Value::Object(record) = value else {
            return Err(RagError::CorpusError {
                line: line_no,
                message: "record must be a JSON object".to_string(),
            });
        };
        documents.push(record_to_document(record, line_no)?);
    }
    Ok(documents)
}

fn record_to_document(mut record: Map<String, Value>, line: usize) -> Result<Document> {
    let text = match TEXT_FIELDS.iter().find_map(|field| record.remove(*field)) {
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(RagError::CorpusError {
                line,
                message: "field 'text' must be a string".to_string(),
            });
        }
        None => {
            return Err(RagError::CorpusError {
                line,
                message: "missing required field 'text'".to_string(),
            });
        }
    };

    let id = record.remove("id").as_ref().and_then(scalar_to_string);
    let metadata: HashMap<String, String> = record
        .into_iter()
        .filter_map(|(key, value)| scalar_to_string(&value).map(|v| (key, v)))
        .collect();
    let source_uri = metadata.get(URL_KEY).filter(|u| !u.is_empty()).cloned();

    Ok(Document { id: id.unwrap_or_else(|| format!("doc-{line}")), text, metadata, source_uri })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_metadata() {
        let content = r#"
{"id": 7, "claim": "Bats are blind", "url": "https://example.org/bats", "text": "Bats can see."}

{"article": "Second article.", "rating": "False", "tags": ["x"]}
"#;
        let docs = parse_jsonl(content).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "7");
        assert_eq!(docs[0].text, "Bats can see.");
        assert_eq!(docs[0].metadata.get("claim").map(String::as_str), Some("Bats are blind"));
        assert_eq!(docs[0].source_uri.as_deref(), Some("https://example.org/bats"));
        assert_eq!(docs[1].id, "doc-4");
        assert_eq!(docs[1].metadata.get("rating").map(String::as_str), Some("False"));
        assert!(!docs[1].metadata.contains_key("tags"));
    }

    #[test]
    fn reports_line_of_bad_record() {
        let err = parse_jsonl("{\"text\": \"ok\"}\n{\"claim\": \"no text\"}\n").unwrap_err();
        assert!(matches!(err, RagError::CorpusError { line: 2, .. }));

        let err = parse_jsonl("[1, 2]").unwrap_err();
        assert!(matches!(err, RagError::CorpusError { line: 1, .. }));
    }

    #[test]
    fn empty_content_is_empty_corpus() {
        assert!(parse_jsonl("\n  \n").unwrap().is_empty());
    }
}
