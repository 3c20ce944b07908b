//! Generation context assembled from ranked results.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::document::SearchResult;

/// Separator placed between chunk texts in [`RetrievedContext::text`].
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// What the answer generator receives from retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievedContext {
    /// Chunk texts in rank order joined by [`CONTEXT_SEPARATOR`].
    pub text: String,
    /// Source URLs of the ranked chunks, deduplicated, in first-seen order.
    pub sources: Vec<String>,
}

impl RetrievedContext {
    /// Build the context for a ranked result list.
    pub fn from_results(results: &[SearchResult]) -> Self {
        let text = results
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let mut seen = HashSet::new();
        let sources = results
            .iter()
            .filter_map(|r| r.chunk.source_url())
            .filter(|url| seen.insert(*url))
            .map(str::to_string)
            .collect();

        Self { text, sources }
    }

    /// Whether retrieval produced nothing to ground an answer on.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::{Chunk, URL_KEY};

    fn result(text: &str, url: Option<&str>, score: f32) -> SearchResult {
        let mut metadata = HashMap::new();
        if let Some(url) = url {
            metadata.insert(URL_KEY.to_string(), url.to_string());
        }
        let chunk = Chunk {
            id: text.to_string(),
            document_id: "d".to_string(),
            text: text.to_string(),
            metadata,
            sequence_index: 0,
            span: 0..text.len(),
            oversized: false,
        };
        SearchResult { chunk, score }
    }

    #[test]
    fn sources_keep_first_seen_order() {
        let results = vec![
            result("one", Some("https://b.example"), 0.9),
            result("two", Some("https://a.example"), 0.8),
            result("three", None, 0.7),
            result("four", Some("https://b.example"), 0.6),
        ];
        let context = RetrievedContext::from_results(&results);
        assert_eq!(context.text, "one\n\ntwo\n\nthree\n\nfour");
        assert_eq!(context.sources, vec!["https://b.example", "https://a.example"]);
    }

    #[test]
    fn no_results_is_empty_context() {
        let context = RetrievedContext::from_results(&[]);
        assert!(context.is_empty());
        assert!(context.sources.is_empty());
    }
}
