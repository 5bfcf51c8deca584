//! Context assembly and source citations.

use serde::Serialize;

use lorebase_knowledge::SearchHit;

const CONTEXT_DELIMITER: &str = "\n\n---\n\n";
const EXCERPT_CHARS: usize = 150;

/// Told to the model explicitly, instead of handing it an empty context.
const EMPTY_BASE_SENTINEL: &str = "No information found in the knowledge base.";

/// One entry of the deduplicated citation list shown alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCitation {
    pub name: String,
    pub score: f32,
    pub excerpt: String,
}

/// Coarse relevance bucket for a similarity score.
fn relevance_label(score: f32) -> &'static str {
    if score > 0.8 {
        "HIGH"
    } else if score > 0.6 {
        "MEDIUM"
    } else {
        "LOW"
    }
}

/// Build the context blob handed to the model: numbered entries with their
/// source and a relevance label, separated by a fixed delimiter.
pub fn build_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return EMPTY_BASE_SENTINEL.to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] Source: {} (relevance: {})\n{}",
                i + 1,
                hit.source,
                relevance_label(hit.score),
                hit.content
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

/// Extract the citation list: one entry per distinct source, first
/// occurrence wins, with a short excerpt for display.
pub fn extract_sources(hits: &[SearchHit]) -> Vec<SourceCitation> {
    let mut citations = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for hit in hits {
        if !seen.insert(hit.source.clone()) {
            continue;
        }
        citations.push(SourceCitation {
            name: hit.source.clone(),
            score: hit.score,
            excerpt: excerpt_of(&hit.content),
        });
    }
    citations
}

/// First ~150 characters, cut at a character boundary, ellipsis-truncated.
fn excerpt_of(content: &str) -> String {
    if content.chars().count() <= EXCERPT_CHARS {
        content.to_string()
    } else {
        let mut excerpt: String = content.chars().take(EXCERPT_CHARS).collect();
        excerpt.push_str("...");
        excerpt
    }
}
