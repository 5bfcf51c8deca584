//! Recursive text chunking with bounded size and character overlap.

/// Splits raw text into overlapping, bounded-size chunks.
///
/// Separators are tried in order — paragraph break, line break, sentence
/// boundary, word boundary, single character — and a separator is only used
/// where the coarser ones leave pieces that are still too large. Separators
/// stay attached to the piece they terminate, so concatenating the pieces
/// reproduces the input. Lengths are counted in characters, never bytes.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size),
            separators: ["\n\n", "\n", ". ", " ", ""]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Split `text` into ordered, non-empty chunks.
    ///
    /// Deterministic: the same text and configuration always produce the
    /// same sequence. Whitespace-only input yields nothing.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(separators, text);
        let pieces = split_keeping_separator(text, separator);

        let mut chunks = Vec::new();
        let mut mergeable: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) <= self.chunk_size {
                mergeable.push(piece);
            } else {
                if !mergeable.is_empty() {
                    self.merge_into(&mergeable, &mut chunks);
                    mergeable.clear();
                }
                if remaining.is_empty() {
                    // No finer separator left; the oversized piece stands.
                    chunks.push(piece);
                } else {
                    chunks.extend(self.split_with(&piece, remaining));
                }
            }
        }
        if !mergeable.is_empty() {
            self.merge_into(&mergeable, &mut chunks);
        }
        chunks
    }

    /// Accumulate pieces into chunks up to `chunk_size`, keeping a tail of at
    /// most `chunk_overlap` characters as the start of the next chunk.
    fn merge_into(&self, pieces: &[String], chunks: &mut Vec<String>) {
        let mut window: std::collections::VecDeque<&String> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }
        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join_trimmed(parts: &std::collections::VecDeque<&String>) -> Option<String> {
    let joined: String = parts.iter().map(|s| s.as_str()).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// First separator that occurs in `text`; the empty separator matches
/// everything and splits into single characters.
fn pick_separator<'a>(separators: &'a [String], text: &str) -> (&'a str, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep.as_str()) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(separator) {
        let end = pos + separator.len();
        pieces.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}
