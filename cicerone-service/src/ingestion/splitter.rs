//! Separator-based text splitter.
//!
//! Text is cut on a separator and the pieces are greedily merged back into
//! chunks of at most `chunk_size` characters. When a chunk is emitted, its
//! trailing pieces (up to `chunk_overlap` characters) are carried into the next
//! one so neighbouring chunks share context.

use std::collections::VecDeque;
use tracing::warn;

/// Splits text into overlapping, separator-aligned chunks
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separator: impl Into<String>) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separator: separator.into(),
        }
    }

    /// Split text into chunks. Chunks are trimmed; empty chunks are dropped.
    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(self.separator.as_str()).collect()
        };

        self.merge(&pieces)
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let separator_len = char_len(&self.separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len + current.len() * separator_len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        length = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = self.join(&current) {
                        chunks.push(chunk);
                    }

                    // Drop leading pieces until what remains fits as overlap
                    // and leaves room for the incoming piece.
                    while total > self.chunk_overlap
                        || (total + len + current.len() * separator_len > self.chunk_size
                            && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(chunk) = self.join(&current) {
            chunks.push(chunk);
        }

        chunks
    }

    fn join(&self, pieces: &VecDeque<&str>) -> Option<String> {
        let joined = pieces
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::new(1000, 200, "\n\n");
        let chunks = splitter.split("  Mangalore is a port city.\n\nIt lies on the coast.  ");
        assert_eq!(
            chunks,
            vec!["Mangalore is a port city.\n\nIt lies on the coast.".to_string()]
        );
    }

    #[test]
    fn test_merge_without_overlap() {
        let splitter = TextSplitter::new(10, 0, " ");
        assert_eq!(splitter.split("aaa bbb ccc ddd"), vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_merge_with_overlap() {
        let splitter = TextSplitter::new(10, 4, " ");
        assert_eq!(
            splitter.split("aaa bbb ccc ddd"),
            vec!["aaa bbb", "bbb ccc", "ccc ddd"]
        );
    }

    #[test]
    fn test_oversized_piece_is_kept_whole() {
        let splitter = TextSplitter::new(5, 0, " ");
        assert_eq!(splitter.split("abcdefghij xy"), vec!["abcdefghij", "xy"]);
    }

    #[test]
    fn test_empty_separator_splits_characters() {
        let splitter = TextSplitter::new(4, 0, "");
        assert_eq!(splitter.split("abcdef"), vec!["abcd", "ef"]);
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        // Each Kannada letter is three bytes in UTF-8
        let splitter = TextSplitter::new(3, 0, " ");
        assert_eq!(splitter.split("ಮ ಂ ಗ"), vec!["ಮ ಂ", "ಗ"]);
    }

    #[test]
    fn test_blank_input_produces_nothing() {
        let splitter = TextSplitter::new(10, 2, "\n\n");
        assert!(splitter.split("   \n\n  \n\n").is_empty());
    }
}
