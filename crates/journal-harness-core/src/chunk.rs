//! Overlapping word-window chunker.
//!
//! Splits entry text into fixed-size windows of whitespace-delimited
//! tokens. Consecutive windows share `overlap` tokens so a passage that
//! straddles a boundary is still retrievable from either side.
//!
//! # Algorithm
//!
//! 1. Split the text on Unicode whitespace.
//! 2. For every `i` in `0, step, 2 * step, ..` below the token count, where
//!    `step = window_size - overlap`, emit `tokens[i .. i + window_size]`
//!    joined by single spaces.
//! 3. Windows near the end are clipped, so the trailing ones may be shorter
//!    than `window_size` and lie inside their predecessor.
//!
//! The output is a pure function of its inputs, which makes reindexing
//! idempotent.
//!
//! # Example
//!
//! ```rust
//! use journal_harness_core::chunk::chunk_words;
//!
//! let windows = chunk_words("a b c d e f g", 4, 1).unwrap();
//! assert_eq!(windows, vec!["a b c d", "d e f g", "g"]);
//! ```

use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Window parameters used when turning entries into chunks.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChunkingParams {
    /// Tokens per window.
    pub window_size: usize,
    /// Tokens shared between consecutive windows. Must be `< window_size`.
    pub overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            window_size: 512,
            overlap: 50,
        }
    }
}

impl ChunkingParams {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.overlap >= self.window_size {
            return Err(EngineError::InvalidChunking {
                window_size: self.window_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        chunk_words(text, self.window_size, self.overlap)
    }
}

/// Split `text` into overlapping windows of `window_size` tokens.
///
/// Empty or whitespace-only text yields an empty vector. Fails only when
/// `overlap >= window_size` (which includes `window_size == 0`).
pub fn chunk_words(text: &str, window_size: usize, overlap: usize) -> Result<Vec<String>> {
    ChunkingParams {
        window_size,
        overlap,
    }
    .validate()?;

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let step = window_size - overlap;
    let windows = (0..tokens.len())
        .step_by(step)
        .map(|start| {
            let end = (start + window_size).min(tokens.len());
            tokens[start..end].join(" ")
        })
        .collect();

    Ok(windows)
}

/// Rebuild the token stream from windows produced by [`chunk_words`] with
/// the same parameters.
///
/// Window `i` starts at token `i * (window_size - overlap)`; only the tokens
/// past what earlier windows already supplied are appended.
pub fn reassemble(windows: &[String], window_size: usize, overlap: usize) -> Vec<String> {
    let step = window_size.saturating_sub(overlap).max(1);
    let mut tokens: Vec<String> = Vec::new();
    for (i, window) in windows.iter().enumerate() {
        let seen = tokens.len().saturating_sub(i * step);
        tokens.extend(window.split_whitespace().skip(seen).map(str::to_string));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_words("", 5, 2).unwrap().is_empty());
        assert!(chunk_words("   \n\t ", 5, 2).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_window() {
        let chunks = chunk_words("I felt great today", 512, 50).unwrap();
        assert_eq!(chunks, vec!["I felt great today"]);
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = chunk_words(&words(10), 5, 2).unwrap();
        assert_eq!(
            chunks,
            vec!["w0 w1 w2 w3 w4", "w3 w4 w5 w6 w7", "w6 w7 w8 w9", "w9"]
        );
    }

    #[test]
    fn test_exact_fit_still_emits_tail_window() {
        let chunks = chunk_words(&words(8), 5, 2).unwrap();
        assert_eq!(chunks, vec!["w0 w1 w2 w3 w4", "w3 w4 w5 w6 w7", "w6 w7"]);
    }

    #[test]
    fn test_one_start_per_step_below_token_count() {
        // Starts 0 and 462 for 500 tokens.
        let chunks = chunk_words(&words(500), 512, 50).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 500);
        assert!(chunks[1].starts_with("w462 "));
        assert!(chunks[1].ends_with(" w499"));

        let chunks = chunk_words(&words(100), 10, 3).unwrap();
        assert_eq!(chunks.len(), 15);
        assert_eq!(chunks[14], "w98 w99");
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = chunk_words(&words(6), 3, 0).unwrap();
        assert_eq!(chunks, vec!["w0 w1 w2", "w3 w4 w5"]);
    }

    #[test]
    fn test_normalizes_whitespace() {
        let chunks = chunk_words("one\n\ntwo\tthree   four", 10, 1).unwrap();
        assert_eq!(chunks, vec!["one two three four"]);
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            chunk_words("a b c", 3, 3),
            Err(EngineError::InvalidChunking { .. })
        ));
        assert!(matches!(
            chunk_words("a b c", 0, 0),
            Err(EngineError::InvalidChunking { .. })
        ));
        assert!(matches!(
            chunk_words("", 2, 5),
            Err(EngineError::InvalidChunking { .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let text = words(1234);
        let a = chunk_words(&text, 512, 50).unwrap();
        let b = chunk_words(&text, 512, 50).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reassemble_reconstructs_tokens() {
        for (n, window, overlap) in [(1, 4, 1), (7, 3, 2), (100, 10, 3), (513, 512, 50), (49, 7, 0), (3, 4, 2), (8, 5, 2)] {
            let text = words(n);
            let windows = chunk_words(&text, window, overlap).unwrap();
            let expected: Vec<String> = text.split_whitespace().map(str::to_string).collect();
            assert_eq!(
                reassemble(&windows, window, overlap),
                expected,
                "n={} window={} overlap={}",
                n,
                window,
                overlap
            );
        }
    }

    #[test]
    fn test_every_window_within_size() {
        let windows = chunk_words(&words(300), 64, 16).unwrap();
        for w in &windows {
            assert!(w.split_whitespace().count() <= 64);
        }
    }
}
