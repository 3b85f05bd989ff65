//! Size limits for tickets and their projections.
//!
//! The metadata table caps item size, so the projection carries bounded
//! copies of free-text fields. The full text always lives in the blob.

/// Embedding dimensionality produced by every enrichment gateway.
pub const EMBEDDING_DIM: usize = 384;

/// Maximum raw ticket document size in bytes (1MB).
pub const MAX_RAW_TICKET_BYTES: usize = 1024 * 1024;

/// Maximum subject length (chars) copied into the projection.
pub const MAX_PROJECTION_SUBJECT_CHARS: usize = 1024;

/// Maximum summary length (chars) copied into the projection.
pub const MAX_PROJECTION_SUMMARY_CHARS: usize = 2048;

/// Bounds accepted for `max_summary_length` (words).
pub const MIN_SUMMARY_WORDS: usize = 5;
pub const MAX_SUMMARY_WORDS: usize = 500;

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
