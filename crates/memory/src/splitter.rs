//! Fixed-window character splitter for knowledge-base ingestion.

use intellicore_core::error::IndexError;
use intellicore_core::knowledge::Document;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Split a document into overlapping windows of `chunk_size` characters.
///
/// Consecutive chunks share `chunk_overlap` characters. Each chunk inherits
/// the document's metadata plus a 1-based `chunk_number`. A document that
/// already fits in one chunk is returned unchanged.
///
/// Sizes count Unicode scalar values, not bytes.
pub fn split_text(
    document: &Document,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Document>, IndexError> {
    if chunk_size == 0 || chunk_overlap >= chunk_size {
        return Err(IndexError::InvalidChunking(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    let chars: Vec<char> = document.content.chars().collect();
    if chars.len() <= chunk_size {
        return Ok(vec![document.clone()]);
    }

    let step = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        let text: String = chars[start..end].iter().collect();

        let mut chunk = Document::new(text);
        chunk.metadata = document.metadata.clone();
        chunk
            .metadata
            .insert("chunk_number".into(), (chunks.len() + 1).to_string());
        chunks.push(chunk);

        if end >= chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Document {
        let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        Document::new(text).with_metadata("source", "test_document.txt")
    }

    #[test]
    fn short_text_is_returned_whole() {
        let doc = sample(500);
        let chunks = split_text(&doc, 1000, 200).unwrap();
        assert_eq!(chunks, vec![doc]);
    }

    #[test]
    fn chunks_overlap_by_configured_amount() {
        let doc = sample(2500);
        let chunks = split_text(&doc, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP).unwrap();

        // starts at 0, 800, 1600; the third window reaches the end
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content.chars().count(), 1000);
        assert_eq!(chunks[2].content.chars().count(), 900);

        let tail: String = chunks[0].content.chars().skip(800).collect();
        let head: String = chunks[1].content.chars().take(200).collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn chunks_carry_source_and_number() {
        let chunks = split_text(&sample(1200), 500, 50).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.source(), Some("test_document.txt"));
            assert_eq!(chunk.metadata["chunk_number"], (i + 1).to_string());
        }
    }

    #[test]
    fn multibyte_text_splits_on_characters() {
        let doc = Document::new("é".repeat(15));
        let chunks = split_text(&doc, 10, 5).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "é".repeat(10));
        assert_eq!(chunks[1].content, "é".repeat(10));
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(matches!(
            split_text(&sample(10), 5, 5),
            Err(IndexError::InvalidChunking(_))
        ));
        assert!(split_text(&sample(10), 0, 0).is_err());
    }
}
