//! Word-window chunking with page tracking

use crate::error::{Error, Result};
use crate::types::Chunk;

use super::parser::PageText;

/// Rendered chunks of this many characters or fewer are dropped
pub const MIN_CHUNK_CHARS: usize = 20;

/// Splits pages into overlapping windows of words
#[derive(Debug, Clone)]
pub struct WordChunker {
    /// Words per chunk
    chunk_size: usize,
    /// Words repeated between consecutive chunks
    overlap: usize,
}

impl WordChunker {
    /// Create a chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunk_size must be at least one word".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Words the window advances by
    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Chunk every page of a document, in page order
    pub fn chunk_pages(&self, document: &str, pages: &[PageText]) -> Vec<Chunk> {
        pages
            .iter()
            .flat_map(|page| self.chunk_page(document, page))
            .collect()
    }

    /// Chunk a single page
    pub fn chunk_page(&self, document: &str, page: &PageText) -> Vec<Chunk> {
        let words: Vec<&str> = page.text.split_whitespace().collect();

        self.windows(words.len())
            .into_iter()
            .map(|(start, end)| format!("{}: {}", document, words[start..end].join(" ")))
            .filter(|text| text.chars().count() > MIN_CHUNK_CHARS)
            .map(|text| Chunk {
                text,
                page: page.number,
                document: document.to_string(),
            })
            .collect()
    }

    /// Window bounds over `len` words; stops at the window reaching the end
    fn windows(&self, len: usize) -> Vec<(usize, usize)> {
        let mut bounds = Vec::new();
        let mut start = 0;

        while start < len {
            let end = (start + self.chunk_size).min(len);
            bounds.push((start, end));
            if end == len {
                break;
            }
            start += self.step();
        }

        bounds
    }
}

impl Default for WordChunker {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            overlap: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("paragraphword{:04}", i)).collect::<Vec<_>>().join(" ")
    }

    fn body(chunk: &Chunk) -> Vec<String> {
        let prefix = format!("{}: ", chunk.document);
        chunk.text[prefix.len()..]
            .split(' ')
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_rejects_non_advancing_window() {
        assert!(matches!(
            WordChunker::new(50, 50),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            WordChunker::new(10, 60),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(WordChunker::new(0, 0).is_err());
        assert!(WordChunker::new(51, 50).is_ok());
    }

    #[test]
    fn test_short_pages_give_one_chunk_each() {
        let chunker = WordChunker::new(256, 50).unwrap();
        let pages: Vec<PageText> = (1..=3).map(|n| PageText::new(n, words(40))).collect();

        let chunks = chunker.chunk_pages("handbook", &pages);

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.page, i as u32 + 1);
            assert_eq!(chunk.document, "handbook");
            assert!(chunk.text.starts_with("handbook: paragraphword0000"));
            assert_eq!(body(chunk).len(), 40);
        }
    }

    #[test]
    fn test_window_reaching_end_is_last() {
        let chunker = WordChunker::new(256, 50).unwrap();
        // 256 words fit in exactly one window; no tail made only of overlap
        let chunks = chunker.chunk_page("doc", &PageText::new(1, words(256)));
        assert_eq!(chunks.len(), 1);

        let chunks = chunker.chunk_page("doc", &PageText::new(1, words(257)));
        assert_eq!(chunks.len(), 2);
        assert_eq!(body(&chunks[1]).len(), 51);
    }

    #[test]
    fn test_tiny_fragments_dropped() {
        let chunker = WordChunker::new(256, 50).unwrap();
        // "a: tiny" is far below the threshold
        assert!(chunker.chunk_page("a", &PageText::new(1, "tiny")).is_empty());
        // Exactly 20 characters is still dropped
        let text = "x".repeat(MIN_CHUNK_CHARS - 3);
        assert_eq!(format!("a: {}", text).chars().count(), MIN_CHUNK_CHARS);
        assert!(chunker.chunk_page("a", &PageText::new(1, text)).is_empty());
        // One more character is kept
        let text = "x".repeat(MIN_CHUNK_CHARS - 2);
        assert_eq!(chunker.chunk_page("a", &PageText::new(1, text)).len(), 1);
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let chunker = WordChunker::default();
        assert!(chunker.chunk_page("doc", &PageText::new(4, "  \n\t ")).is_empty());
    }

    proptest! {
        #[test]
        fn prop_chunk_count_and_overlap(
            len in 1usize..600,
            chunk_size in 2usize..80,
            overlap_seed in 0usize..80,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunker = WordChunker::new(chunk_size, overlap).unwrap();
            let chunks = chunker.chunk_page("doc", &PageText::new(1, words(len)));

            let step = chunk_size - overlap;
            let expected = std::cmp::max(1, (len.saturating_sub(overlap) + step - 1) / step);
            prop_assert_eq!(chunks.len(), expected);

            for pair in chunks.windows(2) {
                let prev = body(&pair[0]);
                let next = body(&pair[1]);
                prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
            }

            for chunk in &chunks {
                prop_assert!(chunk.text.chars().count() > MIN_CHUNK_CHARS);
            }
        }
    }
}
