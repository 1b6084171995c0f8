//! PDF page extraction and word-window chunking

mod chunker;
mod parser;

pub use chunker::{WordChunker, MIN_CHUNK_CHARS};
pub use parser::{document_name, PageText, PdfParser};
