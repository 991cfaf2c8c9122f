pub mod chunker;
pub mod pdf;

pub use chunker::RecursiveCharacterSplitter;
pub use pdf::{PdfTextExtractor, PlainTextExtractor, TextExtractor};
