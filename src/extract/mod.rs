//! Metadata extraction from share-page markup.

mod filename;

pub use filename::{FilenameExtractor, extract_filename, sanitize_filename};
