pub mod library;
pub mod source;
pub mod top_k;
pub mod walk;

pub use library::LibraryIndexer;
pub use source::{ScanOptions, SourceScanner};
pub use top_k::{TopKFileTracker, TOP_K};
