//! Preview pipeline components.
//!
//! - **decode**: Best-effort text decoding of a file prefix
//! - **lexer**: Filename -> grammar resolution with an LRU memo
//! - **glyph**: Glyph rasterization (custom font or built-in bitmap font)
//! - **thumbnail**: Highlight, crop, resize and PNG-encode
//! - **processor**: Runs one file through the full pipeline
//! - **queue**: Unbounded work queue and fixed-size worker pool

pub mod decode;
pub mod glyph;
pub mod lexer;
pub mod processor;
pub mod queue;
pub mod thumbnail;

// Re-exports for convenient access
pub use decode::{decode_preview, DecodedText, TextEncoding};
pub use lexer::{Lexer, LexerResolver};
pub use processor::{FileProcessor, ProcessReport};
pub use queue::{
    work_queue, PoolStats, StatsSnapshot, WorkHandler, WorkItem, WorkQueue, WorkReceiver,
    WorkState, WorkerPool,
};
pub use thumbnail::{RenderedThumbnail, ThumbnailRenderer};
