//! Incremental processing of the streamed chat response body.
//!
//! Bytes arrive from the transport in arbitrary pieces. [`decoder`] turns them
//! into text without splitting characters, and [`parser`] accumulates that text,
//! pulls the embedded directives out of it and keeps the displayable remainder.
pub mod decoder;
pub mod parser;

pub use decoder::Utf8ChunkDecoder;
pub use parser::{clean_display, ParseUpdate, StreamParser};
