//! Decoders for the Android compiled resource formats: the resource table
//! (`resources.arsc`) and compiled binary XML documents.
//!
//! Everything here operates on fully-buffered byte slices. Malformed chunks
//! degrade to [`chunk::Chunk::Unknown`] rather than aborting the decode;
//! missing lookups yield empty-string sentinels.

pub mod chunk;
pub mod cursor;
pub mod string_pool;
pub mod table;
pub mod value;
pub mod xml;

use std::fmt;

pub use chunk::{Chunk, ChunkHeader};
pub use string_pool::StringPoolChunk;
pub use table::ResourceTableChunk;
pub use value::ResourceValue;
pub use xml::{AttributeId, XmlChunk, XmlStartElementChunk, XmlTree};

/// Result alias for resource/binary-XML decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors surfaced by the chunk decoders.
///
/// Only top-level problems become errors: a buffer that is not a resource
/// table at all, or not a binary XML document. Anything below that level is
/// clamped into an `Unknown` chunk and decoding continues.
#[derive(Debug)]
pub enum DecodeError {
    /// The buffer ended before a fixed-size read could complete.
    Truncated(String),
    /// The document is structurally not what the caller asked for.
    Malformed(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated(msg) => write!(f, "Truncated input: {msg}"),
            DecodeError::Malformed(msg) => write!(f, "Malformed document: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}
