//! # apkscan
//!
//! A library for static analysis of Android APK files: it decodes the
//! compiled resource table (`resources.arsc`) and the binary XML manifest,
//! and computes structural metrics over dex bytecode (opcode and framework
//! reference histograms, interprocedural cyclomatic complexity, byte
//! entropy). Nothing is executed; everything is read from the bytes.
//!
//! # Examples
//!
//! ```no_run
//! use apkscan::ApkFile;
//!
//! let apk = ApkFile::from_path("app.apk").unwrap();
//! if let Ok(manifest) = apk.manifest() {
//!     println!("package: {}", manifest.package_name);
//! }
//! ```

use log::warn;

pub mod analysis;
pub mod apk;
pub mod dex;
pub mod manifest;
pub mod res;
mod tests;

pub use analysis::{analyze_units, entropy_of, BytecodeUnit, ComplexityEngine};
pub use apk::ApkFile;
pub use res::{DecodeResult, ResourceTableChunk, XmlTree};

use res::chunk::{self, Chunk, RES_TABLE_TYPE, RES_XML_TYPE};
use res::cursor::ByteCursor;
use res::DecodeError;

/// Decodes a `resources.arsc` blob into a resource table.
pub fn decode_resource_table(bytes: &[u8]) -> DecodeResult<ResourceTableChunk> {
    match decode_root_chunk(bytes, RES_TABLE_TYPE)? {
        Chunk::Table(table) => Ok(table),
        chunk => Err(DecodeError::Malformed(format!(
            "expected a resource table, found chunk type 0x{:04x}",
            chunk.type_tag()
        ))),
    }
}

/// Decodes a compiled binary XML document. When a resource table is given,
/// reference-typed attribute values render through it.
pub fn decode_binary_xml<'a>(
    bytes: &[u8],
    table: Option<&'a ResourceTableChunk>,
) -> DecodeResult<XmlTree<'a>> {
    match decode_root_chunk(bytes, RES_XML_TYPE)? {
        Chunk::Xml(document) => Ok(XmlTree::new(document, table)),
        chunk => Err(DecodeError::Malformed(format!(
            "expected an XML document, found chunk type 0x{:04x}",
            chunk.type_tag()
        ))),
    }
}

/// Phase 1 over named code-unit blobs: parses each dex container and
/// records its declared classes. An unreadable unit is logged and skipped
/// so its siblings still index; the skip count comes back alongside.
pub fn index_units<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> (Vec<BytecodeUnit>, u32) {
    let mut units = Vec::new();
    let mut failed = 0;
    for (name, bytes) in entries {
        match BytecodeUnit::index(name, bytes) {
            Ok(unit) => units.push(unit),
            Err(err) => {
                warn!("Failed to read dex unit {name}: {err}; skipping");
                failed += 1;
            }
        }
    }
    (units, failed)
}

fn decode_root_chunk(bytes: &[u8], expected_tag: u16) -> DecodeResult<Chunk> {
    let mut cursor = ByteCursor::new(bytes);
    let decoded = chunk::decode_chunk(&mut cursor, bytes.len())
        .ok_or_else(|| DecodeError::Truncated("document is empty".to_string()))?;
    if decoded.type_tag() != expected_tag {
        warn!(
            "root chunk has type 0x{:04x}, expected 0x{expected_tag:04x}",
            decoded.type_tag()
        );
    }
    Ok(decoded)
}
