use crate::res::cursor::ByteCursor;
use crate::res::string_pool::StringPoolChunk;
use crate::res::table::{PackageChunk, ResourceTableChunk, TypeChunk, TypeSpecChunk};
use crate::res::xml::{XmlChunk, XmlEndElementChunk, XmlResourceMapChunk, XmlStartElementChunk};
use crate::res::DecodeResult;
use log::warn;

pub const RES_NULL_TYPE: u16 = 0x0000;
pub const RES_STRING_POOL_TYPE: u16 = 0x0001;
pub const RES_TABLE_TYPE: u16 = 0x0002;
pub const RES_XML_TYPE: u16 = 0x0003;
pub const RES_XML_START_NAMESPACE_TYPE: u16 = 0x0100;
pub const RES_XML_END_NAMESPACE_TYPE: u16 = 0x0101;
pub const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
pub const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;
pub const RES_XML_CDATA_TYPE: u16 = 0x0104;
pub const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;
pub const RES_TABLE_PACKAGE_TYPE: u16 = 0x0200;
pub const RES_TABLE_TYPE_TYPE: u16 = 0x0201;
pub const RES_TABLE_TYPE_SPEC_TYPE: u16 = 0x0202;

/// The fixed header every chunk starts with: `type:u16 LE, headerSize:u16 LE,
/// chunkSize:u32 LE`. `start` is the absolute offset of the chunk in the
/// document, kept so decoders can compute payload positions from the
/// header-relative offsets the formats use.
#[derive(Clone, Copy, Debug)]
pub struct ChunkHeader {
    pub type_tag: u16,
    pub header_size: u16,
    pub chunk_size: u32,
    pub start: usize,
}

impl ChunkHeader {
    /// Absolute offset one past the last byte of this chunk.
    pub fn end(&self) -> usize {
        self.start + self.chunk_size as usize
    }

    /// Absolute offset of the first byte after the type-specific header.
    pub fn payload_start(&self) -> usize {
        self.start + self.header_size as usize
    }
}

/// A decoded chunk. The set of variants is closed; anything the decoder does
/// not understand, or cannot decode cleanly, becomes [`Chunk::Unknown`].
#[derive(Debug)]
pub enum Chunk {
    Unknown(UnknownChunk),
    StringPool(StringPoolChunk),
    Table(ResourceTableChunk),
    TablePackage(PackageChunk),
    TableType(TypeChunk),
    TableTypeSpec(TypeSpecChunk),
    Xml(XmlChunk),
    XmlResourceMap(XmlResourceMapChunk),
    XmlStartElement(XmlStartElementChunk),
    XmlEndElement(XmlEndElementChunk),
}

impl Chunk {
    /// The wire type tag this chunk was decoded from.
    pub fn type_tag(&self) -> u16 {
        match self {
            Chunk::Unknown(c) => c.type_tag,
            Chunk::StringPool(_) => RES_STRING_POOL_TYPE,
            Chunk::Table(_) => RES_TABLE_TYPE,
            Chunk::TablePackage(_) => RES_TABLE_PACKAGE_TYPE,
            Chunk::TableType(_) => RES_TABLE_TYPE_TYPE,
            Chunk::TableTypeSpec(_) => RES_TABLE_TYPE_SPEC_TYPE,
            Chunk::Xml(_) => RES_XML_TYPE,
            Chunk::XmlResourceMap(_) => RES_XML_RESOURCE_MAP_TYPE,
            Chunk::XmlStartElement(_) => RES_XML_START_ELEMENT_TYPE,
            Chunk::XmlEndElement(_) => RES_XML_END_ELEMENT_TYPE,
        }
    }
}

/// An opaque chunk: either a type this decoder does not model, or a chunk
/// whose sizing was inconsistent and had to be clamped. `diagnostic` is set
/// only in the latter case.
#[derive(Debug)]
pub struct UnknownChunk {
    pub type_tag: u16,
    pub header_size: u16,
    pub declared_size: u32,
    pub payload: Vec<u8>,
    pub diagnostic: Option<String>,
}

/// Decodes the chunk starting at the cursor position, leaving the cursor at
/// the next sibling. `limit` is the absolute end of the enclosing scope
/// (parent chunk or document); nothing past it is consumed.
///
/// Returns `None` only when the scope is exhausted. Malformed sizing never
/// fails: the offending span is clamped into an `Unknown` chunk and decoding
/// resumes at the parent's next sibling.
pub fn decode_chunk(cursor: &mut ByteCursor<'_>, limit: usize) -> Option<Chunk> {
    let limit = limit.min(cursor.len());
    let start = cursor.position();
    if start >= limit {
        return None;
    }

    if limit - start < 8 {
        return Some(clamp_unknown(cursor, start, limit, 0, 0, 0, "truncated chunk header"));
    }

    // These reads cannot fail; the length was checked above.
    let type_tag = cursor.read_u16().ok()?;
    let header_size = cursor.read_u16().ok()?;
    let chunk_size = cursor.read_u32().ok()?;

    let declared_end = start.checked_add(chunk_size as usize);
    let end = match declared_end {
        Some(end)
            if header_size != 0 && header_size as u32 <= chunk_size && end <= limit =>
        {
            end
        }
        _ => {
            warn!(
                "chunk 0x{type_tag:04x} at {start}: inconsistent sizing (headerSize={header_size}, chunkSize={chunk_size}, scope ends at {limit})"
            );
            return Some(clamp_unknown(
                cursor,
                start,
                limit,
                type_tag,
                header_size,
                chunk_size,
                "inconsistent chunk sizing",
            ));
        }
    };

    let header = ChunkHeader { type_tag, header_size, chunk_size, start };
    let decoded = decode_body(cursor, &header, end);
    // Land on the next sibling whether the body decoded cleanly or not.
    let chunk = match decoded {
        Ok(chunk) => {
            let _ = cursor.seek(end);
            chunk
        }
        Err(e) => {
            warn!("chunk 0x{type_tag:04x} at {start}: {e}; emitting opaque chunk");
            clamp_unknown(cursor, start, end, type_tag, header_size, chunk_size, &e.to_string())
        }
    };
    Some(chunk)
}

fn decode_body(cursor: &mut ByteCursor<'_>, header: &ChunkHeader, end: usize) -> DecodeResult<Chunk> {
    Ok(match header.type_tag {
        RES_STRING_POOL_TYPE => Chunk::StringPool(StringPoolChunk::decode(cursor, header)?),
        RES_TABLE_TYPE => Chunk::Table(ResourceTableChunk::decode(cursor, header)?),
        RES_TABLE_PACKAGE_TYPE => Chunk::TablePackage(PackageChunk::decode(cursor, header)?),
        RES_TABLE_TYPE_TYPE => Chunk::TableType(TypeChunk::decode(cursor, header)?),
        RES_TABLE_TYPE_SPEC_TYPE => Chunk::TableTypeSpec(TypeSpecChunk::decode(cursor, header)?),
        RES_XML_TYPE => Chunk::Xml(XmlChunk::decode(cursor, header)?),
        RES_XML_RESOURCE_MAP_TYPE => {
            Chunk::XmlResourceMap(XmlResourceMapChunk::decode(cursor, header)?)
        }
        RES_XML_START_ELEMENT_TYPE => {
            Chunk::XmlStartElement(XmlStartElementChunk::decode(cursor, header)?)
        }
        RES_XML_END_ELEMENT_TYPE => Chunk::XmlEndElement(XmlEndElementChunk::decode(cursor, header)?),
        _ => {
            // Namespace frames, CDATA and future chunk types are carried
            // opaquely; consumers that care (the XML tree) skip them.
            let payload_start = header.payload_start().min(end);
            cursor.seek(payload_start)?;
            let payload = cursor.read_bytes(end - payload_start)?.to_vec();
            Chunk::Unknown(UnknownChunk {
                type_tag: header.type_tag,
                header_size: header.header_size,
                declared_size: header.chunk_size,
                payload,
                diagnostic: None,
            })
        }
    })
}

/// Decodes all sibling chunks up to `limit`.
pub fn decode_chunks(cursor: &mut ByteCursor<'_>, limit: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    while let Some(chunk) = decode_chunk(cursor, limit) {
        chunks.push(chunk);
    }
    chunks
}

fn clamp_unknown(
    cursor: &mut ByteCursor<'_>,
    start: usize,
    end: usize,
    type_tag: u16,
    header_size: u16,
    declared_size: u32,
    diagnostic: &str,
) -> Chunk {
    let _ = cursor.seek(start);
    let payload = cursor.read_bytes(end - start).unwrap_or(&[]).to_vec();
    let _ = cursor.seek(end);
    Chunk::Unknown(UnknownChunk {
        type_tag,
        header_size,
        declared_size,
        payload,
        diagnostic: Some(diagnostic.to_string()),
    })
}
