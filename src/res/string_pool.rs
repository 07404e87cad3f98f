use crate::res::chunk::ChunkHeader;
use crate::res::cursor::ByteCursor;
use crate::res::{DecodeError, DecodeResult};
use log::warn;

const UTF8_FLAG: u32 = 0x0000_0100;

/// A pool of strings referenced by index from other chunks.
///
/// Indices are stable positions in declaration order. Lookups are always
/// defined: an out-of-range index yields `""`, which downstream code relies
/// on instead of special-casing missing entries.
#[derive(Debug, Default)]
pub struct StringPoolChunk {
    strings: Vec<String>,
    style_count: u32,
    utf8: bool,
}

impl StringPoolChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        let string_count = cursor.read_u32()? as usize;
        let style_count = cursor.read_u32()?;
        let flags = cursor.read_u32()?;
        let strings_start = cursor.read_u32()? as usize;
        let _styles_start = cursor.read_u32()? as usize;
        let utf8 = (flags & UTF8_FLAG) != 0;

        if string_count > header.chunk_size as usize {
            return Err(DecodeError::Malformed(format!(
                "string pool declares {string_count} strings in a {}-byte chunk",
                header.chunk_size
            )));
        }

        // The offset arrays sit directly after the pool header.
        cursor.seek(header.payload_start())?;
        let mut offsets = Vec::with_capacity(string_count);
        for _ in 0..string_count {
            offsets.push(cursor.read_u32()? as usize);
        }
        for _ in 0..style_count {
            cursor.read_u32()?; // style offsets; styles carry no meaning here
        }

        let base = header.start + strings_start;
        let limit = header.end().min(cursor.len());
        let data = cursor.data();

        let mut strings = Vec::with_capacity(string_count);
        for (index, offset) in offsets.into_iter().enumerate() {
            let absolute = base.saturating_add(offset);
            let decoded = if utf8 {
                read_utf8_string(data, absolute, limit)
            } else {
                read_utf16_string(data, absolute, limit)
            };
            match decoded {
                Ok(text) => strings.push(text),
                Err(e) => {
                    warn!("string pool entry {index}: {e}; substituting empty string");
                    strings.push(String::new());
                }
            }
        }

        Ok(StringPoolChunk { strings, style_count, utf8 })
    }

    /// Returns the string at `index`, or `""` when the index is out of range.
    pub fn get(&self, index: usize) -> &str {
        self.strings.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn style_count(&self) -> u32 {
        self.style_count
    }

    pub fn is_utf8(&self) -> bool {
        self.utf8
    }

    #[cfg(test)]
    pub(crate) fn from_strings(strings: Vec<String>) -> Self {
        StringPoolChunk { strings, style_count: 0, utf8: true }
    }
}

/// Length prefixes are two-tier: one unit when the value fits, with the high
/// bit marking a second unit carrying the low-order part.
fn read_utf8_length(data: &[u8], offset: usize, limit: usize) -> DecodeResult<(usize, usize)> {
    if offset >= limit {
        return Err(DecodeError::Truncated("UTF-8 length prefix".to_string()));
    }
    let first = data[offset];
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }
    if offset + 1 >= limit {
        return Err(DecodeError::Truncated("second UTF-8 length unit".to_string()));
    }
    let second = data[offset + 1];
    Ok(((((first & 0x7F) as usize) << 8) | second as usize, 2))
}

fn read_utf16_length(data: &[u8], offset: usize, limit: usize) -> DecodeResult<(usize, usize)> {
    if offset + 2 > limit {
        return Err(DecodeError::Truncated("UTF-16 length prefix".to_string()));
    }
    let first = u16::from_le_bytes([data[offset], data[offset + 1]]);
    if first & 0x8000 == 0 {
        return Ok((first as usize, 2));
    }
    if offset + 4 > limit {
        return Err(DecodeError::Truncated("second UTF-16 length unit".to_string()));
    }
    let second = u16::from_le_bytes([data[offset + 2], data[offset + 3]]);
    Ok(((((first & 0x7FFF) as usize) << 16) | second as usize, 4))
}

/// UTF-8 entries carry two lengths: character count, then byte count.
fn read_utf8_string(data: &[u8], offset: usize, limit: usize) -> DecodeResult<String> {
    let (_char_len, prefix) = read_utf8_length(data, offset, limit)?;
    let mut cursor = offset + prefix;
    let (byte_len, prefix) = read_utf8_length(data, cursor, limit)?;
    cursor += prefix;
    if cursor + byte_len > limit {
        return Err(DecodeError::Truncated("UTF-8 string body".to_string()));
    }
    std::str::from_utf8(&data[cursor..cursor + byte_len])
        .map(str::to_string)
        .map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn read_utf16_string(data: &[u8], offset: usize, limit: usize) -> DecodeResult<String> {
    let (char_count, prefix) = read_utf16_length(data, offset, limit)?;
    let cursor = offset + prefix;
    let byte_len = char_count * 2;
    if cursor + byte_len > limit {
        return Err(DecodeError::Truncated("UTF-16 string body".to_string()));
    }
    let units: Vec<u16> = data[cursor..cursor + byte_len]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| DecodeError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::res::chunk::{self, Chunk, RES_STRING_POOL_TYPE};

    /// Builds a serialized UTF-8 string pool chunk.
    pub(crate) fn utf8_pool(strings: &[&str]) -> Vec<u8> {
        let mut body = Vec::new();
        let mut offsets = Vec::new();
        for s in strings {
            offsets.push(body.len() as u32);
            body.push(s.chars().count() as u8);
            body.push(s.len() as u8);
            body.extend_from_slice(s.as_bytes());
            body.push(0);
        }
        while body.len() % 4 != 0 {
            body.push(0);
        }

        let header_size = 28u16;
        let strings_start = header_size as u32 + strings.len() as u32 * 4;
        let chunk_size = strings_start + body.len() as u32;
        let mut out = Vec::new();
        out.extend_from_slice(&RES_STRING_POOL_TYPE.to_le_bytes());
        out.extend_from_slice(&header_size.to_le_bytes());
        out.extend_from_slice(&chunk_size.to_le_bytes());
        out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // styleCount
        out.extend_from_slice(&UTF8_FLAG.to_le_bytes());
        out.extend_from_slice(&strings_start.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // stylesStart
        for offset in &offsets {
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn decodes_utf8_pool_in_order() {
        let bytes = utf8_pool(&["a", "bb", "ccc"]);
        let mut cursor = ByteCursor::new(&bytes);
        let chunk = chunk::decode_chunk(&mut cursor, bytes.len()).unwrap();
        let pool = match chunk {
            Chunk::StringPool(pool) => pool,
            other => panic!("expected string pool, got 0x{:04x}", other.type_tag()),
        };
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(0), "a");
        assert_eq!(pool.get(1), "bb");
        assert_eq!(pool.get(2), "ccc");
    }

    #[test]
    fn out_of_range_lookup_is_empty() {
        let bytes = utf8_pool(&["a", "bb", "ccc"]);
        let mut cursor = ByteCursor::new(&bytes);
        let header = ChunkHeader {
            type_tag: cursor.read_u16().unwrap(),
            header_size: cursor.read_u16().unwrap(),
            chunk_size: cursor.read_u32().unwrap(),
            start: 0,
        };
        let pool = StringPoolChunk::decode(&mut cursor, &header).unwrap();
        assert_eq!(pool.get(3), "");
        assert_eq!(pool.get(usize::MAX), "");
    }

    #[test]
    fn decodes_utf16_pool() {
        // "hi" and "ß∂" as UTF-16LE with length prefixes and terminators.
        let strings = ["hi", "ß∂"];
        let mut body = Vec::new();
        let mut offsets = Vec::new();
        for s in &strings {
            offsets.push(body.len() as u32);
            let units: Vec<u16> = s.encode_utf16().collect();
            body.extend_from_slice(&(units.len() as u16).to_le_bytes());
            for unit in &units {
                body.extend_from_slice(&unit.to_le_bytes());
            }
            body.extend_from_slice(&0u16.to_le_bytes());
        }
        let header_size = 28u16;
        let strings_start = header_size as u32 + strings.len() as u32 * 4;
        let chunk_size = strings_start + body.len() as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&RES_STRING_POOL_TYPE.to_le_bytes());
        bytes.extend_from_slice(&header_size.to_le_bytes());
        bytes.extend_from_slice(&chunk_size.to_le_bytes());
        bytes.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // UTF-16
        bytes.extend_from_slice(&strings_start.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        for offset in &offsets {
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        bytes.extend_from_slice(&body);

        let mut cursor = ByteCursor::new(&bytes);
        let header = ChunkHeader {
            type_tag: cursor.read_u16().unwrap(),
            header_size: cursor.read_u16().unwrap(),
            chunk_size: cursor.read_u32().unwrap(),
            start: 0,
        };
        let pool = StringPoolChunk::decode(&mut cursor, &header).unwrap();
        assert_eq!(pool.get(0), "hi");
        assert_eq!(pool.get(1), "ß∂");
        assert!(!pool.is_utf8());
    }
}
