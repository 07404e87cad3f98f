use crate::res::chunk::{self, Chunk, ChunkHeader};
use crate::res::cursor::ByteCursor;
use crate::res::string_pool::StringPoolChunk;
use crate::res::table::ResourceTableChunk;
use crate::res::value::ResourceValue;
use crate::res::{DecodeError, DecodeResult};
use log::warn;

/// A well-known attribute resource id from the `android:` namespace.
///
/// Binary XML attributes are matched by resource id rather than by name so
/// that obfuscated attribute-name strings cannot hide them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttributeId(pub u32);

impl AttributeId {
    pub const THEME: AttributeId = AttributeId(0x0101_0000);
    pub const LABEL: AttributeId = AttributeId(0x0101_0001);
    pub const ICON: AttributeId = AttributeId(0x0101_0002);
    pub const NAME: AttributeId = AttributeId(0x0101_0003);
    pub const PERMISSION: AttributeId = AttributeId(0x0101_0006);
    pub const SHARED_USER_ID: AttributeId = AttributeId(0x0101_000b);
    pub const ENABLED: AttributeId = AttributeId(0x0101_000e);
    pub const DEBUGGABLE: AttributeId = AttributeId(0x0101_000f);
    pub const EXPORTED: AttributeId = AttributeId(0x0101_0010);
    pub const PROCESS: AttributeId = AttributeId(0x0101_0011);
    pub const PRIORITY: AttributeId = AttributeId(0x0101_001c);
    pub const MIN_SDK_VERSION: AttributeId = AttributeId(0x0101_020c);
    pub const VERSION_CODE: AttributeId = AttributeId(0x0101_021b);
    pub const VERSION_NAME: AttributeId = AttributeId(0x0101_021c);
    pub const SHARED_USER_LABEL: AttributeId = AttributeId(0x0101_0261);
    pub const TARGET_SDK_VERSION: AttributeId = AttributeId(0x0101_0270);
    pub const MAX_SDK_VERSION: AttributeId = AttributeId(0x0101_0271);
    pub const ALLOW_BACKUP: AttributeId = AttributeId(0x0101_0280);
    pub const INSTALL_LOCATION: AttributeId = AttributeId(0x0101_02b7);
    pub const DIRECT_BOOT_AWARE: AttributeId = AttributeId(0x0101_0505);
}

/// The resource-id array paired with an XML chunk's string pool: position
/// `i` holds the attribute resource id whose name string is pool entry `i`.
#[derive(Debug, Default)]
pub struct XmlResourceMapChunk {
    resource_ids: Vec<u32>,
}

impl XmlResourceMapChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        cursor.seek(header.payload_start())?;
        let count = header.end().saturating_sub(header.payload_start()) / 4;
        let mut resource_ids = Vec::with_capacity(count);
        for _ in 0..count {
            resource_ids.push(cursor.read_u32()?);
        }
        Ok(XmlResourceMapChunk { resource_ids })
    }

    /// The string-pool position carrying `id`'s attribute name, if mapped.
    pub fn resource_index(&self, id: AttributeId) -> Option<usize> {
        self.resource_ids.iter().position(|&candidate| candidate == id.0)
    }
}

/// One attribute record: `namespaceIdx:i32, nameIdx:i32, rawValueIdx:i32`
/// followed by an 8-byte typed value. 20 bytes on the wire.
#[derive(Clone, Copy, Debug)]
pub struct XmlAttribute {
    pub namespace_index: i32,
    pub name_index: i32,
    pub raw_value_index: i32,
    pub typed_value: ResourceValue,
}

impl XmlAttribute {
    pub const SIZE: usize = 20;

    fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let namespace_index = cursor.read_u32()? as i32;
        let name_index = cursor.read_u32()? as i32;
        let raw_value_index = cursor.read_u32()? as i32;
        let typed_value = ResourceValue::decode(cursor)?;
        Ok(XmlAttribute { namespace_index, name_index, raw_value_index, typed_value })
    }
}

/// The opening bracket of one XML element.
#[derive(Debug)]
pub struct XmlStartElementChunk {
    pub line_number: u32,
    pub namespace_index: i32,
    pub name_index: i32,
    pub attributes: Vec<XmlAttribute>,
}

impl XmlStartElementChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        let line_number = cursor.read_u32()?;
        let _comment = cursor.read_u32()?;

        cursor.seek(header.payload_start())?;
        let namespace_index = cursor.read_u32()? as i32;
        let name_index = cursor.read_u32()? as i32;
        let attribute_start = cursor.read_u16()? as usize;
        let attribute_size = cursor.read_u16()? as usize;
        let attribute_count = cursor.read_u16()? as usize;
        let _id_index = cursor.read_u16()?;
        let _class_index = cursor.read_u16()?;
        let _style_index = cursor.read_u16()?;
        if attribute_size != XmlAttribute::SIZE {
            return Err(DecodeError::Malformed(format!(
                "element declares {attribute_size}-byte attributes, expected {}",
                XmlAttribute::SIZE
            )));
        }

        cursor.seek(header.payload_start() + attribute_start)?;
        let mut attributes = Vec::with_capacity(attribute_count);
        for _ in 0..attribute_count {
            attributes.push(XmlAttribute::decode(cursor)?);
        }

        Ok(XmlStartElementChunk { line_number, namespace_index, name_index, attributes })
    }
}

/// The closing bracket of one XML element.
#[derive(Debug)]
pub struct XmlEndElementChunk {
    pub namespace_index: i32,
    pub name_index: i32,
}

impl XmlEndElementChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        let _line_number = cursor.read_u32()?;
        let _comment = cursor.read_u32()?;
        cursor.seek(header.payload_start())?;
        let namespace_index = cursor.read_u32()? as i32;
        let name_index = cursor.read_u32()? as i32;
        Ok(XmlEndElementChunk { namespace_index, name_index })
    }
}

/// A whole binary XML document: its string pool, the attribute resource-id
/// map, and a flat pre/post-order run of element brackets. Hierarchy is
/// implicit in the bracketing, never materialized as parent links.
#[derive(Debug)]
pub struct XmlChunk {
    string_pool: StringPoolChunk,
    resource_map: XmlResourceMapChunk,
    chunks: Vec<Chunk>,
}

impl XmlChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        cursor.seek(header.payload_start())?;
        let mut string_pool = None;
        let mut resource_map = None;
        let mut chunks = Vec::new();
        for child in chunk::decode_chunks(cursor, header.end()) {
            match child {
                Chunk::StringPool(pool) if string_pool.is_none() => string_pool = Some(pool),
                Chunk::XmlResourceMap(map) if resource_map.is_none() => resource_map = Some(map),
                other => chunks.push(other),
            }
        }
        let string_pool = string_pool.ok_or_else(|| {
            DecodeError::Malformed("XML document has no string pool".to_string())
        })?;
        if resource_map.is_none() {
            warn!("XML document has no resource map; symbolic attribute lookups will miss");
        }
        Ok(XmlChunk {
            string_pool,
            resource_map: resource_map.unwrap_or_default(),
            chunks,
        })
    }

    pub fn string_pool(&self) -> &StringPoolChunk {
        &self.string_pool
    }

    /// The document's node chunks in wire order (brackets plus any opaque
    /// namespace/CDATA chunks).
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Looks up a string reference; `-1` (no value) yields `""`.
    pub fn get_string(&self, index: i32) -> &str {
        if index < 0 {
            return "";
        }
        self.string_pool.get(index as usize)
    }

    pub fn element_name(&self, element: &XmlStartElementChunk) -> &str {
        self.get_string(element.name_index)
    }

    /// All start-element chunks in document order.
    pub fn start_elements(&self) -> impl Iterator<Item = &XmlStartElementChunk> {
        self.chunks.iter().filter_map(|chunk| match chunk {
            Chunk::XmlStartElement(el) => Some(el),
            _ => None,
        })
    }

    /// All chunks strictly between `start` and its balancing end bracket.
    ///
    /// Brackets are matched by element name, not structural identity; the
    /// format always balances start/end by position, which makes name
    /// matching sufficient without parent links.
    pub fn chunks_within(&self, start: &XmlStartElementChunk) -> Vec<&Chunk> {
        let start_name = self.element_name(start);
        let mut within = Vec::new();
        let mut depth = 0usize;
        for chunk in &self.chunks {
            if depth == 0 {
                if let Chunk::XmlStartElement(el) = chunk {
                    if std::ptr::eq(el as *const XmlStartElementChunk, start) {
                        depth = 1;
                    }
                }
                continue;
            }
            match chunk {
                Chunk::XmlStartElement(el) if self.element_name(el) == start_name => {
                    within.push(chunk);
                    depth += 1;
                }
                Chunk::XmlEndElement(el) if self.get_string(el.name_index) == start_name => {
                    depth -= 1;
                    if depth == 0 {
                        return within;
                    }
                    within.push(chunk);
                }
                _ => within.push(chunk),
            }
        }
        within
    }
}

/// An [`XmlChunk`] paired with the resource table its attribute references
/// resolve against. All lookups return the empty string rather than an
/// absence marker, so typed accessors can substitute defaults uniformly.
pub struct XmlTree<'a> {
    chunk: XmlChunk,
    table: Option<&'a ResourceTableChunk>,
}

impl<'a> XmlTree<'a> {
    pub fn new(chunk: XmlChunk, table: Option<&'a ResourceTableChunk>) -> Self {
        XmlTree { chunk, table }
    }

    pub fn document(&self) -> &XmlChunk {
        &self.chunk
    }

    pub fn table(&self) -> Option<&'a ResourceTableChunk> {
        self.table
    }

    /// Symbolic attribute lookup: maps `id` to the string-pool position the
    /// resource map assigns it, then scans the element's attributes for that
    /// name index. Missing anywhere along the way yields `""`.
    pub fn attribute(&self, element: &XmlStartElementChunk, id: AttributeId) -> String {
        let Some(name_index) = self.chunk.resource_map.resource_index(id) else {
            return String::new();
        };
        element
            .attributes
            .iter()
            .find(|attr| attr.name_index == name_index as i32)
            .map(|attr| attr.typed_value.render(&self.chunk.string_pool, self.table))
            .unwrap_or_default()
    }

    /// Attribute lookup by name string, for documents without a usable
    /// resource map.
    pub fn attribute_named(&self, element: &XmlStartElementChunk, name: &str) -> String {
        element
            .attributes
            .iter()
            .find(|attr| self.chunk.get_string(attr.name_index) == name)
            .map(|attr| attr.typed_value.render(&self.chunk.string_pool, self.table))
            .unwrap_or_default()
    }

    pub fn attribute_bool(
        &self,
        element: &XmlStartElementChunk,
        id: AttributeId,
        default: bool,
    ) -> bool {
        let value = self.attribute(element, id);
        if value.is_empty() {
            default
        } else {
            value == "true"
        }
    }

    pub fn attribute_int(
        &self,
        element: &XmlStartElementChunk,
        id: AttributeId,
        default: i32,
    ) -> i32 {
        let value = self.attribute(element, id);
        if value.is_empty() {
            return default;
        }
        match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("attribute 0x{:08x}: {value:?} is not an integer", id.0);
                default
            }
        }
    }
}
