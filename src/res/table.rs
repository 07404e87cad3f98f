use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::res::chunk::{self, Chunk, ChunkHeader};
use crate::res::cursor::ByteCursor;
use crate::res::string_pool::StringPoolChunk;
use crate::res::value::ResourceValue;
use crate::res::{DecodeError, DecodeResult};
use log::warn;

/// Entry offset value meaning "no entry at this index".
const NO_ENTRY: u32 = 0xFFFF_FFFF;
/// Entry flag marking a complex (map) entry with no direct value.
const FLAG_COMPLEX: u16 = 0x0001;
/// Reference chains longer than this are treated as unresolvable. Keeps a
/// reference cycle in a hostile table from spinning forever.
const MAX_REFERENCE_DEPTH: usize = 40;

/// The whole `resources.arsc` table: one global value string pool plus one
/// package per declared package id.
#[derive(Debug, Default)]
pub struct ResourceTableChunk {
    string_pool: StringPoolChunk,
    packages: Vec<PackageChunk>,
}

impl ResourceTableChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        let package_count = cursor.read_u32()?;
        if package_count < 1 {
            return Err(DecodeError::Malformed(
                "resource table declares zero packages".to_string(),
            ));
        }

        cursor.seek(header.payload_start())?;
        let mut string_pool = None;
        let mut packages = Vec::new();
        for child in chunk::decode_chunks(cursor, header.end()) {
            match child {
                Chunk::StringPool(pool) => string_pool = Some(pool),
                Chunk::TablePackage(package) => packages.push(package),
                other => {
                    warn!("resource table: ignoring child chunk 0x{:04x}", other.type_tag())
                }
            }
        }

        let string_pool = string_pool.ok_or_else(|| {
            DecodeError::Malformed("resource table has no value string pool".to_string())
        })?;
        Ok(ResourceTableChunk { string_pool, packages })
    }

    /// The pool holding all string resource values in the table.
    pub fn string_pool(&self) -> &StringPoolChunk {
        &self.string_pool
    }

    pub fn packages(&self) -> &[PackageChunk] {
        &self.packages
    }

    pub fn package_by_id(&self, id: u8) -> Option<&PackageChunk> {
        self.packages.iter().find(|p| p.id == id as u32)
    }

    pub fn package_by_name(&self, name: &str) -> Option<&PackageChunk> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Resolves a resource id of the form `0xPPTTEEEE` to its rendered value.
    ///
    /// Configurations are scanned in declared order and the first one holding
    /// an entry at the index wins. Complex entries render as
    /// `@<typeName>/<entryKey>` instead of expanding their maps.
    pub fn resolve(&self, resource_id: u32) -> Option<String> {
        self.resolve_at_depth(resource_id, 0)
    }

    pub(crate) fn resolve_at_depth(&self, resource_id: u32, depth: usize) -> Option<String> {
        if depth > MAX_REFERENCE_DEPTH {
            warn!("reference chain exceeded {MAX_REFERENCE_DEPTH} links at 0x{resource_id:08x}");
            return None;
        }
        let package_id = ((resource_id >> 24) & 0xFF) as u8;
        let type_id = ((resource_id >> 16) & 0xFF) as u8;
        let entry_index = (resource_id & 0xFFFF) as usize;

        let package = self.package_by_id(package_id)?;
        for type_chunk in package.type_chunks(type_id) {
            if let Some(entry) = type_chunk.entries.get(&entry_index) {
                return Some(match &entry.value {
                    Some(value) => value.render_at_depth(&self.string_pool, Some(self), depth),
                    None => {
                        // Complex entry; name it instead of walking its map.
                        let type_name =
                            package.type_string_pool.get(type_id.saturating_sub(1) as usize);
                        let key = package.key_string_pool.get(entry.key_index as usize);
                        format!("@{type_name}/{key}")
                    }
                });
            }
        }
        None
    }
}

/// One package inside a resource table: id, name, the type/key name pools,
/// and the per-type configuration variants.
#[derive(Debug)]
pub struct PackageChunk {
    pub id: u32,
    pub name: String,
    pub type_string_pool: StringPoolChunk,
    pub key_string_pool: StringPoolChunk,
    /// type id -> configurations in declared order.
    types: BTreeMap<u8, Vec<TypeChunk>>,
    type_specs: Vec<TypeSpecChunk>,
}

impl PackageChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        let id = cursor.read_u32()?;
        // Package name: 128 UTF-16 code units, zero padded.
        let mut units = [0u16; 128];
        for unit in units.iter_mut() {
            *unit = cursor.read_u16()?;
        }
        let terminator = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        let name = String::from_utf16_lossy(&units[..terminator]);

        cursor.seek(header.payload_start())?;
        let mut pools = Vec::new();
        let mut types: BTreeMap<u8, Vec<TypeChunk>> = BTreeMap::new();
        let mut type_specs = Vec::new();
        for child in chunk::decode_chunks(cursor, header.end()) {
            match child {
                Chunk::StringPool(pool) => pools.push(pool),
                Chunk::TableType(t) => types.entry(t.id).or_default().push(t),
                Chunk::TableTypeSpec(spec) => type_specs.push(spec),
                other => warn!(
                    "package {name}: ignoring child chunk 0x{:04x}",
                    other.type_tag()
                ),
            }
        }

        // The type-name pool precedes the key pool; tolerate either missing.
        let mut pools = pools.into_iter();
        let type_string_pool = pools.next().unwrap_or_default();
        let key_string_pool = pools.next().unwrap_or_default();

        Ok(PackageChunk { id, name, type_string_pool, key_string_pool, types, type_specs })
    }

    /// All configuration variants of the given type id, in declared order.
    pub fn type_chunks(&self, type_id: u8) -> &[TypeChunk] {
        self.types.get(&type_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn type_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.types.keys().copied()
    }

    pub fn type_specs(&self) -> &[TypeSpecChunk] {
        &self.type_specs
    }

    pub fn type_name(&self, type_id: u8) -> &str {
        self.type_string_pool.get(type_id.saturating_sub(1) as usize)
    }
}

/// All entries of one resource type under one device configuration.
#[derive(Debug)]
pub struct TypeChunk {
    pub id: u8,
    /// Raw `ResTable_config` bytes, kept opaque; declaration order is the
    /// only precedence applied.
    pub configuration: Vec<u8>,
    pub entry_count: u32,
    /// Sparse: indices with a `NO_ENTRY` offset are absent.
    pub entries: HashMap<usize, Entry>,
}

impl TypeChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        let id = cursor.read_u8()?;
        let _flags = cursor.read_u8()?;
        let _reserved = cursor.read_u16()?;
        let entry_count = cursor.read_u32()?;
        let entries_start = cursor.read_u32()? as usize;
        let config_size = cursor.read_u32()? as usize;
        let configuration = if config_size >= 4 {
            cursor.read_bytes(config_size - 4)?.to_vec()
        } else {
            Vec::new()
        };

        if entry_count as usize > header.chunk_size as usize {
            return Err(DecodeError::Malformed(format!(
                "type 0x{id:02x} declares {entry_count} entries in a {}-byte chunk",
                header.chunk_size
            )));
        }

        cursor.seek(header.payload_start())?;
        let mut offsets = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            offsets.push(cursor.read_u32()?);
        }

        let entry_base = header.start + entries_start;
        let mut entries = HashMap::new();
        for (index, offset) in offsets.into_iter().enumerate() {
            if offset == NO_ENTRY {
                continue;
            }
            cursor.seek(entry_base.saturating_add(offset as usize).min(cursor.len()))?;
            match Entry::decode(cursor) {
                Ok(entry) => {
                    entries.insert(index, entry);
                }
                Err(e) => warn!("type 0x{id:02x} entry {index}: {e}; skipping"),
            }
        }

        Ok(TypeChunk { id, configuration, entry_count, entries })
    }
}

/// One resource entry: a key-pool index plus either a direct value or, for
/// complex (map) entries, no value at all.
#[derive(Debug)]
pub struct Entry {
    pub key_index: u32,
    pub value: Option<ResourceValue>,
}

impl Entry {
    fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let _size = cursor.read_u16()?;
        let flags = cursor.read_u16()?;
        let key_index = cursor.read_u32()?;
        let value = if flags & FLAG_COMPLEX != 0 {
            None
        } else {
            Some(ResourceValue::decode(cursor)?)
        };
        Ok(Entry { key_index, value })
    }

    pub fn is_complex(&self) -> bool {
        self.value.is_none()
    }
}

/// Per-type configuration-axis flags. Decoded for completeness; resolution
/// never consults it.
#[derive(Debug)]
pub struct TypeSpecChunk {
    pub id: u8,
    pub entry_flags: Vec<u32>,
}

impl TypeSpecChunk {
    pub fn decode(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> DecodeResult<Self> {
        let id = cursor.read_u8()?;
        let _res0 = cursor.read_u8()?;
        let _res1 = cursor.read_u16()?;
        let entry_count = cursor.read_u32()?;
        if entry_count as usize > header.chunk_size as usize {
            return Err(DecodeError::Malformed(format!(
                "type spec 0x{id:02x} declares {entry_count} entries in a {}-byte chunk",
                header.chunk_size
            )));
        }
        cursor.seek(header.payload_start())?;
        let mut entry_flags = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            entry_flags.push(cursor.read_u32()?);
        }
        Ok(TypeSpecChunk { id, entry_flags })
    }
}
