/* Read-only view of the dex container format: the header, the id tables,
   class definitions and code-item metadata. Instruction payloads are kept
   as raw 16-bit units; decoding them is the instruction source's job. */

use crate::dex::error::DexError;
use crate::dex::{read_u1, read_u2, read_u4, read_sleb128, read_uleb128, read_x};
use log::error;

use std::collections::HashMap;

/* Constants */
pub const DEX_MAGIC_PREFIX: [u8; 6] = [ 0x64, 0x65, 0x78, 0x0a, 0x30, 0x33 ];
pub const DEX_HEADER_SIZE: usize = 0x70;

pub type StringId = usize;
pub type TypeId = usize;
pub type ProtoId = usize;
pub type FieldId = usize;
pub type MethodId = usize;

/// True when `bytes` starts with the dex magic and is large enough to hold
/// a header. Used to sniff code entries regardless of their archive name.
pub fn looks_like_dex(bytes: &[u8]) -> bool
{
    bytes.len() >= DEX_HEADER_SIZE && bytes[..DEX_MAGIC_PREFIX.len()] == DEX_MAGIC_PREFIX
}

#[derive(Debug)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl Header
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<Header, DexError>
    {
        if bytes.len() < DEX_HEADER_SIZE {
            return Err(DexError::new("Not enough bytes for header"));
        }

        let magic = <[u8; 8]>::try_from(read_x(bytes, ix, 8)?).map_err(|_| DexError::new("short magic"))?;
        if magic[..DEX_MAGIC_PREFIX.len()] != DEX_MAGIC_PREFIX { return Err(DexError::new("Invalid magic value")); }

        Ok(Header {
            magic,
            checksum: read_u4(bytes, ix)?,
            signature: <[u8; 20]>::try_from(read_x(bytes, ix, 20)?).map_err(|_| DexError::new("short signature"))?,
            file_size: read_u4(bytes, ix)?,
            header_size: read_u4(bytes, ix)?,
            endian_tag: read_u4(bytes, ix)?,
            link_size: read_u4(bytes, ix)?,
            link_off: read_u4(bytes, ix)?,
            map_off: read_u4(bytes, ix)?,
            string_ids_size: read_u4(bytes, ix)?,
            string_ids_off: read_u4(bytes, ix)?,
            type_ids_size: read_u4(bytes, ix)?,
            type_ids_off: read_u4(bytes, ix)?,
            proto_ids_size: read_u4(bytes, ix)?,
            proto_ids_off: read_u4(bytes, ix)?,
            field_ids_size: read_u4(bytes, ix)?,
            field_ids_off: read_u4(bytes, ix)?,
            method_ids_size: read_u4(bytes, ix)?,
            method_ids_off: read_u4(bytes, ix)?,
            class_defs_size: read_u4(bytes, ix)?,
            class_defs_off: read_u4(bytes, ix)?,
            data_size: read_u4(bytes, ix)?,
            data_off: read_u4(bytes, ix)?,
        })
    }
}

/// A string-data entry. MUTF-8 that fails to decode stays raw rather than
/// killing the whole file.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum DexString
{
    Decoded(String),
    Raw(u32, Vec<u8>),
}

impl DexString
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<DexString, DexError>
    {
        let utf16_size = read_uleb128(bytes, ix)?;
        let mut v = vec![];

        loop
        {
            let u = read_u1(bytes, ix)?;
            if u != 0 { v.push(u); }
            else { break; }
        }

        Ok(match cesu8::from_java_cesu8(v.as_slice())
        {
            Ok(converted_str) => DexString::Decoded(converted_str.to_string()),
            _ => DexString::Raw(utf16_size, v)
        })
    }

    pub fn as_str(&self) -> &str
    {
        match self
        {
            DexString::Decoded(s) => s.as_str(),
            DexString::Raw(_, _) => "",
        }
    }
}

#[derive(Debug)]
pub struct PrototypeItem {
    // The proto_id_item struct
    pub shorty_idx: StringId,
    pub return_type_idx: TypeId,
    pub parameters: Vec<TypeId>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FieldItem {
    // The field_id_item struct
    pub class_idx: TypeId,
    pub type_idx: TypeId,
    pub name_idx: StringId,
}

impl FieldItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<FieldItem, DexError>
    {
        Ok(FieldItem {
            class_idx: read_u2(bytes, ix)? as TypeId,
            type_idx: read_u2(bytes, ix)? as TypeId,
            name_idx: read_u4(bytes, ix)? as StringId,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MethodItem {
    // The method_id_item struct
    pub class_idx: TypeId,
    pub proto_idx: ProtoId,
    pub name_idx: StringId,
}

impl MethodItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<MethodItem, DexError>
    {
        Ok(MethodItem {
            class_idx: read_u2(bytes, ix)? as TypeId,
            proto_idx: read_u2(bytes, ix)? as ProtoId,
            name_idx: read_u4(bytes, ix)? as StringId,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryItem {
    pub start_addr: u32,
    pub insn_count: u16,
    pub handler_off: u16,
}

impl TryItem {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<TryItem, DexError> {
        Ok(TryItem {
            start_addr: read_u4(bytes, ix)?,
            insn_count: read_u2(bytes, ix)?,
            handler_off: read_u2(bytes, ix)?,
        })
    }
}

#[derive(Debug)]
pub struct CodeItem
{
    pub registers_size: u16,
    pub args_in_size: u16,
    pub args_out_size: u16,
    pub has_debug_info: bool,
    /// Raw instruction stream, 16-bit units in file order.
    pub instructions: Vec<u16>,
    pub tries: Vec<TryItem>,
}

impl CodeItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<CodeItem, DexError>
    {
        let registers_size = read_u2(bytes, ix)?;
        let args_in_size = read_u2(bytes, ix)?;
        let args_out_size = read_u2(bytes, ix)?;
        let tries_size = read_u2(bytes, ix)?;
        let debug_info_off = read_u4(bytes, ix)?;

        let instructions_size = read_u4(bytes, ix)? as usize;
        if instructions_size > bytes.len() / 2
        {
            fail!("insns_size {} exceeds file size", instructions_size);
        }
        let mut instructions = Vec::with_capacity(instructions_size);
        for _ in 0..instructions_size { instructions.push(read_u2(bytes, ix)?); }

        let mut tries: Vec<TryItem> = vec![];
        if tries_size > 0 {
            // 2-byte alignment padding before the try array when insns_size is odd
            if (instructions_size & 1) != 0 { read_u2(bytes, ix)?; }
            for _ in 0..tries_size { tries.push(TryItem::read(bytes, ix)?); }
            let handlers_size = read_uleb128(bytes, ix)? as usize;
            if handlers_size > 1_000_000 {
                return Err(DexError::new("encoded_catch_handler_list size is implausibly large"));
            }
            for i in 0..handlers_size {
                if let Err(e) = skip_catch_handler(bytes, ix) {
                    return Err(DexError::with_context(e, format!("while skipping catch handler #{}/{}", i + 1, handlers_size)));
                }
            }
        }

        Ok(CodeItem { registers_size, args_in_size, args_out_size, has_debug_info: debug_info_off > 0, instructions, tries })
    }
}

// encoded_catch_handler: sleb128 size, |size| type/addr pairs, then a
// catch-all address when size is negative. Contents are irrelevant here.
fn skip_catch_handler(bytes: &[u8], ix: &mut usize) -> Result<(), DexError>
{
    let size = read_sleb128(bytes, ix)?;
    let count = size.unsigned_abs() as usize;
    for _ in 0..count {
        read_uleb128(bytes, ix)?;
        read_uleb128(bytes, ix)?;
    }
    if size <= 0 { read_uleb128(bytes, ix)?; }
    Ok(())
}

#[derive(Debug)]
pub struct EncodedField
{
    pub field_idx: FieldId,
    pub access_flags: u32,
}

#[derive(Debug)]
pub struct EncodedMethod
{
    pub method_idx: MethodId,
    pub access_flags: u32,
    pub code: Option<CodeItem>,
}

#[derive(Debug)]
pub struct ClassDataItem {
    pub static_fields: Vec<EncodedField>,
    pub instance_fields: Vec<EncodedField>,
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassDataItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<ClassDataItem, DexError>
    {
        let static_field_size = read_uleb128(bytes, ix)?;
        let instance_field_size = read_uleb128(bytes, ix)?;
        let direct_method_size = read_uleb128(bytes, ix)?;
        let virtual_method_size = read_uleb128(bytes, ix)?;

        let mut static_fields = vec![];
        let mut instance_fields = vec![];
        let mut direct_methods = vec![];
        let mut virtual_methods = vec![];

        // All four member lists delta-encode their indices.
        let mut offset = 0;
        for _ in 0..static_field_size {
            offset += read_uleb128(bytes, ix)?;
            static_fields.push( EncodedField { field_idx: offset as FieldId, access_flags: read_uleb128(bytes, ix)? } )
        }

        offset = 0;
        for _ in 0..instance_field_size {
            offset += read_uleb128(bytes, ix)?;
            instance_fields.push( EncodedField { field_idx: offset as FieldId, access_flags: read_uleb128(bytes, ix)? } )
        }

        offset = 0;
        for _ in 0..direct_method_size {
            offset += read_uleb128(bytes, ix)?;
            direct_methods.push(Self::read_method(bytes, ix, offset as MethodId)?);
        }

        offset = 0;
        for _ in 0..virtual_method_size {
            offset += read_uleb128(bytes, ix)?;
            virtual_methods.push(Self::read_method(bytes, ix, offset as MethodId)?);
        }

        Ok(ClassDataItem { static_fields, instance_fields, direct_methods, virtual_methods })
    }

    fn read_method(bytes: &[u8], ix: &mut usize, method_idx: MethodId) -> Result<EncodedMethod, DexError>
    {
        let access_flags = read_uleb128(bytes, ix)?;
        let mut code_offset = read_uleb128(bytes, ix)? as usize;
        let code = if code_offset > 0 { Some(CodeItem::read(bytes, &mut code_offset)?) }
            else { None };
        Ok(EncodedMethod { method_idx, access_flags, code })
    }

    pub fn methods(&self) -> impl Iterator<Item = &EncodedMethod>
    {
        self.direct_methods.iter().chain(self.virtual_methods.iter())
    }
}

#[derive(Debug)]
pub struct ClassDefItem {
    // The class_def_item struct
    pub class_idx: TypeId,
    pub access_flags: u32,
    pub superclass_idx: TypeId,
    pub interfaces: Vec<TypeId>,
    pub source_file_idx: StringId,
    pub class_data: Option<ClassDataItem>,
    /// method id -> number of annotations on that method.
    pub method_annotation_counts: HashMap<MethodId, u32>,
    pub class_annotation_count: u32,
}

impl ClassDefItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<ClassDefItem, DexError>
    {
        let class_idx = read_u4(bytes, ix)? as TypeId;
        let access_flags = read_u4(bytes, ix)?;
        let superclass_idx = read_u4(bytes, ix)? as TypeId;
        let mut interface_offset = read_u4(bytes, ix)? as usize;
        let interfaces = if interface_offset > 0 { read_type_list(bytes, &mut interface_offset)? }
            else { vec![] };
        let source_file_idx = read_u4(bytes, ix)? as StringId;
        let annotations_offset = read_u4(bytes, ix)? as usize;
        let (class_annotation_count, method_annotation_counts) =
            read_annotation_counts(bytes, annotations_offset);
        let mut class_data_offset = read_u4(bytes, ix)? as usize;
        let class_data = if class_data_offset > 0 {
            match ClassDataItem::read(bytes, &mut class_data_offset) {
                Ok(cd) => Some(cd),
                Err(e) => {
                    error!("Error reading ClassDataItem: {}", e);
                    None
                }
            }
        }
            else { None };
        let _static_values_offset = read_u4(bytes, ix)?;

        Ok(ClassDefItem {
            class_idx,
            access_flags,
            superclass_idx,
            interfaces,
            source_file_idx,
            class_data,
            method_annotation_counts,
            class_annotation_count,
        })
    }
}

fn read_type_list(bytes: &[u8], ix: &mut usize) -> Result<Vec<TypeId>, DexError>
{
    let mut v = vec![];
    let size = read_u4(bytes, ix)?;
    for _ in 0..size { v.push(read_u2(bytes, ix)? as TypeId); }
    Ok(v)
}

// annotations_directory_item, reduced to the counts the metrics need.
// A broken directory degrades to zero counts.
fn read_annotation_counts(bytes: &[u8], offset: usize) -> (u32, HashMap<MethodId, u32>)
{
    if offset == 0 { return (0, HashMap::new()); }
    let mut ix = offset;
    let mut parse = || -> Result<(u32, HashMap<MethodId, u32>), DexError> {
        let class_annotations_off = read_u4(bytes, &mut ix)? as usize;
        let fields_size = read_u4(bytes, &mut ix)?;
        let methods_size = read_u4(bytes, &mut ix)?;
        let _parameters_size = read_u4(bytes, &mut ix)?;
        for _ in 0..fields_size {
            read_u4(bytes, &mut ix)?;
            read_u4(bytes, &mut ix)?;
        }
        let mut counts = HashMap::new();
        for _ in 0..methods_size {
            let method_idx = read_u4(bytes, &mut ix)? as MethodId;
            let mut set_off = read_u4(bytes, &mut ix)? as usize;
            let count = if set_off > 0 { read_u4(bytes, &mut set_off)? } else { 0 };
            counts.insert(method_idx, count);
        }
        let class_count = if class_annotations_off > 0 {
            let mut off = class_annotations_off;
            read_u4(bytes, &mut off)?
        } else { 0 };
        Ok((class_count, counts))
    };
    match parse() {
        Ok(result) => result,
        Err(e) => {
            error!("Error reading annotations directory: {}", e);
            (0, HashMap::new())
        }
    }
}

/// One parsed dex file down to the code-item level.
#[derive(Debug)]
pub struct DexContainer {
    pub header: Header,
    pub strings: Vec<DexString>,
    pub types: Vec<StringId>,
    pub prototypes: Vec<PrototypeItem>,
    pub fields: Vec<FieldItem>,
    pub methods: Vec<MethodItem>,
    pub class_defs: Vec<ClassDefItem>,
}

impl DexContainer
{
    pub fn read(bytes: &[u8]) -> Result<DexContainer, DexError>
    {
        let mut ix = 0;
        let header = Header::read(bytes, &mut ix)?;

        let mut dex = DexContainer {
            header,
            strings: vec![],
            types: vec![],
            prototypes: vec![],
            fields: vec![],
            methods: vec![],
            class_defs: vec![],
        };

        // Read the strings
        ix = dex.header.string_ids_off as usize;
        for _ in 0..dex.header.string_ids_size
        {
            let mut string_id = read_u4(bytes, &mut ix)? as usize;
            dex.strings.push(DexString::read(bytes, &mut string_id)?);
        }

        // Read the type_ids
        ix = dex.header.type_ids_off as usize;
        for _ in 0..dex.header.type_ids_size
        {
            let type_id = read_u4(bytes, &mut ix)? as usize;
            if type_id >= dex.strings.len() { fail!("Type id {} out of string range", type_id); }
            dex.types.push(type_id);
        }

        // Read the prototypes
        ix = dex.header.proto_ids_off as usize;
        for _ in 0..dex.header.proto_ids_size
        {
            let shorty_idx = read_u4(bytes, &mut ix)? as StringId;
            let return_type_idx = read_u4(bytes, &mut ix)? as TypeId;
            let mut parameter_offset = read_u4(bytes, &mut ix)? as usize;
            let parameters = if parameter_offset == 0 { vec![] }
                else { read_type_list(bytes, &mut parameter_offset)? };
            dex.prototypes.push(PrototypeItem { shorty_idx, return_type_idx, parameters });
        }

        // Read the field ids
        ix = dex.header.field_ids_off as usize;
        for _ in 0..dex.header.field_ids_size
        {
            dex.fields.push(FieldItem::read(bytes, &mut ix)?);
        }

        // Read the method ids
        ix = dex.header.method_ids_off as usize;
        for _ in 0..dex.header.method_ids_size
        {
            dex.methods.push(MethodItem::read(bytes, &mut ix)?);
        }

        // Read the class defs
        ix = dex.header.class_defs_off as usize;
        for _ in 0..dex.header.class_defs_size
        {
            dex.class_defs.push(ClassDefItem::read(bytes, &mut ix)?);
        }

        Ok(dex)
    }

    /// String by id; raw (undecodable) entries and bad ids read as `""`.
    pub fn string(&self, id: StringId) -> &str
    {
        self.strings.get(id).map(DexString::as_str).unwrap_or("")
    }

    /// Jni-style type descriptor by type id, e.g. `Ljava/lang/Object;`.
    pub fn type_descriptor(&self, id: TypeId) -> &str
    {
        self.types.get(id).map(|&s| self.string(s)).unwrap_or("")
    }

    /// Descriptor of the class declaring a method.
    pub fn method_class_descriptor(&self, id: MethodId) -> &str
    {
        self.methods.get(id).map(|m| self.type_descriptor(m.class_idx)).unwrap_or("")
    }

    pub fn field_class_descriptor(&self, id: FieldId) -> &str
    {
        self.fields.get(id).map(|f| self.type_descriptor(f.class_idx)).unwrap_or("")
    }

    /// Full method descriptor, `Lcls;->name(PTypes)RetType`. This is the
    /// identity the complexity memo and visited set key on, so it must be
    /// stable across files referencing the same method.
    pub fn method_descriptor(&self, id: MethodId) -> String
    {
        let Some(method) = self.methods.get(id) else { return String::new(); };
        let mut s = String::from(self.type_descriptor(method.class_idx));
        s.push_str("->");
        s.push_str(self.string(method.name_idx));
        s.push('(');
        if let Some(proto) = self.prototypes.get(method.proto_idx)
        {
            for t in &proto.parameters { s.push_str(self.type_descriptor(*t)); }
            s.push(')');
            s.push_str(self.type_descriptor(proto.return_type_idx));
        }
        else
        {
            s.push(')');
        }
        s
    }

    /// Full field descriptor, `Lcls;->name:Type`.
    pub fn field_descriptor(&self, id: FieldId) -> String
    {
        let Some(field) = self.fields.get(id) else { return String::new(); };
        format!(
            "{}->{}:{}",
            self.type_descriptor(field.class_idx),
            self.string(field.name_idx),
            self.type_descriptor(field.type_idx)
        )
    }
}
