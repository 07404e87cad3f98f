use crate::res::cursor::ByteCursor;
use crate::res::string_pool::StringPoolChunk;
use crate::res::table::ResourceTableChunk;
use crate::res::DecodeResult;
use serde::Serialize;

pub const TYPE_NULL: u8 = 0x00;
pub const TYPE_REFERENCE: u8 = 0x01;
pub const TYPE_ATTRIBUTE: u8 = 0x02;
pub const TYPE_STRING: u8 = 0x03;
pub const TYPE_FLOAT: u8 = 0x04;
pub const TYPE_DIMENSION: u8 = 0x05;
pub const TYPE_FRACTION: u8 = 0x06;
pub const TYPE_DYNAMIC_REFERENCE: u8 = 0x07;
pub const TYPE_INT_DEC: u8 = 0x10;
pub const TYPE_INT_HEX: u8 = 0x11;
pub const TYPE_INT_BOOLEAN: u8 = 0x12;
pub const TYPE_INT_COLOR_ARGB8: u8 = 0x1c;
pub const TYPE_INT_COLOR_RGB8: u8 = 0x1d;
pub const TYPE_INT_COLOR_ARGB4: u8 = 0x1e;
pub const TYPE_INT_COLOR_RGB4: u8 = 0x1f;

const COMPLEX_RADIX_SHIFT: u32 = 4;
const COMPLEX_RADIX_MASK: u32 = 0x3;
const COMPLEX_UNIT_MASK: u32 = 0xF;
const COMPLEX_MANTISSA_SHIFT: u32 = 8;
const COMPLEX_MANTISSA_MASK: u32 = 0xFF_FFFF;
const MANTISSA_MULT: f32 = 1.0 / (1 << COMPLEX_MANTISSA_SHIFT) as f32;
const RADIX_MULTS: [f32; 4] = [
    1.0 * MANTISSA_MULT,
    1.0 / (1 << 7) as f32 * MANTISSA_MULT,
    1.0 / (1 << 15) as f32 * MANTISSA_MULT,
    1.0 / (1 << 23) as f32 * MANTISSA_MULT,
];

const DIMENSION_UNITS: [&str; 6] = ["px", "dip", "sp", "pt", "in", "mm"];
const FRACTION_UNITS: [&str; 2] = ["%", "%p"];

/// A single typed resource value: `size:u16, res0:u8, type:u8, data:u32`,
/// all little-endian. Interpretation of `data` depends on `type_tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceValue {
    pub size: u16,
    pub type_tag: u8,
    pub data: u32,
}

impl ResourceValue {
    /// Serialized width in bytes.
    pub const SIZE: usize = 8;

    pub fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let size = cursor.read_u16()?;
        let _res0 = cursor.read_u8()?;
        let type_tag = cursor.read_u8()?;
        let data = cursor.read_u32()?;
        Ok(ResourceValue { size, type_tag, data })
    }

    /// Renders this value as the string an `aapt` dump would show for it.
    ///
    /// `table` is consulted only for reference values; passing `None` turns
    /// unresolved references into the `U[<data>]` placeholder. Unrecognized
    /// type tags render as `""`.
    pub fn render(
        &self,
        string_pool: &StringPoolChunk,
        table: Option<&ResourceTableChunk>,
    ) -> String {
        self.render_at_depth(string_pool, table, 0)
    }

    pub(crate) fn render_at_depth(
        &self,
        string_pool: &StringPoolChunk,
        table: Option<&ResourceTableChunk>,
        depth: usize,
    ) -> String {
        match self.type_tag {
            TYPE_NULL => String::new(),
            TYPE_REFERENCE | TYPE_DYNAMIC_REFERENCE => {
                if let Some(table) = table {
                    if let Some(resolved) = table.resolve_at_depth(self.data, depth + 1) {
                        return resolved;
                    }
                }
                format!("U[{}]", self.data as i32)
            }
            TYPE_ATTRIBUTE => format!("A[{}]", self.data as i32),
            TYPE_STRING => string_pool.get(self.data as usize).to_string(),
            TYPE_FLOAT => format!("{:?}", f32::from_bits(self.data)),
            TYPE_DIMENSION => format!(
                "{:?}{}",
                complex_to_float(self.data),
                DIMENSION_UNITS[(self.data & COMPLEX_UNIT_MASK) as usize % DIMENSION_UNITS.len()]
            ),
            TYPE_FRACTION => format!(
                "{:?}{}",
                complex_to_float(self.data),
                FRACTION_UNITS[(self.data & COMPLEX_UNIT_MASK) as usize % FRACTION_UNITS.len()]
            ),
            TYPE_INT_BOOLEAN => {
                if self.data != 0 { "true" } else { "false" }.to_string()
            }
            TYPE_INT_COLOR_ARGB8..=TYPE_INT_COLOR_RGB4 => self.render_color(),
            // Hex values render in decimal too; numeric comparisons matter
            // more than the original formatting.
            TYPE_INT_DEC..=TYPE_INT_COLOR_RGB4 => format!("{}", self.data as i32),
            _ => String::new(),
        }
    }

    fn render_color(&self) -> String {
        let digits: Vec<char> = format!("{:08x}", self.data).chars().collect();
        let compact = match self.type_tag {
            // #AaRrGgBb
            TYPE_INT_COLOR_ARGB8 => digits.iter().collect::<String>(),
            // #FFRrGgBb -> #RrGgBb
            TYPE_INT_COLOR_RGB8 => digits[2..].iter().collect::<String>(),
            // #AARRGGBB -> #ARGB
            TYPE_INT_COLOR_ARGB4 => {
                [digits[0], digits[2], digits[4], digits[6]].iter().collect::<String>()
            }
            // #FFRRGGBB -> #RGB
            _ => [digits[2], digits[4], digits[6]].iter().collect::<String>(),
        };
        format!("#{compact}")
    }
}

/// Decodes a fixed-point complex value (dimensions and fractions). The
/// mantissa occupies the top 24 bits; bits 4..6 select the radix multiplier.
pub fn complex_to_float(complex: u32) -> f32 {
    let mantissa = (complex & (COMPLEX_MANTISSA_MASK << COMPLEX_MANTISSA_SHIFT)) as i32;
    mantissa as f32 * RADIX_MULTS[((complex >> COMPLEX_RADIX_SHIFT) & COMPLEX_RADIX_MASK) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(strings: &[&str]) -> StringPoolChunk {
        StringPoolChunk::from_strings(strings.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn renders_whole_dimension() {
        // Mantissa 1 at radix 0, unit nibble 1 = "dip".
        let value = ResourceValue { size: 8, type_tag: TYPE_DIMENSION, data: (1 << 8) | 0x1 };
        assert_eq!(value.render(&pool(&[]), None), "1.0dip");
    }

    #[test]
    fn renders_fraction_units() {
        let value = ResourceValue { size: 8, type_tag: TYPE_FRACTION, data: (1 << 8) | 0x1 };
        assert_eq!(value.render(&pool(&[]), None), "1.0%p");
    }

    #[test]
    fn renders_scalars() {
        let p = pool(&["hello"]);
        let cases = [
            (TYPE_NULL, 1, ""),
            (TYPE_STRING, 0, "hello"),
            (TYPE_INT_DEC, 42, "42"),
            (TYPE_INT_HEX, 0xFFFF_FFFF, "-1"),
            (TYPE_INT_BOOLEAN, 1, "true"),
            (TYPE_INT_BOOLEAN, 0, "false"),
        ];
        for (type_tag, data, expected) in cases {
            let value = ResourceValue { size: 8, type_tag, data };
            assert_eq!(value.render(&p, None), expected, "type 0x{type_tag:02x}");
        }
    }

    #[test]
    fn renders_float_bits() {
        let value = ResourceValue { size: 8, type_tag: TYPE_FLOAT, data: 1.5f32.to_bits() };
        assert_eq!(value.render(&pool(&[]), None), "1.5");
    }

    #[test]
    fn renders_colors() {
        let p = pool(&[]);
        let cases = [
            (TYPE_INT_COLOR_ARGB8, 0x80FF_00CCu32, "#80ff00cc"),
            (TYPE_INT_COLOR_RGB8, 0xFFAB_CDEF, "#abcdef"),
            (TYPE_INT_COLOR_ARGB4, 0x80FF_00CC, "#8f0c"),
            (TYPE_INT_COLOR_RGB4, 0xFFAB_CDEF, "#ace"),
        ];
        for (type_tag, data, expected) in cases {
            let value = ResourceValue { size: 8, type_tag, data };
            assert_eq!(value.render(&p, None), expected, "type 0x{type_tag:02x}");
        }
    }

    #[test]
    fn unresolved_reference_is_placeholder() {
        let value = ResourceValue { size: 8, type_tag: TYPE_REFERENCE, data: 0x7f02_0001 };
        assert_eq!(value.render(&pool(&[]), None), format!("U[{}]", 0x7f02_0001u32 as i32));
    }
}
