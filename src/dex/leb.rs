pub(crate) fn decode_uleb128(encoded: &[u8]) -> (u32, usize) {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    let mut count: usize = 0;

    for &byte in encoded {
        count += 1;

        let low = (byte & 0x7F) as u32;
        if shift < 32 {
            // guard against UB: saturate the shift and use wrapping to avoid panic
            value = value.wrapping_add(low.wrapping_shl(shift));
        }

        let cont = (byte & 0x80) != 0;
        shift = shift.saturating_add(7);

        // DEX uleb128 values are 32-bit, so valid encodings are at most 5 bytes.
        if !cont || count == 5 {
            break;
        }
    }

    (value, count)
}

pub(crate) fn decode_sleb128(encoded: &[u8]) -> (i32, usize) {
    let mut value: i32 = 0;
    let mut shift: u32 = 0;
    let mut count: usize = 0;
    let mut last_byte: u8 = 0;

    for &byte in encoded {
        count += 1;
        last_byte = byte;

        let low = (byte & 0x7F) as i32;
        if shift < 32 {
            value |= low.wrapping_shl(shift);
        }

        let cont = (byte & 0x80) != 0;
        shift = shift.saturating_add(7);

        // i32 sleb128 likewise fits within 5 bytes
        if !cont || count == 5 {
            break;
        }
    }

    // Sign-extend if needed and we didn't fill all 32 bits
    if (last_byte & 0x40) != 0 && shift < 32 {
        value |= (-1i32).wrapping_shl(shift);
    }

    (value, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_uleb128() {
        let cases = vec![
            (vec![0x00], 0),
            (vec![0x01], 1),
            (vec![0x7F], 127),
            (vec![0x80, 0x01], 128),
            (vec![0x80, 0x7F], 16256),
            (vec![0xE5, 0x8E, 0x26], 624485),
        ];

        for (encoded, expected) in cases {
            let (v, _) = decode_uleb128(&encoded);
            assert_eq!(v, expected);
        }
    }

    #[test]
    fn test_decode_sleb128() {
        let cases = vec![
            (vec![0x00], 0),
            (vec![0x01], 1),
            (vec![0x7F], -1),
            (vec![0xFF, 0x00], 127),
            (vec![0x80, 0x7F], -128),
            (vec![0xC0, 0xBB, 0x78], -123456),
        ];

        for (encoded, expected) in cases {
            let (v, _) = decode_sleb128(&encoded);
            assert_eq!(v, expected);
        }
    }
}
