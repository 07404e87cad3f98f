use crate::res::{DecodeError, DecodeResult};

/// A bounds-checked little-endian reader over a byte slice.
///
/// Every chunk decoder reads through one of these. Reads never panic; running
/// off the end of the slice is reported as [`DecodeError::Truncated`].
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, count: usize, what: &str) -> DecodeResult<&'a [u8]> {
        if self.remaining() < count {
            return Err(DecodeError::Truncated(format!(
                "need {count} bytes for {what} at offset {}, {} remain",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        let b = self.take(2, "u16")?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bytes(&mut self, count: usize) -> DecodeResult<&'a [u8]> {
        self.take(count, "byte run")
    }

    pub fn seek(&mut self, offset: usize) -> DecodeResult<()> {
        if offset > self.data.len() {
            return Err(DecodeError::Truncated(format!(
                "seek to {offset} past end of {}-byte buffer",
                self.data.len()
            )));
        }
        self.pos = offset;
        Ok(())
    }

    /// Advances past `count` bytes, clamping at the end of the buffer.
    pub fn skip(&mut self, count: usize) {
        self.pos = self.pos.saturating_add(count).min(self.data.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u16().unwrap(), 0x0201);
        assert_eq!(cursor.read_u32().unwrap(), 0x06050403);
        assert_eq!(cursor.read_u8().unwrap(), 0x07);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn truncated_read_is_an_error() {
        let data = [0x01, 0x02];
        let mut cursor = ByteCursor::new(&data);
        assert!(cursor.read_u32().is_err());
        // A failed read does not advance the cursor.
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u16().unwrap(), 0x0201);
    }
}
