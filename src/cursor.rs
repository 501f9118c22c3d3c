use crate::{CborError, ErrorCode};

/// Bounds-checked read cursor over the caller's input.
///
/// `end` is the visible length. It shrinks while a bstr-wrapped region is entered and is restored
/// on exit; reads never go past it.
#[derive(Debug, Clone, Copy)]
pub struct InputCursor<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> InputCursor<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
        }
    }

    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    pub const fn tell(&self) -> usize {
        self.pos
    }

    /// Moves to `pos`, clamped to the visible length.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
    }

    pub const fn end(&self) -> usize {
        self.end
    }

    /// Sets the visible length, clamped to the buffer.
    pub fn set_end(&mut self, end: usize) {
        self.end = end.min(self.data.len());
        if self.pos > self.end {
            self.pos = self.end;
        }
    }

    pub const fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn peek_u8(&self) -> Option<u8> {
        if self.pos < self.end {
            Some(self.data[self.pos])
        } else {
            None
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, CborError> {
        let b = self
            .peek_u8()
            .ok_or_else(|| CborError::new(ErrorCode::HitEnd, self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], CborError> {
        let off = self.pos;
        let end = self
            .pos
            .checked_add(n)
            .ok_or_else(|| CborError::new(ErrorCode::HitEnd, off))?;
        if end > self.end {
            return Err(CborError::new(ErrorCode::HitEnd, off));
        }
        let s = &self.data[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    pub fn read_be_u16(&mut self) -> Result<u16, CborError> {
        let s = self.read_exact(2)?;
        Ok(u16::from_be_bytes([s[0], s[1]]))
    }

    pub fn read_be_u32(&mut self) -> Result<u32, CborError> {
        let s = self.read_exact(4)?;
        Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn read_be_u64(&mut self) -> Result<u64, CborError> {
        let s = self.read_exact(8)?;
        Ok(u64::from_be_bytes([
            s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
        ]))
    }

    /// Offset of `slice` within the input, if it was borrowed from it.
    pub fn offset_of(&self, slice: &[u8]) -> Option<usize> {
        let base = self.data.as_ptr() as usize;
        let start = slice.as_ptr() as usize;
        let off = start.checked_sub(base)?;
        (off + slice.len() <= self.data.len()).then_some(off)
    }
}
