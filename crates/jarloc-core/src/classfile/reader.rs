//! Bounds-checked big-endian cursor over class-file bytes.

use crate::error::{Error, Result};
use bytes::Buf;

/// Cursor that reports the absolute offset of every truncation it hits
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            len: data.len(),
        }
    }

    /// Offset of the next unread byte
    pub(crate) fn position(&self) -> usize {
        self.len - self.buf.len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.buf.len() < needed {
            return Err(Error::decode(
                self.position(),
                format!(
                    "truncated {} (need {} bytes, have {})",
                    what,
                    needed,
                    self.buf.len()
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8> {
        self.ensure(1, what)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn u16(&mut self, what: &str) -> Result<u16> {
        self.ensure(2, what)?;
        Ok(self.buf.get_u16())
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32> {
        self.ensure(4, what)?;
        Ok(self.buf.get_u32())
    }

    pub(crate) fn u64(&mut self, what: &str) -> Result<u64> {
        self.ensure(8, what)?;
        Ok(self.buf.get_u64())
    }

    pub(crate) fn bytes(&mut self, count: usize, what: &str) -> Result<&'a [u8]> {
        self.ensure(count, what)?;
        let (head, tail) = self.buf.split_at(count);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn skip(&mut self, count: usize, what: &str) -> Result<()> {
        self.bytes(count, what).map(|_| ())
    }
}
