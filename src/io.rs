//! Low-level primitive reads and writes over the stream boundary.
//!
//! [`DataSink`] writes fixed-width little-endian primitives to any byte sink;
//! [`DataSource`] reads them back from an in-memory slice, reporting a
//! truncated stream as a protocol error instead of panicking.

use crate::error::{PagepackError, Result};
use std::io::Write;

/// Writes fixed-width primitives to an underlying byte sink.
pub struct DataSink<'w> {
    inner: &'w mut dyn Write,
}

impl<'w> DataSink<'w> {
    /// Wraps a byte sink.
    pub fn new(inner: &'w mut dyn Write) -> Self {
        Self { inner }
    }

    /// Writes a raw byte slice.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, val: u8) -> Result<()> {
        self.write_bytes(&[val])
    }

    /// Writes a 16 bit unsigned integer.
    pub fn write_u16(&mut self, val: u16) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a 32 bit unsigned integer.
    pub fn write_u32(&mut self, val: u32) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a boolean as one byte.
    pub fn write_bool(&mut self, val: bool) -> Result<()> {
        self.write_u8(u8::from(val))
    }

    /// Writes an 8 bit signed byte.
    pub fn write_i8(&mut self, val: i8) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a 16 bit short.
    pub fn write_i16(&mut self, val: i16) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a 32 bit int.
    pub fn write_i32(&mut self, val: i32) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a 64 bit long.
    pub fn write_i64(&mut self, val: i64) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a 32 bit float.
    pub fn write_f32(&mut self, val: f32) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a 64 bit double.
    pub fn write_f64(&mut self, val: f64) -> Result<()> {
        self.write_bytes(&val.to_le_bytes())
    }

    /// Writes a character as its u32 code point.
    pub fn write_char(&mut self, val: char) -> Result<()> {
        self.write_u32(val as u32)
    }

    /// Writes a string as a u16 byte length followed by UTF-8 bytes.
    ///
    /// Strings longer than 65535 encoded bytes do not fit the length field
    /// and are rejected as a serialization error.
    pub fn write_utf(&mut self, val: &str) -> Result<()> {
        let bytes = val.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| {
            PagepackError::serialization(format!(
                "string of {} bytes exceeds the 65535 byte wire limit",
                bytes.len()
            ))
        })?;
        self.write_u16(len)?;
        self.write_bytes(bytes)
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Reads fixed-width primitives from an in-memory byte slice.
pub struct DataSource<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DataSource<'a> {
    /// Wraps a byte slice, starting at offset zero.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Takes the next `len` bytes, or fails if the stream is truncated.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(PagepackError::Protocol(format!(
                "unexpected end of stream: needed {len} bytes at offset {}, {} remain",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take(N)?;
        // take() guarantees the length.
        slice
            .try_into()
            .map_err(|_| PagepackError::Protocol("slice length mismatch".into()))
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Reads a 16 bit unsigned integer.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Reads a 32 bit unsigned integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Reads a boolean.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads an 8 bit signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.take_array()?))
    }

    /// Reads a 16 bit short.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    /// Reads a 32 bit int.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Reads a 64 bit long.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    /// Reads a 32 bit float.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Reads a 64 bit double.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    /// Reads a character from its u32 code point.
    pub fn read_char(&mut self) -> Result<char> {
        let code = self.read_u32()?;
        char::from_u32(code)
            .ok_or_else(|| PagepackError::Protocol(format!("invalid char code point {code:#x}")))
    }

    /// Reads a string written by [`DataSink::write_utf`].
    pub fn read_utf(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| PagepackError::Protocol(format!("invalid UTF-8 in string: {e}")))
    }
}
