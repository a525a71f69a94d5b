//! Little-endian primitive writer
//!
//! Every multi-byte field of the RIFF containers goes through this trait so
//! the files come out identical regardless of host byte order.

use crate::error::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

/// Little-endian write helpers for any `Write`
pub trait LeWriteExt: Write {
    /// Write a 16-bit value, least significant byte first
    fn write_le16(&mut self, value: u16) -> Result<()> {
        self.write_u16::<LittleEndian>(value).map_err(map_write_err(2))
    }

    /// Write a 32-bit value, least significant byte first
    fn write_le32(&mut self, value: u32) -> Result<()> {
        self.write_u32::<LittleEndian>(value).map_err(map_write_err(4))
    }

    /// Write a four character code
    fn write_fourcc(&mut self, fourcc: &[u8; 4]) -> Result<()> {
        self.write_block(fourcc)
    }

    /// Write a RIFF chunk header (FourCC + 32-bit size)
    fn write_chunk_header(&mut self, fourcc: &[u8; 4], size: u32) -> Result<()> {
        self.write_fourcc(fourcc)?;
        self.write_le32(size)
    }

    /// Write a raw byte block, reporting a short write distinctly
    fn write_block(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data).map_err(map_write_err(data.len()))
    }

    /// Write `count` zero bytes
    fn write_zeros(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.write_u8(0).map_err(map_write_err(1))?;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> LeWriteExt for W {}

fn map_write_err(expected: usize) -> impl Fn(io::Error) -> Error {
    move |e| {
        if e.kind() == io::ErrorKind::WriteZero {
            Error::ShortWrite { expected }
        } else {
            Error::Io(e)
        }
    }
}

/// Round a chunk payload size up to the RIFF word boundary
pub fn padded(size: u32) -> u32 {
    size + (size & 1)
}
