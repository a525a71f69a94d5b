//! RIFF chunk primitives shared by the WAV and AVI containers

use crate::error::{Error, Result};
use std::io::Read;

pub const RIFF: &[u8; 4] = b"RIFF";
pub const LIST: &[u8; 4] = b"LIST";

/// Chunk header (4 byte ID + 4 byte size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: [u8; 4],
    pub size: u32,
}

impl ChunkHeader {
    /// Size of a serialized header
    pub const SIZE: u32 = 8;

    /// Read a chunk header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 8 {
            return None;
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[0..4]);

        let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        Some(ChunkHeader { id, size })
    }

    /// Read a chunk header from a stream
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; 8];
        reader.read_exact(&mut bytes)?;
        ChunkHeader::from_bytes(&bytes).ok_or_else(|| Error::format("Truncated chunk header"))
    }

    /// Payload size rounded up to the word boundary
    pub fn padded_size(&self) -> u64 {
        self.size as u64 + (self.size & 1) as u64
    }

    /// Printable chunk ID
    pub fn id_str(&self) -> String {
        fourcc_str(&self.id)
    }
}

/// Render a FourCC for log and error messages
pub fn fourcc_str(fourcc: &[u8; 4]) -> String {
    fourcc
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect()
}
