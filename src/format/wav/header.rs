//! WAV file header structures, serialization and parsing

use super::{DATA_CHUNK, FMT_CHUNK, WAVE_MAGIC};
use crate::error::{Error, Result};
use crate::format::riff::{ChunkHeader, RIFF};
use crate::format::AudioFormat;
use crate::util::{LeWriteExt, SampleFormat};
use std::io::{Read, Seek, SeekFrom};

/// Size of the header written by `WavHeader::to_bytes`
pub const HEADER_SIZE: usize = 44;
/// Offset of the RIFF size field
pub const RIFF_SIZE_OFFSET: u64 = 4;
/// Offset of the data chunk length field
pub const DATA_SIZE_OFFSET: u64 = 40;

/// WAV format tag identifying the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// PCM (uncompressed)
    Pcm,
    /// IEEE Float
    IeeeFloat,
    /// Extensible format
    Extensible,
    /// Unknown format
    Unknown(u16),
}

impl From<u16> for FormatTag {
    fn from(val: u16) -> Self {
        match val {
            0x0001 => FormatTag::Pcm,
            0x0003 => FormatTag::IeeeFloat,
            0xFFFE => FormatTag::Extensible,
            other => FormatTag::Unknown(other),
        }
    }
}

impl From<FormatTag> for u16 {
    fn from(tag: FormatTag) -> Self {
        match tag {
            FormatTag::Pcm => 0x0001,
            FormatTag::IeeeFloat => 0x0003,
            FormatTag::Extensible => 0xFFFE,
            FormatTag::Unknown(val) => val,
        }
    }
}

/// WAV format chunk data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavFormat {
    /// Format tag (codec ID)
    pub format_tag: FormatTag,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Average bytes per second
    pub byte_rate: u32,
    /// Block alignment
    pub block_align: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// PCM format chunk for an audio stream
    pub fn pcm(format: &AudioFormat) -> Self {
        WavFormat {
            format_tag: FormatTag::Pcm,
            channels: format.channels,
            sample_rate: format.sample_rate,
            byte_rate: format.byte_rate(),
            block_align: format.block_align(),
            bits_per_sample: format.bits_per_sample(),
        }
    }

    /// Parse WAV format chunk from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::format("WAV format chunk too small"));
        }

        Ok(WavFormat {
            format_tag: u16::from_le_bytes([data[0], data[1]]).into(),
            channels: u16::from_le_bytes([data[2], data[3]]),
            sample_rate: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            byte_rate: u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
            block_align: u16::from_le_bytes([data[12], data[13]]),
            bits_per_sample: u16::from_le_bytes([data[14], data[15]]),
        })
    }

    /// Get the sample format, if it is one we record
    pub fn sample_format(&self) -> Option<SampleFormat> {
        match (self.format_tag, self.bits_per_sample) {
            (FormatTag::Pcm, 8) => Some(SampleFormat::U8),
            (FormatTag::Pcm, 16) => Some(SampleFormat::I16),
            _ => None,
        }
    }

    /// Calculate expected block alignment
    pub fn calculate_block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Validate format parameters
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(Error::format("Invalid channel count: 0"));
        }

        if self.sample_rate == 0 {
            return Err(Error::format("Invalid sample rate: 0"));
        }

        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(Error::format(format!(
                "Invalid bits per sample: {}",
                self.bits_per_sample
            )));
        }

        let expected_block_align = self.calculate_block_align();
        if self.block_align != expected_block_align {
            return Err(Error::format(format!(
                "Block align mismatch: expected {}, got {}",
                expected_block_align, self.block_align
            )));
        }

        Ok(())
    }
}

/// The canonical 44-byte WAV header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavHeader {
    /// RIFF chunk size (file size - 8, including the pad byte)
    pub riff_size: u32,
    /// WAV format information
    pub format: WavFormat,
    /// Data chunk length, excluding the pad byte
    pub data_size: u32,
    /// Data chunk start position in file
    pub data_start: u64,
}

impl WavHeader {
    /// Header for a file holding `data_size` bytes of samples
    pub fn new(format: WavFormat, data_size: u32) -> Self {
        let pad = data_size & 1;
        WavHeader {
            riff_size: (HEADER_SIZE as u32 - 8)
                .saturating_add(data_size)
                .saturating_add(pad),
            format,
            data_size,
            data_start: HEADER_SIZE as u64,
        }
    }

    /// Serialize the fixed 44-byte header
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE);

        out.write_chunk_header(RIFF, self.riff_size)?;
        out.write_fourcc(WAVE_MAGIC)?;

        out.write_chunk_header(FMT_CHUNK, 16)?;
        out.write_le16(self.format.format_tag.into())?;
        out.write_le16(self.format.channels)?;
        out.write_le32(self.format.sample_rate)?;
        out.write_le32(self.format.byte_rate)?;
        out.write_le16(self.format.block_align)?;
        out.write_le16(self.format.bits_per_sample)?;

        out.write_chunk_header(DATA_CHUNK, self.data_size)?;

        debug_assert_eq!(out.len(), HEADER_SIZE);
        Ok(out)
    }

    /// Read and parse WAV header from a reader
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut riff_header = [0u8; 12];
        reader
            .read_exact(&mut riff_header)
            .map_err(|e| Error::format(format!("Failed to read RIFF header: {}", e)))?;

        if &riff_header[0..4] != RIFF {
            return Err(Error::format("Not a valid RIFF file"));
        }

        if &riff_header[8..12] != WAVE_MAGIC {
            return Err(Error::format("Not a valid WAVE file"));
        }

        let riff_size = u32::from_le_bytes([
            riff_header[4],
            riff_header[5],
            riff_header[6],
            riff_header[7],
        ]);

        let mut format = None;
        loop {
            let chunk = ChunkHeader::read(reader)
                .map_err(|_| Error::format("data chunk not found"))?;

            if &chunk.id == FMT_CHUNK {
                let mut fmt_data = vec![0u8; chunk.size as usize];
                reader
                    .read_exact(&mut fmt_data)
                    .map_err(|e| Error::format(format!("Failed to read fmt chunk: {}", e)))?;
                let parsed = WavFormat::from_bytes(&fmt_data)?;
                parsed.validate()?;
                format = Some(parsed);
                if chunk.size & 1 != 0 {
                    reader.seek(SeekFrom::Current(1))?;
                }
            } else if &chunk.id == DATA_CHUNK {
                let format = format.ok_or_else(|| Error::format("data chunk before fmt chunk"))?;
                let data_start = reader.stream_position()?;
                return Ok(WavHeader {
                    riff_size,
                    format,
                    data_size: chunk.size,
                    data_start,
                });
            } else {
                // WAV chunks are word-aligned
                reader.seek(SeekFrom::Current(chunk.padded_size() as i64))?;
            }
        }
    }

    /// Get total number of sample frames
    pub fn num_samples(&self) -> u64 {
        if self.format.block_align == 0 {
            return 0;
        }
        self.data_size as u64 / self.format.block_align as u64
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / self.format.sample_rate as f64
    }
}
