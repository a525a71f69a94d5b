//! AVI (Audio Video Interleave) container format
//!
//! Movie recordings hold two streams: `00dc` RLE8 video chunks and `01wb`
//! PCM audio chunks, always written as adjacent pairs. The header region in
//! front of the `movi` list has a fixed size, so the final totals can be
//! patched in by rewriting it in place once recording stops.

pub mod reader;
pub mod writer;

pub use reader::AviFile;
pub use writer::{AviWriter, FramePairEntry};

use crate::codec::mrle::{BI_RLE8, MRLE_FOURCC};
use crate::codec::ScreenGeometry;
use crate::error::{Error, Result};
use crate::format::riff::{LIST, RIFF};
use crate::format::wav::WavFormat;
use crate::format::{AudioFormat, FrameRate};
use crate::util::{LeWriteExt, Palette, Rgb};
use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;

pub const AVI_MAGIC: &[u8; 4] = b"AVI ";
pub const HDRL: &[u8; 4] = b"hdrl";
pub const AVIH: &[u8; 4] = b"avih";
pub const STRL: &[u8; 4] = b"strl";
pub const STRH: &[u8; 4] = b"strh";
pub const STRF: &[u8; 4] = b"strf";
pub const MOVI: &[u8; 4] = b"movi";
pub const IDX1: &[u8; 4] = b"idx1";
pub const VIDS: &[u8; 4] = b"vids";
pub const AUDS: &[u8; 4] = b"auds";

/// Chunk ID of stream 0 (compressed video)
pub const VIDEO_CHUNK: &[u8; 4] = b"00dc";
/// Chunk ID of stream 1 (wave bytes)
pub const AUDIO_CHUNK: &[u8; 4] = b"01wb";

/// avih flag: file has an idx1 chunk
pub const AVIF_HASINDEX: u32 = 0x10;
/// avih flag: streams are interleaved
pub const AVIF_ISINTERLEAVED: u32 = 0x100;
/// idx1 flag: chunk is a key frame
pub const AVIIF_KEYFRAME: u32 = 0x10;

/// Largest recording written before it is stopped. Kept below 4 GiB so
/// 32-bit offsets in the index and RIFF size never wrap.
pub const MAX_RECORDING_SIZE: u64 = 0xFFF0_0000;

pub const AVIH_SIZE: u32 = 56;
pub const STRH_SIZE: u32 = 56;
pub const BITMAPINFOHEADER_SIZE: u32 = 40;
pub const PALETTE_SIZE: u32 = 256 * 4;
pub const WAVEFORMATEX_SIZE: u32 = 18;

const VIDEO_STRF_SIZE: u32 = BITMAPINFOHEADER_SIZE + PALETTE_SIZE;
const VIDEO_STRL_SIZE: u32 = 4 + 8 + STRH_SIZE + 8 + VIDEO_STRF_SIZE;
const AUDIO_STRL_SIZE: u32 = 4 + 8 + STRH_SIZE + 8 + WAVEFORMATEX_SIZE;
const HDRL_SIZE: u32 = 4 + 8 + AVIH_SIZE + 8 + VIDEO_STRL_SIZE + 8 + AUDIO_STRL_SIZE;

/// Bytes in front of the first media chunk
pub const HEADER_SIZE: u64 = 12 + 8 + HDRL_SIZE as u64 + 12;
/// File offset of the `movi` FourCC; idx1 offsets are relative to it
pub const MOVI_FOURCC_OFFSET: u64 = HEADER_SIZE - 4;
/// Bytes per frame pair in idx1 (two 16-byte entries)
pub const INDEX_BYTES_PER_PAIR: u64 = 32;

/// Everything the writer needs to know about the streams up front
#[derive(Debug, Clone)]
pub struct AviParams {
    pub geometry: ScreenGeometry,
    pub frame_rate: FrameRate,
    pub audio: AudioFormat,
    pub palette: Palette,
}

/// AVI main header (avih)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AviMainHeader {
    pub microsec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub initial_frames: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
}

impl AviMainHeader {
    pub fn new(width: u32, height: u32, frame_rate: FrameRate) -> Self {
        AviMainHeader {
            microsec_per_frame: frame_rate.micros_per_frame(),
            max_bytes_per_sec: 0,
            padding_granularity: 0,
            flags: AVIF_HASINDEX | AVIF_ISINTERLEAVED,
            total_frames: 0,
            initial_frames: 0,
            streams: 2,
            suggested_buffer_size: 0,
            width,
            height,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_chunk_header(AVIH, AVIH_SIZE)?;
        out.write_le32(self.microsec_per_frame)?;
        out.write_le32(self.max_bytes_per_sec)?;
        out.write_le32(self.padding_granularity)?;
        out.write_le32(self.flags)?;
        out.write_le32(self.total_frames)?;
        out.write_le32(self.initial_frames)?;
        out.write_le32(self.streams)?;
        out.write_le32(self.suggested_buffer_size)?;
        out.write_le32(self.width)?;
        out.write_le32(self.height)?;
        // Reserved
        out.write_zeros(16)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < AVIH_SIZE as usize {
            return Err(Error::format("avih chunk too small"));
        }
        let field = |i: usize| LittleEndian::read_u32(&data[i * 4..]);
        Ok(AviMainHeader {
            microsec_per_frame: field(0),
            max_bytes_per_sec: field(1),
            padding_granularity: field(2),
            flags: field(3),
            total_frames: field(4),
            initial_frames: field(5),
            streams: field(6),
            suggested_buffer_size: field(7),
            width: field(8),
            height: field(9),
        })
    }
}

/// AVI stream header (strh)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AviStreamHeader {
    pub fcc_type: [u8; 4],
    pub fcc_handler: [u8; 4],
    pub flags: u32,
    pub priority: u16,
    pub language: u16,
    pub initial_frames: u32,
    pub scale: u32,
    pub rate: u32,
    pub start: u32,
    pub length: u32,
    pub suggested_buffer_size: u32,
    pub quality: u32,
    pub sample_size: u32,
    /// rcFrame: left, top, right, bottom
    pub frame: [u16; 4],
}

impl AviStreamHeader {
    /// RLE8 video stream, `rate / scale` frames per second
    pub fn video(width: u32, height: u32, frame_rate: FrameRate) -> Self {
        AviStreamHeader {
            fcc_type: *VIDS,
            fcc_handler: MRLE_FOURCC,
            flags: 0,
            priority: 0,
            language: 0,
            initial_frames: 0,
            scale: frame_rate.scale,
            rate: frame_rate.rate,
            start: 0,
            length: 0,
            suggested_buffer_size: 0,
            quality: u32::MAX,
            sample_size: 0,
            frame: [0, 0, width as u16, height as u16],
        }
    }

    /// PCM audio stream counted in sample frames
    pub fn audio(format: &AudioFormat) -> Self {
        AviStreamHeader {
            fcc_type: *AUDS,
            fcc_handler: [0; 4],
            flags: 0,
            priority: 0,
            language: 0,
            initial_frames: 0,
            scale: 1,
            rate: format.sample_rate,
            start: 0,
            length: 0,
            suggested_buffer_size: 0,
            quality: u32::MAX,
            sample_size: format.block_align() as u32,
            frame: [0; 4],
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_chunk_header(STRH, STRH_SIZE)?;
        out.write_fourcc(&self.fcc_type)?;
        out.write_fourcc(&self.fcc_handler)?;
        out.write_le32(self.flags)?;
        out.write_le16(self.priority)?;
        out.write_le16(self.language)?;
        out.write_le32(self.initial_frames)?;
        out.write_le32(self.scale)?;
        out.write_le32(self.rate)?;
        out.write_le32(self.start)?;
        out.write_le32(self.length)?;
        out.write_le32(self.suggested_buffer_size)?;
        out.write_le32(self.quality)?;
        out.write_le32(self.sample_size)?;
        for value in self.frame {
            out.write_le16(value)?;
        }
        Ok(())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < STRH_SIZE as usize {
            return Err(Error::format("strh chunk too small"));
        }
        let u32_at = |offset: usize| LittleEndian::read_u32(&data[offset..]);
        let u16_at = |offset: usize| LittleEndian::read_u16(&data[offset..]);
        Ok(AviStreamHeader {
            fcc_type: [data[0], data[1], data[2], data[3]],
            fcc_handler: [data[4], data[5], data[6], data[7]],
            flags: u32_at(8),
            priority: u16_at(12),
            language: u16_at(14),
            initial_frames: u32_at(16),
            scale: u32_at(20),
            rate: u32_at(24),
            start: u32_at(28),
            length: u32_at(32),
            suggested_buffer_size: u32_at(36),
            quality: u32_at(40),
            sample_size: u32_at(44),
            frame: [u16_at(48), u16_at(50), u16_at(52), u16_at(54)],
        })
    }
}

/// BITMAPINFOHEADER of the video stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapInfoHeader {
    pub width: i32,
    /// Positive: rows stored bottom-up
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

impl BitmapInfoHeader {
    /// 8-bit RLE bitmap with a full 256-colour table
    pub fn rle8(width: u32, height: u32) -> Self {
        BitmapInfoHeader {
            width: width as i32,
            height: height as i32,
            planes: 1,
            bit_count: 8,
            compression: BI_RLE8,
            size_image: width * height,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            clr_used: Palette::SIZE as u32,
            clr_important: 0,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_le32(BITMAPINFOHEADER_SIZE)?;
        out.write_le32(self.width as u32)?;
        out.write_le32(self.height as u32)?;
        out.write_le16(self.planes)?;
        out.write_le16(self.bit_count)?;
        out.write_le32(self.compression)?;
        out.write_le32(self.size_image)?;
        out.write_le32(self.x_pels_per_meter as u32)?;
        out.write_le32(self.y_pels_per_meter as u32)?;
        out.write_le32(self.clr_used)?;
        out.write_le32(self.clr_important)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < BITMAPINFOHEADER_SIZE as usize {
            return Err(Error::format("BITMAPINFOHEADER too small"));
        }
        Ok(BitmapInfoHeader {
            width: LittleEndian::read_i32(&data[4..]),
            height: LittleEndian::read_i32(&data[8..]),
            planes: LittleEndian::read_u16(&data[12..]),
            bit_count: LittleEndian::read_u16(&data[14..]),
            compression: LittleEndian::read_u32(&data[16..]),
            size_image: LittleEndian::read_u32(&data[20..]),
            x_pels_per_meter: LittleEndian::read_i32(&data[24..]),
            y_pels_per_meter: LittleEndian::read_i32(&data[28..]),
            clr_used: LittleEndian::read_u32(&data[32..]),
            clr_important: LittleEndian::read_u32(&data[36..]),
        })
    }
}

/// Complete header region, from `RIFF` up to and including the `movi` FourCC.
///
/// Written once with zero totals when recording starts and again, at offset
/// 0, with the final totals when it stops. Its serialized size never
/// changes.
#[derive(Debug, Clone)]
pub struct AviHeader {
    pub riff_size: u32,
    pub main: AviMainHeader,
    pub video: AviStreamHeader,
    pub bitmap: BitmapInfoHeader,
    pub palette: Palette,
    pub audio: AviStreamHeader,
    pub audio_format: WavFormat,
    /// Size of the movi LIST payload, `movi` FourCC included
    pub movi_size: u32,
}

/// Final values patched into the header at close
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AviTotals {
    pub frames: u32,
    pub audio_samples: u32,
    pub movi_bytes: u32,
    pub file_size: u64,
    pub max_video_chunk: u32,
    pub max_audio_chunk: u32,
}

impl AviHeader {
    /// Provisional header with all totals zero
    pub fn new(params: &AviParams) -> Self {
        let width = params.geometry.visible.width;
        let height = params.geometry.visible.height;
        AviHeader {
            riff_size: 0,
            main: AviMainHeader::new(width, height, params.frame_rate),
            video: AviStreamHeader::video(width, height, params.frame_rate),
            bitmap: BitmapInfoHeader::rle8(width, height),
            palette: params.palette.clone(),
            audio: AviStreamHeader::audio(&params.audio),
            audio_format: WavFormat::pcm(&params.audio),
            movi_size: 4,
        }
    }

    /// Fill in the totals known once recording has stopped
    pub fn set_totals(&mut self, totals: &AviTotals) {
        self.riff_size = totals.file_size.saturating_sub(8).min(u32::MAX as u64) as u32;
        self.movi_size = 4 + totals.movi_bytes;

        self.main.total_frames = totals.frames;
        self.main.suggested_buffer_size = totals.max_video_chunk + totals.max_audio_chunk + 16;
        self.main.max_bytes_per_sec = if totals.frames == 0 {
            0
        } else {
            let secs = totals.frames as f64 * self.video.scale as f64 / self.video.rate as f64;
            (totals.movi_bytes as f64 / secs).ceil().min(u32::MAX as f64) as u32
        };

        self.video.length = totals.frames;
        self.video.suggested_buffer_size = totals.max_video_chunk;
        self.audio.length = totals.audio_samples;
        self.audio.suggested_buffer_size = totals.max_audio_chunk;
    }

    /// Serialize the fixed-size header region
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE as usize);

        out.write_chunk_header(RIFF, self.riff_size)?;
        out.write_fourcc(AVI_MAGIC)?;

        out.write_chunk_header(LIST, HDRL_SIZE)?;
        out.write_fourcc(HDRL)?;
        self.main.write_to(&mut out)?;

        out.write_chunk_header(LIST, VIDEO_STRL_SIZE)?;
        out.write_fourcc(STRL)?;
        self.video.write_to(&mut out)?;
        out.write_chunk_header(STRF, VIDEO_STRF_SIZE)?;
        self.bitmap.write_to(&mut out)?;
        for rgb in self.palette.iter() {
            out.write_block(&[rgb.b, rgb.g, rgb.r, 0])?;
        }

        out.write_chunk_header(LIST, AUDIO_STRL_SIZE)?;
        out.write_fourcc(STRL)?;
        self.audio.write_to(&mut out)?;
        out.write_chunk_header(STRF, WAVEFORMATEX_SIZE)?;
        out.write_le16(self.audio_format.format_tag.into())?;
        out.write_le16(self.audio_format.channels)?;
        out.write_le32(self.audio_format.sample_rate)?;
        out.write_le32(self.audio_format.byte_rate)?;
        out.write_le16(self.audio_format.block_align)?;
        out.write_le16(self.audio_format.bits_per_sample)?;
        // cbSize
        out.write_le16(0)?;

        out.write_chunk_header(LIST, self.movi_size)?;
        out.write_fourcc(MOVI)?;

        if out.len() as u64 != HEADER_SIZE {
            return Err(Error::format(format!(
                "AVI header serialized to {} bytes, expected {}",
                out.len(),
                HEADER_SIZE
            )));
        }
        Ok(out)
    }
}

/// Read a BGR0 palette table
pub(crate) fn palette_from_bgr0(data: &[u8]) -> Vec<Rgb> {
    data.chunks_exact(4)
        .map(|c| Rgb::new(c[2], c[1], c[0]))
        .collect()
}
