//! AVI file reader
//!
//! Parses the header list, the chunk layout of the `movi` list and the
//! legacy idx1 index. Used to inspect recordings and to verify them.

use super::{
    palette_from_bgr0, AviMainHeader, AviStreamHeader, BitmapInfoHeader, AUDIO_CHUNK, AUDS,
    AVIH, AVI_MAGIC, BITMAPINFOHEADER_SIZE, HDRL, IDX1, MOVI, STRF, STRH, STRL, VIDEO_CHUNK, VIDS,
};
use crate::error::{Error, Result};
use crate::format::riff::{fourcc_str, ChunkHeader, LIST, RIFF};
use crate::format::wav::WavFormat;
use crate::format::FrameRate;
use crate::util::Rgb;
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Video stream description from its strl list
#[derive(Debug, Clone)]
pub struct VideoStream {
    pub header: AviStreamHeader,
    pub bitmap: BitmapInfoHeader,
    pub palette: Vec<Rgb>,
}

/// Audio stream description from its strl list
#[derive(Debug, Clone)]
pub struct AudioStream {
    pub header: AviStreamHeader,
    pub format: WavFormat,
}

/// Media chunk found in the movi list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoviChunk {
    pub id: [u8; 4],
    /// Absolute file offset of the chunk data
    pub data_offset: u64,
    pub size: u32,
}

/// Entry of the idx1 chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Chunk ID (e.g. "00dc", "01wb")
    pub chunk_id: [u8; 4],
    pub flags: u32,
    /// Offset of the chunk header from the `movi` FourCC
    pub offset: u32,
    pub size: u32,
}

/// Parsed structure of an AVI file
#[derive(Debug, Clone)]
pub struct AviFile {
    pub riff_size: u32,
    pub file_size: u64,
    pub main_header: AviMainHeader,
    pub video: Option<VideoStream>,
    pub audio: Option<AudioStream>,
    /// Absolute file offset of the `movi` FourCC
    pub movi_offset: u64,
    pub movi_size: u32,
    pub chunks: Vec<MoviChunk>,
    pub index: Vec<IndexEntry>,
}

impl AviFile {
    /// Open and parse an AVI file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::format(format!("Failed to open AVI file {}: {}", path.display(), e))
        })?;
        AviFile::read(&mut BufReader::new(file))
    }

    /// Parse the whole file structure. Chunk payloads are not loaded.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let riff = ChunkHeader::read(reader)?;
        if &riff.id != RIFF {
            return Err(Error::format("Not a valid RIFF file"));
        }
        let mut form = [0u8; 4];
        reader.read_exact(&mut form)?;
        if &form != AVI_MAGIC {
            return Err(Error::format("Not a valid AVI file"));
        }

        // An unfinalized recording still carries a zero RIFF size
        let file_end = if riff.size == 0 {
            file_size
        } else {
            (8 + riff.size as u64).min(file_size)
        };

        let mut main_header = None;
        let mut video = None;
        let mut audio = None;
        let mut movi_offset = 0;
        let mut movi_size = 0;
        let mut chunks = Vec::new();
        let mut index = Vec::new();

        let mut pos = 12u64;
        while pos + 8 <= file_end {
            reader.seek(SeekFrom::Start(pos))?;
            let chunk = ChunkHeader::read(reader)?;
            let data_start = pos + 8;

            match &chunk.id {
                id if id == LIST => {
                    let mut list_type = [0u8; 4];
                    reader.read_exact(&mut list_type)?;

                    if &list_type == HDRL {
                        let size = chunk.size.saturating_sub(4);
                        check_payload("hdrl", data_start + 4, size, file_end)?;
                        let mut data = vec![0u8; size as usize];
                        reader.read_exact(&mut data)?;
                        let parsed = parse_hdrl(&data)?;
                        main_header = Some(parsed.0);
                        video = parsed.1;
                        audio = parsed.2;
                    } else if &list_type == MOVI {
                        movi_offset = data_start;
                        movi_size = chunk.size;
                        // A zero size means the header was never patched
                        let movi_end = if chunk.size == 0 {
                            file_end
                        } else {
                            (data_start + chunk.size as u64).min(file_end)
                        };
                        chunks = scan_movi(reader, data_start + 4, movi_end)?;
                        if chunk.size == 0 {
                            pos = movi_end;
                            continue;
                        }
                    }
                }
                id if id == IDX1 => {
                    check_payload("idx1", data_start, chunk.size, file_end)?;
                    let mut data = vec![0u8; chunk.size as usize];
                    reader.read_exact(&mut data)?;
                    index = parse_index(&data);
                }
                _ => debug!("Skipping top-level chunk {}", chunk.id_str()),
            }

            pos = data_start + chunk.padded_size();
        }

        let main_header = main_header.ok_or_else(|| Error::format("AVI file has no avih chunk"))?;

        Ok(AviFile {
            riff_size: riff.size,
            file_size,
            main_header,
            video,
            audio,
            movi_offset,
            movi_size,
            chunks,
            index,
        })
    }

    /// Frame rate of the video stream
    pub fn frame_rate(&self) -> Option<FrameRate> {
        self.video
            .as_ref()
            .filter(|v| v.header.scale > 0 && v.header.rate > 0)
            .map(|v| FrameRate::new(v.header.rate, v.header.scale))
    }

    /// Playing time according to the video stream header
    pub fn duration_secs(&self) -> f64 {
        match self.frame_rate() {
            Some(rate) => rate.duration_secs(self.main_header.total_frames as u64),
            None => 0.0,
        }
    }

    pub fn video_chunks(&self) -> impl Iterator<Item = &MoviChunk> {
        self.chunks.iter().filter(|c| &c.id == VIDEO_CHUNK)
    }

    pub fn audio_chunks(&self) -> impl Iterator<Item = &MoviChunk> {
        self.chunks.iter().filter(|c| &c.id == AUDIO_CHUNK)
    }

    /// Load one chunk's payload
    pub fn read_chunk<R: Read + Seek>(reader: &mut R, chunk: &MoviChunk) -> Result<Vec<u8>> {
        let end = reader.seek(SeekFrom::End(0))?;
        check_payload(&fourcc_str(&chunk.id), chunk.data_offset, chunk.size, end)?;
        reader.seek(SeekFrom::Start(chunk.data_offset))?;
        let mut data = vec![0u8; chunk.size as usize];
        reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Check that idx1 describes the movi chunks exactly, in order
    pub fn verify_index(&self) -> Result<()> {
        if self.index.len() != self.chunks.len() {
            return Err(Error::format(format!(
                "Index has {} entries for {} chunks",
                self.index.len(),
                self.chunks.len()
            )));
        }

        for (n, (entry, chunk)) in self.index.iter().zip(&self.chunks).enumerate() {
            let offset = chunk.data_offset - 8 - self.movi_offset;
            if entry.chunk_id != chunk.id || entry.size != chunk.size || entry.offset as u64 != offset
            {
                return Err(Error::format(format!(
                    "Index entry {} ({} at {}, {} bytes) does not match chunk {} at {}, {} bytes",
                    n,
                    fourcc_str(&entry.chunk_id),
                    entry.offset,
                    entry.size,
                    fourcc_str(&chunk.id),
                    offset,
                    chunk.size
                )));
            }
        }
        Ok(())
    }
}

/// Reject a chunk whose declared size runs past `end` before buffering it
fn check_payload(name: &str, offset: u64, size: u32, end: u64) -> Result<()> {
    if offset + size as u64 > end {
        return Err(Error::format(format!(
            "{} chunk at {} claims {} bytes, only {} left",
            name,
            offset,
            size,
            end.saturating_sub(offset)
        )));
    }
    Ok(())
}

/// Split a chunk list held in memory into `(header, payload)` pairs
fn sub_chunks(mut data: &[u8]) -> Vec<(ChunkHeader, &[u8])> {
    let mut out = Vec::new();
    while let Some(header) = ChunkHeader::from_bytes(data) {
        let end = (8 + header.size as usize).min(data.len());
        out.push((header, &data[8..end]));
        let next = (8 + header.padded_size() as usize).min(data.len());
        data = &data[next..];
    }
    out
}

fn parse_hdrl(
    data: &[u8],
) -> Result<(AviMainHeader, Option<VideoStream>, Option<AudioStream>)> {
    let mut main_header = None;
    let mut video = None;
    let mut audio = None;

    for (header, payload) in sub_chunks(data) {
        if &header.id == AVIH {
            main_header = Some(AviMainHeader::from_bytes(payload)?);
        } else if &header.id == LIST && payload.len() >= 4 && &payload[0..4] == STRL {
            let mut strh = None;
            let mut strf: Option<&[u8]> = None;
            for (inner, inner_payload) in sub_chunks(&payload[4..]) {
                if &inner.id == STRH {
                    strh = Some(AviStreamHeader::from_bytes(inner_payload)?);
                } else if &inner.id == STRF {
                    strf = Some(inner_payload);
                }
            }

            match (strh, strf) {
                (Some(strh), Some(strf)) if &strh.fcc_type == VIDS => {
                    let bitmap = BitmapInfoHeader::from_bytes(strf)?;
                    let palette = palette_from_bgr0(&strf[BITMAPINFOHEADER_SIZE as usize..]);
                    video = Some(VideoStream {
                        header: strh,
                        bitmap,
                        palette,
                    });
                }
                (Some(strh), Some(strf)) if &strh.fcc_type == AUDS => {
                    audio = Some(AudioStream {
                        header: strh,
                        format: WavFormat::from_bytes(strf)?,
                    });
                }
                (Some(strh), _) => {
                    debug!("Ignoring stream of type {}", fourcc_str(&strh.fcc_type))
                }
                (None, _) => return Err(Error::format("Stream list without strh")),
            }
        }
    }

    let main_header = main_header.ok_or_else(|| Error::format("hdrl list has no avih chunk"))?;
    Ok((main_header, video, audio))
}

fn scan_movi<R: Read + Seek>(reader: &mut R, start: u64, end: u64) -> Result<Vec<MoviChunk>> {
    let mut chunks = Vec::new();
    let mut pos = start;
    while pos + 8 <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let header = ChunkHeader::read(reader)?;
        if &header.id == IDX1 {
            // Reached the index of an unfinalized file
            break;
        }
        chunks.push(MoviChunk {
            id: header.id,
            data_offset: pos + 8,
            size: header.size,
        });
        pos += 8 + header.padded_size();
    }
    Ok(chunks)
}

fn parse_index(data: &[u8]) -> Vec<IndexEntry> {
    data.chunks_exact(16)
        .map(|entry| IndexEntry {
            chunk_id: [entry[0], entry[1], entry[2], entry[3]],
            flags: LittleEndian::read_u32(&entry[4..]),
            offset: LittleEndian::read_u32(&entry[8..]),
            size: LittleEndian::read_u32(&entry[12..]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{AudioSamples, ScreenGeometry};
    use crate::format::avi::{AviParams, AviWriter, AVIIF_KEYFRAME};
    use crate::format::{AudioFormat, TvMode};
    use crate::util::{Palette, SampleFormat};
    use std::io::Cursor;

    fn record(frames: usize) -> Vec<u8> {
        let params = AviParams {
            geometry: ScreenGeometry::with_margin(3, 2, 0).unwrap(),
            frame_rate: TvMode::Ntsc.frame_rate(),
            audio: AudioFormat::new(2, 22_050, SampleFormat::I16),
            palette: Palette::grayscale(),
        };
        let mut writer = AviWriter::new(Cursor::new(Vec::new()), params).unwrap();
        for n in 0..frames {
            writer.add_video_frame(&[n as u8; 6]).unwrap();
            writer
                .add_audio_samples(AudioSamples::I16(&[n as i16, -(n as i16)]))
                .unwrap();
        }
        writer.close().unwrap().into_inner()
    }

    #[test]
    fn test_read_back_structure() {
        let bytes = record(3);
        let avi = AviFile::read(&mut Cursor::new(&bytes)).unwrap();

        assert_eq!(avi.riff_size as usize, bytes.len() - 8);
        assert_eq!(avi.main_header.total_frames, 3);
        assert_eq!(avi.main_header.streams, 2);
        assert_eq!(avi.frame_rate(), Some(TvMode::Ntsc.frame_rate()));

        let video = avi.video.as_ref().unwrap();
        assert_eq!(&video.header.fcc_handler, b"mrle");
        assert_eq!(video.bitmap.width, 3);
        assert_eq!(video.bitmap.height, 2);
        assert_eq!(video.palette.len(), 256);
        assert_eq!(video.palette[200], Rgb::new(200, 200, 200));

        let audio = avi.audio.as_ref().unwrap();
        assert_eq!(audio.format.channels, 2);
        assert_eq!(audio.header.length, 3);

        assert_eq!(avi.movi_offset, 1346);
        assert_eq!(avi.video_chunks().count(), 3);
        assert_eq!(avi.audio_chunks().count(), 3);
        assert_eq!(avi.index.len(), 6);
        assert_eq!(avi.index[0].flags, AVIIF_KEYFRAME);
        assert_eq!(avi.index[1].flags, 0);
        avi.verify_index().unwrap();
    }

    #[test]
    fn test_read_chunk_payload() {
        let bytes = record(2);
        let mut cursor = Cursor::new(&bytes);
        let avi = AviFile::read(&mut cursor).unwrap();
        let audio = avi.audio_chunks().nth(1).copied().unwrap();
        let data = AviFile::read_chunk(&mut cursor, &audio).unwrap();
        assert_eq!(data, vec![1, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_unfinalized_file() {
        let mut bytes = record(2);
        // Cut off the index and clear the patched sizes
        bytes.truncate(bytes.len() - 8 - 64);
        bytes[4..8].copy_from_slice(&[0; 4]);
        bytes[1342..1346].copy_from_slice(&[0; 4]);

        let avi = AviFile::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(avi.chunks.len(), 4);
        assert!(avi.index.is_empty());
        assert!(avi.verify_index().is_err());
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let mut bytes = record(1);
        let idx = bytes.len() - 8 - 32;
        assert_eq!(&bytes[idx..idx + 4], b"idx1");
        bytes[idx + 4..idx + 8].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = AviFile::read(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let bytes = record(1);
        let mut cursor = Cursor::new(&bytes);
        let avi = AviFile::read(&mut cursor).unwrap();
        let mut chunk = avi.video_chunks().next().copied().unwrap();
        chunk.size = 0xF000_0000;
        assert!(AviFile::read_chunk(&mut cursor, &chunk).is_err());

        let mut bytes = record(1);
        // hdrl LIST size at offset 16
        bytes[16..20].copy_from_slice(&0x7FFF_FFFFu32.to_le_bytes());
        assert!(AviFile::read(&mut Cursor::new(&bytes)).is_err());
    }

    #[test]
    fn test_not_avi() {
        let mut data = b"RIFF\x04\x00\x00\x00WAVE".to_vec();
        assert!(AviFile::read(&mut Cursor::new(&mut data)).is_err());
    }
}
