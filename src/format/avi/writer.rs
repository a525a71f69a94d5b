//! Interleaved AVI writer
//!
//! Each emulated frame contributes one RLE8 video chunk and one PCM audio
//! chunk. The two halves may arrive in either order; a pair is written as
//! soon as both are present, video first.

use super::{
    AviHeader, AviParams, AviTotals, AUDIO_CHUNK, AVIIF_KEYFRAME, HEADER_SIZE, IDX1,
    INDEX_BYTES_PER_PAIR, MAX_RECORDING_SIZE, VIDEO_CHUNK,
};
use crate::codec::{AudioSamples, MrleEncoder};
use crate::error::{Error, Result};
use crate::format::stats::RecordingStats;
use crate::format::{AudioFormat, FrameRate};
use crate::util::le::padded;
use crate::util::{LeWriteExt, MediaType};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Sizes of one written frame pair, kept for the idx1 chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePairEntry {
    pub video_size: u32,
    pub audio_size: u32,
}

impl FramePairEntry {
    /// Bytes the pair occupies in the movi list, headers and padding included
    pub fn chunk_bytes(&self) -> u64 {
        8 + padded(self.video_size) as u64 + 8 + padded(self.audio_size) as u64
    }
}

/// Build the idx1 chunk for `entries`.
///
/// Offsets are relative to the `movi` FourCC, so the first chunk sits at 4.
pub fn build_index(entries: &[FramePairEntry]) -> Result<Vec<u8>> {
    let payload = entries.len() as u64 * INDEX_BYTES_PER_PAIR;
    let payload = u32::try_from(payload)
        .map_err(|_| Error::format(format!("Index too large: {} entries", entries.len())))?;

    let mut out = Vec::with_capacity(8 + payload as usize);
    out.write_chunk_header(IDX1, payload)?;

    let mut offset: u32 = 4;
    for entry in entries {
        out.write_fourcc(VIDEO_CHUNK)?;
        out.write_le32(AVIIF_KEYFRAME)?;
        out.write_le32(offset)?;
        out.write_le32(entry.video_size)?;
        offset += 8 + padded(entry.video_size);

        out.write_fourcc(AUDIO_CHUNK)?;
        out.write_le32(0)?;
        out.write_le32(offset)?;
        out.write_le32(entry.audio_size)?;
        offset += 8 + padded(entry.audio_size);
    }
    Ok(out)
}

/// Movie recorder producing an RLE8 + PCM AVI file
pub struct AviWriter<W: Write + Seek> {
    writer: Option<W>,
    header: AviHeader,
    encoder: MrleEncoder,
    audio_format: AudioFormat,
    frame_rate: FrameRate,

    /// Encoded video half of the pending pair
    video_buf: Vec<u8>,
    video_pending: bool,
    /// Little-endian PCM of the pending pair
    audio_buf: Vec<u8>,
    audio_pending: Option<u64>,

    index: Vec<FramePairEntry>,
    movi_bytes: u64,
    max_audio_chunk: u32,
    stats: RecordingStats,
    size_limit: u64,
    /// Set once a pair write fails; only `finish` is accepted afterwards
    failed: bool,
    finished: bool,
}

impl AviWriter<BufWriter<File>> {
    /// Create a file and write the provisional header
    pub fn create<P: AsRef<Path>>(path: P, params: AviParams) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            Error::format(format!("Failed to create AVI file {}: {}", path.display(), e))
        })?;

        debug!("Created AVI file {}", path.display());
        AviWriter::new(BufWriter::new(file), params)
    }

    /// Finalize and cut the file where the RIFF data ends, dropping what a
    /// failed write left behind
    pub fn close_and_truncate(mut self) -> Result<File> {
        self.finish()?;
        let len = self.stats.total_bytes;
        let file = self
            .close()?
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        file.set_len(len)?;
        Ok(file)
    }
}

impl<W: Write + Seek> AviWriter<W> {
    /// Write the provisional header to `writer`
    pub fn new(mut writer: W, params: AviParams) -> Result<Self> {
        params.audio.validate()?;
        let encoder = MrleEncoder::new(params.geometry)?;
        let header = AviHeader::new(&params);
        writer.write_block(&header.to_bytes()?)?;

        Ok(AviWriter {
            writer: Some(writer),
            video_buf: Vec::with_capacity(encoder.max_frame_size()),
            encoder,
            header,
            audio_format: params.audio,
            frame_rate: params.frame_rate,
            video_pending: false,
            audio_buf: Vec::new(),
            audio_pending: None,
            index: Vec::new(),
            movi_bytes: 0,
            max_audio_chunk: 0,
            stats: RecordingStats {
                total_bytes: HEADER_SIZE,
                ..RecordingStats::default()
            },
            size_limit: MAX_RECORDING_SIZE,
            failed: false,
            finished: false,
        })
    }

    /// Lower the file size ceiling below [`MAX_RECORDING_SIZE`]
    pub fn with_size_limit(mut self, limit: u64) -> Self {
        self.size_limit = limit.min(MAX_RECORDING_SIZE);
        self
    }

    pub fn stats(&self) -> &RecordingStats {
        &self.stats
    }

    pub fn audio_format(&self) -> &AudioFormat {
        &self.audio_format
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Frame pairs written so far
    pub fn frames(&self) -> u32 {
        self.stats.frames
    }

    /// Playing time of the frames written so far
    pub fn elapsed_secs(&self) -> f64 {
        self.frame_rate.duration_secs(self.stats.frames as u64)
    }

    /// Encode one full screen of palette indices as the video half of the
    /// next pair. Returns the encoded size.
    pub fn add_video_frame(&mut self, screen: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if self.video_pending {
            if self.audio_pending.is_none() {
                return Err(Error::FrameOrder {
                    pending: MediaType::Video,
                });
            }
            self.flush_or_stop()?;
        }

        let size = self.encoder.encode_to_vec(screen, &mut self.video_buf)?;
        self.video_pending = true;
        trace!("Video frame encoded to {} bytes", size);

        if self.audio_pending.is_some() {
            self.flush_or_stop()?;
        }
        Ok(size)
    }

    /// Buffer one frame's worth of samples as the audio half of the next
    /// pair. Returns the PCM byte count.
    pub fn add_audio_samples(&mut self, samples: AudioSamples<'_>) -> Result<usize> {
        self.ensure_open()?;
        if samples.sample_format() != self.audio_format.sample_format {
            return Err(Error::invalid_input(format!(
                "Sample format mismatch: expected {}, got {}",
                self.audio_format.sample_format,
                samples.sample_format()
            )));
        }
        if self.audio_pending.is_some() {
            if !self.video_pending {
                return Err(Error::FrameOrder {
                    pending: MediaType::Audio,
                });
            }
            self.flush_or_stop()?;
        }

        self.audio_buf.clear();
        samples.extend_le_bytes(&mut self.audio_buf);
        let byte_len = self.audio_buf.len();
        let sample_frames = (samples.len() / self.audio_format.channels as usize) as u64;
        self.audio_pending = Some(sample_frames);

        if self.video_pending {
            self.flush_or_stop()?;
        }
        Ok(byte_len)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(Error::invalid_state("AVI writer already closed"));
        }
        if self.failed {
            return Err(Error::invalid_state("AVI writer stopped after a write error"));
        }
        Ok(())
    }

    /// Write the pending pair; finalize the file if it would cross the
    /// size ceiling.
    fn flush_or_stop(&mut self) -> Result<()> {
        match self.flush_pair() {
            Err(e) if e.is_size_limit() => {
                warn!(
                    "AVI recording reached the size limit, closing after {} frames",
                    self.stats.frames
                );
                self.video_pending = false;
                self.audio_pending = None;
                self.finish()?;
                Err(e)
            }
            other => other,
        }
    }

    fn flush_pair(&mut self) -> Result<()> {
        let sample_frames = match self.audio_pending {
            Some(n) if self.video_pending => n,
            _ => return Err(Error::invalid_state("No complete frame pair to write")),
        };

        let entry = FramePairEntry {
            video_size: self.video_buf.len() as u32,
            audio_size: self.audio_buf.len() as u32,
        };
        let pair_bytes = entry.chunk_bytes();

        // Room for this pair and the index entries of every pair so far
        let projected = HEADER_SIZE
            + self.movi_bytes
            + pair_bytes
            + 8
            + (self.index.len() as u64 + 1) * INDEX_BYTES_PER_PAIR;
        if projected > self.size_limit {
            return Err(Error::SizeLimit {
                limit: self.size_limit,
                frames: self.stats.frames,
            });
        }

        if let Err(e) = self.write_pair_chunks(&entry) {
            // A partly written pair is never retried; finalize overwrites it
            self.failed = true;
            self.video_pending = false;
            self.audio_pending = None;
            return Err(e);
        }

        self.index.push(entry);
        self.movi_bytes += pair_bytes;
        self.max_audio_chunk = self.max_audio_chunk.max(entry.audio_size);

        self.stats.frames += 1;
        self.stats.total_bytes = HEADER_SIZE + self.movi_bytes;
        self.stats.record_video_frame(entry.video_size);
        self.stats.record_audio(sample_frames, entry.audio_size as u64);

        self.video_pending = false;
        self.audio_pending = None;
        Ok(())
    }

    fn write_pair_chunks(&mut self, entry: &FramePairEntry) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("AVI writer released"))?;

        writer.write_chunk_header(VIDEO_CHUNK, entry.video_size)?;
        writer.write_block(&self.video_buf)?;
        if entry.video_size & 1 != 0 {
            writer.write_zeros(1)?;
        }

        writer.write_chunk_header(AUDIO_CHUNK, entry.audio_size)?;
        writer.write_block(&self.audio_buf)?;
        if entry.audio_size & 1 != 0 {
            writer.write_zeros(1)?;
        }
        Ok(())
    }

    /// Write idx1, backpatch the header and flush. Idempotent.
    ///
    /// An unpaired half still pending is discarded.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        let result = self.finalize();
        self.finished = true;

        // Release per-recording memory regardless of the outcome
        self.index = Vec::new();
        self.video_buf = Vec::new();
        self.audio_buf = Vec::new();
        self.video_pending = false;
        self.audio_pending = None;

        result
    }

    fn finalize(&mut self) -> Result<()> {
        if self.video_pending && self.audio_pending.is_some() {
            if let Err(e) = self.flush_pair() {
                warn!("Dropping final frame pair: {}", e);
            }
        } else if self.video_pending {
            warn!("Discarding video frame without matching audio");
        } else if self.audio_pending.is_some() {
            warn!("Discarding audio block without matching video frame");
        }

        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Ok(()),
        };

        // idx1 follows the last complete pair, over any partial write
        writer.seek(SeekFrom::Start(HEADER_SIZE + self.movi_bytes))?;
        writer.write_block(&build_index(&self.index)?)?;
        let file_size = writer.stream_position()?;

        self.header.set_totals(&AviTotals {
            frames: self.stats.frames,
            audio_samples: self.stats.audio_samples.min(u32::MAX as u64) as u32,
            movi_bytes: self.movi_bytes as u32,
            file_size,
            max_video_chunk: self.stats.max_frame_size,
            max_audio_chunk: self.max_audio_chunk,
        });

        writer.seek(SeekFrom::Start(0))?;
        writer.write_block(&self.header.to_bytes()?)?;
        writer.seek(SeekFrom::Start(file_size))?;
        writer.flush()?;

        self.stats.total_bytes = file_size;
        debug!(
            "Closed AVI file: {} frames, {} bytes, {:.2}s",
            self.stats.frames,
            file_size,
            self.elapsed_secs()
        );
        Ok(())
    }

    /// Finalize the file and hand back the underlying writer.
    ///
    /// On error the writer is dropped (closed) anyway.
    pub fn close(mut self) -> Result<W> {
        let result = self.finish();
        let writer = self.writer.take();
        result?;
        writer.ok_or_else(|| Error::invalid_state("AVI writer released"))
    }
}

impl<W: Write + Seek> Drop for AviWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                warn!("Failed to finalize AVI file on drop: {}", e);
            }
        }
    }
}
