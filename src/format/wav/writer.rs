//! WAV file writer

use super::header::{WavFormat, WavHeader, DATA_SIZE_OFFSET, HEADER_SIZE, RIFF_SIZE_OFFSET};
use crate::codec::AudioSamples;
use crate::error::{Error, Result};
use crate::format::stats::RecordingStats;
use crate::format::AudioFormat;
use crate::util::LeWriteExt;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Largest file whose RIFF size field still fits in 32 bits
pub const MAX_WAV_FILE_SIZE: u64 = u32::MAX as u64 + 8;

/// Single-stream PCM writer.
///
/// The header is written with zero sizes on creation and patched by
/// [`WavWriter::close`]. Dropping an open writer patches it best-effort.
/// After a failed write the writer only accepts `finish`, which drops any
/// partially written block.
pub struct WavWriter<W: Write + Seek> {
    writer: Option<W>,
    format: AudioFormat,
    stats: RecordingStats,
    data_bytes: u64,
    /// Ceiling on the whole file, header and pad byte included
    size_limit: u64,
    failed: bool,
    finished: bool,
}

impl WavWriter<BufWriter<File>> {
    /// Create a file and write the provisional header
    pub fn create<P: AsRef<Path>>(path: P, format: AudioFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            Error::format(format!("Failed to create WAV file {}: {}", path.display(), e))
        })?;

        debug!("Created WAV file {}", path.display());
        WavWriter::new(BufWriter::new(file), format)
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

impl<W: Write + Seek> WavWriter<W> {
    /// Write the provisional header to `writer`
    pub fn new(mut writer: W, format: AudioFormat) -> Result<Self> {
        format.validate()?;

        let header = WavHeader::new(WavFormat::pcm(&format), 0);
        writer.write_block(&header.to_bytes()?)?;

        Ok(WavWriter {
            writer: Some(writer),
            format,
            stats: RecordingStats {
                total_bytes: HEADER_SIZE as u64,
                ..RecordingStats::default()
            },
            data_bytes: 0,
            size_limit: MAX_WAV_FILE_SIZE,
            failed: false,
            finished: false,
        })
    }

    /// Lower the file size ceiling below [`MAX_WAV_FILE_SIZE`]
    pub fn with_size_limit(mut self, limit: u64) -> Self {
        self.size_limit = limit.min(MAX_WAV_FILE_SIZE);
        self
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn stats(&self) -> &RecordingStats {
        &self.stats
    }

    /// PCM bytes written so far, without padding
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    /// Playing time of the samples written so far
    pub fn elapsed_secs(&self) -> f64 {
        self.stats.audio_samples as f64 / self.format.sample_rate as f64
    }

    /// Append one block of samples, returning the bytes written.
    ///
    /// A block that would take the file past the size limit is not written;
    /// the file is finalized and `Error::SizeLimit` returned.
    pub fn write_samples(&mut self, samples: AudioSamples<'_>) -> Result<usize> {
        if self.finished {
            return Err(Error::invalid_state("WAV writer already closed"));
        }
        if self.failed {
            return Err(Error::invalid_state("WAV writer stopped after a write error"));
        }

        if samples.sample_format() != self.format.sample_format {
            return Err(Error::invalid_input(format!(
                "Sample format mismatch: expected {}, got {}",
                self.format.sample_format,
                samples.sample_format()
            )));
        }

        if samples.is_empty() {
            return Ok(0);
        }

        let byte_len = samples.byte_len();
        let data_end = self.data_bytes + byte_len as u64;
        if HEADER_SIZE as u64 + data_end + (data_end & 1) > self.size_limit {
            let limit = self.size_limit;
            let frames = self.stats.frames;
            warn!(
                "WAV recording reached {} bytes, closing after {} blocks",
                self.data_bytes, frames
            );
            self.finish()?;
            return Err(Error::SizeLimit { limit, frames });
        }

        let mut bytes = Vec::with_capacity(byte_len);
        samples.extend_le_bytes(&mut bytes);

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::invalid_state("WAV writer released"))?;
        if let Err(e) = writer.write_block(&bytes) {
            self.failed = true;
            return Err(e);
        }

        self.data_bytes += byte_len as u64;
        self.stats.frames += 1;
        self.stats.total_bytes += byte_len as u64;
        self.stats.record_audio(
            (samples.len() / self.format.channels as usize) as u64,
            byte_len as u64,
        );

        Ok(byte_len)
    }

    /// Pad, backpatch both size fields and flush. Idempotent.
    ///
    /// The file ends right after the last complete block; bytes of a failed
    /// write beyond it are overwritten or left outside the RIFF chunk.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Ok(()),
        };

        // The data chunk length excludes the pad byte, the RIFF size includes it
        let header = WavHeader::new(WavFormat::pcm(&self.format), self.data_bytes as u32);
        let mut file_size = HEADER_SIZE as u64 + self.data_bytes;
        writer.seek(SeekFrom::Start(file_size))?;
        if header.data_size & 1 != 0 {
            writer.write_zeros(1)?;
            file_size += 1;
        }
        self.stats.total_bytes = file_size;

        writer.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        writer.write_le32(header.riff_size)?;
        writer.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        writer.write_le32(header.data_size)?;
        writer.seek(SeekFrom::Start(file_size))?;
        writer.flush()?;

        debug!(
            "Closed WAV file: {} data bytes, {:.2}s",
            self.data_bytes,
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
        writer.ok_or_else(|| Error::invalid_state("WAV writer released"))
    }
}

impl<W: Write + Seek> Drop for WavWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                warn!("Failed to finalize WAV file on drop: {}", e);
            }
        }
    }
}
