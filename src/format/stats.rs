//! Running statistics of an open recording

/// Totals updated after every flushed frame pair or sample block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingStats {
    /// Frame pairs (AVI) or sample blocks (WAV) written
    pub frames: u32,
    /// Bytes in the output file so far, header included
    pub total_bytes: u64,
    /// Encoded video bytes
    pub video_bytes: u64,
    /// Smallest encoded video frame
    pub min_frame_size: Option<u32>,
    /// Largest encoded video frame
    pub max_frame_size: u32,
    /// Audio sample frames (one per channel group)
    pub audio_samples: u64,
    /// PCM bytes
    pub audio_bytes: u64,
}

impl RecordingStats {
    pub fn record_video_frame(&mut self, size: u32) {
        self.video_bytes += size as u64;
        self.min_frame_size = Some(self.min_frame_size.map_or(size, |m| m.min(size)));
        self.max_frame_size = self.max_frame_size.max(size);
    }

    pub fn record_audio(&mut self, sample_frames: u64, bytes: u64) {
        self.audio_samples += sample_frames;
        self.audio_bytes += bytes;
    }

    /// Mean encoded video frame size
    pub fn average_frame_size(&self) -> u64 {
        if self.frames == 0 {
            0
        } else {
            self.video_bytes / self.frames as u64
        }
    }
}
