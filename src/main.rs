//! retrorec CLI
//!
//! Inspect recordings and produce synthetic ones through the same session
//! path an emulator uses.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use retrorec_lib::codec::{AudioSamples, MrleDecoder};
use retrorec_lib::format::avi::AviFile;
use retrorec_lib::format::riff::fourcc_str;
use retrorec_lib::format::wav::WavHeader;
use retrorec_lib::format::{OutputFormat, TvMode};
use retrorec_lib::util::SampleFormat;
use retrorec_lib::{init, Config, MediaSession, RecorderConfig};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "retrorec")]
#[command(about = "AVI/WAV recorder for 8-bit emulators", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the structure of a WAV or AVI recording
    Info {
        /// Input file path
        input: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Decode every video frame and check the index
        #[arg(long)]
        decode: bool,
    },

    /// Record a moving test pattern with a tone
    Synth {
        /// Output file (.avi or .wav)
        #[arg(short, long)]
        output: PathBuf,

        /// Number of frames to record
        #[arg(short, long, default_value = "250")]
        frames: u32,

        /// TV standard (pal, ntsc)
        #[arg(long)]
        tv: Option<TvMode>,

        /// Recorder settings (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init(Config {
        verbose: cli.verbose,
        debug: cli.debug,
    })?;

    info!("retrorec v{}", retrorec_lib::VERSION);

    match cli.command {
        Commands::Info {
            input,
            json,
            decode,
        } => cmd_info(&input, json, decode)?,
        Commands::Synth {
            output,
            frames,
            tv,
            config,
        } => cmd_synth(&output, frames, tv, config.as_deref())?,
    }

    Ok(())
}

#[derive(Serialize)]
struct ProbeResult {
    file: String,
    format: &'static str,
    size_bytes: u64,
    riff_size: u32,
    duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VideoProbe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<AudioProbe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<ChunkProbe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decoded_frames: Option<usize>,
}

#[derive(Serialize)]
struct VideoProbe {
    width: u32,
    height: u32,
    handler: String,
    compression: u32,
    frame_rate: String,
    fps: f64,
    frames: u32,
    palette_entries: usize,
}

#[derive(Serialize)]
struct AudioProbe {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    samples: u64,
    data_size: Option<u32>,
}

#[derive(Serialize)]
struct ChunkProbe {
    video: usize,
    audio: usize,
    index_entries: usize,
    movi_size: u32,
    max_video_chunk: u32,
}

fn cmd_info(input: &Path, json: bool, decode: bool) -> anyhow::Result<()> {
    let format = OutputFormat::from_path(input)?;
    let size_bytes = std::fs::metadata(input)
        .with_context(|| format!("Failed to stat {}", input.display()))?
        .len();

    let result = match format {
        OutputFormat::Wav => probe_wav(input, size_bytes)?,
        OutputFormat::Avi => probe_avi(input, size_bytes, decode)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("File: {}", result.file);
    println!("  Format: {}", result.format);
    println!("  Size: {} bytes (RIFF size {})", result.size_bytes, result.riff_size);
    let minutes = (result.duration_seconds / 60.0) as u32;
    println!("  Duration: {:02}:{:06.3}", minutes, result.duration_seconds % 60.0);

    if let Some(video) = &result.video {
        println!();
        println!("Video:");
        println!("  Resolution: {}x{}", video.width, video.height);
        println!("  Codec: {} (compression {})", video.handler, video.compression);
        println!("  Frame Rate: {} ({:.3} fps)", video.frame_rate, video.fps);
        println!("  Frames: {}", video.frames);
        println!("  Palette: {} entries", video.palette_entries);
    }
    if let Some(audio) = &result.audio {
        println!();
        println!("Audio:");
        println!("  Sample Rate: {} Hz", audio.sample_rate);
        println!("  Channels: {}", audio.channels);
        println!("  Bits Per Sample: {}", audio.bits_per_sample);
        println!("  Samples: {}", audio.samples);
        if let Some(size) = audio.data_size {
            println!("  Data Size: {} bytes", size);
        }
    }
    if let Some(chunks) = &result.chunks {
        println!();
        println!("Chunks:");
        println!("  Video: {}", chunks.video);
        println!("  Audio: {}", chunks.audio);
        println!("  Index Entries: {}", chunks.index_entries);
        println!("  Largest Video Chunk: {} bytes", chunks.max_video_chunk);
    }
    if let Some(frames) = result.decoded_frames {
        println!();
        println!("Decoded {} frames, index consistent", frames);
    }

    Ok(())
}

fn probe_wav(input: &Path, size_bytes: u64) -> anyhow::Result<ProbeResult> {
    let mut reader = BufReader::new(File::open(input)?);
    let header = WavHeader::read(&mut reader)?;

    Ok(ProbeResult {
        file: input.display().to_string(),
        format: OutputFormat::Wav.label(),
        size_bytes,
        riff_size: header.riff_size,
        duration_seconds: header.duration_seconds(),
        video: None,
        audio: Some(AudioProbe {
            sample_rate: header.format.sample_rate,
            channels: header.format.channels,
            bits_per_sample: header.format.bits_per_sample,
            samples: header.num_samples(),
            data_size: Some(header.data_size),
        }),
        chunks: None,
        decoded_frames: None,
    })
}

fn probe_avi(input: &Path, size_bytes: u64, decode: bool) -> anyhow::Result<ProbeResult> {
    let mut reader = BufReader::new(File::open(input)?);
    let avi = AviFile::read(&mut reader)?;

    let video = avi.video.as_ref().map(|v| VideoProbe {
        width: v.bitmap.width.unsigned_abs(),
        height: v.bitmap.height.unsigned_abs(),
        handler: fourcc_str(&v.header.fcc_handler),
        compression: v.bitmap.compression,
        frame_rate: format!("{}/{}", v.header.rate, v.header.scale),
        fps: avi.frame_rate().map_or(0.0, |r| r.fps()),
        frames: v.header.length,
        palette_entries: v.palette.len(),
    });
    let audio = avi.audio.as_ref().map(|a| AudioProbe {
        sample_rate: a.format.sample_rate,
        channels: a.format.channels,
        bits_per_sample: a.format.bits_per_sample,
        samples: a.header.length as u64,
        data_size: None,
    });
    let chunks = ChunkProbe {
        video: avi.video_chunks().count(),
        audio: avi.audio_chunks().count(),
        index_entries: avi.index.len(),
        movi_size: avi.movi_size,
        max_video_chunk: avi.video_chunks().map(|c| c.size).max().unwrap_or(0),
    };

    let decoded_frames = if decode {
        Some(decode_all(&avi, &mut reader)?)
    } else {
        None
    };

    Ok(ProbeResult {
        file: input.display().to_string(),
        format: OutputFormat::Avi.label(),
        size_bytes,
        riff_size: avi.riff_size,
        duration_seconds: avi.duration_secs(),
        video,
        audio,
        chunks: Some(chunks),
        decoded_frames,
    })
}

/// Run every video chunk through the reference decoder
fn decode_all(avi: &AviFile, reader: &mut BufReader<File>) -> anyhow::Result<usize> {
    avi.verify_index()?;

    let Some(video) = &avi.video else {
        bail!("File has no video stream");
    };
    let decoder = MrleDecoder::new(
        video.bitmap.width.unsigned_abs(),
        video.bitmap.height.unsigned_abs(),
    );

    let mut frames = 0;
    for chunk in avi.video_chunks() {
        let data = AviFile::read_chunk(reader, chunk)?;
        decoder
            .decode(&data)
            .with_context(|| format!("Frame {} does not decode", frames))?;
        frames += 1;
    }
    debug!("Decoded {} video frames", frames);
    Ok(frames)
}

fn cmd_synth(
    output: &Path,
    frames: u32,
    tv: Option<TvMode>,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => RecorderConfig::load(path)?,
        None => RecorderConfig::default(),
    };
    if let Some(tv) = tv {
        config.tv_mode = tv;
    }

    let geometry = config.geometry;
    let audio = config.audio;
    let fps = config.tv_mode.frame_rate().fps();

    let mut session = MediaSession::new(config)?;
    let format = session.open_file(output)?;
    info!("Recording {} frames to {} ({})", frames, output.display(), format);

    let mut screen = vec![0u8; geometry.frame_len()];
    let mut tone = Tone::new(audio.sample_rate, audio.channels);
    let mut sample_debt = 0.0f64;

    for frame in 0..frames {
        draw_pattern(&mut screen, geometry.width as usize, frame);

        // Carry the fractional sample count over to the next frame
        sample_debt += audio.sample_rate as f64 / fps;
        let count = sample_debt as usize;
        sample_debt -= count as f64;

        let result = match audio.sample_format {
            SampleFormat::U8 => {
                let samples = tone.next_u8(count);
                session.write_audio(AudioSamples::U8(&samples))
            }
            SampleFormat::I16 => {
                let samples = tone.next_i16(count);
                session.write_audio(AudioSamples::I16(&samples))
            }
        }
        .and_then(|_| session.write_video(&screen));

        if let Err(e) = result {
            if e.is_size_limit() {
                println!("Stopped at frame {}: {}", frame, e);
                break;
            }
            return Err(e.into());
        }
    }

    if let Some(status) = session.recording_stats() {
        println!(
            "{}: {} ({:.2}s, {} bytes)",
            output.display(),
            status.label,
            status.elapsed_secs,
            status.size_bytes
        );
    }
    session.close_file()?;
    Ok(())
}

/// Diagonal colour bars scrolling one pixel per frame
fn draw_pattern(screen: &mut [u8], width: usize, frame: u32) {
    for (y, line) in screen.chunks_mut(width).enumerate() {
        for (x, pixel) in line.iter_mut().enumerate() {
            let band = (x + y + frame as usize) / 16;
            *pixel = ((band % 16) * 16 + 0x08) as u8;
        }
    }
}

/// 440 Hz sine generator
struct Tone {
    phase: f64,
    step: f64,
    channels: usize,
}

impl Tone {
    fn new(sample_rate: u32, channels: u16) -> Self {
        Tone {
            phase: 0.0,
            step: 440.0 * std::f64::consts::TAU / sample_rate as f64,
            channels: channels as usize,
        }
    }

    fn next(&mut self, frames: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(frames * self.channels);
        for _ in 0..frames {
            let value = self.phase.sin() * 0.25;
            out.extend(std::iter::repeat(value).take(self.channels));
            self.phase = (self.phase + self.step) % std::f64::consts::TAU;
        }
        out
    }

    fn next_u8(&mut self, frames: usize) -> Vec<u8> {
        self.next(frames)
            .into_iter()
            .map(|v| (128.0 + v * 127.0) as u8)
            .collect()
    }

    fn next_i16(&mut self, frames: usize) -> Vec<i16> {
        self.next(frames)
            .into_iter()
            .map(|v| (v * i16::MAX as f64) as i16)
            .collect()
    }
}
