//! Integration tests for AVI recordings
//!
//! Frames go in through `AviWriter` and come back out through `AviFile` and
//! the reference RLE decoder.

mod common;

use common::*;
use retrorec_lib::codec::{AudioSamples, MrleDecoder};
use retrorec_lib::format::avi::{
    AviFile, AviWriter, AVIIF_KEYFRAME, HEADER_SIZE, MOVI_FOURCC_OFFSET,
};
use retrorec_lib::Error;
use std::io::Cursor;

fn read_back(bytes: &[u8]) -> AviFile {
    AviFile::read(&mut Cursor::new(bytes)).unwrap()
}

/// One video frame and 480 16-bit samples
#[test]
fn test_single_pair_scenario() {
    let params = atari_params(mono16());
    let screen = test_screen(&params.geometry, 1);
    let mut writer = AviWriter::new(Cursor::new(Vec::new()), params).unwrap();

    let video_size = writer.add_video_frame(&screen).unwrap();
    assert_eq!(writer.add_audio_samples(AudioSamples::I16(&[0; 480])).unwrap(), 960);
    let bytes = writer.close().unwrap().into_inner();

    let movi = HEADER_SIZE as usize;
    assert_eq!(&bytes[movi..movi + 4], b"00dc");
    assert_eq!(le32(&bytes, movi + 4) as usize, video_size);

    let audio = movi + 8 + video_size + (video_size & 1);
    assert_eq!(&bytes[audio..audio + 4], b"01wb");
    assert_eq!(le32(&bytes, audio + 4), 960);

    let idx = audio + 8 + 960;
    assert_eq!(&bytes[idx..idx + 4], b"idx1");
    assert_eq!(le32(&bytes, idx + 4), 32);
    assert_eq!(bytes.len(), idx + 8 + 32);
    assert_eq!(le32(&bytes, 4) as usize, bytes.len() - 8);
}

#[test]
fn test_zero_frame_recording_is_valid() {
    let writer = AviWriter::new(Cursor::new(Vec::new()), atari_params(mono16())).unwrap();
    let bytes = writer.close().unwrap().into_inner();

    let avi = read_back(&bytes);
    assert_eq!(avi.riff_size as usize, bytes.len() - 8);
    assert_eq!(avi.main_header.total_frames, 0);
    assert_eq!(avi.movi_size, 4);
    assert!(avi.chunks.is_empty());
    assert!(avi.index.is_empty());
    avi.verify_index().unwrap();
}

#[test]
fn test_round_trip_through_decoder() {
    let params = atari_params(mono8());
    let geometry = params.geometry;
    let mut writer = AviWriter::new(Cursor::new(Vec::new()), params).unwrap();

    let screens: Vec<Vec<u8>> = (0..6).map(|seed| test_screen(&geometry, seed)).collect();
    for screen in &screens {
        writer.add_video_frame(screen).unwrap();
        writer.add_audio_samples(AudioSamples::U8(&[128; 882])).unwrap();
    }
    let bytes = writer.close().unwrap().into_inner();

    let mut cursor = Cursor::new(&bytes);
    let avi = AviFile::read(&mut cursor).unwrap();
    let decoder = MrleDecoder::new(geometry.visible.width, geometry.visible.height);

    let chunks: Vec<_> = avi.video_chunks().copied().collect();
    assert_eq!(chunks.len(), screens.len());
    for (chunk, screen) in chunks.iter().zip(&screens) {
        let data = AviFile::read_chunk(&mut cursor, chunk).unwrap();
        assert_eq!(decoder.decode(&data).unwrap(), visible_pixels(&geometry, screen));
    }
}

#[test]
fn test_either_order_gives_contiguous_index() {
    for audio_first in [false, true] {
        let params = tiny_params(mono8());
        let geometry = params.geometry;
        let mut writer = AviWriter::new(Cursor::new(Vec::new()), params).unwrap();

        for n in 0..5u32 {
            let screen = test_screen(&geometry, n);
            let samples = vec![n as u8; 3 + n as usize];
            if audio_first {
                writer.add_audio_samples(AudioSamples::U8(&samples)).unwrap();
                writer.add_video_frame(&screen).unwrap();
            } else {
                writer.add_video_frame(&screen).unwrap();
                writer.add_audio_samples(AudioSamples::U8(&samples)).unwrap();
            }
        }
        let bytes = writer.close().unwrap().into_inner();
        let avi = read_back(&bytes);

        assert_eq!(avi.index.len(), 10);
        avi.verify_index().unwrap();

        let mut expected_offset = 4;
        for (n, entry) in avi.index.iter().enumerate() {
            let (id, flags): (&[u8; 4], u32) = if n % 2 == 0 {
                (b"00dc", AVIIF_KEYFRAME)
            } else {
                (b"01wb", 0)
            };
            assert_eq!(&entry.chunk_id, id);
            assert_eq!(entry.flags, flags);
            assert_eq!(entry.offset, expected_offset);
            expected_offset += 8 + entry.size + (entry.size & 1);
        }
        // Index starts right after the last chunk
        assert_eq!(
            MOVI_FOURCC_OFFSET + expected_offset as u64,
            bytes.len() as u64 - 8 - 160
        );
    }
}

#[test]
fn test_order_violation_keeps_first_frame() {
    let params = tiny_params(mono8());
    let geometry = params.geometry;
    let first = test_screen(&geometry, 0);
    let second = test_screen(&geometry, 2);

    let mut writer = AviWriter::new(Cursor::new(Vec::new()), params).unwrap();
    writer.add_video_frame(&first).unwrap();
    let err = writer.add_video_frame(&second).unwrap_err();
    assert!(matches!(err, Error::FrameOrder { .. }));

    writer.add_audio_samples(AudioSamples::U8(&[1, 2])).unwrap();
    let bytes = writer.close().unwrap().into_inner();

    let mut cursor = Cursor::new(&bytes);
    let avi = AviFile::read(&mut cursor).unwrap();
    assert_eq!(avi.main_header.total_frames, 1);
    let chunk = avi.video_chunks().next().copied().unwrap();
    let data = AviFile::read_chunk(&mut cursor, &chunk).unwrap();
    let pixels = MrleDecoder::new(geometry.visible.width, geometry.visible.height)
        .decode(&data)
        .unwrap();
    assert_eq!(pixels, visible_pixels(&geometry, &first));
}

#[test]
fn test_odd_audio_is_padded() {
    let params = tiny_params(mono8());
    let geometry = params.geometry;
    let mut writer = AviWriter::new(Cursor::new(Vec::new()), params).unwrap();
    writer.add_video_frame(&test_screen(&geometry, 0)).unwrap();
    writer.add_audio_samples(AudioSamples::U8(&[7, 7, 7])).unwrap();
    let bytes = writer.close().unwrap().into_inner();

    assert_eq!(bytes.len() % 2, 0);
    let avi = read_back(&bytes);
    let audio = avi.audio_chunks().next().unwrap();
    assert_eq!(audio.size, 3);
    assert_eq!(bytes[audio.data_offset as usize + 3], 0);
    assert_eq!(avi.index[1].size, 3);
}

#[test]
fn test_size_ceiling_keeps_complete_frames() {
    let params = tiny_params(mono8());
    let geometry = params.geometry;
    let screen = vec![1u8; geometry.frame_len()];

    // 4x4 solid screen encodes to 4 * 4 + 2 = 18 bytes; 4 audio bytes.
    // Each pair costs 26 + 12 bytes of chunks and 32 bytes of index.
    let per_pair = 8 + 18 + 8 + 4 + 32;
    let limit = HEADER_SIZE + 8 + 3 * per_pair + 10;
    let mut writer = AviWriter::new(Cursor::new(Vec::new()), params)
        .unwrap()
        .with_size_limit(limit);

    let mut stopped_at = None;
    for frame in 0..10 {
        writer.add_video_frame(&screen).unwrap();
        match writer.add_audio_samples(AudioSamples::U8(&[0; 4])) {
            Ok(_) => {}
            Err(e) => {
                assert!(e.is_size_limit());
                stopped_at = Some(frame);
                break;
            }
        }
    }
    assert_eq!(stopped_at, Some(3));
    assert!(writer.add_video_frame(&screen).is_err());

    let bytes = writer.close().unwrap().into_inner();
    assert!(bytes.len() as u64 <= limit);
    let avi = read_back(&bytes);
    assert_eq!(avi.main_header.total_frames, 3);
    assert_eq!(avi.video.as_ref().unwrap().header.length, 3);
    assert_eq!(avi.riff_size as usize, bytes.len() - 8);
    avi.verify_index().unwrap();
}

#[test]
fn test_header_totals_after_close() {
    let params = tiny_params(mono16());
    let geometry = params.geometry;
    let mut writer = AviWriter::new(Cursor::new(Vec::new()), params).unwrap();
    for n in 0..4 {
        writer.add_video_frame(&test_screen(&geometry, n)).unwrap();
        writer.add_audio_samples(AudioSamples::I16(&[0; 735])).unwrap();
    }
    assert_eq!(writer.stats().frames, 4);
    assert!((writer.elapsed_secs() - 4.0 / 59.92).abs() < 0.001);
    let bytes = writer.close().unwrap().into_inner();

    let avi = read_back(&bytes);
    let audio = avi.audio.as_ref().unwrap();
    assert_eq!(audio.header.length, 4 * 735);
    assert_eq!(audio.header.sample_size, 2);
    assert_eq!(audio.format.bits_per_sample, 16);
    assert_eq!(avi.main_header.width, 4);
    assert_eq!(avi.main_header.height, 4);
    assert_eq!(
        avi.movi_size as u64,
        bytes.len() as u64 - 8 - 4 * 32 - MOVI_FOURCC_OFFSET
    );
    let idx1 = find_fourcc(&bytes, b"idx1", HEADER_SIZE as usize).unwrap();
    assert_eq!(idx1 as u64, MOVI_FOURCC_OFFSET + avi.movi_size as u64);
}

#[test]
fn test_file_backed_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("movie.avi");
    let params = atari_params(mono16());
    let geometry = params.geometry;

    let mut writer = AviWriter::create(&path, params).unwrap();
    for n in 0..3 {
        writer.add_audio_samples(AudioSamples::I16(&[n; 882])).unwrap();
        writer.add_video_frame(&test_screen(&geometry, n as u32)).unwrap();
    }
    writer.close().unwrap();

    let avi = AviFile::open(&path).unwrap();
    assert_eq!(avi.main_header.total_frames, 3);
    assert_eq!(avi.file_size, std::fs::metadata(&path).unwrap().len());
    avi.verify_index().unwrap();
}
