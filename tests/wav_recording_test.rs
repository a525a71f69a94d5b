//! Integration tests for WAV recordings

mod common;

use common::*;
use retrorec_lib::codec::AudioSamples;
use retrorec_lib::format::wav::{WavHeader, WavWriter};
use retrorec_lib::format::AudioFormat;
use retrorec_lib::util::SampleFormat;
use std::fs::File;
use std::io::{BufReader, Cursor};

#[test]
fn test_header_layout() {
    let format = AudioFormat::new(2, 22_050, SampleFormat::I16);
    let mut writer = WavWriter::new(Cursor::new(Vec::new()), format).unwrap();
    writer.write_samples(AudioSamples::I16(&[1, -1, 2, -2])).unwrap();
    let bytes = writer.close().unwrap().into_inner();

    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(le32(&bytes, 4) as usize, bytes.len() - 8);
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(le32(&bytes, 16), 16);
    assert_eq!(le16(&bytes, 20), 1);
    assert_eq!(le16(&bytes, 22), 2);
    assert_eq!(le32(&bytes, 24), 22_050);
    assert_eq!(le32(&bytes, 28), 22_050 * 4);
    assert_eq!(le16(&bytes, 32), 4);
    assert_eq!(le16(&bytes, 34), 16);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(le32(&bytes, 40), 8);
}

#[test]
fn test_zero_sample_file_parses() {
    let writer = WavWriter::new(Cursor::new(Vec::new()), mono8()).unwrap();
    let bytes = writer.close().unwrap().into_inner();

    let header = WavHeader::read(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(header.data_size, 0);
    assert_eq!(header.num_samples(), 0);
    assert_eq!(header.data_start, 44);
}

#[test]
fn test_odd_length_file_is_even() {
    let mut writer = WavWriter::new(Cursor::new(Vec::new()), mono8()).unwrap();
    for block in [&[1u8, 2, 3][..], &[4, 5][..], &[6, 7][..]] {
        writer.write_samples(AudioSamples::U8(block)).unwrap();
    }
    assert_eq!(writer.data_bytes(), 7);
    let bytes = writer.close().unwrap().into_inner();

    assert_eq!(bytes.len(), 44 + 8);
    assert_eq!(le32(&bytes, 40), 7);
    assert_eq!(le32(&bytes, 4), 44);

    let header = WavHeader::read(&mut Cursor::new(&bytes)).unwrap();
    assert_eq!(header.num_samples(), 7);
}

#[test]
fn test_file_backed_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sound.wav");

    let mut writer = WavWriter::create(&path, mono16()).unwrap();
    for _ in 0..10 {
        writer.write_samples(AudioSamples::I16(&[1000; 882])).unwrap();
    }
    assert!((writer.elapsed_secs() - 0.2).abs() < 1e-9);
    writer.close().unwrap();

    let header = WavHeader::read(&mut BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(header.num_samples(), 8820);
    assert!((header.duration_seconds() - 0.2).abs() < 1e-9);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 44 + 17_640);
}

#[test]
fn test_create_in_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("sound.wav");
    assert!(WavWriter::create(&path, mono8()).is_err());
    assert!(!path.exists());
}
