//! File-based tests for the CLI runner

use loudness_cli::{apply_stream, CliConfig};
use loudness_control::SampleFormat;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use tempfile::TempDir;

fn write_f64(dir: &TempDir, name: &str, samples: &[f64]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn applies_gain_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("loudness.toml");
    let mut config_file = File::create(&config_path).unwrap();
    writeln!(
        config_file,
        r#"
[loudness]
integrated_loudness_lufs = -3.0
target_level_lufs = -23.0

[stream]
format = "F64LE"
rate = 44100
channels = 1
buffer_frames = 7
"#
    )
    .unwrap();

    let input = write_f64(&dir, "in.raw", &[0.5; 50]);
    let output = dir.path().join("out.raw");

    let config = CliConfig::load(Some(config_path.as_path())).unwrap();
    assert_eq!(config.stream.format, SampleFormat::F64Le);

    let summary = apply_stream(
        &config,
        BufReader::new(File::open(&input).unwrap()),
        BufWriter::new(File::create(&output).unwrap()),
    )
    .unwrap();

    // 50 mono frames in buffers of 7
    assert_eq!(summary.buffers, 8);
    assert_eq!(summary.gap_buffers, 0);
    assert!((summary.parameters.gain - 0.1).abs() < 1e-12);

    let bytes = fs::read(&output).unwrap();
    assert_eq!(bytes.len(), 50 * 8);
    for chunk in bytes.chunks_exact(8) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        assert!((f64::from_le_bytes(raw) - 0.05).abs() < 1e-12);
    }
}

#[test]
fn muting_writes_silence() {
    let dir = TempDir::new().unwrap();
    let input = write_f64(&dir, "in.raw", &[0.9; 64]);
    let output = dir.path().join("out.raw");

    let mut config = CliConfig::default();
    config.stream.format = SampleFormat::F64Le;
    config.stream.buffer_frames = 8;
    config.loudness.target_level_lufs = -1.0e6;

    let summary = apply_stream(
        &config,
        File::open(&input).unwrap(),
        File::create(&output).unwrap(),
    )
    .unwrap();

    assert_eq!(summary.buffers, 4);
    assert_eq!(summary.gap_buffers, 4);
    assert!(fs::read(&output).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn empty_input_produces_empty_output() {
    let dir = TempDir::new().unwrap();
    let input = write_f64(&dir, "in.raw", &[]);
    let output = dir.path().join("out.raw");

    let summary = apply_stream(
        &CliConfig::default(),
        File::open(&input).unwrap(),
        File::create(&output).unwrap(),
    )
    .unwrap();

    assert_eq!(summary.buffers, 0);
    assert!(fs::read(&output).unwrap().is_empty());
}
