use std::io::Read;
use std::path::{Path, PathBuf};

use hrmel::analysis::{analyze_paths, collect_audio_files, write_report, BatchOptions};
use hrmel::config::AnalysisSettings;
use hrmel::extract::{run_extract, Metadata, PAYLOAD_FILE, SUMMARY_FILE};
use hrmel::mel::BandSet;
use hrmel::{Error, PipelineConfig};

/// Write a mono 16-bit WAV with a two-tone signal.
fn write_wav(path: &Path, sample_rate: u32, secs: f64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (sample_rate as f64 * secs).round() as usize;
    for i in 0..n {
        let t = i as f64 / sample_rate as f64;
        let v = 0.4 * (2.0 * std::f64::consts::PI * 220.0 * t).sin()
            + 0.1 * (2.0 * std::f64::consts::PI * 5000.0 * t).sin();
        writer.write_sample((v * i16::MAX as f64) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn quiet() -> BatchOptions {
    BatchOptions::default()
}

fn three_files(dir: &Path) -> Vec<PathBuf> {
    for (name, secs) in [("a.wav", 1.0), ("b.wav", 2.0), ("c.wav", 3.0)] {
        write_wav(&dir.join(name), 44_100, secs);
    }
    collect_audio_files(dir).unwrap()
}

#[test]
fn aggregate_over_three_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = three_files(dir.path());
    assert_eq!(files.len(), 3);

    let report = analyze_paths(&files, &PipelineConfig::default(), &quiet()).unwrap();
    let frames: Vec<usize> = report.per_file.iter().map(|f| f.frames).collect();
    assert_eq!(frames, vec![101, 201, 301]);

    let agg = report.aggregate.as_ref().expect("aggregate for multiple files");
    assert_eq!(agg.file_count, 3);
    assert!((agg.frames.mean - 201.0).abs() < 1e-9);
    assert!((agg.frames.std - (20_000.0f64 / 3.0).sqrt()).abs() < 1e-9);
    assert!((agg.duration_sec.mean - 2.0).abs() < 1e-9);

    let hr = agg.representations.iter().find(|m| m.name == "hr_mel").unwrap();
    assert_eq!(hr.bins.mean, 96.0);
    assert_eq!(hr.note.as_deref(), Some("40/32/24 bins (log1p/log1p/sqrt_log1p)"));
    assert!(report.failures.is_empty());
}

#[test]
fn per_file_representations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.wav");
    write_wav(&path, 44_100, 1.0);

    let report = analyze_paths(&[path], &PipelineConfig::default(), &quiet()).unwrap();
    assert!(report.aggregate.is_none());
    let file = &report.per_file[0];
    assert_eq!(file.input_sr, 44_100);
    assert_eq!(file.duration_sec, 1.0);

    let stft = file.representation("stft").unwrap();
    assert_eq!(stft.bins, 1025);
    assert_eq!(stft.relative_recon_error, 0.0);

    assert_eq!(file.representation("mel").unwrap().bins, 80);
    assert_eq!(file.representation("mel_96").unwrap().bins, 96);
    assert_eq!(file.representation("log_mel_96").unwrap().bins, 96);
    assert_eq!(file.representation("hr_mel").unwrap().bins, 96);

    let mel = file.representation("mel").unwrap().relative_recon_error;
    let log_mel = file.representation("log_mel").unwrap().relative_recon_error;
    assert!((mel - log_mel).abs() < 1e-6);
}

#[test]
fn fmax_clipped_at_low_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("low.wav");
    write_wav(&path, 16_000, 0.5);

    let settings = AnalysisSettings {
        sample_rate: 16_000,
        ..Default::default()
    };
    let bands = BandSet::new(vec![
        "0:1500:40:log1p".parse().unwrap(),
        "1500:20000:24:sqrt_log1p".parse().unwrap(),
    ])
    .unwrap();
    let config = PipelineConfig::new(&settings, bands).unwrap();
    assert_eq!(config.fmax(), 8000.0);

    let report = analyze_paths(&[path], &config, &quiet()).unwrap();
    assert_eq!(report.per_file[0].fmax, 8000.0);
    assert_eq!(report.settings.fmax, 8000.0);
    assert_eq!(report.per_file[0].representation("hr_mel").unwrap().bins, 64);
}

#[test]
fn empty_directory_not_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("readme.txt"), "no audio here").unwrap();
    assert!(collect_audio_files(dir.path()).unwrap_err().is_not_found());
}

#[test]
fn missing_input_not_found() {
    let dir = tempfile::tempdir().unwrap();
    assert!(collect_audio_files(&dir.path().join("missing")).unwrap_err().is_not_found());
}

#[test]
fn corrupt_file_skipped_by_default() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("a.wav"), 44_100, 1.0);
    std::fs::write(dir.path().join("b.wav"), b"definitely not a riff header").unwrap();
    let files = collect_audio_files(dir.path()).unwrap();

    let report = analyze_paths(&files, &PipelineConfig::default(), &quiet()).unwrap();
    assert_eq!(report.audio_files.len(), 2);
    assert_eq!(report.per_file.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].file.ends_with("b.wav"));
}

#[test]
fn fail_fast_reports_earliest_failing_file() {
    let dir = tempfile::tempdir().unwrap();
    // The long first file keeps one worker busy while later files finish
    write_wav(&dir.path().join("f0.wav"), 44_100, 20.0);
    std::fs::write(dir.path().join("f1.wav"), b"definitely not a riff header").unwrap();
    write_wav(&dir.path().join("f2.wav"), 44_100, 0.2);
    write_wav(&dir.path().join("f3.wav"), 44_100, 0.2);
    std::fs::write(dir.path().join("f4.wav"), b"junk").unwrap();
    let files = collect_audio_files(dir.path()).unwrap();

    let options = BatchOptions {
        fail_fast: true,
        jobs: 2,
        ..Default::default()
    };
    for _ in 0..3 {
        let err = analyze_paths(&files, &PipelineConfig::default(), &options).unwrap_err();
        match err {
            Error::File { file, .. } => assert!(file.ends_with("f1.wav"), "{}", file),
            other => panic!("expected a file error, got {}", other),
        }
    }
}

#[test]
fn all_files_failing_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.wav"), b"junk").unwrap();
    let files = collect_audio_files(dir.path()).unwrap();
    assert!(analyze_paths(&files, &PipelineConfig::default(), &quiet()).is_err());
}

#[test]
fn report_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.wav");
    write_wav(&path, 44_100, 0.5);
    let options = BatchOptions {
        jobs: 2,
        ..Default::default()
    };
    let report = analyze_paths(&[path], &PipelineConfig::default(), &options).unwrap();

    let out = write_report(&report, &dir.path().join("output")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(value["settings"]["n_fft"], 2048);
    assert_eq!(value["settings"]["hop_length"], 441);
    assert_eq!(value["per_file"][0]["representations"].as_array().unwrap().len(), 6);
}

#[test]
fn extract_writes_payload_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("song.wav");
    write_wav(&input, 44_100, 2.0);
    let out_dir = dir.path().join("output");

    let summary = run_extract(&input, &out_dir, &PipelineConfig::default()).unwrap();
    assert_eq!(summary.hr_mel_encoded, [96, 201]);
    assert_eq!(summary.input_sr, 44_100);
    assert_eq!(summary.duration_sec, 2.0);
    assert_eq!(summary.bands.len(), 3);
    assert!(out_dir.join(SUMMARY_FILE).exists());

    let file = std::fs::File::open(out_dir.join(PAYLOAD_FILE)).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();

    let mut npy = Vec::new();
    archive.by_name("encoded.npy").unwrap().read_to_end(&mut npy).unwrap();
    let header_len = u16::from_le_bytes([npy[8], npy[9]]) as usize;
    assert_eq!(npy.len(), 10 + header_len + 96 * 201 * 4);

    let mut meta = String::new();
    archive.by_name("meta.json").unwrap().read_to_string(&mut meta).unwrap();
    let meta: Metadata = serde_json::from_str(&meta).unwrap();
    assert_eq!(meta.n_mels, 96);
    assert_eq!(meta.hop_length, 441);
}
