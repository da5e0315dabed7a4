use serde::{Deserialize, Serialize};

/// Cost and fidelity of one representation of one file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub bins: usize,
    pub frames: usize,
    pub relative_recon_error: f64,
    pub bytes_compressed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Everything measured for one input file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub file: String,
    pub input_sr: u32,
    pub duration_sec: f64,
    pub frames: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    pub fmax: f64,
    pub representations: Vec<Metric>,
}

impl FileAnalysis {
    pub fn representation(&self, name: &str) -> Option<&Metric> {
        self.representations.iter().find(|m| m.name == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

impl MeanStd {
    /// Mean and population standard deviation. Empty input gives zeros.
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let values: Vec<f64> = values.into_iter().collect();
        if values.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Self { mean, std: var.sqrt() }
    }
}

/// Per-representation statistics across files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub bins: MeanStd,
    pub frames: MeanStd,
    pub relative_recon_error: MeanStd,
    pub bytes_compressed: MeanStd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub file_count: usize,
    pub duration_sec: MeanStd,
    pub frames: MeanStd,
    pub representations: Vec<MetricSummary>,
}

/// Mean/std of every numeric field across files. Notes are taken from the
/// first file; representations are matched by name in first-file order.
pub fn aggregate(per_file: &[FileAnalysis]) -> Option<Aggregate> {
    let first = per_file.first()?;

    let representations = first
        .representations
        .iter()
        .map(|sample| {
            let metrics: Vec<&Metric> = per_file
                .iter()
                .filter_map(|f| f.representation(&sample.name))
                .collect();
            MetricSummary {
                name: sample.name.clone(),
                bins: MeanStd::of(metrics.iter().map(|m| m.bins as f64)),
                frames: MeanStd::of(metrics.iter().map(|m| m.frames as f64)),
                relative_recon_error: MeanStd::of(metrics.iter().map(|m| m.relative_recon_error)),
                bytes_compressed: MeanStd::of(metrics.iter().map(|m| m.bytes_compressed as f64)),
                note: sample.note.clone(),
            }
        })
        .collect();

    Some(Aggregate {
        file_count: per_file.len(),
        duration_sec: MeanStd::of(per_file.iter().map(|f| f.duration_sec)),
        frames: MeanStd::of(per_file.iter().map(|f| f.frames as f64)),
        representations,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub target_sr: u32,
    pub fmax: f64,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    pub pinv_rcond: f64,
}

/// A file that could not be analyzed, with the reason.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub file: String,
    pub error: String,
}

/// The document written to `analysis.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub settings: Settings,
    pub audio_files: Vec<String>,
    pub per_file: Vec<FileAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(name: &str, frames: usize, err: f64, bytes: usize) -> Metric {
        Metric {
            name: name.to_string(),
            bins: 80,
            frames,
            relative_recon_error: err,
            bytes_compressed: bytes,
            note: Some(format!("{} note", name)),
        }
    }

    fn file(name: &str, duration: f64, frames: usize, err: f64) -> FileAnalysis {
        FileAnalysis {
            file: name.to_string(),
            input_sr: 44100,
            duration_sec: duration,
            frames,
            n_fft: 2048,
            hop_length: 441,
            win_length: 2048,
            fmax: 20000.0,
            representations: vec![
                metric("stft", frames, 0.0, frames * 10),
                metric("mel", frames, err, frames),
            ],
        }
    }

    #[test]
    fn mean_std_population() {
        let s = MeanStd::of([101.0, 201.0, 301.0]);
        assert!((s.mean - 201.0).abs() < 1e-12);
        assert!((s.std - (20000.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn mean_std_single_and_empty() {
        assert_eq!(MeanStd::of([4.0]), MeanStd { mean: 4.0, std: 0.0 });
        assert_eq!(MeanStd::of(Vec::<f64>::new()), MeanStd { mean: 0.0, std: 0.0 });
    }

    #[test]
    fn aggregate_fields() {
        let files = vec![file("a", 1.0, 101, 0.2), file("b", 2.0, 201, 0.4), file("c", 3.0, 301, 0.6)];
        let agg = aggregate(&files).unwrap();
        assert_eq!(agg.file_count, 3);
        assert!((agg.duration_sec.mean - 2.0).abs() < 1e-12);
        assert!((agg.frames.mean - 201.0).abs() < 1e-12);
        assert_eq!(agg.representations.len(), 2);

        let mel = &agg.representations[1];
        assert_eq!(mel.name, "mel");
        assert!((mel.relative_recon_error.mean - 0.4).abs() < 1e-12);
        assert_eq!(mel.bins, MeanStd { mean: 80.0, std: 0.0 });
        assert_eq!(mel.note.as_deref(), Some("mel note"));

        let stft = &agg.representations[0];
        assert_eq!(stft.relative_recon_error, MeanStd { mean: 0.0, std: 0.0 });
    }

    #[test]
    fn aggregate_empty() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn report_json_shape() {
        let report = Report {
            settings: Settings {
                target_sr: 44100,
                fmax: 20000.0,
                n_fft: 2048,
                hop_length: 441,
                win_length: 2048,
                pinv_rcond: 1e-15,
            },
            audio_files: vec!["a.wav".into()],
            per_file: vec![file("a.wav", 1.0, 101, 0.1)],
            aggregate: None,
            failures: Vec::new(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("aggregate").is_none());
        assert!(value.get("failures").is_none());
        assert_eq!(value["per_file"][0]["representations"][1]["name"], "mel");
        assert_eq!(value["settings"]["target_sr"], 44100);
    }
}
