use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use sonopulse_lib::{
    artifacts::clean_ibi,
    classify::{classify_all, SubjectClassification},
    config::{ClassifierConfig, PipelineConfig},
    detectors::ppg::detect_peaks,
    io::{csv as csv_io, text as text_io},
    metrics::{amplitude::pulse_amplitude, freq::frequency_domain, time::time_domain},
    pipeline::analyze,
    signal::{IbiSeries, Peaks, Signal},
    stats::{
        group_summary, nonparametric_tests, repeated_measures_anova, AnovaRow, NonParametricRow,
        ALPHA,
    },
    study::{Condition, StudySet},
};
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "sonopulse",
    version,
    about = "PPG → HRV music-response analysis tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect systolic peaks in a conditioned PPG segment read from
    /// stdin or --input
    DetectPeaks {
        #[arg(long, default_value_t = 100.0)]
        fs: f64,
        #[arg(long, default_value_t = 0.4)]
        min_distance_s: f64,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Apply the physiological artifact filter to an IBI series (ms)
    CleanIbi {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Time-domain HRV metrics from a clean IBI series (ms)
    HrvTime {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Frequency-domain HRV metrics from a clean IBI series (ms)
    HrvFreq {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = 4.0)]
        resample_hz: f64,
    },
    /// Pulse-amplitude statistics from a segment plus peak indices
    PulseAmplitude {
        #[arg(long, default_value_t = 100.0)]
        fs: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        peaks: PathBuf,
    },
    /// Full per-segment pipeline: peaks, cleaning, all metric families
    Analyze {
        #[arg(long, default_value_t = 100.0)]
        fs: f64,
        #[arg(long, default_value = "segment")]
        label: String,
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Whole-study run over a directory of conditioned segments named
    /// s<ID>_<condition>.txt, exporting CSV results
    Study {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 100.0)]
        fs: f64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::DetectPeaks {
            fs,
            min_distance_s,
            input,
        } => cmd_detect_peaks(fs, min_distance_s, input.as_deref())?,
        Commands::CleanIbi { input } => cmd_clean_ibi(input.as_deref())?,
        Commands::HrvTime { input } => cmd_hrv_time(input.as_deref())?,
        Commands::HrvFreq { input, resample_hz } => cmd_hrv_freq(input.as_deref(), resample_hz)?,
        Commands::PulseAmplitude { fs, input, peaks } => {
            cmd_pulse_amplitude(fs, input.as_deref(), &peaks)?
        }
        Commands::Analyze { fs, label, input } => cmd_analyze(fs, &label, input.as_deref())?,
        Commands::Study { dir, out_dir, fs } => cmd_study(&dir, &out_dir, fs)?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_series(&buf)
        }
    }
}

fn ibi_from_input(input: Option<&Path>) -> Result<IbiSeries> {
    Ok(IbiSeries::new(read_samples(input)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn cmd_detect_peaks(fs: f64, min_distance_s: f64, input: Option<&Path>) -> Result<()> {
    let signal = Signal {
        fs,
        data: read_samples(input)?,
    };
    let mut cfg = PipelineConfig::default();
    cfg.fs = fs;
    cfg.min_peak_distance_s = min_distance_s;
    let (peaks, ibi) = detect_peaks(&signal, &cfg);

    #[derive(Serialize)]
    struct Output {
        peaks: Peaks,
        ibi_ms: IbiSeries,
    }
    print_json(&Output { peaks, ibi_ms: ibi })
}

fn cmd_clean_ibi(input: Option<&Path>) -> Result<()> {
    let raw = ibi_from_input(input)?;
    let clean = clean_ibi(&raw, &PipelineConfig::default());
    print_json(&clean)
}

fn cmd_hrv_time(input: Option<&Path>) -> Result<()> {
    let ibi = ibi_from_input(input)?;
    // insufficient data prints null, matching the library's "no result
    // is a valid outcome" contract
    print_json(&time_domain(&ibi))
}

fn cmd_hrv_freq(input: Option<&Path>, resample_hz: f64) -> Result<()> {
    let ibi = ibi_from_input(input)?;
    let mut cfg = PipelineConfig::default();
    cfg.resample_hz = resample_hz;
    print_json(&frequency_domain(&ibi, &cfg))
}

fn cmd_pulse_amplitude(fs: f64, input: Option<&Path>, peaks_path: &Path) -> Result<()> {
    let signal = Signal {
        fs,
        data: read_samples(input)?,
    };
    let indices = text_io::read_indices(peaks_path)?;
    if let Some(&max) = indices.iter().max() {
        if max >= signal.len() {
            bail!("peak index {max} outside signal of {} samples", signal.len());
        }
    }
    let peaks = Peaks::from_indices(indices);
    print_json(&pulse_amplitude(&signal, &peaks))
}

fn cmd_analyze(fs: f64, label: &str, input: Option<&Path>) -> Result<()> {
    let signal = Signal {
        fs,
        data: read_samples(input)?,
    };
    let mut cfg = PipelineConfig::default();
    cfg.fs = fs;
    print_json(&analyze(&signal, label, &cfg))
}

/// Summary document the study command prints after writing its CSVs.
#[derive(Serialize)]
struct StudySummary {
    n_segments: usize,
    n_skipped: usize,
    n_subjects: usize,
    n_complete_subjects: usize,
    classifications: Vec<SubjectClassification>,
    anova: Vec<AnovaRow>,
    nonparametric: Vec<NonParametricRow>,
}

fn cmd_study(dir: &Path, out_dir: &Path, fs: f64) -> Result<()> {
    let mut cfg = PipelineConfig::default();
    cfg.fs = fs;

    let mut study = StudySet::default();
    let mut n_segments = 0usize;
    let mut n_skipped = 0usize;

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        let Some((subject, condition)) = parse_segment_name(&path) else {
            continue;
        };
        n_segments += 1;
        let label = format!("S{subject}-{}", condition.key());
        let data = match text_io::read_series(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("{label}: unreadable segment, skipping: {e:#}");
                n_skipped += 1;
                study.insert(subject, condition, None);
                continue;
            }
        };
        let signal = Signal { fs, data };
        let result = analyze(&signal, &label, &cfg);
        if result.is_none() {
            n_skipped += 1;
        }
        study.insert(subject, condition, result);
    }
    if n_segments == 0 {
        bail!("no s<ID>_<condition>.txt segments found in {}", dir.display());
    }
    info!(
        "analyzed {n_segments} segments ({n_skipped} skipped) across {} subjects",
        study.subjects.len()
    );

    let classifications = classify_all(&study, &ClassifierConfig::default());
    let anova = repeated_measures_anova(&study);
    let nonparametric = nonparametric_tests(&study, ALPHA);
    let summary = group_summary(&study);

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    csv_io::write_detailed_results(&out_dir.join("hrv_results_detailed.csv"), &study)?;
    csv_io::write_group_summary(&out_dir.join("hrv_results_group_summary.csv"), &summary)?;
    csv_io::write_anova_results(&out_dir.join("anova_results.csv"), &anova)?;
    csv_io::write_classifications(&out_dir.join("subject_classifications.csv"), &classifications)?;

    let n_complete_subjects = study.complete_subjects().len();
    print_json(&StudySummary {
        n_segments,
        n_skipped,
        n_subjects: study.subjects.len(),
        n_complete_subjects,
        classifications,
        anova,
        nonparametric,
    })
}

/// `s<ID>_<condition>.txt` → (subject id, condition).
fn parse_segment_name(path: &Path) -> Option<(u32, Condition)> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix('s')?;
    let (id, condition_key) = rest.split_once('_')?;
    let subject: u32 = id.parse().ok()?;
    let Some(condition) = Condition::from_key(condition_key) else {
        warn!("{}: unknown condition {condition_key:?}", path.display());
        return None;
    };
    Some((subject, condition))
}
