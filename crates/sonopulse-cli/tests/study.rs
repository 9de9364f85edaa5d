use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct Summary {
    n_segments: usize,
    n_skipped: usize,
    n_subjects: usize,
    n_complete_subjects: usize,
    classifications: Vec<Classification>,
    anova: Vec<AnovaRow>,
}

#[derive(Deserialize)]
struct Classification {
    subject: u32,
    significant_metrics: Vec<String>,
}

#[derive(Deserialize)]
struct AnovaRow {
    metric: String,
    n_subjects: usize,
}

/// Gaussian pulse train with mild period jitter, like a conditioned PPG
/// segment after bandpass + z-score.
fn write_segment(path: &Path, base_period_s: f64, beats: usize) -> std::io::Result<()> {
    use std::f64::consts::PI;
    let fs = 100.0;
    let mut beat_times = Vec::with_capacity(beats);
    let mut t = 0.5;
    for i in 0..beats {
        beat_times.push(t);
        t += base_period_s * (1.0 + 0.015 * (i as f64 * 0.8).sin());
    }
    let duration = t + 1.0;
    let samples = (duration * fs) as usize;
    let mut out = String::with_capacity(samples * 8);
    for i in 0..samples {
        let time = i as f64 / fs;
        let mut v = 0.05 * (2.0 * PI * time).sin();
        for &bt in &beat_times {
            if (time - bt).abs() < 0.4 {
                v += 1.2 * (-0.5 * ((time - bt) / 0.05).powi(2)).exp();
            }
        }
        out.push_str(&format!("{v:.6}\n"));
    }
    fs::write(path, out)
}

#[test]
fn study_run_exports_results_and_excludes_incomplete_subjects() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("out");

    // three complete subjects with faster favorite / slower least-favorite
    for subject in 1..=3u32 {
        let base = 0.72 + 0.04 * subject as f64;
        write_segment(&dir.path().join(format!("s{subject}_baseline.txt")), base, 45)?;
        write_segment(
            &dir.path().join(format!("s{subject}_favorite_song.txt")),
            base * 0.9,
            50,
        )?;
        write_segment(
            &dir.path().join(format!("s{subject}_least_favorite_song.txt")),
            base * 1.1,
            40,
        )?;
    }
    // subject 4: flat favorite recording fails the peak gate, leaving the
    // subject incomplete
    write_segment(&dir.path().join("s4_baseline.txt"), 0.8, 45)?;
    fs::write(
        dir.path().join("s4_favorite_song.txt"),
        "0.0\n".repeat(6000),
    )?;
    write_segment(
        &dir.path().join("s4_least_favorite_song.txt"),
        0.88,
        40,
    )?;

    let dir_arg = dir.path().to_string_lossy().to_string();
    let out_arg = out_dir.to_string_lossy().to_string();
    let mut cmd = cargo_bin_cmd!("sonopulse");
    cmd.args([
        "study",
        "--dir",
        dir_arg.as_str(),
        "--out-dir",
        out_arg.as_str(),
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let summary: Summary = serde_json::from_slice(&out)?;

    assert_eq!(summary.n_segments, 12);
    assert_eq!(summary.n_skipped, 1);
    assert_eq!(summary.n_subjects, 4);
    assert_eq!(summary.n_complete_subjects, 3);

    // the incomplete subject is excluded, never scored non-responsive
    assert_eq!(summary.classifications.len(), 3);
    assert!(summary.classifications.iter().all(|c| c.subject != 4));
    for c in &summary.classifications {
        assert!(
            c.significant_metrics.iter().any(|m| m == "mean_hr"),
            "subject {} should flag the rate shift",
            c.subject
        );
    }

    let hr_row = summary
        .anova
        .iter()
        .find(|r| r.metric == "Heart Rate")
        .expect("heart-rate ANOVA row");
    assert_eq!(hr_row.n_subjects, 3);

    // detailed export: header + 11 analyzable segments
    let detailed = fs::read_to_string(out_dir.join("hrv_results_detailed.csv"))?;
    assert_eq!(detailed.lines().count(), 12);

    // classification export: header + 3 subjects × 5 metrics
    let classifications = fs::read_to_string(out_dir.join("subject_classifications.csv"))?;
    assert_eq!(classifications.lines().count(), 16);

    assert!(out_dir.join("anova_results.csv").exists());
    assert!(out_dir.join("hrv_results_group_summary.csv").exists());
    Ok(())
}
