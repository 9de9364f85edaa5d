use crate::classify::SubjectClassification;
use crate::stats::{AnovaRow, GroupSummaryRow};
use crate::study::{Condition, StudySet};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct DetailedRow<'a> {
    subject_id: u32,
    condition: &'a str,
    n_beats: usize,
    mean_hr_bpm: f64,
    sdnn_ms: f64,
    rmssd_ms: f64,
    lf_hf_ratio: f64,
    pulse_amplitude: f64,
}

/// One row per present (subject, condition) with the five headline
/// metrics. Degraded metrics serialize as NaN.
pub fn write_detailed_results(path: &Path, study: &StudySet) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for (&subject, record) in &study.subjects {
        for condition in Condition::ALL {
            let Some(result) = record.get(condition) else {
                continue;
            };
            writer.serialize(DetailedRow {
                subject_id: subject,
                condition: condition.key(),
                n_beats: result.n_beats,
                mean_hr_bpm: result.mean_hr,
                sdnn_ms: result.sdnn,
                rmssd_ms: result.rmssd,
                lf_hf_ratio: result.lf_hf_ratio,
                pulse_amplitude: result.pulse_amplitude,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// One row per metric with means, stds, percent changes, F statistic,
/// p-value, and the significance flag.
pub fn write_anova_results(path: &Path, rows: &[AnovaRow]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ClassificationRow<'a> {
    subject_id: u32,
    classification: &'a str,
    n_significant_metrics: usize,
    metric: &'a str,
    baseline: f64,
    favorite: f64,
    least_favorite: f64,
    favorite_change_pct: f64,
    least_favorite_change_pct: f64,
    mean_change_pct: f64,
    is_significant: bool,
}

/// One row per subject × metric with the verdict and the underlying
/// percent-change table.
pub fn write_classifications(path: &Path, classifications: &[SubjectClassification]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for subject in classifications {
        for change in &subject.changes {
            writer.serialize(ClassificationRow {
                subject_id: subject.subject,
                classification: subject.classification.label(),
                n_significant_metrics: subject.n_significant,
                metric: change.metric.key(),
                baseline: change.baseline,
                favorite: change.favorite,
                least_favorite: change.least_favorite,
                favorite_change_pct: change.favorite_change_pct,
                least_favorite_change_pct: change.least_favorite_change_pct,
                mean_change_pct: change.effect_size_pct,
                is_significant: change.significant,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Per-(condition, metric) descriptive statistics.
pub fn write_group_summary(path: &Path, rows: &[GroupSummaryRow]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
