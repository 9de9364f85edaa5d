use crate::pipeline::HrvResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three listening conditions, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Baseline,
    FavoriteSong,
    LeastFavoriteSong,
}

impl Condition {
    pub const ALL: [Condition; 3] = [
        Condition::Baseline,
        Condition::FavoriteSong,
        Condition::LeastFavoriteSong,
    ];

    /// Stable key used in file names and CSV columns.
    pub fn key(&self) -> &'static str {
        match self {
            Condition::Baseline => "baseline",
            Condition::FavoriteSong => "favorite_song",
            Condition::LeastFavoriteSong => "least_favorite_song",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Condition::Baseline => "Baseline",
            Condition::FavoriteSong => "Favorite Song",
            Condition::LeastFavoriteSong => "Least Favorite Song",
        }
    }

    pub fn from_key(key: &str) -> Option<Condition> {
        Condition::ALL.into_iter().find(|c| c.key() == key)
    }
}

/// The five headline metrics every downstream comparison runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MeanHr,
    Sdnn,
    Rmssd,
    LfHfRatio,
    PulseAmplitude,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::MeanHr,
        Metric::Sdnn,
        Metric::Rmssd,
        Metric::LfHfRatio,
        Metric::PulseAmplitude,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::MeanHr => "mean_hr",
            Metric::Sdnn => "sdnn",
            Metric::Rmssd => "rmssd",
            Metric::LfHfRatio => "lf_hf_ratio",
            Metric::PulseAmplitude => "pulse_amplitude",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Metric::MeanHr => "Heart Rate",
            Metric::Sdnn => "SDNN",
            Metric::Rmssd => "RMSSD",
            Metric::LfHfRatio => "LF/HF Ratio",
            Metric::PulseAmplitude => "Pulse Amplitude",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::MeanHr => "bpm",
            Metric::Sdnn | Metric::Rmssd => "ms",
            Metric::LfHfRatio => "",
            Metric::PulseAmplitude => "normalized",
        }
    }

    /// ANOVA significance threshold; deliberately looser for the two
    /// variability metrics.
    pub fn anova_alpha(&self) -> f64 {
        match self {
            Metric::Sdnn | Metric::Rmssd => 0.10,
            _ => 0.05,
        }
    }

    pub fn value_of(&self, result: &HrvResult) -> f64 {
        match self {
            Metric::MeanHr => result.mean_hr,
            Metric::Sdnn => result.sdnn,
            Metric::Rmssd => result.rmssd,
            Metric::LfHfRatio => result.lf_hf_ratio,
            Metric::PulseAmplitude => result.pulse_amplitude,
        }
    }
}

/// Per-subject result slots for the three conditions. A `None` slot means
/// the condition was recorded but yielded insufficient data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub baseline: Option<HrvResult>,
    pub favorite: Option<HrvResult>,
    pub least_favorite: Option<HrvResult>,
}

impl SubjectRecord {
    pub fn get(&self, condition: Condition) -> Option<&HrvResult> {
        match condition {
            Condition::Baseline => self.baseline.as_ref(),
            Condition::FavoriteSong => self.favorite.as_ref(),
            Condition::LeastFavoriteSong => self.least_favorite.as_ref(),
        }
    }

    pub fn set(&mut self, condition: Condition, result: Option<HrvResult>) {
        match condition {
            Condition::Baseline => self.baseline = result,
            Condition::FavoriteSong => self.favorite = result,
            Condition::LeastFavoriteSong => self.least_favorite = result,
        }
    }

    /// The matched triple, or `None` when any condition is missing.
    pub fn complete(&self) -> Option<(&HrvResult, &HrvResult, &HrvResult)> {
        match (&self.baseline, &self.favorite, &self.least_favorite) {
            (Some(b), Some(f), Some(l)) => Some((b, f, l)),
            _ => None,
        }
    }
}

/// All per-(subject, condition) results, keyed by subject id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudySet {
    pub subjects: BTreeMap<u32, SubjectRecord>,
}

impl StudySet {
    pub fn insert(&mut self, subject: u32, condition: Condition, result: Option<HrvResult>) {
        self.subjects
            .entry(subject)
            .or_default()
            .set(condition, result);
    }

    /// Subjects with all three conditions present, in id order.
    pub fn complete_subjects(&self) -> Vec<(u32, (&HrvResult, &HrvResult, &HrvResult))> {
        self.subjects
            .iter()
            .filter_map(|(&id, record)| record.complete().map(|triple| (id, triple)))
            .collect()
    }

    /// Matched per-condition vectors of one metric over complete subjects.
    pub fn matched_triples(&self, metric: Metric) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut baseline = Vec::new();
        let mut favorite = Vec::new();
        let mut least = Vec::new();
        for (_, (b, f, l)) in self.complete_subjects() {
            baseline.push(metric.value_of(b));
            favorite.push(metric.value_of(f));
            least.push(metric.value_of(l));
        }
        (baseline, favorite, least)
    }
}
