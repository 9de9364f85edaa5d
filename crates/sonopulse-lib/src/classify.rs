use crate::config::ClassifierConfig;
use crate::study::{Metric, StudySet, SubjectRecord};
use serde::{Deserialize, Serialize};

/// Heuristic responsiveness verdicts.
///
/// These come from fixed percent-change cutoffs, not from hypothesis
/// tests; the inferential path is `stats`. Keep the two apart when
/// reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Responsiveness {
    NonResponsive,
    Responsive,
    HighlyResponsive,
}

impl Responsiveness {
    pub fn label(&self) -> &'static str {
        match self {
            Responsiveness::NonResponsive => "NON_RESPONSIVE",
            Responsiveness::Responsive => "RESPONSIVE",
            Responsiveness::HighlyResponsive => "HIGHLY_RESPONSIVE",
        }
    }
}

/// Cross-condition change figures for one metric of one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricChange {
    pub metric: Metric,
    pub baseline: f64,
    pub favorite: f64,
    pub least_favorite: f64,
    pub favorite_change_pct: f64,
    pub least_favorite_change_pct: f64,
    pub favorite_vs_least_change_pct: f64,
    /// Mean of the three absolute percent changes.
    pub effect_size_pct: f64,
    pub significant: bool,
}

/// Per-subject verdict with the full per-metric change table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectClassification {
    pub subject: u32,
    pub classification: Responsiveness,
    pub n_significant: usize,
    pub significant_metrics: Vec<Metric>,
    pub changes: Vec<MetricChange>,
}

/// Percent change of `value` relative to `base`; 0 when the base is
/// exactly 0 rather than dividing by zero.
fn percent_change(base: f64, value: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        (value - base) / base * 100.0
    }
}

/// Classify one subject from their matched condition triple.
///
/// Subjects missing any condition return `None` and are excluded; they
/// are never scored as non-responsive.
pub fn classify_subject(
    subject: u32,
    record: &SubjectRecord,
    cfg: &ClassifierConfig,
) -> Option<SubjectClassification> {
    let (baseline, favorite, least) = record.complete()?;

    let mut changes = Vec::with_capacity(Metric::ALL.len());
    let mut significant_metrics = Vec::new();
    for metric in Metric::ALL {
        let b = metric.value_of(baseline);
        let f = metric.value_of(favorite);
        let l = metric.value_of(least);

        let favorite_change_pct = percent_change(b, f);
        let least_favorite_change_pct = percent_change(b, l);
        let favorite_vs_least_change_pct = percent_change(f, l);
        let effect_size_pct = (favorite_change_pct.abs()
            + least_favorite_change_pct.abs()
            + favorite_vs_least_change_pct.abs())
            / 3.0;

        // NaN-valued metrics (e.g. a degraded lf/hf ratio) compare false
        // here and simply never count as significant
        let significant = effect_size_pct >= cfg.effect_size_pct;
        if significant {
            significant_metrics.push(metric);
        }

        changes.push(MetricChange {
            metric,
            baseline: b,
            favorite: f,
            least_favorite: l,
            favorite_change_pct,
            least_favorite_change_pct,
            favorite_vs_least_change_pct,
            effect_size_pct,
            significant,
        });
    }

    let n_significant = significant_metrics.len();
    let classification = if n_significant >= cfg.highly_responsive_metrics {
        Responsiveness::HighlyResponsive
    } else if n_significant >= cfg.responsive_metrics {
        Responsiveness::Responsive
    } else {
        Responsiveness::NonResponsive
    };

    Some(SubjectClassification {
        subject,
        classification,
        n_significant,
        significant_metrics,
        changes,
    })
}

/// Classify every complete subject in the study, in id order.
pub fn classify_all(study: &StudySet, cfg: &ClassifierConfig) -> Vec<SubjectClassification> {
    study
        .subjects
        .iter()
        .filter_map(|(&id, record)| classify_subject(id, record, cfg))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::time::TimeDomainMetrics;
    use crate::pipeline::HrvResult;
    use crate::signal::{IbiSeries, Peaks};
    use crate::study::Condition;

    fn result_with(metrics: [f64; 5]) -> HrvResult {
        let [mean_hr, sdnn, rmssd, lf_hf_ratio, pulse_amplitude] = metrics;
        HrvResult {
            label: String::new(),
            n_beats: 20,
            mean_hr,
            sdnn,
            rmssd,
            lf_hf_ratio,
            pulse_amplitude,
            peaks: Peaks::from_indices(Vec::new()),
            ibi_clean: IbiSeries::new(Vec::new()),
            time: TimeDomainMetrics {
                mean_hr,
                mean_ibi: 60_000.0 / mean_hr,
                sdnn,
                rmssd,
                nn50: 0,
                pnn50: 0.0,
                ibi_range: 0.0,
                cv: 0.0,
            },
            frequency: None,
            amplitude: None,
        }
    }

    fn record(b: [f64; 5], f: [f64; 5], l: [f64; 5]) -> SubjectRecord {
        let mut record = SubjectRecord::default();
        record.set(Condition::Baseline, Some(result_with(b)));
        record.set(Condition::FavoriteSong, Some(result_with(f)));
        record.set(Condition::LeastFavoriteSong, Some(result_with(l)));
        record
    }

    #[test]
    fn effect_size_averages_all_three_comparisons() {
        let record = record(
            [70.0, 40.0, 30.0, 1.5, 1.0],
            [77.0, 40.0, 30.0, 1.5, 1.0],
            [63.0, 40.0, 30.0, 1.5, 1.0],
        );
        let c = classify_subject(1, &record, &ClassifierConfig::default()).unwrap();
        let hr = &c.changes[0];
        assert_eq!(hr.metric, Metric::MeanHr);
        assert!((hr.favorite_change_pct - 10.0).abs() < 1e-9);
        assert!((hr.least_favorite_change_pct - -10.0).abs() < 1e-9);
        assert!((hr.favorite_vs_least_change_pct - -18.181818181818183).abs() < 1e-9);
        assert!((hr.effect_size_pct - 12.727272727272728).abs() < 1e-9);
        assert!(hr.significant);
        assert_eq!(c.n_significant, 1);
        assert_eq!(c.classification, Responsiveness::NonResponsive);
    }

    #[test]
    fn three_moved_metrics_mean_highly_responsive() {
        let record = record(
            [70.0, 40.0, 30.0, 1.5, 1.0],
            [84.0, 52.0, 39.0, 1.5, 1.0],
            [63.0, 34.0, 25.0, 1.5, 1.0],
        );
        let c = classify_subject(7, &record, &ClassifierConfig::default()).unwrap();
        assert!(c.n_significant >= 3);
        assert_eq!(c.classification, Responsiveness::HighlyResponsive);
        assert!(c.significant_metrics.contains(&Metric::MeanHr));
        assert!(c.significant_metrics.contains(&Metric::Sdnn));
        assert!(c.significant_metrics.contains(&Metric::Rmssd));
    }

    #[test]
    fn zero_base_counts_as_zero_change() {
        let record = record(
            [70.0, 40.0, 30.0, 0.0, 1.0],
            [70.0, 40.0, 30.0, 2.0, 1.0],
            [70.0, 40.0, 30.0, 0.0, 1.0],
        );
        let c = classify_subject(3, &record, &ClassifierConfig::default()).unwrap();
        let ratio = &c.changes[3];
        assert_eq!(ratio.metric, Metric::LfHfRatio);
        assert_eq!(ratio.favorite_change_pct, 0.0);
        // favorite -> least uses the favorite as its own base
        assert!((ratio.favorite_vs_least_change_pct - -100.0).abs() < 1e-9);
        assert!(ratio.effect_size_pct.is_finite());
    }

    #[test]
    fn nan_metric_never_counts_as_significant() {
        let record = record(
            [70.0, 40.0, 30.0, f64::NAN, 1.0],
            [70.0, 40.0, 30.0, f64::NAN, 1.0],
            [70.0, 40.0, 30.0, f64::NAN, 1.0],
        );
        let c = classify_subject(4, &record, &ClassifierConfig::default()).unwrap();
        let ratio = &c.changes[3];
        assert!(ratio.effect_size_pct.is_nan());
        assert!(!ratio.significant);
    }

    #[test]
    fn incomplete_subjects_are_excluded() {
        let mut record = record(
            [70.0, 40.0, 30.0, 1.5, 1.0],
            [77.0, 40.0, 30.0, 1.5, 1.0],
            [63.0, 40.0, 30.0, 1.5, 1.0],
        );
        record.set(Condition::FavoriteSong, None);
        assert!(classify_subject(9, &record, &ClassifierConfig::default()).is_none());
    }
}
