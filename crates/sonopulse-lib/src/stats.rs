use crate::study::{Condition, Metric, StudySet};
use log::warn;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal};
use thiserror::Error;

/// Significance level for the non-parametric battery.
pub const ALPHA: f64 = 0.05;

/// Matched triples below this count skip a metric instead of testing it.
pub const MIN_MATCHED_SUBJECTS: usize = 3;

/// A statistical test received input it cannot decide on. Callers log
/// and omit the single test; sibling tests proceed.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("degenerate sample: {0}")]
    Degenerate(&'static str),
    #[error("samples must have equal, nonzero length")]
    UnequalLength,
}

/// Friedman rank test over matched samples (average ranks, tie-corrected
/// chi-square, df = k - 1). Returns (chi2, p).
pub fn friedman_test(samples: &[&[f64]]) -> Result<(f64, f64), StatsError> {
    let k = samples.len();
    if k < 3 {
        return Err(StatsError::UnequalLength);
    }
    let n = samples[0].len();
    if n == 0 || samples.iter().any(|s| s.len() != n) {
        return Err(StatsError::UnequalLength);
    }
    if samples.iter().flat_map(|s| s.iter()).any(|v| !v.is_finite()) {
        return Err(StatsError::Degenerate("non-finite observation"));
    }

    let mut rank_sums = vec![0.0; k];
    let mut tie_term = 0.0;
    let mut row = vec![0.0; k];
    for i in 0..n {
        for (j, sample) in samples.iter().enumerate() {
            row[j] = sample[i];
        }
        let ranks = average_ranks(&row);
        for (j, r) in ranks.iter().enumerate() {
            rank_sums[j] += r;
        }
        tie_term += tie_correction_term(&row);
    }

    let n_f = n as f64;
    let k_f = k as f64;
    let ssbn: f64 = rank_sums.iter().map(|r| r * r).sum();
    let correction = 1.0 - tie_term / (n_f * k_f * (k_f * k_f - 1.0));
    if correction <= 0.0 {
        return Err(StatsError::Degenerate("every row is fully tied"));
    }
    let chi2 =
        ((12.0 / (n_f * k_f * (k_f + 1.0)) * ssbn - 3.0 * n_f * (k_f + 1.0)) / correction).max(0.0);

    let dist = ChiSquared::new(k_f - 1.0)
        .map_err(|_| StatsError::Degenerate("chi-squared degrees of freedom"))?;
    Ok((chi2, 1.0 - dist.cdf(chi2)))
}

/// Two-sided Wilcoxon signed-rank test for paired samples. Returns
/// (W, p) with W the smaller signed-rank sum.
///
/// Zero differences are dropped and the p-value uses the tie-corrected
/// normal approximation throughout; with the small cohorts this runs on,
/// the 0.05 decision is the contract, not exact tail mass.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<(f64, f64), StatsError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(StatsError::UnequalLength);
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(StatsError::Degenerate("non-finite observation"));
    }

    let diffs: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Err(StatsError::Degenerate("all paired differences are zero"));
    }

    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&abs);
    let w_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();

    let n_f = n as f64;
    let total = n_f * (n_f + 1.0) / 2.0;
    let w = w_plus.min(total - w_plus);
    let mean = total / 2.0;
    let variance = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_correction_term(&abs) / 48.0;
    if variance <= 0.0 {
        return Err(StatsError::Degenerate("zero variance in ranks"));
    }

    let z = (w - mean) / variance.sqrt();
    let normal =
        Normal::new(0.0, 1.0).map_err(|_| StatsError::Degenerate("standard normal"))?;
    let p = (2.0 * normal.cdf(-z.abs())).min(1.0);
    Ok((w, p))
}

/// One-way ANOVA across independent groups. Returns (F, p).
pub fn one_way_anova(groups: &[&[f64]]) -> Result<(f64, f64), StatsError> {
    let k = groups.len();
    if k < 2 || groups.iter().any(|g| g.is_empty()) {
        return Err(StatsError::UnequalLength);
    }
    if groups.iter().flat_map(|g| g.iter()).any(|v| !v.is_finite()) {
        return Err(StatsError::Degenerate("non-finite observation"));
    }

    let total_n: usize = groups.iter().map(|g| g.len()).sum();
    if total_n <= k {
        return Err(StatsError::Degenerate("not enough observations"));
    }

    let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / total_n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in groups {
        let m = mean(g);
        ss_between += g.len() as f64 * (m - grand).powi(2);
        ss_within += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }
    if ss_within <= 0.0 {
        return Err(StatsError::Degenerate("zero within-group variance"));
    }

    let df_between = (k - 1) as f64;
    let df_within = (total_n - k) as f64;
    let f = (ss_between / df_between) / (ss_within / df_within);
    let dist = FisherSnedecor::new(df_between, df_within)
        .map_err(|_| StatsError::Degenerate("F degrees of freedom"))?;
    Ok((f, 1.0 - dist.cdf(f)))
}

/// Ranks with ties sharing their average rank (1-based).
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Sum of (t^3 - t) over tie groups.
fn tie_correction_term(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut term = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        term += t * t * t - t;
        i = j + 1;
    }
    term
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0)).sqrt()
}

/// Non-parametric battery for one metric: Friedman over the three
/// conditions plus the three pairwise Wilcoxon tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonParametricRow {
    pub metric: Metric,
    pub n_subjects: usize,
    pub friedman_chi2: Option<f64>,
    pub friedman_p: Option<f64>,
    pub friedman_significant: Option<bool>,
    pub baseline_vs_favorite_p: Option<f64>,
    pub baseline_vs_least_favorite_p: Option<f64>,
    pub favorite_vs_least_favorite_p: Option<f64>,
}

/// Run the non-parametric battery per metric over matched triples.
/// Metrics with too few matched subjects are skipped; a failed single
/// test is logged and left empty while its siblings proceed.
pub fn nonparametric_tests(study: &StudySet, alpha: f64) -> Vec<NonParametricRow> {
    let mut rows = Vec::new();
    for metric in Metric::ALL {
        let (b, f, l) = study.matched_triples(metric);
        let n = b.len();
        if n < MIN_MATCHED_SUBJECTS {
            warn!(
                "{}: skipping group tests ({n} matched subjects)",
                metric.display()
            );
            continue;
        }

        let mut row = NonParametricRow {
            metric,
            n_subjects: n,
            friedman_chi2: None,
            friedman_p: None,
            friedman_significant: None,
            baseline_vs_favorite_p: None,
            baseline_vs_least_favorite_p: None,
            favorite_vs_least_favorite_p: None,
        };

        match friedman_test(&[&b, &f, &l]) {
            Ok((chi2, p)) => {
                row.friedman_chi2 = Some(chi2);
                row.friedman_p = Some(p);
                row.friedman_significant = Some(p < alpha);
            }
            Err(e) => warn!("{}: Friedman test failed: {e}", metric.display()),
        }

        let pairs = [
            (&b, &f, "baseline vs favorite"),
            (&b, &l, "baseline vs least favorite"),
            (&f, &l, "favorite vs least favorite"),
        ];
        let mut pair_ps = [None, None, None];
        for (slot, (x, y, label)) in pair_ps.iter_mut().zip(pairs) {
            match wilcoxon_signed_rank(x, y) {
                Ok((_, p)) => *slot = Some(p),
                Err(e) => warn!("{}: Wilcoxon {label} failed: {e}", metric.display()),
            }
        }
        row.baseline_vs_favorite_p = pair_ps[0];
        row.baseline_vs_least_favorite_p = pair_ps[1];
        row.favorite_vs_least_favorite_p = pair_ps[2];

        rows.push(row);
    }
    rows
}

/// One exported ANOVA row per metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnovaRow {
    pub metric: String,
    pub unit: String,
    pub threshold: f64,
    pub n_subjects: usize,
    pub baseline_mean: f64,
    pub baseline_std: f64,
    pub favorite_mean: f64,
    pub favorite_std: f64,
    pub least_favorite_mean: f64,
    pub least_favorite_std: f64,
    pub favorite_change_pct: f64,
    pub least_favorite_change_pct: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// One-way ANOVA per metric over matched triples, with each metric held
/// to its own significance threshold. Degenerate metrics (including ones
/// degraded to NaN upstream) are logged and omitted.
pub fn repeated_measures_anova(study: &StudySet) -> Vec<AnovaRow> {
    let mut rows = Vec::new();
    for metric in Metric::ALL {
        let (b, f, l) = study.matched_triples(metric);
        let n = b.len();
        if n < MIN_MATCHED_SUBJECTS {
            warn!("{}: skipping ANOVA ({n} matched subjects)", metric.display());
            continue;
        }

        let threshold = metric.anova_alpha();
        match one_way_anova(&[&b, &f, &l]) {
            Ok((f_stat, p)) => {
                let baseline_mean = mean(&b);
                let favorite_mean = mean(&f);
                let least_mean = mean(&l);
                rows.push(AnovaRow {
                    metric: metric.display().to_string(),
                    unit: metric.unit().to_string(),
                    threshold,
                    n_subjects: n,
                    baseline_mean,
                    baseline_std: sample_std(&b),
                    favorite_mean,
                    favorite_std: sample_std(&f),
                    least_favorite_mean: least_mean,
                    least_favorite_std: sample_std(&l),
                    favorite_change_pct: (favorite_mean - baseline_mean) / baseline_mean * 100.0,
                    least_favorite_change_pct: (least_mean - baseline_mean) / baseline_mean
                        * 100.0,
                    f_statistic: f_stat,
                    p_value: p,
                    significant: p < threshold,
                });
            }
            Err(e) => warn!("{}: ANOVA skipped: {e}", metric.display()),
        }
    }
    rows
}

/// Per-condition descriptive statistics for one metric over every
/// present (not only matched) result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummaryRow {
    pub condition: String,
    pub metric: String,
    pub n: usize,
    pub mean: f64,
    pub std: f64,
    pub sem: f64,
}

/// Descriptive group summary: mean, sample std, and standard error per
/// (condition, metric), skipping non-finite values.
pub fn group_summary(study: &StudySet) -> Vec<GroupSummaryRow> {
    let mut rows = Vec::new();
    for condition in Condition::ALL {
        for metric in Metric::ALL {
            let values: Vec<f64> = study
                .subjects
                .values()
                .filter_map(|record| record.get(condition))
                .map(|result| metric.value_of(result))
                .filter(|v| v.is_finite())
                .collect();
            if values.is_empty() {
                continue;
            }
            let std = sample_std(&values);
            rows.push(GroupSummaryRow {
                condition: condition.key().to_string(),
                metric: metric.key().to_string(),
                n: values.len(),
                mean: mean(&values),
                std,
                sem: std / (values.len() as f64).sqrt(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn ranks_average_over_ties() {
        let ranks = average_ranks(&[10.0, 20.0, 20.0, 5.0]);
        assert_eq!(ranks, vec![2.0, 3.5, 3.5, 1.0]);
    }

    #[test]
    fn friedman_detects_a_consistent_condition_shift() {
        // favorite consistently above, least consistently below
        let b = [70.0, 68.0, 72.0, 75.0, 71.0, 69.0];
        let f = [78.0, 74.0, 80.0, 82.0, 79.0, 77.0];
        let l = [64.0, 62.0, 66.0, 70.0, 65.0, 63.0];
        let (chi2, p) = friedman_test(&[&b, &f, &l]).unwrap();
        // perfect ordering across 6 rows: chi2 = 12, p ≈ 0.0025
        assert_close(chi2, 12.0, 1e-9);
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn friedman_on_identical_conditions_is_degenerate() {
        // fully tied rows cannot be ranked; the caller logs and omits
        let b = [70.0, 68.0, 72.0];
        assert!(friedman_test(&[&b, &b, &b]).is_err());
    }

    #[test]
    fn wilcoxon_flags_a_uniform_shift() {
        let a = [70.0, 68.0, 72.0, 75.0, 71.0, 69.0, 73.0, 74.0];
        let b: Vec<f64> = a.iter().map(|v| v + 6.0).collect();
        let (w, p) = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(w, 0.0);
        // all eight ranks tie at 4.5: z = -18/sqrt(40.5) ≈ -2.828,
        // two-sided p ≈ 0.0047
        assert_close(p, 0.004678, 1e-4);
    }

    #[test]
    fn wilcoxon_rejects_all_zero_differences() {
        let a = [70.0, 68.0, 72.0];
        assert!(wilcoxon_signed_rank(&a, &a).is_err());
    }

    #[test]
    fn anova_matches_a_hand_checked_fixture() {
        let g1 = [1.0, 2.0, 3.0];
        let g2 = [2.0, 3.0, 4.0];
        let g3 = [5.0, 6.0, 7.0];
        let (f, p) = one_way_anova(&[&g1, &g2, &g3]).unwrap();
        // grand mean 11/3; ss_between = 26 over 2 df, ss_within = 6 over 6 df
        assert_close(f, 13.0, 1e-9);
        assert!(p > 0.001 && p < 0.01, "p = {p}");
    }

    #[test]
    fn anova_rejects_non_finite_observations() {
        let g1 = [1.0, f64::NAN, 3.0];
        let g2 = [2.0, 3.0, 4.0];
        assert!(one_way_anova(&[&g1, &g2]).is_err());
    }

    #[test]
    fn anova_rejects_zero_within_group_variance() {
        let g1 = [1.0, 1.0, 1.0];
        let g2 = [2.0, 2.0, 2.0];
        assert!(one_way_anova(&[&g1, &g2]).is_err());
    }
}
