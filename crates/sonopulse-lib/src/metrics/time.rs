use crate::signal::IbiSeries;
use serde::{Deserialize, Serialize};

/// Beat-interval statistics over a cleaned IBI series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeDomainMetrics {
    /// Mean heart rate (bpm).
    pub mean_hr: f64,
    /// Mean inter-beat interval (ms).
    pub mean_ibi: f64,
    /// Sample standard deviation of the intervals (ms).
    pub sdnn: f64,
    /// Root mean square of successive differences (ms).
    pub rmssd: f64,
    /// Successive differences larger than 50 ms.
    pub nn50: usize,
    /// nn50 as a percentage of all successive differences.
    pub pnn50: f64,
    /// max minus min interval (ms).
    pub ibi_range: f64,
    /// Coefficient of variation (%).
    pub cv: f64,
}

/// Time-domain HRV metrics; `None` below two intervals.
pub fn time_domain(ibi: &IbiSeries) -> Option<TimeDomainMetrics> {
    let n = ibi.ms.len();
    if n < 2 {
        return None;
    }

    let mean = ibi.ms.iter().sum::<f64>() / n as f64;
    let sum_sq: f64 = ibi.ms.iter().map(|x| (x - mean).powi(2)).sum();
    let sdnn = (sum_sq / (n as f64 - 1.0)).sqrt();
    // cv deliberately uses the population std while sdnn is
    // Bessel-corrected; keep the asymmetry
    let cv = (sum_sq / n as f64).sqrt() / mean * 100.0;

    let diffs: Vec<f64> = ibi.ms.windows(2).map(|w| w[1] - w[0]).collect();
    let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
    let nn50 = diffs.iter().filter(|d| d.abs() > 50.0).count();
    let pnn50 = nn50 as f64 / diffs.len() as f64 * 100.0;

    let max = ibi.ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = ibi.ms.iter().copied().fold(f64::INFINITY, f64::min);

    Some(TimeDomainMetrics {
        mean_hr: 60_000.0 / mean,
        mean_ibi: mean,
        sdnn,
        rmssd,
        nn50,
        pnn50,
        ibi_range: max - min,
        cv,
    })
}
