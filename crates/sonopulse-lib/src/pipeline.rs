use crate::artifacts::clean_ibi;
use crate::config::PipelineConfig;
use crate::detectors::ppg::detect_peaks;
use crate::metrics::amplitude::{pulse_amplitude, PulseAmplitude};
use crate::metrics::freq::{frequency_domain, FrequencyDomainMetrics};
use crate::metrics::time::{time_domain, TimeDomainMetrics};
use crate::signal::{IbiSeries, Peaks, Signal};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Aggregate HRV result for one (subject, condition) recording.
///
/// Carries the five headline metrics plus the intermediate artifacts so
/// downstream consumers can trace every number back to its beats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrvResult {
    pub label: String,
    /// Clean beat-interval count the metrics were computed from.
    pub n_beats: usize,
    pub mean_hr: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    /// NaN when the segment had too few clean intervals for spectral
    /// analysis; the rest of the record is still valid.
    pub lf_hf_ratio: f64,
    pub pulse_amplitude: f64,
    pub peaks: Peaks,
    pub ibi_clean: IbiSeries,
    pub time: TimeDomainMetrics,
    pub frequency: Option<FrequencyDomainMetrics>,
    pub amplitude: Option<PulseAmplitude>,
}

/// Run the full per-segment pipeline: peak detection, interval cleaning,
/// and the three metric families.
///
/// `None` means "insufficient data", not an error: too few detected
/// peaks or too few clean intervals abort this segment with a logged
/// diagnostic while the caller's batch continues. A frequency-domain
/// shortfall only degrades `lf_hf_ratio` to NaN.
pub fn analyze(signal: &Signal, label: &str, cfg: &PipelineConfig) -> Option<HrvResult> {
    let (peaks, ibi_raw) = detect_peaks(signal, cfg);
    if peaks.len() < cfg.min_peaks {
        warn!("{label}: insufficient peaks detected ({})", peaks.len());
        return None;
    }

    let ibi_clean = clean_ibi(&ibi_raw, cfg);
    if ibi_clean.len() < cfg.min_clean_ibi {
        warn!(
            "{label}: insufficient clean IBI intervals ({} of {})",
            ibi_clean.len(),
            ibi_raw.len()
        );
        return None;
    }

    let Some(time) = time_domain(&ibi_clean) else {
        warn!(
            "{label}: time-domain analysis needs at least 2 intervals, got {}",
            ibi_clean.len()
        );
        return None;
    };

    let frequency = frequency_domain(&ibi_clean, cfg);
    if frequency.is_none() {
        debug!(
            "{label}: skipping frequency-domain analysis ({} clean intervals)",
            ibi_clean.len()
        );
    }
    let lf_hf_ratio = frequency.as_ref().map_or(f64::NAN, |f| f.lf_hf_ratio);

    let amplitude = pulse_amplitude(signal, &peaks);
    let pulse_amp = amplitude.as_ref().map_or(f64::NAN, |a| a.mean_amplitude);

    Some(HrvResult {
        label: label.to_string(),
        n_beats: ibi_clean.len(),
        mean_hr: time.mean_hr,
        sdnn: time.sdnn,
        rmssd: time.rmssd,
        lf_hf_ratio,
        pulse_amplitude: pulse_amp,
        peaks,
        ibi_clean,
        time,
        frequency,
        amplitude,
    })
}
