/// Configurable parameters for the PPG peak detection + HRV pipeline.
///
/// One immutable value is passed explicitly into every stage so each can
/// be unit-tested in isolation.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Sampling frequency of conditioned segments (Hz).
    pub fs: f64,
    /// Minimum distance between systolic peaks (seconds).
    pub min_peak_distance_s: f64,
    /// Percentile of the segment amplitudes used as the height threshold.
    pub height_percentile: f64,
    /// Minimum topographic prominence, in normalized-signal units.
    pub prominence: f64,
    /// Physiological inter-beat-interval floor (ms).
    pub min_ibi_ms: f64,
    /// Physiological inter-beat-interval ceiling (ms).
    pub max_ibi_ms: f64,
    /// Maximum relative change vs. the last retained interval.
    pub max_ibi_change: f64,
    /// Uniform resampling rate for spectral analysis (Hz).
    pub resample_hz: f64,
    /// Low-frequency band, half-open [low, high) in Hz.
    pub lf_band: (f64, f64),
    /// High-frequency band, half-open [low, high) in Hz.
    pub hf_band: (f64, f64),
    /// Fewer detected peaks than this aborts the segment.
    pub min_peaks: usize,
    /// Fewer clean intervals than this aborts the segment.
    pub min_clean_ibi: usize,
    /// Fewer clean intervals than this skips spectral analysis only.
    pub min_freq_ibi: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fs: 100.0,
            min_peak_distance_s: 0.4,
            height_percentile: 50.0,
            prominence: 0.3,
            min_ibi_ms: 400.0,
            max_ibi_ms: 1500.0,
            max_ibi_change: 0.20,
            resample_hz: 4.0,
            lf_band: (0.04, 0.15),
            hf_band: (0.15, 0.40),
            min_peaks: 10,
            min_clean_ibi: 5,
            min_freq_ibi: 10,
        }
    }
}

/// Thresholds for the heuristic responsiveness classification.
///
/// The effect-size cutoff is a fixed percent-change heuristic, not a
/// statistically validated significance level.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Mean absolute percent change at which a metric counts as responsive.
    pub effect_size_pct: f64,
    /// Significant-metric count for the RESPONSIVE label.
    pub responsive_metrics: usize,
    /// Significant-metric count for the HIGHLY_RESPONSIVE label.
    pub highly_responsive_metrics: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            effect_size_pct: 10.0,
            responsive_metrics: 2,
            highly_responsive_metrics: 3,
        }
    }
}
