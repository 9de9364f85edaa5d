use serde::{Deserialize, Serialize};

/// Conditioned PPG segment: samples at a uniform rate, already bandpass
/// filtered and z-score normalized by the acquisition stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl Signal {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Systolic peak locations as strictly increasing sample indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peaks {
    pub indices: Vec<usize>,
}

impl Peaks {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Inter-beat intervals (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IbiSeries {
    pub ms: Vec<f64>,
}

impl IbiSeries {
    pub fn new(ms: Vec<f64>) -> Self {
        Self { ms }
    }

    /// Consecutive peak gaps converted to milliseconds. Fewer than two
    /// peaks yield an empty series.
    pub fn from_peaks(peaks: &Peaks, fs: f64) -> Self {
        let mut ms = Vec::new();
        for w in peaks.indices.windows(2) {
            ms.push((w[1] - w[0]) as f64 / fs * 1000.0);
        }
        Self { ms }
    }

    pub fn len(&self) -> usize {
        self.ms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ibi_from_peaks_converts_sample_gaps() {
        let peaks = Peaks::from_indices(vec![0, 80, 160, 250]);
        let ibi = IbiSeries::from_peaks(&peaks, 100.0);
        assert_eq!(ibi.ms, vec![800.0, 800.0, 900.0]);
    }

    #[test]
    fn ibi_from_single_peak_is_empty() {
        let peaks = Peaks::from_indices(vec![42]);
        assert!(IbiSeries::from_peaks(&peaks, 100.0).is_empty());
    }
}
