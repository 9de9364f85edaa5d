use crate::signal::{Peaks, Signal};
use serde::{Deserialize, Serialize};

/// Statistics over the signal values at the detected systolic peaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseAmplitude {
    pub mean_amplitude: f64,
    /// Sample standard deviation of the peak amplitudes.
    pub std_amplitude: f64,
    /// std/mean as a percentage; 0 when the mean is not positive.
    pub cv_amplitude: f64,
    /// The sampled amplitudes themselves, kept for export/plotting.
    pub amplitudes: Vec<f64>,
}

/// Pulse-amplitude statistics; `None` with no peaks.
pub fn pulse_amplitude(signal: &Signal, peaks: &Peaks) -> Option<PulseAmplitude> {
    if peaks.indices.is_empty() {
        return None;
    }

    let amplitudes: Vec<f64> = peaks.indices.iter().map(|&i| signal.data[i]).collect();
    let n = amplitudes.len() as f64;
    let mean = amplitudes.iter().sum::<f64>() / n;
    let std = (amplitudes.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    let cv = if mean > 0.0 { std / mean * 100.0 } else { 0.0 };

    Some(PulseAmplitude {
        mean_amplitude: mean,
        std_amplitude: std,
        cv_amplitude: cv,
        amplitudes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(data: Vec<f64>) -> Signal {
        Signal { fs: 100.0, data }
    }

    #[test]
    fn samples_signal_at_peak_indices() {
        let s = signal(vec![0.0, 1.0, 0.0, 1.2, 0.0, 0.8, 0.0]);
        let peaks = Peaks::from_indices(vec![1, 3, 5]);
        let m = pulse_amplitude(&s, &peaks).unwrap();
        assert_eq!(m.amplitudes, vec![1.0, 1.2, 0.8]);
        assert!((m.mean_amplitude - 1.0).abs() < 1e-12);
        assert!((m.std_amplitude - 0.2).abs() < 1e-12);
        assert!((m.cv_amplitude - 20.0).abs() < 1e-9);
    }

    #[test]
    fn no_peaks_is_insufficient() {
        let s = signal(vec![0.0; 10]);
        assert!(pulse_amplitude(&s, &Peaks::from_indices(Vec::new())).is_none());
    }

    #[test]
    fn non_positive_mean_pins_cv_to_zero() {
        let s = signal(vec![-1.0, -0.5, -1.5]);
        let peaks = Peaks::from_indices(vec![0, 1, 2]);
        let m = pulse_amplitude(&s, &peaks).unwrap();
        assert!(m.mean_amplitude < 0.0);
        assert_eq!(m.cv_amplitude, 0.0);
    }
}
