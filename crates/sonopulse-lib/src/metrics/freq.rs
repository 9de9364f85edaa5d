use crate::config::PipelineConfig;
use crate::signal::IbiSeries;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

/// Spectral HRV metrics plus the one-sided spectrum they were read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyDomainMetrics {
    /// Power in the low-frequency band (ms²).
    pub lf_power: f64,
    /// Power in the high-frequency band (ms²).
    pub hf_power: f64,
    /// lf/hf, exactly 0 when hf is 0.
    pub lf_hf_ratio: f64,
    /// Frequency axis (Hz), kept for inspection/plotting.
    pub freqs: Vec<f64>,
    /// Power spectral density at each retained frequency.
    pub psd: Vec<f64>,
}

/// Frequency-domain HRV over a cleaned IBI series; `None` below ten
/// intervals or on a degenerate time axis.
///
/// The unevenly spaced series is placed on its cumulative time axis,
/// cubic-spline resampled onto a uniform grid, mean-detrended, and
/// transformed with a real FFT. Band powers integrate the PSD over
/// half-open bands with the trapezoidal rule.
pub fn frequency_domain(ibi: &IbiSeries, cfg: &PipelineConfig) -> Option<FrequencyDomainMetrics> {
    if ibi.ms.len() < cfg.min_freq_ibi || !(cfg.resample_hz > 0.0) {
        return None;
    }

    // cumulative time axis in seconds, shifted to start at zero
    let mut times = Vec::with_capacity(ibi.ms.len());
    let mut acc = 0.0;
    for &v in &ibi.ms {
        acc += v;
        times.push(acc / 1000.0);
    }
    let t0 = times[0];
    for t in times.iter_mut() {
        *t -= t0;
    }

    let spline = CubicSpline::fit(&times, &ibi.ms)?;
    let step = 1.0 / cfg.resample_hz;
    let t_end = *times.last()?;
    let mut uniform = Vec::new();
    let mut k = 0usize;
    loop {
        let t = k as f64 * step;
        if t >= t_end {
            break;
        }
        uniform.push(spline.eval(t));
        k += 1;
    }
    let n = uniform.len();
    if n < 2 {
        return None;
    }

    let mean = uniform.iter().sum::<f64>() / n as f64;
    for v in uniform.iter_mut() {
        *v -= mean;
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut uniform, &mut spectrum).ok()?;

    let freqs: Vec<f64> = (0..spectrum.len())
        .map(|k| k as f64 * cfg.resample_hz / n as f64)
        .collect();
    let psd: Vec<f64> = spectrum.iter().map(|c| c.norm_sqr() / n as f64).collect();

    let lf_power = band_power(&freqs, &psd, cfg.lf_band);
    let hf_power = band_power(&freqs, &psd, cfg.hf_band);
    let lf_hf_ratio = if hf_power > 0.0 { lf_power / hf_power } else { 0.0 };

    Some(FrequencyDomainMetrics {
        lf_power,
        hf_power,
        lf_hf_ratio,
        freqs,
        psd,
    })
}

/// Trapezoidal integral of the PSD over a half-open band [low, high).
fn band_power(freqs: &[f64], psd: &[f64], band: (f64, f64)) -> f64 {
    let pts: Vec<(f64, f64)> = freqs
        .iter()
        .zip(psd)
        .filter(|(f, _)| **f >= band.0 && **f < band.1)
        .map(|(&f, &p)| (f, p))
        .collect();
    if pts.len() < 2 {
        return 0.0;
    }
    let mut area = 0.0;
    for w in pts.windows(2) {
        area += 0.5 * (w[1].0 - w[0].0) * (w[0].1 + w[1].1);
    }
    area
}

/// Natural cubic spline through strictly increasing knots. Queries beyond
/// the knot range evaluate the nearest end polynomial, so extrapolation
/// never fails.
struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots.
    m: Vec<f64>,
}

impl CubicSpline {
    fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len();
        if n < 3 || n != ys.len() {
            return None;
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        // Thomas algorithm over the interior rows; natural boundary pins
        // m[0] = m[n-1] = 0
        let mut c_prime = vec![0.0; n];
        let mut d_prime = vec![0.0; n];
        for i in 1..n - 1 {
            let h_lo = xs[i] - xs[i - 1];
            let h_hi = xs[i + 1] - xs[i];
            let rhs = 6.0 * ((ys[i + 1] - ys[i]) / h_hi - (ys[i] - ys[i - 1]) / h_lo);
            let denom = 2.0 * (h_lo + h_hi) - h_lo * c_prime[i - 1];
            c_prime[i] = h_hi / denom;
            d_prime[i] = (rhs - h_lo * d_prime[i - 1]) / denom;
        }
        let mut m = vec![0.0; n];
        for i in (1..n - 1).rev() {
            m[i] = d_prime[i] - c_prime[i] * m[i + 1];
        }

        Some(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
        })
    }

    fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let mut seg = match self
            .xs
            .binary_search_by(|v| v.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        if seg >= n - 1 {
            seg = n - 2;
        }

        let h = self.xs[seg + 1] - self.xs[seg];
        let a = (self.xs[seg + 1] - x) / h;
        let b = (x - self.xs[seg]) / h;
        a * self.ys[seg]
            + b * self.ys[seg + 1]
            + ((a.powi(3) - a) * self.m[seg] + (b.powi(3) - b) * self.m[seg + 1]) * h * h / 6.0
    }
}
