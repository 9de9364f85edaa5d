use crate::config::PipelineConfig;
use crate::signal::{IbiSeries, Peaks, Signal};

/// Locate systolic peaks in a conditioned PPG segment and derive the raw
/// inter-beat-interval series.
///
/// The height threshold adapts to the segment: candidates must reach the
/// configured percentile of all amplitudes. Candidates closer than the
/// minimum distance are resolved by keeping the locally larger peak, and
/// survivors must clear the topographic prominence floor. Fewer than two
/// surviving peaks yield an empty IBI series, not an error.
pub fn detect_peaks(signal: &Signal, cfg: &PipelineConfig) -> (Peaks, IbiSeries) {
    if signal.data.len() < 3 {
        let peaks = Peaks::from_indices(Vec::new());
        let ibi = IbiSeries::new(Vec::new());
        return (peaks, ibi);
    }

    let min_gap = ((cfg.min_peak_distance_s * signal.fs).ceil() as usize).max(1);
    let height = percentile(&signal.data, cfg.height_percentile);

    let mut candidates = local_maxima(&signal.data);
    candidates.retain(|&i| signal.data[i] >= height);
    let spaced = suppress_close_peaks(&signal.data, &candidates, min_gap);
    let kept: Vec<usize> = spaced
        .into_iter()
        .filter(|&i| prominence(&signal.data, i) >= cfg.prominence)
        .collect();

    let peaks = Peaks::from_indices(kept);
    let ibi = IbiSeries::from_peaks(&peaks, signal.fs);
    (peaks, ibi)
}

/// Linear-interpolated percentile over the whole segment.
fn percentile(data: &[f64], pct: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Indices of strict local maxima; plateaus resolve to their midpoint.
fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let i_max = data.len() - 1;
    let mut i = 1;
    while i < i_max {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < i_max && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Non-maximum suppression: walk candidates from the tallest down and
/// discard any neighbour closer than `min_gap` samples.
fn suppress_close_peaks(data: &[f64], candidates: &[usize], min_gap: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        data[candidates[a]]
            .partial_cmp(&data[candidates[b]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = vec![true; candidates.len()];
    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 {
            k -= 1;
            if candidates[j] - candidates[k] >= min_gap {
                break;
            }
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < candidates.len() && candidates[k] - candidates[j] < min_gap {
            keep[k] = false;
            k += 1;
        }
    }

    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Topographic prominence: height above the higher of the two lowest
/// valleys reached before a taller sample (or the segment edge) on each
/// side.
fn prominence(data: &[f64], peak: usize) -> f64 {
    let height = data[peak];

    let mut left_min = height;
    let mut i = peak;
    while i > 0 {
        i -= 1;
        if data[i] > height {
            break;
        }
        if data[i] < left_min {
            left_min = data[i];
        }
    }

    let mut right_min = height;
    let mut i = peak + 1;
    while i < data.len() {
        if data[i] > height {
            break;
        }
        if data[i] < right_min {
            right_min = data[i];
        }
        i += 1;
    }

    height - left_min.max(right_min)
}
