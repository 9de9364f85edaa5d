use crate::config::PipelineConfig;
use crate::signal::IbiSeries;

/// Drop physiologically implausible or discontinuous inter-beat intervals.
///
/// One left-to-right pass: intervals outside `[min_ibi_ms, max_ibi_ms]`
/// are discarded, and an interval is also discarded when its relative
/// change vs. the most recently *retained* interval exceeds
/// `max_ibi_change`. Rejected intervals never serve as the comparison
/// baseline for later candidates. Fewer than two input intervals are
/// returned unchanged.
pub fn clean_ibi(raw: &IbiSeries, cfg: &PipelineConfig) -> IbiSeries {
    if raw.ms.len() < 2 {
        return raw.clone();
    }

    // fold carrying the clean sequence built so far; each acceptance
    // decision reads only its last element
    let clean = raw
        .ms
        .iter()
        .fold(Vec::with_capacity(raw.ms.len()), |mut acc: Vec<f64>, &ibi| {
            if ibi < cfg.min_ibi_ms || ibi > cfg.max_ibi_ms {
                return acc;
            }
            if let Some(&last) = acc.last() {
                if (ibi - last).abs() / last > cfg.max_ibi_change {
                    return acc;
                }
            }
            acc.push(ibi);
            acc
        });

    IbiSeries::new(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn out_of_range_interval_is_dropped_and_not_compared_against() {
        let raw = IbiSeries::new(vec![800.0, 820.0, 790.0, 2000.0, 810.0]);
        let clean = clean_ibi(&raw, &cfg());
        // 2000 exceeds the ceiling; 810 is then judged against 790, not 2000
        assert_eq!(clean.ms, vec![800.0, 820.0, 790.0, 810.0]);
    }

    #[test]
    fn sudden_jump_is_dropped() {
        let raw = IbiSeries::new(vec![800.0, 1100.0, 810.0]);
        let clean = clean_ibi(&raw, &cfg());
        assert_eq!(clean.ms, vec![800.0, 810.0]);
    }

    #[test]
    fn short_input_passes_through_even_when_out_of_range() {
        let raw = IbiSeries::new(vec![2000.0]);
        let clean = clean_ibi(&raw, &cfg());
        assert_eq!(clean.ms, vec![2000.0]);
    }

    #[test]
    fn output_is_an_order_preserving_in_range_subsequence() {
        let raw = IbiSeries::new(vec![
            700.0, 720.0, 300.0, 710.0, 740.0, 1600.0, 760.0, 900.0, 770.0,
        ]);
        let clean = clean_ibi(&raw, &cfg());

        let mut cursor = raw.ms.iter();
        for v in &clean.ms {
            assert!(cursor.any(|r| r == v), "{v} out of order or missing");
        }
        for w in clean.ms.windows(2) {
            assert!((w[1] - w[0]).abs() / w[0] <= cfg().max_ibi_change);
        }
        for v in &clean.ms {
            assert!(*v >= cfg().min_ibi_ms && *v <= cfg().max_ibi_ms);
        }
    }

    #[test]
    fn rejection_resets_nothing_when_first_interval_is_bad() {
        let raw = IbiSeries::new(vec![300.0, 800.0, 810.0]);
        let clean = clean_ibi(&raw, &cfg());
        assert_eq!(clean.ms, vec![800.0, 810.0]);
    }
}
