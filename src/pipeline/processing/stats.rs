//! Descriptive statistics with skip-missing semantics.

/// Mean, median and 75th percentile of a group's present values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub q3: f64,
}

impl Summary {
    /// `None` when no value is present.
    pub fn of<I>(values: I) -> Option<Summary>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut present: Vec<f64> = values.into_iter().flatten().collect();
        if present.is_empty() {
            return None;
        }
        present.sort_by(f64::total_cmp);
        let count = present.len();
        let mean = present.iter().sum::<f64>() / count as f64;
        Some(Summary {
            count,
            mean,
            median: quantile_sorted(&present, 0.5)?,
            q3: quantile_sorted(&present, 0.75)?,
        })
    }
}

/// Quantile with linear interpolation between closest ranks, over an
/// ascending slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Division that is undefined for a missing operand or a zero denominator.
pub fn ratio(value: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (value, denominator) {
        (Some(v), Some(d)) if d != 0.0 => Some(v / d),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_interpolate_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&sorted, 0.75), Some(3.25));
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&[7.0], 0.75), Some(7.0));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn summary_skips_missing_values() {
        let summary = Summary::of(vec![Some(4.0), None, Some(1.0), Some(3.0), Some(2.0)]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.q3, 3.25);
        assert_eq!(Summary::of(vec![None, None]), None);
    }

    #[test]
    fn ratio_is_undefined_on_zero_or_missing() {
        assert_eq!(ratio(Some(3.0), Some(2.0)), Some(1.5));
        assert_eq!(ratio(Some(3.0), Some(0.0)), None);
        assert_eq!(ratio(None, Some(2.0)), None);
        assert_eq!(ratio(Some(3.0), None), None);
    }
}
