/// Sum of entry counts, saturating at `u64::MAX` instead of overflowing.
pub fn saturating_total<I: IntoIterator<Item = u64>>(counts: I) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}

/// Adds `n` to a running total, saturating at `u64::MAX`.
pub fn tally(total: &mut u64, n: u64) {
    *total = total.saturating_add(n);
}

/// Mean and population standard deviation of a series of counts.
/// An empty series gives `(0.0, 0.0)`.
pub fn spread<I: IntoIterator<Item = u64>>(counts: I) -> (f64, f64) {
    let values: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    (mean, variance.sqrt())
}

/// Key with the largest value; ties go to the first key in iteration order.
pub fn peak<'a, K, I>(totals: I) -> Option<K>
where
    K: Clone + 'a,
    I: IntoIterator<Item = (&'a K, &'a u64)>,
{
    let mut best: Option<(&K, u64)> = None;
    for (key, &value) in totals {
        if best.is_none_or(|(_, top)| value > top) {
            best = Some((key, value));
        }
    }
    best.map(|(key, _)| key.clone())
}
