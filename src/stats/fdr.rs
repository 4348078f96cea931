//! Benjamini-Hochberg step-up procedure

/// Returns which hypotheses are rejected at the FDR level `alpha`
///
/// The p-values are sorted and the largest `k` with
/// `p(k) <= k / m * alpha` is searched. All hypotheses with a p-value up to
/// `p(k)` are rejected.
///
/// # Examples
///
/// ```
/// use dbbact::stats::fdr::benjamini_hochberg;
///
/// let pvalues = [0.01, 0.04, 0.03, 0.5];
/// assert_eq!(benjamini_hochberg(&pvalues, 0.1), vec![true, true, true, false]);
/// assert_eq!(benjamini_hochberg(&pvalues, 0.01), vec![false, false, false, false]);
/// ```
pub fn benjamini_hochberg(pvalues: &[f64], alpha: f64) -> Vec<bool> {
    let m = pvalues.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|a, b| pvalues[*a].total_cmp(&pvalues[*b]));

    let mut threshold = None;
    for (rank, idx) in order.iter().enumerate().rev() {
        // rank is zero-based
        #[allow(clippy::cast_precision_loss)]
        let limit = (rank + 1) as f64 / m as f64 * alpha;
        if pvalues[*idx] <= limit {
            threshold = Some(pvalues[*idx]);
            break;
        }
    }

    match threshold {
        Some(threshold) => pvalues.iter().map(|p| *p <= threshold).collect(),
        None => vec![false; m],
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty() {
        assert!(benjamini_hochberg(&[], 0.1).is_empty());
    }

    #[test]
    fn step_up() {
        // only 0.038 passes its own limit (4/5 * 0.05 = 0.04),
        // but all smaller ones are rejected as well
        let pvalues = [0.032, 0.015, 0.025, 0.038, 0.9];
        assert_eq!(
            benjamini_hochberg(&pvalues, 0.05),
            vec![true, true, true, true, false]
        );
    }

    #[test]
    fn ties() {
        let pvalues = [0.02, 0.02, 0.02];
        assert_eq!(benjamini_hochberg(&pvalues, 0.05), vec![true, true, true]);
        assert_eq!(benjamini_hochberg(&pvalues, 0.01), vec![false, false, false]);
    }
}
