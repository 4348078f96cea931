//! Label permutation test with discrete FDR control
//!
//! The test statistic of each term is the difference between the mean weight
//! in the foreground and the mean weight in the background. Its null
//! distribution is sampled by shuffling the group labels of the sequences.
//!
//! # Examples
//!
//! ```
//! use dbbact::{Matrix, PermutationTest};
//!
//! // 2 terms x 6 sequences, the first 3 sequences are the foreground
//! let matrix = Matrix::from_vec(2, 6, vec![
//!     4., 5., 6., 0., 0., 1.,
//!     1., 0., 1., 1., 0., 1.,
//! ]).unwrap();
//! let labels = [true, true, true, false, false, false];
//!
//! let res = PermutationTest::default().alpha(0.5).run(&matrix, &labels).unwrap();
//!
//! assert!((res.statistic()[0] - 14.0 / 3.0).abs() < 1e-9);
//! assert!(res.statistic()[1].abs() < 1e-9);
//! assert!(res.pvalues()[0] < res.pvalues()[1]);
//! assert!(!res.reject()[1]);
//! ```
use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker};
use tracing::debug;

use crate::matrix::Matrix;
use crate::stats::fdr::benjamini_hochberg;
use crate::stats::{f64_from_usize, round10};
use crate::DbBactError;
use crate::DbBactResult;
use crate::{DEFAULT_ALPHA, DEFAULT_NUM_PERMUTATIONS, DEFAULT_SEED};

/// Transformation of the term weights before the test statistic is calculated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transform {
    /// Use the weights as they are
    #[default]
    None,
    /// Replace the weights of each term by their ranks (ties get the average rank)
    Rank,
    /// `log2` of the weights, values below 2 are set to 2 first
    Log2,
    /// 1 for any positive weight, 0 otherwise
    Binary,
    /// Divide each weight by the sum of its sequence (column)
    Norm,
}

impl Transform {
    fn apply(self, matrix: &mut Matrix<f64>) {
        match self {
            Transform::None => {}
            Transform::Rank => {
                for row in 0..matrix.n_rows() {
                    let ranks =
                        Data::new(matrix.row(row).to_vec()).ranks(RankTieBreaker::Average);
                    matrix.row_mut(row).copy_from_slice(&ranks);
                }
            }
            Transform::Log2 => matrix.map_inplace(|value| *value = value.max(2.0).log2()),
            Transform::Binary => {
                matrix.map_inplace(|value| *value = if *value > 0.0 { 1.0 } else { 0.0 });
            }
            Transform::Norm => {
                let sums: Vec<f64> = matrix.cols().map(|col| col.sum::<f64>()).collect();
                for row in 0..matrix.n_rows() {
                    for (value, sum) in matrix.row_mut(row).iter_mut().zip(&sums) {
                        if *sum != 0.0 {
                            *value /= sum;
                        }
                    }
                }
            }
        }
    }
}

/// Multiple testing correction of the permutation p-values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FdrMethod {
    /// Discrete FDR
    ///
    /// Every permuted statistic gets a p-value as well. For each candidate
    /// threshold `c` (the observed p-values, largest first), the number of
    /// false discoveries is estimated from the permuted p-values `<= c`.
    /// The largest `c` with an estimated FDR `<= alpha` is used.
    #[default]
    DsFdr,
    /// Terms with identical permutation null distributions are grouped and
    /// Benjamini-Hochberg is applied within each group
    GroupedBh,
    /// Benjamini-Hochberg on all terms
    Bh,
}

/// Configuration of the label permutation test
///
/// # Examples
///
/// ```
/// use dbbact::{FdrMethod, PermutationTest, Transform};
///
/// let test = PermutationTest::default()
///     .alpha(0.05)
///     .num_permutations(500)
///     .seed(42)
///     .transform(Transform::Rank)
///     .fdr_method(FdrMethod::Bh);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationTest {
    alpha: f64,
    num_permutations: usize,
    seed: u64,
    transform: Transform,
    fdr_method: FdrMethod,
}

impl Default for PermutationTest {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            num_permutations: DEFAULT_NUM_PERMUTATIONS,
            seed: DEFAULT_SEED,
            transform: Transform::default(),
            fdr_method: FdrMethod::default(),
        }
    }
}

/// The outcome of [`PermutationTest::run`], one value per term (matrix row)
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationResult {
    reject: Vec<bool>,
    statistic: Vec<f64>,
    pvalues: Vec<f64>,
}

impl PermutationResult {
    /// `true` if the term is significant after FDR correction
    pub fn reject(&self) -> &[bool] {
        &self.reject
    }

    /// The mean difference between foreground and background
    pub fn statistic(&self) -> &[f64] {
        &self.statistic
    }

    /// The (uncorrected) permutation p-values
    pub fn pvalues(&self) -> &[f64] {
        &self.pvalues
    }

    /// The number of significant terms
    pub fn num_rejected(&self) -> usize {
        self.reject.iter().filter(|r| **r).count()
    }
}

impl PermutationTest {
    /// Sets the FDR level
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the number of label permutations
    pub fn num_permutations(mut self, num_permutations: usize) -> Self {
        self.num_permutations = num_permutations;
        self
    }

    /// Sets the seed of the random number generator
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the transformation of the term weights
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Sets the multiple testing correction
    pub fn fdr_method(mut self, fdr_method: FdrMethod) -> Self {
        self.fdr_method = fdr_method;
        self
    }

    fn validate(&self) -> DbBactResult<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(DbBactError::InvalidParameter(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if self.num_permutations == 0 {
            return Err(DbBactError::InvalidParameter(
                "at least one permutation is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Tests every row of the terms x sequences `matrix` for a difference
    /// between the columns labeled `true` and those labeled `false`
    ///
    /// # Errors
    ///
    /// - [`DbBactError::InvalidParameter`] if `alpha` is not in `(0, 1]` or no permutations are requested
    /// - [`DbBactError::DimensionMismatch`] if there is not exactly one label per column
    /// - [`DbBactError::EmptyGroup`] if all labels are identical
    pub fn run(&self, matrix: &Matrix<f64>, labels: &[bool]) -> DbBactResult<PermutationResult> {
        self.validate()?;
        let (n_terms, n_cols) = matrix.dim();
        if labels.len() != n_cols {
            return Err(DbBactError::DimensionMismatch {
                columns: n_cols,
                labels: labels.len(),
            });
        }
        let foreground: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter_map(|(idx, label)| label.then_some(idx))
            .collect();
        if foreground.is_empty() || foreground.len() == n_cols {
            return Err(DbBactError::EmptyGroup);
        }
        debug!(
            "permutation test of {} terms with {} foreground and {} background sequences",
            n_terms,
            foreground.len(),
            n_cols - foreground.len()
        );

        let mut data = matrix.clone();
        self.transform.apply(&mut data);

        let mean_diff = MeanDifference::new(&data, foreground.len());
        // each sequence becomes a contiguous row of term values
        let columns = data.transposed();

        let statistic = mean_diff.calculate(&columns, &foreground);
        let observed: Vec<f64> = statistic.iter().map(|s| round10(s.abs())).collect();
        let null = self.null_distribution(&mean_diff, &columns, foreground.len());

        let ranks = PermutationRanks::new(&observed, &null);
        let total = f64_from_usize(self.num_permutations + 1);
        let pvalues: Vec<f64> = ranks
            .observed
            .iter()
            .map(|k| f64_from_usize(*k) / total)
            .collect();

        let mut reject = match self.fdr_method {
            FdrMethod::DsFdr => match self.discrete_threshold(&ranks) {
                Some(threshold) => ranks.observed.iter().map(|k| *k <= threshold).collect(),
                None => vec![false; n_terms],
            },
            FdrMethod::GroupedBh => self.grouped_bh(&null, &pvalues),
            FdrMethod::Bh => benjamini_hochberg(&pvalues, self.alpha),
        };

        // terms without any difference are never significant
        for (reject, stat) in reject.iter_mut().zip(&observed) {
            *reject &= *stat > 0.0;
        }

        let res = PermutationResult {
            reject,
            statistic,
            pvalues,
        };
        if res.num_rejected() == 0 {
            debug!("no significant terms found");
        } else {
            debug!("{} significant terms", res.num_rejected());
        }
        Ok(res)
    }

    /// Samples the absolute statistic of all terms for every permutation
    ///
    /// Returns a terms x permutations matrix, each row sorted ascending
    fn null_distribution(
        &self,
        mean_diff: &MeanDifference,
        columns: &Matrix<f64>,
        n_foreground: usize,
    ) -> Matrix<f64> {
        let mut null = Matrix::zeros(mean_diff.len(), self.num_permutations);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..columns.n_rows()).collect();

        for perm in 0..self.num_permutations {
            order.shuffle(&mut rng);
            let permuted = mean_diff.calculate(columns, &order[..n_foreground]);
            for (term, value) in permuted.into_iter().enumerate() {
                null.set(term, perm, round10(value.abs()));
            }
        }
        for term in 0..null.n_rows() {
            null.row_mut(term).sort_by(f64::total_cmp);
        }
        null
    }

    /// Returns the largest rank whose estimated FDR is at most `alpha`
    #[allow(clippy::cast_precision_loss)]
    fn discrete_threshold(&self, ranks: &PermutationRanks) -> Option<usize> {
        let total = self.num_permutations + 1;
        let mut observed_hist = vec![0u64; total + 1];
        for k in &ranks.observed {
            observed_hist[*k] += 1;
        }
        let observed_cum = cumulative(&observed_hist);
        let null_cum = cumulative(&ranks.null_hist);

        for k in (1..=total).rev() {
            if observed_hist[k] == 0 {
                continue;
            }
            let real = observed_cum[k];
            let fdr = (real + null_cum[k]) as f64 / (real as f64 * total as f64);
            if fdr <= self.alpha {
                debug!("discrete FDR threshold p <= {}/{} (FDR {})", k, total, fdr);
                return Some(k);
            }
        }
        None
    }

    fn grouped_bh(&self, null: &Matrix<f64>, pvalues: &[f64]) -> Vec<bool> {
        let mut groups: HashMap<Vec<u64>, Vec<usize>> = HashMap::new();
        for (term, row) in null.rows().enumerate() {
            let key = row.iter().map(|value| value.to_bits()).collect();
            groups.entry(key).or_default().push(term);
        }
        debug!(
            "{} terms share {} distinct null distributions",
            pvalues.len(),
            groups.len()
        );

        let mut reject = vec![false; pvalues.len()];
        for members in groups.values() {
            let group_pvalues: Vec<f64> = members.iter().map(|term| pvalues[*term]).collect();
            for (term, rejected) in members
                .iter()
                .zip(benjamini_hochberg(&group_pvalues, self.alpha))
            {
                reject[*term] = rejected;
            }
        }
        reject
    }
}

/// Mean of the foreground columns minus mean of the background columns
struct MeanDifference {
    totals: Vec<f64>,
    n_foreground: f64,
    n_background: f64,
}

impl MeanDifference {
    fn new(data: &Matrix<f64>, n_foreground: usize) -> Self {
        Self {
            totals: data.rows().map(|row| row.iter().sum()).collect(),
            n_foreground: f64_from_usize(n_foreground),
            n_background: f64_from_usize(data.n_cols() - n_foreground),
        }
    }

    fn len(&self) -> usize {
        self.totals.len()
    }

    /// Calculates the statistic of all terms at once
    ///
    /// `columns` is the transposed matrix, so every foreground sequence adds
    /// one contiguous slice to the sums of all terms.
    fn calculate(&self, columns: &Matrix<f64>, foreground: &[usize]) -> Vec<f64> {
        let mut sums = vec![0.0; self.totals.len()];
        for col in foreground {
            for (sum, value) in sums.iter_mut().zip(columns.row(*col)) {
                *sum += value;
            }
        }
        sums.iter()
            .zip(&self.totals)
            .map(|(fg, total)| fg / self.n_foreground - (total - fg) / self.n_background)
            .collect()
    }
}

/// Permutation ranks of the observed and the permuted statistics
///
/// The rank `k` of a value is the number of values in the same row that are
/// at least as large, including the observed value, i.e. its p-value is
/// `k / (permutations + 1)`.
struct PermutationRanks {
    /// rank of the observed statistic of every term
    observed: Vec<usize>,
    /// how many permuted statistics have the rank `k`
    null_hist: Vec<u64>,
}

impl PermutationRanks {
    /// `null` must be sorted ascending within each row
    fn new(observed: &[f64], null: &Matrix<f64>) -> Self {
        let n = null.n_cols();
        let mut null_hist = vec![0u64; n + 2];
        let observed = observed
            .iter()
            .zip(null.rows())
            .map(|(obs, row)| {
                for value in row {
                    let at_least = n - row.partition_point(|x| x < value);
                    let k = at_least + usize::from(obs >= value);
                    null_hist[k] += 1;
                }
                1 + n - row.partition_point(|x| x < obs)
            })
            .collect();
        Self {
            observed,
            null_hist,
        }
    }
}

fn cumulative(hist: &[u64]) -> Vec<u64> {
    hist.iter()
        .scan(0u64, |acc, count| {
            *acc += count;
            Some(*acc)
        })
        .collect()
}
