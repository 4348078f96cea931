//! Statistical analyses for term enrichment
//!
//! This module contains the label permutation test that compares the weighted
//! term counts of two groups of sequences, and the false discovery rate
//! corrections applied on top of it.
//!
//! The permutation p-values of count data are discrete and often tied, which
//! makes the standard Benjamini-Hochberg procedure overly conservative.
//! [`dsfdr`] therefore defaults to the discrete FDR procedure that estimates
//! the number of false discoveries from the permutation null itself.

use crate::terms::Term;

pub mod dsfdr;
pub mod fdr;

/// An enriched term with its p-value and effect size
///
/// [`Enrichment`] is returned from [`crate::enrichment()`]. A positive effect
/// size means the term is higher in the foreground, a negative effect size
/// that it is higher in the background.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    term: Term,
    pvalue: f64,
    effect_size: f64,
}

impl Enrichment {
    /// Constructs an `Enrichment`
    pub fn new(term: Term, pvalue: f64, effect_size: f64) -> Self {
        Self {
            term,
            pvalue,
            effect_size,
        }
    }

    /// The label of the enriched term (or annotation summary)
    pub fn term(&self) -> &str {
        self.term.as_str()
    }

    /// Returns the permutation p-value of the enrichment
    ///
    /// The p-value indicates the probability that the difference
    /// occured by chance
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// Returns the difference of the mean term weight between foreground and background
    pub fn effect_size(&self) -> f64 {
        self.effect_size
    }

    /// Returns `true` if the term is higher in the foreground
    pub fn is_foreground(&self) -> bool {
        self.effect_size > 0.0
    }
}

/// Permutation statistics must be compared exactly, so tiny floating point
/// differences between equal sums are removed
pub(crate) fn round10(value: f64) -> f64 {
    (value * 1e10).round() / 1e10
}

/// We have to frequently divide by counts and need to return f64 values.
/// To ensure some kind of safety we use this method to panic in case of overflows.
pub(crate) fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n
        .try_into()
        .expect("cannot safely create f64 from large usize");
    intermediate.into()
}
