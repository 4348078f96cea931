//! Terms x sequences matrices of two groups of sequences
use std::collections::HashMap;

use tracing::debug;

use crate::matrix::Matrix;
use crate::terms::{Term, TermWeights};
use crate::DbBactError;
use crate::DbBactResult;
use crate::Sequence;

/// Assigns every term a stable row index, in the order terms are first seen
///
/// # Examples
///
/// ```
/// use dbbact::features::TermIndex;
/// use dbbact::Term;
///
/// let mut index = TermIndex::new();
/// assert_eq!(index.insert(&Term::new("feces")), 0);
/// assert_eq!(index.insert(&Term::new("-feces")), 1);
/// assert_eq!(index.insert(&Term::new("feces")), 0);
///
/// assert_eq!(index.len(), 2);
/// assert_eq!(index.get("-feces"), Some(1));
/// assert_eq!(index.term(1).unwrap().as_str(), "-feces");
/// ```
#[derive(Debug, Default, Clone)]
pub struct TermIndex {
    rows: HashMap<Term, usize>,
    terms: Vec<Term>,
}

impl TermIndex {
    /// Constructs a new, empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row of the term, adding it to the index if necessary
    pub fn insert(&mut self, term: &Term) -> usize {
        if let Some(row) = self.rows.get(term) {
            return *row;
        }
        let row = self.terms.len();
        self.rows.insert(term.clone(), row);
        self.terms.push(term.clone());
        row
    }

    /// The row of the term, if it is part of the index
    pub fn get(&self, term: &str) -> Option<usize> {
        self.rows.get(term).copied()
    }

    /// The term of the given row
    pub fn term(&self, row: usize) -> Option<&Term> {
        self.terms.get(row)
    }

    /// The number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the index contains no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// All terms, ordered by their row
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

/// Feature matrix of a foreground and a background group
///
/// Rows are terms, the first columns are the foreground sequences followed
/// by the background sequences. The labels are `true` for foreground columns.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    index: TermIndex,
    matrix: Matrix<f64>,
    labels: Vec<bool>,
}

impl FeatureTable {
    /// Builds the feature table of two groups of sequences
    ///
    /// `term_counts` contains the weighted terms of every sequence. The term
    /// index is built from all foreground, then all background sequences, so
    /// both groups share the same row for each term. Weights of terms that
    /// appear multiple times for a sequence are summed up.
    ///
    /// # Errors
    ///
    /// [`DbBactError::EmptyGroup`] if one of the groups is empty
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use dbbact::features::FeatureTable;
    /// use dbbact::{Sequence, Term};
    ///
    /// let a = Sequence::try_from("AAAA").unwrap();
    /// let b = Sequence::try_from("CCCC").unwrap();
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert(a.clone(), vec![(Term::new("feces"), 1.0)]);
    /// counts.insert(b.clone(), vec![(Term::new("saliva"), 2.0), (Term::new("feces"), 0.5)]);
    ///
    /// let table = FeatureTable::build(&[a], &[b], &counts).unwrap();
    /// assert_eq!(table.matrix().dim(), (2, 2));
    /// assert_eq!(table.matrix().row(0), &[1.0, 0.5]);
    /// assert_eq!(table.matrix().row(1), &[0.0, 2.0]);
    /// assert_eq!(table.labels(), &[true, false]);
    /// ```
    pub fn build(
        foreground: &[Sequence],
        background: &[Sequence],
        term_counts: &HashMap<Sequence, TermWeights>,
    ) -> DbBactResult<Self> {
        if foreground.is_empty() || background.is_empty() {
            return Err(DbBactError::EmptyGroup);
        }
        let mut index = TermIndex::new();
        for seq in foreground.iter().chain(background) {
            for (term, _) in term_counts.get(seq).into_iter().flatten() {
                index.insert(term);
            }
        }

        let fg_matrix = group_matrix(&index, foreground, term_counts);
        let bg_matrix = group_matrix(&index, background, term_counts);
        debug!(
            "created terms x sequences matrices with {} terms, {} foreground and {} background sequences",
            index.len(),
            fg_matrix.n_cols(),
            bg_matrix.n_cols()
        );

        let matrix = fg_matrix
            .hstack(&bg_matrix)
            .expect("both groups share the term index");
        let mut labels = vec![false; matrix.n_cols()];
        labels[..foreground.len()].fill(true);

        Ok(Self {
            index,
            matrix,
            labels,
        })
    }

    /// The shared term index
    pub fn index(&self) -> &TermIndex {
        &self.index
    }

    /// The terms, in row order
    pub fn terms(&self) -> &[Term] {
        self.index.terms()
    }

    /// The terms x sequences matrix
    pub fn matrix(&self) -> &Matrix<f64> {
        &self.matrix
    }

    /// `true` for foreground columns, `false` for background columns
    pub fn labels(&self) -> &[bool] {
        &self.labels
    }
}

fn group_matrix(
    index: &TermIndex,
    group: &[Sequence],
    term_counts: &HashMap<Sequence, TermWeights>,
) -> Matrix<f64> {
    let mut matrix = Matrix::zeros(index.len(), group.len());
    for (col, seq) in group.iter().enumerate() {
        for (term, weight) in term_counts.get(seq).into_iter().flatten() {
            let row = index
                .get(term.as_str())
                .expect("the index contains the terms of all sequences");
            matrix.add(row, col, *weight);
        }
    }
    matrix
}
