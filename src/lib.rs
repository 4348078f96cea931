//! Term enrichment and term-sequence association scores for dbBact annotations
//!
//! dbBact collects annotations of bacterial 16S sequences: every annotation
//! describes a set of sequences with ontology terms, e.g. "common in feces"
//! or "high in saliva compared to feces". This crate contains the statistical
//! core that works on top of these annotations:
//!
//! - [`enrichment()`] tests which terms (or whole annotations) are over- or
//!   under-represented in one set of sequences compared to another, using a
//!   label permutation test with discrete FDR control ([`PermutationTest`]).
//! - [`TermScorer`] ranks sequences by how strongly they are associated with a
//!   single ontology term and its descendants.
//! - [`scores`] calculates database normalized term scores for a group of sequences.
//!
//! The crate does not talk to the dbBact REST API itself. Data is supplied
//! through the traits in [`client`] or directly as an [`AnnotationStore`].
//!
//! # Examples
//!
//! ```
//! use dbbact::{Annotation, AnnotationStore, AnnotationType, Context, PermutationTest, Sequence, TermType};
//!
//! let fg = Sequence::try_from("ACGTACGTAA").unwrap();
//! let bg1 = Sequence::try_from("TTTTACGTAC").unwrap();
//! let bg2 = Sequence::try_from("GGGGACGTAC").unwrap();
//!
//! let mut store = AnnotationStore::new();
//! let mut feces = Annotation::new(1u32.into(), AnnotationType::Common);
//! feces.add_detail(Context::All, "feces");
//! store.insert(feces);
//! store.link(fg.clone(), 1u32.into());
//!
//! let test = PermutationTest::default().alpha(1.0);
//! let enriched = dbbact::enrichment(
//!     &[fg],
//!     &[bg1, bg2],
//!     &store,
//!     TermType::Term,
//!     &test,
//! ).unwrap();
//!
//! assert_eq!(enriched[0].term(), "feces");
//! assert!(enriched[0].effect_size() > 0.0);
//! ```
use core::fmt::Debug;
use std::num::ParseIntError;
use thiserror::Error;

pub mod annotations;
pub mod association;
pub mod client;
pub mod enrichment;
pub mod features;
pub mod matrix;
pub mod scores;
pub mod sequence;
pub mod stats;
pub mod terms;

pub use annotations::{Annotation, AnnotationId, AnnotationStore, AnnotationType, Context};
pub use association::{TermAssociations, TermScorer};
pub use matrix::Matrix;
pub use enrichment::{enrichment, enrichment_from_source, EnrichmentReport, TermType};
pub use sequence::Sequence;
pub use stats::dsfdr::{FdrMethod, PermutationTest, Transform};
pub use stats::Enrichment;
pub use terms::Term;

/// Significance level of the discrete FDR correction
pub const DEFAULT_ALPHA: f64 = 0.1;
/// Number of label permutations of the enrichment test
pub const DEFAULT_NUM_PERMUTATIONS: usize = 1000;
/// Seed of the permutation test; pinned so that repeated requests agree
pub const DEFAULT_SEED: u64 = 2018;
/// Number of sequences reported per association bucket
pub const DEFAULT_NUM_TO_SHOW: usize = 10;
/// Minimum number of database annotations for relative term frequencies
pub const DEFAULT_MIN_TERM_ANNOTATIONS: u32 = 4;
const DEFAULT_NUM_DETAILS: usize = 4;

/// Main Error type for this crate
#[derive(Error, Debug, PartialEq)]
pub enum DbBactError {
    /// The background set is empty once the foreground sequences are removed
    #[error("No sequences remaining in background after removing the sequences of interest")]
    EmptyBackground,
    /// The enrichment was requested for something other than `term` or `annotation`
    #[error("unsupported term type: {0}")]
    InvalidTermType(String),
    /// An external client did not return data
    #[error("failed to fetch {message} (status {status})")]
    Fetch {
        /// status code reported by the client
        status: u16,
        /// what was requested
        message: String,
    },
    /// The string is not a DNA sequence
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    /// Failed to parse an integer
    #[error("unable to parse Integer")]
    ParseIntError,
    /// An annotation id is referenced but its record is missing
    #[error("annotation {0} does not exist")]
    UnknownAnnotation(AnnotationId),
    /// No annotation contains the ontology term
    #[error("term {0} not found")]
    TermNotFound(String),
    /// The database statistics for a term are missing
    #[error("no term statistics for {0}")]
    MissingTermStats(String),
    /// Matrix and label dimensions do not agree
    #[error("matrix has {columns} columns but {labels} labels were given")]
    DimensionMismatch {
        /// number of matrix columns
        columns: usize,
        /// number of labels
        labels: usize,
    },
    /// One of the two compared groups has no samples
    #[error("both groups need at least one sequence")]
    EmptyGroup,
    /// A test parameter is outside its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<ParseIntError> for DbBactError {
    fn from(_: ParseIntError) -> Self {
        DbBactError::ParseIntError
    }
}

/// Shortcut for `Result<T, DbBactError>`
pub type DbBactResult<T> = Result<T, DbBactError>;
