//! Extraction of weighted ontology terms from annotations
//!
//! Each annotation type contributes differently to the terms of its details:
//!
//! | annotation type | contribution per detail |
//! | --- | --- |
//! | `common` | 1 |
//! | `dominant` | 2 |
//! | `other` | 0.5 |
//! | `contamination` | 1 to the term `contamination`, details are ignored |
//! | `diffexp`, correlations | `all`: 1, `high`: 2, `low`: -2 |
//!
//! Negative totals are reported as the negated term (`-saliva`) with a
//! positive weight, so a weight is never negative.
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Display;

use tracing::debug;

use crate::annotations::{Annotation, AnnotationType, Context};

/// Prefix of terms that are lower in the annotated sequences
pub const LOWER_PREFIX: char = '-';

/// The synthetic term all contamination annotations count towards
pub const CONTAMINATION: &str = "contamination";

/// An ontology term, or the negated "lower in" form of it
///
/// # Examples
///
/// ```
/// use dbbact::Term;
///
/// let term = Term::new("feces");
/// assert!(!term.is_lower());
///
/// let lower = term.negated();
/// assert_eq!(lower.as_str(), "-feces");
/// assert!(lower.is_lower());
/// assert_eq!(lower.name(), "feces");
/// assert_eq!(lower.negated(), term);
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Term {
    inner: String,
}

impl Term {
    /// Constructs a new term from its label
    pub fn new<T: Into<String>>(label: T) -> Self {
        Self {
            inner: label.into(),
        }
    }

    /// The full label, including the `-` prefix for lower terms
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Returns `true` for "lower in" terms
    pub fn is_lower(&self) -> bool {
        self.inner.starts_with(LOWER_PREFIX)
    }

    /// The label without the `-` prefix
    pub fn name(&self) -> &str {
        self.inner
            .strip_prefix(LOWER_PREFIX)
            .unwrap_or(&self.inner)
    }

    /// Flips between the term and its "lower in" form
    pub fn negated(&self) -> Term {
        if self.is_lower() {
            Term::new(self.name())
        } else {
            Term::new(format!("{LOWER_PREFIX}{}", self.inner))
        }
    }
}

impl From<&str> for Term {
    fn from(label: &str) -> Self {
        Term::new(label)
    }
}

impl From<String> for Term {
    fn from(label: String) -> Self {
        Term::new(label)
    }
}

impl From<Term> for String {
    fn from(term: Term) -> Self {
        term.inner
    }
}

impl Borrow<str> for Term {
    fn borrow(&self) -> &str {
        &self.inner
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// `(term, weight)` pairs of a single sequence
pub type TermWeights = Vec<(Term, f64)>;

/// Sums weights per key while remembering the order keys were first seen
#[derive(Debug, Default)]
pub(crate) struct TermAccumulator {
    index: HashMap<String, usize>,
    totals: Vec<(String, f64)>,
}

impl TermAccumulator {
    pub fn add(&mut self, key: &str, weight: f64) {
        match self.index.get(key) {
            Some(idx) => self.totals[*idx].1 += weight,
            None => {
                self.index.insert(key.to_string(), self.totals.len());
                self.totals.push((key.to_string(), weight));
            }
        }
    }

    /// Resolves the sign of every total into the term label
    pub fn into_weights(self) -> TermWeights {
        self.totals
            .into_iter()
            .filter_map(|(key, total)| {
                if total > 0.0 {
                    Some((Term::new(key), total))
                } else if total < 0.0 {
                    Some((Term::new(key).negated(), total.abs()))
                } else {
                    debug!("Dropping {} with a net weight of 0", key);
                    None
                }
            })
            .collect()
    }
}

fn differential_weight(context: &Context) -> Option<f64> {
    match context {
        Context::All => Some(1.0),
        Context::High => Some(2.0),
        Context::Low => Some(-2.0),
        Context::Unknown(_) => None,
    }
}

/// Calculates the type-weighted term counts of the annotations of one sequence
///
/// Contributions of all annotations to the same term are summed before the
/// sign is resolved. Unknown annotation types and detail contexts are
/// skipped.
///
/// # Examples
///
/// ```
/// use dbbact::{Annotation, AnnotationType, Context, Term};
/// use dbbact::terms::annotation_term_counts;
///
/// let mut common = Annotation::new(1u32.into(), AnnotationType::Common);
/// common.add_detail(Context::All, "feces");
///
/// let mut diff = Annotation::new(2u32.into(), AnnotationType::DiffExp);
/// diff.add_detail(Context::High, "feces");
/// diff.add_detail(Context::Low, "saliva");
///
/// let counts = annotation_term_counts([&common, &diff]);
/// assert_eq!(counts, vec![(Term::new("feces"), 3.0), (Term::new("-saliva"), 2.0)]);
/// ```
pub fn annotation_term_counts<'a, I>(annotations: I) -> TermWeights
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let mut acc = TermAccumulator::default();
    for annotation in annotations {
        let weight = match annotation.kind() {
            AnnotationType::Common => 1.0,
            AnnotationType::Dominant => 2.0,
            AnnotationType::Other => 0.5,
            AnnotationType::Contamination => {
                acc.add(CONTAMINATION, 1.0);
                continue;
            }
            kind if kind.is_differential() => {
                for detail in annotation.details() {
                    match differential_weight(detail.context()) {
                        Some(weight) => acc.add(detail.term(), weight),
                        None => debug!(
                            "unknown detail type {} encountered in {}",
                            detail.context(),
                            annotation.id()
                        ),
                    }
                }
                continue;
            }
            kind => {
                debug!("unknown annotation type {} encountered in {}", kind, annotation.id());
                continue;
            }
        };
        for detail in annotation.details() {
            acc.add(detail.term(), weight);
        }
    }
    acc.into_weights()
}

/// Renders the one-line summary of an annotation
///
/// The summary is used as the counted unit when enrichment is calculated
/// for whole annotations instead of individual terms.
///
/// # Examples
///
/// ```
/// use dbbact::{Annotation, AnnotationType, Context};
/// use dbbact::terms::annotation_description;
///
/// let mut annotation = Annotation::new(1u32.into(), AnnotationType::Common);
/// annotation.add_detail(Context::All, "feces");
/// annotation.add_detail(Context::All, "homo sapiens");
///
/// assert_eq!(annotation_description(&annotation), "common  feces, homo sapiens");
/// ```
pub fn annotation_description(annotation: &Annotation) -> String {
    let mut desc = String::new();
    if !annotation.description().is_empty() {
        desc.push_str(annotation.description());
        desc.push_str(" (");
    }
    match annotation.kind() {
        AnnotationType::DiffExp => {
            let terms_in = |context: Context| {
                annotation
                    .details()
                    .iter()
                    .filter(|detail| *detail.context() == context)
                    .fold(String::new(), |mut acc, detail| {
                        acc.push_str(detail.term());
                        acc.push(' ');
                        acc
                    })
            };
            desc.push_str(" high in ");
            desc.push_str(&terms_in(Context::High));
            desc.push_str(" compared to ");
            desc.push_str(&terms_in(Context::Low));
            desc.push_str(" in ");
            desc.push_str(&terms_in(Context::All));
        }
        AnnotationType::Isa => {
            desc.push_str(" is a ");
            for detail in annotation.details() {
                desc.push_str(detail.term());
                desc.push(',');
            }
        }
        AnnotationType::Contamination => desc.push_str(CONTAMINATION),
        kind => {
            desc.push_str(kind.as_str());
            desc.push(' ');
            for detail in annotation.details() {
                desc.push(' ');
                desc.push_str(detail.term());
                desc.push(',');
            }
        }
    }
    if desc.ends_with(',') {
        desc.pop();
    }
    desc
}

/// Counts every annotation once, by its summary string
pub fn annotation_string_counts<'a, I>(annotations: I) -> TermWeights
where
    I: IntoIterator<Item = &'a Annotation>,
{
    annotations
        .into_iter()
        .map(|annotation| (Term::new(annotation_description(annotation)), 1.0))
        .collect()
}
