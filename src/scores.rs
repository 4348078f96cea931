//! Term scores of a group of sequences, normalized by the database
//!
//! These scores describe a group of sequences as a whole, e.g. for a word
//! cloud of the terms that are most specific to the group.
use std::collections::HashMap;

use tracing::debug;

use crate::annotations::{Annotation, AnnotationType, Context};
use crate::client::TermStats;
use crate::terms::{Term, TermAccumulator, TermWeights, CONTAMINATION};
use crate::AnnotationStore;
use crate::DbBactResult;
use crate::Sequence;

/// Number of annotations with a term, per experiment id
pub type ExperimentTermCounts = HashMap<u32, HashMap<Term, u32>>;

/// How the contributions of annotations to a term are combined
#[derive(Debug, Clone, Copy, Default)]
pub enum ScoreMethod<'a> {
    /// Sum of all contributions
    #[default]
    Sum,
    /// Every contribution is divided by the number of annotations of the
    /// same experiment that contain the term, so each experiment counts
    /// once on average
    ExperimentMean(&'a ExperimentTermCounts),
}

/// The scored terms of a single annotation
fn annotation_scores(annotation: &Annotation) -> Vec<(Term, f64)> {
    let base = match annotation.kind() {
        AnnotationType::Common | AnnotationType::HighFreq => Some(1.0),
        AnnotationType::Other => Some(0.5),
        AnnotationType::Contamination => return vec![(Term::new(CONTAMINATION), 1.0)],
        AnnotationType::DiffExp => None,
        kind => {
            debug!(
                "unknown annotation type {} encountered in {}, skipped",
                kind,
                annotation.id()
            );
            return Vec::new();
        }
    };
    annotation
        .details()
        .iter()
        .filter_map(|detail| match detail.context() {
            Context::All => Some((Term::new(detail.term()), 1.0)),
            Context::High => Some((Term::new(detail.term()), 2.0)),
            Context::Low => Some((Term::new(detail.term()).negated(), 1.0)),
            Context::Unknown(context) => {
                debug!(
                    "unknown detail type {} encountered in {}",
                    context,
                    annotation.id()
                );
                base.map(|score| (Term::new(detail.term()), score))
            }
        })
        .collect()
}

/// Counts the annotations per experiment and term
///
/// The result is the input of [`ScoreMethod::ExperimentMean`]
pub fn experiment_term_counts<'a, I>(annotations: I) -> ExperimentTermCounts
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let mut res: ExperimentTermCounts = HashMap::new();
    for annotation in annotations {
        let experiment = res.entry(annotation.experiment_id()).or_default();
        let mut terms: Vec<Term> = annotation_scores(annotation)
            .into_iter()
            .map(|(term, _)| term)
            .collect();
        terms.sort();
        terms.dedup();
        for term in terms {
            *experiment.entry(term).or_default() += 1;
        }
    }
    res
}

/// Scores the terms of the annotations
///
/// | annotation detail | score |
/// | --- | --- |
/// | `all` | 1 |
/// | `high` | 2 |
/// | `low` | 1, on the negated term `-term` |
///
/// `contamination` annotations score 1 on the term `contamination`. Details
/// with an unknown context score 1 for `common`/`highfreq` and 0.5 for
/// `other` annotations. Other annotation types are skipped.
///
/// # Examples
///
/// ```
/// use dbbact::{Annotation, AnnotationType, Context, Term};
/// use dbbact::scores::{term_scores, ScoreMethod};
///
/// let mut diff = Annotation::new(1u32.into(), AnnotationType::DiffExp);
/// diff.add_detail(Context::High, "feces");
/// diff.add_detail(Context::Low, "saliva");
///
/// let mut common = Annotation::new(2u32.into(), AnnotationType::Common);
/// common.add_detail(Context::All, "feces");
///
/// let scores = term_scores([&diff, &common], ScoreMethod::Sum);
/// assert_eq!(scores, vec![(Term::new("feces"), 3.0), (Term::new("-saliva"), 1.0)]);
/// ```
pub fn term_scores<'a, I>(annotations: I, method: ScoreMethod) -> TermWeights
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let mut acc = TermAccumulator::default();
    for annotation in annotations {
        for (term, score) in annotation_scores(annotation) {
            let scale = match method {
                ScoreMethod::Sum => 1.0,
                ScoreMethod::ExperimentMean(counts) => {
                    let count = counts
                        .get(&annotation.experiment_id())
                        .and_then(|terms| terms.get(&term))
                        .copied()
                        .unwrap_or_default();
                    if count == 0 {
                        debug!(
                            "scale factor 0 for {} in experiment {} ({})",
                            term,
                            annotation.experiment_id(),
                            annotation.id()
                        );
                        1.0
                    } else {
                        f64::from(count)
                    }
                }
            };
            acc.add(term.as_str(), score / scale);
        }
    }
    acc.into_weights()
}

/// Scores the terms of a group of sequences, relative to the whole database
///
/// The term scores of all annotations of every sequence are summed up and
/// divided by the number of sequences in the database that have the term.
/// Terms without database statistics are skipped.
///
/// # Errors
///
/// [`crate::DbBactError::UnknownAnnotation`] if an annotation is missing in the store
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use dbbact::client::TermStats;
/// use dbbact::scores::group_term_scores;
/// use dbbact::{Annotation, AnnotationStore, AnnotationType, Context, Sequence, Term};
///
/// let seq = Sequence::try_from("ACGT").unwrap();
/// let mut store = AnnotationStore::new();
/// let mut annotation = Annotation::new(1u32.into(), AnnotationType::Common);
/// annotation.add_detail(Context::All, "feces");
/// store.insert(annotation);
/// store.link(seq.clone(), 1u32.into());
///
/// let mut term_info = HashMap::new();
/// term_info.insert("feces".to_string(), TermStats { total_annotations: 10, total_sequences: 4 });
///
/// let scores = group_term_scores(&store, &[seq], &term_info).unwrap();
/// assert_eq!(scores, vec![(Term::new("feces"), 0.25)]);
/// ```
pub fn group_term_scores(
    store: &AnnotationStore,
    sequences: &[Sequence],
    term_info: &HashMap<String, TermStats>,
) -> DbBactResult<TermWeights> {
    let mut acc = TermAccumulator::default();
    for seq in sequences {
        for (term, score) in term_scores(store.annotations_of(seq)?, ScoreMethod::Sum) {
            acc.add(term.as_str(), score);
        }
    }

    Ok(acc
        .into_weights()
        .into_iter()
        .filter_map(|(term, score)| match term_info.get(term.as_str()) {
            Some(stats) if stats.total_sequences > 0 => {
                Some((term, score / f64::from(stats.total_sequences)))
            }
            _ => {
                debug!("no database statistics for {}, skipped", term);
                None
            }
        })
        .collect())
}

/// The fraction of the database annotations of each term that is observed
///
/// Terms with less than `min_annotations` annotations in the database
/// are skipped, their fractions are dominated by discretization.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use dbbact::client::TermStats;
/// use dbbact::scores::relative_term_frequencies;
/// use dbbact::{Term, DEFAULT_MIN_TERM_ANNOTATIONS};
///
/// let counts = vec![(Term::new("feces"), 2.0), (Term::new("fish"), 1.0)];
///
/// let mut term_info = HashMap::new();
/// term_info.insert("feces".to_string(), TermStats { total_annotations: 8, total_sequences: 100 });
/// term_info.insert("fish".to_string(), TermStats { total_annotations: 1, total_sequences: 3 });
///
/// let freqs = relative_term_frequencies(&counts, &term_info, DEFAULT_MIN_TERM_ANNOTATIONS);
/// assert_eq!(freqs, vec![(Term::new("feces"), 0.25)]);
/// ```
pub fn relative_term_frequencies(
    counts: &[(Term, f64)],
    term_info: &HashMap<String, TermStats>,
    min_annotations: u32,
) -> TermWeights {
    counts
        .iter()
        .filter_map(|(term, count)| {
            let Some(stats) = term_info.get(term.as_str()) else {
                debug!("term {} not in term info", term);
                return None;
            };
            if stats.total_annotations < min_annotations {
                debug!(
                    "term {} has <{} ({}) total annotations",
                    term, min_annotations, stats.total_annotations
                );
                return None;
            }
            if *count == 0.0 {
                return None;
            }
            Some((term.clone(), count / f64::from(stats.total_annotations)))
        })
        .collect()
}
