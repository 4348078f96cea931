//! Term enrichment between two groups of sequences
//!
//! The enrichment compares the weighted term counts of the annotations of a
//! foreground group (e.g. sequences higher in a condition) to those of a
//! background group, using the [`PermutationTest`].
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::client::AnnotationSource;
use crate::features::FeatureTable;
use crate::sequence::unique;
use crate::stats::Enrichment;
use crate::terms::{annotation_string_counts, annotation_term_counts};
use crate::AnnotationStore;
use crate::DbBactError;
use crate::DbBactResult;
use crate::PermutationTest;
use crate::Sequence;

/// The unit that is counted per sequence
///
/// # Examples
///
/// ```
/// use dbbact::TermType;
///
/// assert_eq!("term".parse::<TermType>().unwrap(), TermType::Term);
/// assert_eq!("annotation".parse::<TermType>().unwrap(), TermType::Annotation);
/// assert!("parentterm".parse::<TermType>().is_err());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TermType {
    /// Ontology terms, weighted by annotation type and context
    #[default]
    Term,
    /// Whole annotations, identified by their summary string
    Annotation,
}

impl FromStr for TermType {
    type Err = DbBactError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "term" => Ok(TermType::Term),
            "annotation" => Ok(TermType::Annotation),
            other => Err(DbBactError::InvalidTermType(other.to_string())),
        }
    }
}

impl Display for TermType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermType::Term => write!(f, "term"),
            TermType::Annotation => write!(f, "annotation"),
        }
    }
}

/// Removes duplicates and the foreground sequences from the background
fn split_groups(
    foreground: &[Sequence],
    background: &[Sequence],
) -> DbBactResult<(Vec<Sequence>, Vec<Sequence>)> {
    let foreground = unique(foreground);
    let in_foreground: HashSet<&Sequence> = foreground.iter().collect();
    let background = unique(background.iter().filter(|seq| !in_foreground.contains(seq)));

    if background.is_empty() {
        return Err(DbBactError::EmptyBackground);
    }
    if foreground.is_empty() {
        return Err(DbBactError::EmptyGroup);
    }
    Ok((foreground, background))
}

/// Returns the significantly enriched terms of `foreground` compared to `background`
///
/// Sequences that are part of both groups only count as foreground.
/// The result is sorted by effect size, from most enriched in the background
/// (negative) to most enriched in the foreground (positive).
///
/// # Errors
///
/// - [`DbBactError::EmptyBackground`] if no background sequences remain
/// - [`DbBactError::EmptyGroup`] if the foreground is empty
/// - [`DbBactError::UnknownAnnotation`] if the store is missing an annotation
/// - Errors from [`PermutationTest::run`] for invalid test parameters
///
/// # Examples
///
/// ```
/// use dbbact::{Annotation, AnnotationStore, AnnotationType, Context, PermutationTest, Sequence, TermType};
///
/// let fg = Sequence::try_from("ACGTACGTAA").unwrap();
/// let bg = Sequence::try_from("TTTTACGTAC").unwrap();
///
/// let err = dbbact::enrichment(
///     &[fg.clone()],
///     &[fg.clone()],
///     &AnnotationStore::new(),
///     TermType::Term,
///     &PermutationTest::default(),
/// );
/// assert!(err.is_err());
///
/// let mut store = AnnotationStore::new();
/// let mut annotation = Annotation::new(1u32.into(), AnnotationType::Common);
/// annotation.add_detail(Context::All, "feces");
/// store.insert(annotation);
/// store.link(fg.clone(), 1u32.into());
///
/// let res = dbbact::enrichment(&[fg], &[bg], &store, TermType::Term, &PermutationTest::default()).unwrap();
/// // a single sequence per group can't be significant
/// assert!(res.is_empty());
/// ```
pub fn enrichment(
    foreground: &[Sequence],
    background: &[Sequence],
    store: &AnnotationStore,
    term_type: TermType,
    test: &PermutationTest,
) -> DbBactResult<Vec<Enrichment>> {
    let (foreground, background) = split_groups(foreground, background)?;
    debug!(
        "{} enrichment of {} foreground vs {} background sequences",
        term_type,
        foreground.len(),
        background.len()
    );

    let mut term_counts = HashMap::with_capacity(foreground.len() + background.len());
    for seq in foreground.iter().chain(&background) {
        let annotations = store.annotations_of(seq)?;
        let counts = match term_type {
            TermType::Term => annotation_term_counts(annotations),
            TermType::Annotation => annotation_string_counts(annotations),
        };
        term_counts.insert(seq.clone(), counts);
    }

    let table = FeatureTable::build(&foreground, &background, &term_counts)?;
    let res = test.run(table.matrix(), table.labels())?;

    let mut enriched: Vec<Enrichment> = table
        .terms()
        .iter()
        .zip(res.reject())
        .zip(res.statistic().iter().zip(res.pvalues()))
        .filter(|((_, reject), _)| **reject)
        .map(|((term, _), (stat, pvalue))| Enrichment::new(term.clone(), *pvalue, *stat))
        .collect();
    enriched.sort_by(|a, b| a.effect_size().total_cmp(&b.effect_size()));

    debug!(
        "{} of {} terms are significantly enriched",
        enriched.len(),
        table.terms().len()
    );
    Ok(enriched)
}

/// Fetches the annotations of both groups from `source` and calculates the enrichment
///
/// The groups are validated before anything is fetched. The annotations of
/// all sequences are requested in a single batch.
///
/// # Errors
///
/// The same as [`enrichment()`], plus any error of the `source`
pub fn enrichment_from_source<S: AnnotationSource>(
    source: &S,
    foreground: &[Sequence],
    background: &[Sequence],
    term_type: TermType,
    test: &PermutationTest,
) -> DbBactResult<Vec<Enrichment>> {
    split_groups(foreground, background)?;
    let sequences = unique(foreground.iter().chain(background));
    let store = source.fast_annotations(&sequences)?;
    enrichment(foreground, background, &store, term_type, test)
}

/// The outcome of an enrichment, flattened for callers outside of Rust
///
/// On success the error is empty and all lists are present and have the same
/// length. On failure the error describes the problem and no lists are present.
///
/// # Examples
///
/// ```
/// use dbbact::{EnrichmentReport, DbBactError};
///
/// let report = EnrichmentReport::from(Err(DbBactError::EmptyBackground));
/// assert!(!report.is_ok());
/// assert!(report.terms().is_none());
///
/// let report = EnrichmentReport::from(Ok(Vec::new()));
/// assert!(report.is_ok());
/// assert_eq!(report.terms(), Some(&[][..]));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct EnrichmentReport {
    error: String,
    terms: Option<Vec<String>>,
    p_values: Option<Vec<f64>>,
    effect_sizes: Option<Vec<f64>>,
}

impl EnrichmentReport {
    /// The error message, empty on success
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Returns `true` if the enrichment succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_empty()
    }

    /// The enriched terms
    pub fn terms(&self) -> Option<&[String]> {
        self.terms.as_deref()
    }

    /// The p-values, in the order of [`EnrichmentReport::terms`]
    pub fn p_values(&self) -> Option<&[f64]> {
        self.p_values.as_deref()
    }

    /// The effect sizes, in the order of [`EnrichmentReport::terms`]
    pub fn effect_sizes(&self) -> Option<&[f64]> {
        self.effect_sizes.as_deref()
    }
}

impl From<DbBactResult<Vec<Enrichment>>> for EnrichmentReport {
    fn from(res: DbBactResult<Vec<Enrichment>>) -> Self {
        match res {
            Ok(enriched) => Self {
                error: String::new(),
                terms: Some(enriched.iter().map(|e| e.term().to_string()).collect()),
                p_values: Some(enriched.iter().map(Enrichment::pvalue).collect()),
                effect_sizes: Some(enriched.iter().map(Enrichment::effect_size).collect()),
            },
            Err(err) => {
                debug!("enrichment failed: {}", err);
                Self {
                    error: err.to_string(),
                    ..Default::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotations::{Annotation, AnnotationType, Context};
    use crate::client::LocalDatabase;
    use crate::terms::annotation_description;
    use rayon::prelude::*;

    /// A unique 12 bp sequence for every index
    fn seq(idx: usize) -> Sequence {
        let bases = ['A', 'C', 'G', 'T'];
        let s: String = (0..12).map(|pos| bases[(idx >> (2 * pos)) % 4]).collect();
        Sequence::try_from(s.as_str()).unwrap()
    }

    fn annotated(kind: AnnotationType, details: &[(Context, &str)], id: u32) -> Annotation {
        let mut annotation = Annotation::new(id.into(), kind);
        for (context, term) in details {
            annotation.add_detail(context.clone(), *term);
        }
        annotation
    }

    /// 10 foreground sequences in feces, 10 background sequences in saliva
    fn two_groups() -> (Vec<Sequence>, Vec<Sequence>, AnnotationStore) {
        let fg: Vec<Sequence> = (0..10).map(seq).collect();
        let bg: Vec<Sequence> = (10..20).map(seq).collect();
        let mut store = AnnotationStore::new();
        store.insert(annotated(AnnotationType::Common, &[(Context::All, "feces")], 1));
        store.insert(annotated(AnnotationType::Common, &[(Context::All, "saliva")], 2));
        store.insert(annotated(AnnotationType::Other, &[(Context::All, "homo sapiens")], 3));
        for s in &fg {
            store.link(s.clone(), 1u32.into());
            store.link(s.clone(), 3u32.into());
        }
        for s in &bg {
            store.link(s.clone(), 2u32.into());
            store.link(s.clone(), 3u32.into());
        }
        (fg, bg, store)
    }

    #[test]
    fn feces_in_single_foreground_sequence() {
        let fg = Sequence::try_from("A".repeat(120).as_str()).unwrap();
        let bg1 = Sequence::try_from("ACGT".repeat(30).as_str()).unwrap();
        let bg2 = Sequence::try_from("TTGCA".repeat(24).as_str()).unwrap();

        let mut store = AnnotationStore::new();
        store.insert(annotated(AnnotationType::Common, &[(Context::All, "feces")], 1));
        store.link(fg.clone(), 1u32.into());

        let test = PermutationTest::default().alpha(1.0);
        let res = enrichment(&[fg], &[bg1, bg2], &store, TermType::Term, &test).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].term(), "feces");
        assert!(res[0].effect_size() > 0.0);
        assert!(res[0].pvalue() > 0.0 && res[0].pvalue() <= 1.0);
    }

    #[test]
    fn direction_of_effect() {
        let (fg, bg, store) = two_groups();
        let res = enrichment(&fg, &bg, &store, TermType::Term, &PermutationTest::default()).unwrap();

        let terms: Vec<&str> = res.iter().map(Enrichment::term).collect();
        assert_eq!(terms, vec!["saliva", "feces"]);
        assert!(res[0].effect_size() < 0.0);
        assert!(res[1].effect_size() > 0.0);
        assert!((res[1].effect_size() - 1.0).abs() < f64::EPSILON);
        assert!(res.iter().all(|e| e.pvalue() < 0.01));
    }

    #[test]
    fn background_is_reduced_by_foreground() {
        let (fg, mut bg, store) = two_groups();
        bg.extend(fg.iter().cloned());
        let a = enrichment(&fg, &bg, &store, TermType::Term, &PermutationTest::default()).unwrap();
        let (_, bg, _) = two_groups();
        let b = enrichment(&fg, &bg, &store, TermType::Term, &PermutationTest::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_background() {
        let (fg, _, store) = two_groups();
        let res = enrichment(&fg, &fg, &store, TermType::Term, &PermutationTest::default());
        assert_eq!(res, Err(DbBactError::EmptyBackground));

        let report = EnrichmentReport::from(res);
        assert!(!report.error().is_empty());
        assert!(report.terms().is_none());
        assert!(report.p_values().is_none());
        assert!(report.effect_sizes().is_none());
    }

    #[test]
    fn contamination_counts_once() {
        let fg: Vec<Sequence> = (0..6).map(seq).collect();
        let bg: Vec<Sequence> = (6..12).map(seq).collect();
        let mut store = AnnotationStore::new();
        store.insert(annotated(
            AnnotationType::Contamination,
            &[(Context::All, "feces"), (Context::All, "reagent")],
            1,
        ));
        for s in &fg {
            store.link(s.clone(), 1u32.into());
        }
        let test = PermutationTest::default().alpha(1.0);
        let res = enrichment(&fg, &bg, &store, TermType::Term, &test).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].term(), "contamination");
        assert!((res[0].effect_size() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn annotation_term_type() {
        let (fg, bg, store) = two_groups();
        let res = enrichment(&fg, &bg, &store, TermType::Annotation, &PermutationTest::default())
            .unwrap();
        let feces = annotation_description(store.get(&1u32.into()).unwrap());
        let saliva = annotation_description(store.get(&2u32.into()).unwrap());
        let terms: Vec<&str> = res.iter().map(Enrichment::term).collect();
        assert_eq!(terms, vec![saliva.as_str(), feces.as_str()]);
    }

    #[test]
    fn deterministic_in_parallel() {
        let (fg, bg, store) = two_groups();
        let test = PermutationTest::default().alpha(1.0);
        let expected = enrichment(&fg, &bg, &store, TermType::Term, &test).unwrap();

        let results: Vec<Vec<Enrichment>> = (0..8)
            .into_par_iter()
            .map(|_| enrichment(&fg, &bg, &store, TermType::Term, &test).unwrap())
            .collect();
        assert!(results.iter().all(|res| *res == expected));
    }

    #[test]
    fn report_of_success() {
        let (fg, bg, store) = two_groups();
        let report = EnrichmentReport::from(enrichment(
            &fg,
            &bg,
            &store,
            TermType::Term,
            &PermutationTest::default(),
        ));
        assert!(report.is_ok());
        assert_eq!(
            report.terms().unwrap(),
            &["saliva".to_string(), "feces".to_string()]
        );
        assert_eq!(report.p_values().unwrap().len(), 2);
        assert_eq!(report.effect_sizes().unwrap().len(), 2);
    }

    struct FailingSource;

    impl AnnotationSource for FailingSource {
        fn fast_annotations(&self, _: &[Sequence]) -> DbBactResult<AnnotationStore> {
            Err(DbBactError::Fetch {
                status: 500,
                message: "sequence annotations".to_string(),
            })
        }

        fn annotation_sequences(
            &self,
            _: &[crate::AnnotationId],
        ) -> DbBactResult<HashMap<crate::AnnotationId, Vec<Sequence>>> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn background_is_validated_before_fetching() {
        let fg = vec![seq(1)];
        let res = enrichment_from_source(
            &FailingSource,
            &fg,
            &fg,
            TermType::Term,
            &PermutationTest::default(),
        );
        assert_eq!(res, Err(DbBactError::EmptyBackground));

        let res = enrichment_from_source(
            &FailingSource,
            &fg,
            &[seq(2)],
            TermType::Term,
            &PermutationTest::default(),
        );
        assert!(matches!(res, Err(DbBactError::Fetch { status: 500, .. })));
    }

    #[test]
    fn from_local_database() {
        let (fg, bg, store) = two_groups();
        let mut db = LocalDatabase::new();
        for annotation in store.annotations() {
            let seqs: Vec<Sequence> = store
                .sequences()
                .filter(|s| store.annotation_ids(s).contains(&annotation.id()))
                .cloned()
                .collect();
            db.add_annotation(annotation.clone(), &seqs);
        }
        let test = PermutationTest::default();
        let from_source = enrichment_from_source(&db, &fg, &bg, TermType::Term, &test).unwrap();
        let direct = enrichment(&fg, &bg, &store, TermType::Term, &test).unwrap();
        assert_eq!(from_source, direct);
    }
}
