//! Sequences most strongly associated with an ontology term
//!
//! Every annotation containing the term (or one of its descendants) puts
//! its sequences into one of three buckets:
//!
//! - `high`: the term appears in a `high` detail
//! - `low`: the term appears in a `low` detail
//! - `common`: `high` plus annotations where the term applies to `all` samples
//!
//! For each bucket the sequences get a precision (fraction of the sequence's
//! annotations that are in the bucket) and a recall (fraction of the term's
//! annotations that contain the sequence).
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::annotations::{Annotation, AnnotationId, Context};
use crate::client::{
    AnnotationSource, OntologySource, SequenceInfo, SequenceInfoSource, TermStats,
};
use crate::sequence::unique;
use crate::terms::Term;
use crate::DbBactError;
use crate::DbBactResult;
use crate::Sequence;
use crate::DEFAULT_NUM_TO_SHOW;

/// Precision, recall and the resulting F-score of one bucket
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Fscore {
    precision: f64,
    recall: f64,
    fscore: f64,
}

impl Fscore {
    /// Fraction of the sequence's annotations that are in the bucket
    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// Fraction of the term's annotations that contain the sequence
    pub fn recall(&self) -> f64 {
        self.recall
    }

    /// The score used for ranking
    pub fn fscore(&self) -> f64 {
        self.fscore
    }
}

/// The scores of a sequence in all three buckets
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AssociationScore {
    high: Fscore,
    low: Fscore,
    common: Fscore,
}

impl AssociationScore {
    /// Score for annotations where the sequence is higher in the term
    pub fn high(&self) -> &Fscore {
        &self.high
    }

    /// Score for annotations where the sequence is lower in the term
    pub fn low(&self) -> &Fscore {
        &self.low
    }

    /// Score for annotations where the sequence is present with the term
    pub fn common(&self) -> &Fscore {
        &self.common
    }
}

/// A ranked sequence of one bucket
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceScore {
    sequence: Sequence,
    taxonomy: String,
    score: f64,
}

impl SequenceScore {
    /// The sequence
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// The taxonomy of the sequence, might be empty
    pub fn taxonomy(&self) -> &str {
        &self.taxonomy
    }

    /// The F-score of the bucket
    pub fn score(&self) -> f64 {
        self.score
    }
}

/// The sequences associated with a term, ranked per bucket
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TermAssociations {
    term: String,
    high: Vec<SequenceScore>,
    low: Vec<SequenceScore>,
    common: Vec<SequenceScore>,
    scores: HashMap<Sequence, AssociationScore>,
}

impl TermAssociations {
    /// The (lower case) term
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Top sequences that are higher in the term
    pub fn high(&self) -> &[SequenceScore] {
        &self.high
    }

    /// Top sequences that are lower in the term
    pub fn low(&self) -> &[SequenceScore] {
        &self.low
    }

    /// Top sequences present with the term
    pub fn common(&self) -> &[SequenceScore] {
        &self.common
    }

    /// The scores of any sequence
    ///
    /// Sequences that are not part of any annotation of the term have a
    /// score of 0 in every bucket.
    pub fn score_of(&self, sequence: &Sequence) -> AssociationScore {
        self.scores.get(sequence).copied().unwrap_or_default()
    }

    /// The number of sequences with a score
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if no sequence is associated with the term
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Bucket {
    High = 0,
    Low = 1,
    Common = 2,
}

/// Number of annotations per bucket for every sequence, in first-seen order
#[derive(Debug, Default)]
struct BucketCounts {
    index: HashMap<Sequence, usize>,
    counts: Vec<(Sequence, [u32; 3])>,
}

impl BucketCounts {
    fn add(&mut self, sequence: &Sequence, bucket: Bucket) {
        let idx = match self.index.get(sequence) {
            Some(idx) => *idx,
            None => {
                self.index.insert(sequence.clone(), self.counts.len());
                self.counts.push((sequence.clone(), [0; 3]));
                self.counts.len() - 1
            }
        };
        self.counts[idx].1[bucket as usize] += 1;
    }
}

/// Returns how the annotation relates to the term
///
/// The first `high` or `low` detail of any of the `terms` decides. Otherwise
/// the last matching `all` or unknown detail does.
fn term_context(annotation: &Annotation, terms: &HashSet<String>) -> Option<Context> {
    let mut context = None;
    for detail in annotation.details() {
        if !terms.contains(detail.term()) {
            continue;
        }
        match detail.context() {
            Context::High => return Some(Context::High),
            Context::Low => return Some(Context::Low),
            other => context = Some(other.clone()),
        }
    }
    context
}

fn ratio(count: u32, total: u32) -> f64 {
    f64::from(count) / (f64::from(total) + 1.0)
}

/// Calculates how strongly sequences are associated with an ontology term
///
/// # Examples
///
/// ```
/// use dbbact::client::LocalDatabase;
/// use dbbact::{Annotation, AnnotationType, Context, Sequence, TermScorer};
///
/// let seq = Sequence::try_from("ACGT").unwrap();
/// let mut annotation = Annotation::new(1u32.into(), AnnotationType::DiffExp);
/// annotation.add_detail(Context::High, "feces");
/// annotation.add_detail(Context::Low, "saliva");
///
/// let mut db = LocalDatabase::new();
/// db.add_annotation(annotation, &[seq.clone()]);
///
/// let scorer = TermScorer::default();
/// let res = scorer.score_term_from_source("Feces", &db, &db, &db).unwrap();
///
/// assert_eq!(res.high()[0].sequence(), &seq);
/// assert!(res.low().is_empty());
/// assert!(res.score_of(&seq).high().fscore() > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermScorer {
    num_to_show: usize,
}

impl Default for TermScorer {
    fn default() -> Self {
        Self {
            num_to_show: DEFAULT_NUM_TO_SHOW,
        }
    }
}

impl TermScorer {
    /// Sets the maximum number of sequences reported per bucket
    pub fn num_to_show(mut self, num_to_show: usize) -> Self {
        self.num_to_show = num_to_show;
        self
    }

    /// Scores all sequences of the `annotations` of `term`
    ///
    /// - `descendants`: the term and all its descendant terms
    /// - `annotation_sequences`: the sequences of every annotation
    /// - `sequence_info`: database information per sequence
    /// - `term_stats`: database statistics of `term` and `-term`
    ///
    /// # Errors
    ///
    /// - [`DbBactError::TermNotFound`] if there are no annotations
    /// - [`DbBactError::MissingTermStats`] if `term_stats` has no entry for the term
    pub fn score(
        &self,
        term: &str,
        annotations: &[Annotation],
        descendants: &HashSet<String>,
        annotation_sequences: &HashMap<AnnotationId, Vec<Sequence>>,
        sequence_info: &HashMap<Sequence, SequenceInfo>,
        term_stats: &HashMap<String, TermStats>,
    ) -> DbBactResult<TermAssociations> {
        let term = term.to_lowercase();
        if annotations.is_empty() {
            debug!("ontology term {} not found", term);
            return Err(DbBactError::TermNotFound(term));
        }

        let mut buckets = BucketCounts::default();
        let mut seen: HashSet<AnnotationId> = HashSet::with_capacity(annotations.len());
        for annotation in annotations {
            if !seen.insert(annotation.id()) {
                debug!("skipping duplicate {}", annotation.id());
                continue;
            }
            let Some(context) = term_context(annotation, descendants) else {
                debug!("term {} does not appear in any context in {}", term, annotation.id());
                continue;
            };
            if let Context::Unknown(name) = &context {
                debug!("unknown context {} of {} in {}", name, term, annotation.id());
                continue;
            }
            let Some(sequences) = annotation_sequences.get(&annotation.id()) else {
                debug!("no sequences for {}", annotation.id());
                continue;
            };
            for seq in sequences {
                match context {
                    Context::Low => buckets.add(seq, Bucket::Low),
                    Context::High => {
                        buckets.add(seq, Bucket::High);
                        buckets.add(seq, Bucket::Common);
                    }
                    Context::All | Context::Unknown(_) => buckets.add(seq, Bucket::Common),
                }
            }
        }

        let term_total = term_stats
            .get(&term)
            .ok_or_else(|| DbBactError::MissingTermStats(term.clone()))?
            .total_annotations;
        let lower_total = term_stats
            .get(Term::new(term.as_str()).negated().as_str())
            .map_or(0, |stats| stats.total_annotations);

        let mut scores = HashMap::with_capacity(buckets.counts.len());
        for (seq, counts) in &buckets.counts {
            let seq_total = match sequence_info.get(seq) {
                Some(info) => info.total_annotations,
                None => {
                    debug!("no sequence info for {}, assuming no annotations", seq);
                    0
                }
            };
            let fscore = |bucket: Bucket, term_total: u32| {
                let count = counts[bucket as usize];
                Fscore {
                    precision: ratio(count, seq_total),
                    recall: ratio(count, term_total),
                    fscore: 0.0,
                }
            };
            let mut high = fscore(Bucket::High, term_total);
            high.fscore = high.recall;
            let mut low = fscore(Bucket::Low, lower_total);
            low.fscore = low.recall;
            let mut common = fscore(Bucket::Common, term_total);
            if common.precision + common.recall > 0.0 {
                common.fscore =
                    2.0 * common.precision * common.recall / (common.precision + common.recall);
            }
            scores.insert(seq.clone(), AssociationScore { high, low, common });
        }
        debug!("scored {} sequences for term {}", scores.len(), term);

        let top = |select: fn(&AssociationScore) -> &Fscore| {
            let mut ranked: Vec<SequenceScore> = buckets
                .counts
                .iter()
                .map(|(seq, _)| SequenceScore {
                    sequence: seq.clone(),
                    taxonomy: sequence_info
                        .get(seq)
                        .map(|info| info.taxonomy.clone())
                        .unwrap_or_default(),
                    score: scores.get(seq).map_or(0.0, |s| select(s).fscore),
                })
                .filter(|s| s.score > 0.0)
                .collect();
            ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
            ranked.truncate(self.num_to_show);
            ranked
        };
        let high = top(AssociationScore::high);
        let low = top(AssociationScore::low);
        let common = top(AssociationScore::common);

        Ok(TermAssociations {
            term,
            high,
            low,
            common,
            scores,
        })
    }

    /// Gathers all data for [`TermScorer::score`] from the sources
    ///
    /// # Errors
    ///
    /// The same as [`TermScorer::score`], plus any error of the sources
    pub fn score_term_from_source<O, A, S>(
        &self,
        term: &str,
        ontology: &O,
        annotations: &A,
        sequences: &S,
    ) -> DbBactResult<TermAssociations>
    where
        O: OntologySource,
        A: AnnotationSource,
        S: SequenceInfoSource,
    {
        let term = term.to_lowercase();
        let mut descendants = ontology.term_children(&term)?;
        descendants.insert(term.clone());
        debug!(
            "found {} terms (including {}) with annotations",
            descendants.len(),
            term
        );

        let term_annotations = ontology.term_annotations(&term)?;
        if term_annotations.is_empty() {
            debug!("ontology term {} not found", term);
            return Err(DbBactError::TermNotFound(term));
        }

        let ids: Vec<AnnotationId> = term_annotations.iter().map(Annotation::id).collect();
        let annotation_sequences = annotations.annotation_sequences(&ids)?;

        let all_sequences = unique(annotation_sequences.values().flatten());
        let sequence_info: HashMap<Sequence, SequenceInfo> = all_sequences
            .iter()
            .cloned()
            .zip(sequences.sequence_info(&all_sequences)?)
            .collect();

        let lower = Term::new(term.as_str()).negated();
        let term_stats = ontology.term_stats(&[term.clone(), lower.into()])?;

        self.score(
            &term,
            &term_annotations,
            &descendants,
            &annotation_sequences,
            &sequence_info,
            &term_stats,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::client::LocalDatabase;
    use crate::AnnotationType;

    fn seq(s: &str) -> Sequence {
        Sequence::try_from(s).unwrap()
    }

    fn annotation(id: u32, kind: AnnotationType, details: &[(Context, &str)]) -> Annotation {
        let mut annotation = Annotation::new(id.into(), kind);
        for (context, term) in details {
            annotation.add_detail(context.clone(), *term);
        }
        annotation
    }

    fn database() -> LocalDatabase {
        let mut db = LocalDatabase::new();
        db.add_annotation(
            annotation(1, AnnotationType::Common, &[(Context::All, "feces")]),
            &[seq("AAAA"), seq("CCCC")],
        );
        db.add_annotation(
            annotation(
                2,
                AnnotationType::DiffExp,
                &[(Context::High, "human feces"), (Context::Low, "saliva")],
            ),
            &[seq("AAAA")],
        );
        db.add_annotation(
            annotation(
                3,
                AnnotationType::DiffExp,
                &[(Context::High, "saliva"), (Context::Low, "feces")],
            ),
            &[seq("GGGG")],
        );
        db.add_annotation(
            annotation(4, AnnotationType::Common, &[(Context::All, "soil")]),
            &[seq("AAAA"), seq("TTTT")],
        );
        db.add_child("feces", "human feces");
        db.set_taxonomy(seq("AAAA"), "g__Bacteroides");
        db
    }

    #[test]
    fn context_of_annotations() {
        let terms: HashSet<String> = ["feces".to_string()].into_iter().collect();
        let all_then_high = annotation(
            1,
            AnnotationType::DiffExp,
            &[(Context::All, "feces"), (Context::High, "feces")],
        );
        assert_eq!(term_context(&all_then_high, &terms), Some(Context::High));

        let low_then_high = annotation(
            2,
            AnnotationType::DiffExp,
            &[(Context::Low, "feces"), (Context::High, "feces")],
        );
        assert_eq!(term_context(&low_then_high, &terms), Some(Context::Low));

        let other_term = annotation(3, AnnotationType::DiffExp, &[(Context::High, "saliva")]);
        assert_eq!(term_context(&other_term, &terms), None);

        let all_then_unknown = annotation(
            4,
            AnnotationType::Other,
            &[
                (Context::All, "feces"),
                (Context::Unknown("maybe".to_string()), "feces"),
            ],
        );
        assert_eq!(
            term_context(&all_then_unknown, &terms),
            Some(Context::Unknown("maybe".to_string()))
        );
    }

    #[test]
    fn unknown_context_is_skipped() {
        let mut db = LocalDatabase::new();
        db.add_annotation(
            annotation(
                1,
                AnnotationType::Other,
                &[
                    (Context::All, "feces"),
                    (Context::Unknown("maybe".to_string()), "feces"),
                ],
            ),
            &[seq("AAAA")],
        );
        db.add_annotation(
            annotation(2, AnnotationType::Common, &[(Context::All, "feces")]),
            &[seq("CCCC")],
        );
        let res = TermScorer::default()
            .score_term_from_source("feces", &db, &db, &db)
            .unwrap();
        assert_eq!(res.score_of(&seq("AAAA")), AssociationScore::default());
        assert_eq!(res.common().len(), 1);
        assert_eq!(res.common()[0].sequence(), &seq("CCCC"));
    }

    #[test]
    fn parent_term_without_own_annotations() {
        let mut db = LocalDatabase::new();
        for id in 1..=2u32 {
            db.add_annotation(
                annotation(id, AnnotationType::DiffExp, &[(Context::High, "human feces")]),
                &[seq("ACGT")],
            );
        }
        db.add_child("feces", "human feces");

        let res = TermScorer::default()
            .score_term_from_source("feces", &db, &db, &db)
            .unwrap();
        let high = *res.score_of(&seq("ACGT")).high();
        // 2 / (2 + 1)
        assert!((high.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!(high.recall() < 1.0);
    }

    #[test]
    fn duplicate_annotations_count_once() {
        let high = annotation(1, AnnotationType::DiffExp, &[(Context::High, "feces")]);
        let annotations = vec![high.clone(), high];
        let descendants: HashSet<String> = ["feces".to_string()].into_iter().collect();
        let mut annotation_sequences = HashMap::new();
        annotation_sequences.insert(AnnotationId::from(1), vec![seq("ACGT")]);
        let mut stats = HashMap::new();
        stats.insert(
            "feces".to_string(),
            TermStats {
                total_annotations: 1,
                total_sequences: 1,
            },
        );

        let res = TermScorer::default()
            .score(
                "feces",
                &annotations,
                &descendants,
                &annotation_sequences,
                &HashMap::new(),
                &stats,
            )
            .unwrap();
        let score = res.score_of(&seq("ACGT"));
        assert!((score.high().recall() - 0.5).abs() < f64::EPSILON);
        assert!((score.common().recall() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn single_high_sequence() {
        let mut db = LocalDatabase::new();
        db.add_annotation(
            annotation(1, AnnotationType::DiffExp, &[(Context::High, "feces")]),
            &[seq("ACGT")],
        );
        let res = TermScorer::default()
            .score_term_from_source("feces", &db, &db, &db)
            .unwrap();
        assert_eq!(res.high().len(), 1);
        assert_eq!(res.high()[0].sequence(), &seq("ACGT"));

        let score = res.score_of(&seq("ACGT"));
        assert!(score.high().fscore() > 0.0);
        assert!((score.high().fscore() - score.high().recall()).abs() < f64::EPSILON);
        // 1 / (1 + 1)
        assert!((score.high().recall() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn buckets() {
        let db = database();
        let res = TermScorer::default()
            .score_term_from_source("feces", &db, &db, &db)
            .unwrap();

        // feces: annotations 1 and 3, human feces: annotation 2
        let high: Vec<&Sequence> = res.high().iter().map(SequenceScore::sequence).collect();
        assert_eq!(high, vec![&seq("AAAA")]);
        let low: Vec<&Sequence> = res.low().iter().map(SequenceScore::sequence).collect();
        assert_eq!(low, vec![&seq("GGGG")]);
        let common: Vec<&Sequence> = res.common().iter().map(SequenceScore::sequence).collect();
        assert_eq!(common, vec![&seq("AAAA"), &seq("CCCC")]);
        assert_eq!(res.common()[0].taxonomy(), "g__Bacteroides");
        assert_eq!(res.common()[1].taxonomy(), "");
    }

    #[test]
    fn fscore_values() {
        let db = database();
        let res = TermScorer::default()
            .score_term_from_source("feces", &db, &db, &db)
            .unwrap();

        // AAAA: 3 annotations in total, 2 of them in common
        // "feces" has 2 annotations in the database, including "human feces"
        let common = *res.score_of(&seq("AAAA")).common();
        assert!((common.precision() - 2.0 / 4.0).abs() < 1e-12);
        assert!((common.recall() - 2.0 / 3.0).abs() < 1e-12);
        let expected = 2.0 * 0.5 * (2.0 / 3.0) / (0.5 + 2.0 / 3.0);
        assert!((common.fscore() - expected).abs() < 1e-12);

        // "-feces" has 1 annotation
        let low = *res.score_of(&seq("GGGG")).low();
        assert!((low.recall() - 0.5).abs() < 1e-12);
        assert!((low.fscore() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unrelated_sequences_score_zero() {
        let db = database();
        let res = TermScorer::default()
            .score_term_from_source("feces", &db, &db, &db)
            .unwrap();
        assert_eq!(res.score_of(&seq("TTTT")), AssociationScore::default());
        assert_eq!(res.len(), 3);
    }

    #[test]
    fn term_is_lower_cased() {
        let db = database();
        let res = TermScorer::default()
            .score_term_from_source("FECES", &db, &db, &db)
            .unwrap();
        assert_eq!(res.term(), "feces");
        assert!(!res.is_empty());
    }

    #[test]
    fn limit_number_of_sequences() {
        let db = database();
        let res = TermScorer::default()
            .num_to_show(1)
            .score_term_from_source("feces", &db, &db, &db)
            .unwrap();
        assert_eq!(res.common().len(), 1);
        assert_eq!(res.common()[0].sequence(), &seq("AAAA"));
    }

    #[test]
    fn unknown_term() {
        let db = database();
        assert_eq!(
            TermScorer::default().score_term_from_source("mars", &db, &db, &db),
            Err(DbBactError::TermNotFound("mars".to_string()))
        );
    }

    #[test]
    fn missing_term_stats() {
        let annotations = vec![annotation(
            1,
            AnnotationType::DiffExp,
            &[(Context::High, "feces")],
        )];
        let descendants: HashSet<String> = ["feces".to_string()].into_iter().collect();
        let mut annotation_sequences = HashMap::new();
        annotation_sequences.insert(AnnotationId::from(1), vec![seq("ACGT")]);

        let res = TermScorer::default().score(
            "feces",
            &annotations,
            &descendants,
            &annotation_sequences,
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(res, Err(DbBactError::MissingTermStats("feces".to_string())));

        let mut stats = HashMap::new();
        stats.insert(
            "feces".to_string(),
            TermStats {
                total_annotations: 3,
                total_sequences: 1,
            },
        );
        let res = TermScorer::default()
            .score(
                "feces",
                &annotations,
                &descendants,
                &annotation_sequences,
                &HashMap::new(),
                &stats,
            )
            .unwrap();
        // no sequence info: precision is 1 / (0 + 1)
        let high = *res.score_of(&seq("ACGT")).high();
        assert!((high.precision() - 1.0).abs() < f64::EPSILON);
        assert!((high.recall() - 0.25).abs() < f64::EPSILON);
    }
}
