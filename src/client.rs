//! Data sources for annotations, ontology terms and sequence statistics
//!
//! The analyses in this crate do not perform any I/O. Whoever calls them
//! provides the data through these traits, e.g. a client of the dbBact REST
//! API. Failing requests are reported as [`DbBactError::Fetch`].
//!
//! [`LocalDatabase`] is an in-memory implementation of all sources, useful
//! for testing and for analyses of exported annotations.
use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use crate::annotations::{Annotation, AnnotationId, AnnotationStore, Context};
use crate::terms::Term;
use crate::DbBactResult;
use crate::Sequence;

/// Database wide statistics of a single term
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TermStats {
    /// The number of annotations containing the term
    pub total_annotations: u32,
    /// The number of sequences in annotations containing the term
    pub total_sequences: u32,
}

/// Database wide information about a single sequence
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct SequenceInfo {
    /// The number of annotations the sequence is part of
    pub total_annotations: u32,
    /// The taxonomy string of the sequence
    #[serde(default)]
    pub taxonomy: String,
}

/// Provides annotations of sequences
pub trait AnnotationSource {
    /// Returns all annotations of the `sequences`, in one batched query
    ///
    /// The store must contain every queried sequence, also those without
    /// annotations.
    fn fast_annotations(&self, sequences: &[Sequence]) -> DbBactResult<AnnotationStore>;

    /// Returns the sequences of every annotation
    fn annotation_sequences(
        &self,
        ids: &[AnnotationId],
    ) -> DbBactResult<HashMap<AnnotationId, Vec<Sequence>>>;
}

/// Provides information about ontology terms
pub trait OntologySource {
    /// Returns the term and all its annotated descendant terms
    fn term_children(&self, term: &str) -> DbBactResult<HashSet<String>>;

    /// Returns all annotations that contain the term or one of its descendants
    fn term_annotations(&self, term: &str) -> DbBactResult<Vec<Annotation>>;

    /// Returns the database statistics of the terms
    ///
    /// Terms without any annotation are missing from the result
    fn term_stats(&self, terms: &[String]) -> DbBactResult<HashMap<String, TermStats>>;
}

/// Provides information about sequences
pub trait SequenceInfoSource {
    /// Returns the information of every sequence, in the same order
    fn sequence_info(&self, sequences: &[Sequence]) -> DbBactResult<Vec<SequenceInfo>>;
}

/// An in-memory annotation database
///
/// # Examples
///
/// ```
/// use dbbact::client::{AnnotationSource, LocalDatabase, OntologySource};
/// use dbbact::{Annotation, AnnotationType, Context, Sequence};
///
/// let seq = Sequence::try_from("ACGT").unwrap();
/// let mut annotation = Annotation::new(1u32.into(), AnnotationType::Common);
/// annotation.add_detail(Context::All, "feces");
///
/// let mut db = LocalDatabase::new();
/// db.add_annotation(annotation, &[seq.clone()]);
///
/// let store = db.fast_annotations(&[seq.clone()]).unwrap();
/// assert_eq!(store.annotation_ids(&seq).len(), 1);
///
/// let stats = db.term_stats(&["feces".to_string()]).unwrap();
/// assert_eq!(stats["feces"].total_annotations, 1);
/// assert_eq!(stats["feces"].total_sequences, 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct LocalDatabase {
    store: AnnotationStore,
    children: HashMap<String, HashSet<String>>,
    taxonomy: HashMap<Sequence, String>,
}

impl LocalDatabase {
    /// Constructs a new, empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an annotation together with its sequences
    pub fn add_annotation(&mut self, annotation: Annotation, sequences: &[Sequence]) {
        let id = annotation.id();
        self.store.insert(annotation);
        for seq in sequences {
            self.store.link(seq.clone(), id);
        }
    }

    /// Records `child` as a descendant of `parent` in the ontology
    pub fn add_child(&mut self, parent: &str, child: &str) {
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
    }

    /// Sets the taxonomy string of a sequence
    pub fn set_taxonomy<T: Into<String>>(&mut self, sequence: Sequence, taxonomy: T) {
        self.taxonomy.insert(sequence, taxonomy.into());
    }

    /// The underlying annotation store
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    fn descendants(&self, term: &str) -> HashSet<String> {
        let mut res = HashSet::new();
        let mut queue = vec![term.to_string()];
        while let Some(current) = queue.pop() {
            if !res.insert(current.clone()) {
                continue;
            }
            if let Some(children) = self.children.get(&current) {
                queue.extend(children.iter().cloned());
            }
        }
        res
    }

    /// Annotations with a detail matching `term` or one of its descendants
    ///
    /// `-term` matches `low` details
    fn annotations_with_term<'a>(
        &'a self,
        term: &'a Term,
    ) -> impl Iterator<Item = &'a Annotation> {
        let terms = self.descendants(term.name());
        self.store.annotations().filter(move |annotation| {
            annotation.details().iter().any(|detail| {
                terms.contains(detail.term())
                    && (*detail.context() == Context::Low) == term.is_lower()
            })
        })
    }

    fn sequences_of(&self, id: AnnotationId) -> Vec<Sequence> {
        self.store
            .sequences()
            .filter(|seq| self.store.annotation_ids(seq).contains(&id))
            .cloned()
            .collect()
    }
}

impl AnnotationSource for LocalDatabase {
    fn fast_annotations(&self, sequences: &[Sequence]) -> DbBactResult<AnnotationStore> {
        let mut store = AnnotationStore::new();
        for seq in sequences {
            store.add_sequence(seq.clone());
            for id in self.store.annotation_ids(seq) {
                store.link(seq.clone(), *id);
                if let Some(annotation) = self.store.get(id) {
                    store.insert(annotation.clone());
                }
            }
        }
        debug!(
            "local database returned {} annotations for {} sequences",
            store.len(),
            sequences.len()
        );
        Ok(store)
    }

    fn annotation_sequences(
        &self,
        ids: &[AnnotationId],
    ) -> DbBactResult<HashMap<AnnotationId, Vec<Sequence>>> {
        Ok(ids.iter().map(|id| (*id, self.sequences_of(*id))).collect())
    }
}

impl OntologySource for LocalDatabase {
    fn term_children(&self, term: &str) -> DbBactResult<HashSet<String>> {
        Ok(self.descendants(term))
    }

    fn term_annotations(&self, term: &str) -> DbBactResult<Vec<Annotation>> {
        let terms = self.descendants(term);
        let mut res: Vec<Annotation> = self
            .store
            .annotations()
            .filter(|annotation| {
                annotation
                    .details()
                    .iter()
                    .any(|detail| terms.contains(detail.term()))
            })
            .cloned()
            .collect();
        res.sort_by_key(Annotation::id);
        Ok(res)
    }

    fn term_stats(&self, terms: &[String]) -> DbBactResult<HashMap<String, TermStats>> {
        let mut res = HashMap::new();
        for label in terms {
            let term = Term::new(label.as_str());
            let mut total_annotations = 0u32;
            let mut sequences = HashSet::new();
            for annotation in self.annotations_with_term(&term) {
                total_annotations += 1;
                sequences.extend(self.sequences_of(annotation.id()));
            }
            if total_annotations == 0 {
                debug!("no annotations for term {}", label);
                continue;
            }
            let total_sequences = u32::try_from(sequences.len()).unwrap_or(u32::MAX);
            res.insert(
                label.clone(),
                TermStats {
                    total_annotations,
                    total_sequences,
                },
            );
        }
        Ok(res)
    }
}

impl SequenceInfoSource for LocalDatabase {
    fn sequence_info(&self, sequences: &[Sequence]) -> DbBactResult<Vec<SequenceInfo>> {
        Ok(sequences
            .iter()
            .map(|seq| SequenceInfo {
                total_annotations: u32::try_from(self.store.annotation_ids(seq).len())
                    .unwrap_or(u32::MAX),
                taxonomy: self.taxonomy.get(seq).cloned().unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::AnnotationType;

    fn seq(s: &str) -> Sequence {
        Sequence::try_from(s).unwrap()
    }

    fn database() -> LocalDatabase {
        let mut db = LocalDatabase::new();
        let mut feces = Annotation::new(1u32.into(), AnnotationType::Common);
        feces.add_detail(Context::All, "feces");
        db.add_annotation(feces, &[seq("AAAA"), seq("CCCC")]);

        let mut diff = Annotation::new(2u32.into(), AnnotationType::DiffExp);
        diff.add_detail(Context::High, "human feces");
        diff.add_detail(Context::Low, "saliva");
        db.add_annotation(diff, &[seq("CCCC")]);

        db.add_child("feces", "human feces");
        db.set_taxonomy(seq("CCCC"), "k__Bacteria;p__Firmicutes");
        db
    }

    #[test]
    fn fast_annotations_keep_unannotated_sequences() {
        let db = database();
        let store = db.fast_annotations(&[seq("GGGG"), seq("CCCC")]).unwrap();
        assert_eq!(store.sequences().count(), 2);
        assert!(store.annotation_ids(&seq("GGGG")).is_empty());
        assert_eq!(store.annotation_ids(&seq("CCCC")).len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn children_include_the_term() {
        let db = database();
        let children = db.term_children("feces").unwrap();
        assert!(children.contains("feces"));
        assert!(children.contains("human feces"));
        assert_eq!(children.len(), 2);

        let annotations = db.term_annotations("feces").unwrap();
        assert_eq!(annotations.len(), 2);
        assert!(db.term_annotations("soil").unwrap().is_empty());
    }

    #[test]
    fn stats_of_lower_terms() {
        let db = database();
        let stats = db
            .term_stats(&["saliva".to_string(), "-saliva".to_string()])
            .unwrap();
        assert!(!stats.contains_key("saliva"));
        assert_eq!(
            stats["-saliva"],
            TermStats {
                total_annotations: 1,
                total_sequences: 1
            }
        );
    }

    #[test]
    fn stats_include_child_terms() {
        let mut db = LocalDatabase::new();
        for id in 1..=2u32 {
            let mut annotation = Annotation::new(id.into(), AnnotationType::DiffExp);
            annotation.add_detail(Context::High, "human feces");
            db.add_annotation(annotation, &[seq("ACGT")]);
        }
        db.add_child("feces", "human feces");

        let stats = db
            .term_stats(&["feces".to_string(), "human feces".to_string()])
            .unwrap();
        assert_eq!(
            stats["feces"],
            TermStats {
                total_annotations: 2,
                total_sequences: 1
            }
        );
        assert_eq!(stats["human feces"], stats["feces"]);

        // parent stats of the first database: annotation 1 (feces), 2 (human feces)
        let stats = database().term_stats(&["feces".to_string()]).unwrap();
        assert_eq!(stats["feces"].total_annotations, 2);
        assert_eq!(stats["feces"].total_sequences, 2);
    }

    #[test]
    fn sequence_info() {
        let db = database();
        let info = db.sequence_info(&[seq("CCCC"), seq("TTTT")]).unwrap();
        assert_eq!(info[0].total_annotations, 2);
        assert_eq!(info[0].taxonomy, "k__Bacteria;p__Firmicutes");
        assert_eq!(info[1], SequenceInfo::default());
    }

    #[test]
    fn annotation_sequences() {
        let db = database();
        let present = AnnotationId::from(1);
        let missing = AnnotationId::from(3);
        let seqs = db.annotation_sequences(&[present, missing]).unwrap();
        assert_eq!(seqs[&present], vec![seq("AAAA"), seq("CCCC")]);
        assert!(seqs[&missing].is_empty());
    }
}
