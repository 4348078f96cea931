use std::collections::hash_map::{Entry, Values};
use std::collections::HashMap;

use tracing::debug;

use crate::annotations::{Annotation, AnnotationId, Context};
use crate::terms::Term;
use crate::DbBactError;
use crate::DbBactResult;
use crate::Sequence;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// All annotations of a request and the sequences they contain
///
/// The store owns every [`Annotation`] exactly once (the arena) and keeps an
/// index of [`AnnotationId`]s per [`Sequence`]. Sequences are kept in the
/// order they were first added, which makes every derived term index
/// deterministic.
///
/// ```mermaid
/// erDiagram
///     STORE ||--|{ ANNOTATION : owns
///     STORE ||--|{ SEQUENCE : indexes
///     SEQUENCE }o--o{ ANNOTATION : appears_in
///     ANNOTATION ||--|{ DETAIL : contains
///     ANNOTATION {
///         AnnotationId id
///         AnnotationType kind
///         u32 experiment_id
///         str description
///     }
///     DETAIL {
///         Context context
///         str term
///     }
/// ```
///
/// # Examples
///
/// ```
/// use dbbact::{Annotation, AnnotationStore, AnnotationType, Context, Sequence};
///
/// let seq = Sequence::try_from("ACGT").unwrap();
///
/// let mut store = AnnotationStore::new();
/// let mut annotation = Annotation::new(1u32.into(), AnnotationType::Common);
/// annotation.add_detail(Context::All, "feces");
/// store.insert(annotation);
/// store.link(seq.clone(), 1u32.into());
///
/// assert_eq!(store.len(), 1);
/// assert_eq!(store.annotation_ids(&seq), &[1u32.into()]);
/// assert_eq!(store.annotations_of(&seq).unwrap()[0].details()[0].term(), "feces");
/// ```
#[derive(Debug, Default, Clone)]
pub struct AnnotationStore {
    annotations: HashMap<AnnotationId, Annotation>,
    index: HashMap<Sequence, Vec<AnnotationId>>,
    order: Vec<Sequence>,
}

impl AnnotationStore {
    /// Constructs a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of annotations in the store
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Returns `true` if the store contains no annotations
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Adds an annotation to the arena, replacing an annotation with the same id
    pub fn insert(&mut self, annotation: Annotation) {
        self.annotations.insert(annotation.id(), annotation);
    }

    /// Returns the annotation with the given id
    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    /// Iterates all annotations in arbitrary order
    pub fn annotations(&self) -> Values<'_, AnnotationId, Annotation> {
        self.annotations.values()
    }

    /// Registers a sequence without annotations
    ///
    /// Sequences without annotations still take part in an enrichment
    /// analysis, as a column of zeros.
    pub fn add_sequence(&mut self, sequence: Sequence) {
        if let Entry::Vacant(entry) = self.index.entry(sequence) {
            self.order.push(entry.key().clone());
            entry.insert(Vec::new());
        }
    }

    /// Records that `sequence` appears in the annotation `id`
    ///
    /// The annotation itself does not have to be inserted yet.
    pub fn link(&mut self, sequence: Sequence, id: AnnotationId) {
        match self.index.entry(sequence) {
            Entry::Occupied(mut entry) => entry.get_mut().push(id),
            Entry::Vacant(entry) => {
                self.order.push(entry.key().clone());
                entry.insert(vec![id]);
            }
        }
    }

    /// The sequences of the store, in the order they were added
    pub fn sequences(&self) -> std::slice::Iter<'_, Sequence> {
        self.order.iter()
    }

    /// The ids of all annotations the sequence appears in
    ///
    /// Unknown sequences have no annotations
    pub fn annotation_ids(&self, sequence: &Sequence) -> &[AnnotationId] {
        self.index.get(sequence).map_or(&[], |ids| ids.as_slice())
    }

    /// All annotations the sequence appears in
    ///
    /// # Errors
    ///
    /// [`DbBactError::UnknownAnnotation`] if the sequence is linked to an
    /// annotation that is not in the arena
    pub fn annotations_of(&self, sequence: &Sequence) -> DbBactResult<Vec<&Annotation>> {
        self.annotation_ids(sequence)
            .iter()
            .map(|id| {
                self.annotations
                    .get(id)
                    .ok_or(DbBactError::UnknownAnnotation(*id))
            })
            .collect()
    }

    /// The total number of sequence-annotation links
    pub fn total_associations(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    /// All ontology terms of the sequence, including parent terms
    ///
    /// Terms in the `low` context are returned in their negated form.
    /// A term is returned once for every annotation it appears in.
    ///
    /// # Errors
    ///
    /// [`DbBactError::UnknownAnnotation`] if an annotation is missing
    pub fn sequence_terms(&self, sequence: &Sequence) -> DbBactResult<Vec<Term>> {
        let mut terms = Vec::new();
        for annotation in self.annotations_of(sequence)? {
            for parent in annotation.parents() {
                match parent.context() {
                    Context::All | Context::High => terms.push(Term::new(parent.term())),
                    Context::Low => terms.push(Term::new(parent.term()).negated()),
                    Context::Unknown(context) => {
                        debug!("Skipping parent {} in context {}", parent.term(), context);
                    }
                }
            }
        }
        Ok(terms)
    }
}
