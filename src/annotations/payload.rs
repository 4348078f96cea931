use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::debug;

use crate::annotations::{Annotation, AnnotationId, AnnotationStore, AnnotationType, Context};
use crate::DbBactError;
use crate::DbBactResult;
use crate::Sequence;

/// An annotation as serialized by the dbBact REST API
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRecord {
    /// The annotation type, e.g. `common` or `diffexp`
    pub annotationtype: String,
    /// Free text description
    #[serde(default)]
    pub description: Option<String>,
    /// The experiment id
    #[serde(default)]
    pub expid: u32,
    /// `[context, term]` pairs
    #[serde(default)]
    pub details: Vec<(String, String)>,
    /// Context to all terms and their ancestors
    #[serde(default)]
    pub parents: BTreeMap<String, Vec<String>>,
}

impl AnnotationRecord {
    fn into_annotation(self, id: AnnotationId) -> Annotation {
        let mut annotation = Annotation::new(id, AnnotationType::from(self.annotationtype.as_str()));
        annotation.set_experiment_id(self.expid);
        if let Some(description) = self.description {
            annotation.set_description(description);
        }
        for (context, term) in self.details {
            annotation.add_detail(Context::from(context.as_str()), term);
        }
        for (context, terms) in self.parents {
            let context = Context::from(context.as_str());
            for term in terms {
                annotation.add_parent(context.clone(), term);
            }
        }
        annotation
    }
}

/// The response of the batched annotation query for a list of sequences
///
/// The sequences are not repeated in the response. Instead, `seqannotations`
/// refers to the position of the sequence in the query.
///
/// # Examples
///
/// ```
/// use dbbact::annotations::FastAnnotations;
/// use dbbact::Sequence;
///
/// let json = r#"{
///     "annotations": {
///         "12": {"annotationtype": "common", "expid": 3, "details": [["all", "feces"]]}
///     },
///     "seqannotations": [[1, [12]]]
/// }"#;
/// let payload: FastAnnotations = serde_json::from_str(json).unwrap();
///
/// let seqs = vec![
///     Sequence::try_from("AAAA").unwrap(),
///     Sequence::try_from("CCCC").unwrap(),
/// ];
/// let store = payload.into_store(&seqs).unwrap();
///
/// assert!(store.annotation_ids(&seqs[0]).is_empty());
/// assert_eq!(store.annotation_ids(&seqs[1]), &[12u32.into()]);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FastAnnotations {
    /// Annotation records, keyed by the stringified [`AnnotationId`]
    pub annotations: HashMap<String, AnnotationRecord>,
    /// `(position of the sequence in the query, annotation ids)`
    pub seqannotations: Vec<(usize, Vec<u32>)>,
}

impl FastAnnotations {
    /// Builds an [`AnnotationStore`] for the queried `sequences`
    ///
    /// All queried sequences are added to the store, also those without
    /// any annotation.
    ///
    /// # Errors
    ///
    /// - [`DbBactError::ParseIntError`] if an annotation key is not an integer
    /// - [`DbBactError::InvalidParameter`] if a sequence position is out of range
    pub fn into_store(self, sequences: &[Sequence]) -> DbBactResult<AnnotationStore> {
        let mut store = AnnotationStore::new();
        for seq in sequences {
            store.add_sequence(seq.clone());
        }
        for (key, record) in self.annotations {
            let id = AnnotationId::try_from(key.as_str())?;
            store.insert(record.into_annotation(id));
        }
        for (position, ids) in self.seqannotations {
            let seq = sequences.get(position).ok_or_else(|| {
                DbBactError::InvalidParameter(format!(
                    "sequence position {position} out of range for {} sequences",
                    sequences.len()
                ))
            })?;
            for id in ids {
                store.link(seq.clone(), id.into());
            }
        }
        debug!(
            "got {} annotations with {} associations for {} sequences",
            store.len(),
            store.total_associations(),
            sequences.len()
        );
        Ok(store)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn seqs() -> Vec<Sequence> {
        vec![
            Sequence::try_from("AAAA").unwrap(),
            Sequence::try_from("CCCC").unwrap(),
        ]
    }

    #[test]
    fn full_record() {
        let json = r#"{
            "annotations": {
                "5": {
                    "annotationtype": "diffexp",
                    "description": "fecal vs oral",
                    "expid": 11,
                    "details": [["high", "feces"], ["low", "saliva"], ["all", "homo sapiens"]],
                    "parents": {"high": ["feces", "excreta"], "low": ["saliva"]}
                }
            },
            "seqannotations": [[0, [5]], [1, [5]]]
        }"#;
        let payload: FastAnnotations = serde_json::from_str(json).unwrap();
        let store = payload.into_store(&seqs()).unwrap();

        let annotation = store.get(&5u32.into()).unwrap();
        assert_eq!(annotation.kind(), &AnnotationType::DiffExp);
        assert_eq!(annotation.experiment_id(), 11);
        assert_eq!(annotation.description(), "fecal vs oral");
        assert_eq!(annotation.details().len(), 3);
        assert_eq!(annotation.details()[1].context(), &Context::Low);
        assert_eq!(annotation.parents().len(), 3);
        assert_eq!(store.total_associations(), 2);
    }

    #[test]
    fn null_description() {
        let json = r#"{
            "annotations": {"1": {"annotationtype": "common", "description": null}},
            "seqannotations": []
        }"#;
        let payload: FastAnnotations = serde_json::from_str(json).unwrap();
        let store = payload.into_store(&seqs()).unwrap();
        assert_eq!(store.get(&1u32.into()).unwrap().description(), "");
        assert_eq!(store.sequences().count(), 2);
    }

    #[test]
    fn invalid_key() {
        let json = r#"{
            "annotations": {"one": {"annotationtype": "common"}},
            "seqannotations": []
        }"#;
        let payload: FastAnnotations = serde_json::from_str(json).unwrap();
        assert_eq!(
            payload.into_store(&seqs()).unwrap_err(),
            DbBactError::ParseIntError
        );
    }

    #[test]
    fn position_out_of_range() {
        let json = r#"{"annotations": {}, "seqannotations": [[2, [1]]]}"#;
        let payload: FastAnnotations = serde_json::from_str(json).unwrap();
        assert!(matches!(
            payload.into_store(&seqs()),
            Err(DbBactError::InvalidParameter(_))
        ));
    }
}
