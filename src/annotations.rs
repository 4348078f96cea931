//! dbBact annotations and their connection to sequences
//!
//! An [`Annotation`] is the unit of knowledge in dbBact: a curator states that
//! a set of sequences is e.g. *common* in a habitat or *higher* in one
//! condition compared to another. Every annotation contains an ordered list of
//! [`Detail`]s, each pairing an ontology term with the [`Context`] it applies in.
//!
//! The [`AnnotationStore`] keeps all annotations of a request in one arena and
//! indexes which annotations each [`Sequence`](crate::Sequence) appears in.

use std::fmt::Display;

use crate::DbBactError;

mod annotation;
mod payload;
mod store;

pub use annotation::{Annotation, AnnotationType, Context, Detail, Details};
pub use payload::{AnnotationRecord, FastAnnotations};
pub use store::AnnotationStore;

/// A unique identifier for an [`Annotation`]
///
/// The REST API serializes ids as JSON object keys, i.e. as strings, so
/// they can be parsed from `&str`.
///
/// # Examples
///
/// ```
/// use dbbact::AnnotationId;
///
/// let id = AnnotationId::try_from("42").unwrap();
/// assert_eq!(id, AnnotationId::from(42u32));
/// assert_eq!(id.as_u32(), 42);
/// assert!(AnnotationId::try_from("forty-two").is_err());
/// ```
#[derive(Clone, Copy, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct AnnotationId {
    inner: u32,
}

impl AnnotationId {
    /// Returns the integer representation of the id
    pub fn as_u32(&self) -> u32 {
        self.inner
    }
}

impl TryFrom<&str> for AnnotationId {
    type Error = DbBactError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(AnnotationId {
            inner: value.trim().parse::<u32>()?,
        })
    }
}

impl From<u32> for AnnotationId {
    fn from(inner: u32) -> Self {
        AnnotationId { inner }
    }
}

impl Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dbBact-Annotation:{}", self.inner)
    }
}
