use std::fmt::Display;

use smallvec::SmallVec;

use crate::annotations::AnnotationId;
use crate::DEFAULT_NUM_DETAILS;

/// The kind of statement an [`Annotation`] makes about its sequences
///
/// Unknown types are kept as [`AnnotationType::Unknown`] so that a single
/// odd annotation does not break the analysis of all others.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationType {
    /// The sequences are common (present in most samples)
    Common,
    /// The sequences are dominant (high relative abundance)
    Dominant,
    /// The sequences are common and have a high frequency
    HighFreq,
    /// Any other observation
    Other,
    /// The sequences are a known contamination
    Contamination,
    /// Differential abundance between two conditions
    DiffExp,
    /// The sequences correlate positively with a measurement
    PositiveCorrelation,
    /// The sequences correlate negatively with a measurement
    NegativeCorrelation,
    /// The sequences are a taxonomic entity
    Isa,
    /// Annotation types that are not known to this crate
    Unknown(String),
}

impl AnnotationType {
    /// Differential types use the detail [`Context`] to weigh terms
    pub fn is_differential(&self) -> bool {
        matches!(
            self,
            AnnotationType::DiffExp
                | AnnotationType::PositiveCorrelation
                | AnnotationType::NegativeCorrelation
        )
    }

    /// The name of the type as used by the dbBact REST API
    pub fn as_str(&self) -> &str {
        match self {
            AnnotationType::Common => "common",
            AnnotationType::Dominant => "dominant",
            AnnotationType::HighFreq => "highfreq",
            AnnotationType::Other => "other",
            AnnotationType::Contamination => "contamination",
            AnnotationType::DiffExp => "diffexp",
            AnnotationType::PositiveCorrelation => "positive correlation",
            AnnotationType::NegativeCorrelation => "negative correlation",
            AnnotationType::Isa => "isa",
            AnnotationType::Unknown(s) => s,
        }
    }
}

impl From<&str> for AnnotationType {
    fn from(value: &str) -> Self {
        match value
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_'], " ")
            .as_str()
        {
            "common" => AnnotationType::Common,
            "dominant" => AnnotationType::Dominant,
            "highfreq" => AnnotationType::HighFreq,
            "other" => AnnotationType::Other,
            "contamination" => AnnotationType::Contamination,
            "diffexp" => AnnotationType::DiffExp,
            "positive correlation" => AnnotationType::PositiveCorrelation,
            "negative correlation" => AnnotationType::NegativeCorrelation,
            "isa" => AnnotationType::Isa,
            _ => AnnotationType::Unknown(value.to_string()),
        }
    }
}

impl Display for AnnotationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Qualifies how a term of an annotation [`Detail`] applies
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Context {
    /// The term applies to all samples of the annotation
    All,
    /// The sequences are higher in the term
    High,
    /// The sequences are lower in the term
    Low,
    /// Contexts that are not known to this crate
    Unknown(String),
}

impl Context {
    /// The name of the context as used by the dbBact REST API
    pub fn as_str(&self) -> &str {
        match self {
            Context::All => "all",
            Context::High => "high",
            Context::Low => "low",
            Context::Unknown(s) => s,
        }
    }
}

impl From<&str> for Context {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Context::All,
            "high" => Context::High,
            "low" => Context::Low,
            _ => Context::Unknown(value.to_string()),
        }
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `(context, term)` pair of an [`Annotation`]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Detail {
    context: Context,
    term: String,
}

impl Detail {
    /// Constructs a new `Detail`
    pub fn new<T: Into<String>>(context: Context, term: T) -> Self {
        Self {
            context,
            term: term.into(),
        }
    }

    /// The [`Context`] of the term
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The ontology term
    pub fn term(&self) -> &str {
        &self.term
    }
}

/// Ordered details of an annotation
///
/// Most annotations have only a handful of details
pub type Details = SmallVec<[Detail; DEFAULT_NUM_DETAILS]>;

/// A single dbBact annotation
///
/// # Examples
///
/// ```
/// use dbbact::{Annotation, AnnotationType, Context};
///
/// let mut annotation = Annotation::new(7u32.into(), AnnotationType::DiffExp);
/// annotation.add_detail(Context::High, "feces");
/// annotation.add_detail(Context::Low, "saliva");
///
/// assert_eq!(annotation.details().len(), 2);
/// assert_eq!(annotation.details()[1].term(), "saliva");
/// assert!(annotation.kind().is_differential());
/// ```
#[derive(Clone, Debug)]
pub struct Annotation {
    id: AnnotationId,
    kind: AnnotationType,
    experiment_id: u32,
    description: String,
    details: Details,
    parents: Vec<Detail>,
}

impl Annotation {
    /// Constructs a new annotation without any details
    pub fn new(id: AnnotationId, kind: AnnotationType) -> Self {
        Self {
            id,
            kind,
            experiment_id: 0,
            description: String::new(),
            details: Details::new(),
            parents: Vec::new(),
        }
    }

    /// The unique [`AnnotationId`]
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    /// The [`AnnotationType`]
    pub fn kind(&self) -> &AnnotationType {
        &self.kind
    }

    /// The id of the experiment the annotation belongs to
    pub fn experiment_id(&self) -> u32 {
        self.experiment_id
    }

    /// Sets the id of the experiment the annotation belongs to
    pub fn set_experiment_id(&mut self, experiment_id: u32) {
        self.experiment_id = experiment_id;
    }

    /// The free text description of the curator
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sets the free text description
    pub fn set_description<T: Into<String>>(&mut self, description: T) {
        self.description = description.into();
    }

    /// The ordered `(context, term)` details
    pub fn details(&self) -> &[Detail] {
        &self.details
    }

    /// Appends another `(context, term)` detail
    pub fn add_detail<T: Into<String>>(&mut self, context: Context, term: T) {
        self.details.push(Detail::new(context, term));
    }

    /// The details terms and all of their ontology ancestors
    ///
    /// The expansion is provided by the dbBact server
    pub fn parents(&self) -> &[Detail] {
        &self.parents
    }

    /// Adds an ontology ancestor term in the given context
    pub fn add_parent<T: Into<String>>(&mut self, context: Context, term: T) {
        self.parents.push(Detail::new(context, term));
    }
}
