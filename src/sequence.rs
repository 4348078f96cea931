//! DNA sequences as they are stored in dbBact
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::DbBactError;

/// A single DNA sequence
///
/// The sequence is the identity of a bacterium in dbBact. Two sequences
/// are identical if their upper-cased nucleotides are identical, so
/// all sequences are upper-cased on construction.
///
/// # Examples
///
/// ```
/// use dbbact::Sequence;
///
/// let seq = Sequence::try_from("acgtN").unwrap();
/// assert_eq!(seq.as_str(), "ACGTN");
/// assert_eq!(seq, Sequence::try_from("ACGTN").unwrap());
///
/// assert!(Sequence::try_from("ACGU").is_err());
/// assert!(Sequence::try_from("").is_err());
/// ```
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sequence {
    inner: String,
}

impl Sequence {
    /// Returns the upper-case nucleotides
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// The number of nucleotides
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Always `false`, sequences can't be empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl TryFrom<&str> for Sequence {
    type Error = DbBactError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DbBactError::InvalidSequence(String::new()));
        }
        let inner = value.to_ascii_uppercase();
        if let Some(c) = inner
            .chars()
            .find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T' | 'N'))
        {
            return Err(DbBactError::InvalidSequence(format!(
                "{value} contains '{c}'"
            )));
        }
        Ok(Self { inner })
    }
}

impl TryFrom<String> for Sequence {
    type Error = DbBactError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sequence::try_from(value.as_str())
    }
}

impl From<Sequence> for String {
    fn from(seq: Sequence) -> Self {
        seq.inner
    }
}

impl AsRef<str> for Sequence {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// Removes duplicates while keeping the first occurence of every sequence
pub(crate) fn unique<'a, I: IntoIterator<Item = &'a Sequence>>(seqs: I) -> Vec<Sequence> {
    let mut seen = std::collections::HashSet::new();
    seqs.into_iter()
        .filter(|seq| seen.insert(*seq))
        .cloned()
        .collect()
}
