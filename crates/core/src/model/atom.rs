use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtomError {
    #[error("atom id cannot be empty")]
    EmptyId,
}

//
// ─── ATOM ID ──────────────────────────────────────────────────────────────────
//

/// Opaque identifier of one trackable unit of vocabulary or grammar.
///
/// Nothing is assumed about its structure beyond equality and ordering.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AtomId(String);

impl AtomId {
    /// Creates a new `AtomId`.
    ///
    /// # Errors
    ///
    /// Returns `AtomError::EmptyId` if the id is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, AtomError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AtomError::EmptyId);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AtomId {
    type Error = AtomError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AtomId> for String {
    fn from(value: AtomId) -> Self {
        value.0
    }
}

impl fmt::Debug for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomId({})", self.0)
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unordered, de-duplicated set of atoms. Ordered storage keeps iteration deterministic.
pub type AtomSet = BTreeSet<AtomId>;

/// Set union of two atom sets. The result does not depend on argument order.
#[must_use]
pub fn merge_unique(a: &AtomSet, b: &AtomSet) -> AtomSet {
    a.union(b).cloned().collect()
}

/// Display metadata for an atom, shipped alongside an activity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AtomInfo {
    pub meaning: String,
    pub notes: Option<String>,
}

pub type AtomsInfo = BTreeMap<AtomId, AtomInfo>;

//
// ─── ATOM REPORT ──────────────────────────────────────────────────────────────
//

/// Outcome of one section, split into the five atom categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomReport {
    pub introduced: AtomSet,
    pub exposed: AtomSet,
    pub forgot: AtomSet,
    pub passed: AtomSet,
    pub failed: AtomSet,
}

impl AtomReport {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_introduced(mut self, atoms: impl IntoIterator<Item = AtomId>) -> Self {
        self.introduced.extend(atoms);
        self
    }

    #[must_use]
    pub fn with_exposed(mut self, atoms: impl IntoIterator<Item = AtomId>) -> Self {
        self.exposed.extend(atoms);
        self
    }

    #[must_use]
    pub fn with_forgot(mut self, atoms: impl IntoIterator<Item = AtomId>) -> Self {
        self.forgot.extend(atoms);
        self
    }

    #[must_use]
    pub fn with_passed(mut self, atoms: impl IntoIterator<Item = AtomId>) -> Self {
        self.passed.extend(atoms);
        self
    }

    #[must_use]
    pub fn with_failed(mut self, atoms: impl IntoIterator<Item = AtomId>) -> Self {
        self.failed.extend(atoms);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.introduced.is_empty()
            && self.exposed.is_empty()
            && self.forgot.is_empty()
            && self.passed.is_empty()
            && self.failed.is_empty()
    }
}

//
// ─── AGGREGATE ────────────────────────────────────────────────────────────────
//

/// Per-category union of every `AtomReport` produced during one activity attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateAtomReport(AtomReport);

impl AggregateAtomReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `next` into this aggregate, category by category.
    #[must_use]
    pub fn combine(&self, next: &AtomReport) -> Self {
        combine(self, next)
    }

    #[must_use]
    pub fn report(&self) -> &AtomReport {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pure per-category union of `prev` and `next`.
///
/// Commutative, associative and idempotent in each category, so replaying a
/// report never double-counts an atom.
#[must_use]
pub fn combine(prev: &AggregateAtomReport, next: &AtomReport) -> AggregateAtomReport {
    let prev = &prev.0;
    AggregateAtomReport(AtomReport {
        introduced: merge_unique(&prev.introduced, &next.introduced),
        exposed: merge_unique(&prev.exposed, &next.exposed),
        forgot: merge_unique(&prev.forgot, &next.forgot),
        passed: merge_unique(&prev.passed, &next.passed),
        failed: merge_unique(&prev.failed, &next.failed),
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
