//! Closed, ordered value domains.
//!
//! A [`Domain`] is the dynamically constructed enumeration that a PIVOT binds
//! its `ON` values to: an ordered, deduplicated set of value tuples with a
//! position ↔ tuple bijection. Once built it is immutable and is shared
//! read-only (behind an `Arc`) by every worker that indexes into it.

use std::cmp::Ordering;

use smallvec::SmallVec;

use super::Value;
use crate::utils::error::{Error, Result};
use crate::utils::hash::FastIndexMap;

/// One domain entry: a value per `ON` expression.
pub type DomainTuple = SmallVec<[Value; 2]>;

/// An ordered, closed set of distinct value tuples.
#[derive(Debug, Clone, Default)]
pub struct Domain {
    arity: usize,
    /// Tuple -> optional display label, in domain order.
    entries: FastIndexMap<DomainTuple, Option<String>>,
}

impl Domain {
    /// Starts building a domain whose tuples have `arity` components.
    #[must_use]
    pub fn builder(arity: usize) -> DomainBuilder {
        DomainBuilder {
            arity,
            entries: FastIndexMap::default(),
        }
    }

    /// The domain with a single empty tuple.
    ///
    /// Used when a PIVOT has no `ON` clause: every group maps to one slot.
    #[must_use]
    pub fn unit() -> Self {
        let mut entries = FastIndexMap::default();
        entries.insert(DomainTuple::new(), None);
        Self { arity: 0, entries }
    }

    /// Number of components per tuple.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the domain has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the position of `tuple`, or `None` if it is not a member.
    #[must_use]
    pub fn position_of(&self, tuple: &[Value]) -> Option<usize> {
        self.entries.get_index_of(tuple)
    }

    /// Returns the tuple at `position`.
    #[must_use]
    pub fn tuple(&self, position: usize) -> Option<&[Value]> {
        self.entries.get_index(position).map(|(t, _)| t.as_slice())
    }

    /// Returns the label attached to the entry at `position`, if any.
    #[must_use]
    pub fn label(&self, position: usize) -> Option<&str> {
        self.entries
            .get_index(position)
            .and_then(|(_, label)| label.as_deref())
    }

    /// Iterates entries in domain order.
    pub fn iter(&self) -> impl Iterator<Item = (&[Value], Option<&str>)> + '_ {
        self.entries
            .iter()
            .map(|(t, label)| (t.as_slice(), label.as_deref()))
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity && self.entries.iter().eq(other.entries.iter())
    }
}

impl Eq for Domain {}

/// Incrementally builds a [`Domain`].
#[derive(Debug, Clone)]
pub struct DomainBuilder {
    arity: usize,
    entries: FastIndexMap<DomainTuple, Option<String>>,
}

impl DomainBuilder {
    /// Adds a tuple. Returns `Ok(false)` if the tuple was already present, in
    /// which case the first occurrence (and its label) is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the tuple does not have the domain's arity.
    pub fn push(
        &mut self,
        tuple: impl IntoIterator<Item = Value>,
        label: Option<String>,
    ) -> Result<bool> {
        let tuple: DomainTuple = tuple.into_iter().collect();
        if tuple.len() != self.arity {
            return Err(Error::Internal(format!(
                "domain tuple has {} components, expected {}",
                tuple.len(),
                self.arity
            )));
        }
        if self.entries.contains_key(&tuple) {
            return Ok(false);
        }
        self.entries.insert(tuple, label);
        Ok(true)
    }

    /// Number of entries added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the tuples added so far, in insertion order.
    pub fn tuples(&self) -> impl Iterator<Item = &[Value]> + '_ {
        self.entries.keys().map(DomainTuple::as_slice)
    }

    /// Keeps only the tuples for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&[Value]) -> bool) {
        self.entries.retain(|tuple, _| keep(tuple.as_slice()));
    }

    /// Stable-sorts the entries.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&[Value], &[Value]) -> Ordering) {
        self.entries.sort_by(|a, _, b, _| compare(a.as_slice(), b.as_slice()));
    }

    /// Freezes the builder into an immutable domain.
    #[must_use]
    pub fn finish(self) -> Domain {
        Domain {
            arity: self.arity,
            entries: self.entries,
        }
    }
}
