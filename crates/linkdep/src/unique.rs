//! Insertion-ordered list without duplicates

use indexmap::IndexSet;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

/// A list that holds each element at most once and iterates in insertion order
#[derive(Clone)]
pub struct UniqueList<T: Hash + Eq>(IndexSet<T>);

impl<T: Hash + Eq> UniqueList<T> {
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    /// Append an element, returning `true` if it was not present yet
    pub fn insert(&mut self, element: T) -> bool {
        self.0.insert(element)
    }

    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.0.contains(element)
    }

    /// Index of an element, if present
    pub fn position<Q>(&self, element: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.0.get_index_of(element)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get_index(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T: Hash + Eq> Default for UniqueList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> PartialEq for UniqueList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl<T: Hash + Eq> Eq for UniqueList<T> {}

impl<T: Hash + Eq + fmt::Debug> fmt::Debug for UniqueList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<T: Hash + Eq> FromIterator<T> for UniqueList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Hash + Eq> Extend<T> for UniqueList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<T: Hash + Eq> IntoIterator for UniqueList<T> {
    type Item = T;
    type IntoIter = indexmap::set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T: Hash + Eq> IntoIterator for &'a UniqueList<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
