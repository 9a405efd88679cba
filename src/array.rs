///
/// @package subtle-tiler
///
/// @file Array functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::{error, fmt};
use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};
use anyhow::Result;

/// Raised when the array storage cannot grow any further
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ResourceError {
    /// Number of elements we tried to make room for
    pub(crate) requested: usize,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot allocate room for {} more element(s)", self.requested)
    }
}

impl error::Error for ResourceError {}

/// Insertion-ordered container used for every collection of the window manager
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Array<T> {
    data: Vec<T>,
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T: PartialEq> Array<T> {
    /// Create a new instance
    ///
    /// # Returns
    ///
    /// A new and empty [`Array`]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.data.try_reserve(additional)
            .map_err(|_| ResourceError { requested: additional })?;

        Ok(())
    }

    /// Append element to the end
    ///
    /// # Arguments
    ///
    /// * `elem` - Element to add
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`unit`] on success or otherwise [`ResourceError`]
    pub(crate) fn push(&mut self, elem: T) -> Result<()> {
        self.reserve(1)?;
        self.data.push(elem);

        Ok(())
    }

    /// Remove first element equal to given one and keep the order of the others
    ///
    /// # Arguments
    ///
    /// * `elem` - Element to remove
    ///
    /// # Returns
    ///
    /// Either the removed [`Option`] element or [`None`]
    pub(crate) fn pop(&mut self, elem: &T) -> Option<T> {
        self.find(elem).map(|idx| self.data.remove(idx))
    }

    /// Find index of element
    pub(crate) fn find(&self, elem: &T) -> Option<usize> {
        self.data.iter().position(|e| e == elem)
    }

    /// Open a gap at `idx` and fill it with given elements
    ///
    /// # Arguments
    ///
    /// * `idx` - Insert position; clamped to the length
    /// * `elems` - Elements to insert in order
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`unit`] on success or otherwise [`ResourceError`]
    pub(crate) fn splice(&mut self, idx: usize, elems: impl IntoIterator<Item = T>) -> Result<()> {
        let elems: Vec<T> = elems.into_iter().collect();

        self.reserve(elems.len())?;

        let idx = idx.min(self.data.len());

        self.data.splice(idx..idx, elems);

        Ok(())
    }

    /// Insert a single element at `idx`
    pub(crate) fn insert(&mut self, idx: usize, elem: T) -> Result<()> {
        self.splice(idx, [elem])
    }

    /// Swap two elements
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        if a < self.data.len() && b < self.data.len() {
            self.data.swap(a, b);
        }
    }

    /// Sort in place with caller comparator
    pub(crate) fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.data.sort_by(cmp);
    }

    /// Hand every element to its destructor and drop the storage afterwards
    ///
    /// # Arguments
    ///
    /// * `destroy` - Per-element destructor
    pub(crate) fn destroy_all<F>(&mut self, mut destroy: F)
    where
        F: FnMut(T),
    {
        for elem in self.data.drain(..) {
            destroy(elem);
        }

        self.data.shrink_to_fit();
    }

    /// Remove element at `idx`
    pub(crate) fn remove(&mut self, idx: usize) -> Option<T> {
        (idx < self.data.len()).then(|| self.data.remove(idx))
    }
}

impl<T> Deref for Array<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for Array<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl<T: PartialEq> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { data: iter.into_iter().collect() }
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: fmt::Debug> fmt::Display for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(len={}, data={:?})", self.data.len(), self.data)
    }
}
