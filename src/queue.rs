///
/// @package subtle-tiler
///
/// @file Queue functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use anyhow::Result;
use crate::array::ResourceError;

/// Binary min-heap; the smallest element is always at the root
#[derive(Debug, Clone)]
pub(crate) struct Queue<T> {
    heap: Vec<T>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self { heap: Vec::new() }
    }
}

impl<T: Ord> Queue<T> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert element and restore heap order
    ///
    /// # Arguments
    ///
    /// * `elem` - Element to insert
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`unit`] on success or otherwise [`ResourceError`]
    pub(crate) fn push(&mut self, elem: T) -> Result<()> {
        self.heap.try_reserve(1).map_err(|_| ResourceError { requested: 1 })?;
        self.heap.push(elem);
        self.sift_up(self.heap.len() - 1);

        Ok(())
    }

    /// Peek at the smallest element
    pub(crate) fn peek(&self) -> Option<&T> {
        self.heap.first()
    }

    /// Get mutable root; callers must call [`Queue::sift_down`] with 0 afterwards
    pub(crate) fn peek_mut(&mut self) -> Option<&mut T> {
        self.heap.first_mut()
    }

    /// Remove and return the smallest element
    pub(crate) fn pop(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;

        self.heap.swap(0, last);

        let elem = self.heap.pop();

        self.sift_down(0);

        elem
    }

    /// Move element at `idx` down until both children are later
    ///
    /// # Arguments
    ///
    /// * `idx` - Start index, usually the root
    pub(crate) fn sift_down(&mut self, idx: usize) {
        let left = 2 * idx + 1;
        let right = 2 * idx + 2;
        let mut min = idx;

        if left < self.heap.len() && self.heap[left] < self.heap[min] {
            min = left;
        }

        if right < self.heap.len() && self.heap[right] < self.heap[min] {
            min = right;
        }

        if min != idx {
            self.heap.swap(idx, min);
            self.sift_down(min);
        }
    }

    fn sift_up(&mut self, mut idx: usize) {
        while 0 < idx {
            let parent = (idx - 1) / 2;

            if self.heap[idx] >= self.heap[parent] {
                break;
            }

            self.heap.swap(idx, parent);
            idx = parent;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.heap.iter()
    }
}

impl<T> fmt::Display for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(len={})", self.heap.len())
    }
}
