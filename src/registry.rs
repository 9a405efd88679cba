///
/// @package subtle-tiler
///
/// @file Registry functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::collections::HashMap;
use std::fmt;
use log::debug;
use stdext::function_name;
use x11rb::protocol::xproto::Window;

/// Maps window handles to their owner; every context keeps its own instance
#[derive(Debug)]
pub(crate) struct Registry<V> {
    /// Name of the context, only used for logging
    name: &'static str,
    entries: HashMap<Window, V>,
}

impl<V: Copy + fmt::Debug> Registry<V> {
    /// Create a new instance
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the context
    ///
    /// # Returns
    ///
    /// A new and empty [`Registry`]
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
        }
    }

    /// Register window for owner and replace any previous entry
    pub(crate) fn register(&mut self, win: Window, value: V) {
        if let Some(old) = self.entries.insert(win, value) {
            debug!("{}: ctx={}, win={}, replaced={:?}", function_name!(), self.name, win, old);
        }
    }

    /// Look up owner of window
    pub(crate) fn lookup(&self, win: Window) -> Option<V> {
        self.entries.get(&win).copied()
    }

    /// Drop window from registry
    pub(crate) fn unregister(&mut self, win: Window) -> Option<V> {
        self.entries.remove(&win)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn values(&self) -> impl Iterator<Item = V> + '_ {
        self.entries.values().copied()
    }
}

impl<V> fmt::Display for Registry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(name={}, len={})", self.name, self.entries.len())
    }
}
