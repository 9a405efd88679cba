///
/// @package subtle-tiler
///
/// @file Rule functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use anyhow::{anyhow, Result};
use regex::Regex;
use crate::node::NodeId;
use crate::tag;

/// Placement rule of a view
#[derive(Debug, Clone)]
pub(crate) struct Rule {
    pub(crate) pattern: String,
    pub(crate) regex: Regex,
    /// Size of the rule tile in percent; 0 lets the layout decide
    pub(crate) size: u8,
    /// Tile created on first match
    pub(crate) tile: Option<NodeId>,
}

impl Rule {
    /// Create a new instance
    ///
    /// # Arguments
    ///
    /// * `pattern` - Regex matching window classes or tag names
    /// * `size` - Tile size in percent
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`Rule`] on success or otherwise [`anyhow::Error`]
    pub(crate) fn new(pattern: &str, size: u8) -> Result<Self> {
        if 100 < size {
            return Err(anyhow!("Size {} of rule `{}' out of range", size, pattern));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            regex: tag::compile(pattern)?,
            size,
            tile: None,
        })
    }

    /// Rule for exactly one tag
    pub(crate) fn for_tag(name: &str) -> Result<Self> {
        Self::new(&format!("^{}$", regex::escape(name)), 0)
    }

    /// Check whether the rule matches the class or one of the tag names
    pub(crate) fn matches(&self, klass: &str, tag_names: &[String]) -> bool {
        self.regex.is_match(klass) || tag_names.iter().any(|name| self.regex.is_match(name))
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(pattern={}, size={}, tile={:?})", self.pattern, self.size, self.tile)
    }
}
