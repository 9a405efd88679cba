///
/// @package subtle-tiler
///
/// @file Tag functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use anyhow::{anyhow, Result};
use derive_builder::Builder;
use log::{debug, info, warn};
use regex::{Regex, RegexBuilder};
use stdext::function_name;
use x11rb::protocol::xproto::Window;
use crate::array::Array;
use crate::backend::PropValue;
use crate::config::{Config, MixedConfigVal};
use crate::ewmh::Hint;
use crate::subtle::Subtle;
use crate::tagging::{Tagging, MAX_TAGS};
use crate::view;

/// Name of the tag every unmatched client gets
pub(crate) const DEFAULT_TAG: &str = "default";

#[derive(Default, Builder, Debug, Clone)]
#[builder(default)]
pub(crate) struct Tag {
    /// Name of the tag
    pub(crate) name: String,
    /// Regex to match window classes
    pub(crate) regex: Option<Regex>,
}

/// Compile a case-insensitive regex
///
/// # Arguments
///
/// * `pattern` - Regex pattern
///
/// # Returns
///
/// A [`Result`] with either [`Regex`] on success or otherwise [`anyhow::Error`]
pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

impl TagBuilder {
    /// Set match pattern
    pub(crate) fn pattern(&mut self, pattern: &str) -> Result<&mut Self> {
        self.regex = Some(Some(compile(pattern)?));

        Ok(self)
    }
}

impl Tag {
    /// Create a new tag matching its own name
    pub(crate) fn new(name: &str) -> Result<Self> {
        let tag = TagBuilder::default()
            .name(name.to_string())
            .pattern(&regex::escape(name))?
            .build()?;

        debug!("{}: tag={}", function_name!(), tag);

        Ok(tag)
    }

    /// Check whether the tag matches given string
    pub(crate) fn matches(&self, value: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(value))
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(name={}, regex={:?})", self.name, self.regex.as_ref().map(Regex::as_str))
    }
}

/// Find all tags matching a window class
///
/// # Arguments
///
/// * `tags` - List of tags
/// * `klass` - Class name of the window
///
/// # Returns
///
/// Bitmask of the matching tags; never empty since the default tag catches everything else
pub(crate) fn match_tags(tags: &Array<Tag>, klass: &str) -> Tagging {
    let mut tagging = Tagging::empty();

    for (idx, tag) in tags.iter().enumerate() {
        if tag.matches(klass) {
            tagging |= Tagging::from_index(idx);
        }
    }

    if tagging.is_empty() {
        tagging = Tagging::from_index(default_index(tags));
    }

    tagging
}

/// Index of the default tag
pub(crate) fn default_index(tags: &Array<Tag>) -> usize {
    tags.iter().position(|tag| DEFAULT_TAG == tag.name).unwrap_or(0)
}

/// Names of all tags in the bitmask
pub(crate) fn names(tags: &Array<Tag>, tagging: Tagging) -> Vec<String> {
    tagging.indices()
        .filter_map(|idx| tags.get(idx))
        .map(|tag| tag.name.clone())
        .collect()
}

/// Check config and init all tag related options
///
/// # Arguments
///
/// * `config` - Config values read either from args or config file
/// * `subtle` - Global state object
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn init(config: &Config, subtle: &mut Subtle) -> Result<()> {
    // Default tag always comes first
    subtle.tags.push(Tag::new(DEFAULT_TAG)?)?;

    for (name, values) in &config.tags {
        if DEFAULT_TAG == name || subtle.tags.len() >= MAX_TAGS {
            continue;
        }

        let mut builder = TagBuilder::default();

        builder.name(name.clone());

        let pattern = match values.get("match") {
            Some(MixedConfigVal::S(pattern)) => pattern.clone(),
            _ => regex::escape(name),
        };

        if let Err(err) = builder.pattern(&pattern) {
            warn!("Invalid regex for tag `{}': {}", name, err);

            continue;
        }

        subtle.tags.push(builder.build()?)?;
    }

    info!("Loaded {} tag(s)", subtle.tags.len());

    debug!("{}", function_name!());

    Ok(())
}

/// Publish and export all relevant atoms to allow IPC
pub(crate) fn publish(subtle: &mut Subtle) -> Result<()> {
    let root = subtle.backend.root();
    let names: Vec<String> = subtle.tags.iter().map(|tag| tag.name.clone()).collect();

    subtle.backend.set_property(root, Hint::TagList, PropValue::Strings(names))?;

    debug!("{}: ntags={}", function_name!(), subtle.tags.len());

    Ok(())
}

/// Create a new tag
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `name` - Name of the tag
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn create(subtle: &mut Subtle, name: &str) -> Result<()> {
    if subtle.tags.iter().any(|tag| tag.name == name) {
        return Ok(());
    }

    if subtle.tags.len() >= MAX_TAGS {
        return Err(anyhow!("Max. number of tags reached"));
    }

    subtle.tags.push(Tag::new(name)?)?;

    publish(subtle)?;

    debug!("{}: name={}", function_name!(), name);

    Ok(())
}

/// Kill tag and compact the bitmasks of clients and views
pub(crate) fn kill(subtle: &mut Subtle, tag_idx: usize) -> Result<()> {
    let Some(tag) = subtle.tags.get(tag_idx).cloned() else {
        return Ok(());
    };

    if DEFAULT_TAG == tag.name {
        warn!("Cannot kill default tag");

        return Ok(());
    }

    subtle.tags.pop(&tag);

    for view in subtle.views.iter_mut() {
        view.tags = view.tags.remove_index(tag_idx);
    }

    let wins: Vec<Window> = subtle.clients.to_vec();

    for win in wins {
        let tags = subtle.client_tags(win).remove_index(tag_idx);

        set_client_tags(subtle, win, tags)?;
    }

    publish(subtle)?;
    view::publish(subtle)?;

    debug!("{}: tag={}", function_name!(), tag);

    Ok(())
}

/// Store tags on every node of a client and export them
pub(crate) fn set_client_tags(subtle: &mut Subtle, win: Window, tags: Tagging) -> Result<()> {
    for id in subtle.nodes_of(win) {
        if let Some(client) = subtle.tree.get_mut(id).and_then(|node| node.client_mut()) {
            client.tags = tags;
        }
    }

    subtle.backend.set_property(win, Hint::ClientTags, PropValue::Cardinals(vec![tags.bits()]))
}
