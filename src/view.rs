///
/// @package subtle-tiler
///
/// @file View functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use stdext::function_name;
use x11rb::NONE;
use x11rb::protocol::xproto::Window;
use crate::array::Array;
use crate::backend::{ClientInfo, PropValue, WinKind};
use crate::config::Config;
use crate::ewmh;
use crate::ewmh::{Hint, WMState};
use crate::node::{NodeFlags, NodeId, Orientation, TileOrigin};
use crate::rect::Rect;
use crate::rule::Rule;
use crate::subtle::Subtle;
use crate::tag;
use crate::tag::DEFAULT_TAG;
use crate::tagging::Tagging;
use crate::tree;
use crate::tree::Release;

/// Name of the view created when the config has none
pub(crate) const DEFAULT_VIEW: &str = "default";
const BUTTON_PADDING: u16 = 6;

#[derive(Debug, Default)]
pub(crate) struct View {
    pub(crate) name: String,
    pub(crate) tags: Tagging,
    /// Screen node while the view is materialized
    pub(crate) root: Option<NodeId>,
    pub(crate) rules: Array<Rule>,
    pub(crate) button: Window,
    pub(crate) width: u16,
}

impl View {
    pub(crate) fn new(name: &str) -> Self {
        let view = Self {
            name: name.into(),
            ..Default::default()
        };

        debug!("{}: view={}", function_name!(), view);

        view
    }

    /// Index of the first rule matching a client
    pub(crate) fn find_rule(&self, klass: &str, tag_names: &[String]) -> Option<usize> {
        self.rules.iter().position(|rule| rule.matches(klass, tag_names))
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(name={}, tags={:?}, root={:?}, nrules={})",
               self.name, self.tags, self.root, self.rules.len())
    }
}

/// Tag bits of all tags a rule of the view can match by name
fn rule_tags(subtle: &Subtle, view: &View) -> Tagging {
    subtle.tags.iter().enumerate()
        .filter(|(_, t)| view.rules.iter().any(|rule| rule.regex.is_match(&t.name)))
        .fold(Tagging::empty(), |acc, (idx, _)| acc | Tagging::from_index(idx))
}

/// Check config and init all view related options
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
    let root = subtle.backend.root();
    let (width, th) = (subtle.width, subtle.title_height);

    subtle.bar_win = subtle.backend.create_window(root, Rect::new(0, 0, width, th), WinKind::Bar)?;
    subtle.views_win = subtle.backend.create_window(subtle.bar_win,
        Rect::new(0, 0, width / 2, th), WinKind::Bar)?;

    subtle.backend.map(subtle.bar_win)?;
    subtle.backend.map(subtle.views_win)?;

    for (name, rules) in &config.views {
        let mut view = View::new(name);

        for (pattern, size) in rules {
            match Rule::new(pattern, *size) {
                Ok(rule) => view.rules.push(rule)?,
                Err(err) => warn!("Skipping rule `{}' of view `{}': {}", pattern, name, err),
            }
        }

        view.tags = rule_tags(subtle, &view);

        subtle.views.push(view)?;
    }

    if subtle.views.is_empty() {
        subtle.views.push(View::new(DEFAULT_VIEW))?;
    }

    // First view catches everything no other rule wants
    let default_bit = Tagging::from_index(tag::default_index(&subtle.tags));

    if let Some(first) = subtle.views.first_mut() {
        if !first.rules.iter().any(|rule| rule.regex.is_match(DEFAULT_TAG)) {
            first.rules.push(Rule::for_tag(DEFAULT_TAG)?)?;
        }

        first.tags |= default_bit;
    }

    info!("Loaded {} view(s)", subtle.views.len());

    rebuild_buttons(subtle)?;
    jump(subtle, 0)?;

    debug!("{}", function_name!());

    Ok(())
}

/// Recreate all buttons of the views bar
pub(crate) fn rebuild_buttons(subtle: &mut Subtle) -> Result<()> {
    let (th, views_win) = (subtle.title_height, subtle.views_win);
    let mut x: u16 = 0;

    for idx in 0..subtle.views.len() {
        let old = subtle.views[idx].button;

        if NONE != old {
            subtle.view_buttons.unregister(old);
            subtle.backend.destroy_window(old)?;
        }

        let width = subtle.backend.text_width(&subtle.views[idx].name)?.saturating_add(2 * BUTTON_PADDING);
        let button = subtle.backend.create_window(views_win, Rect::new(x as i16, 0, width, th), WinKind::Bar)?;

        subtle.backend.map(button)?;
        subtle.view_buttons.register(button, idx);

        let view = &mut subtle.views[idx];

        view.button = button;
        view.width = width;

        x = x.saturating_add(width);
    }

    render(subtle)
}

/// Draw all view buttons
pub(crate) fn render(subtle: &mut Subtle) -> Result<()> {
    let colors = subtle.colors;

    for (idx, view) in subtle.views.iter().enumerate() {
        if NONE == view.button {
            continue;
        }

        let color = if subtle.current_view == Some(idx) { colors.focus } else { colors.normal };

        subtle.backend.set_background(view.button, color)?;
        subtle.backend.clear_window(view.button)?;
        subtle.backend.draw_text(view.button, BUTTON_PADDING as i16, &view.name, colors.text, color)?;
    }

    Ok(())
}

/// Publish and export all relevant atoms to allow IPC
///
/// # Arguments
///
/// * `subtle` - Global state object
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn publish(subtle: &mut Subtle) -> Result<()> {
    let root = subtle.backend.root();

    let frames: Vec<Window> = subtle.views.iter()
        .filter_map(|view| view.root)
        .filter_map(|id| subtle.tree.get(id))
        .map(|node| node.frame)
        .collect();
    let names: Vec<String> = subtle.views.iter().map(|view| view.name.clone()).collect();
    let tags: Vec<u32> = subtle.views.iter().map(|view| view.tags.bits()).collect();
    let current = subtle.current_view.unwrap_or(0) as u32;

    let backend = subtle.backend.as_mut();

    backend.set_property(root, Hint::VirtualRoots, PropValue::Windows(frames))?;
    backend.set_property(root, Hint::NumberOfDesktops, PropValue::Cardinals(vec![names.len() as u32]))?;
    backend.set_property(root, Hint::DesktopNames, PropValue::Strings(names))?;
    backend.set_property(root, Hint::ViewTags, PropValue::Cardinals(tags))?;
    backend.set_property(root, Hint::CurrentDesktop, PropValue::Cardinals(vec![current]))?;

    debug!("{}: nviews={}", function_name!(), subtle.views.len());

    Ok(())
}

/// Create the screen node of a view unless it exists
pub(crate) fn materialize(subtle: &mut Subtle, idx: usize) -> Result<NodeId> {
    let view = subtle.views.get(idx).context("Unknown view")?;

    if let Some(root) = view.root.filter(|root| subtle.tree.contains(*root)) {
        return Ok(root);
    }

    let root = tree::create_screen(subtle)?;

    subtle.views[idx].root = Some(root);

    debug!("{}: idx={}, root={}", function_name!(), idx, root);

    Ok(root)
}

/// Destroy the screen node of a view
pub(crate) fn teardown(subtle: &mut Subtle, idx: usize) -> Result<()> {
    let Some(root) = subtle.views.get_mut(idx).and_then(|view| view.root.take()) else {
        return Ok(());
    };

    if subtle.tree.contains(root) {
        tree::delete(subtle, root, Release::Keep)?;
    }

    debug!("{}: idx={}", function_name!(), idx);

    Ok(())
}

/// Rule tile of a view; created on demand
fn rule_tile(subtle: &mut Subtle, view_idx: usize, rule_idx: usize) -> Result<NodeId> {
    let root = materialize(subtle, view_idx)?;
    let rule = subtle.views[view_idx].rules.get(rule_idx).context("Unknown rule")?;

    if let Some(tile) = rule.tile.filter(|tile| subtle.tree.contains(*tile)) {
        return Ok(tile);
    }

    let size = rule.size;
    let tile = tree::create_tile(subtle, Orientation::Vertical, TileOrigin::Rule)?;

    {
        let node = subtle.tree.node_mut(tile)?;

        node.size = if 0 == size { 100 } else { size };

        if 0 < size && 100 > size {
            node.flags.insert(NodeFlags::RESIZE);
        }
    }

    tree::link(subtle, root, None, tile)?;

    subtle.views[view_idx].rules[rule_idx].tile = Some(tile);

    Ok(tile)
}

/// Adopt a new native window and place it on all matching views
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `win` - Native window
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn merge_client(subtle: &mut Subtle, win: Window) -> Result<()> {
    if subtle.windows.lookup(win).is_some() {
        return Ok(());
    }

    subtle.backend.adopt(win)?;

    let info = subtle.backend.fetch_client_info(win)?;
    let tags = tag::match_tags(&subtle.tags, &info.klass);

    place(subtle, win, &info, tags)
}

/// Place a client with given tags on every view with a matching rule
pub(crate) fn place(subtle: &mut Subtle, win: Window, info: &ClientInfo, tags: Tagging) -> Result<()> {
    let names = tag::names(&subtle.tags, tags);
    let mut placed: Vec<(usize, NodeId)> = Vec::new();

    for view_idx in 0..subtle.views.len() {
        let Some(rule_idx) = subtle.views[view_idx].find_rule(&info.klass, &names) else {
            continue;
        };

        let tile = rule_tile(subtle, view_idx, rule_idx)?;
        let id = tree::create_client(subtle, win, info, tags)?;

        tree::link(subtle, tile, None, id)?;

        placed.push((view_idx, id));
    }

    // Fall back to the catch-all rule of the first view
    if placed.is_empty() {
        let rule_idx = subtle.views.first()
            .and_then(|view| view.find_rule("", &[DEFAULT_TAG.to_string()]))
            .unwrap_or(0);

        if subtle.views.first().is_some_and(|view| view.rules.is_empty()) {
            subtle.views[0].rules.push(Rule::for_tag(DEFAULT_TAG)?)?;
        }

        let tile = rule_tile(subtle, 0, rule_idx)?;
        let id = tree::create_client(subtle, win, info, tags)?;

        tree::link(subtle, tile, None, id)?;

        placed.push((0, id));
    }

    if 2 <= placed.len() {
        for (_, id) in &placed {
            subtle.tree.node_mut(*id)?.flags.insert(NodeFlags::MULTI);
        }
    }

    let (holder_view, holder) = placed.iter().copied()
        .find(|(view_idx, _)| Some(*view_idx) == subtle.current_view)
        .unwrap_or(placed[0]);

    tree::hold_native(subtle, holder)?;

    if subtle.clients.find(&win).is_none() {
        subtle.clients.push(win)?;
        ewmh::publish_clients(subtle)?;
    }

    tag::set_client_tags(subtle, win, tags)?;

    subtle.backend.set_property(win, Hint::WmDesktop, PropValue::Cardinals(vec![holder_view as u32]))?;
    subtle.backend.set_property(win, Hint::WmState, PropValue::WmState(WMState::Normal))?;

    for (view_idx, id) in &placed {
        if subtle.tree.node(*id)?.flags.contains(NodeFlags::TRANS) {
            float_transient(subtle, *view_idx, *id)?;
        }

        if let Some(root) = subtle.views[*view_idx].root {
            tree::configure(subtle, root)?;
        }
    }

    if Some(holder_view) == subtle.current_view {
        tree::focus(subtle, holder)?;
    }

    debug!("{}: win={}, klass={}, tags={:?}, nviews={}", function_name!(), win, info.klass, tags, placed.len());

    Ok(())
}

fn float_transient(subtle: &mut Subtle, view_idx: usize, id: NodeId) -> Result<()> {
    let (width, height) = (subtle.width / 2, subtle.height / 2);
    let geom = Rect::new((width / 2) as i16, (height / 2) as i16, width, height);
    let root = subtle.backend.root();

    let node = subtle.tree.node_mut(id)?;

    node.geom = geom;

    let frame = node.frame;

    subtle.backend.reparent(frame, root, geom.x, geom.y)?;

    if Some(view_idx) == subtle.current_view {
        subtle.backend.map(frame)?;
        subtle.backend.raise(frame)?;
    }

    tree::resize(subtle, id)
}

/// Remove all nodes of a client and place it again with given tags
pub(crate) fn remerge(subtle: &mut Subtle, win: Window, tags: Tagging) -> Result<()> {
    let info = subtle.backend.fetch_client_info(win)?;

    for id in subtle.nodes_of(win) {
        if subtle.tree.contains(id) {
            tree::delete(subtle, id, Release::Keep)?;
        }
    }

    place(subtle, win, &info, tags)
}

fn remerge_tagged(subtle: &mut Subtle, tags: Tagging) -> Result<()> {
    for win in subtle.clients.to_vec() {
        let client_tags = subtle.client_tags(win);

        if client_tags.intersects(tags) {
            remerge(subtle, win, client_tags)?;
        }
    }

    Ok(())
}

/// Switch to another view
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `idx` - Index of the view
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn jump(subtle: &mut Subtle, idx: usize) -> Result<()> {
    if Some(idx) == subtle.current_view || idx >= subtle.views.len() {
        return Ok(());
    }

    if let Some(old) = subtle.current_view {
        if let Some(root) = subtle.views.get(old).and_then(|view| view.root) {
            let frame = subtle.tree.node(root)?.frame;
            let clients = tree::clients_of(subtle, root);

            subtle.backend.unmap(frame)?;

            for id in clients.iter() {
                let node = subtle.tree.node(*id)?;

                if !node.is_tiled() {
                    let frame = node.frame;

                    subtle.backend.unmap(frame)?;
                }
            }

            if 0 != old && clients.is_empty() {
                teardown(subtle, old)?;
            }
        }
    }

    subtle.current_view = Some(idx);

    let root = materialize(subtle, idx)?;
    let frame = subtle.tree.node(root)?.frame;

    subtle.backend.map(frame)?;
    subtle.backend.map_subwindows(frame)?;

    let clients = tree::clients_of(subtle, root);

    for id in clients.iter().copied() {
        let node = subtle.tree.node(id)?;
        let (flags, frame) = (node.flags, node.frame);
        let win = node.client().map_or(NONE, |client| client.win);

        if flags.contains(NodeFlags::MULTI) && subtle.windows.lookup(win) != Some(id) {
            tree::hold_native(subtle, id)?;
            subtle.backend.set_property(win, Hint::WmDesktop, PropValue::Cardinals(vec![idx as u32]))?;
        }

        if !subtle.tree.node(id)?.is_tiled() {
            subtle.backend.map(frame)?;
            subtle.backend.raise(frame)?;
            tree::resize(subtle, id)?;
        }
    }

    tree::configure(subtle, root)?;

    publish(subtle)?;
    render(subtle)?;

    match clients.first().copied() {
        Some(first) => tree::focus(subtle, first)?,
        None => subtle.focus = None,
    }

    debug!("{}: idx={}", function_name!(), idx);

    Ok(())
}

/// Create a new view
pub(crate) fn create(subtle: &mut Subtle, name: &str) -> Result<()> {
    if subtle.views.iter().any(|view| view.name == name) {
        return Ok(());
    }

    subtle.views.push(View::new(name))?;

    rebuild_buttons(subtle)?;
    publish(subtle)?;

    debug!("{}: name={}", function_name!(), name);

    Ok(())
}

/// Kill a view and move its clients to the remaining views
pub(crate) fn kill(subtle: &mut Subtle, idx: usize) -> Result<()> {
    if 0 == idx || idx >= subtle.views.len() {
        warn!("Cannot kill view {}", idx);

        return Ok(());
    }

    if Some(idx) == subtle.current_view {
        jump(subtle, 0)?;
    }

    let orphans: Vec<(Window, Tagging)> = subtle.views[idx].root
        .map(|root| tree::clients_of(subtle, root).iter()
            .filter_map(|id| subtle.client_win(*id))
            .map(|win| (win, subtle.client_tags(win)))
            .collect())
        .unwrap_or_default();

    teardown(subtle, idx)?;

    if let Some(view) = subtle.views.remove(idx) {
        if NONE != view.button {
            subtle.view_buttons.unregister(view.button);
            subtle.backend.destroy_window(view.button)?;
        }
    }

    if let Some(current) = subtle.current_view.filter(|current| *current > idx) {
        subtle.current_view = Some(current - 1);
    }

    rebuild_buttons(subtle)?;

    for (win, tags) in orphans {
        if subtle.nodes_of(win).is_empty() {
            remerge(subtle, win, tags)?;
        }
    }

    publish(subtle)?;

    debug!("{}: idx={}", function_name!(), idx);

    Ok(())
}

/// Add a tag to a view
pub(crate) fn tag(subtle: &mut Subtle, idx: usize, tag_idx: usize) -> Result<()> {
    let name = subtle.tags.get(tag_idx).context("Unknown tag")?.name.clone();
    let rule = Rule::for_tag(&name)?;
    let view = subtle.views.get_mut(idx).context("Unknown view")?;

    if view.rules.find(&rule).is_none() {
        view.rules.push(rule)?;
    }

    view.tags |= Tagging::from_index(tag_idx);

    remerge_tagged(subtle, Tagging::from_index(tag_idx))?;
    publish(subtle)
}

/// Remove a tag from a view
pub(crate) fn untag(subtle: &mut Subtle, idx: usize, tag_idx: usize) -> Result<()> {
    let name = subtle.tags.get(tag_idx).context("Unknown tag")?.name.clone();
    let rule = Rule::for_tag(&name)?;
    let view = subtle.views.get_mut(idx).context("Unknown view")?;

    view.rules.pop(&rule);
    view.tags.remove(Tagging::from_index(tag_idx));

    remerge_tagged(subtle, Tagging::from_index(tag_idx))?;
    publish(subtle)
}

/// Add a tag to a client
pub(crate) fn tag_client(subtle: &mut Subtle, win: Window, tag_idx: usize) -> Result<()> {
    if tag_idx >= subtle.tags.len() || subtle.nodes_of(win).is_empty() {
        return Ok(());
    }

    let tags = subtle.client_tags(win) | Tagging::from_index(tag_idx);

    remerge(subtle, win, tags)
}

/// Remove a tag from a client; clients without tags get the default tag
pub(crate) fn untag_client(subtle: &mut Subtle, win: Window, tag_idx: usize) -> Result<()> {
    if tag_idx >= subtle.tags.len() || subtle.nodes_of(win).is_empty() {
        return Ok(());
    }

    let mut tags = subtle.client_tags(win) - Tagging::from_index(tag_idx);

    if tags.is_empty() {
        tags = Tagging::from_index(tag::default_index(&subtle.tags));
    }

    remerge(subtle, win, tags)
}
