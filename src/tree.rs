///
/// @package subtle-tiler
///
/// @file Tree functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use stdext::function_name;
use x11rb::NONE;
use x11rb::protocol::xproto::Window;
use crate::array::Array;
use crate::backend::{ClientInfo, PropValue, Protocol, WinKind};
use crate::ewmh;
use crate::ewmh::{Hint, NetState, WMState};
use crate::node::{ClientData, Node, NodeFlags, NodeId, NodeKind, Orientation, TileData, TileOrigin};
use crate::rect::Rect;
use crate::subtle::Subtle;
use crate::tagging::Tagging;

const PLACEHOLDER_NAME: &str = "subtle";
const CAPTION_PADDING: u16 = 10;

/// What happens to the native window when its last node goes away
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Release {
    /// Ask the client to close
    Close,
    /// Hand it back to the root window
    Keep,
}

/// Layout input of a single child
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct LayoutSlot {
    pub(crate) shaded: bool,
    /// Fixed share in percent of the parent extent
    pub(crate) weight: Option<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    /// Geometry of every slot relative to the parent
    pub(crate) rects: Vec<Rect>,
    /// Extent of a flexible child along the split axis
    pub(crate) mean: u16,
}

/// Split the extent of a tile between its children
///
/// Shaded children take the title height, weighted ones their percentage and the
/// rest is divided evenly. The remainder of the division goes to the last
/// unshaded child so the children always cover the whole axis.
///
/// # Arguments
///
/// * `orientation` - Split axis
/// * `width` - Width of the tile
/// * `height` - Height of the tile
/// * `title_height` - Height of a shaded child
/// * `slots` - Children in layout order
///
/// # Returns
///
/// A [`Layout`] with one rect per slot
pub(crate) fn layout(orientation: Orientation, width: u16, height: u16, title_height: u16,
                     slots: &[LayoutSlot]) -> Layout
{
    let (width, height, th) = (u32::from(width), u32::from(height), u32::from(title_height));
    let axis = match orientation {
        Orientation::Horizontal => width,
        Orientation::Vertical => height,
    };

    let nshaded = slots.iter().filter(|slot| slot.shaded).count() as u32;
    let flowing: Vec<usize> = (0..slots.len()).filter(|idx| !slots[*idx].shaded).collect();

    let reserved = match orientation {
        Orientation::Horizontal => 0,
        Orientation::Vertical => nshaded * th,
    };
    let space = axis.saturating_sub(reserved);

    let share = |idx: usize| slots[idx].weight.map_or(0, |w| axis * u32::from(w.min(100)) / 100);

    let mut weighted: Vec<usize> = flowing.iter().copied()
        .filter(|idx| slots[*idx].weight.is_some_and(|w| 0 < w))
        .collect();

    // Keep one flexible child
    if weighted.len() == flowing.len() {
        weighted.pop();
    }

    let mut fixed: u32 = weighted.iter().map(|idx| share(*idx)).sum();

    if fixed > space {
        weighted.clear();
        fixed = 0;
    }

    let avail = space - fixed;
    let nflex = (flowing.len() - weighted.len()).max(1) as u32;
    let mean = avail / nflex;
    let comp = avail - mean * nflex;
    let last = flowing.last().copied();

    let extent = |idx: usize| {
        let base = if weighted.contains(&idx) { share(idx) } else { mean };

        if Some(idx) == last { base + comp } else { base }
    };

    let mut rects = Vec::with_capacity(slots.len());
    let mut pos: u32 = 0;
    let mut shaded_pos: u32 = 0;
    let strip = nshaded * th;

    for (idx, slot) in slots.iter().enumerate() {
        let rect = match orientation {
            Orientation::Horizontal if slot.shaded => {
                shaded_pos += th;

                (0, shaded_pos - th, width, th)
            }
            Orientation::Horizontal => {
                let w = extent(idx);

                pos += w;

                (pos - w, strip, w, height.saturating_sub(strip))
            }
            Orientation::Vertical => {
                let h = if slot.shaded { th } else { extent(idx) };

                pos += h;

                (0, pos - h, width, h)
            }
        };

        rects.push(Rect::new(clamp_pos(rect.0), clamp_pos(rect.1), clamp_len(rect.2), clamp_len(rect.3)));
    }

    Layout { rects, mean: clamp_len(mean) }
}

fn clamp_pos(value: u32) -> i16 {
    i16::try_from(value).unwrap_or(i16::MAX)
}

fn clamp_len(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Origin of a node relative to the root window
pub(crate) fn absolute_origin(subtle: &Subtle, id: NodeId) -> (i16, i16) {
    let (mut x, mut y) = (0i16, 0i16);
    let mut cur = Some(id);

    while let Some(node) = cur.and_then(|cur| subtle.tree.get(cur)) {
        x = x.saturating_add(node.geom.x);
        y = y.saturating_add(node.geom.y);

        // Floating frames live directly on the root window
        if !node.is_tiled() {
            break;
        }

        cur = node.parent;
    }

    (x, y)
}

/// Create the root tile of a view
///
/// # Arguments
///
/// * `subtle` - Global state object
///
/// # Returns
///
/// A [`Result`] with either [`NodeId`] on success or otherwise [`anyhow::Error`]
pub(crate) fn create_screen(subtle: &mut Subtle) -> Result<NodeId> {
    let root = subtle.backend.root();
    let th = subtle.title_height;
    let geom = Rect::new(0, th as i16, subtle.width, subtle.height.saturating_sub(th));

    let frame = subtle.backend.create_window(root, geom, WinKind::Frame)?;

    let mut node = Node::new(NodeKind::Screen(TileData::default()));

    node.geom = geom;
    node.frame = frame;

    let id = subtle.tree.insert(node);

    subtle.windows.register(frame, id);

    debug!("{}: id={}, frame={}", function_name!(), id, frame);

    Ok(id)
}

/// Create a new tile with its buttons
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `orientation` - Split axis of the tile
/// * `origin` - Why the tile exists
///
/// # Returns
///
/// A [`Result`] with either [`NodeId`] on success or otherwise [`anyhow::Error`]
pub(crate) fn create_tile(subtle: &mut Subtle, orientation: Orientation, origin: TileOrigin) -> Result<NodeId> {
    let root = subtle.backend.root();
    let th = subtle.title_height;

    let frame = subtle.backend.create_window(root, Rect::new(0, 0, 1, 1), WinKind::Frame)?;
    let new_button = subtle.backend.create_window(frame, Rect::new(0, 0, th, th), WinKind::Decoration)?;
    let delete_button = subtle.backend.create_window(frame, Rect::new(0, 0, th, th), WinKind::Decoration)?;

    let mut node = Node::new(NodeKind::Tile(TileData {
        orientation,
        new_button,
        delete_button,
        origin,
        ..Default::default()
    }));

    node.frame = frame;

    let id = subtle.tree.insert(node);

    for win in [frame, new_button, delete_button] {
        subtle.windows.register(win, id);
    }

    debug!("{}: id={}, orientation={:?}, origin={:?}", function_name!(), id, orientation, origin);

    Ok(id)
}

/// Create a client node for a native window
///
/// The native window stays where it is; see [`hold_native`].
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `win` - Native window
/// * `info` - Properties of the native window
/// * `tags` - Tags of the client
///
/// # Returns
///
/// A [`Result`] with either [`NodeId`] on success or otherwise [`anyhow::Error`]
pub(crate) fn create_client(subtle: &mut Subtle, win: Window, info: &ClientInfo, tags: Tagging) -> Result<NodeId> {
    let root = subtle.backend.root();
    let (bw, th) = (subtle.border_width.max(1), subtle.title_height);
    let geom = Rect::new(0, 0, subtle.width / 2, subtle.height / 2);
    let inner = geom.height.saturating_sub(th).max(1);

    let backend = subtle.backend.as_mut();

    let frame = backend.create_window(root, geom, WinKind::Frame)?;
    let title = backend.create_window(frame, Rect::new(0, 0, geom.width, th), WinKind::Decoration)?;
    let caption = backend.create_window(frame, Rect::new(0, 0, 1, th), WinKind::Decoration)?;
    let left = backend.create_window(frame, Rect::new(0, th as i16, bw, inner), WinKind::Decoration)?;
    let right = backend.create_window(frame, Rect::new(0, th as i16, bw, inner), WinKind::Decoration)?;
    let bottom = backend.create_window(frame, Rect::new(0, 0, geom.width, bw), WinKind::Decoration)?;

    let mut node = Node::new(NodeKind::Client(ClientData {
        win,
        name: info.name.clone().unwrap_or_else(|| PLACEHOLDER_NAME.into()),
        klass: info.klass.clone(),
        colormap: info.colormap,
        caption,
        tags,
    }));

    node.geom = geom;
    node.frame = frame;
    node.title = title;
    node.left = left;
    node.right = right;
    node.bottom = bottom;

    node.flags.set(NodeFlags::INPUT, info.input);
    node.flags.set(NodeFlags::FOCUS, info.take_focus);
    node.flags.set(NodeFlags::CLOSE, info.delete_window);
    node.flags.set(NodeFlags::URGENT, info.urgent);
    node.flags.set(NodeFlags::TRANS, info.transient_for.is_some());

    let id = subtle.tree.insert(node);

    for win in [frame, title, caption, left, right, bottom] {
        subtle.windows.register(win, id);
    }

    debug!("{}: id={}, win={}, klass={}", function_name!(), id, win, info.klass);

    Ok(id)
}

/// Move the native window into the frame of given client node
pub(crate) fn hold_native(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;
    let win = node.client().context("Node is no client")?.win;
    let frame = node.frame;

    subtle.backend.reparent(win, frame, subtle.border_width as i16, subtle.title_height as i16)?;
    subtle.backend.map(win)?;
    subtle.windows.register(win, id);

    debug!("{}: id={}, win={}", function_name!(), id, win);

    Ok(())
}

/// Link child into a container at given position
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `parent` - Container to link into
/// * `idx` - Position or [`None`] to append
/// * `child` - Unlinked node
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn link(subtle: &mut Subtle, parent: NodeId, idx: Option<usize>, child: NodeId) -> Result<()> {
    if parent == child || subtle.tree.is_ancestor(child, parent) {
        return Err(anyhow!("Cannot link node {} into its own subtree", child));
    }

    let pframe = subtle.tree.node(parent)?.frame;
    let node = subtle.tree.node(child)?;

    if node.parent.is_some() {
        return Err(anyhow!("Node {} is still linked", child));
    }

    let (cframe, shaded, tiled) = (node.frame, node.flags.contains(NodeFlags::SHADE), node.is_tiled());

    let tile = subtle.tree.node_mut(parent)?.tile_mut().context("Parent is no container")?;

    match idx {
        Some(idx) => tile.children.insert(idx, child)?,
        None => tile.children.push(child)?,
    }

    if shaded {
        tile.shaded += 1;
    }

    subtle.tree.node_mut(child)?.parent = Some(parent);

    if tiled {
        subtle.backend.reparent(cframe, pframe, 0, 0)?;
        subtle.backend.map(cframe)?;
    }

    debug!("{}: parent={}, idx={:?}, child={}", function_name!(), parent, idx, child);

    Ok(())
}

/// Link child at the end of a container and update the layout
pub(crate) fn attach(subtle: &mut Subtle, parent: NodeId, child: NodeId) -> Result<()> {
    link(subtle, parent, None, child)?;

    configure(subtle, parent)
}

/// Unlink node from its parent
///
/// # Returns
///
/// A [`Result`] with either the old parent on success or otherwise [`anyhow::Error`]
pub(crate) fn detach(subtle: &mut Subtle, id: NodeId) -> Result<Option<NodeId>> {
    let node = subtle.tree.node_mut(id)?;
    let shaded = node.flags.contains(NodeFlags::SHADE);
    let parent = node.parent.take();

    if let Some(tile) = parent.and_then(|p| subtle.tree.get_mut(p)).and_then(Node::tile_mut) {
        debug_assert!(tile.children.find(&id).is_some());

        tile.children.pop(&id);

        if shaded {
            tile.shaded = tile.shaded.saturating_sub(1);
        }

        if tile.top == Some(id) {
            tile.top = None;
        }
    }

    debug!("{}: id={}, parent={:?}", function_name!(), id, parent);

    Ok(parent)
}

/// Drop empty rule tiles and collapse split tiles with a single child
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Container to check
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn sanitize(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    for child in subtle.tree.children(id) {
        let Some(tile) = subtle.tree.get(child).and_then(Node::tile) else {
            continue;
        };

        match (tile.origin, tile.children.len()) {
            (TileOrigin::Rule, 0) => {
                detach(subtle, child)?;
                delete_subtree(subtle, child, Release::Keep)?;
            }
            (TileOrigin::Split, 1) => {
                let grandchild = tile.children[0];

                collapse(subtle, id, child, grandchild)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn collapse(subtle: &mut Subtle, parent: NodeId, tile: NodeId, child: NodeId) -> Result<()> {
    let (tile_flags, tile_size) = {
        let node = subtle.tree.node(tile)?;

        (node.flags, node.size)
    };

    let idx = subtle.tree.node(parent)?.tile()
        .and_then(|t| t.children.find(&tile))
        .context("Tile is no child of parent")?;

    detach(subtle, child)?;
    detach(subtle, tile)?;

    // Weight of the split tile goes to the survivor
    if tile_flags.contains(NodeFlags::RESIZE) {
        let node = subtle.tree.node_mut(child)?;

        node.flags.insert(NodeFlags::RESIZE);
        node.size = tile_size;
    }

    link(subtle, parent, Some(idx), child)?;
    delete_subtree(subtle, tile, Release::Keep)?;

    debug!("{}: parent={}, tile={}, child={}", function_name!(), parent, tile, child);

    Ok(())
}

/// Compute the layout of a container and apply it to all tiled children
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Container to configure
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn configure(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    if !subtle.tree.node(id)?.is_container() {
        return resize(subtle, id);
    }

    sanitize(subtle, id)?;

    let node = subtle.tree.node(id)?;
    let tile = node.tile().context("Node is no container")?;
    let (width, height, orientation) = (node.geom.width, node.geom.height, tile.orientation);
    let piled = node.flags.contains(NodeFlags::PILE);

    let tiled: Vec<NodeId> = tile.children.iter().copied()
        .filter(|child| subtle.tree.get(*child).is_some_and(Node::is_tiled))
        .collect();

    if piled {
        let top = tile.top.filter(|top| tiled.contains(top)).or_else(|| tiled.first().copied());

        for child in &tiled {
            subtle.tree.node_mut(*child)?.flags.set(NodeFlags::SHADE, Some(*child) != top);
        }

        subtle.tree.node_mut(id)?.tile_mut().context("Node is no container")?.top = top;
    }

    let mut slots = Vec::with_capacity(tiled.len());

    for child in &tiled {
        let node = subtle.tree.node(*child)?;

        slots.push(LayoutSlot {
            shaded: node.flags.contains(NodeFlags::SHADE),
            weight: node.flags.contains(NodeFlags::RESIZE).then_some(node.size),
        });
    }

    let layout = layout(orientation, width, height, subtle.title_height, &slots);

    {
        let tile = subtle.tree.node_mut(id)?.tile_mut().context("Node is no container")?;

        tile.shaded = slots.iter().filter(|slot| slot.shaded).count() as u16;
    }

    for (child, rect) in tiled.iter().zip(layout.rects) {
        subtle.tree.node_mut(*child)?.geom = rect;

        if subtle.tree.node(*child)?.is_container() {
            configure(subtle, *child)?;
        }

        resize(subtle, *child)?;
    }

    update_buttons(subtle, id)?;

    debug!("{}: id={}, n={}, mean={}", function_name!(), id, tiled.len(), layout.mean);

    Ok(())
}

/// Push the geometry of a node to its windows
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Node to resize
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn resize(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let (bw, th) = (subtle.border_width, subtle.title_height);
    let node = subtle.tree.node(id)?;
    let flags = node.flags;
    let mut geom = node.geom;

    let Some(client) = node.client() else {
        let frame = node.frame;

        subtle.backend.move_resize(frame, geom)?;

        return update_buttons(subtle, id);
    };

    let (win, caption, name) = (client.win, client.caption, client.name.clone());
    let (frame, title, left, right, bottom) = (node.frame, node.title, node.left, node.right, node.bottom);
    let holder = subtle.windows.lookup(win) == Some(id) && !flags.contains(NodeFlags::DEAD);

    if flags.contains(NodeFlags::SHADE) && !flags.contains(NodeFlags::FULL) {
        geom.height = th;
    }

    geom.width = geom.width.max(1);
    geom.height = geom.height.max(1);

    let text_width = subtle.backend.text_width(&name)?;
    let backend = subtle.backend.as_mut();

    backend.move_resize(frame, geom)?;

    if flags.contains(NodeFlags::FULL) {
        for win in [title, caption, left, right, bottom] {
            backend.unmap(win)?;
        }

        if holder {
            backend.move_resize(win, Rect::new(0, 0, geom.width, geom.height))?;
            backend.map(win)?;
        }
    } else {
        let caption_width = text_width.saturating_add(CAPTION_PADDING)
            .min(geom.width.saturating_sub(th)).max(1);

        backend.move_resize(title, Rect::new(0, 0, geom.width, th))?;
        backend.move_resize(caption, Rect::new(0, 0, caption_width, th))?;
        backend.map(title)?;
        backend.map(caption)?;
        backend.raise(caption)?;

        if flags.contains(NodeFlags::SHADE) {
            for win in [left, right, bottom] {
                backend.unmap(win)?;
            }

            if holder {
                backend.unmap(win)?;
            }
        } else {
            let side = geom.height.saturating_sub(th).max(1);
            let inner = Rect::new(bw as i16, th as i16,
                                  geom.width.saturating_sub(2 * bw).max(1),
                                  geom.height.saturating_sub(th + bw).max(1));

            backend.move_resize(left, Rect::new(0, th as i16, bw.max(1), side))?;
            backend.move_resize(right, Rect::new(geom.width.saturating_sub(bw) as i16, th as i16,
                                                 bw.max(1), side))?;
            backend.move_resize(bottom, Rect::new(0, geom.height.saturating_sub(bw) as i16,
                                                  geom.width, bw.max(1)))?;

            for win in [left, right, bottom] {
                backend.map(win)?;
            }

            if holder {
                backend.move_resize(win, inner)?;
                backend.map(win)?;
            }
        }
    }

    if holder && !flags.contains(NodeFlags::SHADE) {
        let (x, y) = absolute_origin(subtle, id);
        let notify = if flags.contains(NodeFlags::FULL) {
            Rect::new(x, y, geom.width, geom.height)
        } else {
            Rect::new(x + bw as i16, y + th as i16, geom.width.saturating_sub(2 * bw),
                      geom.height.saturating_sub(th + bw))
        };

        subtle.backend.send_configure_notify(win, notify)?;
    }

    render(subtle, id)
}

fn update_buttons(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let th = subtle.title_height;
    let node = subtle.tree.node(id)?;
    let width = node.geom.width;

    let NodeKind::Tile(tile) = &node.kind else {
        return Ok(());
    };

    let (new_button, delete_button, empty) = (tile.new_button, tile.delete_button, tile.children.is_empty());

    if empty {
        subtle.backend.move_resize(new_button, Rect::new(width.saturating_sub(2 * th) as i16, 0, th, th))?;
        subtle.backend.move_resize(delete_button, Rect::new(width.saturating_sub(th) as i16, 0, th, th))?;

        for button in [new_button, delete_button] {
            subtle.backend.map(button)?;
            subtle.backend.raise(button)?;
        }

        render(subtle, id)?;
    } else {
        subtle.backend.unmap(new_button)?;
        subtle.backend.unmap(delete_button)?;
    }

    Ok(())
}

/// Draw decorations of a node
pub(crate) fn render(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;
    let colors = subtle.colors;

    match &node.kind {
        NodeKind::Client(client) => {
            let focused = subtle.focus == Some(id);
            let color = if focused { colors.focus } else { colors.normal };
            let (name, caption) = (client.name.clone(), client.caption);
            let (title, left, right, bottom) = (node.title, node.left, node.right, node.bottom);
            let border = if node.flags.contains(NodeFlags::URGENT) {
                colors.cover
            } else if focused {
                colors.focus
            } else {
                colors.border
            };

            let backend = subtle.backend.as_mut();

            backend.set_background(title, colors.background)?;
            backend.clear_window(title)?;
            backend.set_background(caption, color)?;
            backend.clear_window(caption)?;
            backend.draw_text(caption, 3, &name, colors.text, color)?;

            for win in [left, right, bottom] {
                backend.set_background(win, border)?;
                backend.clear_window(win)?;
            }
        }
        NodeKind::Tile(tile) if tile.children.is_empty() => {
            let (new_button, delete_button) = (tile.new_button, tile.delete_button);
            let backend = subtle.backend.as_mut();

            for (button, label) in [(new_button, "+"), (delete_button, "x")] {
                backend.set_background(button, colors.cover)?;
                backend.clear_window(button)?;
                backend.draw_text(button, 3, label, colors.text, colors.cover)?;
            }
        }
        _ => {}
    }

    Ok(())
}

/// Update WM_STATE and _NET_WM_STATE of a client
fn publish_state(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;
    let win = node.client().context("Node is no client")?.win;
    let flags = node.flags;

    let mut states = Vec::new();

    if flags.contains(NodeFlags::FULL) {
        states.push(NetState::Fullscreen);
    }

    if flags.contains(NodeFlags::SHADE) {
        states.push(NetState::Shaded);
    }

    let wm_state = if flags.contains(NodeFlags::SHADE) { WMState::Iconic } else { WMState::Normal };

    subtle.backend.set_property(win, Hint::NetWmState, PropValue::States(states))?;
    subtle.backend.set_property(win, Hint::WmState, PropValue::WmState(wm_state))
}

/// Remove a node with all of its descendants and update the layout of the view
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Node to remove
/// * `release` - What to do with native windows without other nodes
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn delete(subtle: &mut Subtle, id: NodeId, release: Release) -> Result<()> {
    let parent = detach(subtle, id)?;
    let removed = {
        let mut removed = subtle.tree.descendants(id);

        removed.push(id);
        removed
    };

    delete_subtree(subtle, id, release)?;

    if subtle.focus.is_some_and(|focus| removed.contains(&focus)) {
        subtle.focus = parent;
    }

    if let Some(parent) = parent {
        let root = subtle.tree.root_of(parent);

        configure(subtle, root)?;
    }

    debug!("{}: id={}, release={:?}", function_name!(), id, release);

    Ok(())
}

/// Free a detached node and its descendants
pub(crate) fn delete_subtree(subtle: &mut Subtle, id: NodeId, release: Release) -> Result<()> {
    for child in subtle.tree.children(id) {
        delete_subtree(subtle, child, release)?;
    }

    let origin = absolute_origin(subtle, id);
    let node = subtle.tree.remove(id).with_context(|| format!("Stale node id {id}"))?;

    for win in node.own_windows() {
        subtle.windows.unregister(win);
    }

    // Rule tiles are recreated on demand
    for view in subtle.views.iter_mut() {
        for rule in view.rules.iter_mut() {
            if rule.tile == Some(id) {
                rule.tile = None;
            }
        }
    }

    if let Some(client) = node.client() {
        release_native(subtle, &node, client, id, origin, release)?;
    }

    subtle.backend.destroy_window(node.frame)?;

    if subtle.focus == Some(id) {
        subtle.focus = None;
    }

    Ok(())
}

fn release_native(subtle: &mut Subtle, node: &Node, client: &ClientData, id: NodeId,
                  (x, y): (i16, i16), release: Release) -> Result<()>
{
    let win = client.win;
    let dead = node.flags.contains(NodeFlags::DEAD);
    let held = subtle.windows.lookup(win) == Some(id);
    let others = subtle.nodes_of(win);

    if held {
        subtle.windows.unregister(win);
    }

    if let Some(other) = others.first().copied() {
        if 1 == others.len() {
            subtle.tree.node_mut(other)?.flags.remove(NodeFlags::MULTI);
        }

        if held && !dead {
            hold_native(subtle, other)?;
            resize(subtle, other)?;
        }

        return Ok(());
    }

    if !dead {
        let root = subtle.backend.root();

        subtle.backend.unmap(win)?;
        subtle.backend.reparent(win, root, x, y)?;

        if Release::Close == release {
            if node.flags.contains(NodeFlags::CLOSE) {
                subtle.backend.send_protocol(win, Protocol::DeleteWindow)?;
            } else {
                subtle.backend.kill_client(win)?;
            }
        }
    }

    subtle.clients.pop(&win);

    ewmh::publish_clients(subtle)
}

/// Close the native window of a client node
///
/// Clients supporting WM_DELETE_WINDOW get a polite request and are removed on
/// their DestroyNotify, all others are killed right away.
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Client node
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn close(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;

    let Some(client) = node.client() else {
        return delete(subtle, id, Release::Close);
    };

    let win = client.win;

    if node.flags.contains(NodeFlags::CLOSE) {
        subtle.backend.send_protocol(win, Protocol::DeleteWindow)?;
    } else {
        subtle.backend.kill_client(win)?;

        for other in subtle.nodes_of(win) {
            subtle.tree.node_mut(other)?.flags.insert(NodeFlags::DEAD);
            delete(subtle, other, Release::Keep)?;
        }
    }

    debug!("{}: id={}, win={}", function_name!(), id, win);

    Ok(())
}

/// Reconfigure the parent of a node or just resize when it is not tiled
fn relayout(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    match subtle.tree.node(id)?.parent {
        Some(parent) => {
            configure(subtle, parent)?;

            if !subtle.tree.node(id)?.is_tiled() {
                resize(subtle, id)?;
            }

            Ok(())
        }
        None => resize(subtle, id),
    }
}

/// Toggle shade state of a client
pub(crate) fn shade(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node_mut(id)?;

    if !node.is_client() {
        return Ok(());
    }

    node.flags.toggle(NodeFlags::SHADE);

    let shaded = node.flags.contains(NodeFlags::SHADE);

    if let Some(tile) = node.parent.and_then(|p| subtle.tree.get_mut(p)).and_then(Node::tile_mut) {
        if shaded {
            tile.shaded += 1;
        } else {
            tile.shaded = tile.shaded.saturating_sub(1);
        }
    }

    publish_state(subtle, id)?;
    relayout(subtle, id)?;
    restack(subtle, id)?;

    debug!("{}: id={}, shaded={}", function_name!(), id, shaded);

    Ok(())
}

/// Toggle floating state of a client
pub(crate) fn toggle_float(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;

    if !node.is_client() || node.flags.contains(NodeFlags::FULL) {
        return Ok(());
    }

    let (frame, parent) = (node.frame, node.parent);

    if node.flags.intersects(NodeFlags::FLOAT | NodeFlags::TRANS) {
        subtle.tree.node_mut(id)?.flags.remove(NodeFlags::FLOAT | NodeFlags::TRANS);

        if let Some(parent) = parent {
            let pframe = subtle.tree.node(parent)?.frame;

            subtle.backend.reparent(frame, pframe, 0, 0)?;
        }
    } else {
        let (x, y) = absolute_origin(subtle, id);
        let root = subtle.backend.root();
        let visible = subtle.view_of(id) == subtle.current_view;

        let node = subtle.tree.node_mut(id)?;

        node.flags.insert(NodeFlags::FLOAT);
        node.geom.x = x;
        node.geom.y = y;

        subtle.backend.reparent(frame, root, x, y)?;

        if visible {
            subtle.backend.map(frame)?;
            subtle.backend.raise(frame)?;
        } else {
            subtle.backend.unmap(frame)?;
        }
    }

    relayout(subtle, id)?;

    debug!("{}: id={}", function_name!(), id);

    Ok(())
}

/// Toggle fullscreen state of a client
pub(crate) fn toggle_full(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;

    if !node.is_client() {
        return Ok(());
    }

    let (frame, parent, flags) = (node.frame, node.parent, node.flags);

    if flags.contains(NodeFlags::FULL) {
        let node = subtle.tree.node_mut(id)?;

        node.flags.remove(NodeFlags::FULL);

        if flags.intersects(NodeFlags::FLOAT | NodeFlags::TRANS) {
            node.geom = Rect::new((subtle.width / 4) as i16, (subtle.height / 4) as i16,
                                  subtle.width / 2, subtle.height / 2);
        } else if let Some(parent) = parent {
            let pframe = subtle.tree.node(parent)?.frame;

            subtle.backend.reparent(frame, pframe, 0, 0)?;
        }
    } else {
        let root = subtle.backend.root();
        let node = subtle.tree.node_mut(id)?;

        node.flags.insert(NodeFlags::FULL);
        node.geom = Rect::new(0, 0, subtle.width, subtle.height);

        subtle.backend.reparent(frame, root, 0, 0)?;
        subtle.backend.map(frame)?;
        subtle.backend.raise(frame)?;
    }

    publish_state(subtle, id)?;
    relayout(subtle, id)?;

    debug!("{}: id={}, full={}", function_name!(), id, !flags.contains(NodeFlags::FULL));

    Ok(())
}

/// Container of a node: the node itself or its parent
fn container_of(subtle: &Subtle, id: NodeId) -> Option<NodeId> {
    let node = subtle.tree.get(id)?;

    if node.is_container() { Some(id) } else { node.parent }
}

/// Toggle pile mode of the container of a node
pub(crate) fn toggle_pile(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let Some(tile_id) = container_of(subtle, id) else {
        return Ok(());
    };

    let node = subtle.tree.node_mut(tile_id)?;

    node.flags.toggle(NodeFlags::PILE);

    if !node.flags.contains(NodeFlags::PILE) {
        for child in subtle.tree.children(tile_id) {
            subtle.tree.node_mut(child)?.flags.remove(NodeFlags::SHADE);
        }

        if let Some(tile) = subtle.tree.get_mut(tile_id).and_then(Node::tile_mut) {
            tile.top = None;
            tile.shaded = 0;
        }
    } else if subtle.tree.node(id)?.is_client() {
        if let Some(tile) = subtle.tree.get_mut(tile_id).and_then(Node::tile_mut) {
            tile.top = Some(id);
        }
    }

    configure(subtle, tile_id)?;

    debug!("{}: tile={}", function_name!(), tile_id);

    Ok(())
}

/// Make a child the visible one of its piled parent
pub(crate) fn set_top(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let Some(parent) = subtle.tree.node(id)?.parent else {
        return Ok(());
    };

    let node = subtle.tree.node_mut(parent)?;

    if !node.flags.contains(NodeFlags::PILE) {
        return Ok(());
    }

    if let Some(tile) = node.tile_mut() {
        tile.top = Some(id);
    }

    configure(subtle, parent)
}

/// Flip the split axis of the container of a node
pub(crate) fn toggle_layout(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let Some(tile_id) = container_of(subtle, id) else {
        return Ok(());
    };

    if let Some(tile) = subtle.tree.get_mut(tile_id).and_then(Node::tile_mut) {
        tile.orientation = tile.orientation.flip();
    }

    configure(subtle, tile_id)
}

/// Split the container of a node by adding an empty tile
pub(crate) fn new_tile(subtle: &mut Subtle, id: NodeId) -> Result<NodeId> {
    let tile_id = container_of(subtle, id).context("Node has no container")?;
    let orientation = subtle.tree.node(tile_id)?.tile()
        .map(|tile| tile.orientation.flip())
        .unwrap_or_default();

    let new = create_tile(subtle, orientation, TileOrigin::User)?;

    attach(subtle, tile_id, new)?;

    Ok(new)
}

/// Raise a node
pub(crate) fn raise(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let frame = subtle.tree.node(id)?.frame;

    subtle.backend.raise(frame)
}

/// Lower a node
pub(crate) fn lower(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let frame = subtle.tree.node(id)?.frame;

    subtle.backend.lower(frame)
}

/// Raise the decorations of a node above its content
pub(crate) fn restack(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;
    let frame = node.frame;

    for win in node.own_windows().into_iter().filter(|win| *win != frame) {
        subtle.backend.raise(win)?;
    }

    Ok(())
}

/// Give input focus to a node
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Node to focus; containers pass it on to their first client
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn focus(subtle: &mut Subtle, id: NodeId) -> Result<()> {
    let node = subtle.tree.node(id)?;

    if node.is_container() {
        let first = subtle.tree.descendants(id).into_iter()
            .find(|child| subtle.tree.get(*child).is_some_and(Node::is_client));

        return match first {
            Some(first) => focus(subtle, first),
            None => {
                let frame = node.frame;

                subtle.backend.set_input_focus(frame)
            }
        };
    }

    let (frame, flags) = (node.frame, node.flags);
    let win = node.client().map_or(NONE, |client| client.win);
    let holder = subtle.windows.lookup(win) == Some(id);

    if flags.contains(NodeFlags::FOCUS) && holder {
        subtle.backend.send_protocol(win, Protocol::TakeFocus)?;
    }

    if flags.contains(NodeFlags::INPUT) || !flags.contains(NodeFlags::FOCUS) {
        subtle.backend.set_input_focus(if holder { win } else { frame })?;
    }

    let prev = subtle.focus.replace(id);

    if let Some(prev) = prev.filter(|prev| *prev != id && subtle.tree.contains(*prev)) {
        render(subtle, prev)?;
    }

    render(subtle, id)?;
    ewmh::publish_active(subtle, win)?;

    debug!("{}: id={}, win={}", function_name!(), id, win);

    Ok(())
}

/// Client nodes of a subtree in layout order
pub(crate) fn clients_of(subtle: &Subtle, id: NodeId) -> Array<NodeId> {
    subtle.tree.descendants(id).into_iter()
        .filter(|child| subtle.tree.get(*child).is_some_and(Node::is_client))
        .collect()
}

/// Direction for focus changes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Direction {
    Above,
    Below,
    Next,
    Prev,
    Any,
}

/// Move focus inside the current view
pub(crate) fn focus_dir(subtle: &mut Subtle, dir: Direction) -> Result<()> {
    let Some(root) = subtle.current_root() else {
        return Ok(());
    };

    let clients = clients_of(subtle, root);
    let current = subtle.focus.filter(|focus| subtle.tree.contains(*focus));

    let target = match (dir, current) {
        (Direction::Any, _) | (_, None) => clients.iter().copied()
            .find(|id| subtle.tree.get(*id).is_some_and(|node| node.flags.contains(NodeFlags::URGENT)))
            .or_else(|| clients.first().copied()),
        (Direction::Next | Direction::Prev, Some(current)) => {
            let len = clients.len();

            clients.find(&current).and_then(|idx| match dir {
                Direction::Next => clients.get((idx + 1) % len),
                _ => clients.get((idx + len - 1) % len),
            }).copied()
        }
        (Direction::Above | Direction::Below, Some(current)) => {
            let parent = subtle.tree.node(current)?.parent;
            let siblings = parent.map(|parent| subtle.tree.children(parent)).unwrap_or_default();

            siblings.iter().position(|sibling| *sibling == current)
                .and_then(|idx| match dir {
                    Direction::Above => idx.checked_sub(1),
                    _ => Some(idx + 1),
                })
                .and_then(|idx| siblings.get(idx).copied())
        }
    };

    match target {
        Some(target) => focus(subtle, target),
        None => {
            warn!("No client to focus in direction {:?}", dir);

            Ok(())
        }
    }
}

/// Update the title of a client node
pub(crate) fn set_name(subtle: &mut Subtle, id: NodeId, name: Option<String>) -> Result<()> {
    if let Some(client) = subtle.tree.node_mut(id)?.client_mut() {
        client.name = name.unwrap_or_else(|| PLACEHOLDER_NAME.into());
    }

    resize(subtle, id)
}
