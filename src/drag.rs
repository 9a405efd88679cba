///
/// @package subtle-tiler
///
/// @file Drag functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use anyhow::{Context, Result};
use log::debug;
use stdext::function_name;
use crate::backend::{Cursor, DragEvent};
use crate::node::{Node, NodeFlags, NodeId, Orientation, TileOrigin};
use crate::rect::Rect;
use crate::subtle::Subtle;
use crate::tree;

/// Max. share of a resized node in percent
pub(crate) const MAX_WEIGHT: u32 = 80;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum DragMode {
    /// Resize at the left border
    Left,
    /// Resize at the right border
    Right,
    /// Resize at the bottom border
    Bottom,
    /// Move a floating client
    Move,
    /// Move a tiled client to another place of the tree
    Swap,
}

/// Where a dragged node ends up relative to the drop target
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum DropZone {
    /// Split the target and go on top
    Top,
    Bottom,
    Left,
    Right,
    /// Insert into the parent above the target
    Above,
    Below,
    Before,
    After,
    /// Exchange with the target
    Swap,
}

fn within(value: f32, low: f32, high: f32) -> bool {
    value > low && value < high
}

impl DropZone {
    /// Resolve the zone under the pointer
    ///
    /// # Arguments
    ///
    /// * `x` - Pointer x relative to the target
    /// * `y` - Pointer y relative to the target
    /// * `width` - Width of the target
    /// * `height` - Height of the target
    /// * `prev` - Zone of the last motion; kept on the borders between zones
    ///
    /// # Returns
    ///
    /// Either [`Some`] zone or [`None`] when nothing was hit yet
    pub(crate) fn from_pointer(x: i16, y: i16, width: u16, height: u16, prev: Option<DropZone>) -> Option<DropZone> {
        if 0 == width || 0 == height {
            return prev;
        }

        let fx = f32::from(x) / f32::from(width);
        let fy = f32::from(y) / f32::from(height);

        if within(fx, 0.35, 0.65) {
            if within(fy, 0.1, 0.35) {
                return Some(DropZone::Top);
            } else if within(fy, 0.65, 0.9) {
                return Some(DropZone::Bottom);
            } else if within(fy, 0.35, 0.65) {
                return Some(DropZone::Swap);
            }
        }

        if fy < 0.1 {
            Some(DropZone::Above)
        } else if fy > 0.9 {
            Some(DropZone::Below)
        } else if within(fy, 0.1, 0.9) {
            if within(fx, 0.1, 0.35) {
                Some(DropZone::Left)
            } else if within(fx, 0.65, 0.9) {
                Some(DropZone::Right)
            } else if fx < 0.1 {
                Some(DropZone::Before)
            } else if fx > 0.9 {
                Some(DropZone::After)
            } else {
                prev
            }
        } else {
            prev
        }
    }

    /// Area of the target to highlight for this zone
    pub(crate) fn mask(self, target: Rect) -> Rect {
        let Rect { x, y, width, height } = target;
        let (half_w, half_h) = (width / 2, height / 2);
        let (strip_w, strip_h) = ((width / 10).max(1), (height / 10).max(1));

        match self {
            DropZone::Top => Rect::new(x, y, width, half_h),
            DropZone::Bottom => Rect::new(x, y + half_h as i16, width, half_h),
            DropZone::Left => Rect::new(x, y, half_w, height),
            DropZone::Right => Rect::new(x + half_w as i16, y, half_w, height),
            DropZone::Above => Rect::new(x, y, width, strip_h),
            DropZone::Below => Rect::new(x, y + (height - strip_h) as i16, width, strip_h),
            DropZone::Before => Rect::new(x, y, strip_w, height),
            DropZone::After => Rect::new(x + (width - strip_w) as i16, y, strip_w, height),
            DropZone::Swap => target,
        }
    }

    fn orientation(self) -> Orientation {
        match self {
            DropZone::Top | DropZone::Bottom | DropZone::Above | DropZone::Below => Orientation::Vertical,
            _ => Orientation::Horizontal,
        }
    }

    fn is_after(self) -> bool {
        matches!(self, DropZone::Bottom | DropZone::Right | DropZone::Below | DropZone::After)
    }
}

/// Absolute geometry of a node
fn absolute_rect(subtle: &Subtle, id: NodeId) -> Option<Rect> {
    let geom = subtle.tree.get(id)?.geom;
    let (x, y) = tree::absolute_origin(subtle, id);

    Some(Rect::new(x, y, geom.width, geom.height))
}

/// Deepest managed node below the pointer that may take the dragged node
fn drop_target(subtle: &mut Subtle, id: NodeId, x_root: i16, y_root: i16) -> Result<Option<NodeId>> {
    let path = subtle.backend.windows_at(x_root, y_root)?;

    Ok(path.iter().rev()
        .find_map(|win| subtle.windows.lookup(*win))
        .filter(|t| *t != id && !subtle.tree.is_ancestor(id, *t)))
}

/// Xor mask currently drawn on the root window
struct Mask {
    rect: Option<Rect>,
}

impl Mask {
    fn set(&mut self, subtle: &mut Subtle, rect: Option<Rect>) -> Result<()> {
        if self.rect == rect {
            return Ok(());
        }

        let root = subtle.backend.root();

        if let Some(old) = self.rect.take() {
            subtle.backend.draw_mask(root, old)?;
        }

        if let Some(new) = rect {
            subtle.backend.draw_mask(root, new)?;
        }

        self.rect = rect;

        Ok(())
    }
}

/// Drag a node with the pointer until the button is released
///
/// Pointer and server stay grabbed for the whole loop and are always released
/// afterwards, also when the loop fails.
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Dragged node
/// * `mode` - What the drag does
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn drag(subtle: &mut Subtle, id: NodeId, mode: DragMode) -> Result<()> {
    let root = subtle.backend.root();
    let cursor = match mode {
        DragMode::Left | DragMode::Right => Cursor::Horizontal,
        DragMode::Bottom => Cursor::Vertical,
        DragMode::Move => Cursor::Move,
        DragMode::Swap => Cursor::Square,
    };

    if !subtle.backend.grab_pointer(root, cursor)? {
        debug!("{}: pointer grab failed", function_name!());

        return Ok(());
    }

    let res = subtle.backend.grab_server()
        .and_then(|_| drag_loop(subtle, id, mode));

    subtle.backend.ungrab_server()?;
    subtle.backend.ungrab_pointer()?;

    res
}

fn drag_loop(subtle: &mut Subtle, id: NodeId, mode: DragMode) -> Result<()> {
    let root = subtle.backend.root();
    let th = subtle.title_height;
    let origin = absolute_rect(subtle, id).context("Dragged node is gone")?;
    let (start_x, start_y) = subtle.backend.query_pointer(root)?;

    let mut rect = origin;
    let mut mask = Mask { rect: None };
    let mut target: Option<NodeId> = None;
    let mut zone: Option<DropZone> = None;

    if DragMode::Swap != mode {
        mask.set(subtle, Some(rect))?;
    }

    loop {
        match subtle.backend.next_drag_event()? {
            DragEvent::Enter { win } => {
                target = subtle.windows.lookup(win)
                    .filter(|t| *t != id && !subtle.tree.is_ancestor(id, *t));
                zone = None;

                if DragMode::Swap == mode {
                    mask.set(subtle, None)?;
                }
            }
            DragEvent::Motion { x_root, y_root } => {
                let (dx, dy) = (x_root.saturating_sub(start_x), y_root.saturating_sub(start_y));

                match mode {
                    DragMode::Move => {
                        rect.x = origin.x.saturating_add(dx);
                        rect.y = origin.y.saturating_add(dy);
                    }
                    DragMode::Left => {
                        let width = (i32::from(origin.width) - i32::from(dx)).max(i32::from(th));

                        rect.width = width.min(i32::from(u16::MAX)) as u16;
                        rect.x = origin.x.saturating_add(origin.width as i16).saturating_sub(rect.width as i16);
                    }
                    DragMode::Right => {
                        let width = (i32::from(origin.width) + i32::from(dx)).max(i32::from(th));

                        rect.width = width.min(i32::from(u16::MAX)) as u16;
                    }
                    DragMode::Bottom => {
                        let height = (i32::from(origin.height) + i32::from(dy)).max(i32::from(th));

                        rect.height = height.min(i32::from(u16::MAX)) as u16;
                    }
                    DragMode::Swap => {
                        if let Some(trect) = target.and_then(|t| absolute_rect(subtle, t)) {
                            zone = DropZone::from_pointer(x_root.saturating_sub(trect.x),
                                                          y_root.saturating_sub(trect.y),
                                                          trect.width, trect.height, zone);

                            mask.set(subtle, zone.map(|z| z.mask(trect)))?;
                        }

                        continue;
                    }
                }

                mask.set(subtle, Some(rect))?;
            }
            DragEvent::Release { x_root, y_root } => {
                mask.set(subtle, None)?;

                let hit = drop_target(subtle, id, x_root, y_root)?;

                if DragMode::Swap == mode {
                    let prev = zone.filter(|_| hit == target);

                    zone = hit.and_then(|t| absolute_rect(subtle, t))
                        .and_then(|trect| DropZone::from_pointer(x_root.saturating_sub(trect.x),
                                                                 y_root.saturating_sub(trect.y),
                                                                 trect.width, trect.height, prev));
                }

                target = hit;

                break;
            }
        }
    }

    debug!("{}: id={}, mode={:?}, rect={}, target={:?}, zone={:?}",
        function_name!(), id, mode, rect, target, zone);

    let floating = subtle.tree.node(id)?.flags.intersects(NodeFlags::FLOAT | NodeFlags::TRANS);

    match mode {
        DragMode::Move if floating => place_floating(subtle, id, rect),
        DragMode::Left | DragMode::Right | DragMode::Bottom if floating => place_floating(subtle, id, rect),
        DragMode::Left | DragMode::Right => adjust_weight(subtle, id, rect, Orientation::Horizontal),
        DragMode::Bottom => adjust_weight(subtle, id, rect, Orientation::Vertical),
        DragMode::Swap => match (target, zone) {
            (Some(target), Some(zone)) => drop_at(subtle, id, target, zone),
            (Some(target), None) => drop_at(subtle, id, target, DropZone::Swap),
            _ => Ok(()),
        },
        DragMode::Move => Ok(()),
    }
}

fn place_floating(subtle: &mut Subtle, id: NodeId, rect: Rect) -> Result<()> {
    subtle.tree.node_mut(id)?.geom = rect;

    tree::resize(subtle, id)
}

/// Turn the dragged extent into a weight of the node along the axis
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Resized node
/// * `rect` - Dragged geometry
/// * `axis` - Axis of the drag
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn adjust_weight(subtle: &mut Subtle, id: NodeId, rect: Rect, axis: Orientation) -> Result<()> {
    // Find the nearest ancestor split along the drag axis
    let mut cur = id;

    let parent = loop {
        let Some(parent) = subtle.tree.node(cur)?.parent else {
            return Ok(());
        };

        if subtle.tree.node(parent)?.tile().is_some_and(|tile| tile.orientation == axis) {
            break parent;
        }

        cur = parent;
    };

    let pgeom = subtle.tree.node(parent)?.geom;
    let (extent, pextent) = match axis {
        Orientation::Horizontal => (u32::from(rect.width), u32::from(pgeom.width)),
        Orientation::Vertical => (u32::from(rect.height), u32::from(pgeom.height)),
    };

    if 0 == pextent {
        return Ok(());
    }

    let size = (extent * 100 / pextent).min(MAX_WEIGHT) as u8;
    let node = subtle.tree.node_mut(cur)?;

    node.size = size;
    node.flags.insert(NodeFlags::RESIZE);

    debug!("{}: id={}, size={}", function_name!(), cur, size);

    tree::configure(subtle, parent)
}

fn position(subtle: &Subtle, parent: NodeId, child: NodeId) -> Result<usize> {
    subtle.tree.node(parent)?.tile()
        .and_then(|tile| tile.children.find(&child))
        .context("Node is no child of its parent")
}

/// Move a node to the drop zone of a target
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `id` - Dragged node
/// * `target` - Node under the pointer
/// * `zone` - Zone of the target
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn drop_at(subtle: &mut Subtle, id: NodeId, target: NodeId, zone: DropZone) -> Result<()> {
    if id == target || subtle.tree.is_ancestor(id, target) || !subtle.tree.contains(target) {
        return Ok(());
    }

    let source_root = subtle.tree.root_of(id);
    let target_root = subtle.tree.root_of(target);
    let target_node = subtle.tree.node(target)?;

    // Containers under the pointer are empty, so just append
    if target_node.is_container() {
        tree::detach(subtle, id)?;
        tree::link(subtle, target, None, id)?;
    } else if DropZone::Swap == zone {
        swap(subtle, id, target)?;
    } else {
        let tparent = target_node.parent.context("Target has no parent")?;

        tree::detach(subtle, id)?;

        let orientation = subtle.tree.node(tparent)?.tile().map(|tile| tile.orientation);
        let after = usize::from(zone.is_after());

        match zone {
            DropZone::Top | DropZone::Bottom | DropZone::Left | DropZone::Right => {
                if Some(zone.orientation()) == orientation {
                    let idx = position(subtle, tparent, target)? + after;

                    tree::link(subtle, tparent, Some(idx), id)?;
                } else {
                    wrap(subtle, tparent, target, id, zone)?;
                }
            }
            _ => {
                let grandparent = subtle.tree.node(tparent)?.parent;

                match grandparent {
                    Some(grandparent) if Some(zone.orientation()) != orientation => {
                        let idx = position(subtle, grandparent, tparent)? + after;

                        tree::link(subtle, grandparent, Some(idx), id)?;
                    }
                    _ => {
                        let idx = position(subtle, tparent, target)? + after;

                        tree::link(subtle, tparent, Some(idx), id)?;
                    }
                }
            }
        }
    }

    tree::configure(subtle, target_root)?;

    if source_root != target_root && subtle.tree.contains(source_root) {
        tree::configure(subtle, source_root)?;
    }

    debug!("{}: id={}, target={}, zone={:?}", function_name!(), id, target, zone);

    Ok(())
}

/// Replace target by a new split tile holding target and node
fn wrap(subtle: &mut Subtle, parent: NodeId, target: NodeId, id: NodeId, zone: DropZone) -> Result<()> {
    let idx = position(subtle, parent, target)?;
    let tile = tree::create_tile(subtle, zone.orientation(), TileOrigin::Split)?;

    tree::detach(subtle, target)?;

    // Weight moves to the new tile
    let (flags, size) = {
        let node: &mut Node = subtle.tree.node_mut(target)?;
        let res = (node.flags, node.size);

        node.flags.remove(NodeFlags::RESIZE);
        node.size = 0;

        res
    };

    if flags.contains(NodeFlags::RESIZE) {
        let node = subtle.tree.node_mut(tile)?;

        node.flags.insert(NodeFlags::RESIZE);
        node.size = size;
    }

    tree::link(subtle, parent, Some(idx), tile)?;

    if zone.is_after() {
        tree::link(subtle, tile, None, target)?;
        tree::link(subtle, tile, None, id)?;
    } else {
        tree::link(subtle, tile, None, id)?;
        tree::link(subtle, tile, None, target)?;
    }

    Ok(())
}

/// Exchange the positions of two nodes
fn swap(subtle: &mut Subtle, a: NodeId, b: NodeId) -> Result<()> {
    let pa = subtle.tree.node(a)?.parent.context("Node has no parent")?;
    let pb = subtle.tree.node(b)?.parent.context("Node has no parent")?;
    let (ia, ib) = (position(subtle, pa, a)?, position(subtle, pb, b)?);

    if pa == pb {
        if let Some(tile) = subtle.tree.get_mut(pa).and_then(Node::tile_mut) {
            tile.children.swap(ia, ib);
        }

        return Ok(());
    }

    tree::detach(subtle, a)?;
    tree::detach(subtle, b)?;
    tree::link(subtle, pa, Some(ia), b)?;
    tree::link(subtle, pb, Some(ib), a)?;

    Ok(())
}
