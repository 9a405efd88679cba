///
/// @package subtle-tiler
///
/// @file Node functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use anyhow::{Context, Result};
use bitflags::bitflags;
use x11rb::NONE;
use x11rb::protocol::xproto::{Colormap, Window};
use crate::array::Array;
use crate::rect::Rect;
use crate::tagging::Tagging;

bitflags! {
    /// State-flags for [`Node`]
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
    pub(crate) struct NodeFlags: u32 {
        /// Collapsed to the title bar
        const SHADE = 1 << 0;
        /// Floating and raised above the tiles
        const FLOAT = 1 << 1;
        /// Fullscreen mode
        const FULL = 1 << 2;
        /// Tile shows only its top child
        const PILE = 1 << 3;
        /// Transient window
        const TRANS = 1 << 4;
        /// Native window is already gone
        const DEAD = 1 << 5;
        /// Client shown on more than one view
        const MULTI = 1 << 6;
        /// Keeps its weight during layout
        const RESIZE = 1 << 7;
        /// Urgency hint set
        const URGENT = 1 << 8;

        /// Active/passive focus-model
        const INPUT = 1 << 16;
        /// Send focus message
        const FOCUS = 1 << 17;
        /// Send close message
        const CLOSE = 1 << 18;
    }
}

/// Split axis of a tile
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Orientation {
    /// Children side by side
    #[default]
    Horizontal,
    /// Children on top of each other
    Vertical,
}

impl Orientation {
    pub(crate) fn flip(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// Reason a tile exists
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) enum TileOrigin {
    /// Created by the user and kept until deleted
    #[default]
    User,
    /// Created for a rule and removed again once empty
    Rule,
    /// Created by a drag split and collapsed once only one child is left
    Split,
}

/// Stable handle of a node inside the [`Tree`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId {
    idx: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.idx, self.generation)
    }
}

#[derive(Debug, Default)]
pub(crate) struct TileData {
    /// Children in layout order
    pub(crate) children: Array<NodeId>,
    pub(crate) orientation: Orientation,
    /// Number of shaded children
    pub(crate) shaded: u16,
    /// Button to split the tile
    pub(crate) new_button: Window,
    /// Button to remove the tile
    pub(crate) delete_button: Window,
    pub(crate) origin: TileOrigin,
    /// Visible child of a piled tile
    pub(crate) top: Option<NodeId>,
}

#[derive(Debug, Default)]
pub(crate) struct ClientData {
    /// Native window
    pub(crate) win: Window,
    pub(crate) name: String,
    pub(crate) klass: String,
    pub(crate) colormap: Colormap,
    pub(crate) caption: Window,
    pub(crate) tags: Tagging,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    /// Root tile of a view
    Screen(TileData),
    Tile(TileData),
    Client(ClientData),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) flags: NodeFlags,
    pub(crate) kind: NodeKind,
    /// Geometry relative to the parent frame
    pub(crate) geom: Rect,
    /// Weight in percent of the parent extent
    pub(crate) size: u8,
    pub(crate) parent: Option<NodeId>,

    pub(crate) frame: Window,
    pub(crate) title: Window,
    pub(crate) left: Window,
    pub(crate) right: Window,
    pub(crate) bottom: Window,
    pub(crate) button: Window,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            flags: NodeFlags::empty(),
            kind,
            geom: Rect::default(),
            size: 0,
            parent: None,
            frame: NONE,
            title: NONE,
            left: NONE,
            right: NONE,
            bottom: NONE,
            button: NONE,
        }
    }

    pub(crate) fn is_client(&self) -> bool {
        matches!(self.kind, NodeKind::Client(_))
    }

    pub(crate) fn is_container(&self) -> bool {
        !self.is_client()
    }

    pub(crate) fn tile(&self) -> Option<&TileData> {
        match &self.kind {
            NodeKind::Screen(tile) | NodeKind::Tile(tile) => Some(tile),
            NodeKind::Client(_) => None,
        }
    }

    pub(crate) fn tile_mut(&mut self) -> Option<&mut TileData> {
        match &mut self.kind {
            NodeKind::Screen(tile) | NodeKind::Tile(tile) => Some(tile),
            NodeKind::Client(_) => None,
        }
    }

    pub(crate) fn client(&self) -> Option<&ClientData> {
        match &self.kind {
            NodeKind::Client(client) => Some(client),
            _ => None,
        }
    }

    pub(crate) fn client_mut(&mut self) -> Option<&mut ClientData> {
        match &mut self.kind {
            NodeKind::Client(client) => Some(client),
            _ => None,
        }
    }

    /// Whether the node takes part in the layout of its parent
    pub(crate) fn is_tiled(&self) -> bool {
        !self.flags.intersects(NodeFlags::TRANS | NodeFlags::FLOAT | NodeFlags::FULL)
    }

    /// All windows we created for this node
    pub(crate) fn own_windows(&self) -> Vec<Window> {
        let mut wins = vec![self.frame, self.title, self.left, self.right, self.bottom, self.button];

        match &self.kind {
            NodeKind::Client(client) => wins.push(client.caption),
            NodeKind::Screen(tile) | NodeKind::Tile(tile) => {
                wins.push(tile.new_button);
                wins.push(tile.delete_button);
            }
        }

        wins.retain(|win| NONE != *win);

        wins
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Screen(tile) => write!(f, "screen(frame={}, n={})", self.frame, tile.children.len()),
            NodeKind::Tile(tile) => write!(f, "tile(frame={}, n={}, orientation={:?}, geom={})",
                                           self.frame, tile.children.len(), tile.orientation, self.geom),
            NodeKind::Client(client) => write!(f, "client(name={}, win={}, frame={}, geom={})",
                                               client.name, client.win, self.frame, self.geom),
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena owning every node
#[derive(Debug, Default)]
pub(crate) struct Tree {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Move node into the arena
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx];

            slot.node = Some(node);

            NodeId { idx, generation: slot.generation }
        } else {
            self.slots.push(Slot { generation: 0, node: Some(node) });

            NodeId { idx: self.slots.len() - 1, generation: 0 }
        }
    }

    /// Take node out of the arena; the id becomes stale
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.idx)?;

        if slot.generation != id.generation {
            return None;
        }

        let node = slot.node.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.idx);

        Some(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.idx)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.idx)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Get node or fail with a stale id error
    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).with_context(|| format!("Stale node id {id}"))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).with_context(|| format!("Stale node id {id}"))
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Children of a container; empty for clients
    pub(crate) fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .and_then(Node::tile)
            .map(|tile| tile.children.to_vec())
            .unwrap_or_default()
    }

    /// All descendants of a node in depth-first order, excluding the node
    pub(crate) fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();

        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }

        out
    }

    /// Check whether `ancestor` is on the parent chain of `id`
    pub(crate) fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = self.get(id).and_then(|node| node.parent);

        while let Some(parent) = cur {
            if parent == ancestor {
                return true;
            }

            cur = self.get(parent).and_then(|node| node.parent);
        }

        false
    }

    /// Topmost node of the chain
    pub(crate) fn root_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;

        while let Some(parent) = self.get(cur).and_then(|node| node.parent) {
            cur = parent;
        }

        cur
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(idx, slot)| NodeId { idx, generation: slot.generation })
    }
}
