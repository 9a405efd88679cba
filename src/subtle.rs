///
/// @package subtle-tiler
///
/// @file Subtle functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use std::process::Child;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use anyhow::Result;
use bitflags::bitflags;
use hex_color::HexColor;
use log::{debug, warn};
use stdext::function_name;
use x11rb::NONE;
use x11rb::protocol::xproto::Window;
use crate::array::Array;
use crate::backend::Backend;
use crate::config::Config;
use crate::key::Key;
use crate::node::{NodeId, Tree};
use crate::queue::Queue;
use crate::registry::Registry;
use crate::sublet::{Schedule, Sublet};
use crate::tag::Tag;
use crate::tagging::Tagging;
use crate::view::View;

bitflags! {
    /// Config and state-flags for [`Subtle`]
    #[derive(Default, Debug, Copy, Clone, PartialEq)]
    pub(crate) struct SubtleFlags: u32 {
        /// Debug enabled
        const DEBUG = 1 << 0;
        /// Replace previous wm
        const REPLACE = 1 << 1;
    }
}

/// Pixel values of all colors
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Colors {
    pub(crate) focus: u32,
    pub(crate) normal: u32,
    pub(crate) cover: u32,
    pub(crate) border: u32,
    pub(crate) text: u32,
    pub(crate) background: u32,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            focus: 0x0060_80a0,
            normal: 0x0030_3030,
            cover: 0x0050_5050,
            border: 0x0000_0000,
            text: 0x00ff_ffff,
            background: 0x0020_2020,
        }
    }
}

/// Convert a hex color to a TrueColor pixel
pub(crate) fn parse_color(value: &str) -> Result<u32> {
    let color = HexColor::parse(value)?;

    Ok(u32::from(color.r) << 16 | u32::from(color.g) << 8 | u32::from(color.b))
}

impl Colors {
    /// Read colors from config and keep defaults for missing or broken ones
    pub(crate) fn from_config(config: &Config) -> Self {
        let mut colors = Self::default();

        for (name, value) in &config.colors {
            let slot = match name.as_str() {
                "focus" => &mut colors.focus,
                "normal" => &mut colors.normal,
                "cover" => &mut colors.cover,
                "border" => &mut colors.border,
                "text" => &mut colors.text,
                "background" => &mut colors.background,
                _ => {
                    warn!("Unknown color `{}'", name);

                    continue;
                }
            };

            match parse_color(value) {
                Ok(pixel) => *slot = pixel,
                Err(err) => warn!("Invalid color `{}' for {}: {}", value, name, err),
            }
        }

        colors
    }
}

pub(crate) struct Subtle {
    pub(crate) flags: SubtleFlags,
    pub(crate) exiting: Arc<AtomicBool>,
    pub(crate) backend: Box<dyn Backend>,

    pub(crate) tree: Tree,
    /// Frames, captions and native windows of nodes
    pub(crate) windows: Registry<NodeId>,
    /// View buttons of the bar
    pub(crate) view_buttons: Registry<usize>,
    /// Sublet windows of the bar
    pub(crate) sublet_wins: Registry<usize>,

    pub(crate) tags: Array<Tag>,
    pub(crate) views: Array<View>,
    pub(crate) current_view: Option<usize>,
    pub(crate) focus: Option<NodeId>,
    pub(crate) keys: Array<Key>,
    pub(crate) sublets: Vec<Sublet>,
    pub(crate) queue: Queue<Schedule>,

    /// Native windows in order of appearance
    pub(crate) clients: Array<Window>,
    /// Time of the last title click, shared by all windows
    pub(crate) last_click: u32,
    /// Spawned commands not reaped yet
    pub(crate) children: Vec<Child>,

    pub(crate) border_width: u16,
    pub(crate) title_height: u16,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) colors: Colors,

    pub(crate) support_win: Window,
    pub(crate) bar_win: Window,
    pub(crate) views_win: Window,
    pub(crate) sublets_win: Window,
}

impl Subtle {
    /// Create a new instance
    ///
    /// # Arguments
    ///
    /// * `backend` - Connection to the window system
    ///
    /// # Returns
    ///
    /// A new [`Subtle`] without any views or tags
    pub(crate) fn new(backend: Box<dyn Backend>) -> Self {
        let (width, height) = backend.screen_size();

        Self {
            flags: SubtleFlags::empty(),
            exiting: Arc::new(AtomicBool::new(false)),
            backend,
            tree: Tree::new(),
            windows: Registry::new("nodes"),
            view_buttons: Registry::new("views"),
            sublet_wins: Registry::new("sublets"),
            tags: Array::new(),
            views: Array::new(),
            current_view: None,
            focus: None,
            keys: Array::new(),
            sublets: Vec::new(),
            queue: Queue::new(),
            clients: Array::new(),
            last_click: 0,
            children: Vec::new(),
            border_width: 2,
            title_height: 16,
            width,
            height,
            colors: Colors::default(),
            support_win: NONE,
            bar_win: NONE,
            views_win: NONE,
            sublets_win: NONE,
        }
    }

    /// Check config and init all general options
    pub(crate) fn init(&mut self, config: &Config) {
        if config.debug {
            self.flags.insert(SubtleFlags::DEBUG);
        }

        if config.replace {
            self.flags.insert(SubtleFlags::REPLACE);
        }

        self.border_width = config.subtle_int("border_width", 2).clamp(0, 32) as u16;
        self.title_height = config.subtle_int("title_height", 16).clamp(8, 128) as u16;
        self.colors = Colors::from_config(config);

        debug!("{}: subtle={}", function_name!(), self);
    }

    pub(crate) fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::SeqCst)
    }

    /// All client nodes wrapping the native window
    pub(crate) fn nodes_of(&self, win: Window) -> Vec<NodeId> {
        self.tree.ids()
            .filter(|id| self.tree.get(*id)
                .and_then(|node| node.client())
                .is_some_and(|client| client.win == win))
            .collect()
    }

    /// Tags of a client or empty when unknown
    pub(crate) fn client_tags(&self, win: Window) -> Tagging {
        self.nodes_of(win).first()
            .and_then(|id| self.tree.get(*id))
            .and_then(|node| node.client())
            .map(|client| client.tags)
            .unwrap_or_default()
    }

    /// Index of the view the node belongs to
    pub(crate) fn view_of(&self, id: NodeId) -> Option<usize> {
        let root = self.tree.root_of(id);

        self.views.iter().position(|view| view.root == Some(root))
    }

    /// Root node of the current view
    pub(crate) fn current_root(&self) -> Option<NodeId> {
        self.current_view
            .and_then(|idx| self.views.get(idx))
            .and_then(|view| view.root)
    }

    /// Native window of a client node
    pub(crate) fn client_win(&self, id: NodeId) -> Option<Window> {
        self.tree.get(id).and_then(|node| node.client()).map(|client| client.win)
    }
}

impl fmt::Display for Subtle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(flags={:?}, width={}, height={}, bw={}, th={}, views={}, tags={}, nodes={})",
               self.flags, self.width, self.height, self.border_width, self.title_height,
               self.views.len(), self.tags.len(), self.tree.len())
    }
}
