///
/// @package subtle-tiler
///
/// @file Backend functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::collections::HashMap;
use std::time::Duration;
use anyhow::Result;
use x11rb::protocol::xproto::{Colormap, Keycode, Keysym, StackMode, Window};
use crate::ewmh::{Hint, Message, NetState, Property, WMState};
use crate::rect::Rect;

/// Kind of a window we create ourself
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum WinKind {
    /// Container of a node; child frames are reparented into it
    Frame,
    /// Border, title or button of a node
    Decoration,
    /// Status bar and its parts
    Bar,
    /// Invisible helper window
    Support,
}

/// Pointer shape while dragging
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Cursor {
    Move,
    Horizontal,
    Vertical,
    Square,
}

/// ICCCM protocols a client may take part in
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Protocol {
    TakeFocus,
    DeleteWindow,
}

/// Everything we learn about a foreign window when we adopt it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ClientInfo {
    /// WM_NAME; [`None`] when the fetch failed
    pub(crate) name: Option<String>,
    /// Class part of WM_CLASS
    pub(crate) klass: String,
    pub(crate) colormap: Colormap,
    /// Initial WM_STATE from the WM_HINTS
    pub(crate) initial_state: Option<WMState>,
    pub(crate) input: bool,
    pub(crate) urgent: bool,
    pub(crate) take_focus: bool,
    pub(crate) delete_window: bool,
    pub(crate) transient_for: Option<Window>,
}

/// Value of a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PropValue {
    Cardinals(Vec<u32>),
    Windows(Vec<Window>),
    Hints(Vec<Hint>),
    States(Vec<NetState>),
    Strings(Vec<String>),
    Utf8(String),
    WmState(WMState),
}

/// Raw payload of a client message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MessageData {
    pub(crate) format: u8,
    pub(crate) bytes: [u8; 20],
    pub(crate) longs: [u32; 5],
}

impl MessageData {
    /// Create payload from five longs
    pub(crate) fn from_longs(longs: [u32; 5]) -> Self {
        let mut bytes = [0u8; 20];

        for (chunk, long) in bytes.chunks_mut(4).zip(longs.iter()) {
            chunk.copy_from_slice(&long.to_ne_bytes());
        }

        Self { format: 32, bytes, longs }
    }

    /// Create payload from a string of max. 20 bytes
    pub(crate) fn from_name(name: &str) -> Self {
        let mut bytes = [0u8; 20];
        let len = name.len().min(bytes.len());

        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);

        let mut longs = [0u32; 5];

        for (long, chunk) in longs.iter_mut().zip(bytes.chunks(4)) {
            *long = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        Self { format: 8, bytes, longs }
    }
}

/// Values of a configure request; unset fields were not requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ConfigureValues {
    pub(crate) x: Option<i16>,
    pub(crate) y: Option<i16>,
    pub(crate) width: Option<u16>,
    pub(crate) height: Option<u16>,
    pub(crate) border_width: Option<u16>,
    pub(crate) sibling: Option<Window>,
    pub(crate) stack_mode: Option<StackMode>,
}

/// Events the window manager reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    ButtonPress {
        win: Window,
        subwin: Window,
        button: u8,
        state: u16,
        time: u32,
    },
    KeyPress {
        win: Window,
        keycode: Keycode,
        state: u16,
    },
    ConfigureRequest {
        win: Window,
        values: ConfigureValues,
    },
    MapRequest {
        win: Window,
    },
    DestroyNotify {
        win: Window,
    },
    ClientMessage {
        win: Window,
        /// [`None`] for atoms we don't know
        message: Option<Message>,
        data: MessageData,
    },
    ColormapNotify {
        win: Window,
        colormap: Colormap,
        new: bool,
    },
    PropertyNotify {
        win: Window,
        property: Option<Property>,
    },
    EnterNotify {
        win: Window,
    },
    Expose {
        win: Window,
    },
    FocusIn {
        win: Window,
    },
    Unknown,
}

/// Events of the modal drag loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DragEvent {
    Enter {
        win: Window,
    },
    Motion {
        x_root: i16,
        y_root: i16,
    },
    Release {
        x_root: i16,
        y_root: i16,
    },
}

/// Everything the window manager needs from the window system
pub(crate) trait Backend {
    fn root(&self) -> Window;
    fn screen_size(&self) -> (u16, u16);
    /// Viewable top-level windows that are not override-redirect
    fn managed_windows(&mut self) -> Result<Vec<Window>>;

    fn create_window(&mut self, parent: Window, geom: Rect, kind: WinKind) -> Result<Window>;
    fn destroy_window(&mut self, win: Window) -> Result<()>;
    fn reparent(&mut self, win: Window, parent: Window, x: i16, y: i16) -> Result<()>;
    fn move_resize(&mut self, win: Window, geom: Rect) -> Result<()>;
    fn map(&mut self, win: Window) -> Result<()>;
    fn unmap(&mut self, win: Window) -> Result<()>;
    fn map_subwindows(&mut self, win: Window) -> Result<()>;
    fn raise(&mut self, win: Window) -> Result<()>;
    fn lower(&mut self, win: Window) -> Result<()>;

    /// Adopt a foreign window: select its events and add it to the save set
    fn adopt(&mut self, win: Window) -> Result<()>;
    fn fetch_client_info(&mut self, win: Window) -> Result<ClientInfo>;
    fn fetch_name(&mut self, win: Window) -> Result<Option<String>>;

    fn set_input_focus(&mut self, win: Window) -> Result<()>;
    fn send_configure_notify(&mut self, win: Window, geom: Rect) -> Result<()>;
    fn send_protocol(&mut self, win: Window, protocol: Protocol) -> Result<()>;
    fn kill_client(&mut self, win: Window) -> Result<()>;
    fn set_property(&mut self, win: Window, hint: Hint, value: PropValue) -> Result<()>;
    fn forward_configure(&mut self, win: Window, values: ConfigureValues) -> Result<()>;
    fn install_colormap(&mut self, colormap: Colormap) -> Result<()>;
    /// Map a state atom of a _NET_WM_STATE message
    fn decode_state(&self, atom: u32) -> Option<NetState>;

    fn grab_pointer(&mut self, win: Window, cursor: Cursor) -> Result<bool>;
    fn ungrab_pointer(&mut self) -> Result<()>;
    fn grab_server(&mut self) -> Result<()>;
    fn ungrab_server(&mut self) -> Result<()>;
    /// Position of the pointer relative to given window
    fn query_pointer(&mut self, win: Window) -> Result<(i16, i16)>;
    /// Windows containing the given root position, from the top-level window down
    fn windows_at(&mut self, x_root: i16, y_root: i16) -> Result<Vec<Window>>;
    /// Block until the next drag related event arrives
    fn next_drag_event(&mut self) -> Result<DragEvent>;
    /// Draw or erase the xor rubber band on the root window
    fn draw_mask(&mut self, win: Window, geom: Rect) -> Result<()>;

    fn keyboard_mapping(&mut self) -> Result<HashMap<Keysym, Keycode>>;
    fn grab_keys(&mut self, win: Window, keys: &[(Keycode, u16)]) -> Result<()>;
    fn ungrab_keys(&mut self, win: Window) -> Result<()>;

    fn set_background(&mut self, win: Window, color: u32) -> Result<()>;
    fn clear_window(&mut self, win: Window) -> Result<()>;
    fn fill_rect(&mut self, win: Window, geom: Rect, color: u32) -> Result<()>;
    fn draw_text(&mut self, win: Window, x: i16, text: &str, fg: u32, bg: u32) -> Result<()>;
    fn text_width(&mut self, text: &str) -> Result<u16>;

    fn flush(&mut self) -> Result<()>;
    /// Wait at most `timeout` for the next event; [`None`] waits forever
    fn wait_for_event(&mut self, timeout: Option<Duration>) -> Result<Option<Event>>;
    /// Fetch the next already queued event without blocking
    fn poll_event(&mut self) -> Result<Option<Event>>;
}
