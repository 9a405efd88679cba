///
/// @package subtle-tiler
///
/// @file Display functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::collections::{HashMap, VecDeque};
use std::os::fd::AsFd;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use stdext::function_name;
use x11rb::{COPY_DEPTH_FROM_PARENT, CURRENT_TIME, NONE};
use x11rb::connection::Connection;
use x11rb::protocol::Event as XEvent;
use x11rb::protocol::xproto::{Atom, AtomEnum, ChangeGCAux, ChangeWindowAttributesAux, ClientMessageEvent,
                              Colormap, ConfigWindow, ConfigureNotifyEvent, ConfigureRequestEvent,
                              ConfigureWindowAux, ConnectionExt, CreateGCAux, CreateWindowAux, EventMask,
                              Gcontext, GrabMode, GrabStatus, InputFocus, Keycode, Keysym, MapState, ModMask,
                              PropMode, Rectangle, SetMode, StackMode, SubwindowMode, Time, Window, WindowClass,
                              CONFIGURE_NOTIFY_EVENT, GX};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use crate::backend::{Backend, ClientInfo, ConfigureValues, Cursor, DragEvent, Event, MessageData, PropValue,
                     Protocol, WinKind};
use crate::config::{Config, MixedConfigVal};
use crate::ewmh::{self, Atoms, Hint, Message, NetState, Property, WMState};
use crate::font::{Font, DEFAULT_FONT};
use crate::rect::Rect;
use crate::subtle::Subtle;
use crate::view;

// Glyphs of the cursor font
const XC_FLEUR: u16 = 52;
const XC_SB_H_DOUBLE_ARROW: u16 = 108;
const XC_SB_V_DOUBLE_ARROW: u16 = 116;
const XC_DOTBOX: u16 = 40;

// Flags of WM_HINTS
const INPUT_HINT: u32 = 1 << 0;
const STATE_HINT: u32 = 1 << 1;
const URGENCY_HINT: u32 = 1 << 8;

#[derive(Debug, Default, Copy, Clone)]
struct Cursors {
    moving: u32,
    horizontal: u32,
    vertical: u32,
    square: u32,
}

/// Window system backend talking to a X11 server
pub(crate) struct X11Backend {
    conn: RustConnection,
    atoms: Atoms,
    screen_num: usize,
    root: Window,
    width: u16,
    height: u16,
    draw_gc: Gcontext,
    mask_gc: Gcontext,
    font: Font,
    cursors: Cursors,
    /// Events that arrived during a drag
    pending: VecDeque<Event>,
}

/// Connect to the display and set up everything for drawing
///
/// # Arguments
///
/// * `config` - Config values read either from args or config file
///
/// # Returns
///
/// A [`Result`] with either [`X11Backend`] on success or otherwise [`anyhow::Error`]
pub(crate) fn init(config: &Config) -> Result<X11Backend> {
    let (conn, screen_num) = x11rb::connect(Some(&*config.display))
        .with_context(|| format!("Failed to open display `{}'", config.display))?;

    let atoms = Atoms::new(&conn)?.reply()?;

    let screen = &conn.setup().roots[screen_num];
    let (root, width, height) = (screen.root, screen.width_in_pixels, screen.height_in_pixels);
    let white = screen.white_pixel;

    // Load font
    let font_name = match config.subtle.get("font") {
        Some(MixedConfigVal::S(name)) => name.as_str(),
        _ => DEFAULT_FONT,
    };

    let font = Font::new(&conn, font_name).or_else(|err| {
        warn!("Failed loading font `{}': {}", font_name, err);

        Font::new(&conn, DEFAULT_FONT)
    })?;

    // Create graphic contexts
    let draw_gc = conn.generate_id()?;

    conn.create_gc(draw_gc, root, &CreateGCAux::default()
        .font(font.fontable)
        .graphics_exposures(0))?.check()?;

    let mask_gc = conn.generate_id()?;

    conn.create_gc(mask_gc, root, &CreateGCAux::default()
        .function(GX::XOR)
        .foreground(white)
        .line_width(3)
        .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS))?.check()?;

    // Create cursors
    let cursor_font = conn.generate_id()?;

    conn.open_font(cursor_font, b"cursor")?.check()?;

    let glyph = |glyph: u16| -> Result<u32> {
        let cursor = conn.generate_id()?;

        conn.create_glyph_cursor(cursor, cursor_font, cursor_font, glyph, glyph + 1,
                                 0, 0, 0, 0xffff, 0xffff, 0xffff)?;

        Ok(cursor)
    };

    let cursors = Cursors {
        moving: glyph(XC_FLEUR)?,
        horizontal: glyph(XC_SB_H_DOUBLE_ARROW)?,
        vertical: glyph(XC_SB_V_DOUBLE_ARROW)?,
        square: glyph(XC_DOTBOX)?,
    };

    conn.close_font(cursor_font)?;

    info!("Display ({}) is {}x{}", config.display, width, height);

    Ok(X11Backend {
        conn,
        atoms,
        screen_num,
        root,
        width,
        height,
        draw_gc,
        mask_gc,
        font,
        cursors,
        pending: VecDeque::new(),
    })
}

impl X11Backend {
    /// Claim the window manager selection and become the window manager
    ///
    /// # Arguments
    ///
    /// * `replace` - Whether to replace a running window manager
    ///
    /// # Returns
    ///
    /// A [`Result`] with either the support [`Window`] on success or otherwise [`anyhow::Error`]
    pub(crate) fn claim(&mut self, replace: bool) -> Result<Window> {
        let support = self.create_window(self.root, Rect::new(-100, -100, 1, 1), WinKind::Support)?;

        let session = self.conn.intern_atom(false,
                                            format!("WM_S{}", self.screen_num).as_bytes())?.reply()?.atom;

        let owner = self.conn.get_selection_owner(session)?.reply()?.owner;

        if NONE != owner {
            if !replace {
                return Err(anyhow!("Found a running window manager"));
            }

            let aux = ChangeWindowAttributesAux::default()
                .event_mask(EventMask::STRUCTURE_NOTIFY);

            self.conn.change_window_attributes(owner, &aux)?.check()?;
            self.conn.flush()?;
        }

        self.conn.set_selection_owner(support, session, Time::CURRENT_TIME)?;

        if self.conn.get_selection_owner(session)?.reply()?.owner != support {
            return Err(anyhow!("Failed replacing current window manager"));
        }

        let aux = ChangeWindowAttributesAux::default()
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE);

        self.conn.change_window_attributes(self.root, &aux)?.check()
            .context("Another window manager is running")?;

        debug!("{}: support={}", function_name!(), support);

        Ok(support)
    }

    fn hint_atom(&self, hint: Hint) -> Atom {
        match hint {
            Hint::Supported => self.atoms._NET_SUPPORTED,
            Hint::ClientList => self.atoms._NET_CLIENT_LIST,
            Hint::ClientListStacking => self.atoms._NET_CLIENT_LIST_STACKING,
            Hint::NumberOfDesktops => self.atoms._NET_NUMBER_OF_DESKTOPS,
            Hint::DesktopNames => self.atoms._NET_DESKTOP_NAMES,
            Hint::DesktopGeometry => self.atoms._NET_DESKTOP_GEOMETRY,
            Hint::DesktopViewport => self.atoms._NET_DESKTOP_VIEWPORT,
            Hint::CurrentDesktop => self.atoms._NET_CURRENT_DESKTOP,
            Hint::ActiveWindow => self.atoms._NET_ACTIVE_WINDOW,
            Hint::Workarea => self.atoms._NET_WORKAREA,
            Hint::SupportingWmCheck => self.atoms._NET_SUPPORTING_WM_CHECK,
            Hint::VirtualRoots => self.atoms._NET_VIRTUAL_ROOTS,
            Hint::WmName => self.atoms._NET_WM_NAME,
            Hint::WmPid => self.atoms._NET_WM_PID,
            Hint::WmDesktop => self.atoms._NET_WM_DESKTOP,
            Hint::WmState => self.atoms.WM_STATE,
            Hint::NetWmState => self.atoms._NET_WM_STATE,
            Hint::TagList => self.atoms.SUBTLE_TAG_LIST,
            Hint::ClientTags => self.atoms.SUBTLE_CLIENT_TAGS,
            Hint::ViewTags => self.atoms.SUBTLE_VIEW_TAGS,
        }
    }

    fn state_atom(&self, state: NetState) -> Atom {
        match state {
            NetState::Fullscreen => self.atoms._NET_WM_STATE_FULLSCREEN,
            NetState::Shaded => self.atoms._NET_WM_STATE_SHADED,
        }
    }

    fn message_of(&self, atom: Atom) -> Option<Message> {
        let atoms = &self.atoms;

        [
            (atoms._NET_CURRENT_DESKTOP, Message::CurrentDesktop),
            (atoms._NET_ACTIVE_WINDOW, Message::ActiveWindow),
            (atoms._NET_CLOSE_WINDOW, Message::CloseWindow),
            (atoms._NET_WM_STATE, Message::WmState),
            (atoms.SUBTLE_TAG_NEW, Message::TagNew),
            (atoms.SUBTLE_TAG_KILL, Message::TagKill),
            (atoms.SUBTLE_VIEW_NEW, Message::ViewNew),
            (atoms.SUBTLE_VIEW_KILL, Message::ViewKill),
            (atoms.SUBTLE_CLIENT_TAG, Message::ClientTag),
            (atoms.SUBTLE_CLIENT_UNTAG, Message::ClientUntag),
            (atoms.SUBTLE_VIEW_TAG, Message::ViewTag),
            (atoms.SUBTLE_VIEW_UNTAG, Message::ViewUntag),
        ].into_iter().find(|(a, _)| *a == atom).map(|(_, message)| message)
    }

    fn property_of(&self, atom: Atom) -> Option<Property> {
        if atom == self.atoms.WM_NAME || atom == self.atoms._NET_WM_NAME {
            Some(Property::Name)
        } else if atom == self.atoms.WM_HINTS {
            Some(Property::Hints)
        } else {
            None
        }
    }

    fn get_cardinals(&self, win: Window, atom: Atom, kind: impl Into<Atom>) -> Result<Vec<u32>> {
        let reply = self.conn.get_property(false, win, atom, kind, 0, 1024)?.reply()?;

        Ok(reply.value32().map(Iterator::collect).unwrap_or_default())
    }

    /// Translate a X11 event
    fn convert(&self, event: XEvent) -> Event {
        match event {
            XEvent::ButtonPress(evt) => Event::ButtonPress {
                win: evt.event,
                subwin: evt.child,
                button: evt.detail,
                state: u16::from(evt.state),
                time: evt.time,
            },
            XEvent::KeyPress(evt) => Event::KeyPress {
                win: evt.event,
                keycode: evt.detail,
                state: u16::from(evt.state),
            },
            XEvent::ConfigureRequest(evt) => Event::ConfigureRequest {
                win: evt.window,
                values: configure_values(&evt),
            },
            XEvent::MapRequest(evt) => Event::MapRequest { win: evt.window },
            XEvent::DestroyNotify(evt) => Event::DestroyNotify { win: evt.window },
            XEvent::ClientMessage(evt) => Event::ClientMessage {
                win: evt.window,
                message: self.message_of(evt.type_),
                data: MessageData {
                    format: evt.format,
                    bytes: evt.data.as_data8(),
                    longs: evt.data.as_data32(),
                },
            },
            XEvent::ColormapNotify(evt) => Event::ColormapNotify {
                win: evt.window,
                colormap: evt.colormap,
                new: evt.new,
            },
            XEvent::PropertyNotify(evt) => Event::PropertyNotify {
                win: evt.window,
                property: self.property_of(evt.atom),
            },
            XEvent::EnterNotify(evt) => Event::EnterNotify { win: evt.event },
            XEvent::Expose(evt) if 0 == evt.count => Event::Expose { win: evt.window },
            XEvent::FocusIn(evt) => Event::FocusIn { win: evt.event },
            XEvent::Error(err) => {
                debug!("{}: error={:?}", function_name!(), err);

                Event::Unknown
            }
            _ => Event::Unknown,
        }
    }

    /// Check whether the connection has data without blocking longer than timeout
    fn readable(&self, timeout: Option<Duration>) -> Result<bool> {
        let millis = timeout.map_or(-1, |dur| i32::try_from(dur.as_millis()).unwrap_or(i32::MAX));
        let timeout = PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX);

        let mut fds = [PollFd::new(self.conn.stream().as_fd(), PollFlags::POLLIN)];

        match poll(&mut fds, timeout) {
            Ok(nready) => Ok(0 < nready),
            Err(Errno::EINTR) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

fn configure_values(evt: &ConfigureRequestEvent) -> ConfigureValues {
    let mask = evt.value_mask;

    ConfigureValues {
        x: mask.contains(ConfigWindow::X).then_some(evt.x),
        y: mask.contains(ConfigWindow::Y).then_some(evt.y),
        width: mask.contains(ConfigWindow::WIDTH).then_some(evt.width),
        height: mask.contains(ConfigWindow::HEIGHT).then_some(evt.height),
        border_width: mask.contains(ConfigWindow::BORDER_WIDTH).then_some(evt.border_width),
        sibling: mask.contains(ConfigWindow::SIBLING).then_some(evt.sibling),
        stack_mode: mask.contains(ConfigWindow::STACK_MODE).then_some(evt.stack_mode),
    }
}

impl Backend for X11Backend {
    fn root(&self) -> Window {
        self.root
    }

    fn screen_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn managed_windows(&mut self) -> Result<Vec<Window>> {
        let mut wins = Vec::new();

        for win in self.conn.query_tree(self.root)?.reply()?.children {
            let attr = self.conn.get_window_attributes(win)?.reply()?;

            if !attr.override_redirect && MapState::VIEWABLE == attr.map_state {
                wins.push(win);
            }
        }

        Ok(wins)
    }

    fn create_window(&mut self, parent: Window, geom: Rect, kind: WinKind) -> Result<Window> {
        let win = self.conn.generate_id()?;

        let aux = match kind {
            WinKind::Frame => CreateWindowAux::default()
                .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::BUTTON_PRESS | EventMask::ENTER_WINDOW | EventMask::EXPOSURE)
                .override_redirect(1),
            WinKind::Decoration | WinKind::Bar => CreateWindowAux::default()
                .event_mask(EventMask::BUTTON_PRESS | EventMask::ENTER_WINDOW | EventMask::EXPOSURE)
                .override_redirect(1),
            WinKind::Support => CreateWindowAux::default()
                .event_mask(EventMask::PROPERTY_CHANGE)
                .override_redirect(1),
        };

        self.conn.create_window(COPY_DEPTH_FROM_PARENT, win, parent,
                                geom.x, geom.y, geom.width.max(1), geom.height.max(1), 0,
                                WindowClass::INPUT_OUTPUT, x11rb::COPY_FROM_PARENT, &aux)?;

        Ok(win)
    }

    fn destroy_window(&mut self, win: Window) -> Result<()> {
        self.conn.destroy_window(win)?;

        Ok(())
    }

    fn reparent(&mut self, win: Window, parent: Window, x: i16, y: i16) -> Result<()> {
        self.conn.reparent_window(win, parent, x, y)?;

        Ok(())
    }

    fn move_resize(&mut self, win: Window, geom: Rect) -> Result<()> {
        let aux = ConfigureWindowAux::default()
            .x(i32::from(geom.x))
            .y(i32::from(geom.y))
            .width(u32::from(geom.width.max(1)))
            .height(u32::from(geom.height.max(1)));

        self.conn.configure_window(win, &aux)?;

        Ok(())
    }

    fn map(&mut self, win: Window) -> Result<()> {
        self.conn.map_window(win)?;

        Ok(())
    }

    fn unmap(&mut self, win: Window) -> Result<()> {
        self.conn.unmap_window(win)?;

        Ok(())
    }

    fn map_subwindows(&mut self, win: Window) -> Result<()> {
        self.conn.map_subwindows(win)?;

        Ok(())
    }

    fn raise(&mut self, win: Window) -> Result<()> {
        self.conn.configure_window(win, &ConfigureWindowAux::default().stack_mode(StackMode::ABOVE))?;

        Ok(())
    }

    fn lower(&mut self, win: Window) -> Result<()> {
        self.conn.configure_window(win, &ConfigureWindowAux::default().stack_mode(StackMode::BELOW))?;

        Ok(())
    }

    fn adopt(&mut self, win: Window) -> Result<()> {
        let aux = ChangeWindowAttributesAux::default()
            .event_mask(EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY
                | EventMask::FOCUS_CHANGE | EventMask::ENTER_WINDOW);

        self.conn.change_window_attributes(win, &aux)?;
        self.conn.change_save_set(SetMode::INSERT, win)?;
        self.conn.configure_window(win, &ConfigureWindowAux::default().border_width(0))?;

        Ok(())
    }

    fn fetch_client_info(&mut self, win: Window) -> Result<ClientInfo> {
        let name = self.fetch_name(win)?;

        // WM_CLASS holds instance and class
        let wm_klass = self.conn.get_property(false, win, self.atoms.WM_CLASS,
                                              AtomEnum::STRING, 0, 1024)?.reply()?.value;
        let inst_klass = ewmh::decode_strings(&wm_klass);
        let klass = inst_klass.get(1).or_else(|| inst_klass.first()).cloned().unwrap_or_default();

        let colormap = self.conn.get_window_attributes(win)?.reply()?.colormap;

        let mut info = ClientInfo {
            name,
            klass,
            colormap,
            input: true,
            ..ClientInfo::default()
        };

        // WM_HINTS: flags, input, initial_state, ...
        let hints = self.get_cardinals(win, self.atoms.WM_HINTS, self.atoms.WM_HINTS)?;

        if let Some(flags) = hints.first().copied() {
            if 0 != flags & INPUT_HINT {
                info.input = hints.get(1).is_some_and(|input| 0 != *input);
            }

            if 0 != flags & STATE_HINT {
                info.initial_state = hints.get(2).and_then(|state| WMState::from_repr(*state));
            }

            info.urgent = 0 != flags & URGENCY_HINT;
        }

        // WM_PROTOCOLS
        for atom in self.get_cardinals(win, self.atoms.WM_PROTOCOLS, AtomEnum::ATOM)? {
            if atom == self.atoms.WM_TAKE_FOCUS {
                info.take_focus = true;
            } else if atom == self.atoms.WM_DELETE_WINDOW {
                info.delete_window = true;
            }
        }

        info.transient_for = self.get_cardinals(win, self.atoms.WM_TRANSIENT_FOR, AtomEnum::WINDOW)?
            .first().copied().filter(|trans| NONE != *trans);

        debug!("{}: win={}, info={:?}", function_name!(), win, info);

        Ok(info)
    }

    fn fetch_name(&mut self, win: Window) -> Result<Option<String>> {
        let net_name = self.conn.get_property(false, win, self.atoms._NET_WM_NAME,
                                              self.atoms.UTF8_STRING, 0, 1024)?.reply()?.value;

        let value = if net_name.is_empty() {
            self.conn.get_property(false, win, self.atoms.WM_NAME,
                                   AtomEnum::STRING, 0, 1024)?.reply()?.value
        } else {
            net_name
        };

        let name = String::from_utf8_lossy(&value).trim_matches('\0').to_string();

        Ok(if name.is_empty() { None } else { Some(name) })
    }

    fn set_input_focus(&mut self, win: Window) -> Result<()> {
        self.conn.set_input_focus(InputFocus::POINTER_ROOT, win, CURRENT_TIME)?;

        Ok(())
    }

    fn send_configure_notify(&mut self, win: Window, geom: Rect) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: win,
            window: win,
            above_sibling: NONE,
            x: geom.x,
            y: geom.y,
            width: geom.width,
            height: geom.height,
            border_width: 0,
            override_redirect: false,
        };

        self.conn.send_event(false, win, EventMask::STRUCTURE_NOTIFY, event)?;

        Ok(())
    }

    fn send_protocol(&mut self, win: Window, protocol: Protocol) -> Result<()> {
        let atom = match protocol {
            Protocol::TakeFocus => self.atoms.WM_TAKE_FOCUS,
            Protocol::DeleteWindow => self.atoms.WM_DELETE_WINDOW,
        };

        let event = ClientMessageEvent::new(32, win, self.atoms.WM_PROTOCOLS,
                                            [atom, CURRENT_TIME, 0, 0, 0]);

        self.conn.send_event(false, win, EventMask::NO_EVENT, event)?;

        Ok(())
    }

    fn kill_client(&mut self, win: Window) -> Result<()> {
        self.conn.kill_client(win)?;

        Ok(())
    }

    fn set_property(&mut self, win: Window, hint: Hint, value: PropValue) -> Result<()> {
        let prop = self.hint_atom(hint);

        match value {
            PropValue::Cardinals(values) => {
                self.conn.change_property32(PropMode::REPLACE, win, prop, AtomEnum::CARDINAL, &values)?;
            }
            PropValue::Windows(wins) => {
                self.conn.change_property32(PropMode::REPLACE, win, prop, AtomEnum::WINDOW, &wins)?;
            }
            PropValue::Hints(hints) => {
                let atoms: Vec<Atom> = hints.into_iter().map(|hint| self.hint_atom(hint)).collect();

                self.conn.change_property32(PropMode::REPLACE, win, prop, AtomEnum::ATOM, &atoms)?;
            }
            PropValue::States(states) => {
                let atoms: Vec<Atom> = states.into_iter().map(|state| self.state_atom(state)).collect();

                self.conn.change_property32(PropMode::REPLACE, win, prop, AtomEnum::ATOM, &atoms)?;
            }
            PropValue::Strings(strings) => {
                self.conn.change_property8(PropMode::REPLACE, win, prop, self.atoms.UTF8_STRING,
                                           &ewmh::encode_strings(&strings))?;
            }
            PropValue::Utf8(string) => {
                self.conn.change_property8(PropMode::REPLACE, win, prop, self.atoms.UTF8_STRING,
                                           string.as_bytes())?;
            }
            PropValue::WmState(state) => {
                self.conn.change_property32(PropMode::REPLACE, win, prop, self.atoms.WM_STATE,
                                            &[state as u32, NONE])?;
            }
        }

        Ok(())
    }

    fn forward_configure(&mut self, win: Window, values: ConfigureValues) -> Result<()> {
        let mut aux = ConfigureWindowAux::default();

        aux.x = values.x.map(i32::from);
        aux.y = values.y.map(i32::from);
        aux.width = values.width.map(u32::from);
        aux.height = values.height.map(u32::from);
        aux.border_width = values.border_width.map(u32::from);
        aux.sibling = values.sibling;
        aux.stack_mode = values.stack_mode;

        self.conn.configure_window(win, &aux)?;

        Ok(())
    }

    fn install_colormap(&mut self, colormap: Colormap) -> Result<()> {
        self.conn.install_colormap(colormap)?;

        Ok(())
    }

    fn decode_state(&self, atom: u32) -> Option<NetState> {
        if atom == self.atoms._NET_WM_STATE_FULLSCREEN {
            Some(NetState::Fullscreen)
        } else if atom == self.atoms._NET_WM_STATE_SHADED {
            Some(NetState::Shaded)
        } else {
            None
        }
    }

    fn grab_pointer(&mut self, win: Window, cursor: Cursor) -> Result<bool> {
        let cursor = match cursor {
            Cursor::Move => self.cursors.moving,
            Cursor::Horizontal => self.cursors.horizontal,
            Cursor::Vertical => self.cursors.vertical,
            Cursor::Square => self.cursors.square,
        };

        let reply = self.conn.grab_pointer(true, win,
                                           EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION
                                               | EventMask::ENTER_WINDOW,
                                           GrabMode::ASYNC, GrabMode::ASYNC, NONE, cursor,
                                           CURRENT_TIME)?.reply()?;

        Ok(GrabStatus::SUCCESS == reply.status)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.conn.ungrab_pointer(CURRENT_TIME)?;

        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.conn.grab_server()?;

        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.conn.ungrab_server()?;
        self.conn.flush()?;

        Ok(())
    }

    fn query_pointer(&mut self, win: Window) -> Result<(i16, i16)> {
        let reply = self.conn.query_pointer(win)?.reply()?;

        Ok((reply.win_x, reply.win_y))
    }

    fn windows_at(&mut self, x_root: i16, y_root: i16) -> Result<Vec<Window>> {
        let mut path = Vec::new();
        let mut win = self.root;

        loop {
            let reply = self.conn.translate_coordinates(self.root, win, x_root, y_root)?.reply()?;

            if NONE == reply.child {
                break;
            }

            win = reply.child;
            path.push(win);
        }

        Ok(path)
    }

    fn next_drag_event(&mut self) -> Result<DragEvent> {
        self.conn.flush()?;

        loop {
            match self.conn.wait_for_event()? {
                XEvent::MotionNotify(evt) => {
                    return Ok(DragEvent::Motion { x_root: evt.root_x, y_root: evt.root_y });
                }
                XEvent::ButtonRelease(evt) => {
                    return Ok(DragEvent::Release { x_root: evt.root_x, y_root: evt.root_y });
                }
                XEvent::EnterNotify(evt) => {
                    return Ok(DragEvent::Enter { win: evt.event });
                }
                event => {
                    // Keep everything else for the event loop
                    match self.convert(event) {
                        Event::Unknown => {}
                        event => self.pending.push_back(event),
                    }
                }
            }
        }
    }

    fn draw_mask(&mut self, win: Window, geom: Rect) -> Result<()> {
        self.conn.poly_rectangle(win, self.mask_gc, &[Rectangle {
            x: geom.x + 1,
            y: geom.y + 1,
            width: geom.width.saturating_sub(3),
            height: geom.height.saturating_sub(3),
        }])?;

        self.conn.flush()?;

        Ok(())
    }

    fn keyboard_mapping(&mut self) -> Result<HashMap<Keysym, Keycode>> {
        let setup = self.conn.setup();
        let (min_keycode, max_keycode) = (setup.min_keycode, setup.max_keycode);

        let mapping = self.conn.get_keyboard_mapping(min_keycode,
                                                     max_keycode - min_keycode + 1)?.reply()?;

        // Build reverse map of keysyms to keycode
        let mut keysyms_to_keycode = HashMap::new();

        for (idx, chunk) in mapping.keysyms
            .chunks(mapping.keysyms_per_keycode as usize)
            .enumerate()
        {
            let keycode = min_keycode + idx as u8;

            // Just copy the first sym without modifiers
            if let Some(&keysym) = chunk.first() && 0 != keysym {
                keysyms_to_keycode.entry(keysym).or_insert(keycode);
            }
        }

        Ok(keysyms_to_keycode)
    }

    fn grab_keys(&mut self, win: Window, keys: &[(Keycode, u16)]) -> Result<()> {
        for (keycode, state) in keys {
            self.conn.grab_key(true, win, ModMask::from(*state), *keycode,
                               GrabMode::ASYNC, GrabMode::ASYNC)?;
        }

        Ok(())
    }

    fn ungrab_keys(&mut self, win: Window) -> Result<()> {
        self.conn.ungrab_key(Keycode::from(0), win, ModMask::ANY)?;

        Ok(())
    }

    fn set_background(&mut self, win: Window, color: u32) -> Result<()> {
        self.conn.change_window_attributes(win, &ChangeWindowAttributesAux::default()
            .background_pixel(color))?;

        Ok(())
    }

    fn clear_window(&mut self, win: Window) -> Result<()> {
        self.conn.clear_area(false, win, 0, 0, 0, 0)?;

        Ok(())
    }

    fn fill_rect(&mut self, win: Window, geom: Rect, color: u32) -> Result<()> {
        self.conn.change_gc(self.draw_gc, &ChangeGCAux::default().foreground(color))?;
        self.conn.poly_fill_rectangle(win, self.draw_gc, &[Rectangle {
            x: geom.x,
            y: geom.y,
            width: geom.width,
            height: geom.height,
        }])?;

        Ok(())
    }

    fn draw_text(&mut self, win: Window, x: i16, text: &str, fg: u32, bg: u32) -> Result<()> {
        // Core text requests carry at most 255 bytes
        let bytes = &text.as_bytes()[..text.len().min(255)];

        self.conn.change_gc(self.draw_gc, &ChangeGCAux::default()
            .foreground(fg)
            .background(bg))?;
        self.conn.image_text8(win, self.draw_gc, x, self.font.y as i16, bytes)?;

        Ok(())
    }

    fn text_width(&mut self, text: &str) -> Result<u16> {
        self.font.text_width(&self.conn, text)
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;

        Ok(())
    }

    fn wait_for_event(&mut self, timeout: Option<Duration>) -> Result<Option<Event>> {
        if let Some(event) = self.poll_event()? {
            return Ok(Some(event));
        }

        self.conn.flush()?;

        if self.readable(timeout)? {
            return self.poll_event();
        }

        Ok(None)
    }

    fn poll_event(&mut self) -> Result<Option<Event>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        Ok(self.conn.poll_for_event()?.map(|event| self.convert(event)))
    }
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        let _ = self.font.kill(&self.conn);
        let _ = self.conn.free_gc(self.draw_gc);
        let _ = self.conn.free_gc(self.mask_gc);
        let _ = self.conn.flush();
    }
}

/// Manage all windows that already exist
///
/// # Arguments
///
/// * `subtle` - Global state object
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn scan(subtle: &mut Subtle) -> Result<()> {
    let wins = subtle.backend.managed_windows()?;

    for win in wins {
        if let Err(err) = view::merge_client(subtle, win) {
            warn!("Failed managing window {}: {}", win, err);
        }
    }

    debug!("{}: nclients={}", function_name!(), subtle.clients.len());

    Ok(())
}

/// Give all clients back to the root window and clean up
pub(crate) fn finish(subtle: &mut Subtle) -> Result<()> {
    let root = subtle.backend.root();

    for idx in (0..subtle.views.len()).rev() {
        view::teardown(subtle, idx)?;
    }

    let mut buttons = Vec::with_capacity(subtle.views.len());

    subtle.views.destroy_all(|view| {
        if NONE != view.button {
            subtle.view_buttons.unregister(view.button);
            buttons.push(view.button);
        }
    });

    let support = [subtle.sublets_win, subtle.views_win, subtle.bar_win, subtle.support_win];

    for win in buttons.into_iter().chain(support) {
        if NONE != win {
            subtle.backend.destroy_window(win)?;
        }
    }

    subtle.backend.ungrab_keys(root)?;
    subtle.backend.flush()?;

    debug!("{}", function_name!());

    Ok(())
}
