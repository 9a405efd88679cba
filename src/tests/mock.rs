///
/// @package subtle-tiler
///
/// @file Mock functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use anyhow::Result;
use indexmap::IndexMap;
use x11rb::protocol::xproto::{Colormap, Keycode, Keysym, Window};
use crate::backend::{Backend, ClientInfo, ConfigureValues, Cursor, DragEvent, Event, PropValue, Protocol, WinKind};
use crate::config::Config;
use crate::ewmh::{Hint, NetState};
use crate::rect::Rect;
use crate::subtle::Subtle;
use crate::{tag, view};

pub(crate) const ROOT: Window = 1;
pub(crate) const WIDTH: u16 = 800;
pub(crate) const HEIGHT: u16 = 616;

/// Everything the mock server recorded
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub(crate) next_win: Window,
    pub(crate) kinds: HashMap<Window, WinKind>,
    pub(crate) parents: HashMap<Window, Window>,
    pub(crate) geoms: HashMap<Window, Rect>,
    pub(crate) mapped: HashSet<Window>,
    pub(crate) destroyed: Vec<Window>,
    pub(crate) props: HashMap<(Window, Hint), PropValue>,
    pub(crate) protocols: Vec<(Window, Protocol)>,
    pub(crate) killed: Vec<Window>,
    pub(crate) notified: Vec<(Window, Rect)>,
    pub(crate) forwarded: Vec<(Window, ConfigureValues)>,
    pub(crate) focused: Option<Window>,
    pub(crate) masks: Vec<Rect>,
    pub(crate) grabbed_keys: Vec<(Keycode, u16)>,
    pub(crate) server_grabs: i32,
    pub(crate) pointer_grabbed: bool,
    pub(crate) infos: HashMap<Window, ClientInfo>,
    pub(crate) keymap: HashMap<Keysym, Keycode>,
    pub(crate) drag_events: VecDeque<DragEvent>,
    pub(crate) events: VecDeque<Event>,
    pub(crate) existing: Vec<Window>,
    pub(crate) backgrounds: HashMap<Window, u32>,
    pub(crate) pointer_path: Vec<Window>,
}

impl MockState {
    pub(crate) fn is_mapped(&self, win: Window) -> bool {
        self.mapped.contains(&win)
    }

    /// Check whether window and all of its ancestors are mapped
    pub(crate) fn is_viewable(&self, win: Window) -> bool {
        let mut win = win;

        while ROOT != win {
            if !self.is_mapped(win) {
                return false;
            }

            match self.parents.get(&win) {
                Some(parent) => win = *parent,
                None => return false,
            }
        }

        true
    }

    pub(crate) fn prop(&self, win: Window, hint: Hint) -> Option<&PropValue> {
        self.props.get(&(win, hint))
    }

    pub(crate) fn cardinals(&self, win: Window, hint: Hint) -> Vec<u32> {
        match self.prop(win, hint) {
            Some(PropValue::Cardinals(values)) => values.clone(),
            _ => Vec::new(),
        }
    }
}

/// Backend recording all requests instead of talking to a server
pub(crate) struct MockBackend {
    state: Rc<RefCell<MockState>>,
}

impl MockBackend {
    pub(crate) fn new() -> (Self, Rc<RefCell<MockState>>) {
        let state = Rc::new(RefCell::new(MockState {
            next_win: 100,
            ..MockState::default()
        }));

        (Self { state: Rc::clone(&state) }, state)
    }
}

impl Backend for MockBackend {
    fn root(&self) -> Window {
        ROOT
    }

    fn screen_size(&self) -> (u16, u16) {
        (WIDTH, HEIGHT)
    }

    fn managed_windows(&mut self) -> Result<Vec<Window>> {
        Ok(self.state.borrow().existing.clone())
    }

    fn create_window(&mut self, parent: Window, geom: Rect, kind: WinKind) -> Result<Window> {
        let mut state = self.state.borrow_mut();

        state.next_win += 1;

        let win = state.next_win;

        state.kinds.insert(win, kind);
        state.parents.insert(win, parent);
        state.geoms.insert(win, geom);

        Ok(win)
    }

    fn destroy_window(&mut self, win: Window) -> Result<()> {
        let mut state = self.state.borrow_mut();

        state.mapped.remove(&win);
        state.parents.remove(&win);
        state.destroyed.push(win);

        Ok(())
    }

    fn reparent(&mut self, win: Window, parent: Window, x: i16, y: i16) -> Result<()> {
        let mut state = self.state.borrow_mut();

        state.parents.insert(win, parent);

        let geom = state.geoms.entry(win).or_default();

        geom.x = x;
        geom.y = y;

        Ok(())
    }

    fn move_resize(&mut self, win: Window, geom: Rect) -> Result<()> {
        self.state.borrow_mut().geoms.insert(win, geom);

        Ok(())
    }

    fn map(&mut self, win: Window) -> Result<()> {
        self.state.borrow_mut().mapped.insert(win);

        Ok(())
    }

    fn unmap(&mut self, win: Window) -> Result<()> {
        self.state.borrow_mut().mapped.remove(&win);

        Ok(())
    }

    fn map_subwindows(&mut self, win: Window) -> Result<()> {
        let mut state = self.state.borrow_mut();

        let children: Vec<Window> = state.parents.iter()
            .filter(|(_, parent)| **parent == win)
            .map(|(child, _)| *child)
            .collect();

        state.mapped.extend(children);

        Ok(())
    }

    fn raise(&mut self, _win: Window) -> Result<()> {
        Ok(())
    }

    fn lower(&mut self, _win: Window) -> Result<()> {
        Ok(())
    }

    fn adopt(&mut self, _win: Window) -> Result<()> {
        Ok(())
    }

    fn fetch_client_info(&mut self, win: Window) -> Result<ClientInfo> {
        Ok(self.state.borrow().infos.get(&win).cloned().unwrap_or_default())
    }

    fn fetch_name(&mut self, win: Window) -> Result<Option<String>> {
        Ok(self.state.borrow().infos.get(&win).and_then(|info| info.name.clone()))
    }

    fn set_input_focus(&mut self, win: Window) -> Result<()> {
        self.state.borrow_mut().focused = Some(win);

        Ok(())
    }

    fn send_configure_notify(&mut self, win: Window, geom: Rect) -> Result<()> {
        self.state.borrow_mut().notified.push((win, geom));

        Ok(())
    }

    fn send_protocol(&mut self, win: Window, protocol: Protocol) -> Result<()> {
        self.state.borrow_mut().protocols.push((win, protocol));

        Ok(())
    }

    fn kill_client(&mut self, win: Window) -> Result<()> {
        self.state.borrow_mut().killed.push(win);

        Ok(())
    }

    fn set_property(&mut self, win: Window, hint: Hint, value: PropValue) -> Result<()> {
        self.state.borrow_mut().props.insert((win, hint), value);

        Ok(())
    }

    fn forward_configure(&mut self, win: Window, values: ConfigureValues) -> Result<()> {
        self.state.borrow_mut().forwarded.push((win, values));

        Ok(())
    }

    fn install_colormap(&mut self, _colormap: Colormap) -> Result<()> {
        Ok(())
    }

    fn decode_state(&self, atom: u32) -> Option<NetState> {
        match atom {
            1 => Some(NetState::Fullscreen),
            2 => Some(NetState::Shaded),
            _ => None,
        }
    }

    fn grab_pointer(&mut self, _win: Window, _cursor: Cursor) -> Result<bool> {
        self.state.borrow_mut().pointer_grabbed = true;

        Ok(true)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.state.borrow_mut().pointer_grabbed = false;

        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.state.borrow_mut().server_grabs += 1;

        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.state.borrow_mut().server_grabs -= 1;

        Ok(())
    }

    fn query_pointer(&mut self, _win: Window) -> Result<(i16, i16)> {
        Ok((0, 0))
    }

    fn windows_at(&mut self, _x_root: i16, _y_root: i16) -> Result<Vec<Window>> {
        Ok(self.state.borrow().pointer_path.clone())
    }

    fn next_drag_event(&mut self) -> Result<DragEvent> {
        // Release when the script runs dry
        Ok(self.state.borrow_mut().drag_events.pop_front()
            .unwrap_or(DragEvent::Release { x_root: 0, y_root: 0 }))
    }

    fn draw_mask(&mut self, _win: Window, geom: Rect) -> Result<()> {
        self.state.borrow_mut().masks.push(geom);

        Ok(())
    }

    fn keyboard_mapping(&mut self) -> Result<HashMap<Keysym, Keycode>> {
        Ok(self.state.borrow().keymap.clone())
    }

    fn grab_keys(&mut self, _win: Window, keys: &[(Keycode, u16)]) -> Result<()> {
        self.state.borrow_mut().grabbed_keys.extend_from_slice(keys);

        Ok(())
    }

    fn ungrab_keys(&mut self, _win: Window) -> Result<()> {
        self.state.borrow_mut().grabbed_keys.clear();

        Ok(())
    }

    fn set_background(&mut self, win: Window, color: u32) -> Result<()> {
        self.state.borrow_mut().backgrounds.insert(win, color);

        Ok(())
    }

    fn clear_window(&mut self, _win: Window) -> Result<()> {
        Ok(())
    }

    fn fill_rect(&mut self, _win: Window, _geom: Rect, _color: u32) -> Result<()> {
        Ok(())
    }

    fn draw_text(&mut self, _win: Window, _x: i16, _text: &str, _fg: u32, _bg: u32) -> Result<()> {
        Ok(())
    }

    fn text_width(&mut self, text: &str) -> Result<u16> {
        Ok(text.len() as u16 * 6)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn wait_for_event(&mut self, _timeout: Option<Duration>) -> Result<Option<Event>> {
        self.poll_event()
    }

    fn poll_event(&mut self) -> Result<Option<Event>> {
        Ok(self.state.borrow_mut().events.pop_front())
    }
}

/// Create a config with given tags and views
pub(crate) fn config(tags: &[(&str, &str)], views: &[(&str, &[(&str, u8)])]) -> Config {
    let tags = tags.iter()
        .map(|(name, pattern)| {
            let mut values = HashMap::new();

            values.insert("match".to_string(), crate::config::MixedConfigVal::S(pattern.to_string()));

            (name.to_string(), values)
        })
        .collect();

    let views = views.iter()
        .map(|(name, rules)| {
            let rules: IndexMap<String, u8> = rules.iter()
                .map(|(pattern, size)| (pattern.to_string(), *size))
                .collect();

            (name.to_string(), rules)
        })
        .collect();

    Config {
        display: ":0".into(),
        replace: false,
        loglevel: String::new(),
        debug: false,
        subtle: HashMap::new(),
        colors: HashMap::new(),
        grabs: HashMap::new(),
        tags,
        views,
        sublets: Vec::new(),
    }
}

/// Set up a running instance on the mock backend
pub(crate) fn setup(config: &Config) -> (Subtle, Rc<RefCell<MockState>>) {
    let (backend, state) = MockBackend::new();
    let mut subtle = Subtle::new(Box::new(backend));

    subtle.init(config);

    tag::init(config, &mut subtle).unwrap();
    view::init(config, &mut subtle).unwrap();

    (subtle, state)
}

/// Announce a new native window to the mock server
pub(crate) fn add_window(state: &Rc<RefCell<MockState>>, win: Window, klass: &str) {
    state.borrow_mut().infos.insert(win, ClientInfo {
        name: Some(format!("{}-{}", klass, win)),
        klass: klass.into(),
        input: true,
        delete_window: true,
        ..ClientInfo::default()
    });
}
