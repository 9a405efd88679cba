///
/// @package subtle-tiler
///
/// @file Key functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use std::collections::HashMap;
use std::process::Command;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use stdext::function_name;
use x11rb::protocol::xproto::{Keycode, Keysym, ModMask};
use crate::config::Config;
use crate::node::NodeKind;
use crate::subtle::Subtle;
use crate::tree::{Direction, Release};
use crate::{tree, view};

/// Modifier states that must not change the meaning of a key
fn ignored_states() -> [ModMask; 4] {
    [ModMask::from(0u16),
        ModMask::LOCK, // Capslock
        ModMask::M2, // Numlock
        ModMask::M2 | ModMask::LOCK]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyAction {
    FocusAbove,
    FocusBelow,
    FocusNext,
    FocusPrev,
    FocusAny,
    WindowKill,
    WindowShade,
    WindowFloat,
    WindowFull,
    WindowRaise,
    WindowLower,
    TilePile,
    TileLayout,
    TileNew,
    TileDelete,
    ViewNext,
    ViewPrev,
    /// Jump to view by index
    ViewJump(usize),
    SubtleQuit,
    /// Run a shell command
    Command(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Key {
    pub(crate) keycode: Keycode,
    pub(crate) modifiers: ModMask,
    pub(crate) action: KeyAction,
}

/// Parse keys of grabs
///
/// # Arguments
///
/// * `keys` - Keys to parse (e.g. `W-S-Return`)
/// * `keysyms_to_keycode` - Mapping table for keysyms to keycode
///
/// # Returns
///
/// A [`Result`] with either ([`Keycode`], [`ModMask`]) on success or otherwise [`anyhow::Error`]
pub(crate) fn parse_keys(keys: &str, keysyms_to_keycode: &HashMap<Keysym, Keycode>) -> Result<(Keycode, ModMask)> {
    let mut keycode: Option<Keycode> = None;
    let mut modifiers = ModMask::default();

    for key in keys.split('-') {
        match key {
            "S" => modifiers |= ModMask::SHIFT,
            "C" => modifiers |= ModMask::CONTROL,
            "A" => modifiers |= ModMask::M1,
            "M" => modifiers |= ModMask::M3,
            "W" => modifiers |= ModMask::M4,
            "G" => modifiers |= ModMask::M5,
            _ if 2 == key.len() && key.starts_with('B') && key[1..].parse::<u8>().is_ok() => {
                return Err(anyhow!("Mouse buttons cannot be bound: {}", key));
            }
            _ => {
                let record = x11_keysymdef::lookup_by_name(key)
                    .with_context(|| format!("Key name not found: {}", key))?;

                keycode = Some(*keysyms_to_keycode.get(&record.keysym)
                    .with_context(|| format!("Keysym not mapped: {}", key))?);
            }
        }
    }

    Ok((keycode.context("No key given")?, modifiers))
}

/// Parse names of grabs
///
/// # Arguments
///
/// * `name` - Name to parse
///
/// # Returns
///
/// A [`Result`] with either [`KeyAction`] on success or otherwise [`anyhow::Error`]
pub(crate) fn parse_name(name: &str) -> Result<KeyAction> {
    Ok(match name {
        "subtle_quit" => KeyAction::SubtleQuit,

        // Focus
        "focus_above" => KeyAction::FocusAbove,
        "focus_below" => KeyAction::FocusBelow,
        "focus_next" => KeyAction::FocusNext,
        "focus_prev" => KeyAction::FocusPrev,
        "focus_any" => KeyAction::FocusAny,

        // Window modes
        "window_kill" => KeyAction::WindowKill,
        "window_shade" => KeyAction::WindowShade,
        "window_float" => KeyAction::WindowFloat,
        "window_full" => KeyAction::WindowFull,
        "window_raise" => KeyAction::WindowRaise,
        "window_lower" => KeyAction::WindowLower,

        // Tiles
        "tile_pile" => KeyAction::TilePile,
        "tile_layout" => KeyAction::TileLayout,
        "tile_new" => KeyAction::TileNew,
        "tile_delete" => KeyAction::TileDelete,

        "view_next" => KeyAction::ViewNext,
        "view_prev" => KeyAction::ViewPrev,

        _ => {
            if let Some(number) = name.strip_prefix("view_jump") {
                let number: usize = number.parse()
                    .with_context(|| format!("Invalid view number: {}", name))?;

                KeyAction::ViewJump(number.checked_sub(1).context("Views are counted from 1")?)
            } else if let Some(command) = name.strip_prefix("exec ") {
                KeyAction::Command(command.trim().to_string())
            } else {
                KeyAction::Command(name.to_string())
            }
        }
    })
}

impl Key {
    /// Create a new instance
    ///
    /// # Arguments
    ///
    /// * `name` - Action name or command
    /// * `keys` - Keys as String (A-F5)
    /// * `keysyms_to_keycode` - Lookup table to map keysyms to keycodes
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`Key`] on success or otherwise [`anyhow::Error`]
    pub(crate) fn new(name: &str, keys: &str, keysyms_to_keycode: &HashMap<Keysym, Keycode>) -> Result<Self> {
        let action = parse_name(name)?;
        let (keycode, modifiers) = parse_keys(keys, keysyms_to_keycode)?;

        let key = Key {
            keycode,
            modifiers,
            action,
        };

        debug!("{}: name={}, key={}", function_name!(), name, key);

        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(code={}, state={:?}, action={:?})", self.keycode, self.modifiers, self.action)
    }
}

/// Check config and init all key related options
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
    let keysyms_to_keycode = subtle.backend.keyboard_mapping()?;

    for (name, keys) in &config.grabs {
        match Key::new(name, keys, &keysyms_to_keycode) {
            Ok(key) => subtle.keys.push(key)?,
            Err(err) => warn!("Skipping grab `{}': {}", name, err),
        }
    }

    // Grabs come from a map
    subtle.keys.sort_by(|a, b| (a.keycode, u16::from(a.modifiers)).cmp(&(b.keycode, u16::from(b.modifiers))));

    info!("Loaded {} grab(s)", subtle.keys.len());

    grab(subtle)
}

/// Grab all keys on the root window
pub(crate) fn grab(subtle: &mut Subtle) -> Result<()> {
    let root = subtle.backend.root();

    let states = ignored_states();
    let mut grabs = Vec::with_capacity(subtle.keys.len() * states.len());

    for key in subtle.keys.iter() {
        for state in states {
            grabs.push((key.keycode, u16::from(key.modifiers | state)));
        }
    }

    subtle.backend.ungrab_keys(root)?;
    subtle.backend.grab_keys(root, &grabs)?;

    debug!("{}: ngrabs={}", function_name!(), grabs.len());

    Ok(())
}

/// Find key for a key press
pub(crate) fn find(subtle: &Subtle, keycode: Keycode, state: u16) -> Option<&Key> {
    let state = state & !u16::from(ModMask::LOCK | ModMask::M2);

    subtle.keys.iter().find(|key| key.keycode == keycode && u16::from(key.modifiers) == state)
}

/// Execute an action
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `action` - Action to run
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn run(subtle: &mut Subtle, action: &KeyAction) -> Result<()> {
    debug!("{}: action={:?}", function_name!(), action);

    let focus = subtle.focus.filter(|id| subtle.tree.contains(*id));
    let nviews = subtle.views.len();
    let current = subtle.current_view.unwrap_or(0);

    match (action, focus) {
        (KeyAction::FocusAbove, _) => tree::focus_dir(subtle, Direction::Above),
        (KeyAction::FocusBelow, _) => tree::focus_dir(subtle, Direction::Below),
        (KeyAction::FocusNext, _) => tree::focus_dir(subtle, Direction::Next),
        (KeyAction::FocusPrev, _) => tree::focus_dir(subtle, Direction::Prev),
        (KeyAction::FocusAny, _) => tree::focus_dir(subtle, Direction::Any),

        (KeyAction::WindowKill, Some(id)) => tree::close(subtle, id),
        (KeyAction::WindowShade, Some(id)) => tree::shade(subtle, id),
        (KeyAction::WindowFloat, Some(id)) => tree::toggle_float(subtle, id),
        (KeyAction::WindowFull, Some(id)) => tree::toggle_full(subtle, id),
        (KeyAction::WindowRaise, Some(id)) => tree::raise(subtle, id),
        (KeyAction::WindowLower, Some(id)) => tree::lower(subtle, id),

        (KeyAction::TilePile, Some(id)) => tree::toggle_pile(subtle, id),
        (KeyAction::TileLayout, Some(id)) => tree::toggle_layout(subtle, id),
        (KeyAction::TileNew, _) => {
            let target = focus.or_else(|| subtle.current_root());

            match target {
                Some(target) => tree::new_tile(subtle, target).map(|_| ()),
                None => Ok(()),
            }
        }
        (KeyAction::TileDelete, Some(id)) => {
            let node = subtle.tree.node(id)?;
            let tile = match node.kind {
                NodeKind::Tile(_) => Some(id),
                NodeKind::Client(_) => node.parent
                    .filter(|parent| subtle.tree.get(*parent).is_some_and(|p| matches!(p.kind, NodeKind::Tile(_)))),
                NodeKind::Screen(_) => None,
            };

            match tile {
                Some(tile) => tree::delete(subtle, tile, Release::Close),
                None => Ok(()),
            }
        }

        (KeyAction::ViewNext, _) if 0 < nviews => view::jump(subtle, (current + 1) % nviews),
        (KeyAction::ViewPrev, _) if 0 < nviews => view::jump(subtle, (current + nviews - 1) % nviews),
        (KeyAction::ViewJump(idx), _) => view::jump(subtle, *idx),

        (KeyAction::SubtleQuit, _) => {
            subtle.exiting.store(true, std::sync::atomic::Ordering::SeqCst);

            Ok(())
        }

        (KeyAction::Command(command), _) => spawn(subtle, command),

        _ => {
            debug!("{}: nothing to do for {:?}", function_name!(), action);

            Ok(())
        }
    }
}

/// Run a command in the background
pub(crate) fn spawn(subtle: &mut Subtle, command: &str) -> Result<()> {
    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .spawn()
        .with_context(|| format!("Failed to spawn `{}'", command))?;

    debug!("{}: command={}, pid={}", function_name!(), command, child.id());

    subtle.children.push(child);

    Ok(())
}

/// Reap finished children
pub(crate) fn reap(subtle: &mut Subtle) {
    subtle.children.retain_mut(|child| matches!(child.try_wait(), Ok(None)));
}
