///
/// @package subtle-tiler
///
/// @file Event functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use anyhow::Result;
use log::{debug, warn};
use stdext::function_name;
use x11rb::protocol::xproto::{Colormap, Keycode, Window};
use crate::backend::{ConfigureValues, Event, MessageData};
use crate::drag::DragMode;
use crate::ewmh::{self, Message, NetState, Property, StateAction};
use crate::node::{NodeFlags, NodeId};
use crate::subtle::Subtle;
use crate::tree::Release;
use crate::{drag, key, sublet, tag, tree, view};

/// Max. time between two clicks of a double click in ms
pub(crate) const DOUBLE_CLICK_TIME: u32 = 300;

/// Holder node of a native window or node of a frame or decoration
fn find_node(subtle: &Subtle, win: Window) -> Option<NodeId> {
    subtle.windows.lookup(win).filter(|id| subtle.tree.contains(*id))
}

fn handle_button_press(subtle: &mut Subtle, win: Window, button: u8, time: u32) -> Result<()> {
    // View buttons
    if let Some(view_idx) = subtle.view_buttons.lookup(win) {
        return view::jump(subtle, view_idx);
    }

    let Some(id) = find_node(subtle, win) else {
        debug!("{}: unmanaged win={}", function_name!(), win);

        return Ok(());
    };

    let node = subtle.tree.node(id)?;

    // Tile buttons
    if let Some(tile) = node.tile() {
        if 1 == button && win == tile.new_button {
            return tree::new_tile(subtle, id).map(|_| ());
        } else if 1 == button && win == tile.delete_button {
            return tree::delete(subtle, id, Release::Close);
        }

        return Ok(());
    }

    let is_title = win == node.title || node.client().is_some_and(|client| client.caption == win);
    let floating = node.flags.intersects(NodeFlags::FLOAT | NodeFlags::TRANS);

    let mode = if win == node.left {
        Some(DragMode::Left)
    } else if win == node.right {
        Some(DragMode::Right)
    } else if win == node.bottom {
        Some(DragMode::Bottom)
    } else if is_title {
        Some(if floating { DragMode::Move } else { DragMode::Swap })
    } else {
        None
    };

    match button {
        1 => {
            if is_title {
                // Single timer for all windows
                let double = 0 != subtle.last_click
                    && time.wrapping_sub(subtle.last_click) < DOUBLE_CLICK_TIME;

                if double {
                    subtle.last_click = 0;

                    return tree::shade(subtle, id);
                }

                subtle.last_click = time;
            }

            if floating {
                tree::raise(subtle, id)?;
            }

            tree::set_top(subtle, id)?;
            tree::focus(subtle, id)?;

            match mode {
                Some(mode) if subtle.tree.contains(id) => drag::drag(subtle, id, mode),
                _ => Ok(()),
            }
        }
        2 if is_title => tree::close(subtle, id),
        3 if is_title => tree::toggle_float(subtle, id),
        _ => Ok(()),
    }
}

fn handle_key_press(subtle: &mut Subtle, keycode: Keycode, state: u16) -> Result<()> {
    let Some(action) = key::find(subtle, keycode, state).map(|key| key.action.clone()) else {
        debug!("{}: unbound keycode={}, state={}", function_name!(), keycode, state);

        return Ok(());
    };

    key::run(subtle, &action)
}

fn handle_configure_request(subtle: &mut Subtle, win: Window, values: ConfigureValues) -> Result<()> {
    let holder = find_node(subtle, win)
        .filter(|id| subtle.client_win(*id) == Some(win));

    let Some(id) = holder else {
        return subtle.backend.forward_configure(win, values);
    };

    let node = subtle.tree.node_mut(id)?;

    // Only floating clients may change their geometry
    if node.flags.intersects(NodeFlags::FLOAT | NodeFlags::TRANS) && !node.flags.contains(NodeFlags::FULL) {
        if let Some(x) = values.x {
            node.geom.x = x;
        }

        if let Some(y) = values.y {
            node.geom.y = y;
        }

        if let Some(width) = values.width {
            node.geom.width = width;
        }

        if let Some(height) = values.height {
            node.geom.height = height;
        }
    }

    tree::resize(subtle, id)
}

fn handle_destroy_notify(subtle: &mut Subtle, win: Window) -> Result<()> {
    let nodes = subtle.nodes_of(win);

    if nodes.is_empty() {
        return Ok(());
    }

    for id in nodes {
        if subtle.tree.contains(id) {
            subtle.tree.node_mut(id)?.flags.insert(NodeFlags::DEAD);
            tree::delete(subtle, id, Release::Keep)?;
        }
    }

    debug!("{}: win={}", function_name!(), win);

    Ok(())
}

/// Index from a long of a format 32 message
fn long_index(data: &MessageData, idx: usize) -> Option<usize> {
    (32 == data.format).then(|| data.longs[idx] as usize)
}

/// Name from the bytes of a format 8 message
fn message_name(data: &MessageData) -> Option<String> {
    (8 == data.format).then(|| ewmh::decode_name(&data.bytes)).flatten()
}

fn set_state(subtle: &mut Subtle, id: NodeId, state: NetState, action: StateAction) -> Result<()> {
    let flag = match state {
        NetState::Fullscreen => NodeFlags::FULL,
        NetState::Shaded => NodeFlags::SHADE,
    };

    let active = subtle.tree.node(id)?.flags.contains(flag);

    let toggle = match action {
        StateAction::Add => !active,
        StateAction::Remove => active,
        StateAction::Toggle => true,
    };

    if !toggle {
        return Ok(());
    }

    match state {
        NetState::Fullscreen => tree::toggle_full(subtle, id),
        NetState::Shaded => tree::shade(subtle, id),
    }
}

fn activate(subtle: &mut Subtle, win: Window) -> Result<()> {
    let nodes = subtle.nodes_of(win);

    let visible = nodes.iter().copied()
        .find(|id| subtle.view_of(*id) == subtle.current_view);

    let target = match visible {
        Some(id) => Some(id),
        None => {
            let Some(view_idx) = nodes.first().and_then(|id| subtle.view_of(*id)) else {
                return Ok(());
            };

            view::jump(subtle, view_idx)?;

            subtle.nodes_of(win).into_iter()
                .find(|id| subtle.view_of(*id) == subtle.current_view)
        }
    };

    match target {
        Some(id) => tree::focus(subtle, id),
        None => Ok(()),
    }
}

/// Handle control messages; malformed ones are ignored
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `win` - Window the message is about
/// * `message` - Known message type
/// * `data` - Payload of the message
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn handle_client_message(subtle: &mut Subtle, win: Window, message: Option<Message>,
                                    data: &MessageData) -> Result<()>
{
    let root = subtle.backend.root();
    let ntags = subtle.tags.len();
    let nviews = subtle.views.len();

    debug!("{}: win={}, message={:?}, format={}", function_name!(), win, message, data.format);

    match (message, win == root) {
        (Some(Message::CurrentDesktop), true) => match long_index(data, 0) {
            Some(view_idx) if view_idx < nviews => view::jump(subtle, view_idx),
            _ => ignore(message),
        },
        (Some(Message::ActiveWindow), false) => activate(subtle, win),
        (Some(Message::CloseWindow), false) => match find_node(subtle, win) {
            Some(id) => tree::close(subtle, id),
            None => ignore(message),
        },
        (Some(Message::WmState), false) => {
            let (Some(id), Some(action)) = (find_node(subtle, win), StateAction::from_repr(data.longs[0])) else {
                return ignore(message);
            };

            for atom in [data.longs[1], data.longs[2]] {
                if let Some(state) = subtle.backend.decode_state(atom)
                    && subtle.tree.contains(id)
                {
                    set_state(subtle, id, state, action)?;
                }
            }

            Ok(())
        }

        // Tags
        (Some(Message::TagNew), true) => match message_name(data) {
            Some(name) => tag::create(subtle, &name),
            None => ignore(message),
        },
        (Some(Message::TagKill), true) => match long_index(data, 0) {
            Some(tag_idx) if tag_idx < ntags => tag::kill(subtle, tag_idx),
            _ => ignore(message),
        },

        // Views
        (Some(Message::ViewNew), true) => match message_name(data) {
            Some(name) => view::create(subtle, &name),
            None => ignore(message),
        },
        (Some(Message::ViewKill), true) => match long_index(data, 0) {
            Some(view_idx) if view_idx < nviews => view::kill(subtle, view_idx),
            _ => ignore(message),
        },

        // Tagging
        (Some(Message::ClientTag | Message::ClientUntag), true) => {
            let client_win = data.longs[0];

            match long_index(data, 1) {
                Some(tag_idx) if tag_idx < ntags && !subtle.nodes_of(client_win).is_empty() => {
                    if Some(Message::ClientTag) == message {
                        view::tag_client(subtle, client_win, tag_idx)
                    } else {
                        view::untag_client(subtle, client_win, tag_idx)
                    }
                }
                _ => ignore(message),
            }
        }
        (Some(Message::ViewTag | Message::ViewUntag), true) => {
            match (long_index(data, 0), long_index(data, 1)) {
                (Some(view_idx), Some(tag_idx)) if view_idx < nviews && tag_idx < ntags => {
                    if Some(Message::ViewTag) == message {
                        view::tag(subtle, view_idx, tag_idx)
                    } else {
                        view::untag(subtle, view_idx, tag_idx)
                    }
                }
                _ => ignore(message),
            }
        }

        _ => ignore(message),
    }
}

fn ignore(message: Option<Message>) -> Result<()> {
    debug!("{}: ignoring message={:?}", function_name!(), message);

    Ok(())
}

fn handle_colormap(subtle: &mut Subtle, win: Window, colormap: Colormap, new: bool) -> Result<()> {
    let Some(id) = find_node(subtle, win) else {
        return Ok(());
    };

    if new && let Some(client) = subtle.tree.node_mut(id)?.client_mut() {
        client.colormap = colormap;
    }

    subtle.backend.install_colormap(colormap)
}

fn handle_property(subtle: &mut Subtle, win: Window, property: Option<Property>) -> Result<()> {
    match property {
        Some(Property::Name) if !subtle.nodes_of(win).is_empty() => {
            let name = subtle.backend.fetch_name(win)?;

            for id in subtle.nodes_of(win) {
                tree::set_name(subtle, id, name.clone())?;
            }

            Ok(())
        }
        Some(Property::Hints) if !subtle.nodes_of(win).is_empty() => {
            let info = subtle.backend.fetch_client_info(win)?;

            for id in subtle.nodes_of(win) {
                subtle.tree.node_mut(id)?.flags.set(NodeFlags::URGENT, info.urgent);
                tree::render(subtle, id)?;
            }

            Ok(())
        }
        _ => Ok(()),
    }
}

fn handle_enter(subtle: &mut Subtle, win: Window) -> Result<()> {
    match find_node(subtle, win) {
        Some(id) if subtle.tree.node(id)?.is_client() && subtle.focus != Some(id) => tree::focus(subtle, id),
        _ => Ok(()),
    }
}

fn handle_expose(subtle: &mut Subtle, win: Window) -> Result<()> {
    if win == subtle.bar_win || win == subtle.views_win || subtle.view_buttons.lookup(win).is_some() {
        return view::render(subtle);
    }

    if let Some(sublet_idx) = subtle.sublet_wins.lookup(win) {
        return sublet::render(subtle, sublet_idx);
    }

    match find_node(subtle, win) {
        Some(id) => tree::render(subtle, id),
        None => Ok(()),
    }
}

fn handle_focus_in(subtle: &mut Subtle, win: Window) -> Result<()> {
    let Some(id) = find_node(subtle, win).filter(|id| subtle.client_win(*id) == Some(win)) else {
        return Ok(());
    };

    if subtle.focus != Some(id) {
        let prev = subtle.focus.replace(id);

        if let Some(prev) = prev.filter(|prev| subtle.tree.contains(*prev)) {
            tree::render(subtle, prev)?;
        }

        tree::render(subtle, id)?;
        ewmh::publish_active(subtle, win)?;
    }

    Ok(())
}

/// Dispatch a single event
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `event` - Event to handle
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn handle_event(subtle: &mut Subtle, event: Event) -> Result<()> {
    match event {
        Event::ButtonPress { win, button, time, .. } => handle_button_press(subtle, win, button, time),
        Event::KeyPress { keycode, state, .. } => handle_key_press(subtle, keycode, state),
        Event::ConfigureRequest { win, values } => handle_configure_request(subtle, win, values),
        Event::MapRequest { win } => view::merge_client(subtle, win),
        Event::DestroyNotify { win } => handle_destroy_notify(subtle, win),
        Event::ClientMessage { win, message, data } => handle_client_message(subtle, win, message, &data),
        Event::ColormapNotify { win, colormap, new } => handle_colormap(subtle, win, colormap, new),
        Event::PropertyNotify { win, property } => handle_property(subtle, win, property),
        Event::EnterNotify { win } => handle_enter(subtle, win),
        Event::Expose { win } => handle_expose(subtle, win),
        Event::FocusIn { win } => handle_focus_in(subtle, win),
        Event::Unknown => Ok(()),
    }
}

/// Run the event loop until exit is requested
///
/// # Arguments
///
/// * `subtle` - Global state object
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn handle_requests(subtle: &mut Subtle) -> Result<()> {
    while !subtle.is_exiting() {
        key::reap(subtle);

        let now = sublet::now();

        sublet::run_due(subtle, now)?;

        let timeout = sublet::next_timeout(subtle, now);

        subtle.backend.flush()?;

        let mut next = subtle.backend.wait_for_event(timeout)?;

        while let Some(event) = next {
            // Handler errors must not stop the loop
            if let Err(err) = handle_event(subtle, event) {
                warn!("Failed handling event: {}", err);
            }

            if subtle.is_exiting() {
                break;
            }

            next = subtle.backend.poll_event()?;
        }
    }

    debug!("{}: exiting", function_name!());

    Ok(())
}
