///
/// @package subtle-tiler
///
/// @file Ewmh functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use anyhow::Result;
use log::debug;
use stdext::function_name;
use strum_macros::FromRepr;
use x11rb::protocol::xproto::Window;
use crate::backend::PropValue;
use crate::subtle::Subtle;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        // ICCCM
        WM_NAME, WM_CLASS, WM_STATE, WM_PROTOCOLS, WM_TAKE_FOCUS,
        WM_DELETE_WINDOW, WM_HINTS, WM_TRANSIENT_FOR, WM_COLORMAP_WINDOWS,

        // EWMH
        _NET_SUPPORTED, _NET_CLIENT_LIST, _NET_CLIENT_LIST_STACKING,
        _NET_NUMBER_OF_DESKTOPS, _NET_DESKTOP_NAMES, _NET_DESKTOP_GEOMETRY,
        _NET_DESKTOP_VIEWPORT, _NET_CURRENT_DESKTOP, _NET_ACTIVE_WINDOW,
        _NET_WORKAREA, _NET_SUPPORTING_WM_CHECK, _NET_VIRTUAL_ROOTS,

        // Client
        _NET_CLOSE_WINDOW, _NET_WM_NAME, _NET_WM_PID, _NET_WM_DESKTOP,

        // States
        _NET_WM_STATE, _NET_WM_STATE_FULLSCREEN, _NET_WM_STATE_SHADED,

        // Misc
        UTF8_STRING,

        // subtle
        SUBTLE_CLIENT_TAGS, SUBTLE_CLIENT_TAG, SUBTLE_CLIENT_UNTAG,
        SUBTLE_TAG_NEW, SUBTLE_TAG_LIST, SUBTLE_TAG_KILL,
        SUBTLE_VIEW_NEW, SUBTLE_VIEW_TAGS, SUBTLE_VIEW_TAG, SUBTLE_VIEW_UNTAG,
        SUBTLE_VIEW_KILL,
    }
}

/// Properties we write to windows
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Hint {
    Supported,
    ClientList,
    ClientListStacking,
    NumberOfDesktops,
    DesktopNames,
    DesktopGeometry,
    DesktopViewport,
    CurrentDesktop,
    ActiveWindow,
    Workarea,
    SupportingWmCheck,
    VirtualRoots,
    WmName,
    WmPid,
    WmDesktop,
    WmState,
    NetWmState,
    TagList,
    ClientTags,
    ViewTags,
}

impl Hint {
    /// Everything we announce in _NET_SUPPORTED
    pub(crate) const SUPPORTED: [Hint; 15] = [
        Hint::ClientList, Hint::ClientListStacking, Hint::NumberOfDesktops,
        Hint::DesktopNames, Hint::DesktopGeometry, Hint::DesktopViewport,
        Hint::CurrentDesktop, Hint::ActiveWindow, Hint::Workarea,
        Hint::SupportingWmCheck, Hint::VirtualRoots, Hint::WmName,
        Hint::WmPid, Hint::WmDesktop, Hint::NetWmState,
    ];
}

/// Control messages understood by the event loop
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Message {
    CurrentDesktop,
    ActiveWindow,
    CloseWindow,
    WmState,
    TagNew,
    TagKill,
    ViewNew,
    ViewKill,
    ClientTag,
    ClientUntag,
    ViewTag,
    ViewUntag,
}

/// Client properties we react to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Property {
    Name,
    Hints,
}

/// States of _NET_WM_STATE we can toggle
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum NetState {
    Fullscreen,
    Shaded,
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
pub(crate) enum WMState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
pub(crate) enum StateAction {
    Remove = 0,
    Add = 1,
    Toggle = 2,
}

/// Encode strings as NUL separated list; every entry carries its own terminator
///
/// # Arguments
///
/// * `strings` - List of strings
///
/// # Returns
///
/// Encoded bytes
pub(crate) fn encode_strings<S: AsRef<str>>(strings: &[S]) -> Vec<u8> {
    let mut data = Vec::with_capacity(strings.iter().map(|s| s.as_ref().len() + 1).sum());

    for s in strings {
        data.extend_from_slice(s.as_ref().as_bytes());
        data.push(0);
    }

    data
}

/// Decode NUL separated list
pub(crate) fn decode_strings(data: &[u8]) -> Vec<String> {
    data.split(|b| 0 == *b)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Extract a name from the byte payload of a client message
///
/// # Arguments
///
/// * `data` - Raw bytes (format 8)
///
/// # Returns
///
/// Either [`Some`] trimmed name or [`None`] when empty
pub(crate) fn decode_name(data: &[u8]) -> Option<String> {
    let end = data.iter().position(|b| 0 == *b).unwrap_or(data.len());
    let name = String::from_utf8_lossy(&data[..end]).trim().to_string();

    if name.is_empty() { None } else { Some(name) }
}

/// Publish the static root properties once after startup
///
/// # Arguments
///
/// * `subtle` - Global state object
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn init(subtle: &mut Subtle) -> Result<()> {
    let root = subtle.backend.root();
    let support = subtle.support_win;
    let (width, height) = (u32::from(subtle.width), u32::from(subtle.height));
    let bar_height = u32::from(subtle.title_height);

    let backend = subtle.backend.as_mut();

    backend.set_property(root, Hint::SupportingWmCheck, PropValue::Windows(vec![support]))?;
    backend.set_property(support, Hint::SupportingWmCheck, PropValue::Windows(vec![support]))?;
    backend.set_property(support, Hint::WmName, PropValue::Utf8(env!("CARGO_PKG_NAME").into()))?;
    backend.set_property(support, Hint::WmPid, PropValue::Cardinals(vec![std::process::id()]))?;

    backend.set_property(root, Hint::DesktopGeometry, PropValue::Cardinals(vec![width, height]))?;
    backend.set_property(root, Hint::DesktopViewport, PropValue::Cardinals(vec![0, 0]))?;
    backend.set_property(root, Hint::Workarea,
                         PropValue::Cardinals(vec![0, bar_height, width, height.saturating_sub(bar_height)]))?;
    backend.set_property(root, Hint::Supported, PropValue::Hints(Hint::SUPPORTED.to_vec()))?;

    debug!("{}", function_name!());

    Ok(())
}

/// Publish client list and stacking list
pub(crate) fn publish_clients(subtle: &mut Subtle) -> Result<()> {
    let root = subtle.backend.root();
    let wins = subtle.clients.to_vec();

    subtle.backend.set_property(root, Hint::ClientList, PropValue::Windows(wins.clone()))?;
    subtle.backend.set_property(root, Hint::ClientListStacking, PropValue::Windows(wins))?;

    debug!("{}: nclients={}", function_name!(), subtle.clients.len());

    Ok(())
}

/// Publish active window
pub(crate) fn publish_active(subtle: &mut Subtle, win: Window) -> Result<()> {
    let root = subtle.backend.root();

    subtle.backend.set_property(root, Hint::ActiveWindow, PropValue::Windows(vec![win]))
}
