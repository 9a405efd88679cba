///
/// @package subtle-tiler
///
/// @file Font functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use anyhow::{anyhow, Result};
use log::debug;
use stdext::function_name;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Char2b, ConnectionExt, Font as XFont};
use x11rb::rust_connection::RustConnection;

/// Fallback for broken font names
pub(crate) const DEFAULT_FONT: &str = "-*-fixed-*-*-*-*-10-*-*-*-*-*-*-*";

#[derive(Default, Debug, Clone)]
pub(crate) struct Font {
    pub(crate) fontable: XFont,
    /// Baseline of text inside a title
    pub(crate) y: u16,
    pub(crate) height: u16,
}

impl Font {
    /// Open a core font
    ///
    /// # Arguments
    ///
    /// * `conn` - Connection to X11
    /// * `font_name` - XLFD name of the font
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`Font`] on success or otherwise [`anyhow::Error`]
    pub(crate) fn new(conn: &RustConnection, font_name: &str) -> Result<Self> {
        if font_name.starts_with("xft") {
            return Err(anyhow!("Xft not supported yet"));
        }

        let fontable = conn.generate_id()?;

        conn.open_font(fontable, font_name.as_bytes())?.check()?;

        let reply = conn.query_font(fontable)?.reply()?;
        let height = (reply.font_ascent + reply.font_descent + 2) as u16;

        let font = Self {
            fontable,
            y: (height - 2 + reply.font_ascent as u16) / 2,
            height,
        };

        debug!("{}: name={}, font={}", function_name!(), font_name, font);

        Ok(font)
    }

    /// Width of a text in pixel
    pub(crate) fn text_width(&self, conn: &RustConnection, text: &str) -> Result<u16> {
        let text_char2b: Vec<Char2b> = text.bytes()
            .map(|b| Char2b {
                byte1: 0,
                byte2: b,
            }).collect();

        let reply = conn.query_text_extents(self.fontable, &text_char2b)?.reply()?;

        Ok(reply.overall_width.max(0) as u16)
    }

    pub(crate) fn kill(&self, conn: &RustConnection) -> Result<()> {
        conn.close_font(self.fontable)?.check()?;

        debug!("{}", function_name!());

        Ok(())
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(y={}, height={})", self.y, self.height)
    }
}
