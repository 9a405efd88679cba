///
/// @package subtle-tiler
///
/// @file Main functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

mod array;
mod backend;
mod config;
mod display;
mod drag;
mod event;
mod ewmh;
mod font;
mod key;
mod logger;
mod node;
#[cfg(feature = "plugins")]
mod plugin;
mod queue;
mod rect;
mod registry;
mod rule;
mod sublet;
mod subtle;
mod tag;
mod tagging;
mod tree;
mod view;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use anyhow::{Context, Result};
use log::{debug, error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use crate::config::Config;
use crate::subtle::{Subtle, SubtleFlags};

fn install_signal_handler(subtle: &mut Subtle) -> Result<()> {
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&subtle.exiting))
            .with_context(|| format!("Failed to set handler for signal {}", signal))?;
    }

    Ok(())
}

fn print_version() {
    info!("{} {} - Copyright (c) 2025-present {}",
        env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_AUTHORS"));
    info!("Released under the GNU Public License");
    info!("Compiled for X11");
}

fn main() -> Result<()> {
    // Load config
    let (config, path, _format) = Config::parse_info();

    logger::init(&config)?;

    info!("Reading file `{:?}'", path.unwrap_or_default());
    debug!("Config: {:?}", config);

    print_version();

    let mut backend = display::init(&config)?;
    let support = backend.claim(config.replace)?;

    let mut subtle = Subtle::new(Box::new(backend));

    subtle.support_win = support;
    subtle.init(&config);

    install_signal_handler(&mut subtle)?;

    ewmh::init(&mut subtle)?;
    tag::init(&config, &mut subtle)?;
    tag::publish(&mut subtle)?;
    view::init(&config, &mut subtle)?;
    key::init(&config, &mut subtle)?;
    sublet::init(&config, &mut subtle)?;

    drop(config);

    display::scan(&mut subtle)?;

    // Run event handler
    if let Err(e) = event::handle_requests(&mut subtle) {
        error!("Error: {}", e);
    }

    if subtle.flags.contains(SubtleFlags::DEBUG) {
        debug!("Shutdown: {}", subtle);
    }

    display::finish(&mut subtle)?;

    info!("Exit");

    Ok(())
}
