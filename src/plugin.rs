///
/// @package subtle-tiler
///
/// @file Plugin functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use extism::{host_fn, Manifest, UserData, Wasm, PTR};
use anyhow::{Context, Result};
use log::debug;
use stdext::function_name;
use time::{format_description, OffsetDateTime};
use crate::sublet::SubletRunner;

host_fn!(get_formatted_time(_user_data: (); format: String) -> String {
    let dt = OffsetDateTime::now_local()?;

    let parsed_format = format_description::parse(&format)?;

    Ok(dt.format(&parsed_format)?)
});

host_fn!(get_memory(_user_data: ()) -> String {
    let contents = std::fs::read_to_string("/proc/meminfo")?;

    let field = |name: &str| contents.lines()
        .find(|line| line.starts_with(name))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string);

    let mem_total = field("MemTotal").context("Cannot read total memory")?;
    let mem_available = field("MemAvailable").context("Cannot read available memory")?;
    let mem_free = field("MemFree").context("Cannot read free memory")?;

    Ok(format!("{} {} {}", mem_total, mem_available, mem_free))
});

host_fn!(get_battery(_user_data: (); battery_idx: String) -> String {
    let charge_full = std::fs::read_to_string(
        format!("/sys/class/power_supply/BAT{}/charge_full", battery_idx))?;
    let charge_now = std::fs::read_to_string(
        format!("/sys/class/power_supply/BAT{}/charge_now", battery_idx))?;

    Ok(format!("{} {}", charge_full.trim(), charge_now.trim()))
});

/// Sublet source backed by a wasm plugin exporting `run`
pub(crate) struct PluginRunner {
    url: String,
    plugin: extism::Plugin,
}

impl PluginRunner {
    /// Load a wasm plugin
    ///
    /// # Arguments
    ///
    /// * `url` - Path to the wasm file
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`PluginRunner`] on success or otherwise [`anyhow::Error`]
    pub(crate) fn new(url: &str) -> Result<Self> {
        let manifest = Manifest::new([Wasm::file(url)]);

        let plugin = extism::PluginBuilder::new(&manifest)
            .with_wasi(true)
            .with_function("get_formatted_time", [PTR], [PTR],
                           UserData::default(), get_formatted_time)
            .with_function("get_memory", [], [PTR],
                           UserData::default(), get_memory)
            .with_function("get_battery", [PTR], [PTR],
                           UserData::default(), get_battery)
            .build()
            .with_context(|| format!("Failed to load plugin `{}'", url))?;

        debug!("{}: url={}", function_name!(), url);

        Ok(Self { url: url.to_string(), plugin })
    }
}

impl SubletRunner for PluginRunner {
    fn run(&mut self) -> Result<String> {
        let res: String = self.plugin.call("run", "")?;

        debug!("{}: url={}, res={}", function_name!(), self.url, res);

        Ok(res)
    }
}

impl fmt::Display for PluginRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(url={})", self.url)
    }
}
