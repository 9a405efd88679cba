///
/// @package subtle-tiler
///
/// @file Logger functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use log::{debug, LevelFilter};
use anyhow::Result;
use stdext::function_name;
use crate::config::Config;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum LogLevel {
    None,
    Info,
    Warnings,
    Error,
    Events,
    Subtle,
    Debug,
}

impl From<&str> for LogLevel {
    fn from(level: &str) -> Self {
        match level.to_lowercase().as_str() {
            "none" => LogLevel::None,
            "warnings" => LogLevel::Warnings,
            "errors" => LogLevel::Error,
            "events" => LogLevel::Events,
            "subtle" => LogLevel::Subtle,
            "debug" => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::None => LevelFilter::Off,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warnings => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Events | LogLevel::Subtle => LevelFilter::Trace,
        }
    }
}

/// Check config and init all log related options
///
/// # Arguments
///
/// * `config` - Config values read either from args or config file
///
/// # Returns
///
/// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
pub(crate) fn init(config: &Config) -> Result<()> {
    let level = if config.debug {
        LogLevel::Debug
    } else {
        LogLevel::from(config.loglevel.as_str())
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_level(LevelFilter::from(level))
        .try_init()?;

    debug!("{}: level={:?}", function_name!(), level);

    Ok(())
}
