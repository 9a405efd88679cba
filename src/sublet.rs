///
/// @package subtle-tiler
///
/// @file Sublet functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::fmt;
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use anyhow::{anyhow, Context, Result};
use derive_builder::Builder;
use log::{debug, info, warn};
use stdext::function_name;
use x11rb::NONE;
use x11rb::protocol::xproto::Window;
use crate::backend::WinKind;
use crate::config::{Config, MixedConfigVal};
use crate::rect::Rect;
use crate::subtle::Subtle;

/// Number of failed runs before a sublet is dropped
pub(crate) const MAX_FAILURES: u8 = 3;
const METER_WIDTH: u16 = 50;
const TEXT_PADDING: u16 = 6;

/// Source of the values of a sublet
pub(crate) trait SubletRunner {
    /// Run once and return the new value
    fn run(&mut self) -> Result<String>;
}

/// Run a shell command and use its output
pub(crate) struct CommandRunner {
    command: String,
}

impl CommandRunner {
    pub(crate) fn new(command: &str) -> Self {
        Self { command: command.to_string() }
    }
}

impl SubletRunner for CommandRunner {
    fn run(&mut self) -> Result<String> {
        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .with_context(|| format!("Failed to run `{}'", self.command))?;

        if !output.status.success() {
            return Err(anyhow!("Command `{}' exited with {}", self.command, output.status));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SubletKind {
    /// Rendered once and never updated
    #[default]
    Text,
    /// Periodically updated text
    Teaser,
    /// Periodically updated percentage bar
    Meter,
}

impl From<&str> for SubletKind {
    fn from(kind: &str) -> Self {
        match kind.to_lowercase().as_str() {
            "teaser" => SubletKind::Teaser,
            "meter" => SubletKind::Meter,
            _ => SubletKind::Text,
        }
    }
}

/// Cached value of a sublet
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubletValue {
    Text(String),
    Number(u8),
}

impl Default for SubletValue {
    fn default() -> Self {
        SubletValue::Text(String::new())
    }
}

/// Heap entry of a periodic sublet; ordered by next run first
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Schedule {
    /// Next run in seconds since epoch
    pub(crate) time: u64,
    /// Index into the sublet list
    pub(crate) idx: usize,
}

#[derive(Builder)]
#[builder(build_fn(skip))]
pub(crate) struct Sublet {
    pub(crate) name: String,
    pub(crate) kind: SubletKind,
    /// Seconds between two runs
    pub(crate) interval: u64,

    #[builder(setter(skip))]
    pub(crate) runner: Box<dyn SubletRunner>,
    #[builder(setter(skip))]
    pub(crate) value: SubletValue,
    #[builder(setter(skip))]
    pub(crate) failures: u8,
    #[builder(setter(skip))]
    pub(crate) win: Window,
    #[builder(setter(skip))]
    pub(crate) width: u16,
}

impl SubletBuilder {
    /// Create a new instance
    ///
    /// # Arguments
    ///
    /// * `runner` - Source of the values
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`Sublet`] on success or otherwise [`anyhow::Error`]
    pub(crate) fn build(&self, runner: Box<dyn SubletRunner>) -> Result<Sublet> {
        Ok(Sublet {
            name: self.name.clone().context("Name not set")?,
            kind: self.kind.unwrap_or_default(),
            interval: self.interval.unwrap_or(60).max(1),
            runner,
            value: SubletValue::default(),
            failures: 0,
            win: NONE,
            width: 0,
        })
    }
}

impl Sublet {
    /// Run the sublet and store the new value
    ///
    /// # Returns
    ///
    /// A [`Result`] with either [`unit`] on success or otherwise [`anyhow::Error`]
    pub(crate) fn update(&mut self) -> Result<()> {
        let res = self.runner.run()?;

        self.value = match self.kind {
            SubletKind::Meter => SubletValue::Number(parse_percent(&res)?),
            SubletKind::Text | SubletKind::Teaser => SubletValue::Text(res),
        };

        debug!("{}: name={}, value={:?}", function_name!(), self.name, self.value);

        Ok(())
    }
}

impl fmt::Display for Sublet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(name={}, kind={:?}, interval={}, value={:?}, failures={})",
               self.name, self.kind, self.interval, self.value, self.failures)
    }
}

/// Parse a percentage like `42` or `42%` and clamp it to 100
pub(crate) fn parse_percent(value: &str) -> Result<u8> {
    let number: u32 = value.trim().trim_end_matches('%').trim().parse()
        .with_context(|| format!("Invalid meter value `{}'", value))?;

    Ok(number.min(100) as u8)
}

/// Current time in seconds
pub(crate) fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |dur| dur.as_secs())
}

fn create_runner(values: &std::collections::HashMap<String, MixedConfigVal>) -> Result<Box<dyn SubletRunner>> {
    #[cfg(feature = "plugins")]
    if let Some(MixedConfigVal::S(url)) = values.get("url") {
        return Ok(Box::new(crate::plugin::PluginRunner::new(url)?));
    }

    match values.get("command") {
        Some(MixedConfigVal::S(command)) => Ok(Box::new(CommandRunner::new(command))),
        _ => Err(anyhow!("Neither url nor command set")),
    }
}

/// Check config and init all sublet related options
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
    if NONE == subtle.sublets_win && NONE != subtle.bar_win {
        let width = subtle.width / 2;

        subtle.sublets_win = subtle.backend.create_window(subtle.bar_win,
            Rect::new(width as i16, 0, subtle.width - width, subtle.title_height), WinKind::Bar)?;
        subtle.backend.map(subtle.sublets_win)?;
    }

    for values in &config.sublets {
        let mut builder = SubletBuilder::default();

        if let Some(MixedConfigVal::S(value)) = values.get("name") {
            builder.name(value.to_string());
        }

        if let Some(MixedConfigVal::S(value)) = values.get("type") {
            builder.kind(SubletKind::from(value.as_str()));
        }

        if let Some(MixedConfigVal::I(value)) = values.get("interval") {
            builder.interval(u64::from(value.unsigned_abs()));
        }

        let sublet = match create_runner(values).and_then(|runner| builder.build(runner)) {
            Ok(sublet) => sublet,
            Err(err) => {
                warn!("Skipping sublet: {}", err);

                continue;
            }
        };

        info!("Loaded sublet ({})", sublet.name);

        add(subtle, sublet)?;
    }

    arrange(subtle)?;

    debug!("{}", function_name!());

    Ok(())
}

/// Add a sublet, run it once and schedule it unless it is a text sublet
pub(crate) fn add(subtle: &mut Subtle, mut sublet: Sublet) -> Result<usize> {
    let idx = subtle.sublets.len();

    if NONE != subtle.sublets_win {
        sublet.win = subtle.backend.create_window(subtle.sublets_win,
            Rect::new(0, 0, 1, subtle.title_height), WinKind::Bar)?;

        subtle.sublet_wins.register(sublet.win, idx);
    }

    if let Err(err) = sublet.update() {
        warn!("Sublet `{}' failed: {}", sublet.name, err);

        sublet.failures += 1;
    }

    let (kind, interval) = (sublet.kind, sublet.interval);

    subtle.sublets.push(sublet);

    if SubletKind::Text != kind {
        subtle.queue.push(Schedule { time: now() + interval, idx })?;
    }

    debug!("{}: idx={}, kind={:?}", function_name!(), idx, kind);

    Ok(idx)
}

/// Run all sublets that are due
///
/// # Arguments
///
/// * `subtle` - Global state object
/// * `now` - Current time in seconds
///
/// # Returns
///
/// A [`Result`] with either the number of runs on success or otherwise [`anyhow::Error`]
pub(crate) fn run_due(subtle: &mut Subtle, now: u64) -> Result<usize> {
    let mut runs = 0;

    while let Some(&Schedule { time, idx }) = subtle.queue.peek() {
        if time > now {
            break;
        }

        runs += 1;

        let Some(sublet) = subtle.sublets.get_mut(idx) else {
            subtle.queue.pop();

            continue;
        };

        match sublet.update() {
            Ok(()) => sublet.failures = 0,
            Err(err) => {
                sublet.failures += 1;

                warn!("Sublet `{}' failed ({}/{}): {}", sublet.name, sublet.failures, MAX_FAILURES, err);
            }
        }

        if sublet.failures >= MAX_FAILURES {
            warn!("Dropping sublet `{}'", sublet.name);

            subtle.queue.pop();

            continue;
        }

        let interval = sublet.interval;

        if let Some(entry) = subtle.queue.peek_mut() {
            entry.time = now + interval;
        }

        subtle.queue.sift_down(0);
    }

    if 0 < runs {
        arrange(subtle)?;
    }

    Ok(runs)
}

/// Time until the next sublet is due or [`None`] without periodic sublets
pub(crate) fn next_timeout(subtle: &Subtle, now: u64) -> Option<Duration> {
    subtle.queue.peek().map(|entry| Duration::from_secs(entry.time.saturating_sub(now)))
}

/// Update widths and positions of all sublet windows and render them
pub(crate) fn arrange(subtle: &mut Subtle) -> Result<()> {
    let mut x: u16 = 0;

    for idx in 0..subtle.sublets.len() {
        let sublet = &subtle.sublets[idx];

        let width = match (sublet.kind, &sublet.value) {
            (SubletKind::Meter, _) | (_, SubletValue::Number(_)) => METER_WIDTH,
            (_, SubletValue::Text(text)) => subtle.backend.text_width(text)?.saturating_add(TEXT_PADDING),
        };

        let sublet = &mut subtle.sublets[idx];

        sublet.width = width.max(1);

        if NONE != sublet.win {
            let win = sublet.win;

            subtle.backend.move_resize(win, Rect::new(x as i16, 0, width.max(1), subtle.title_height))?;
            subtle.backend.map(win)?;
        }

        x = x.saturating_add(width);

        render(subtle, idx)?;
    }

    Ok(())
}

/// Draw a sublet
pub(crate) fn render(subtle: &mut Subtle, idx: usize) -> Result<()> {
    let Some(sublet) = subtle.sublets.get(idx) else {
        return Ok(());
    };

    if NONE == sublet.win {
        return Ok(());
    }

    let (win, width, value) = (sublet.win, sublet.width, sublet.value.clone());
    let colors = subtle.colors;
    let th = subtle.title_height;

    subtle.backend.set_background(win, colors.background)?;
    subtle.backend.clear_window(win)?;

    match value {
        SubletValue::Number(percent) => {
            let fill = (u32::from(width) * u32::from(percent) / 100) as u16;

            subtle.backend.fill_rect(win, Rect::new(0, 2, fill, th.saturating_sub(4)), colors.focus)?;
        }
        SubletValue::Text(text) => {
            subtle.backend.draw_text(win, (TEXT_PADDING / 2) as i16, &text, colors.text, colors.background)?;
        }
    }

    Ok(())
}
