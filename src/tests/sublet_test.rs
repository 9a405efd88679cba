///
/// @package subtle-tiler
///
/// @file Sublet tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use std::collections::VecDeque;
use std::time::Duration;
use anyhow::{anyhow, Result};
use proptest::prelude::*;
use crate::sublet;
use crate::sublet::{SubletBuilder, SubletKind, SubletRunner, SubletValue, MAX_FAILURES};
use crate::tests::mock;

/// Runner replaying canned results
struct Replay {
    results: VecDeque<Result<String>>,
}

impl SubletRunner for Replay {
    fn run(&mut self) -> Result<String> {
        self.results.pop_front().unwrap_or_else(|| Err(anyhow!("exhausted")))
    }
}

fn replay(results: Vec<Result<String>>) -> Box<dyn SubletRunner> {
    Box::new(Replay { results: results.into() })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_clamp_percent(value in 0u32..1000) {
        assert_eq!(sublet::parse_percent(&format!("{}%", value)).unwrap(), value.min(100) as u8);
    }
}

#[test]
fn should_reject_broken_percent() {
    assert!(sublet::parse_percent("lots").is_err());
    assert_eq!(sublet::parse_percent(" 42 % ").unwrap(), 42);
}

#[test]
fn should_render_text_sublet_once() {
    let config = mock::config(&[], &[]);
    let (mut subtle, _) = mock::setup(&config);

    sublet::init(&config, &mut subtle).unwrap();

    let sublet = SubletBuilder::default()
        .name("hello".into())
        .build(replay(vec![Ok("hello world".into())]))
        .unwrap();

    let idx = sublet::add(&mut subtle, sublet).unwrap();

    assert!(subtle.queue.is_empty());
    assert_eq!(subtle.sublets[idx].kind, SubletKind::Text);
    assert_eq!(subtle.sublets[idx].value, SubletValue::Text("hello world".into()));
    assert_eq!(subtle.sublet_wins.lookup(subtle.sublets[idx].win), Some(idx));
    assert_eq!(sublet::next_timeout(&subtle, sublet::now()), None);
}

#[test]
fn should_schedule_periodic_sublets() {
    let config = mock::config(&[], &[]);
    let (mut subtle, _) = mock::setup(&config);

    let meter = SubletBuilder::default()
        .name("cpu".into())
        .kind(SubletKind::Meter)
        .interval(10)
        .build(replay(vec![Ok("10".into()), Ok("55%".into())]))
        .unwrap();

    let idx = sublet::add(&mut subtle, meter).unwrap();
    let now = sublet::now();

    assert_eq!(subtle.sublets[idx].value, SubletValue::Number(10));

    let timeout = sublet::next_timeout(&subtle, now).unwrap();

    assert!(timeout <= Duration::from_secs(10));
    assert_eq!(sublet::run_due(&mut subtle, now).unwrap(), 0);
    assert_eq!(sublet::run_due(&mut subtle, now + 20).unwrap(), 1);
    assert_eq!(subtle.sublets[idx].value, SubletValue::Number(55));
    assert_eq!(subtle.queue.peek().map(|entry| entry.time), Some(now + 30));
}

#[test]
fn should_drop_failing_sublet() {
    let config = mock::config(&[], &[]);
    let (mut subtle, _) = mock::setup(&config);

    let teaser = SubletBuilder::default()
        .name("broken".into())
        .kind(SubletKind::Teaser)
        .interval(60)
        .build(replay(vec![]))
        .unwrap();

    let idx = sublet::add(&mut subtle, teaser).unwrap();
    let mut now = sublet::now() + 3600;

    assert_eq!(subtle.sublets[idx].failures, 1);

    while !subtle.queue.is_empty() {
        sublet::run_due(&mut subtle, now).unwrap();

        now += 60;
    }

    assert_eq!(subtle.sublets[idx].failures, MAX_FAILURES);
    assert_eq!(sublet::next_timeout(&subtle, now), None);
}

#[test]
fn should_reset_failures_after_success() {
    let config = mock::config(&[], &[]);
    let (mut subtle, _) = mock::setup(&config);

    let teaser = SubletBuilder::default()
        .name("flaky".into())
        .kind(SubletKind::Teaser)
        .build(replay(vec![Err(anyhow!("once")), Ok("back".into())]))
        .unwrap();

    let idx = sublet::add(&mut subtle, teaser).unwrap();

    assert_eq!(subtle.sublets[idx].interval, 60);

    sublet::run_due(&mut subtle, sublet::now() + 60).unwrap();

    assert_eq!(subtle.sublets[idx].failures, 0);
    assert_eq!(subtle.sublets[idx].value, SubletValue::Text("back".into()));
}
