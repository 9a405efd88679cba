///
/// @package subtle-tiler
///
/// @file Tag tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use proptest::prelude::*;
use crate::backend::PropValue;
use crate::ewmh::Hint;
use crate::tag;
use crate::tag::{Tag, TagBuilder, DEFAULT_TAG};
use crate::tagging::{Tagging, MAX_TAGS};
use crate::tests::mock;
use crate::view;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_create_tag(s in "[a-zA-Z]*") {
        let mut builder = TagBuilder::default();

        builder.name(s);

        let _ = builder.build().unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_never_return_empty_tagging(klass in "[a-z]{0,12}") {
        let config = mock::config(&[("terms", "xterm|urxvt")], &[]);
        let (subtle, _) = mock::setup(&config);

        assert!(!tag::match_tags(&subtle.tags, &klass).is_empty());
    }
}

#[test]
fn should_match_case_insensitive() {
    let config = mock::config(&[("terms", "xterm"), ("www", "firefox|chromium")], &[]);
    let (subtle, _) = mock::setup(&config);

    assert_eq!(subtle.tags[0].name, DEFAULT_TAG);
    assert_eq!(tag::match_tags(&subtle.tags, "XTerm"), Tagging::from_index(1));
    assert_eq!(tag::match_tags(&subtle.tags, "Chromium"), Tagging::from_index(2));
    assert_eq!(tag::match_tags(&subtle.tags, "gimp"), Tagging::from_index(0));
    assert_eq!(tag::names(&subtle.tags, Tagging::from_index(2)), vec!["www".to_string()]);
}

#[test]
fn should_match_own_name() {
    let tag = Tag::new("a.b").unwrap();

    assert!(tag.matches("A.B"));
    assert!(!tag.matches("axb"));
}

#[test]
fn should_skip_duplicates_and_stop_at_limit() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    tag::create(&mut subtle, "www").unwrap();
    tag::create(&mut subtle, "www").unwrap();

    assert_eq!(subtle.tags.len(), 2);
    assert_eq!(state.borrow().prop(mock::ROOT, Hint::TagList),
               Some(&PropValue::Strings(vec![DEFAULT_TAG.to_string(), "www".to_string()])));

    for idx in subtle.tags.len()..MAX_TAGS {
        tag::create(&mut subtle, &format!("tag{}", idx)).unwrap();
    }

    assert!(tag::create(&mut subtle, "overflow").is_err());
    assert_eq!(subtle.tags.len(), MAX_TAGS);
}

#[test]
fn should_compact_bitmasks_on_kill() {
    let config = mock::config(&[("terms", "xterm"), ("www", "firefox")],
                              &[("work", &[("terms", 0), ("www", 0)])]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "firefox");

    view::merge_client(&mut subtle, 500).unwrap();

    assert_eq!(subtle.client_tags(500), Tagging::from_index(2));

    tag::kill(&mut subtle, 1).unwrap();

    assert_eq!(subtle.tags.len(), 2);
    assert_eq!(subtle.client_tags(500), Tagging::from_index(1));
    assert_eq!(subtle.views[0].tags, Tagging::from_index(0) | Tagging::from_index(1));
    assert_eq!(state.borrow().cardinals(500, Hint::ClientTags), vec![2]);
}

#[test]
fn should_keep_default_tag() {
    let config = mock::config(&[], &[]);
    let (mut subtle, _) = mock::setup(&config);

    tag::kill(&mut subtle, 0).unwrap();
    tag::kill(&mut subtle, 7).unwrap();

    assert_eq!(subtle.tags.len(), 1);
}
