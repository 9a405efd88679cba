///
/// @package subtle-tiler
///
/// @file View tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use proptest::prelude::*;
use crate::backend::PropValue;
use crate::ewmh::Hint;
use crate::node::NodeFlags;
use crate::tagging::Tagging;
use crate::tests::mock;
use crate::tree;
use crate::view;
use crate::view::{View, DEFAULT_VIEW};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_create_view(s in "[a-zA-Z]+") {
        let view = View::new(&*s);

        assert!(!view.name.is_empty());
        assert!(view.root.is_none());
    }
}

#[test]
fn should_create_default_view() {
    let config = mock::config(&[], &[]);
    let (subtle, state) = mock::setup(&config);

    assert_eq!(subtle.views.len(), 1);
    assert_eq!(subtle.views[0].name, DEFAULT_VIEW);
    assert_eq!(subtle.current_view, Some(0));
    assert!(subtle.views[0].root.is_some());
    assert_eq!(state.borrow().cardinals(mock::ROOT, Hint::NumberOfDesktops), vec![1]);
    assert_eq!(state.borrow().cardinals(mock::ROOT, Hint::CurrentDesktop), vec![0]);
}

#[test]
fn should_merge_client_into_all_matching_views() {
    let config = mock::config(&[("terms", "xterm"), ("www", "firefox")],
                              &[("work", &[("terms", 0), ("www", 0)]), ("web", &[("www", 0)])]);
    let (mut subtle, state) = mock::setup(&config);

    assert_eq!(subtle.views[0].tags, Tagging::from_index(0) | Tagging::from_index(1) | Tagging::from_index(2));
    assert_eq!(subtle.views[1].tags, Tagging::from_index(2));

    mock::add_window(&state, 500, "firefox");
    mock::add_window(&state, 501, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();
    view::merge_client(&mut subtle, 501).unwrap();

    let nodes = subtle.nodes_of(500);

    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(|id| subtle.tree.node(*id).unwrap().flags.contains(NodeFlags::MULTI)));
    assert_eq!(subtle.nodes_of(501).len(), 1);
    assert_eq!(subtle.windows.lookup(500).and_then(|id| subtle.view_of(id)), Some(0));
    assert_eq!(state.borrow().cardinals(500, Hint::WmDesktop), vec![0]);
    assert_eq!(state.borrow().prop(mock::ROOT, Hint::ClientList), Some(&PropValue::Windows(vec![500, 501])));

    view::jump(&mut subtle, 1).unwrap();

    assert_eq!(subtle.current_view, Some(1));
    assert_eq!(subtle.windows.lookup(500).and_then(|id| subtle.view_of(id)), Some(1));
    assert_eq!(state.borrow().cardinals(500, Hint::WmDesktop), vec![1]);
    assert_eq!(state.borrow().cardinals(mock::ROOT, Hint::CurrentDesktop), vec![1]);
    assert!(subtle.views[0].root.is_some());
}

#[test]
fn should_not_merge_twice() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();
    view::merge_client(&mut subtle, 500).unwrap();

    assert_eq!(subtle.nodes_of(500).len(), 1);
    assert_eq!(subtle.clients.len(), 1);
}

#[test]
fn should_tear_down_empty_view() {
    let config = mock::config(&[], &[("a", &[]), ("b", &[])]);
    let (mut subtle, state) = mock::setup(&config);

    view::jump(&mut subtle, 1).unwrap();

    let root = subtle.views[1].root.unwrap();
    let frame = subtle.tree.node(root).unwrap().frame;

    view::jump(&mut subtle, 0).unwrap();

    assert!(subtle.views[1].root.is_none());
    assert!(!subtle.tree.contains(root));
    assert!(state.borrow().destroyed.contains(&frame));
    assert!(subtle.views[0].root.is_some());
}

#[test]
fn should_show_client_only_on_current_view() {
    let config = mock::config(&[("terms", "xterm")], &[("a", &[]), ("b", &[("terms", 0)])]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();

    let id = subtle.windows.lookup(500).unwrap();

    assert_eq!(subtle.view_of(id), Some(1));
    assert!(subtle.views[1].root.is_some());
    assert!(!state.borrow().is_viewable(500));

    view::jump(&mut subtle, 1).unwrap();

    assert!(state.borrow().is_viewable(500));

    view::jump(&mut subtle, 0).unwrap();

    assert!(!state.borrow().is_viewable(500));
    assert!(subtle.views[1].root.is_some());
}

#[test]
fn should_rematerialize_torn_down_view() {
    let config = mock::config(&[], &[("a", &[]), ("b", &[])]);
    let (mut subtle, state) = mock::setup(&config);

    view::jump(&mut subtle, 1).unwrap();

    let old = subtle.views[1].root.unwrap();

    view::jump(&mut subtle, 0).unwrap();

    assert!(subtle.views[1].root.is_none());

    let idx = subtle.views.iter().position(|view| "b" == view.name).unwrap();

    view::jump(&mut subtle, idx).unwrap();

    let root = subtle.views[idx].root.unwrap();
    let frame = subtle.tree.node(root).unwrap().frame;

    assert!(!subtle.tree.contains(old));
    assert_ne!(old, root);
    assert!(subtle.tree.children(root).is_empty());
    assert!(state.borrow().is_viewable(frame));
    assert_eq!(subtle.current_view, Some(idx));
    assert_eq!(subtle.focus, None);
}

#[test]
fn should_ignore_invalid_jump() {
    let config = mock::config(&[], &[("a", &[]), ("b", &[])]);
    let (mut subtle, _) = mock::setup(&config);

    view::jump(&mut subtle, 5).unwrap();
    view::jump(&mut subtle, 0).unwrap();

    assert_eq!(subtle.current_view, Some(0));
    assert!(subtle.views[1].root.is_none());
}

#[test]
fn should_remerge_orphans_of_killed_view() {
    let config = mock::config(&[("terms", "xterm")], &[("a", &[]), ("b", &[("terms", 0)])]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();

    assert_eq!(subtle.nodes_of(500).first().and_then(|id| subtle.view_of(*id)), Some(1));

    view::kill(&mut subtle, 1).unwrap();

    let nodes = subtle.nodes_of(500);

    assert_eq!(subtle.views.len(), 1);
    assert_eq!(nodes.len(), 1);
    assert_eq!(subtle.view_of(nodes[0]), Some(0));
    assert_eq!(subtle.client_tags(500), Tagging::from_index(1));
    assert_eq!(state.borrow().prop(mock::ROOT, Hint::DesktopNames),
               Some(&PropValue::Strings(vec!["a".to_string()])));
}

#[test]
fn should_keep_first_view() {
    let config = mock::config(&[], &[]);
    let (mut subtle, _) = mock::setup(&config);

    view::kill(&mut subtle, 0).unwrap();

    assert_eq!(subtle.views.len(), 1);
}

#[test]
fn should_create_view_once() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    view::create(&mut subtle, "web").unwrap();
    view::create(&mut subtle, "web").unwrap();

    assert_eq!(subtle.views.len(), 2);
    assert_eq!(subtle.view_buttons.lookup(subtle.views[1].button), Some(1));
    assert_eq!(state.borrow().prop(mock::ROOT, Hint::DesktopNames),
               Some(&PropValue::Strings(vec![DEFAULT_VIEW.to_string(), "web".to_string()])));
}

#[test]
fn should_move_client_with_view_tag() {
    let config = mock::config(&[("www", "firefox")], &[("a", &[]), ("b", &[])]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "firefox");

    view::merge_client(&mut subtle, 500).unwrap();

    assert_eq!(subtle.nodes_of(500).first().and_then(|id| subtle.view_of(*id)), Some(0));

    view::tag(&mut subtle, 1, 1).unwrap();

    assert_eq!(subtle.nodes_of(500).first().and_then(|id| subtle.view_of(*id)), Some(1));
    assert_eq!(state.borrow().cardinals(mock::ROOT, Hint::ViewTags), vec![1, 2]);

    view::untag(&mut subtle, 1, 1).unwrap();

    assert_eq!(subtle.nodes_of(500).first().and_then(|id| subtle.view_of(*id)), Some(0));
    assert_eq!(state.borrow().cardinals(mock::ROOT, Hint::ViewTags), vec![1, 0]);
}

#[test]
fn should_retag_client() {
    let config = mock::config(&[("terms", "xterm"), ("www", "firefox")],
                              &[("work", &[("terms", 0)]), ("web", &[("www", 0)])]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();
    view::tag_client(&mut subtle, 500, 2).unwrap();

    assert_eq!(subtle.nodes_of(500).len(), 2);
    assert_eq!(state.borrow().cardinals(500, Hint::ClientTags), vec![0b110]);

    view::untag_client(&mut subtle, 500, 1).unwrap();

    let nodes = subtle.nodes_of(500);

    assert_eq!(nodes.len(), 1);
    assert_eq!(subtle.view_of(nodes[0]), Some(1));
    assert!(!subtle.tree.node(nodes[0]).unwrap().flags.contains(NodeFlags::MULTI));

    view::untag_client(&mut subtle, 500, 2).unwrap();

    assert_eq!(subtle.client_tags(500), Tagging::from_index(0));
    assert_eq!(subtle.nodes_of(500).first().and_then(|id| subtle.view_of(*id)), Some(0));
    assert_eq!(tree::clients_of(&subtle, subtle.current_root().unwrap()).len(), 1);
}
