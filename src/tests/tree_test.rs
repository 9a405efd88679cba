///
/// @package subtle-tiler
///
/// @file Tree tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use proptest::prelude::*;
use crate::backend::PropValue;
use crate::ewmh::{Hint, NetState};
use crate::node::{NodeFlags, Orientation};
use crate::rect::Rect;
use crate::tests::mock;
use crate::tree;
use crate::tree::{LayoutSlot, Release};
use crate::view;

#[test]
fn should_split_evenly() {
    let layout = tree::layout(Orientation::Horizontal, 300, 100, 16, &[LayoutSlot::default(); 2]);

    assert_eq!(layout.rects, vec![Rect::new(0, 0, 150, 100), Rect::new(150, 0, 150, 100)]);
    assert_eq!(layout.mean, 150);
}

#[test]
fn should_give_remainder_to_last_child() {
    let layout = tree::layout(Orientation::Horizontal, 301, 100, 16, &[LayoutSlot::default(); 2]);

    assert_eq!(layout.rects[0].width, 150);
    assert_eq!(layout.rects[1].width, 151);
}

#[test]
fn should_keep_weighted_share() {
    let slots = [LayoutSlot { shaded: false, weight: Some(25) }, LayoutSlot::default()];
    let layout = tree::layout(Orientation::Horizontal, 400, 100, 16, &slots);

    assert_eq!(layout.rects[0].width, 100);
    assert_eq!(layout.rects[1], Rect::new(100, 0, 300, 100));
}

#[test]
fn should_reserve_title_for_shaded_child() {
    let slots = [LayoutSlot::default(), LayoutSlot { shaded: true, weight: None }, LayoutSlot::default()];
    let layout = tree::layout(Orientation::Vertical, 100, 216, 16, &slots);

    assert_eq!(layout.rects, vec![
        Rect::new(0, 0, 100, 100),
        Rect::new(0, 100, 100, 16),
        Rect::new(0, 116, 100, 100),
    ]);
}

#[test]
fn should_stack_titles_when_all_shaded() {
    let slots = [LayoutSlot { shaded: true, weight: None }; 3];

    let layout = tree::layout(Orientation::Vertical, 100, 216, 16, &slots);

    assert_eq!(layout.rects, vec![
        Rect::new(0, 0, 100, 16),
        Rect::new(0, 16, 100, 16),
        Rect::new(0, 32, 100, 16),
    ]);
    assert_eq!(layout.mean, 168);

    let layout = tree::layout(Orientation::Horizontal, 300, 100, 16, &slots);

    assert_eq!(layout.rects, vec![
        Rect::new(0, 0, 300, 16),
        Rect::new(0, 16, 300, 16),
        Rect::new(0, 32, 300, 16),
    ]);
    assert_eq!(layout.mean, 300);
}

#[test]
fn should_lay_out_nothing_without_children() {
    let layout = tree::layout(Orientation::Vertical, 100, 216, 16, &[]);

    assert!(layout.rects.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_not_stretch_shaded_children(n in 1usize..10, height in 0u16..400) {
        let slots = vec![LayoutSlot { shaded: true, weight: None }; n];

        for orientation in [Orientation::Vertical, Orientation::Horizontal] {
            let layout = tree::layout(orientation, 200, height, 16, &slots);

            assert_eq!(layout.rects.len(), n);

            for (idx, rect) in layout.rects.iter().enumerate() {
                assert_eq!(rect.height, 16);
                assert_eq!(rect.y as usize, idx * 16);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_cover_whole_axis(n in 1usize..10, width in 10u16..3000) {
        let layout = tree::layout(Orientation::Horizontal, width, 100, 16, &vec![LayoutSlot::default(); n]);
        let sum: u32 = layout.rects.iter().map(|rect| u32::from(rect.width)).sum();

        assert_eq!(sum, u32::from(width));
        assert_eq!(layout.rects.last().map(|rect| rect.x as u32 + rect.width as u32), Some(u32::from(width)));
    }
}

#[test]
fn should_stack_clients_in_rule_tile() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");
    mock::add_window(&state, 501, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();
    view::merge_client(&mut subtle, 501).unwrap();

    let root = subtle.current_root().unwrap();
    let clients = tree::clients_of(&subtle, root);

    assert_eq!(subtle.tree.node(root).unwrap().geom, Rect::new(0, 16, mock::WIDTH, mock::HEIGHT - 16));
    assert_eq!(clients.len(), 2);
    assert_eq!(subtle.tree.node(clients[0]).unwrap().geom, Rect::new(0, 0, 800, 300));
    assert_eq!(subtle.tree.node(clients[1]).unwrap().geom, Rect::new(0, 300, 800, 300));
    assert_eq!(subtle.windows.lookup(501), Some(clients[1]));
    assert!(state.borrow().is_mapped(500));
    assert_eq!(state.borrow().parents.get(&501), Some(&subtle.tree.node(clients[1]).unwrap().frame));
}

#[test]
fn should_not_leave_dangling_windows() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();

    let root = subtle.current_root().unwrap();
    let id = subtle.windows.lookup(500).unwrap();

    tree::delete(&mut subtle, id, Release::Keep).unwrap();

    assert!(subtle.windows.values().all(|value| subtle.tree.contains(value)));
    assert_eq!(subtle.windows.lookup(500), None);
    assert!(subtle.clients.is_empty());
    assert!(subtle.tree.children(root).is_empty());
    assert_eq!(state.borrow().parents.get(&500), Some(&mock::ROOT));
    assert_eq!(state.borrow().prop(mock::ROOT, Hint::ClientList), Some(&PropValue::Windows(vec![])));
}

#[test]
fn should_close_politely() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();

    let id = subtle.windows.lookup(500).unwrap();

    tree::close(&mut subtle, id).unwrap();

    assert!(subtle.tree.contains(id));
    assert!(state.borrow().killed.is_empty());
    assert_eq!(state.borrow().protocols.last(), Some(&(500, crate::backend::Protocol::DeleteWindow)));
}

#[test]
fn should_kill_clients_without_protocol() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");
    state.borrow_mut().infos.get_mut(&500).unwrap().delete_window = false;

    view::merge_client(&mut subtle, 500).unwrap();

    let id = subtle.windows.lookup(500).unwrap();

    tree::close(&mut subtle, id).unwrap();

    assert!(!subtle.tree.contains(id));
    assert_eq!(state.borrow().killed, vec![500]);
    assert!(subtle.clients.is_empty());
}

#[test]
fn should_toggle_modes() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");
    mock::add_window(&state, 501, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();
    view::merge_client(&mut subtle, 501).unwrap();

    let id = subtle.windows.lookup(500).unwrap();
    let other = subtle.windows.lookup(501).unwrap();

    tree::toggle_full(&mut subtle, id).unwrap();

    assert!(subtle.tree.node(id).unwrap().flags.contains(NodeFlags::FULL));
    assert_eq!(subtle.tree.node(other).unwrap().geom.height, 600);
    assert_eq!(state.borrow().prop(500, Hint::NetWmState), Some(&PropValue::States(vec![NetState::Fullscreen])));

    tree::toggle_full(&mut subtle, id).unwrap();
    tree::toggle_float(&mut subtle, id).unwrap();

    assert!(subtle.tree.node(id).unwrap().flags.contains(NodeFlags::FLOAT));
    assert_eq!(subtle.tree.node(other).unwrap().geom.height, 600);

    tree::toggle_float(&mut subtle, id).unwrap();

    assert_eq!(subtle.tree.node(other).unwrap().geom.height, 300);
}

#[test]
fn should_collapse_shaded_client() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");
    mock::add_window(&state, 501, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();
    view::merge_client(&mut subtle, 501).unwrap();

    let id = subtle.windows.lookup(500).unwrap();
    let other = subtle.windows.lookup(501).unwrap();

    tree::shade(&mut subtle, id).unwrap();

    assert_eq!(subtle.tree.node(id).unwrap().geom.height, 16);
    assert_eq!(subtle.tree.node(other).unwrap().geom, Rect::new(0, 16, 800, 584));
    assert!(!state.borrow().is_mapped(500));

    tree::shade(&mut subtle, id).unwrap();

    assert!(state.borrow().is_mapped(500));
}

#[test]
fn should_pile_tile() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    for win in [500, 501, 502] {
        mock::add_window(&state, win, "xterm");
        view::merge_client(&mut subtle, win).unwrap();
    }

    let ids: Vec<_> = [500, 501, 502].iter().map(|win| subtle.windows.lookup(*win).unwrap()).collect();

    tree::toggle_pile(&mut subtle, ids[1]).unwrap();

    assert!(subtle.tree.node(ids[0]).unwrap().flags.contains(NodeFlags::SHADE));
    assert!(!subtle.tree.node(ids[1]).unwrap().flags.contains(NodeFlags::SHADE));

    tree::set_top(&mut subtle, ids[2]).unwrap();

    assert!(subtle.tree.node(ids[1]).unwrap().flags.contains(NodeFlags::SHADE));
    assert_eq!(subtle.tree.node(ids[2]).unwrap().geom.height, 600 - 2 * 16);

    tree::toggle_pile(&mut subtle, ids[2]).unwrap();

    assert!(ids.iter().all(|id| !subtle.tree.node(*id).unwrap().flags.contains(NodeFlags::SHADE)));
}

#[test]
fn should_keep_user_tiles() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");

    view::merge_client(&mut subtle, 500).unwrap();

    let id = subtle.windows.lookup(500).unwrap();
    let parent = subtle.tree.node(id).unwrap().parent.unwrap();
    let tile = tree::new_tile(&mut subtle, id).unwrap();

    assert_eq!(subtle.tree.node(tile).unwrap().parent, Some(parent));
    assert_eq!(subtle.tree.node(tile).unwrap().tile().unwrap().orientation, Orientation::Horizontal);
    assert_eq!(subtle.tree.node(id).unwrap().geom.height, 300);

    let root = subtle.current_root().unwrap();

    tree::configure(&mut subtle, root).unwrap();

    assert!(subtle.tree.contains(tile));
}

#[test]
fn should_cycle_focus() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    for win in [500, 501] {
        mock::add_window(&state, win, "xterm");
        view::merge_client(&mut subtle, win).unwrap();
    }

    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();

    tree::focus(&mut subtle, first).unwrap();
    tree::focus_dir(&mut subtle, tree::Direction::Next).unwrap();

    assert_eq!(subtle.focus, Some(second));
    assert_eq!(state.borrow().focused, Some(501));

    tree::focus_dir(&mut subtle, tree::Direction::Next).unwrap();

    assert_eq!(subtle.focus, Some(first));

    tree::focus_dir(&mut subtle, tree::Direction::Below).unwrap();

    assert_eq!(subtle.focus, Some(second));
    assert_eq!(state.borrow().prop(mock::ROOT, Hint::ActiveWindow), Some(&PropValue::Windows(vec![501])));
}

#[test]
fn should_keep_child_unlinked_on_failed_link() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    for win in [500, 501] {
        mock::add_window(&state, win, "xterm");
        view::merge_client(&mut subtle, win).unwrap();
    }

    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();
    let parent = tree::detach(&mut subtle, second).unwrap().unwrap();

    assert!(tree::link(&mut subtle, first, None, second).is_err());
    assert_eq!(subtle.tree.node(second).unwrap().parent, None);
    assert_eq!(subtle.tree.children(parent).len(), 1);

    tree::attach(&mut subtle, parent, second).unwrap();

    assert_eq!(subtle.tree.node(second).unwrap().parent, Some(parent));
    assert_eq!(subtle.tree.children(parent).len(), 2);
}

#[test]
fn should_paint_borders_by_focus() {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    subtle.colors.border = 0x0011_2233;

    for win in [500, 501] {
        mock::add_window(&state, win, "xterm");
        view::merge_client(&mut subtle, win).unwrap();
    }

    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();

    tree::focus(&mut subtle, first).unwrap();
    tree::render(&mut subtle, second).unwrap();

    let (focused, other) = (subtle.tree.node(first).unwrap().left, subtle.tree.node(second).unwrap().left);

    assert_eq!(state.borrow().backgrounds.get(&focused), Some(&subtle.colors.focus));
    assert_eq!(state.borrow().backgrounds.get(&other), Some(&0x0011_2233));
}
