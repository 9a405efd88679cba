///
/// @package subtle-tiler
///
/// @file Drag tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use proptest::prelude::*;
use crate::backend::DragEvent;
use crate::drag;
use crate::drag::{DragMode, DropZone};
use crate::node::{NodeFlags, Orientation, TileOrigin};
use crate::rect::Rect;
use crate::tests::mock;
use crate::tree;
use crate::tree::Release;
use crate::view;

#[test]
fn should_resolve_drop_zones() {
    let zone = |x, y| DropZone::from_pointer(x, y, 100, 100, None);

    assert_eq!(zone(50, 50), Some(DropZone::Swap));
    assert_eq!(zone(50, 20), Some(DropZone::Top));
    assert_eq!(zone(50, 80), Some(DropZone::Bottom));
    assert_eq!(zone(20, 50), Some(DropZone::Left));
    assert_eq!(zone(80, 50), Some(DropZone::Right));
    assert_eq!(zone(50, 5), Some(DropZone::Above));
    assert_eq!(zone(50, 95), Some(DropZone::Below));
    assert_eq!(zone(5, 50), Some(DropZone::Before));
    assert_eq!(zone(95, 50), Some(DropZone::After));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_keep_zone_on_borders(size in 20u16..2000) {
        let half = (size / 2) as i16;

        assert_eq!(DropZone::from_pointer(half, half, size, size, Some(DropZone::Top)), Some(DropZone::Swap));
        assert_eq!(DropZone::from_pointer(0, 0, 0, 0, Some(DropZone::Left)), Some(DropZone::Left));
    }
}

#[test]
fn should_mask_zone_area() {
    let target = Rect::new(10, 10, 200, 100);

    assert_eq!(DropZone::Top.mask(target), Rect::new(10, 10, 200, 50));
    assert_eq!(DropZone::Right.mask(target), Rect::new(110, 10, 100, 100));
    assert_eq!(DropZone::Below.mask(target), Rect::new(10, 100, 200, 10));
    assert_eq!(DropZone::Swap.mask(target), target);
}

fn two_clients() -> (crate::subtle::Subtle, std::rc::Rc<std::cell::RefCell<mock::MockState>>) {
    let config = mock::config(&[], &[]);
    let (mut subtle, state) = mock::setup(&config);

    for win in [500, 501] {
        mock::add_window(&state, win, "xterm");
        view::merge_client(&mut subtle, win).unwrap();
    }

    (subtle, state)
}

#[test]
fn should_swap_on_drop() {
    let (mut subtle, state) = two_clients();
    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();
    let frame = subtle.tree.node(second).unwrap().frame;

    state.borrow_mut().drag_events.extend([
        DragEvent::Enter { win: frame },
        DragEvent::Release { x_root: 400, y_root: 466 },
    ]);
    state.borrow_mut().pointer_path = vec![frame];

    drag::drag(&mut subtle, first, DragMode::Swap).unwrap();

    let parent = subtle.tree.node(first).unwrap().parent.unwrap();

    assert_eq!(subtle.tree.children(parent), vec![second, first]);
    assert_eq!(subtle.tree.node(first).unwrap().geom.y, 300);
    assert_eq!(state.borrow().server_grabs, 0);
    assert!(!state.borrow().pointer_grabbed);
}

#[test]
fn should_take_target_from_release_position() {
    let (mut subtle, state) = two_clients();
    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();
    let parent = subtle.tree.node(first).unwrap().parent.unwrap();
    let path: Vec<_> = [parent, second].iter()
        .map(|id| subtle.tree.node(*id).unwrap().frame)
        .chain([501])
        .collect();

    state.borrow_mut().drag_events.push_back(DragEvent::Release { x_root: 400, y_root: 466 });
    state.borrow_mut().pointer_path = path;

    drag::drag(&mut subtle, first, DragMode::Swap).unwrap();

    assert_eq!(subtle.tree.children(parent), vec![second, first]);
}

#[test]
fn should_ignore_release_over_unmanaged_window() {
    let (mut subtle, state) = two_clients();
    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();
    let parent = subtle.tree.node(first).unwrap().parent.unwrap();
    let frame = subtle.tree.node(second).unwrap().frame;

    state.borrow_mut().drag_events.extend([
        DragEvent::Enter { win: frame },
        DragEvent::Release { x_root: 400, y_root: 466 },
    ]);
    state.borrow_mut().pointer_path = vec![4242];

    drag::drag(&mut subtle, first, DragMode::Swap).unwrap();

    assert_eq!(subtle.tree.children(parent), vec![first, second]);

    let own = subtle.tree.node(first).unwrap().frame;

    state.borrow_mut().drag_events.push_back(DragEvent::Release { x_root: 400, y_root: 166 });
    state.borrow_mut().pointer_path = vec![own, 500];

    drag::drag(&mut subtle, first, DragMode::Swap).unwrap();

    assert_eq!(subtle.tree.children(parent), vec![first, second]);
}

#[test]
fn should_resize_with_bottom_border() {
    let (mut subtle, state) = two_clients();
    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();

    state.borrow_mut().drag_events.extend([
        DragEvent::Motion { x_root: 0, y_root: -150 },
        DragEvent::Release { x_root: 0, y_root: -150 },
    ]);

    drag::drag(&mut subtle, first, DragMode::Bottom).unwrap();

    let node = subtle.tree.node(first).unwrap();

    assert!(node.flags.contains(NodeFlags::RESIZE));
    assert_eq!(node.size, 25);
    assert_eq!(node.geom.height, 150);
    assert_eq!(subtle.tree.node(second).unwrap().geom.height, 450);
    assert!(!state.borrow().masks.is_empty());
}

#[test]
fn should_cap_weight() {
    let (mut subtle, _) = two_clients();
    let first = subtle.windows.lookup(500).unwrap();

    drag::adjust_weight(&mut subtle, first, Rect::new(0, 0, 800, 590), Orientation::Vertical).unwrap();

    assert_eq!(subtle.tree.node(first).unwrap().size, drag::MAX_WEIGHT as u8);
}

#[test]
fn should_split_target_and_collapse_again() {
    let (mut subtle, _) = two_clients();
    let first = subtle.windows.lookup(500).unwrap();
    let second = subtle.windows.lookup(501).unwrap();
    let rule_tile = subtle.tree.node(second).unwrap().parent.unwrap();

    drag::drop_at(&mut subtle, first, second, DropZone::Left).unwrap();

    let split = subtle.tree.node(first).unwrap().parent.unwrap();
    let tile = subtle.tree.node(split).unwrap().tile().unwrap();

    assert_eq!(tile.origin, TileOrigin::Split);
    assert_eq!(tile.orientation, Orientation::Horizontal);
    assert_eq!(subtle.tree.children(split), vec![first, second]);
    assert_eq!(subtle.tree.children(rule_tile), vec![split]);
    assert_eq!(subtle.tree.node(first).unwrap().geom.width, 400);

    tree::delete(&mut subtle, first, Release::Keep).unwrap();

    assert!(!subtle.tree.contains(split));
    assert_eq!(subtle.tree.node(second).unwrap().parent, Some(rule_tile));
}

#[test]
fn should_not_drop_into_own_subtree() {
    let (mut subtle, _) = two_clients();
    let first = subtle.windows.lookup(500).unwrap();
    let rule_tile = subtle.tree.node(first).unwrap().parent.unwrap();

    drag::drop_at(&mut subtle, rule_tile, first, DropZone::Swap).unwrap();
    drag::drop_at(&mut subtle, first, first, DropZone::Swap).unwrap();

    assert_eq!(subtle.tree.node(first).unwrap().parent, Some(rule_tile));
}
