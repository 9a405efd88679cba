///
/// @package subtle-tiler
///
/// @file Display tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use crate::display;
use crate::tests::mock;

#[test]
fn should_adopt_existing_and_release_on_finish() {
    let config = mock::config(&[("www", "firefox")], &[("a", &[("www", 0)]), ("b", &[("www", 0)])]);
    let (mut subtle, state) = mock::setup(&config);

    mock::add_window(&state, 500, "xterm");
    mock::add_window(&state, 501, "firefox");

    state.borrow_mut().existing = vec![500, 501];

    display::scan(&mut subtle).unwrap();

    assert_eq!(subtle.clients.to_vec(), vec![500, 501]);
    assert_eq!(subtle.nodes_of(501).len(), 2);

    let bar = subtle.bar_win;
    let buttons: Vec<_> = subtle.views.iter().map(|view| view.button).collect();

    display::finish(&mut subtle).unwrap();

    let state = state.borrow();

    assert!(subtle.clients.is_empty());
    assert_eq!(subtle.tree.len(), 0);
    assert_eq!(subtle.windows.len(), 0);
    assert_eq!(state.parents.get(&500), Some(&mock::ROOT));
    assert_eq!(state.parents.get(&501), Some(&mock::ROOT));
    assert!(state.destroyed.contains(&bar));
    assert!(subtle.views.is_empty());
    assert_eq!(subtle.view_buttons.len(), 0);
    assert!(buttons.iter().all(|button| state.destroyed.contains(button)));
    assert!(state.killed.is_empty());
}
