///
/// @package subtle-tiler
///
/// @file Tagging tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use proptest::prelude::*;
use crate::tagging::Tagging;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_add_and_match_tag(id1 in 0usize..32, id2 in 0usize..32) {
        let mut tagging = Tagging::empty();

        let tag1 = Tagging::from_index(id1);
        let tag2 = Tagging::from_index(id2);

        tagging.insert(tag1);

        assert!(tagging.contains(tag1));

        if id1 != id2 {
            assert!(!tagging.contains(tag2));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_shift_higher_bits_on_remove(idx in 0usize..31) {
        let tagging = Tagging::from_index(idx) | Tagging::from_index(idx + 1);

        assert_eq!(tagging.remove_index(idx), Tagging::from_index(idx));
    }
}

#[test]
fn should_list_indices() {
    let tagging = Tagging::from_index(0) | Tagging::from_index(3) | Tagging::from_index(31);

    assert_eq!(tagging.indices().collect::<Vec<_>>(), vec![0, 3, 31]);
    assert_eq!(tagging.remove_index(1).indices().collect::<Vec<_>>(), vec![0, 2, 30]);
    assert!(Tagging::from_index(32).is_empty());
}
