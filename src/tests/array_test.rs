///
/// @package subtle-tiler
///
/// @file Array tests
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use proptest::prelude::*;
use crate::array::Array;

#[test]
fn should_keep_insertion_order() {
    let mut array = Array::new();

    array.push(1).unwrap();
    array.push(3).unwrap();
    array.insert(1, 2).unwrap();

    assert_eq!(&*array, &[1, 2, 3]);
    assert_eq!(array.find(&3), Some(2));
    assert_eq!(array.pop(&2), Some(2));
    assert_eq!(array.pop(&2), None);
    assert_eq!(&*array, &[1, 3]);
}

#[test]
fn should_splice_and_swap() {
    let mut array = Array::new();

    array.splice(0, [1, 4]).unwrap();
    array.splice(1, [2, 3]).unwrap();
    array.swap(0, 3);

    assert_eq!(&*array, &[4, 2, 3, 1]);
    assert_eq!(array.remove(9), None);
}

#[test]
fn should_destroy_all() {
    let mut array = Array::new();
    let mut destroyed = Vec::new();

    array.splice(0, ["a", "b"]).unwrap();
    array.destroy_all(|elem| destroyed.push(elem));

    assert!(array.is_empty());
    assert_eq!(destroyed, vec!["a", "b"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]
    #[test]
    fn should_sort_elements(mut values in prop::collection::vec(0u32..1000, 0..20)) {
        let mut array = Array::new();

        array.splice(0, values.clone()).unwrap();
        array.sort_by(|a, b| a.cmp(b));
        values.sort();

        assert_eq!(&*array, values.as_slice());
    }
}
