///
/// @package subtle-tiler
///
/// @file Taggings functions
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

use bitflags::bitflags;

/// Max. number of tags a bitmask can carry
pub(crate) const MAX_TAGS: usize = 32;

bitflags! {
    /// Tag bitmask shared by clients and views; bit i is tag i
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
    pub(crate) struct Tagging: u32 {}
}

impl Tagging {
    /// Bit of the tag at `idx`
    pub(crate) fn from_index(idx: usize) -> Self {
        if idx < MAX_TAGS {
            Self::from_bits_retain(1 << idx)
        } else {
            Self::empty()
        }
    }

    /// Indices of all set bits
    pub(crate) fn indices(self) -> impl Iterator<Item = usize> {
        (0..MAX_TAGS).filter(move |idx| 0 != self.bits() & (1 << idx))
    }

    /// Drop bit `idx` and move all higher bits one down
    pub(crate) fn remove_index(self, idx: usize) -> Self {
        if idx >= MAX_TAGS {
            return self;
        }

        let bits = self.bits();
        let low = bits & ((1u32 << idx) - 1);
        let high = bits.checked_shr(idx as u32 + 1).unwrap_or(0) << idx;

        Self::from_bits_retain(low | high)
    }
}
