///
/// @package subtle-tiler
///
/// @file Test modules
/// @copyright 2025-present Christoph Kappel <christoph@unexist.dev>
/// @version $Id$
///
/// This program can be distributed under the terms of the GNU GPLv3.
/// See the file LICENSE for details.
///

mod mock;

mod array_test;
mod display_test;
mod drag_test;
mod sublet_test;
mod tag_test;
mod tagging;
mod tree_test;
mod view_test;
