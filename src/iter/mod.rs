//!
//! This module defines the infrastructure for iteration over archive blocks
//!

mod iter_block;
mod par_iter;
mod util;

pub use iter_block::BlockIter;
pub use par_iter::ParIter;
pub use util::Cancellation;
