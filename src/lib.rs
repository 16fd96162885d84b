#![warn(clippy::pedantic)]
#![allow(
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::missing_panics_doc
)]

//! Schreier-Sims over sparse permutations: build a base and strong
//! generating set for a permutation group given as a list of generators in
//! cycle notation, then answer membership, order, and stripping queries
//! against the resulting stabilizer chain.
//!
//! - [`atomic`] — [`AtomicPermutation`](atomic::AtomicPermutation), a single
//!   permutation as a sparse point-to-point mapping, plus the
//!   [`AtomicAllocator`](atomic::AtomicAllocator) arena that owns them.
//! - [`word`] — [`PermutationWord`](word::PermutationWord), a lazily
//!   evaluated product of atomic references.
//! - [`tree`] — [`SchreierTree`](tree::SchreierTree), one level of the
//!   stabilizer chain.
//! - [`driver`] — [`FundamentalSchreierTrees`](driver::FundamentalSchreierTrees),
//!   the algorithm itself.
//! - [`parse`] — cycle-notation parsing shared by the allocator and tests.

mod atomic;
mod driver;
mod parse;
mod tree;
mod word;

pub use atomic::{AtomicAllocator, AtomicPermutation, AtomicRef, Point};
pub use driver::{DuplicateBasePoint, FundamentalSchreierTrees, DEFAULT_ITERATION_CAP};
pub use parse::ParseError;
pub use tree::SchreierTree;
pub use word::PermutationWord;

/// Shared capability of [`AtomicPermutation`] and [`PermutationWord`]: both
/// answer image queries, only one of them owns the points it moves directly.
/// [`AtomicPermutation`] ignores the allocator argument; [`PermutationWord`]
/// needs it to dereference its factors.
pub trait PermutationLike {
    fn get_image(&self, alloc: &AtomicAllocator, a: Point) -> Point;
    fn get_inverse_image(&self, alloc: &AtomicAllocator, a: Point) -> Point;
}
