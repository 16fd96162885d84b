//! A product of references to [`AtomicPermutation`]s, evaluated lazily
//! without ever materializing the intermediate composition.

use std::fmt;

use crate::atomic::{AtomicAllocator, AtomicPermutation, AtomicRef, Point};
use crate::PermutationLike;

/// `w = f_1 . f_2 . ... . f_n`, where each factor is an atomic permutation
/// or its inverse. Immutable composition history — growing a word only ever
/// appends factors, never rewrites one, so any number of words can share
/// the same underlying atomics.
#[derive(Clone, Default)]
pub struct PermutationWord {
    factors: Vec<(AtomicRef, bool)>,
}

impl PermutationWord {
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_atom(r: AtomicRef) -> Self {
        PermutationWord {
            factors: vec![(r, false)],
        }
    }

    /// Fold left: `a -> f_1(a) -> f_2(...) -> ...`.
    #[must_use]
    pub fn get_image(&self, alloc: &AtomicAllocator, a: Point) -> Point {
        self.factors.iter().fold(a, |p, &(r, inverted)| {
            let atom = alloc.get(r);
            if inverted {
                atom.get_inverse_image(p)
            } else {
                atom.get_image(p)
            }
        })
    }

    /// Fold right with each factor's direction flipped. This must reverse
    /// factor order, not merely invert each factor in place, or inverse
    /// evaluation silently disagrees with `get_image`.
    #[must_use]
    pub fn get_inverse_image(&self, alloc: &AtomicAllocator, a: Point) -> Point {
        self.factors.iter().rev().fold(a, |p, &(r, inverted)| {
            let atom = alloc.get(r);
            if inverted {
                atom.get_image(p)
            } else {
                atom.get_inverse_image(p)
            }
        })
    }

    /// Append `other`'s factors in order.
    pub fn compose(&mut self, other: &PermutationWord) {
        self.factors.extend_from_slice(&other.factors);
    }

    /// Append `other`'s factors in reverse order with flipped directions.
    pub fn compose_inverse(&mut self, other: &PermutationWord) {
        self.factors
            .extend(other.factors.iter().rev().map(|&(r, inverted)| (r, !inverted)));
    }

    pub fn clear(&mut self) {
        self.factors.clear();
    }

    /// Materialize the product into a fresh [`AtomicPermutation`].
    #[must_use]
    pub fn to_atomic(&self, alloc: &AtomicAllocator) -> AtomicPermutation {
        let mut result = AtomicPermutation::identity();
        for &(r, inverted) in &self.factors {
            let atom = alloc.get(r);
            if inverted {
                result.compose_inverse(atom);
            } else {
                result.compose(atom);
            }
        }
        result
    }

    #[must_use]
    pub fn is_identity(&self, alloc: &AtomicAllocator) -> bool {
        self.to_atomic(alloc).is_identity()
    }

    #[must_use]
    pub fn to_evaluated_string(&self, alloc: &AtomicAllocator) -> String {
        self.to_atomic(alloc).to_string()
    }

    /// Debug view listing the raw factors, not the evaluated permutation.
    #[must_use]
    pub fn to_debug_string(&self) -> String {
        self.factors
            .iter()
            .map(|(r, inverted)| format!("{}{r:?}", if *inverted { "~" } else { "" }))
            .collect::<Vec<_>>()
            .join(" . ")
    }
}

impl PermutationLike for PermutationWord {
    fn get_image(&self, alloc: &AtomicAllocator, a: Point) -> Point {
        PermutationWord::get_image(self, alloc, a)
    }

    fn get_inverse_image(&self, alloc: &AtomicAllocator, a: Point) -> Point {
        PermutationWord::get_inverse_image(self, alloc, a)
    }
}

impl fmt::Debug for PermutationWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_debug_string())
    }
}
