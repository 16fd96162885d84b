//! A single permutation as a sparse mapping from moved points to images,
//! with its inverse kept in lockstep.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::parse::{self, ParseError};
use crate::PermutationLike;

/// An element of the set being permuted. The identity convention is that any
/// point not explicitly mapped maps to itself.
pub type Point = usize;

/// A `Copy` handle into an [`AtomicAllocator`]'s arena, standing in for the
/// borrowed `&AtomicPermutation` references the source design describes.
/// See `SPEC_FULL.md` §9 for why an index replaces a borrow here.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomicRef(usize);

impl fmt::Debug for AtomicRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// Process-scoped arena of [`AtomicPermutation`]s. Handed-out [`AtomicRef`]s
/// are valid until the next [`AtomicAllocator::reset`]; nothing enforces
/// that statically, the same discipline-by-ordering contract the rest of
/// this system relies on for its shared allocator.
#[derive(Default)]
pub struct AtomicAllocator {
    atoms: Vec<AtomicPermutation>,
}

impl AtomicAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identity permutation and return its handle.
    pub fn alloc(&mut self) -> AtomicRef {
        self.atoms.push(AtomicPermutation::identity());
        AtomicRef(self.atoms.len() - 1)
    }

    /// Parse `s` in cycle notation and allocate the result.
    pub fn alloc_from_str(&mut self, s: &str) -> Result<AtomicRef, ParseError> {
        let perm = parse::parse_atomic(s)?;
        self.atoms.push(perm);
        Ok(AtomicRef(self.atoms.len() - 1))
    }

    #[must_use]
    pub fn get(&self, r: AtomicRef) -> &AtomicPermutation {
        &self.atoms[r.0]
    }

    pub fn get_mut(&mut self, r: AtomicRef) -> &mut AtomicPermutation {
        &mut self.atoms[r.0]
    }

    /// Invalidate every handle previously returned. Callers must have
    /// dropped every [`crate::PermutationWord`] and
    /// [`crate::SchreierTree`] that could still dereference an old
    /// [`AtomicRef`] first — see the module doc for why this can't be
    /// checked statically.
    pub fn reset(&mut self) {
        self.atoms.clear();
    }
}

/// A finite partial mapping `images: Point -> Point`, with `inverse_images`
/// maintained as its exact inverse.
#[derive(Clone, Default)]
pub struct AtomicPermutation {
    images: HashMap<Point, Point>,
    inverse_images: HashMap<Point, Point>,
}

impl AtomicPermutation {
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_image(&self, a: Point) -> Point {
        self.images.get(&a).copied().unwrap_or(a)
    }

    #[must_use]
    pub fn get_inverse_image(&self, a: Point) -> Point {
        self.inverse_images.get(&a).copied().unwrap_or(a)
    }

    /// Establishes the single-point assignment `a -> b`. Does not clean up a
    /// prior `images[a] = b'` with `b' != a`, nor a prior `inverse_images[b]`
    /// — callers (composition, the parser) must only call this on a clean
    /// slate or cumulatively on an already-consistent mapping.
    pub fn set_image(&mut self, a: Point, b: Point) {
        if a == b {
            self.images.remove(&a);
            self.inverse_images.remove(&a);
        } else {
            self.images.insert(a, b);
            self.inverse_images.insert(b, a);
        }
    }

    fn compose_with(&mut self, mapping: &HashMap<Point, Point>) {
        let mut result = AtomicPermutation::identity();
        let mut seen = HashSet::new();

        for (&a, &b) in &self.images {
            seen.insert(b);
            let c = mapping.get(&b).copied().unwrap_or(b);
            result.set_image(a, c);
        }

        for (&a, &b) in mapping {
            if !seen.contains(&a) {
                result.set_image(a, b);
            }
        }

        *self = result;
    }

    /// Replace `self` with `a -> g(self(a))`.
    pub fn compose(&mut self, g: &AtomicPermutation) {
        self.compose_with(&g.images);
    }

    /// Like [`Self::compose`] but using `g`'s inverse as the right factor.
    pub fn compose_inverse(&mut self, g: &AtomicPermutation) {
        self.compose_with(&g.inverse_images);
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.inverse_images.clear();
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.images.is_empty()
    }

    /// Points this permutation moves, in no particular order.
    pub fn moved_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.images.keys().copied()
    }

    #[must_use]
    pub fn from_string(s: &str) -> Result<Self, ParseError> {
        s.parse()
    }
}

impl PermutationLike for AtomicPermutation {
    fn get_image(&self, _alloc: &AtomicAllocator, a: Point) -> Point {
        AtomicPermutation::get_image(self, a)
    }

    fn get_inverse_image(&self, _alloc: &AtomicAllocator, a: Point) -> Point {
        AtomicPermutation::get_inverse_image(self, a)
    }
}

impl PartialEq for AtomicPermutation {
    fn eq(&self, other: &Self) -> bool {
        self.images.len() == other.images.len()
            && self.images.iter().all(|(&a, &b)| other.get_image(a) == b)
    }
}

impl Eq for AtomicPermutation {}

impl FromStr for AtomicPermutation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_atomic(s)
    }
}

impl fmt::Display for AtomicPermutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return write!(f, "()");
        }

        let mut keys: Vec<Point> = self.images.keys().copied().collect();
        keys.sort_unstable();
        let mut seen = HashSet::new();

        for start in keys {
            if seen.contains(&start) {
                continue;
            }

            let mut cycle = vec![start];
            seen.insert(start);
            let mut current = self.get_image(start);
            while current != start {
                seen.insert(current);
                cycle.push(current);
                current = self.get_image(current);
            }

            write!(f, "(")?;
            for (i, point) in cycle.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{point}")?;
            }
            write!(f, ")")?;
        }

        Ok(())
    }
}

impl fmt::Debug for AtomicPermutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_image_identity_removes_entries() {
        let mut p = AtomicPermutation::identity();
        p.set_image(0, 1);
        p.set_image(0, 0);
        assert!(p.is_identity());
    }

    #[test]
    fn compose_matches_function_composition() {
        let mut p = AtomicPermutation::identity();
        p.set_image(0, 1);
        p.set_image(1, 0);

        let mut q = AtomicPermutation::identity();
        q.set_image(1, 2);
        q.set_image(2, 1);

        p.compose(&q);
        // p sends 0->1, q sends 1->2, so composed sends 0->2
        assert_eq!(p.get_image(0), 2);
        assert_eq!(p.get_image(2), 0);
        assert_eq!(p.get_image(1), 1);
    }

    #[test]
    fn compose_inverse_undoes_compose() {
        let mut p: AtomicPermutation = "(0 1 2)".parse().unwrap();
        let q: AtomicPermutation = "(1 2 3)".parse().unwrap();
        let original = p.clone();

        p.compose(&q);
        p.compose_inverse(&q);

        assert_eq!(p, original);
    }

    #[test]
    fn get_image_and_inverse_image_are_mutual_inverses() {
        let p: AtomicPermutation = "(0 1 2)(5 7)".parse().unwrap();
        for a in 0..10 {
            assert_eq!(p.get_inverse_image(p.get_image(a)), a);
            assert_eq!(p.get_image(p.get_inverse_image(a)), a);
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        let p: AtomicPermutation = "(0 2 4)(1 3)".parse().unwrap();
        let printed = p.to_string();
        let reparsed: AtomicPermutation = printed.parse().unwrap();
        assert_eq!(p, reparsed);
    }

    #[test]
    fn identity_displays_as_empty_parens() {
        assert_eq!(AtomicPermutation::identity().to_string(), "()");
    }

    #[test]
    fn composition_is_associative() {
        let p: AtomicPermutation = "(0 1)".parse().unwrap();
        let q: AtomicPermutation = "(1 2)".parse().unwrap();
        let r: AtomicPermutation = "(0 2 3)".parse().unwrap();

        let mut left = p.clone();
        left.compose(&q);
        left.compose(&r);

        let mut qr = q.clone();
        qr.compose(&r);
        let mut right = p;
        right.compose(&qr);

        assert_eq!(left.to_string(), right.to_string());
    }
}
