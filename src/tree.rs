//! A Schreier tree: the orbit of a root point under a list of generators,
//! with a path back to the root recorded for every orbit member.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::ops::Bound::{Excluded, Unbounded};

use itertools::Itertools;

use crate::atomic::{AtomicAllocator, Point};
use crate::word::PermutationWord;

#[derive(Debug)]
pub struct SchreierTree {
    root: Point,
    generators: Vec<PermutationWord>,
    tree: BTreeMap<Point, PermutationWord>,
}

impl SchreierTree {
    #[must_use]
    pub fn new(root: Point) -> Self {
        SchreierTree {
            root,
            generators: Vec::new(),
            tree: BTreeMap::new(),
        }
    }

    pub fn set_root(&mut self, root: Point) {
        self.root = root;
    }

    #[must_use]
    pub fn get_root(&self) -> Point {
        self.root
    }

    /// Append a generator word. Redundant re-additions are allowed, only
    /// wasteful.
    pub fn add_generator(&mut self, g: PermutationWord) {
        self.generators.push(g);
    }

    #[must_use]
    pub fn generators(&self) -> &[PermutationWord] {
        &self.generators
    }

    #[must_use]
    pub fn is_in_orbit(&self, a: Point) -> bool {
        a == self.root || self.tree.contains_key(&a)
    }

    /// The orbit of the root under this tree's generators, root first.
    pub fn orbit(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.root).chain(self.tree.keys().copied())
    }

    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.tree.len()
    }

    /// Expand the tree by one full orbit closure under the current
    /// generators. Returns whether the tree grew.
    ///
    /// Walks the orbit in ascending point order using [`OrbitCursor`], which
    /// tolerates points being discovered (and inserted into `tree`) while
    /// the walk is still in progress — see that type's docs.
    pub fn build_tree(&mut self, alloc: &AtomicAllocator) -> bool {
        let mut changed = false;
        let mut cursor = OrbitCursor::new();

        while let Some(a) = cursor.current(&self.tree, self.root) {
            let frozen_key = cursor.frozen_cursor_key(&self.tree);
            let was_using_queue = cursor.use_queue;

            for i in 0..self.generators.len() {
                let inverse_image = self.generators[i].get_inverse_image(alloc, a);

                if !self.is_in_orbit(inverse_image) {
                    changed = true;
                    self.tree.insert(inverse_image, self.generators[i].clone());
                    cursor.record_discovery(frozen_key, inverse_image);
                }
            }

            cursor.advance(was_using_queue, frozen_key);
        }

        changed
    }

    /// `w` such that `w` maps `a` to the root. `None` if `a` is not in the
    /// orbit.
    pub fn path_to_root(&self, alloc: &AtomicAllocator, mut a: Point) -> Option<PermutationWord> {
        if !self.is_in_orbit(a) {
            return None;
        }

        let mut w = PermutationWord::identity();
        while a != self.root {
            let edge = self
                .tree
                .get(&a)
                .expect("every non-root orbit point has a tree edge");
            w.compose(edge);
            a = edge.get_image(alloc, a);
        }

        Some(w)
    }

    /// `w` such that `w` maps the root to `a`. `None` if `a` is not in the
    /// orbit.
    pub fn path_from_root(&self, alloc: &AtomicAllocator, a: Point) -> Option<PermutationWord> {
        let to_root = self.path_to_root(alloc, a)?;
        let mut w = PermutationWord::identity();
        w.compose_inverse(&to_root);
        Some(w)
    }

    #[must_use]
    pub fn has_generator(&self, alloc: &AtomicAllocator, g: &PermutationWord) -> bool {
        let target = g.to_evaluated_string(alloc);
        self.generators
            .iter()
            .any(|existing| existing.to_evaluated_string(alloc) == target)
    }

    #[must_use]
    pub fn to_debug_string(&self, alloc: &AtomicAllocator) -> String {
        let mut s = format!("root: {}\ngenerators: ", self.root);
        s.push_str(
            &self
                .generators
                .iter()
                .map(|g| format!("{} [{}]", g.to_debug_string(), g.to_evaluated_string(alloc)))
                .join(", "),
        );
        s.push_str("\ntree: { ");
        s.push_str(
            &self
                .tree
                .iter()
                .map(|(a, w)| format!("{a}: {}", w.to_evaluated_string(alloc)))
                .join(", "),
        );
        s.push_str(" }");
        s
    }
}

impl fmt::Display for SchreierTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "orbit rooted at {} ({} points)", self.root, self.size())
    }
}

/// Iterates the orbit of a [`SchreierTree`] in ascending point order while
/// new points are still being discovered and inserted into the same map.
///
/// A plain `BTreeMap` iterator can't survive interleaved insertion, so this
/// keeps no live borrow across steps: it re-derives "the key the cursor is
/// currently parked at" from `cursor_at` (the last key it emitted) via a
/// fresh range query each time it's asked. A side queue holds points that
/// arrive smaller than the cursor's current position — those can no longer
/// be reached by the cursor walking forward, so they're drained first.
///
/// The root is emitted via the queue since it never lives in the tree map.
struct OrbitCursor {
    queue: VecDeque<Point>,
    cursor_at: Option<Point>,
    use_queue: bool,
    started: bool,
}

impl OrbitCursor {
    fn new() -> Self {
        OrbitCursor {
            queue: VecDeque::new(),
            cursor_at: None,
            use_queue: true,
            started: false,
        }
    }

    /// The key the cursor would read next, ignoring the queue. `None` once
    /// the cursor has walked off the end of the map.
    fn frozen_cursor_key(&self, tree: &BTreeMap<Point, PermutationWord>) -> Option<Point> {
        match self.cursor_at {
            None => tree.keys().next().copied(),
            Some(last) => tree.range((Excluded(last), Unbounded)).next().map(|(&k, _)| k),
        }
    }

    fn current(&mut self, tree: &BTreeMap<Point, PermutationWord>, root: Point) -> Option<Point> {
        if !self.started {
            self.started = true;
            self.queue.push_back(root);
        }

        if self.use_queue {
            self.queue.front().copied()
        } else {
            self.frozen_cursor_key(tree)
        }
    }

    /// Record that `a` was just discovered (and already inserted into
    /// `tree`). `frozen_key` is the cursor's position as of the start of
    /// the current step — comparisons must use that snapshot, not a
    /// position recomputed after earlier discoveries this same step, or a
    /// later discovery could be judged against a position the cursor
    /// hasn't actually reached yet.
    fn record_discovery(&mut self, frozen_key: Option<Point>, a: Point) {
        match frozen_key {
            None => {
                self.queue.push_back(a);
                self.use_queue = true;
            }
            Some(k) if a < k => self.queue.push_back(a),
            _ => {}
        }
    }

    fn advance(&mut self, was_using_queue: bool, frozen_key: Option<Point>) {
        if was_using_queue {
            self.queue.pop_front();
            if self.queue.is_empty() {
                self.use_queue = false;
            }
        } else {
            if let Some(k) = frozen_key {
                self.cursor_at = Some(k);
            }
            if !self.queue.is_empty() {
                self.use_queue = true;
            }
        }
    }
}
