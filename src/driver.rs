//! The Schreier-Sims driver: owns the base, the global generator pool, and
//! one [`SchreierTree`] per base point.

use std::fmt;

use crate::atomic::{AtomicAllocator, Point};
use crate::parse::ParseError;
use crate::tree::SchreierTree;
use crate::word::PermutationWord;

/// Generous-but-finite bound on Schreier-generator sift attempts across a
/// single [`FundamentalSchreierTrees::schreier_sims`] run. The source left
/// this unspecified; this is large enough that no test in this crate comes
/// close to it, and small enough to fail fast on a real non-termination bug
/// rather than hang.
pub const DEFAULT_ITERATION_CAP: u64 = 1_000_000;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("point {0} is already in the base")]
pub struct DuplicateBasePoint(pub Point);

/// Owns the base, the strong generating set under construction, and the
/// stack of [`SchreierTree`]s (one per base point) that back membership,
/// order, and stripping.
pub struct FundamentalSchreierTrees {
    base: Vec<Point>,
    generators: Vec<PermutationWord>,
    trees: Vec<SchreierTree>,
    alloc: AtomicAllocator,
    iteration_cap: u64,
}

impl Default for FundamentalSchreierTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl FundamentalSchreierTrees {
    #[must_use]
    pub fn new() -> Self {
        FundamentalSchreierTrees {
            base: Vec::new(),
            generators: Vec::new(),
            trees: Vec::new(),
            alloc: AtomicAllocator::new(),
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }

    #[must_use]
    pub fn with_iteration_cap(mut self, cap: u64) -> Self {
        self.iteration_cap = cap;
        self
    }

    #[must_use]
    pub fn alloc(&self) -> &AtomicAllocator {
        &self.alloc
    }

    pub fn append_to_base(&mut self, a: Point) -> Result<(), DuplicateBasePoint> {
        if self.base.contains(&a) {
            return Err(DuplicateBasePoint(a));
        }

        self.base.push(a);
        self.trees.push(SchreierTree::new(a));
        let i = self.trees.len() - 1;

        for gi in 0..self.generators.len() {
            let w = self.generators[gi].clone();
            if self.fixes_prefix(&w, i) {
                self.trees[i].add_generator(w);
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn get_base(&self, i: usize) -> Option<Point> {
        self.base.get(i).copied()
    }

    #[must_use]
    pub fn get_base_length(&self) -> usize {
        self.base.len()
    }

    #[must_use]
    pub fn get_tree(&self, i: usize) -> Option<&SchreierTree> {
        self.trees.get(i)
    }

    fn fixes_prefix(&self, w: &PermutationWord, up_to: usize) -> bool {
        (0..up_to).all(|k| w.get_image(&self.alloc, self.base[k]) == self.base[k])
    }

    /// Distribute `w` to every tree whose prefix it fixes, per the
    /// `SchreierTree`-ownership invariant (tree `i` gets exactly the
    /// generators fixing `base[0..i)`).
    fn distribute(&mut self, w: &PermutationWord) {
        for i in 0..self.trees.len() {
            if self.fixes_prefix(w, i) {
                self.trees[i].add_generator(w.clone());
            } else {
                break;
            }
        }
    }

    pub fn add_generator(&mut self, w: PermutationWord) {
        self.generators.push(w.clone());
        self.distribute(&w);
    }

    /// Parse `s` in cycle notation and add the resulting permutation as a
    /// generator, mirroring the string-literal `add_generator` overload the
    /// original test suite uses throughout.
    pub fn add_generator_str(&mut self, s: &str) -> Result<(), ParseError> {
        let w = self.parse_word(s)?;
        self.add_generator(w);
        Ok(())
    }

    /// Parse `s` into a [`PermutationWord`] valid against this driver's own
    /// allocator, without adding it as a generator. Lets callers build an
    /// arbitrary element to [`Self::strip`] against the chain, mirroring how
    /// the original test suite constructs a standalone permutation and sifts
    /// it through the chain under test.
    pub fn parse_word(&mut self, s: &str) -> Result<PermutationWord, ParseError> {
        let r = self.alloc.alloc_from_str(s)?;
        Ok(PermutationWord::from_atom(r))
    }

    pub fn build_trees(&mut self) -> bool {
        let mut changed = false;
        for tree in &mut self.trees {
            if tree.build_tree(&self.alloc) {
                changed = true;
            }
        }
        changed
    }

    #[must_use]
    pub fn does_each_generator_move_base(&self) -> bool {
        self.generators.iter().all(|g| {
            self.base
                .iter()
                .any(|&b| g.get_image(&self.alloc, b) != b)
        })
    }

    pub fn ensure_each_generator_moves_base(&mut self) {
        loop {
            let culprit = self.generators.iter().find_map(|g| {
                let fixes_whole_base = self
                    .base
                    .iter()
                    .all(|&b| g.get_image(&self.alloc, b) == b);

                if !fixes_whole_base {
                    return None;
                }

                g.to_atomic(&self.alloc).moved_points().min()
            });

            match culprit {
                Some(point) => {
                    log::debug!("extending base with {point}: a generator fixed the whole base");
                    self.append_to_base(point)
                        .expect("the smallest point a generator moves can't already be a base point it fixes");
                }
                None => break,
            }
        }
    }

    /// Sift `g` through the stabilizer chain. Returns `(depth, residue)`.
    /// `depth == base length` means the residue fixes every base point;
    /// otherwise `depth` is the first level where the residue moved its
    /// base point outside that level's orbit.
    #[must_use]
    pub fn strip(&self, g: &PermutationWord) -> (usize, PermutationWord) {
        let mut h = g.clone();

        for i in 0..self.base.len() {
            let p = h.get_image(&self.alloc, self.base[i]);

            if !self.trees[i].is_in_orbit(p) {
                return (i, h);
            }

            let u = self
                .trees[i]
                .path_from_root(&self.alloc, p)
                .expect("p was just confirmed to be in tree i's orbit");
            h.compose_inverse(&u);
        }

        (self.base.len(), h)
    }

    fn schreier_generator(&self, tree_index: usize, x: Point, s: &PermutationWord) -> PermutationWord {
        let tree = &self.trees[tree_index];
        let mut sg = tree
            .path_from_root(&self.alloc, x)
            .expect("x is iterated from this tree's own orbit");
        sg.compose(s);
        let sx = s.get_image(&self.alloc, x);
        let path_sx = tree
            .path_from_root(&self.alloc, sx)
            .expect("a generator must map an orbit point back into the orbit");
        sg.compose_inverse(&path_sx);
        sg
    }

    #[must_use]
    pub fn is_strongly_generated(&self) -> bool {
        if self.base.is_empty() {
            return self
                .generators
                .iter()
                .all(|g| g.is_identity(&self.alloc));
        }

        for i in 0..self.base.len() {
            let orbit: Vec<Point> = self.trees[i].orbit().collect();
            for x in orbit {
                for gen_index in 0..self.trees[i].generators().len() {
                    let s = self.trees[i].generators()[gen_index].clone();
                    let sg = self.schreier_generator(i, x, &s);
                    let (depth, h) = self.strip(&sg);
                    if depth != self.base.len() || !h.is_identity(&self.alloc) {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// The main Schreier-Sims loop: extend the base and adopt new strong
    /// generators until every Schreier generator sifts to the identity at
    /// full depth. Returns `false` only if the iteration cap is exceeded.
    pub fn schreier_sims(&mut self) -> bool {
        self.ensure_each_generator_moves_base();
        self.build_trees();

        let mut iterations: u64 = 0;

        loop {
            self.ensure_each_generator_moves_base();
            self.build_trees();

            let mut restarted = false;

            'levels: for i in (0..self.base.len()).rev() {
                let orbit: Vec<Point> = self.trees[i].orbit().collect();
                let gens: Vec<PermutationWord> = self.trees[i].generators().to_vec();

                for x in orbit {
                    for s in &gens {
                        iterations += 1;
                        if iterations > self.iteration_cap {
                            log::warn!(
                                "schreier_sims exceeded its iteration cap ({}); giving up",
                                self.iteration_cap
                            );
                            return false;
                        }

                        let sg = self.schreier_generator(i, x, s);
                        let (depth, h) = self.strip(&sg);

                        if depth == self.base.len() {
                            if h.is_identity(&self.alloc) {
                                continue;
                            }

                            let point = h
                                .to_atomic(&self.alloc)
                                .moved_points()
                                .min()
                                .expect("a non-identity residue moves at least one point");
                            log::debug!(
                                "base insufficient at full depth; extending with point {point}"
                            );
                            self.append_to_base(point).expect(
                                "a residue fixing the whole base can't move an existing base point",
                            );
                            self.build_trees();
                            restarted = true;
                            break 'levels;
                        }

                        log::debug!("adopting new strong generator found at depth {depth}");
                        self.add_generator(h);
                        self.build_trees();
                        restarted = true;
                        break 'levels;
                    }
                }
            }

            if !restarted {
                return true;
            }
        }
    }

    /// `product of orbit sizes along the base`, i.e. the order of the
    /// group. `-1` on signed 64-bit overflow.
    #[must_use]
    pub fn order(&self) -> i64 {
        let mut accumulator: i64 = 1;
        for tree in &self.trees {
            let size = i64::try_from(tree.size()).unwrap_or(i64::MAX);
            match accumulator.checked_mul(size) {
                Some(v) => accumulator = v,
                None => return -1,
            }
        }
        accumulator
    }
}

impl fmt::Display for FundamentalSchreierTrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "base: {:?}", self.base)?;
        writeln!(f, "generators: {}", self.generators.len())?;
        for (i, tree) in self.trees.iter().enumerate() {
            writeln!(f, "--- tree {i} ---")?;
            writeln!(f, "{}", tree.to_debug_string(&self.alloc))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instantiation_and_base_sentinel() {
        let mut t = FundamentalSchreierTrees::new();
        t.append_to_base(2).unwrap();

        assert_eq!(t.get_base(0), Some(2));
        assert_eq!(t.get_base(1), None);
    }

    #[test]
    fn appending_a_duplicate_base_point_fails() {
        let mut t = FundamentalSchreierTrees::new();
        t.append_to_base(0).unwrap();
        assert_eq!(t.append_to_base(0), Err(DuplicateBasePoint(0)));
    }

    #[test]
    fn distribute_generator_across_levels() {
        let mut t = FundamentalSchreierTrees::new();
        t.append_to_base(0).unwrap();
        t.append_to_base(1).unwrap();
        assert_eq!(t.get_base_length(), 2);

        t.add_generator_str("(0 2)").unwrap();
        assert!(t.get_tree(0).unwrap().generators().len() == 1);
        assert!(t.get_tree(1).unwrap().generators().is_empty());

        t.add_generator_str("(1 3)").unwrap();
        assert_eq!(t.get_tree(0).unwrap().generators().len(), 2);
        assert_eq!(t.get_tree(1).unwrap().generators().len(), 1);
    }

    #[test]
    fn strip_on_the_empty_chain_is_the_identity_at_depth_zero() {
        let t = FundamentalSchreierTrees::new();
        let g = PermutationWord::identity();
        let (depth, h) = t.strip(&g);
        assert_eq!(depth, 0);
        assert!(h.is_identity(t.alloc()));
    }

    #[test]
    fn strip_reports_depth_one_when_point_leaves_the_orbit() {
        let mut t = FundamentalSchreierTrees::new();
        t.append_to_base(0).unwrap();

        let g = t.parse_word("(0 1)").unwrap();

        let (depth, h) = t.strip(&g);
        assert_eq!(depth, 0);
        assert_eq!(h.to_evaluated_string(t.alloc()), "(0 1)");
    }

    #[test]
    fn strip_small_s3() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(0 1 2)").unwrap();
        t.add_generator_str("(0 1)").unwrap();
        t.append_to_base(0).unwrap();
        assert!(t.build_trees());

        for input in ["(0 2)", "(0 1)", "(0 2 1)", "(0 1 2)"] {
            let g = t.parse_word(input).unwrap();
            let (depth, h) = t.strip(&g);
            assert_eq!(depth, 1);
            assert_eq!(h.get_image(t.alloc(), 0), 0);
        }
    }

    #[test]
    fn ensure_each_generator_moves_base() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(0 1)").unwrap();
        assert!(!t.does_each_generator_move_base());
        t.ensure_each_generator_moves_base();
        assert!(t.does_each_generator_move_base());

        t.add_generator_str("(2 3)").unwrap();
        assert!(!t.does_each_generator_move_base());
        t.ensure_each_generator_moves_base();
        assert!(t.does_each_generator_move_base());
    }

    #[test]
    fn is_strongly_generated_progression() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(0 1)").unwrap();
        t.build_trees();
        assert!(!t.is_strongly_generated());

        t.append_to_base(0).unwrap();
        t.build_trees();
        assert!(t.is_strongly_generated());

        t.add_generator_str("(0 2)").unwrap();
        t.append_to_base(2).unwrap();
        t.build_trees();
        assert!(!t.is_strongly_generated());

        t.add_generator_str("(1 2)").unwrap();
        t.build_trees();
        assert!(t.is_strongly_generated());
    }

    #[test]
    fn is_strongly_generated_s4() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(0 1)").unwrap();
        t.add_generator_str("(0 1 2 3)").unwrap();
        t.append_to_base(0).unwrap();
        t.append_to_base(1).unwrap();
        t.append_to_base(2).unwrap();
        t.build_trees();
        assert!(!t.is_strongly_generated());

        t.add_generator_str("(1 2)").unwrap();
        t.build_trees();
        assert!(!t.is_strongly_generated());

        t.add_generator_str("(2 3)").unwrap();
        t.build_trees();
        assert!(t.is_strongly_generated());
    }

    #[test]
    fn schreier_sims_small() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(0 1)").unwrap();
        assert!(!t.schreier_sims());

        t.add_generator_str("(0 2)").unwrap();
        assert!(t.schreier_sims());

        let g = t.parse_word("(1 2)").unwrap();
        let (depth, h) = t.strip(&g);
        assert!(h.is_identity(t.alloc()));
        assert_eq!(depth, t.get_base_length());
    }

    #[test]
    fn schreier_sims_inverse_image_ordering_regression() {
        // regression: a prior bug computed a permutation word's inverse
        // image without reversing factor order.
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(2 3)").unwrap();
        t.add_generator_str("(1 3 2)").unwrap();
        assert!(t.schreier_sims());
    }

    #[test]
    fn schreier_sims_three_generators() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(3 4)(7 8)").unwrap();
        t.add_generator_str("(1 5)(2 6)(3 7)(4 8)").unwrap();
        t.add_generator_str("(1 3)(2 4)").unwrap();
        assert!(t.schreier_sims());
    }

    #[test_log::test]
    fn schreier_sims_known_infinite_loop_regression() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(3 7 5)(4 8 6)").unwrap();
        t.add_generator_str("(1 3)(2 4)(5 7)(6 8)").unwrap();
        t.add_generator_str("(1 4 2 3)(5 7 6 8)").unwrap();
        assert!(t.schreier_sims());
    }

    #[test]
    fn order_of_symmetric_groups_and_overflow() {
        fn factorial(n: i64) -> i64 {
            (1..=n).product()
        }

        let mut t = FundamentalSchreierTrees::new();
        let mut n = 1i64;
        loop {
            n += 1;
            t.add_generator_str(&format!("({} {})", n - 1, n)).unwrap();
            t.schreier_sims();
            let order = t.order();

            if order == -1 {
                break;
            }

            assert_eq!(order, factorial(n));

            if n > 25 {
                panic!("order never overflowed i64 as expected");
            }
        }
    }

    #[test_log::test]
    fn iteration_cap_reports_non_convergence() {
        let mut t = FundamentalSchreierTrees::new().with_iteration_cap(0);
        t.add_generator_str("(0 1)").unwrap();
        t.add_generator_str("(0 2)").unwrap();
        assert!(!t.schreier_sims());
    }

    #[test]
    fn strip_after_schreier_sims_is_identity_on_group_elements() {
        let mut t = FundamentalSchreierTrees::new();
        t.add_generator_str("(0 1)").unwrap();
        t.add_generator_str("(0 1 2)").unwrap();
        assert!(t.schreier_sims());

        for cycles in ["()", "(0 1)", "(1 2)", "(0 2)", "(0 1 2)", "(0 2 1)"] {
            let g = t.parse_word(cycles).unwrap();
            let (depth, h) = t.strip(&g);
            assert_eq!(depth, t.get_base_length());
            assert!(h.is_identity(t.alloc()), "failed for {cycles}");
        }
    }
}
