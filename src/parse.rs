//! Cycle-notation grammar: `"(0 1 2)(5 7)"`, `"()"` for the identity.
//!
//! Grammar-level syntax (balanced parens, digit runs, single-space
//! separators) is handled by the `pest` grammar in `cycle.pest`, the same
//! way the generator cycles of a puzzle definition are parsed elsewhere in
//! this crate's lineage. Semantic validity (a point appearing in more than
//! one cycle) is checked here, since `pest` grammars can't express that.

use std::collections::HashSet;

use pest::Parser;
use pest_derive::Parser;

use crate::atomic::{AtomicPermutation, Point};

#[derive(Parser)]
#[grammar = "cycle.pest"]
struct CycleParser;

/// Everything that can go wrong turning a string into an [`AtomicPermutation`].
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("point {point} appears in more than one cycle")]
    DuplicatePoint { point: Point },
    #[error("point at byte {pos} is too large to fit a point ({source})")]
    ExpectedInt {
        pos: usize,
        source: std::num::ParseIntError,
    },
    #[error("{0}")]
    Grammar(#[from] Box<pest::error::Error<Rule>>),
}

pub(crate) fn parse_atomic(input: &str) -> Result<AtomicPermutation, ParseError> {
    let perm_pair = CycleParser::parse(Rule::perm, input)
        .map_err(Box::new)?
        .next()
        .expect("perm rule always produces exactly one top-level pair");

    let mut result = AtomicPermutation::identity();
    let mut seen = HashSet::new();

    for part in perm_pair.into_inner() {
        match part.as_rule() {
            Rule::identity | Rule::EOI => {}
            Rule::cycles => {
                for cycle_pair in part.into_inner() {
                    let points = cycle_pair
                        .into_inner()
                        .map(|int_pair| {
                            let pos = int_pair.as_span().start();
                            int_pair
                                .as_str()
                                .parse::<Point>()
                                .map_err(|source| ParseError::ExpectedInt { pos, source })
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    for &point in &points {
                        if !seen.insert(point) {
                            return Err(ParseError::DuplicatePoint { point });
                        }
                    }

                    for pair in points.windows(2) {
                        result.set_image(pair[0], pair[1]);
                    }
                    if points.len() > 1 {
                        result.set_image(*points.last().unwrap(), points[0]);
                    }
                }
            }
            other => unreachable!("unexpected top-level rule {other:?}"),
        }
    }

    Ok(result)
}
