//! # List of combinators
//!
//! | combinator | usage | output | description |
//! |---|---|---|---|
//! | [`all`] | `all((p1, p2, p3))` | `(V1, V2, V3)` | Ordered sequence: each child starts where the previous match ended |
//! | [`any`] | `any((p1, p2))` | `V` | Ordered choice: first child with at least one match wins |
//! | [`all_unordered`] | `all_unordered((p1, p2))` | `Vec<V>` | Every child exactly once, in the order the input presents them |
//! | [`opt`] | `opt(p)` | `Option<V>` | The child's matches, or one empty match |
//! | [`peek`] | `peek(p)` | `V` | Zero-width positive look-ahead |
//! | [`not`] | `not(p)` | `()` | Zero-width negative look-ahead |
//! | [`repeat`] | `repeat(1, None, p)` | `Vec<V>` | Greedy bounded repetition |
//! | [`Parser::non_greedy`] | `p.non_greedy(0)` | `Vec<V>` | Lazy quantifier emitting provisional boundaries |
//! | [`Parser::non_greedy_until`] | `p.non_greedy_until(end)` | `Vec<V>` | Shortest prefix whose boundary lets `end` match |
//! | [`Parser::map`] | `p.map(f)` | `U` | Project the match value |
//! | [`Parser::filter`] | `p.filter(pred)` | `V` | Drop matches whose value fails the predicate |
//! | [`deferred`] | `deferred(\|\| p)` | `V` | Build the parser on first use |
//! | [`recursive`] | `recursive(\|rule\| …)` | `V` | A rule that references itself |
//!
//! None of these moves the cursor it is given; alternatives are explored on
//! [branches][crate::cursor::Cursor::branch] that are released when the
//! match sequence is dropped.

mod core;
mod multi;
mod parser;
mod sequence;

#[cfg(test)]
mod tests;

pub use self::core::{deferred, not, opt, peek, recursive};
pub use self::core::{Deferred, Not, Opt, Peek, Recursive};
pub use self::multi::{repeat, NonGreedy, NonGreedyUntil, Repeat};
pub use self::parser::{Filter, Map};
pub use self::sequence::{all, all_unordered, any};
pub use self::sequence::{All, AllUnordered, Alternatives, Any, Choice, Sequence};

#[allow(unused_imports)] // Here for intra-doc links
use crate::parser::Parser;
