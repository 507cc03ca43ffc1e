//! Combinators applying their child parser multiple times

use crate::combinator::sequence::then;
use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::lib::std::iter;
use crate::lib::std::vec::Vec;
use crate::parser::{no_matches, Matches, Next, Parser};
use crate::results::{Parsed, Signal};

/// Take a child's first alternative at `at`, committing any provisional
/// match it produced. Repetition threads one alternative per step.
fn first_match<T, P>(parser: &P, at: &Cursor<T>) -> Option<Parsed<P::Output>>
where
    T: Clone + 'static,
    P: Parser<T>,
{
    let mut matches = parser.parse(at);
    let first = matches.next()?;
    first.settle(true);
    Some(first)
}

/// Greedy bounded repetition: match the child as many times as possible
/// (between `min` and `max`), producing one result with the collected
/// values.
///
/// # Example
///
/// ```rust
/// use rewind::combinator::repeat;
/// use rewind::cursor::Cursor;
/// use rewind::token::eq;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("aaab".chars());
/// let matched = repeat(1, None, eq('a')).parse(&cursor).next().unwrap();
/// assert_eq!(matched.value(), &vec!['a', 'a', 'a']);
/// assert_eq!(matched.length(), 3);
///
/// assert_eq!(repeat(4, None, eq('a')).parse(&cursor).count(), 0);
/// ```
pub fn repeat<T, P>(min: usize, max: impl Into<Option<usize>>, parser: P) -> Repeat<P>
where
    T: Clone + 'static,
    P: Parser<T>,
{
    Repeat {
        parser,
        min,
        max: max.into(),
    }
}

/// Implementation of [`repeat`].
pub struct Repeat<P> {
    parser: P,
    min: usize,
    max: Option<usize>,
}

impl<T, P> Parser<T> for Repeat<P>
where
    T: Clone + 'static,
    P: Parser<T>,
{
    type Output = Vec<P::Output>;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let at = cursor.alias();
        let mut done = false;
        Box::new(iter::from_fn(move || {
            if done {
                return None;
            }
            done = true;
            let base = at.branch().ok()?;
            let mut values = Vec::new();
            let mut length = 0;
            while self.max.map_or(true, |max| values.len() < max) {
                match first_match(&self.parser, &base) {
                    // A zero-width match would repeat forever; stop instead.
                    Some(one) if one.length() == 0 => break,
                    Some(one) => {
                        if base.move_by(one.length() as isize).is_err() {
                            return None;
                        }
                        length += one.length();
                        values.push(one.into_value());
                    }
                    None => break,
                }
            }
            if values.len() >= self.min {
                Some(Parsed::new(values, length))
            } else {
                None
            }
        }))
    }
}

struct Boundary<T: Clone + 'static, V> {
    base: Cursor<T>,
    values: Vec<V>,
    length: usize,
}

/// The lazy quantifier. Built by [`Parser::non_greedy`].
///
/// Emits a provisional (look-ahead) result at each boundary, shortest
/// first: first after `min` matches, then one more match per rejected
/// boundary. An accepted boundary commits the quantifier; a child failure
/// ends it.
pub struct NonGreedy<P> {
    parser: P,
    min: usize,
}

impl<P> NonGreedy<P> {
    pub(crate) fn new(parser: P, min: usize) -> Self {
        NonGreedy { parser, min }
    }
}

impl<T, P> Parser<T> for NonGreedy<P>
where
    T: Clone + 'static,
    P: Parser<T>,
    P::Output: Clone,
{
    type Output = Vec<P::Output>;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let at = cursor.alias();
        let mut state: Option<Boundary<T, P::Output>> = None;
        let mut emitted: Option<Signal> = None;
        let mut done = false;
        Box::new(iter::from_fn(move || {
            if done {
                return None;
            }
            match emitted.take() {
                Some(signal) => {
                    if signal.outcome() == Some(true) {
                        done = true;
                        return None;
                    }
                    // Rejected (or not yet judged): extend to the next
                    // boundary with one more child match.
                    let boundary = state.as_mut()?;
                    match first_match(&self.parser, &boundary.base) {
                        // A zero-width match cannot move the boundary.
                        Some(one) if one.length() == 0 => {
                            done = true;
                            return None;
                        }
                        Some(one) => {
                            if boundary.base.move_by(one.length() as isize).is_err() {
                                done = true;
                                return None;
                            }
                            boundary.length += one.length();
                            boundary.values.push(one.into_value());
                        }
                        None => {
                            done = true;
                            return None;
                        }
                    }
                }
                None => {
                    // First boundary: the minimum number of matches.
                    let base = match at.branch() {
                        Ok(base) => base,
                        Err(_) => {
                            done = true;
                            return None;
                        }
                    };
                    let mut boundary = Boundary {
                        base,
                        values: Vec::new(),
                        length: 0,
                    };
                    for _ in 0..self.min {
                        match first_match(&self.parser, &boundary.base) {
                            Some(one) => {
                                if boundary.base.move_by(one.length() as isize).is_err() {
                                    done = true;
                                    return None;
                                }
                                boundary.length += one.length();
                                boundary.values.push(one.into_value());
                            }
                            None => {
                                done = true;
                                return None;
                            }
                        }
                    }
                    state = Some(boundary);
                }
            }
            let boundary = state.as_ref()?;
            let signal = Signal::new();
            emitted = Some(signal.clone());
            Some(Parsed::look_ahead_with(
                boundary.values.clone(),
                boundary.length,
                signal,
            ))
        }))
    }
}

/// Non-greedy repetition up to a terminator. Built by
/// [`Parser::non_greedy_until`].
///
/// Equivalent to sequencing `parser.non_greedy(0)` with `end`: the shortest
/// prefix whose boundary lets `end` match wins. The produced value is the
/// prefix; the length spans the terminator as well, so a driver advancing
/// by the match length skips past it.
pub struct NonGreedyUntil<P, E> {
    quantified: NonGreedy<P>,
    end: E,
}

impl<P, E> NonGreedyUntil<P, E> {
    pub(crate) fn new(parser: P, end: E) -> Self {
        NonGreedyUntil {
            quantified: NonGreedy::new(parser, 0),
            end,
        }
    }
}

impl<T, P, E> Parser<T> for NonGreedyUntil<P, E>
where
    T: Clone + 'static,
    P: Parser<T>,
    P::Output: Clone,
    E: Parser<T>,
{
    type Output = Vec<P::Output>;

    fn next(&self) -> Result<Next<T>, Error> {
        self.quantified.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let base = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let prefixes = self.quantified.parse(&base);
        then(
            prefixes,
            base,
            move |c| self.end.parse(c),
            |prefix: &Vec<P::Output>, _end| prefix.clone(),
        )
    }
}
