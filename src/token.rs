//! Leaf rules over individual input elements
//!
//! These are the closed set of primitives the combinators and the driver are
//! built from; everything else in a grammar reduces to them plus the
//! [combinators][crate::combinator].

use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::lib::std::iter;
use crate::lib::std::vec::Vec;
use crate::parser::{Matches, Next, Parser};
use crate::results::Parsed;

/// Match any single input element and produce it.
///
/// # Example
///
/// ```rust
/// use rewind::cursor::Cursor;
/// use rewind::token::any_token;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("x".chars());
/// let matches: Vec<_> = any_token::<char>().parse(&cursor).collect();
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches[0].value(), &'x');
/// assert_eq!(matches[0].length(), 1);
/// ```
pub fn any_token<T>() -> Next<T> {
    Next::new()
}

/// Match the single element equal to `expected`.
///
/// # Example
///
/// ```rust
/// use rewind::cursor::Cursor;
/// use rewind::token::eq;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("ab".chars());
/// assert_eq!(eq('a').parse(&cursor).count(), 1);
/// assert_eq!(eq('b').parse(&cursor).count(), 0);
/// ```
pub fn eq<T: PartialEq>(expected: T) -> TokenEq<T> {
    TokenEq { expected }
}

/// Implementation of [`eq`].
pub struct TokenEq<T> {
    expected: T,
}

impl<T: Clone + PartialEq + 'static> Parser<T> for TokenEq<T> {
    type Output = T;

    fn next(&self) -> Result<Next<T>, Error> {
        Ok(Next::new())
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, T> {
        let at = cursor.alias();
        let mut done = false;
        Box::new(iter::from_fn(move || {
            if done {
                return None;
            }
            done = true;
            match at.token_at_current() {
                Ok(Some(token)) if token == self.expected => Some(Parsed::new(token, 1)),
                _ => None,
            }
        }))
    }
}

/// Match the single element satisfying `pred`.
///
/// # Example
///
/// ```rust
/// use rewind::cursor::Cursor;
/// use rewind::token::one_of;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("7".chars());
/// let digit = one_of(|c: &char| c.is_ascii_digit());
/// assert_eq!(digit.parse(&cursor).next().unwrap().value(), &'7');
/// ```
pub fn one_of<T, F: Fn(&T) -> bool>(pred: F) -> OneOf<F> {
    OneOf { pred }
}

/// Implementation of [`one_of`].
pub struct OneOf<F> {
    pred: F,
}

impl<T, F> Parser<T> for OneOf<F>
where
    T: Clone + 'static,
    F: Fn(&T) -> bool,
{
    type Output = T;

    fn next(&self) -> Result<Next<T>, Error> {
        Ok(Next::new())
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, T> {
        let at = cursor.alias();
        let mut done = false;
        Box::new(iter::from_fn(move || {
            if done {
                return None;
            }
            done = true;
            match at.token_at_current() {
                Ok(Some(token)) if (self.pred)(&token) => Some(Parsed::new(token, 1)),
                _ => None,
            }
        }))
    }
}

/// Match a fixed sequence of elements, producing them in order.
///
/// # Example
///
/// ```rust
/// use rewind::cursor::Cursor;
/// use rewind::token::literal;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("abc!".chars());
/// let word = literal("abc".chars());
/// let matched = word.parse(&cursor).next().unwrap();
/// assert_eq!(matched.value(), &vec!['a', 'b', 'c']);
/// assert_eq!(matched.length(), 3);
/// ```
pub fn literal<T: PartialEq + Clone>(expected: impl IntoIterator<Item = T>) -> Literal<T> {
    Literal {
        expected: expected.into_iter().collect(),
    }
}

/// Implementation of [`literal`].
pub struct Literal<T> {
    expected: Vec<T>,
}

impl<T: Clone + PartialEq + 'static> Parser<T> for Literal<T> {
    type Output = Vec<T>;

    fn next(&self) -> Result<Next<T>, Error> {
        Ok(Next::new())
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Vec<T>> {
        let at = cursor.alias();
        let mut done = false;
        Box::new(iter::from_fn(move || {
            if done {
                return None;
            }
            done = true;
            let probe = at.branch().ok()?;
            let mut seen = Vec::with_capacity(self.expected.len());
            for expected in &self.expected {
                match probe.token_at_current() {
                    Ok(Some(token)) if token == *expected => {
                        seen.push(token);
                        probe.move_by(1).ok()?;
                    }
                    _ => return None,
                }
            }
            Some(Parsed::new(seen, self.expected.len()))
        }))
    }
}
