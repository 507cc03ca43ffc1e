//! Basic types to build the parsers

use crate::combinator::{Filter, Map, NonGreedy, NonGreedyUntil};
use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::lib::std::iter;
use crate::lib::std::marker::PhantomData;
use crate::lib::std::rc::Rc;
use crate::results::Parsed;

/// The lazy sequence of matches a parser yields at one position.
///
/// Pulling the iterator explores alternatives; dropping it releases every
/// branch the exploration acquired. An empty sequence is a parse failure.
pub type Matches<'p, V> = Box<dyn Iterator<Item = Parsed<V>> + 'p>;

/// A parse rule over input elements of type `T`.
///
/// A parser is **pure** with respect to the cursor it is given: [`parse`][Parser::parse]
/// never moves it, only [branches][Cursor::branch] it to explore
/// alternatives. Each yielded [`Parsed`] is independently consumable.
///
/// Every rule ultimately reads elements through the shared [`Next`]
/// primitive, reachable via [`next`][Parser::next]; composites forward the
/// question to the child that would read, and a choice that has not yet
/// committed to a branch answers [`Error::Unsupported`].
pub trait Parser<T: Clone + 'static> {
    /// The value a successful match produces.
    type Output;

    /// The cursor-reading primitive this rule reads through.
    fn next(&self) -> Result<Next<T>, Error>;

    /// Apply the rule at the cursor's current position, yielding the lazy
    /// sequence of matches.
    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output>;

    /// Project every match value through `f`.
    ///
    /// Look-ahead results stay look-ahead: the projected result's acceptance
    /// signal chains back to the original producer.
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> U,
    {
        Map::new(self, f)
    }

    /// Keep only matches whose value satisfies `pred`.
    fn filter<F>(self, pred: F) -> Filter<Self, F>
    where
        Self: Sized,
        F: Fn(&Self::Output) -> bool,
    {
        Filter::new(self, pred)
    }

    /// The lazy quantifier: match this rule `min` or more times, emitting a
    /// provisional (look-ahead) result at each boundary, shortest first.
    ///
    /// Each boundary waits for the engine's acceptance signal: rejected
    /// boundaries are extended by one more match, an accepted boundary
    /// commits the quantifier.
    fn non_greedy(self, min: usize) -> NonGreedy<Self>
    where
        Self: Sized,
    {
        NonGreedy::new(self, min)
    }

    /// Match this rule as few times as possible until `end` matches; the
    /// combined result spans the terminator.
    fn non_greedy_until<E>(self, end: E) -> NonGreedyUntil<Self, E>
    where
        Self: Sized,
        E: Parser<T>,
    {
        NonGreedyUntil::new(self, end)
    }
}

impl<T: Clone + 'static, P: Parser<T> + ?Sized> Parser<T> for &P {
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        (**self).next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        (**self).parse(cursor)
    }
}

impl<T: Clone + 'static, P: Parser<T> + ?Sized> Parser<T> for Rc<P> {
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        (**self).next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        (**self).parse(cursor)
    }
}

impl<T: Clone + 'static, P: Parser<T> + ?Sized> Parser<T> for Box<P> {
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        (**self).next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        (**self).parse(cursor)
    }
}

/// The shared cursor-reading primitive: matches exactly one input element
/// and produces it, length 1.
///
/// Every grammar is compiled against one `Next` (see
/// [`ParserStart::new`][crate::driver::ParserStart::new]); leaf rules like
/// [`eq`][crate::token::eq] are filters over it.
#[derive(PartialEq)]
pub struct Next<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> Next<T> {
    /// The primitive itself.
    pub fn new() -> Self {
        Next {
            marker: PhantomData,
        }
    }
}

impl<T> Default for Next<T> {
    fn default() -> Self {
        Next::new()
    }
}

impl<T> Clone for Next<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Next<T> {}

impl<T> crate::lib::std::fmt::Debug for Next<T> {
    fn fmt(&self, f: &mut crate::lib::std::fmt::Formatter<'_>) -> crate::lib::std::fmt::Result {
        f.write_str("Next")
    }
}

impl<T: Clone + 'static> Parser<T> for Next<T> {
    type Output = T;

    fn next(&self) -> Result<Next<T>, Error> {
        Ok(*self)
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
                Ok(Some(token)) => Some(Parsed::new(token, 1)),
                Ok(None) | Err(_) => None,
            }
        }))
    }
}

/// An always-empty match sequence.
pub(crate) fn no_matches<'p, V: 'p>() -> Matches<'p, V> {
    Box::new(iter::empty())
}
