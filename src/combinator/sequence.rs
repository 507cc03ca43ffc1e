//! Sequencing: the binder, ordered sequence, choice, and unordered sequence

use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::lib::std::cell::Cell;
use crate::lib::std::iter;
use crate::lib::std::rc::Rc;
use crate::lib::std::vec::Vec;
use crate::parser::{no_matches, Matches, Next, Parser};
use crate::results::Parsed;

/// One-element look-ahead over a match stream, tagging each result with
/// whether it is the final one.
///
/// The sequencing binder needs the tag to reuse its current branch for the
/// final upstream result instead of allocating a remainder branch per link.
pub(crate) struct Flagged<I: Iterator> {
    iter: I,
    peeked: Option<I::Item>,
    primed: bool,
}

impl<I: Iterator> Flagged<I> {
    pub(crate) fn new(iter: I) -> Self {
        Flagged {
            iter,
            peeked: None,
            primed: false,
        }
    }
}

impl<I: Iterator> Iterator for Flagged<I> {
    type Item = (I::Item, bool);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.primed {
            self.peeked = self.iter.next();
            self.primed = true;
        }
        let current = self.peeked.take()?;
        self.peeked = self.iter.next();
        Some((current, self.peeked.is_none()))
    }
}

/// The sequence-binding operator.
///
/// Runs `make_second` after every upstream result, at the position
/// `head.length()` past `base`. `base` must stand where the upstream matches
/// begin; for the final upstream result it is moved and reused, for every
/// earlier result a remainder branch is split off and owned by the stage,
/// released when the stage's matches are exhausted or dropped.
///
/// A provisional (look-ahead) upstream result is settled here: accepted as
/// soon as the downstream stage produces its first match, rejected when the
/// stage stays empty. An accepted boundary ends the upstream exploration.
pub(crate) fn then<'p, T, A, B, O, M, J>(
    first: Matches<'p, A>,
    base: Cursor<T>,
    make_second: M,
    join: J,
) -> Matches<'p, O>
where
    T: Clone + 'static,
    A: 'p,
    B: 'p,
    O: 'p,
    M: Fn(&Cursor<T>) -> Matches<'p, B> + 'p,
    J: Fn(&A, B) -> O + 'p,
{
    Box::new(ThenIter {
        upstream: Flagged::new(first),
        base,
        make_second,
        join,
        stage: None,
        done: false,
    })
}

struct ThenIter<'p, T: Clone + 'static, A, B, M, J> {
    upstream: Flagged<Matches<'p, A>>,
    base: Cursor<T>,
    make_second: M,
    join: J,
    stage: Option<Stage<'p, T, A, B>>,
    done: bool,
}

struct Stage<'p, T: Clone + 'static, A, B> {
    head: Parsed<A>,
    inner: Matches<'p, B>,
    /// Owned remainder branch; `None` when the (moved) base is being reused.
    _remainder: Option<Cursor<T>>,
    produced_any: bool,
}

impl<'p, T, A, B, O, M, J> Iterator for ThenIter<'p, T, A, B, M, J>
where
    T: Clone + 'static,
    M: Fn(&Cursor<T>) -> Matches<'p, B> + 'p,
    J: Fn(&A, B) -> O + 'p,
{
    type Item = Parsed<O>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(stage) = self.stage.as_mut() {
                match stage.inner.next() {
                    Some(second) => {
                        if !stage.produced_any {
                            stage.produced_any = true;
                            // Downstream matched: commit a provisional head.
                            stage.head.settle(true);
                        }
                        let head = &stage.head;
                        let join = &self.join;
                        let combined = second
                            .map(|value| join(head.value(), value))
                            .grow(head.length());
                        return Some(combined);
                    }
                    None => {
                        let committed = stage.head.is_look_ahead() && stage.produced_any;
                        if !stage.produced_any {
                            // No downstream match at this boundary: tell the
                            // producer to try the next one.
                            stage.head.settle(false);
                        }
                        self.stage = None;
                        if committed {
                            // An accepted boundary ends the exploration.
                            self.done = true;
                            return None;
                        }
                        continue;
                    }
                }
            }
            let (head, is_last) = match self.upstream.next() {
                Some(item) => item,
                None => {
                    self.done = true;
                    return None;
                }
            };
            let stage = if is_last {
                // Final upstream result: move the current branch in place.
                if self.base.move_by(head.length() as isize).is_err() {
                    self.done = true;
                    return None;
                }
                let inner = (self.make_second)(&self.base);
                Stage {
                    head,
                    inner,
                    _remainder: None,
                    produced_any: false,
                }
            } else {
                let remainder = match self.base.branch() {
                    Ok(remainder) => remainder,
                    Err(_) => {
                        self.done = true;
                        return None;
                    }
                };
                if remainder.move_by(head.length() as isize).is_err() {
                    self.done = true;
                    return None;
                }
                let inner = (self.make_second)(&remainder);
                Stage {
                    head,
                    inner,
                    _remainder: Some(remainder),
                    produced_any: false,
                }
            };
            self.stage = Some(stage);
        }
    }
}

/// Helper trait for the [`all()`] combinator: a tuple of parsers applied at
/// consecutive positions, producing the tuple of their values.
pub trait Sequence<T: Clone + 'static> {
    /// Tuple of the child output types.
    type Output;

    /// Apply the children left to right, starting each where the previous
    /// match ended.
    fn parse_seq<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output>;

    /// The reading primitive of the first child.
    fn first_next(&self) -> Result<Next<T>, Error>;
}

impl<T, P1> Sequence<T> for (P1,)
where
    T: Clone + 'static,
    P1: Parser<T>,
{
    type Output = (P1::Output,);

    fn parse_seq<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        Box::new(self.0.parse(cursor).map(|r| r.map(|value| (value,))))
    }

    fn first_next(&self) -> Result<Next<T>, Error> {
        self.0.next()
    }
}

impl<T, P1, P2> Sequence<T> for (P1, P2)
where
    T: Clone + 'static,
    P1: Parser<T>,
    P2: Parser<T>,
    P1::Output: Clone,
{
    type Output = (P1::Output, P2::Output);

    fn parse_seq<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let base = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let first = self.0.parse(&base);
        then(first, base, move |c| self.1.parse(c), |a, b| (a.clone(), b))
    }

    fn first_next(&self) -> Result<Next<T>, Error> {
        self.0.next()
    }
}

impl<T, P1, P2, P3> Sequence<T> for (P1, P2, P3)
where
    T: Clone + 'static,
    P1: Parser<T>,
    P2: Parser<T>,
    P3: Parser<T>,
    P1::Output: Clone,
    P2::Output: Clone,
{
    type Output = (P1::Output, P2::Output, P3::Output);

    fn parse_seq<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let b1 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let m1 = self.0.parse(&b1);
        let pair = then(m1, b1, move |c| self.1.parse(c), |a, b| (a.clone(), b));
        let b2 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        then(
            pair,
            b2,
            move |c| self.2.parse(c),
            |ab, c| (ab.0.clone(), ab.1.clone(), c),
        )
    }

    fn first_next(&self) -> Result<Next<T>, Error> {
        self.0.next()
    }
}

impl<T, P1, P2, P3, P4> Sequence<T> for (P1, P2, P3, P4)
where
    T: Clone + 'static,
    P1: Parser<T>,
    P2: Parser<T>,
    P3: Parser<T>,
    P4: Parser<T>,
    P1::Output: Clone,
    P2::Output: Clone,
    P3::Output: Clone,
{
    type Output = (P1::Output, P2::Output, P3::Output, P4::Output);

    fn parse_seq<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let b1 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let m1 = self.0.parse(&b1);
        let pair = then(m1, b1, move |c| self.1.parse(c), |a, b| (a.clone(), b));
        let b2 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let triple = then(
            pair,
            b2,
            move |c| self.2.parse(c),
            |ab, c| (ab.0.clone(), ab.1.clone(), c),
        );
        let b3 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        then(
            triple,
            b3,
            move |c| self.3.parse(c),
            |abc, d| (abc.0.clone(), abc.1.clone(), abc.2.clone(), d),
        )
    }

    fn first_next(&self) -> Result<Next<T>, Error> {
        self.0.next()
    }
}

impl<T, P1, P2, P3, P4, P5> Sequence<T> for (P1, P2, P3, P4, P5)
where
    T: Clone + 'static,
    P1: Parser<T>,
    P2: Parser<T>,
    P3: Parser<T>,
    P4: Parser<T>,
    P5: Parser<T>,
    P1::Output: Clone,
    P2::Output: Clone,
    P3::Output: Clone,
    P4::Output: Clone,
{
    type Output = (
        P1::Output,
        P2::Output,
        P3::Output,
        P4::Output,
        P5::Output,
    );

    fn parse_seq<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let b1 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let m1 = self.0.parse(&b1);
        let pair = then(m1, b1, move |c| self.1.parse(c), |a, b| (a.clone(), b));
        let b2 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let triple = then(
            pair,
            b2,
            move |c| self.2.parse(c),
            |ab, c| (ab.0.clone(), ab.1.clone(), c),
        );
        let b3 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        let quad = then(
            triple,
            b3,
            move |c| self.3.parse(c),
            |abc, d| (abc.0.clone(), abc.1.clone(), abc.2.clone(), d),
        );
        let b4 = match cursor.branch() {
            Ok(base) => base,
            Err(_) => return no_matches(),
        };
        then(
            quad,
            b4,
            move |c| self.4.parse(c),
            |abcd, e| {
                (
                    abcd.0.clone(),
                    abcd.1.clone(),
                    abcd.2.clone(),
                    abcd.3.clone(),
                    e,
                )
            },
        )
    }

    fn first_next(&self) -> Result<Next<T>, Error> {
        self.0.next()
    }
}

/// Apply a tuple of parsers in order, each starting where the previous match
/// ended, producing the tuple of their values with the summed length.
///
/// # Example
///
/// ```rust
/// use rewind::combinator::all;
/// use rewind::cursor::Cursor;
/// use rewind::token::eq;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("abc".chars());
/// let rule = all((eq('a'), eq('b'), eq('c')));
/// let matched = rule.parse(&cursor).next().unwrap();
/// assert_eq!(matched.value(), &('a', 'b', 'c'));
/// assert_eq!(matched.length(), 3);
/// ```
pub fn all<T: Clone + 'static, P: Sequence<T>>(parsers: P) -> All<P> {
    All { parsers }
}

/// Implementation of [`all`].
pub struct All<P> {
    parsers: P,
}

impl<T: Clone + 'static, P: Sequence<T>> Parser<T> for All<P> {
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parsers.first_next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        self.parsers.parse_seq(cursor)
    }
}

/// Helper trait for the [`any()`] combinator: a tuple of parsers with a
/// common output type, tried in order at the same position.
pub trait Choice<T: Clone + 'static> {
    /// The common child output type.
    type Output;

    /// Try the children in order; the first with at least one match wins and
    /// its whole match sequence is emitted.
    fn parse_choice<'p>(
        &'p self,
        cursor: &Cursor<T>,
        chosen: &'p Cell<Option<usize>>,
    ) -> Matches<'p, Self::Output>
    where
        Self::Output: 'p;

    /// The reading primitive of the child at `index`.
    fn next_of(&self, index: usize) -> Result<Next<T>, Error>;
}

macro_rules! choice_parser (
    ($($parser:ident $idx:tt),+) => (
        impl<T, V, $($parser),+> Choice<T> for ($($parser,)+)
        where
            T: Clone + 'static,
            $($parser: Parser<T, Output = V>),+
        {
            type Output = V;

            fn parse_choice<'p>(
                &'p self,
                cursor: &Cursor<T>,
                chosen: &'p Cell<Option<usize>>,
            ) -> Matches<'p, V>
            where
                V: 'p,
                Self::Output: 'p,
            {
                let alias = cursor.alias();
                let mut committed: Option<Matches<'p, V>> = None;
                let mut exhausted = false;
                Box::new(iter::from_fn(move || loop {
                    if let Some(matches) = committed.as_mut() {
                        return matches.next();
                    }
                    if exhausted {
                        return None;
                    }
                    exhausted = true;
                    $(
                        let mut matches = self.$idx.parse(&alias);
                        if let Some(first) = matches.next() {
                            chosen.set(Some($idx));
                            committed = Some(matches);
                            return Some(first);
                        }
                    )+
                }))
            }

            fn next_of(&self, index: usize) -> Result<Next<T>, Error> {
                match index {
                    $($idx => self.$idx.next(),)+
                    _ => Err(Error::Unsupported("choice index out of range")),
                }
            }
        }
    );
);

choice_parser!(P0 0);
choice_parser!(P0 0, P1 1);
choice_parser!(P0 0, P1 1, P2 2);
choice_parser!(P0 0, P1 1, P2 2, P3 3);
choice_parser!(P0 0, P1 1, P2 2, P3 3, P4 4);
choice_parser!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5);
choice_parser!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6);

/// Ordered choice: try each parser at the same position, in order, and
/// commit to the first that yields at least one match.
///
/// The committed child also becomes the [`next`][Parser::next] source of the
/// choice; asking before any child has matched is an error.
///
/// # Example
///
/// ```rust
/// use rewind::combinator::any;
/// use rewind::cursor::Cursor;
/// use rewind::token::literal;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("ab".chars());
/// let rule = any((literal("abc".chars()), literal("ab".chars())));
/// let matched = rule.parse(&cursor).next().unwrap();
/// assert_eq!(matched.value(), &vec!['a', 'b']);
/// assert_eq!(matched.length(), 2);
/// ```
pub fn any<T: Clone + 'static, P: Choice<T>>(parsers: P) -> Any<P> {
    Any {
        parsers,
        chosen: Cell::new(None),
    }
}

/// Implementation of [`any`].
pub struct Any<P> {
    parsers: P,
    chosen: Cell<Option<usize>>,
}

impl<T: Clone + 'static, P: Choice<T>> Parser<T> for Any<P> {
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        match self.chosen.get() {
            Some(index) => self.parsers.next_of(index),
            None => Err(Error::Unsupported("no choice branch has matched yet")),
        }
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        self.parsers.parse_choice(cursor, &self.chosen)
    }
}

/// Helper trait converting a homogeneous tuple of parsers into the dynamic
/// child list of [`all_unordered`].
pub trait Alternatives<T: Clone + 'static> {
    /// The common child output type.
    type Output;

    /// Erase the tuple into a shared child list.
    fn into_children(self) -> Vec<Rc<dyn Parser<T, Output = Self::Output>>>;
}

macro_rules! alternatives (
    ($($parser:ident $idx:tt),+) => (
        impl<T, V, $($parser),+> Alternatives<T> for ($($parser,)+)
        where
            T: Clone + 'static,
            $($parser: Parser<T, Output = V> + 'static),+
        {
            type Output = V;

            fn into_children(self) -> Vec<Rc<dyn Parser<T, Output = V>>> {
                vec![$(Rc::new(self.$idx) as Rc<dyn Parser<T, Output = V>>),+]
            }
        }
    );
);

alternatives!(P0 0);
alternatives!(P0 0, P1 1);
alternatives!(P0 0, P1 1, P2 2);
alternatives!(P0 0, P1 1, P2 2, P3 3);
alternatives!(P0 0, P1 1, P2 2, P3 3, P4 4);
alternatives!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5);
alternatives!(P0 0, P1 1, P2 2, P3 3, P4 4, P5 5, P6 6);

/// Unordered sequence: match every child exactly once, in whatever order
/// the input presents them, at consecutive positions.
///
/// At each step the still-unmatched children are tried in declaration order
/// and the first to match is removed from the candidate set; the value is
/// the sequence of child values in the order they matched.
///
/// # Example
///
/// ```rust
/// use rewind::combinator::all_unordered;
/// use rewind::cursor::Cursor;
/// use rewind::token::eq;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("ba".chars());
/// let rule = all_unordered((eq('a'), eq('b')));
/// let matched = rule.parse(&cursor).next().unwrap();
/// assert_eq!(matched.value(), &vec!['b', 'a']);
/// assert_eq!(matched.length(), 2);
/// ```
pub fn all_unordered<T, A>(parsers: A) -> AllUnordered<T, A::Output>
where
    T: Clone + 'static,
    A: Alternatives<T>,
{
    AllUnordered {
        children: parsers.into_children(),
        chosen: Cell::new(None),
    }
}

/// Implementation of [`all_unordered`].
pub struct AllUnordered<T, V> {
    children: Vec<Rc<dyn Parser<T, Output = V>>>,
    chosen: Cell<Option<usize>>,
}

impl<T, V> Parser<T> for AllUnordered<T, V>
where
    T: Clone + 'static,
    V: Clone + 'static,
{
    type Output = Vec<V>;

    fn next(&self) -> Result<Next<T>, Error> {
        match self.chosen.get() {
            Some(index) => self.children[index].next(),
            None => Err(Error::Unsupported("no alternative has matched yet")),
        }
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Vec<V>> {
        let used = vec![false; self.children.len()];
        unordered_step(self, used, cursor.alias(), true)
    }
}

/// One step of the unordered sequence: ordered choice over the
/// still-unmatched children, then recurse past the committed match.
fn unordered_step<'p, T, V>(
    owner: &'p AllUnordered<T, V>,
    used: Vec<bool>,
    at: Cursor<T>,
    top: bool,
) -> Matches<'p, Vec<V>>
where
    T: Clone + 'static,
    V: Clone + 'static,
{
    let mut inner: Option<Matches<'p, Vec<V>>> = None;
    let mut tried = false;
    Box::new(iter::from_fn(move || loop {
        if let Some(matches) = inner.as_mut() {
            return matches.next();
        }
        if tried {
            return None;
        }
        tried = true;
        if used.iter().all(|used| *used) {
            inner = Some(Box::new(iter::once(Parsed::new(Vec::new(), 0))));
            continue;
        }
        let mut commit = None;
        for index in 0..owner.children.len() {
            if used[index] {
                continue;
            }
            let mut matches = owner.children[index].parse(&at);
            if let Some(first) = matches.next() {
                commit = Some((index, first, matches));
                break;
            }
        }
        let (index, first, rest) = match commit {
            Some(commit) => commit,
            None => return None,
        };
        if top {
            owner.chosen.set(Some(index));
        }
        let mut used_next = used.clone();
        used_next[index] = true;
        let base = match at.branch() {
            Ok(base) => base,
            Err(_) => return None,
        };
        let upstream: Matches<'p, V> = Box::new(iter::once(first).chain(rest));
        inner = Some(then(
            upstream,
            base,
            move |c| unordered_step(owner, used_next.clone(), c.alias(), false),
            |head: &V, tail: Vec<V>| {
                let mut out = Vec::with_capacity(tail.len() + 1);
                out.push(head.clone());
                out.extend(tail);
                out
            },
        ));
    }))
}
