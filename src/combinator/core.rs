use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::lib::std::iter;
use crate::lib::std::rc::Rc;
use crate::parser::{Matches, Next, Parser};
use crate::results::Parsed;
use once_cell::unsync::OnceCell;

/// Make a parser optional: its matches wrapped in `Some`, or a single empty
/// match of length 0 when it has none.
///
/// `opt` never fails.
///
/// # Example
///
/// ```rust
/// use rewind::combinator::opt;
/// use rewind::cursor::Cursor;
/// use rewind::token::eq;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("b".chars());
/// let matched = opt(eq('a')).parse(&cursor).next().unwrap();
/// assert_eq!(matched.value(), &None);
/// assert_eq!(matched.length(), 0);
/// ```
pub fn opt<T: Clone + 'static, P: Parser<T>>(parser: P) -> Opt<P> {
    Opt { parser }
}

/// Implementation of [`opt`].
pub struct Opt<P> {
    parser: P,
}

impl<T: Clone + 'static, P: Parser<T>> Parser<T> for Opt<P> {
    type Output = Option<P::Output>;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let mut inner = self.parser.parse(cursor);
        let mut matched = false;
        let mut done = false;
        Box::new(iter::from_fn(move || {
            if done {
                return None;
            }
            match inner.next() {
                Some(result) => {
                    matched = true;
                    Some(result.map(Some))
                }
                None => {
                    done = true;
                    if matched {
                        None
                    } else {
                        Some(Parsed::new(None, 0))
                    }
                }
            }
        }))
    }
}

/// Zero-width positive look-ahead: match the parser without consuming input.
///
/// Every match is reported with length 0.
pub fn peek<T: Clone + 'static, P: Parser<T>>(parser: P) -> Peek<P> {
    Peek { parser }
}

/// Implementation of [`peek`].
pub struct Peek<P> {
    parser: P,
}

impl<T: Clone + 'static, P: Parser<T>> Parser<T> for Peek<P> {
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        Box::new(
            self.parser
                .parse(cursor)
                .map(|result| result.with_length(0)),
        )
    }
}

/// Zero-width negative look-ahead: one empty match iff the parser has none.
///
/// # Example
///
/// ```rust
/// use rewind::combinator::not;
/// use rewind::cursor::Cursor;
/// use rewind::token::eq;
/// use rewind::Parser;
///
/// let cursor = Cursor::buffered("b".chars());
/// assert_eq!(not(eq('a')).parse(&cursor).count(), 1);
/// assert_eq!(not(eq('b')).parse(&cursor).count(), 0);
/// ```
pub fn not<T: Clone + 'static, P: Parser<T>>(parser: P) -> Not<P> {
    Not { parser }
}

/// Implementation of [`not`].
pub struct Not<P> {
    parser: P,
}

impl<T: Clone + 'static, P: Parser<T>> Parser<T> for Not<P> {
    type Output = ();

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, ()> {
        let mut inner = self.parser.parse(cursor);
        let mut done = false;
        Box::new(iter::from_fn(move || {
            if done {
                return None;
            }
            done = true;
            match inner.next() {
                Some(result) => {
                    // The observed boundary is being negated away.
                    result.settle(false);
                    None
                }
                None => Some(Parsed::new((), 0)),
            }
        }))
    }
}

/// Defer construction of a parser to its first use.
///
/// The thunk runs at most once; the built parser is cached for the lifetime
/// of the wrapper. For rules that reference themselves, see [`recursive`].
pub fn deferred<F, P>(make: F) -> Deferred<F, P>
where
    F: Fn() -> P,
{
    Deferred {
        make,
        body: OnceCell::new(),
    }
}

/// Implementation of [`deferred`].
pub struct Deferred<F, P> {
    make: F,
    body: OnceCell<P>,
}

impl<F, P> Deferred<F, P>
where
    F: Fn() -> P,
{
    fn resolved(&self) -> &P {
        self.body.get_or_init(|| (self.make)())
    }
}

impl<T, F, P> Parser<T> for Deferred<F, P>
where
    T: Clone + 'static,
    F: Fn() -> P,
    P: Parser<T>,
{
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        self.resolved().next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        self.resolved().parse(cursor)
    }
}

/// A rule that may reference itself.
///
/// `build` receives a handle to the rule being defined and returns its body;
/// the handle may be embedded anywhere except the leftmost position (left
/// recursion is not supported and will recurse without consuming).
///
/// # Example
///
/// ```rust
/// use rewind::combinator::{any, recursive};
/// use rewind::cursor::Cursor;
/// use rewind::token::eq;
/// use rewind::Parser;
///
/// // as := 'a' as | 'b'
/// let rule = recursive(|rule| {
///     any((
///         rewind::combinator::all((eq('a'), rule)).map(|(_, n)| n + 1),
///         eq('b').map(|_| 0usize),
///     ))
/// });
/// let cursor = Cursor::buffered("aab".chars());
/// let matched = rule.parse(&cursor).next().unwrap();
/// assert_eq!(matched.value(), &2);
/// assert_eq!(matched.length(), 3);
/// ```
pub fn recursive<T, V, P>(build: impl FnOnce(Rc<Recursive<T, V>>) -> P) -> Rc<Recursive<T, V>>
where
    T: Clone + 'static,
    V: 'static,
    P: Parser<T, Output = V> + 'static,
{
    let rule = Rc::new(Recursive {
        body: OnceCell::new(),
    });
    let body = build(rule.clone());
    let _ = rule.body.set(Rc::new(body) as Rc<dyn Parser<T, Output = V>>);
    rule
}

/// Implementation of [`recursive`].
pub struct Recursive<T, V> {
    body: OnceCell<Rc<dyn Parser<T, Output = V>>>,
}

impl<T, V> Recursive<T, V> {
    /// A handle with no body yet; only useful for probing the error paths.
    #[cfg(test)]
    pub(crate) fn unresolved() -> Self {
        Recursive {
            body: OnceCell::new(),
        }
    }
}

impl<T, V> Parser<T> for Recursive<T, V>
where
    T: Clone + 'static,
    V: 'static,
{
    type Output = V;

    fn next(&self) -> Result<Next<T>, Error> {
        match self.body.get() {
            Some(body) => body.next(),
            None => Err(Error::Unsupported("recursive rule has no body yet")),
        }
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, V> {
        match self.body.get() {
            Some(body) => body.parse(cursor),
            None => panic!("recursive rule used before `recursive` returned its handle"),
        }
    }
}
