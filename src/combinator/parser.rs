//! Value-projection adapters built by the [`Parser`] provided methods

use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::parser::{Matches, Next, Parser};

/// Implementation of [`Parser::map`].
pub struct Map<P, F> {
    parser: P,
    f: F,
}

impl<P, F> Map<P, F> {
    pub(crate) fn new(parser: P, f: F) -> Self {
        Map { parser, f }
    }
}

impl<T, P, F, U> Parser<T> for Map<P, F>
where
    T: Clone + 'static,
    P: Parser<T>,
    F: Fn(P::Output) -> U,
{
    type Output = U;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, U> {
        // The projected result keeps its kind: a provisional match stays
        // provisional and still reports acceptance to the producer.
        Box::new(
            self.parser
                .parse(cursor)
                .map(move |result| result.map(|value| (self.f)(value))),
        )
    }
}

/// Implementation of [`Parser::filter`].
pub struct Filter<P, F> {
    parser: P,
    pred: F,
}

impl<P, F> Filter<P, F> {
    pub(crate) fn new(parser: P, pred: F) -> Self {
        Filter { parser, pred }
    }
}

impl<T, P, F> Parser<T> for Filter<P, F>
where
    T: Clone + 'static,
    P: Parser<T>,
    F: Fn(&P::Output) -> bool,
{
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        Box::new(self.parser.parse(cursor).filter(move |result| {
            let keep = (self.pred)(result.value());
            if !keep {
                // A filtered-out boundary counts as rejected.
                result.settle(false);
            }
            keep
        }))
    }
}
