//! Parser execution tracing

#[cfg(feature = "debug")]
mod internals;

use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::fmt;
use crate::parser::{Matches, Next, Parser};

#[cfg(all(feature = "debug", not(feature = "std")))]
compile_error!("`debug` requires `std`");

/// Trace the execution of a parser.
///
/// With the `debug` feature enabled, applying the wrapped parser writes an
/// indented event stream to stderr: one line when the rule is entered and
/// one per match as the lazy sequence is pulled. Without the feature this
/// is a passthrough.
#[cfg_attr(not(feature = "debug"), allow(unused_variables))]
pub fn trace<P>(name: impl fmt::Display, parser: P) -> Trace<P> {
    Trace {
        parser,
        #[cfg(feature = "debug")]
        name: name.to_string(),
        #[cfg(feature = "debug")]
        calls: crate::lib::std::cell::Cell::new(0),
    }
}

/// Implementation of [`trace`].
pub struct Trace<P> {
    parser: P,
    #[cfg(feature = "debug")]
    name: crate::lib::std::string::String,
    #[cfg(feature = "debug")]
    calls: crate::lib::std::cell::Cell<usize>,
}

impl<T, P> Parser<T> for Trace<P>
where
    T: Clone + 'static,
    P: Parser<T>,
{
    type Output = P::Output;

    fn next(&self) -> Result<Next<T>, Error> {
        self.parser.next()
    }

    #[cfg(not(feature = "debug"))]
    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        self.parser.parse(cursor)
    }

    #[cfg(feature = "debug")]
    fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Matches<'p, Self::Output> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        let depth = internals::Depth::new();
        internals::start(*depth, &self.name, call, cursor.current_index());
        crate::lib::std::boxed::Box::new(internals::TraceMatches::new(
            self.parser.parse(cursor),
            self.name.clone(),
            depth,
        ))
    }
}
