//! # Error management
//!
//! Errors are deliberately rare in this crate: a parser that does not match
//! expresses that as an **empty match stream**, never as an [`Error`]. The
//! `Error` type covers the remaining conditions:
//!
//! - Misuse of the engine (re-entrant [`ParserStart::parse`][crate::driver::ParserStart::parse]
//!   calls, operating on a disposed [`Cursor`][crate::cursor::Cursor], moving a
//!   forward-only cursor backwards)
//! - Structural misuse of a grammar (a [`deferred`][crate::combinator::deferred]
//!   rule without a body, asking a choice for its [`next`][crate::Parser::next]
//!   source before any branch has matched)
//! - An error raised by the input source itself, which the cursor buffers and
//!   replays to every current and future subscriber

use crate::lib::std::fmt;
use crate::lib::std::rc::Rc;

/// The failure conditions of the engine.
///
/// Cloneable so that a buffered upstream error ([`Error::Source`]) can be
/// replayed to any number of subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// [`ParserStart::parse`][crate::driver::ParserStart::parse] was called
    /// while a parse on the same instance was still in progress.
    Reentrant,
    /// The cursor (or a handle derived from it) was used after
    /// [`dispose`][crate::cursor::Cursor::dispose].
    Disposed,
    /// A move would take the cursor before the earliest element it still
    /// retains: a negative delta on a forward-only cursor, or any move below
    /// index zero.
    Backward,
    /// The operation is not available in the parser's current state.
    Unsupported(&'static str),
    /// Parsing failed outright at the given source index.
    Parse {
        /// Index of the source element at which no rule matched.
        offset: usize,
    },
    /// The input source terminated with an error.
    ///
    /// Stored as a buffered notification by the cursor and replayed, so the
    /// message is reference counted rather than owned per observer.
    Source(Rc<str>),
}

impl Error {
    /// Wrap an upstream failure message as a replayable source error.
    pub fn source(message: impl AsRef<str>) -> Self {
        Error::Source(Rc::from(message.as_ref()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Reentrant => write!(f, "parse already in progress on this instance"),
            Error::Disposed => write!(f, "cursor has been disposed"),
            Error::Backward => write!(f, "cursor cannot move before its retained elements"),
            Error::Unsupported(what) => write!(f, "unsupported operation: {}", what),
            Error::Parse { offset } => write!(f, "no rule matched at source index {}", offset),
            Error::Source(message) => write!(f, "input source failed: {}", message),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_compare_by_content() {
        assert_eq!(Error::source("boom"), Error::source("boom"));
        assert_ne!(Error::source("boom"), Error::source("bust"));
    }

    #[test]
    fn display_names_the_offset() {
        let rendered = crate::lib::std::string::ToString::to_string(&Error::Parse { offset: 7 });
        assert_eq!(rendered, "no rule matched at source index 7");
    }
}
