//! The top-level parse driver
//!
//! [`ParserStart`] owns a grammar (compiled once from a factory that binds
//! it to the shared [`Next`] primitive) and repeatedly applies it against a
//! cursor, advancing past each match, until the end of the sequence.
//!
//! ```rust
//! use rewind::combinator::all;
//! use rewind::cursor::Cursor;
//! use rewind::driver::ParserStart;
//! use rewind::token::eq;
//!
//! let start = ParserStart::new(|_next| all((eq('a'), eq('b'), eq('c'))));
//! let cursor = Cursor::buffered("abcabc".chars());
//! let values: Vec<_> = start
//!     .parse(&cursor)
//!     .unwrap()
//!     .map(|m| *m.value())
//!     .collect();
//! assert_eq!(values, vec![('a', 'b', 'c'), ('a', 'b', 'c')]);
//! ```

use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::lib::std::cell::Cell;
use crate::lib::std::rc::Rc;
use crate::parser::{Matches, Next, Parser};
use crate::results::Parsed;
use once_cell::unsync::OnceCell;

/// A driver-level event, reported to the injected [`Sink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// The grammar is being applied at `index`.
    PassStarted {
        /// Cursor position of the pass.
        index: usize,
    },
    /// A match was emitted.
    Matched {
        /// Position the match started at.
        index: usize,
        /// Source elements the match covered.
        length: usize,
    },
    /// A provisional result was accepted and skipped.
    LookAhead {
        /// Position the result started at.
        index: usize,
    },
    /// A pass produced nothing (or consumed nothing); the driver forced the
    /// cursor to the end of the sequence.
    ForcedEnd {
        /// Position at which parsing gave up.
        index: usize,
    },
    /// The drive reached the end of the sequence.
    Completed,
}

/// Observer for driver-level events.
///
/// Injected per [`ParserStart`]; there is no process-wide sink state.
pub trait Sink {
    /// Record one event.
    fn record(&self, event: DriverEvent);
}

/// The default sink: discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn record(&self, _event: DriverEvent) {}
}

type GrammarFactory<T, P> = Box<dyn Fn(Next<T>) -> P>;

/// The top-level driver: applies a grammar repeatedly against a cursor and
/// emits the matches.
///
/// Instances are reusable but not re-entrant: a second [`parse`][ParserStart::parse]
/// while one is in progress fails with [`Error::Reentrant`].
pub struct ParserStart<T, P> {
    build: GrammarFactory<T, P>,
    grammar: OnceCell<P>,
    parsing: Cell<bool>,
    sink: Rc<dyn Sink>,
}

impl<T, P> ParserStart<T, P>
where
    T: Clone + 'static,
    P: Parser<T>,
{
    /// Create a driver from a grammar factory.
    ///
    /// The factory receives the shared cursor-reading primitive and runs
    /// exactly once, on the first parse.
    pub fn new(build: impl Fn(Next<T>) -> P + 'static) -> Self {
        Self::with_sink(build, Rc::new(NoopSink))
    }

    /// [`new`][ParserStart::new] with an injected diagnostic sink.
    pub fn with_sink(build: impl Fn(Next<T>) -> P + 'static, sink: Rc<dyn Sink>) -> Self {
        ParserStart {
            build: Box::new(build),
            grammar: OnceCell::new(),
            parsing: Cell::new(false),
            sink,
        }
    }

    /// Drive the grammar over `cursor` until the end of its sequence.
    ///
    /// Provisional (look-ahead) results are accepted and skipped; every
    /// plain match is emitted and the cursor advanced by its length. A pass
    /// with no match (or one that consumed nothing) forces the cursor to
    /// the end so the drive always terminates.
    pub fn parse<'p>(&'p self, cursor: &Cursor<T>) -> Result<Emissions<'p, T, P>, Error> {
        if self.parsing.replace(true) {
            return Err(Error::Reentrant);
        }
        let grammar = self.grammar.get_or_init(|| (self.build)(Next::new()));
        Ok(Emissions {
            grammar,
            cursor: cursor.alias(),
            pass: None,
            had_match: false,
            pass_start: 0,
            started: false,
            done: false,
            failed_at: None,
            flag: &self.parsing,
            sink: self.sink.clone(),
        })
    }
}

/// The lazy match stream of one [`ParserStart::parse`] call.
///
/// Dropping it (fully consumed or not) ends the parse and returns the
/// driver to idle.
pub struct Emissions<'p, T: Clone + 'static, P: Parser<T>> {
    grammar: &'p P,
    cursor: Cursor<T>,
    pass: Option<Matches<'p, P::Output>>,
    had_match: bool,
    pass_start: usize,
    started: bool,
    done: bool,
    failed_at: Option<usize>,
    flag: &'p Cell<bool>,
    sink: Rc<dyn Sink>,
}

impl<'p, T: Clone + 'static, P: Parser<T>> Emissions<'p, T, P> {
    /// Where the drive gave up, if a pass produced no match at all.
    ///
    /// Failure is still expressed as the empty (remainder of the) match
    /// stream; this is the index it happened at, for error reporting.
    pub fn failure(&self) -> Option<Error> {
        self.failed_at.map(|offset| Error::Parse { offset })
    }

    fn force_end(&mut self) {
        if !self.had_match && self.failed_at.is_none() {
            self.failed_at = Some(self.cursor.current_index());
        }
        self.sink.record(DriverEvent::ForcedEnd {
            index: self.cursor.current_index(),
        });
        if self.cursor.move_to_end().is_err() {
            // Nothing left to drain; without an end to reach, stop here.
            self.done = true;
        }
    }
}

impl<'p, T: Clone + 'static, P: Parser<T>> Iterator for Emissions<'p, T, P> {
    type Item = Parsed<P::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let Some(pass) = self.pass.as_mut() else {
                // The grammar always gets a first pass, even on an empty
                // sequence: a rule admitting the empty match still emits it.
                if self.started && self.cursor.at_end_of_sequence() {
                    self.done = true;
                    self.sink.record(DriverEvent::Completed);
                    return None;
                }
                self.started = true;
                self.pass_start = self.cursor.current_index();
                self.had_match = false;
                self.sink.record(DriverEvent::PassStarted {
                    index: self.pass_start,
                });
                self.pass = Some(self.grammar.parse(&self.cursor));
                continue;
            };
            match pass.next() {
                Some(result) if result.is_look_ahead() => {
                    // The driver accepts every boundary it is offered.
                    result.settle(true);
                    self.sink.record(DriverEvent::LookAhead {
                        index: self.pass_start,
                    });
                }
                Some(result) => {
                    self.had_match = true;
                    self.sink.record(DriverEvent::Matched {
                        index: self.pass_start,
                        length: result.length(),
                    });
                    if !self.cursor.at_end_of_sequence()
                        && self.cursor.move_by(result.length() as isize).is_err()
                    {
                        self.done = true;
                    }
                    return Some(result);
                }
                None => {
                    self.pass = None;
                    if !self.had_match {
                        self.force_end();
                    } else if self.cursor.current_index() == self.pass_start
                        && !self.cursor.at_end_of_sequence()
                    {
                        // The pass matched but consumed nothing; forcing
                        // termination is the only way to make progress.
                        self.force_end();
                    }
                }
            }
        }
    }
}

impl<'p, T: Clone + 'static, P: Parser<T>> Drop for Emissions<'p, T, P> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::all;
    use crate::lib::std::cell::RefCell;
    use crate::lib::std::vec::Vec;
    use crate::token::{eq, literal};

    #[test]
    fn drives_the_grammar_across_the_whole_input() {
        let start = ParserStart::new(|_next| all((eq('a'), eq('b'), eq('c'))));
        let cursor = Cursor::buffered("abcabc".chars());
        let matches: Vec<_> = start.parse(&cursor).unwrap().collect();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].value(), &('a', 'b', 'c'));
        assert_eq!(matches[0].length(), 3);
        assert!(cursor.at_end_of_sequence());
    }

    #[test]
    fn a_second_parse_while_active_is_reentrant() {
        let start = ParserStart::new(|_next| eq('a'));
        let cursor = Cursor::buffered("a".chars());
        let emissions = start.parse(&cursor).unwrap();
        assert!(matches!(start.parse(&cursor), Err(Error::Reentrant)));
        drop(emissions);
        // Back to idle: a fresh parse works.
        assert_eq!(start.parse(&cursor).unwrap().count(), 1);
    }

    #[test]
    fn empty_source_yields_nothing_and_returns_to_idle() {
        let start = ParserStart::new(|_next| eq('a'));
        let cursor = Cursor::buffered(core::iter::empty::<char>());
        assert_eq!(start.parse(&cursor).unwrap().count(), 0);
        assert!(start.parse(&cursor).is_ok());
    }

    #[test]
    fn sequential_parses_produce_identical_streams() {
        let start = ParserStart::new(|_next| literal("ab".chars()));
        let first: Vec<_> = start
            .parse(&Cursor::buffered("abab".chars()))
            .unwrap()
            .collect();
        let second: Vec<_> = start
            .parse(&Cursor::buffered("abab".chars()))
            .unwrap()
            .collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn a_failing_pass_forces_termination() {
        let start = ParserStart::new(|_next| eq('b'));
        let cursor = Cursor::replayable(|| "aaaa".chars());
        let _connection = cursor.connect().unwrap();
        let mut emissions = start.parse(&cursor).unwrap();
        assert!(emissions.next().is_none());
        assert!(cursor.at_end_of_sequence());
        assert_eq!(emissions.failure(), Some(Error::Parse { offset: 0 }));
    }

    #[test]
    fn a_zero_width_grammar_terminates_after_one_match() {
        let start = ParserStart::new(|_next| crate::combinator::opt(eq('b')));
        let cursor = Cursor::buffered("aaa".chars());
        // opt matches with length 0 at position 0; the driver emits it once
        // and then refuses to spin.
        let matches: Vec<_> = start.parse(&cursor).unwrap().collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].length(), 0);
    }

    #[test]
    fn empty_match_on_empty_input_is_emitted_exactly_once() {
        let start = ParserStart::new(|_next| crate::combinator::opt(eq('a')));
        let cursor = Cursor::buffered(core::iter::empty::<char>());
        let matches: Vec<_> = start.parse(&cursor).unwrap().collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].length(), 0);
    }

    #[test]
    fn look_aheads_are_accepted_and_skipped() {
        let start = ParserStart::new(|_next| crate::Parser::non_greedy(eq('a'), 1));
        let cursor = Cursor::buffered("aa".chars());
        let matches: Vec<_> = start.parse(&cursor).unwrap().collect();
        // Only provisional results were produced, so nothing is emitted and
        // the drive still terminates.
        assert!(matches.is_empty());
        assert!(cursor.at_end_of_sequence());
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<DriverEvent>>,
    }

    impl Sink for Recorder {
        fn record(&self, event: DriverEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    #[test]
    fn the_sink_sees_every_driver_event() {
        let recorder = Rc::new(Recorder::default());
        let start = ParserStart::with_sink(|_next| eq('a'), recorder.clone());
        let cursor = Cursor::buffered("ab".chars());
        assert_eq!(start.parse(&cursor).unwrap().count(), 1);

        let events = recorder.events.borrow();
        assert_eq!(events[0], DriverEvent::PassStarted { index: 0 });
        assert_eq!(events[1], DriverEvent::Matched { index: 0, length: 1 });
        // 'b' never matches: the second pass gives up and the drive ends.
        assert!(events.contains(&DriverEvent::ForcedEnd { index: 1 }));
        assert_eq!(events.last(), Some(&DriverEvent::Completed));
    }
}
