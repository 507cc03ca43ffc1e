//! Parse results
//!
//! A parser that matches yields one [`Parsed`] per alternative: the produced
//! value plus the number of source elements the match covered. Failure is the
//! absence of results, not a value.
//!
//! A **look-ahead** result is provisional: the producing rule does not yet
//! know whether the boundary it chose will be accepted downstream. The engine
//! answers through the result's one-shot [`Signal`], settled exactly once
//! with `true` (commit this boundary) or `false` (try the next one).

use crate::lib::std::boxed::Box;
use crate::lib::std::cell::{Cell, RefCell};
use crate::lib::std::fmt;
use crate::lib::std::rc::Rc;
use crate::lib::std::vec::Vec;

/// One-shot acceptance signal attached to a look-ahead result.
///
/// Settling is idempotent: the first call records the outcome and notifies
/// every registered observer; later calls are ignored.
#[derive(Clone)]
pub struct Signal {
    inner: Rc<SignalInner>,
}

struct SignalInner {
    outcome: Cell<Option<bool>>,
    observers: RefCell<Vec<Box<dyn FnMut(bool)>>>,
}

impl Signal {
    /// An unsettled signal.
    pub fn new() -> Self {
        Signal {
            inner: Rc::new(SignalInner {
                outcome: Cell::new(None),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A signal that settles `parent` with whatever outcome it receives.
    ///
    /// This is how [`Parsed::derived`] keeps the acceptance signal flowing
    /// back to the original producer across value projections.
    pub fn chained(parent: &Signal) -> Self {
        let child = Signal::new();
        let parent = parent.clone();
        child.observe(move |accepted| parent.settle(accepted));
        child
    }

    /// The recorded outcome, if settled.
    #[inline]
    pub fn outcome(&self) -> Option<bool> {
        self.inner.outcome.get()
    }

    /// Record the outcome and fan it out to observers. First call wins.
    pub fn settle(&self, accepted: bool) {
        if self.inner.outcome.get().is_some() {
            return;
        }
        self.inner.outcome.set(Some(accepted));
        // Observers may register further observers on other signals, so the
        // list is drained outside the borrow.
        let mut observers = self.inner.observers.take();
        for observer in &mut observers {
            observer(accepted);
        }
    }

    /// Register an observer. Called immediately if already settled.
    pub fn observe(&self, mut observer: impl FnMut(bool) + 'static) {
        match self.inner.outcome.get() {
            Some(accepted) => observer(accepted),
            None => self.inner.observers.borrow_mut().push(Box::new(observer)),
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Signal::new()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("outcome", &self.inner.outcome.get())
            .finish()
    }
}

/// A successful match: the produced value and the match length in source
/// elements.
#[derive(Debug, Clone)]
pub struct Parsed<V> {
    value: V,
    length: usize,
    signal: Option<Signal>,
}

impl<V> Parsed<V> {
    /// A plain (committed) match.
    #[inline]
    pub fn new(value: V, length: usize) -> Self {
        Parsed {
            value,
            length,
            signal: None,
        }
    }

    /// A match producing an empty collection value, e.g. a repetition that
    /// matched zero times over `length` elements.
    #[inline]
    pub fn empty(length: usize) -> Self
    where
        V: Default,
    {
        Parsed::new(V::default(), length)
    }

    /// A provisional match awaiting downstream acceptance.
    pub fn look_ahead(value: V, length: usize) -> Self {
        Parsed {
            value,
            length,
            signal: Some(Signal::new()),
        }
    }

    /// A provisional match reporting acceptance through an existing signal.
    pub(crate) fn look_ahead_with(value: V, length: usize, signal: Signal) -> Self {
        Parsed {
            value,
            length,
            signal: Some(signal),
        }
    }

    /// The produced value.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consume the result, returning the value.
    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Number of source elements this match covers.
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Whether this match is provisional.
    #[inline]
    pub fn is_look_ahead(&self) -> bool {
        self.signal.is_some()
    }

    /// The acceptance signal of a look-ahead result.
    #[inline]
    pub fn signal(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    /// Settle a look-ahead result. No-op on a plain result.
    pub fn settle(&self, accepted: bool) {
        if let Some(signal) = &self.signal {
            signal.settle(accepted);
        }
    }

    /// A new result with this result's kind: plain stays plain, look-ahead
    /// yields a look-ahead whose acceptance chains back to this one.
    pub fn derived<U>(&self, value: U, length: usize) -> Parsed<U> {
        Parsed {
            value,
            length,
            signal: self.signal.as_ref().map(Signal::chained),
        }
    }

    /// Project the value, keeping length and look-ahead-ness.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            length: self.length,
            signal: self.signal,
        }
    }

    /// Extend the covered span, keeping value and kind.
    pub(crate) fn grow(mut self, extra: usize) -> Self {
        self.length += extra;
        self
    }

    /// Replace the covered span, keeping value and kind.
    pub(crate) fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Sequential composition: combined value, summed length.
    ///
    /// The joined result is provisional if either side still is, and settling
    /// it settles both sides.
    pub fn join<W, U>(self, other: Parsed<W>, f: impl FnOnce(V, W) -> U) -> Parsed<U> {
        let signal = match (&self.signal, &other.signal) {
            (None, None) => None,
            (Some(a), None) => Some(Signal::chained(a)),
            (None, Some(b)) => Some(Signal::chained(b)),
            (Some(a), Some(b)) => {
                let joined = Signal::chained(a);
                let b = b.clone();
                joined.observe(move |accepted| b.settle(accepted));
                Some(joined)
            }
        };
        Parsed {
            value: f(self.value, other.value),
            length: self.length + other.length,
            signal,
        }
    }
}

impl<V> Parsed<Vec<V>> {
    /// [`join`][Parsed::join] for sequence-valued results: concatenate the
    /// two value sequences.
    pub fn concat(self, other: Parsed<Vec<V>>) -> Parsed<Vec<V>> {
        self.join(other, |mut left, right| {
            left.extend(right);
            left
        })
    }
}

/// Results are equal when value and length agree **and** they are the same
/// kind: a look-ahead never equals a plain result.
impl<V: PartialEq> PartialEq for Parsed<V> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.length == other.length
            && self.signal.is_some() == other.signal.is_some()
    }
}

impl<V: Eq> Eq for Parsed<V> {}
