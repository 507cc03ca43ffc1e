//! The replaying cursor
//!
//! [`Cursor`] is a positional view over a lazy input sequence. It buffers
//! elements as they arrive so they can be **replayed**: any number of
//! [branches][Cursor::branch] explore the input from independent positions
//! while sharing one buffer, and [subscriptions][Cursor::subscribe] observe
//! the notification stream from their handle's position onwards.
//!
//! Buffered notifications live in an arena indexed by a monotonically
//! increasing source index; every handle is an integer position into that
//! arena. A forward-only cursor additionally **truncates** the buffer head
//! once no live handle can reach the truncated indices, which is what keeps
//! memory bounded when parsing long inputs.
//!
//! ```rust
//! use rewind::cursor::Cursor;
//! use rewind::notice::{Demand, Notice};
//!
//! let cursor = Cursor::buffered("ab".chars());
//! let mut seen = Vec::new();
//! let shared = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
//! let sink = shared.clone();
//! let _sub = cursor
//!     .subscribe(Demand::Unbounded, move |notice| sink.borrow_mut().push(notice))
//!     .unwrap();
//! seen.extend(shared.borrow().iter().cloned());
//! assert_eq!(
//!     seen,
//!     vec![Notice::Token('a'), Notice::Token('b'), Notice::End],
//! );
//! ```


use crate::error::Error;
use crate::lib::std::boxed::Box;
use crate::lib::std::cell::{Cell, RefCell};
use crate::lib::std::collections::VecDeque;
use crate::lib::std::fmt;
use crate::lib::std::rc::Rc;
use crate::lib::std::vec::Vec;
use crate::notice::{Demand, Notice};

type SourceIter<T> = Box<dyn Iterator<Item = Result<T, Error>>>;
type SourceFactory<T> = Box<dyn Fn() -> SourceIter<T>>;

/// A position slot in the shared arena. Slot 0 is the root handle; branches
/// occupy further slots and record their parent so disposal can cascade.
struct Slot {
    position: usize,
    parent: Option<usize>,
    live: bool,
}

struct SubEntry<T> {
    /// Next source index this subscription expects.
    next_index: Cell<usize>,
    /// Values still owed. `None` is unbounded.
    remaining: Cell<Option<usize>>,
    active: Cell<bool>,
    observer: RefCell<Box<dyn FnMut(Notice<T>)>>,
}

struct Shared<T> {
    /// Value notices for `[first_index ..= latest]`, then one terminator
    /// once the sequence has stopped.
    buffer: VecDeque<Notice<T>>,
    first_index: usize,
    latest: Option<usize>,
    stopped: bool,
    disposed: bool,
    forward_only: bool,
    synchronized: bool,
    truncate_while_branched: bool,
    slots: Vec<Slot>,
    subs: Vec<Rc<SubEntry<T>>>,
    factory: Option<SourceFactory<T>>,
    active_source: Option<SourceIter<T>>,
    connected: bool,
}

/// A notice queued for delivery once the shared state is no longer borrowed.
/// Observer callbacks are free to re-enter the cursor.
type Mailbox<T> = Vec<(Rc<SubEntry<T>>, Notice<T>)>;

impl<T> Shared<T> {
    /// Index one past the last known element; the end position once stopped.
    fn end_index(&self) -> usize {
        self.latest.map_or(0, |latest| latest + 1)
    }

    fn value_count(&self) -> usize {
        match self.latest {
            Some(latest) if latest >= self.first_index => latest - self.first_index + 1,
            _ => 0,
        }
    }

    fn live_branch_count(&self) -> usize {
        self.slots.iter().skip(1).filter(|s| s.live).count()
    }

    /// Drop buffered values no live handle can reach any more.
    fn truncate(&mut self) {
        if !self.forward_only || self.disposed {
            return;
        }
        if self.live_branch_count() > 0 && !self.truncate_while_branched {
            return;
        }
        let lowest = self
            .slots
            .iter()
            .filter(|slot| slot.live)
            .map(|slot| slot.position)
            .min();
        let lowest = match lowest {
            Some(lowest) => lowest,
            None => return,
        };
        if lowest <= self.first_index {
            return;
        }
        let drop = (lowest - self.first_index).min(self.value_count());
        for _ in 0..drop {
            self.buffer.pop_front();
        }
        self.first_index = lowest;
        self.check_invariants();
    }

    fn check_invariants(&self) {
        for slot in self.slots.iter().filter(|slot| slot.live) {
            debug_assert!(slot.position >= self.first_index || !self.forward_only);
            if self.stopped {
                debug_assert!(slot.position <= self.end_index());
            }
        }
        if let Some(latest) = self.latest {
            if self.first_index <= latest {
                debug_assert!(self.buffer.len() >= latest - self.first_index + 1);
            }
        }
    }
}

impl<T: Clone> Shared<T> {
    fn terminator(&self) -> Option<Notice<T>> {
        if self.stopped {
            self.buffer.back().filter(|n| n.is_terminator()).cloned()
        } else {
            None
        }
    }

    /// Record one arriving element and queue deliveries for every
    /// subscription that has reached it.
    fn receive(&mut self, token: T, mailbox: &mut Mailbox<T>) {
        debug_assert!(!self.stopped);
        let index = self.latest.map_or(0, |latest| latest + 1);
        self.latest = Some(index);
        if self.first_index <= index {
            self.buffer.push_back(Notice::Token(token.clone()));
        }
        for sub in &self.subs {
            if !sub.active.get() || sub.next_index.get() > index {
                continue;
            }
            sub.next_index.set(index + 1);
            match sub.remaining.get() {
                Some(left) => {
                    let left = left - 1;
                    sub.remaining.set(Some(left));
                    if left == 0 {
                        // Satisfied subscriptions are retired before the
                        // final value goes out, then completed.
                        sub.active.set(false);
                        mailbox.push((sub.clone(), Notice::Token(token.clone())));
                        mailbox.push((sub.clone(), Notice::End));
                        continue;
                    }
                }
                None => {}
            }
            mailbox.push((sub.clone(), Notice::Token(token.clone())));
        }
        self.subs.retain(|sub| sub.active.get());
        self.check_invariants();
    }

    // The single stop transition: records the terminator, clamps every
    // position into `[.., end_index]`, and completes all subscriptions.
    fn stop(&mut self, terminator: Notice<T>, mailbox: &mut Mailbox<T>) {
        debug_assert!(terminator.is_terminator());
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.active_source = None;
        self.buffer.push_back(terminator.clone());
        let end = self.end_index();
        for slot in &mut self.slots {
            if slot.live && slot.position > end {
                slot.position = end;
            }
        }
        if self.first_index > end {
            self.first_index = end;
        }
        for sub in self.subs.drain(..) {
            if sub.active.get() {
                sub.active.set(false);
                mailbox.push((sub, terminator.clone()));
            }
        }
        self.check_invariants();
    }
}

/// A positional, replaying view over an input sequence.
///
/// Obtained from [`Cursor::buffered`], [`Cursor::replayable`], or
/// [`Cursor::options`]; further handles come from [`Cursor::branch`]. All
/// handles of one cursor share the buffer; each tracks its own position.
///
/// The type is `!Send + !Sync`: a cursor belongs to the thread that created
/// it, which is what makes the replay machinery safe without locking.
pub struct Cursor<T> {
    shared: Rc<RefCell<Shared<T>>>,
    slot: usize,
    owned: bool,
}

/// Handle returned by [`Cursor::connect`]. Dropping it stops pulling from
/// the source and resets the cursor for a fresh connection.
pub struct Connection<T> {
    shared: Option<Rc<RefCell<Shared<T>>>>,
}

/// Handle returned by [`Cursor::subscribe`]. Dropping it cancels the
/// subscription.
pub struct Subscription<T> {
    shared: Rc<RefCell<Shared<T>>>,
    entry: Rc<SubEntry<T>>,
}

/// Construction-time configuration of a [`Cursor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorOptions {
    forward_only: bool,
    truncate_while_branched: bool,
    synchronized: bool,
}

impl CursorOptions {
    /// Start from the defaults: bidirectional, no truncation, unsynchronized.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cursor refuses to move to a lower index, which allows it to
    /// truncate buffered elements behind the slowest live handle.
    pub fn forward_only(mut self) -> Self {
        self.forward_only = true;
        self
    }

    /// Truncate even while branches exist (instead of postponing until the
    /// last branch is released). Implies [`forward_only`][Self::forward_only].
    pub fn truncate_while_branched(mut self) -> Self {
        self.forward_only = true;
        self.truncate_while_branched = true;
        self
    }

    /// Mark the cursor as serialized. Every operation already runs under the
    /// single interior cell; the flag is observable via
    /// [`Cursor::is_synchronized`].
    pub fn synchronized(mut self) -> Self {
        self.synchronized = true;
        self
    }

    /// A cursor over input that is already fully available. The sequence is
    /// terminated immediately; [`Cursor::connect`] is not required.
    pub fn buffered<T: Clone + 'static>(self, input: impl IntoIterator<Item = T>) -> Cursor<T> {
        let cursor = self.empty::<T>(None);
        {
            let mut shared = cursor.shared.borrow_mut();
            let mut mailbox = Vec::new();
            for token in input {
                shared.receive(token, &mut mailbox);
            }
            shared.stop(Notice::End, &mut mailbox);
            debug_assert!(mailbox.is_empty());
        }
        cursor
    }

    /// A cursor over a cold source: `source` is invoked on every
    /// [`Cursor::connect`] and the resulting iterator is pulled on demand.
    pub fn replayable<T, F, I>(self, source: F) -> Cursor<T>
    where
        T: Clone + 'static,
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        self.fallible(move || source().into_iter().map(Ok))
    }

    /// Like [`replayable`][Self::replayable] for sources that can fail: an
    /// `Err` item terminates the sequence with a buffered error notice.
    pub fn fallible<T, F, I>(self, source: F) -> Cursor<T>
    where
        T: Clone + 'static,
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = Result<T, Error>>,
        I::IntoIter: 'static,
    {
        let factory: SourceFactory<T> =
            Box::new(move || Box::new(source().into_iter()) as SourceIter<T>);
        self.empty(Some(factory))
    }

    fn empty<T: Clone + 'static>(self, factory: Option<SourceFactory<T>>) -> Cursor<T> {
        let shared = Shared {
            buffer: VecDeque::new(),
            first_index: 0,
            latest: None,
            stopped: false,
            disposed: false,
            forward_only: self.forward_only,
            synchronized: self.synchronized,
            truncate_while_branched: self.truncate_while_branched,
            slots: vec![Slot {
                position: 0,
                parent: None,
                live: true,
            }],
            subs: Vec::new(),
            factory,
            active_source: None,
            connected: false,
        };
        Cursor {
            shared: Rc::new(RefCell::new(shared)),
            slot: 0,
            owned: true,
        }
    }
}

impl<T: Clone + 'static> Cursor<T> {
    /// [`CursorOptions::buffered`] with default options.
    pub fn buffered(input: impl IntoIterator<Item = T>) -> Self {
        CursorOptions::new().buffered(input)
    }

    /// [`CursorOptions::replayable`] with default options.
    pub fn replayable<F, I>(source: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        CursorOptions::new().replayable(source)
    }

    /// Configure a cursor before construction.
    pub fn options() -> CursorOptions {
        CursorOptions::new()
    }

    fn guard(&self) -> Result<(), Error> {
        if self.shared.borrow().disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Position at which the next element will be read.
    pub fn current_index(&self) -> usize {
        self.shared.borrow().slots[self.slot].position
    }

    /// Highest source index produced so far, `None` before the first element.
    pub fn latest_index(&self) -> Option<usize> {
        self.shared.borrow().latest
    }

    /// Source index of the first element still buffered. Always 0 unless the
    /// cursor is forward-only and has truncated.
    pub fn first_element_index(&self) -> usize {
        self.shared.borrow().first_index
    }

    /// Whether backward moves are rejected.
    pub fn is_forward_only(&self) -> bool {
        self.shared.borrow().forward_only
    }

    /// Whether the cursor was constructed with
    /// [`CursorOptions::synchronized`].
    pub fn is_synchronized(&self) -> bool {
        self.shared.borrow().synchronized
    }

    /// Whether the input has terminated (successfully or with an error).
    pub fn is_sequence_terminated(&self) -> bool {
        self.shared.borrow().stopped
    }

    /// Whether this handle stands one past the final element of a
    /// terminated sequence.
    pub fn at_end_of_sequence(&self) -> bool {
        let shared = self.shared.borrow();
        shared.stopped && shared.slots[self.slot].position == shared.end_index()
    }

    /// Number of value notices currently buffered. Mostly useful to observe
    /// truncation.
    pub fn buffered_len(&self) -> usize {
        self.shared.borrow().value_count()
    }

    /// Number of live branches derived from this cursor's arena.
    pub fn branch_count(&self) -> usize {
        self.shared.borrow().live_branch_count()
    }

    /// Start pulling from a cold source. Idempotent; the second and later
    /// calls return an inert handle while the first connection is live.
    /// Dropping the returned [`Connection`] stops pulling and resets the
    /// cursor. Cursors over buffered input do not need to connect.
    pub fn connect(&self) -> Result<Connection<T>, Error> {
        self.guard()?;
        let mut shared = self.shared.borrow_mut();
        if shared.factory.is_none() || shared.connected {
            return Ok(Connection { shared: None });
        }
        let source = shared.factory.as_ref().map(|make| make());
        shared.active_source = source;
        shared.connected = true;
        Ok(Connection {
            shared: Some(self.shared.clone()),
        })
    }

    /// Adjust this handle's position by `delta` elements.
    ///
    /// Forward-only cursors reject negative deltas; every cursor rejects a
    /// move below its first retained element. Moving past the latest known
    /// element is allowed; if the sequence later stops short, the position
    /// is clamped to the end.
    pub fn move_by(&self, delta: isize) -> Result<(), Error> {
        self.guard()?;
        let mut shared = self.shared.borrow_mut();
        let position = shared.slots[self.slot].position;
        if delta < 0 {
            if shared.forward_only {
                return Err(Error::Backward);
            }
            let back = delta.unsigned_abs();
            if back > position || position - back < shared.first_index {
                return Err(Error::Backward);
            }
        }
        let mut target = if delta < 0 {
            position - delta.unsigned_abs()
        } else {
            position + delta as usize
        };
        if shared.stopped {
            target = target.min(shared.end_index());
        }
        shared.slots[self.slot].position = target;
        if shared.forward_only && delta > 0 {
            shared.truncate();
        }
        Ok(())
    }

    /// Drain the remaining input and position this handle at the end of the
    /// sequence. Used by the driver to force termination.
    pub fn move_to_end(&self) -> Result<(), Error> {
        self.guard()?;
        loop {
            {
                let shared = self.shared.borrow();
                if shared.stopped {
                    break;
                }
                if !shared.connected {
                    return Err(Error::Unsupported(
                        "cannot reach the end of an unconnected cursor",
                    ));
                }
            }
            self.pull_one();
        }
        let mut shared = self.shared.borrow_mut();
        let end = shared.end_index();
        shared.slots[self.slot].position = end;
        if shared.forward_only {
            shared.truncate();
        }
        Ok(())
    }

    /// Derive a new handle at this handle's position.
    ///
    /// The branch shares the buffer and participates in truncation
    /// decisions; dropping it releases its position. The parent's position
    /// is unaffected by anything the branch does.
    pub fn branch(&self) -> Result<Cursor<T>, Error> {
        self.guard()?;
        let mut shared = self.shared.borrow_mut();
        let position = shared.slots[self.slot].position;
        let slot = shared.slots.len();
        shared.slots.push(Slot {
            position,
            parent: Some(self.slot),
            live: true,
        });
        Ok(Cursor {
            shared: self.shared.clone(),
            slot,
            owned: true,
        })
    }

    /// A non-owning handle onto the same position slot. Used by lazy match
    /// iterators that must outlive the `&Cursor` they were built from.
    pub(crate) fn alias(&self) -> Cursor<T> {
        Cursor {
            shared: self.shared.clone(),
            slot: self.slot,
            owned: false,
        }
    }

    /// Register an observer for the notification stream starting at this
    /// handle's position.
    ///
    /// Everything already buffered from the position onwards is replayed
    /// synchronously before `subscribe` returns; later notifications are
    /// pushed as they arrive. A [`Demand::Bounded`] subscription completes
    /// with [`Notice::End`] after delivering its count; if the sequence is
    /// stopped and cannot satisfy the demand, the sequence terminator is
    /// delivered instead.
    pub fn subscribe(
        &self,
        demand: Demand,
        observer: impl FnMut(Notice<T>) + 'static,
    ) -> Result<Subscription<T>, Error> {
        self.guard()?;
        let entry = Rc::new(SubEntry {
            next_index: Cell::new(0),
            remaining: Cell::new(match demand {
                Demand::Bounded(n) => Some(n),
                Demand::Unbounded => None,
            }),
            active: Cell::new(false),
            observer: RefCell::new(Box::new(observer)),
        });

        // Pull enough of a connected cold source to satisfy a bounded
        // demand. This is the engine's only suspension point.
        if let Demand::Bounded(n) = demand {
            if n > 0 {
                let target = self
                    .current_index()
                    .saturating_add(n)
                    .saturating_sub(1);
                self.ensure(target);
            }
        }

        let mut mailbox: Mailbox<T> = Vec::new();
        {
            let mut shared = self.shared.borrow_mut();
            let position = shared.slots[self.slot].position;
            entry.next_index.set(position);

            if entry.remaining.get() == Some(0) {
                mailbox.push((entry.clone(), Notice::End));
            } else {
                // Snapshot the replayable span before delivering anything:
                // observers may mutate the subscription list mid-replay.
                let mut replay: Vec<Notice<T>> = Vec::new();
                if let Some(latest) = shared.latest {
                    let mut index = position;
                    while index <= latest {
                        if index >= shared.first_index {
                            replay.push(shared.buffer[index - shared.first_index].clone());
                        }
                        if let Some(left) = entry.remaining.get() {
                            if replay.len() == left {
                                break;
                            }
                        }
                        index += 1;
                    }
                }
                let replayed = replay.len();
                entry.next_index.set(position + replayed);
                if let Some(left) = entry.remaining.get() {
                    entry.remaining.set(Some(left - replayed));
                }
                for notice in replay {
                    mailbox.push((entry.clone(), notice));
                }
                if entry.remaining.get() == Some(0) {
                    mailbox.push((entry.clone(), Notice::End));
                } else if let Some(terminator) = shared.terminator() {
                    mailbox.push((entry.clone(), terminator));
                } else {
                    entry.active.set(true);
                    shared.subs.push(entry.clone());
                }
            }
        }
        deliver(mailbox);
        Ok(Subscription {
            shared: self.shared.clone(),
            entry,
        })
    }

    /// Read (without consuming) the element at this handle's position.
    pub(crate) fn token_at_current(&self) -> Result<Option<T>, Error> {
        let captured: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
        let sink = captured.clone();
        let _sub = self.subscribe(Demand::Bounded(1), move |notice| {
            if let Notice::Token(token) = notice {
                *sink.borrow_mut() = Some(token);
            }
        })?;
        let token = captured.borrow_mut().take();
        Ok(token)
    }

    /// Drop all subscriptions, clear the buffer, and detach every branch.
    /// All further operations on any handle fail with [`Error::Disposed`].
    ///
    /// On a branch handle this releases only the branch (and any branches
    /// derived from it), exactly as dropping the handle would.
    pub fn dispose(&self) {
        let mut shared = self.shared.borrow_mut();
        if self.slot == 0 {
            dispose_all(&mut shared);
        } else {
            release_branch(&mut shared, self.slot);
        }
    }

    /// Pull from the connected source until index `target` is known or the
    /// sequence stops.
    fn ensure(&self, target: usize) {
        loop {
            {
                let shared = self.shared.borrow();
                if shared.stopped || !shared.connected {
                    return;
                }
                if let Some(latest) = shared.latest {
                    if latest >= target {
                        return;
                    }
                }
            }
            if !self.pull_one() {
                return;
            }
        }
    }

    /// Pull exactly one item from the source and dispatch it. Returns false
    /// once the source is exhausted or detached.
    fn pull_one(&self) -> bool {
        let mut mailbox: Mailbox<T> = Vec::new();
        let progressed;
        {
            let mut shared = self.shared.borrow_mut();
            if shared.stopped || !shared.connected {
                return false;
            }
            let pulled = shared.active_source.as_mut().and_then(|source| source.next());
            match pulled {
                Some(Ok(token)) => {
                    shared.receive(token, &mut mailbox);
                    progressed = true;
                }
                Some(Err(error)) => {
                    shared.stop(Notice::Error(error), &mut mailbox);
                    progressed = false;
                }
                None => {
                    shared.stop(Notice::End, &mut mailbox);
                    progressed = false;
                }
            }
        }
        deliver(mailbox);
        progressed
    }
}

/// Deliver queued notices with the shared state released, so observers can
/// re-enter the cursor.
fn deliver<T>(mailbox: Mailbox<T>) {
    for (entry, notice) in mailbox {
        let mut observer = entry.observer.borrow_mut();
        observer(notice);
    }
}

/// Full teardown: root disposal.
fn dispose_all<T>(shared: &mut Shared<T>) {
    if shared.disposed {
        return;
    }
    shared.disposed = true;
    shared.connected = false;
    shared.active_source = None;
    shared.buffer.clear();
    shared.subs.clear();
    for slot in &mut shared.slots {
        slot.live = false;
    }
}

/// Release one branch slot and every branch derived from it, then see
/// whether the buffer head can advance.
fn release_branch<T>(shared: &mut Shared<T>, slot: usize) {
    if shared.disposed || !shared.slots[slot].live {
        return;
    }
    let mut doomed = vec![slot];
    while let Some(dead) = doomed.pop() {
        shared.slots[dead].live = false;
        let children: Vec<usize> = shared
            .slots
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.live && entry.parent == Some(dead))
            .map(|(index, _)| index)
            .collect();
        doomed.extend(children);
    }
    shared.truncate();
}

impl<T> Drop for Cursor<T> {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        let mut shared = self.shared.borrow_mut();
        if self.slot == 0 {
            dispose_all(&mut shared);
        } else {
            release_branch(&mut shared, self.slot);
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("Cursor")
            .field("slot", &self.slot)
            .field("position", &shared.slots[self.slot].position)
            .field("first_element_index", &shared.first_index)
            .field("latest_index", &shared.latest)
            .field("stopped", &shared.stopped)
            .field("disposed", &shared.disposed)
            .finish()
    }
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        let shared = match self.shared.take() {
            Some(shared) => shared,
            None => return,
        };
        let mut shared = shared.borrow_mut();
        if shared.disposed || !shared.connected {
            return;
        }
        // Disconnecting resets the cursor so the cold source can be
        // replayed from scratch by a later connect.
        shared.connected = false;
        shared.active_source = None;
        shared.buffer.clear();
        shared.first_index = 0;
        shared.latest = None;
        shared.stopped = false;
        shared.subs.clear();
        for slot in &mut shared.slots {
            slot.position = 0;
        }
    }
}

impl<T> Subscription<T> {
    /// Cancel the subscription. Equivalent to dropping the handle.
    pub fn dispose(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.entry.active.set(false);
        if let Ok(mut shared) = self.shared.try_borrow_mut() {
            shared.subs.retain(|sub| sub.active.get());
        }
    }
}
