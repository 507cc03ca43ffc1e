//! End-to-end drives of whole grammars over whole inputs.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rewind::combinator::{all, all_unordered, any};
use rewind::cursor::Cursor;
use rewind::driver::ParserStart;
use rewind::error::Error;
use rewind::token::{any_token, eq, literal};
use rewind::Parser;

#[test]
fn scalar_sequence() {
    let start = ParserStart::new(|_next| all((eq('a'), eq('b'), eq('c'))));
    let cursor = Cursor::buffered("abcabc".chars());
    let matches: Vec<_> = start.parse(&cursor).unwrap().collect();

    assert_eq!(matches.len(), 2);
    for matched in &matches {
        assert_eq!(matched.value(), &('a', 'b', 'c'));
        assert_eq!(matched.length(), 3);
    }
    assert!(cursor.at_end_of_sequence());
}

#[test]
fn ordered_choice() {
    let start = ParserStart::new(|_next| any((literal("abc".chars()), literal("ab".chars()))));
    let cursor = Cursor::buffered("ab".chars());
    let matches: Vec<_> = start.parse(&cursor).unwrap().collect();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].value(), &vec!['a', 'b']);
    assert_eq!(matches[0].length(), 2);
}

#[test]
fn unordered_sequence() {
    let start = ParserStart::new(|_next| all_unordered((eq('a'), eq('b'))));
    let cursor = Cursor::buffered("ba".chars());
    let matches: Vec<_> = start.parse(&cursor).unwrap().collect();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].value(), &vec!['b', 'a']);
    assert_eq!(matches[0].length(), 2);
}

#[test]
fn lazy_quantifier_with_look_ahead() {
    let start =
        ParserStart::new(|_next| any_token::<char>().non_greedy_until(literal("END".chars())));
    let cursor = Cursor::buffered("xyENDyEND".chars());
    let matches: Vec<_> = start.parse(&cursor).unwrap().collect();

    assert_eq!(matches.len(), 2);
    // The produced value is the prefix; the length spans the terminator, so
    // the driver resumes after "END".
    assert_eq!(matches[0].value(), &vec!['x', 'y']);
    assert_eq!(matches[0].length(), 5);
    assert_eq!(matches[1].value(), &vec!['y']);
    assert_eq!(matches[1].length(), 4);
    assert!(cursor.at_end_of_sequence());
}

#[test]
fn branch_truncation_follows_the_drive() {
    let start = ParserStart::new(|_next| all((literal("hello".chars()), literal("abc".chars()))));
    let cursor = Cursor::<char>::options()
        .truncate_while_branched()
        .replayable(|| "helloabc".chars());
    let _connection = cursor.connect().unwrap();

    let matches: Vec<_> = start.parse(&cursor).unwrap().collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].length(), 8);

    // Every branch is gone and the drive consumed the whole input: the
    // buffer head has caught up and nothing is retained.
    assert_eq!(cursor.first_element_index(), 8);
    assert_eq!(cursor.buffered_len(), 0);
}

type DynGrammar = Box<dyn Parser<char, Output = char>>;

#[test]
fn reentrant_parse_fails_fast_and_recovers() {
    let target: Rc<RefCell<Option<Cursor<char>>>> = Rc::new(RefCell::new(None));
    let observed: Rc<Cell<Option<Error>>> = Rc::new(Cell::new(None));

    let start: Rc<ParserStart<char, DynGrammar>> = Rc::new_cyclic(|weak| {
        let weak: Weak<ParserStart<char, DynGrammar>> = weak.clone();
        let target = target.clone();
        let observed = observed.clone();
        ParserStart::new(move |_next| -> DynGrammar {
            let weak = weak.clone();
            let target = target.clone();
            let observed = observed.clone();
            Box::new(eq('a').map(move |c| {
                // Re-enter the same driver mid-iteration.
                let guard = target.borrow();
                if let (Some(start), Some(cursor)) = (weak.upgrade(), guard.as_ref()) {
                    match start.parse(cursor) {
                        Err(error) => observed.set(Some(error)),
                        Ok(_) => observed.set(None),
                    }
                }
                c
            }))
        })
    });

    let cursor = Cursor::buffered("a".chars());
    *target.borrow_mut() = Some(cursor.branch().unwrap());

    let matches: Vec<_> = start.parse(&cursor).unwrap().collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(observed.take(), Some(Error::Reentrant));

    // The failed inner call left the driver consistent: once the outer
    // parse finished, a fresh one succeeds.
    let fresh = Cursor::buffered("a".chars());
    *target.borrow_mut() = None;
    assert_eq!(start.parse(&fresh).unwrap().count(), 1);
}

#[test]
fn results_are_deterministic_across_runs() {
    let run = || {
        let start = ParserStart::new(|_next| {
            any((
                literal("ab".chars()).map(|_| 1u8),
                any_token::<char>().map(|_| 0u8),
            ))
        });
        let cursor = Cursor::buffered("abxab".chars());
        start
            .parse(&cursor)
            .unwrap()
            .map(|m| (*m.value(), m.length()))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
    assert_eq!(run(), vec![(1, 2), (0, 1), (1, 2)]);
}

#[test]
fn a_grammar_that_never_matches_terminates() {
    let start = ParserStart::new(|_next| eq('z'));
    let cursor = Cursor::replayable(|| "aaaaaaaa".chars());
    let _connection = cursor.connect().unwrap();
    let matches: Vec<_> = start.parse(&cursor).unwrap().collect();
    assert!(matches.is_empty());
    assert!(cursor.at_end_of_sequence());
}

#[test]
fn the_next_primitive_reads_single_elements() {
    let start = ParserStart::new(|next| next);
    let cursor = Cursor::buffered("abc".chars());
    let values: Vec<char> = start
        .parse(&cursor)
        .unwrap()
        .map(|m| *m.value())
        .collect();
    assert_eq!(values, vec!['a', 'b', 'c']);
}
