use super::*;

use crate::cursor::Cursor;
use crate::error::Error;
use crate::lib::std::rc::Rc;
use crate::lib::std::vec::Vec;
use crate::parser::Parser;
use crate::results::Parsed;
use crate::token::{any_token, eq, literal, one_of};

fn chars(input: &str) -> Cursor<char> {
    Cursor::buffered(input.chars())
}

#[test]
fn all_matches_children_in_order() {
    let cursor = chars("abcabc");
    let rule = all((eq('a'), eq('b'), eq('c')));
    let matched: Vec<_> = rule.parse(&cursor).collect();
    assert_eq!(matched, vec![Parsed::new(('a', 'b', 'c'), 3)]);
}

#[test]
fn all_fails_when_any_child_fails() {
    let cursor = chars("abx");
    let rule = all((eq('a'), eq('b'), eq('c')));
    assert_eq!(rule.parse(&cursor).count(), 0);
}

#[test]
fn all_does_not_move_the_cursor() {
    let cursor = chars("abc");
    let rule = all((eq('a'), eq('b')));
    assert_eq!(rule.parse(&cursor).count(), 1);
    assert_eq!(cursor.current_index(), 0);
}

#[test]
fn singleton_all_is_the_child_up_to_wrapping() {
    let cursor = chars("a");
    let wrapped: Vec<_> = all((eq('a'),)).parse(&cursor).collect();
    let bare: Vec<_> = eq('a').parse(&cursor).collect();
    assert_eq!(wrapped.len(), bare.len());
    assert_eq!(wrapped[0].value().0, *bare[0].value());
    assert_eq!(wrapped[0].length(), bare[0].length());
}

#[test]
fn all_is_associative_in_value_and_length() {
    let cursor = chars("abc");
    let flat = all((eq('a'), eq('b'), eq('c')));
    let right = all((eq('a'), all((eq('b'), eq('c')))));
    let left = all((all((eq('a'), eq('b'))), eq('c')));

    let flat = flat.parse(&cursor).next().unwrap();
    let right = right.parse(&cursor).next().unwrap();
    let left = left.parse(&cursor).next().unwrap();

    assert_eq!(flat.value(), &('a', 'b', 'c'));
    assert_eq!(right.value(), &('a', ('b', 'c')));
    assert_eq!(left.value(), &(('a', 'b'), 'c'));
    assert_eq!(flat.length(), 3);
    assert_eq!(right.length(), 3);
    assert_eq!(left.length(), 3);
}

#[test]
fn all_sequences_committed_choices() {
    let first = any((literal("ab".chars()), literal("a".chars())));
    let second = any((literal("ba".chars()), literal("b".chars())));
    let cursor = chars("abba");
    let rule = all((first, second));
    let matched: Vec<_> = rule.parse(&cursor).collect();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].value().0, vec!['a', 'b']);
    assert_eq!(matched[0].value().1, vec!['b', 'a']);
    assert_eq!(matched[0].length(), 4);
}

#[test]
fn any_commitment_is_not_revisited_by_a_sequence() {
    // "ab" commits the choice; the viable "a" + "b" split is never tried.
    let cursor = chars("ab");
    let rule = all((any((literal("ab".chars()), literal("a".chars()))), eq('b')));
    assert_eq!(rule.parse(&cursor).count(), 0);
}

#[test]
fn any_takes_the_first_matching_child() {
    let cursor = chars("ab");
    let rule = any((literal("abc".chars()), literal("ab".chars())));
    let matched: Vec<_> = rule.parse(&cursor).collect();
    assert_eq!(matched, vec![Parsed::new(vec!['a', 'b'], 2)]);
}

#[test]
fn any_of_one_is_the_child() {
    let cursor = chars("x");
    let direct: Vec<_> = eq('x').parse(&cursor).collect();
    let chosen: Vec<_> = any((eq('x'), eq('y'))).parse(&cursor).collect();
    assert_eq!(direct, chosen);
}

#[test]
fn any_reports_its_committed_branch_through_next() {
    let rule = any((eq('a'), eq('b')));
    assert_eq!(
        rule.next(),
        Err(Error::Unsupported("no choice branch has matched yet"))
    );
    let cursor = chars("b");
    assert_eq!(rule.parse(&cursor).count(), 1);
    assert!(rule.next().is_ok());
}

#[test]
fn all_unordered_accepts_either_order() {
    for (input, expected) in [("ab", vec!['a', 'b']), ("ba", vec!['b', 'a'])] {
        let cursor = chars(input);
        let rule = all_unordered((eq('a'), eq('b')));
        let matched: Vec<_> = rule.parse(&cursor).collect();
        assert_eq!(matched, vec![Parsed::new(expected, 2)]);
    }
}

#[test]
fn all_unordered_requires_every_child() {
    let cursor = chars("aa");
    let rule = all_unordered((eq('a'), eq('b')));
    assert_eq!(rule.parse(&cursor).count(), 0);
}

#[test]
fn all_unordered_three_children() {
    let cursor = chars("cab");
    let rule = all_unordered((eq('a'), eq('b'), eq('c')));
    let matched: Vec<_> = rule.parse(&cursor).collect();
    assert_eq!(matched, vec![Parsed::new(vec!['c', 'a', 'b'], 3)]);
}

#[test]
fn opt_wraps_matches_and_never_fails() {
    let cursor = chars("a");
    let some: Vec<_> = opt(eq('a')).parse(&cursor).collect();
    assert_eq!(some, vec![Parsed::new(Some('a'), 1)]);

    let none: Vec<_> = opt(eq('b')).parse(&cursor).collect();
    assert_eq!(none, vec![Parsed::new(None, 0)]);
}

#[test]
fn peek_matches_without_width() {
    let cursor = chars("ab");
    let matched: Vec<_> = peek(literal("ab".chars())).parse(&cursor).collect();
    assert_eq!(matched, vec![Parsed::new(vec!['a', 'b'], 0)]);
}

#[test]
fn not_inverts_matching() {
    let cursor = chars("b");
    assert_eq!(not(eq('a')).parse(&cursor).count(), 1);
    assert_eq!(not(eq('b')).parse(&cursor).count(), 0);
    // not(not(p)) matches iff p does.
    assert_eq!(not(not(eq('b'))).parse(&cursor).count(), 1);
    assert_eq!(not(not(eq('a'))).parse(&cursor).count(), 0);
}

#[test]
fn repeat_is_greedy_within_bounds() {
    let cursor = chars("aaab");
    let matched = repeat(0, None, eq('a')).parse(&cursor).next().unwrap();
    assert_eq!(matched.value(), &vec!['a', 'a', 'a']);
    assert_eq!(matched.length(), 3);

    let capped = repeat(0, 2, eq('a')).parse(&cursor).next().unwrap();
    assert_eq!(capped.value(), &vec!['a', 'a']);

    assert_eq!(repeat(4, None, eq('a')).parse(&cursor).count(), 0);

    let empty = repeat(0, None, eq('x')).parse(&cursor).next().unwrap();
    assert_eq!(empty.value(), &Vec::<char>::new());
    assert_eq!(empty.length(), 0);
}

#[test]
fn map_projects_values() {
    let cursor = chars("7");
    let digit = one_of(|c: &char| c.is_ascii_digit()).map(|c| c.to_digit(10).unwrap());
    let matched: Vec<_> = digit.parse(&cursor).collect();
    assert_eq!(matched, vec![Parsed::new(7u32, 1)]);
}

#[test]
fn filter_drops_unwanted_matches() {
    let cursor = chars("a");
    let vowel = any_token().filter(|c: &char| "aeiou".contains(*c));
    assert_eq!(vowel.parse(&cursor).count(), 1);

    let cursor = chars("z");
    let vowel = any_token().filter(|c: &char| "aeiou".contains(*c));
    assert_eq!(vowel.parse(&cursor).count(), 0);
}

#[test]
fn non_greedy_emits_provisional_boundaries() {
    let cursor = chars("xxx");
    let rule = any_token::<char>().non_greedy(0);
    let mut matches = rule.parse(&cursor);

    let first = matches.next().unwrap();
    assert!(first.is_look_ahead());
    assert_eq!(first.length(), 0);

    // Rejected boundaries extend by one element each.
    first.settle(false);
    let second = matches.next().unwrap();
    assert_eq!(second.length(), 1);
    assert_eq!(second.value(), &vec!['x']);

    // An accepted boundary commits the quantifier.
    second.settle(true);
    assert!(matches.next().is_none());
}

#[test]
fn non_greedy_until_finds_the_earliest_terminator() {
    let cursor = chars("xyENDrest");
    let rule = any_token::<char>().non_greedy_until(literal("END".chars()));
    let matched: Vec<_> = rule.parse(&cursor).collect();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].value(), &vec!['x', 'y']);
    // The match spans the terminator.
    assert_eq!(matched[0].length(), 5);
}

#[test]
fn non_greedy_until_fails_without_a_terminator() {
    let cursor = chars("xyz");
    let rule = any_token::<char>().non_greedy_until(literal("END".chars()));
    assert_eq!(rule.parse(&cursor).count(), 0);
}

#[test]
fn deferred_builds_on_first_use() {
    use crate::lib::std::cell::Cell;

    let built = Rc::new(Cell::new(0u32));
    let observed = built.clone();
    let rule = deferred(move || {
        observed.set(observed.get() + 1);
        eq('a')
    });
    assert_eq!(built.get(), 0);

    let cursor = chars("a");
    assert_eq!(rule.parse(&cursor).count(), 1);
    assert_eq!(rule.parse(&cursor).count(), 1);
    assert_eq!(built.get(), 1);
}

#[test]
fn recursive_rules_nest() {
    // nested := '(' nested ')' | 'x'
    let rule = recursive(|rule| {
        any((
            all((eq('('), rule, eq(')'))).map(|(_, depth, _)| depth + 1),
            eq('x').map(|_| 0usize),
        ))
    });

    let cursor = chars("((x))");
    let matched: Vec<_> = rule.parse(&cursor).collect();
    assert_eq!(matched, vec![Parsed::new(2usize, 5)]);
}

#[test]
fn recursive_without_a_body_reports_unsupported_next() {
    let rule: Rc<Recursive<char, char>> = Rc::new(Recursive::unresolved());
    assert_eq!(
        rule.next(),
        Err(Error::Unsupported("recursive rule has no body yet"))
    );
}

#[test]
fn look_ahead_survives_projection() {
    let cursor = chars("ab");
    let rule = any_token::<char>().non_greedy(1).map(|values| values.len());
    let mut matches = rule.parse(&cursor);
    let first = matches.next().unwrap();
    assert!(first.is_look_ahead());
    assert_eq!(first.value(), &1);
}
