#![cfg(feature = "std")]

use std::io::Write;

use crate::results::Parsed;

pub(crate) struct Depth {
    depth: usize,
}

std::thread_local! {
    static DEPTH: std::cell::Cell<usize> = std::cell::Cell::new(0);
}

impl Depth {
    pub(crate) fn new() -> Self {
        let depth = DEPTH.with(|cell| {
            let depth = cell.get();
            cell.set(depth + 1);
            depth
        });
        Self { depth }
    }
}

impl Drop for Depth {
    fn drop(&mut self) {
        DEPTH.with(|cell| cell.set(cell.get().saturating_sub(1)));
    }
}

impl std::ops::Deref for Depth {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.depth
    }
}

pub(crate) fn start(depth: usize, name: &str, count: usize, index: usize) {
    let gutter_style = anstyle::Style::new().bold();
    let (call_width, index_width) = column_widths();

    let mut writer = anstream::stderr().lock();

    let mut gutter = name.to_owned();
    if 0 < count {
        gutter.push('#');
        gutter.push_str(&count.to_string());
    }
    let _ = writeln!(
        writer,
        "{:depth$}{gutter_style}> {gutter:call_width$}{gutter_style:#} @ {index:index_width$}",
        "",
        depth = depth * 2,
    );
}

pub(crate) fn result(depth: usize, name: &str, length: usize, provisional: bool) {
    let success_style = anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Green.into()));
    let pending_style = anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Yellow.into()));
    let (style, verdict) = if provisional {
        (pending_style, "?")
    } else {
        (success_style, "+")
    };
    let (call_width, _) = column_widths();

    let mut writer = anstream::stderr().lock();
    let _ = writeln!(
        writer,
        "{:depth$}{style}{verdict} {name:call_width$}{style:#} len={length}",
        "",
        depth = depth * 2,
    );
}

pub(crate) fn end(depth: usize, name: &str, results: usize) {
    let fail_style = anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Red.into()));
    let done_style = anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Cyan.into()));
    let (style, verdict) = if results == 0 {
        (fail_style, "backtrack")
    } else {
        (done_style, "done")
    };
    let (call_width, _) = column_widths();

    let mut writer = anstream::stderr().lock();
    let _ = writeln!(
        writer,
        "{:depth$}{style}< {name:call_width$}{style:#} {verdict} ({results})",
        "",
        depth = depth * 2,
    );
}

fn column_widths() -> (usize, usize) {
    (28usize, 4usize)
}

/// Wraps a match stream, reporting each pulled result and, once the stream
/// is exhausted or dropped, its overall verdict.
pub(crate) struct TraceMatches<'p, V> {
    inner: crate::parser::Matches<'p, V>,
    name: String,
    depth: Depth,
    results: usize,
    reported: bool,
}

impl<'p, V> TraceMatches<'p, V> {
    pub(crate) fn new(inner: crate::parser::Matches<'p, V>, name: String, depth: Depth) -> Self {
        TraceMatches {
            inner,
            name,
            depth,
            results: 0,
            reported: false,
        }
    }
}

impl<'p, V> Iterator for TraceMatches<'p, V> {
    type Item = Parsed<V>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some(item) => {
                self.results += 1;
                result(*self.depth, &self.name, item.length(), item.is_look_ahead());
                Some(item)
            }
            None => {
                if !self.reported {
                    self.reported = true;
                    end(*self.depth, &self.name, self.results);
                }
                None
            }
        }
    }
}

impl<'p, V> Drop for TraceMatches<'p, V> {
    fn drop(&mut self) {
        if !self.reported {
            self.reported = true;
            end(*self.depth, &self.name, self.results);
        }
    }
}
