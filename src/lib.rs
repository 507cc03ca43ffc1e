//! # rewind, backtracking parsers over a replaying cursor
//!
//! `rewind` is a parser combinator library for inputs that arrive lazily:
//! - Generic over the element type (`char`, `u8`, or your own tokens)
//! - Input is buffered once in a replaying [`Cursor`][cursor::Cursor] and
//!   explored by any number of backtracking branches
//! - Parsers yield a **lazy sequence of matches** instead of a single
//!   result, so alternatives are only computed when the caller asks
//! - Non-greedy quantifiers negotiate their boundary with the surrounding
//!   grammar through provisional [look-ahead results][results::Parsed]
//!
//! ## Example
//!
//! ```rust
//! use rewind::combinator::any;
//! use rewind::cursor::Cursor;
//! use rewind::driver::ParserStart;
//! use rewind::token::literal;
//!
//! // word := "abc" | "ab"
//! let start = ParserStart::new(|_next| {
//!     any((literal("abc".chars()), literal("ab".chars())))
//! });
//!
//! let cursor = Cursor::buffered("ab".chars());
//! let words: Vec<_> = start
//!     .parse(&cursor)
//!     .unwrap()
//!     .map(|m| m.value().iter().collect::<String>())
//!     .collect();
//! assert_eq!(words, vec!["ab".to_owned()]);
//! ```
//!
//! Grammars are built from the [leaf rules][token] and the
//! [combinators][combinator], and driven by
//! [`ParserStart`][driver::ParserStart], which advances the cursor past
//! each match until the end of the input.
//!
//! ## Feature flags
//!
//! - `std` *(default)*: enable everything that needs the standard library
//! - `alloc`: the buffering core (implied by `std`; the crate cannot be
//!   built without it)
//! - `debug`: colored execution traces from [`trace::trace`]

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

#[cfg(not(feature = "alloc"))]
compile_error!("`rewind` requires the `alloc` feature: the replay cursor buffers its input");

#[cfg(feature = "alloc")]
#[macro_use]
extern crate alloc;

/// Lib module to re-export everything needed from `std` or `core`/`alloc`.
/// This is how `serde` does it, albeit there it is not public.
#[doc(hidden)]
pub mod lib {
    /// `std` facade allowing `std`/`core` to be interchangeable.
    #[cfg(not(feature = "std"))]
    pub mod std {
        #![allow(missing_docs)]
        #[doc(hidden)]
        pub use alloc::{boxed, collections, rc, string, vec};

        #[doc(hidden)]
        pub use core::{cell, cmp, convert, fmt, iter, marker, mem, ops, option, result, slice, str};
    }

    #[cfg(feature = "std")]
    pub mod std {
        #![allow(missing_docs)]
        #[doc(hidden)]
        pub use std::{
            boxed, cell, cmp, collections, convert, fmt, iter, marker, mem, ops, option, rc,
            result, slice, str, string, vec,
        };
    }
}

pub mod combinator;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod notice;
pub mod results;
pub mod token;
pub mod trace;

mod parser;

pub use parser::{Matches, Next, Parser};

/// Core concepts available for glob import
///
/// ## Example
///
/// ```rust
/// use rewind::prelude::*;
///
/// let cursor = Cursor::buffered("a".chars());
/// let matched = rewind::token::eq('a').parse(&cursor).next().unwrap();
/// assert_eq!(matched.length(), 1);
/// ```
pub mod prelude {
    pub use crate::cursor::Cursor;
    pub use crate::driver::ParserStart;
    pub use crate::results::Parsed;
    pub use crate::Parser as _;
}
