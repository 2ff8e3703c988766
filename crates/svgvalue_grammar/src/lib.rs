//! Compiler and matcher for the CSS value definition syntax
//!
//! A grammar like `[ <length> | <percentage> ]#` is compiled into a [`Term`] tree by
//! [`parse_grammar`]. The tree is then matched against the value tokens of an attribute or
//! property with [`match_str`] or a [`Matcher`], which produces the [`Capture`]s of every
//! named term that took part in the match.

pub mod config;
pub mod context;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod terms;

pub use config::{MatcherConfig, ParserConfig};
pub use context::{Context, Function};
pub use matcher::{match_reader, match_str, match_value, Capture, Matcher, TokenSource};
pub use parser::{parse_grammar, parse_grammar_reader, GrammarParser};
pub use terms::{BasicType, BasicTypeName, Range, Term};
