//! CSS value tokenizer
//!
//! Produces the typed value tokens (idents, numbers, dimensions, strings, functions and
//! punctuation) that the grammar matcher consumes. The tokenizer follows the CSS Syntax Level 3
//! tokenization rules.

pub mod tokenizer;

pub use tokenizer::{Number, Token, TokenType, Tokenizer};
