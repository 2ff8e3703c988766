//! Shared functionality
//!
//! This crate supplies the character stream and the error types used by the grammar compiler
//! and the value tokenizer.
//!

pub mod byte_stream;
pub mod errors;
