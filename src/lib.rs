//! Value definition grammars for SVG presentation attributes
//!
//! The workspace is split into the character stream and error types (`shared`), the value
//! tokenizer (`css3`) and the grammar compiler and matcher (`grammar`).

pub use svgvalue_css3 as css3;
pub use svgvalue_grammar as grammar;
pub use svgvalue_shared as shared;
