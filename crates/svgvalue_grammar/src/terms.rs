//! Compiled value definition grammar terms
//!
//! A [`Term`] tree is pure data: it is built once by the parser (or by hand) and can be
//! matched any number of times, from any number of threads.

use std::fmt::{self, Display, Formatter};

/// Basic data types that appear between `<` and `>`, and that are matched directly against
/// value tokens instead of being looked up in a [`crate::context::Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicTypeName {
    CustomIdent,
    DashedIdent,
    String,
    Url,
    Color,
    Integer,
    Number,
    Percentage,
    Dimension,
    Length,
    Angle,
    Time,
    Frequency,
    Resolution,
    Ratio,
}

impl BasicTypeName {
    /// Returns the basic type for the given type name, or `None` when the name refers to a
    /// non-terminal instead
    pub fn from_name(name: &str) -> Option<Self> {
        let basic = match name {
            "custom-ident" => Self::CustomIdent,
            "dashed-ident" => Self::DashedIdent,
            "string" => Self::String,
            "url" => Self::Url,
            "color" => Self::Color,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "percentage" => Self::Percentage,
            "dimension" => Self::Dimension,
            "length" => Self::Length,
            "angle" => Self::Angle,
            "time" => Self::Time,
            "frequency" => Self::Frequency,
            "resolution" => Self::Resolution,
            "ratio" => Self::Ratio,
            _ => return None,
        };

        Some(basic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomIdent => "custom-ident",
            Self::DashedIdent => "dashed-ident",
            Self::String => "string",
            Self::Url => "url",
            Self::Color => "color",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Percentage => "percentage",
            Self::Dimension => "dimension",
            Self::Length => "length",
            Self::Angle => "angle",
            Self::Time => "time",
            Self::Frequency => "frequency",
            Self::Resolution => "resolution",
            Self::Ratio => "ratio",
        }
    }

    /// Numeric types may carry a bracketed range (`<integer [0,∞]>`). `ratio` is matched as two
    /// numbers, so a single range does not apply to it.
    pub fn accepts_range(&self) -> bool {
        !matches!(
            self,
            Self::CustomIdent | Self::DashedIdent | Self::String | Self::Url | Self::Color | Self::Ratio
        )
    }
}

impl Display for BasicTypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive numeric bounds of a basic type. Infinite bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn unbounded() -> Self {
        Self::new(f32::NEG_INFINITY, f32::INFINITY)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", format_bound(self.min), format_bound(self.max))
    }
}

fn format_bound(value: f32) -> String {
    if value == f32::INFINITY {
        "∞".to_string()
    } else if value == f32::NEG_INFINITY {
        "-∞".to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicType {
    pub name: BasicTypeName,
    pub range: Option<Range>,
}

impl BasicType {
    pub fn new(name: BasicTypeName) -> Self {
        Self { name, range: None }
    }

    pub fn with_range(name: BasicTypeName, range: Range) -> Self {
        Self {
            name,
            range: Some(range),
        }
    }
}

impl Display for BasicType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "<{} {}>", self.name, range),
            None => write!(f, "<{}>", self.name),
        }
    }
}

/// A term of the value definition grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A keyword that must appear literally (`auto`, `inset`). Case sensitive.
    Keyword(String),
    BasicType(BasicType),
    /// `<'border-width'>`: the grammar of the property with that name
    PropertyType(String),
    /// `<family-name>`: a named sub-grammar that is not a property
    NonTerminal(String),
    /// A literal punctuation character (`/`, `,`)
    Literal(String),
    /// Juxtaposition: all operands must occur, in order
    Seq {
        name: Option<String>,
        operands: Vec<Term>,
    },
    /// `&&`: all operands must occur, in any order
    AllOf(Vec<Term>),
    /// `||`: one or more operands must occur, in any order
    AnyOf(Vec<Term>),
    /// `|`: exactly one operand must occur
    OneOf(Vec<Term>),
    /// `[ ... ]`. A required group (`!`) must produce at least one value.
    Group {
        name: Option<String>,
        required: bool,
        operand: Box<Term>,
    },
    /// `*`
    ZeroOrMore(Box<Term>),
    /// `+`
    OneOrMore(Box<Term>),
    /// `?`
    ZeroOrOne(Box<Term>),
    /// `{m,n}`, `#` and `#{m,n}`. A `max` of `None` is unbounded.
    Repeat {
        min: usize,
        max: Option<usize>,
        commas: bool,
        operand: Box<Term>,
    },
}

impl Term {
    pub fn keyword(name: &str) -> Self {
        Term::Keyword(name.to_string())
    }

    pub fn basic(name: BasicTypeName) -> Self {
        Term::BasicType(BasicType::new(name))
    }

    pub fn non_terminal(name: &str) -> Self {
        Term::NonTerminal(name.to_string())
    }

    pub fn property(name: &str) -> Self {
        Term::PropertyType(name.to_string())
    }

    pub fn literal(text: &str) -> Self {
        Term::Literal(text.to_string())
    }

    pub fn group(operand: Term) -> Self {
        Term::Group {
            name: None,
            required: false,
            operand: Box::new(operand),
        }
    }

    pub fn seq(operands: Vec<Term>) -> Self {
        Term::Seq {
            name: None,
            operands,
        }
    }

    /// Binding strength of the notation this term is written in. Operands that bind looser
    /// than their parent need brackets when printed.
    fn precedence(&self) -> u8 {
        match self {
            Term::OneOf(_) => 0,
            Term::AnyOf(_) => 1,
            Term::AllOf(_) => 2,
            Term::Seq { .. } => 3,
            _ => 4,
        }
    }

    fn fmt_operand(&self, f: &mut Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "[ {self} ]")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_joined(f: &mut Formatter<'_>, operands: &[Term], separator: &str, min_precedence: u8) -> fmt::Result {
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                write!(f, "{separator}")?;
            }
            operand.fmt_operand(f, min_precedence)?;
        }
        Ok(())
    }
}

/// Literals that read back as themselves when written without quotes
fn is_bare_literal(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            c.is_ascii_punctuation()
                && !matches!(
                    c,
                    '<' | '>' | '[' | ']' | '{' | '}' | '\'' | '|' | '&' | '*' | '?' | '#' | '!' | '"' | '+' | '-' | '_'
                )
        }
        _ => false,
    }
}

/// Writes the term back in value definition notation. For trees produced by the parser,
/// parsing the output again yields the same tree.
impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Term::Keyword(keyword) => write!(f, "{keyword}"),
            Term::BasicType(basic) => write!(f, "{basic}"),
            Term::PropertyType(name) => write!(f, "<'{name}'>"),
            Term::NonTerminal(name) => write!(f, "<{name}>"),
            Term::Literal(text) if is_bare_literal(text) => write!(f, "{text}"),
            Term::Literal(text) => write!(f, "\"{text}\""),
            Term::Seq { name, operands } => {
                if let Some(name) = name {
                    write!(f, "?{name} ")?;
                }
                Term::fmt_joined(f, operands, " ", 4)
            }
            Term::AllOf(operands) => Term::fmt_joined(f, operands, " && ", 3),
            Term::AnyOf(operands) => Term::fmt_joined(f, operands, " || ", 2),
            Term::OneOf(operands) => Term::fmt_joined(f, operands, " | ", 1),
            Term::Group {
                name,
                required,
                operand,
            } => {
                write!(f, "[ ")?;
                if let Some(name) = name {
                    write!(f, "?{name} ")?;
                }
                write!(f, "{operand} ]")?;
                if *required {
                    write!(f, "!")?;
                }
                Ok(())
            }
            Term::ZeroOrMore(operand) => {
                operand.fmt_operand(f, 4)?;
                write!(f, "*")
            }
            Term::OneOrMore(operand) => {
                operand.fmt_operand(f, 4)?;
                write!(f, "+")
            }
            Term::ZeroOrOne(operand) => {
                operand.fmt_operand(f, 4)?;
                write!(f, "?")
            }
            Term::Repeat {
                min,
                max,
                commas,
                operand,
            } => {
                operand.fmt_operand(f, 4)?;
                if *commas {
                    write!(f, "#")?;
                    if *min == 1 && max.is_none() {
                        return Ok(());
                    }
                }
                match max {
                    Some(max) if max == min => write!(f, "{{{min}}}"),
                    Some(max) => write!(f, "{{{min},{max}}}"),
                    None => write!(f, "{{{min},}}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_type_names() {
        assert_eq!(BasicTypeName::from_name("length"), Some(BasicTypeName::Length));
        assert_eq!(BasicTypeName::from_name("family-name"), None);
        assert_eq!(BasicTypeName::DashedIdent.as_str(), "dashed-ident");

        assert!(BasicTypeName::Integer.accepts_range());
        assert!(!BasicTypeName::Ratio.accepts_range());
        assert!(!BasicTypeName::Color.accepts_range());
        assert!(!BasicTypeName::Url.accepts_range());
    }

    #[test]
    fn range_contains() {
        let range = Range::new(0.0, f32::INFINITY);
        assert!(range.contains(0.0));
        assert!(range.contains(1e30));
        assert!(!range.contains(-0.5));
        assert!(Range::unbounded().contains(-1e30));
    }

    #[test]
    fn display_terms() {
        let term = Term::OneOf(vec![
            Term::Repeat {
                min: 1,
                max: None,
                commas: true,
                operand: Box::new(Term::group(Term::AllOf(vec![
                    Term::ZeroOrOne(Box::new(Term::keyword("inset"))),
                    Term::Repeat {
                        min: 2,
                        max: Some(4),
                        commas: false,
                        operand: Box::new(Term::basic(BasicTypeName::Length)),
                    },
                ]))),
            },
            Term::keyword("none"),
        ]);

        assert_eq!(term.to_string(), "[ inset? && <length>{2,4} ]# | none");
    }

    #[test]
    fn display_brackets_loose_operands() {
        let term = Term::ZeroOrMore(Box::new(Term::OneOf(vec![
            Term::keyword("a"),
            Term::keyword("b"),
        ])));
        assert_eq!(term.to_string(), "[ a | b ]*");

        let term = Term::AllOf(vec![
            Term::AnyOf(vec![Term::keyword("a"), Term::keyword("b")]),
            Term::keyword("c"),
        ]);
        assert_eq!(term.to_string(), "[ a || b ] && c");
    }

    #[test]
    fn display_leaves() {
        assert_eq!(Term::property("border-width").to_string(), "<'border-width'>");
        assert_eq!(Term::non_terminal("family-name").to_string(), "<family-name>");
        assert_eq!(Term::literal("/").to_string(), "/");
        assert_eq!(Term::literal(",").to_string(), ",");
        assert_eq!(Term::literal("+").to_string(), "\"+\"");
        assert_eq!(
            Term::BasicType(BasicType::with_range(BasicTypeName::Number, Range::new(-1.5, f32::INFINITY))).to_string(),
            "<number [-1.5,∞]>"
        );
    }

    #[test]
    fn display_repeats() {
        let repeat = |min, max, commas| Term::Repeat {
            min,
            max,
            commas,
            operand: Box::new(Term::keyword("a")),
        };

        assert_eq!(repeat(3, Some(3), false).to_string(), "a{3}");
        assert_eq!(repeat(1, None, false).to_string(), "a{1,}");
        assert_eq!(repeat(1, None, true).to_string(), "a#");
        assert_eq!(repeat(2, Some(5), true).to_string(), "a#{2,5}");
    }
}
