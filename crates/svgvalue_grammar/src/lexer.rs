//! Lexer for the value definition notation itself (`[ <length> | auto ]{1,4}` and friends).
//!
//! This is not the lexer for the values being matched, which lives in `svgvalue_css3`.

use std::fmt;
use svgvalue_shared::byte_stream::Character::Ch;
use svgvalue_shared::byte_stream::{ByteStream, Character, Location, Stream};
use svgvalue_shared::errors::{GrammarError, GrammarResult};

const INFINITY: char = '∞';

/// Kind of a notation token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `custom-ident`, `auto`, `-webkit-box`
    Ident(String),
    /// A number or `∞`. The text is kept as written.
    Number(String),
    /// A double quoted run, or any character without a meaning of its own (`/`, `:`, ...)
    Literal(String),
    /// `||`
    AnyOf,
    /// `&&`
    AllOf,
    /// One of `< > [ ] { } ' | & , * ? # ! +`
    Char(char),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(v) | TokenKind::Number(v) => write!(f, "{v}"),
            TokenKind::Literal(v) => write!(f, "\"{v}\""),
            TokenKind::AnyOf => write!(f, "||"),
            TokenKind::AllOf => write!(f, "&&"),
            TokenKind::Char(c) => write!(f, "{c}"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

impl Token {
    /// Returns the numeric value of a number token. `∞` maps to infinity.
    pub fn number(&self) -> Option<f32> {
        match &self.kind {
            TokenKind::Number(text) => parse_number(text),
            _ => None,
        }
    }
}

fn parse_number(text: &str) -> Option<f32> {
    match text {
        "∞" | "+∞" => Some(f32::INFINITY),
        "-∞" => Some(f32::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

/// True for the characters an identifier may start with and continue with
fn starts_ident(c: Character) -> bool {
    matches!(c, Ch(c) if c == '-' || c == '_' || c.is_ascii_alphabetic())
}

fn is_digit(c: Character) -> bool {
    matches!(c, Ch(c) if c.is_ascii_digit())
}

fn starts_number(c: Character) -> bool {
    is_digit(c) || c == Ch(INFINITY)
}

pub struct Lexer<'stream> {
    stream: &'stream ByteStream,
    /// Start position of the grammar text within its source
    start_location: Location,
    /// Current position, relative to the start location
    cur_location: Location,
}

impl<'stream> Lexer<'stream> {
    pub fn new(stream: &'stream ByteStream, location: Location) -> Self {
        Self {
            stream,
            start_location: location,
            cur_location: Location::default(),
        }
    }

    pub fn current_location(&self) -> Location {
        self.cur_location.relative_to(&self.start_location)
    }

    /// Returns the next notation token. Whitespace is skipped.
    pub fn lex(&mut self) -> GrammarResult<Token> {
        loop {
            let location = self.current_location();
            let kind = match self.current_char() {
                Character::StreamEnd => TokenKind::Eof,
                Character::Surrogate(_) => {
                    return Err(GrammarError::with_location("invalid character", location));
                }
                c if c.is_whitespace() => {
                    self.next_char();
                    continue;
                }
                Ch('-') => self.lex_ident_or_number_or_minus()?,
                Ch('+') => self.lex_number_or_plus()?,
                Ch('|') => self.lex_pair('|', TokenKind::AnyOf),
                Ch('&') => self.lex_pair('&', TokenKind::AllOf),
                Ch(c @ ('<' | '>' | '[' | ']' | '{' | '}' | '\'' | ',' | '*' | '?' | '#' | '!')) => {
                    self.next_char();
                    TokenKind::Char(c)
                }
                Ch('"') => self.lex_literal(location.clone())?,
                c if starts_ident(c) => self.lex_ident(String::new()),
                c if starts_number(c) => self.lex_number(String::new())?,
                Ch(c) => {
                    self.next_char();
                    TokenKind::Literal(c.to_string())
                }
            };

            log::trace!("grammar token {} at {}", kind, location);
            return Ok(Token { kind, location });
        }
    }

    fn lex_ident_or_number_or_minus(&mut self) -> GrammarResult<TokenKind> {
        self.next_char();

        let next = self.current_char();
        if starts_number(next) {
            return self.lex_number("-".to_string());
        }
        if starts_ident(next) {
            return Ok(self.lex_ident("-".to_string()));
        }

        Ok(TokenKind::Literal("-".to_string()))
    }

    fn lex_number_or_plus(&mut self) -> GrammarResult<TokenKind> {
        self.next_char();

        if starts_number(self.current_char()) {
            return self.lex_number("+".to_string());
        }

        Ok(TokenKind::Char('+'))
    }

    /// Lexes `||` or `&&`, falling back to the single character
    fn lex_pair(&mut self, c: char, pair: TokenKind) -> TokenKind {
        self.next_char();

        if self.current_char() == Ch(c) {
            self.next_char();
            return pair;
        }

        TokenKind::Char(c)
    }

    fn lex_ident(&mut self, mut value: String) -> TokenKind {
        while starts_ident(self.current_char()) {
            value.push(self.next_char().into());
        }

        TokenKind::Ident(value)
    }

    fn lex_number(&mut self, mut value: String) -> GrammarResult<TokenKind> {
        if self.current_char() == Ch(INFINITY) {
            value.push(self.next_char().into());
            return Ok(TokenKind::Number(value));
        }

        self.consume_digits(&mut value);

        if self.current_char() == Ch('.') {
            value.push(self.next_char().into());
            self.consume_digits(&mut value);
        }

        if !matches!(self.current_char(), Ch('e' | 'E')) {
            return Ok(TokenKind::Number(value));
        }

        value.push(self.next_char().into());
        if matches!(self.current_char(), Ch('-' | '+')) {
            value.push(self.next_char().into());
        }

        if !is_digit(self.current_char()) {
            return Err(GrammarError::with_location(
                "invalid number token",
                self.current_location(),
            ));
        }
        self.consume_digits(&mut value);

        Ok(TokenKind::Number(value))
    }

    fn lex_literal(&mut self, start: Location) -> GrammarResult<TokenKind> {
        // opening quote
        self.next_char();

        let mut value = String::new();
        loop {
            match self.current_char() {
                Ch('"') => {
                    self.next_char();
                    return Ok(TokenKind::Literal(value));
                }
                Ch(c) => {
                    self.next_char();
                    value.push(c);
                }
                Character::Surrogate(_) => {
                    return Err(GrammarError::with_location(
                        "invalid character",
                        self.current_location(),
                    ));
                }
                Character::StreamEnd => {
                    return Err(GrammarError::with_location("unterminated literal", start));
                }
            }
        }
    }

    fn consume_digits(&mut self, value: &mut String) {
        while is_digit(self.current_char()) {
            value.push(self.next_char().into());
        }
    }

    fn current_char(&self) -> Character {
        self.stream.look_ahead(0)
    }

    fn next_char(&mut self) -> Character {
        if self.stream.eof() {
            return Character::StreamEnd;
        }

        let c = self.stream.read_and_next();
        self.cur_location.advance(c);

        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn kinds(input: &str) -> GrammarResult<Vec<TokenKind>> {
        let stream = ByteStream::new_from_str(input);
        let mut lexer = Lexer::new(&stream, Location::default());

        let mut kinds = Vec::new();
        loop {
            let token = lexer.lex()?;
            if token.kind == TokenKind::Eof {
                return Ok(kinds);
            }
            kinds.push(token.kind);
        }
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Ident(s.to_string())
    }

    fn number(s: &str) -> TokenKind {
        TokenKind::Number(s.to_string())
    }

    fn literal(s: &str) -> TokenKind {
        TokenKind::Literal(s.to_string())
    }

    #[test]
    fn combinators() {
        assert_eq!(
            kinds("a || b && c | d").unwrap(),
            vec![
                ident("a"),
                TokenKind::AnyOf,
                ident("b"),
                TokenKind::AllOf,
                ident("c"),
                TokenKind::Char('|'),
                ident("d"),
            ]
        );
        assert_eq!(kinds("&").unwrap(), vec![TokenKind::Char('&')]);
    }

    #[test]
    fn types_and_multipliers() {
        assert_eq!(
            kinds("<'border-width'>#{1,∞} [<integer [0,∞]>]!*+?").unwrap(),
            vec![
                TokenKind::Char('<'),
                TokenKind::Char('\''),
                ident("border-width"),
                TokenKind::Char('\''),
                TokenKind::Char('>'),
                TokenKind::Char('#'),
                TokenKind::Char('{'),
                number("1"),
                TokenKind::Char(','),
                number("∞"),
                TokenKind::Char('}'),
                TokenKind::Char('['),
                TokenKind::Char('<'),
                ident("integer"),
                TokenKind::Char('['),
                number("0"),
                TokenKind::Char(','),
                number("∞"),
                TokenKind::Char(']'),
                TokenKind::Char('>'),
                TokenKind::Char(']'),
                TokenKind::Char('!'),
                TokenKind::Char('*'),
                TokenKind::Char('+'),
                TokenKind::Char('?'),
            ]
        );
    }

    #[test_case("12", "12"; "integer")]
    #[test_case("-1", "-1"; "negative")]
    #[test_case("+1.5", "+1.5"; "explicit sign")]
    #[test_case("1.", "1."; "trailing point")]
    #[test_case("2e10", "2e10"; "exponent")]
    #[test_case("2E-3", "2E-3"; "negative exponent")]
    #[test_case("-∞", "-∞"; "negative infinity")]
    fn numbers(input: &str, expected: &str) {
        assert_eq!(kinds(input).unwrap(), vec![number(expected)]);
    }

    #[test]
    fn number_values() {
        let stream = ByteStream::new_from_str("-∞ 2.5 1e2");
        let mut lexer = Lexer::new(&stream, Location::default());

        assert_eq!(lexer.lex().unwrap().number(), Some(f32::NEG_INFINITY));
        assert_eq!(lexer.lex().unwrap().number(), Some(2.5));
        assert_eq!(lexer.lex().unwrap().number(), Some(100.0));
        assert_eq!(lexer.lex().unwrap().number(), None);
    }

    #[test_case("1e"; "missing digits")]
    #[test_case("1e+"; "sign without digits")]
    #[test_case("3E-x"; "letter after sign")]
    fn exponent_without_digits(input: &str) {
        let err = kinds(input).unwrap_err();
        assert_eq!(err.message, "invalid number token");
    }

    #[test]
    fn minus_and_plus() {
        assert_eq!(kinds("-webkit-box").unwrap(), vec![ident("-webkit-box")]);
        assert_eq!(kinds("- x").unwrap(), vec![literal("-"), ident("x")]);
        assert_eq!(kinds("a+ b").unwrap(), vec![ident("a"), TokenKind::Char('+'), ident("b")]);
        assert_eq!(kinds("+2").unwrap(), vec![number("+2")]);
    }

    #[test]
    fn identifiers_do_not_continue_with_digits() {
        assert_eq!(kinds("h1").unwrap(), vec![ident("h"), number("1")]);
    }

    #[test]
    fn literals() {
        assert_eq!(
            kinds("\"a b\" / ;").unwrap(),
            vec![literal("a b"), literal("/"), literal(";")]
        );

        let err = kinds("\"open").unwrap_err();
        assert_eq!(err.message, "unterminated literal");
        assert_eq!(err.location, Some(Location::new(1, 1, 0)));
    }

    #[test]
    fn locations() {
        let stream = ByteStream::new_from_str("a\n  <b>");
        let mut lexer = Lexer::new(&stream, Location::new(3, 5, 20));

        assert_eq!(lexer.lex().unwrap().location, Location::new(3, 5, 20));
        assert_eq!(lexer.lex().unwrap().location, Location::new(4, 3, 24));
    }
}
