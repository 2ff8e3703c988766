//! Recursive descent compiler from value definition notation to a [`Term`] tree
//!
//! ```text
//! oneOf        := anyOf ('|' anyOf)*
//! anyOf        := allOf ('||' allOf)*
//! allOf        := seq ('&&' seq)*
//! seq          := ('?' ident)? multiplier+
//! multiplier   := multipliable suffix*
//! suffix       := '*' | '+' | '?' | '!' | '#' | '#{' m [',' [n]] '}' | '{' m [',' [n]] '}'
//! multipliable := group | type | keyword | literal | ','
//! group        := '[' ('?' ident)? oneOf ']'
//! type         := '<' ident ('[' number ',' number ']')? '>' | '<' '\'' ident '\'' '>'
//! ```

use crate::config::ParserConfig;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::terms::{BasicType, BasicTypeName, Range, Term};
use std::io::Read;
use svgvalue_shared::byte_stream::ByteStream;
use svgvalue_shared::errors::{Error, GrammarError, GrammarResult};

/// Compiles the given grammar text into a term tree
pub fn parse_grammar(grammar: &str) -> GrammarResult<Term> {
    let stream = ByteStream::new_from_str(grammar);
    GrammarParser::new(&stream, ParserConfig::default()).parse()
}

/// Compiles the grammar text read from the given reader
pub fn parse_grammar_reader(reader: impl Read) -> Result<Term, Error> {
    let stream = ByteStream::from_reader(reader)?;

    Ok(GrammarParser::new(&stream, ParserConfig::default()).parse()?)
}

pub struct GrammarParser<'stream> {
    lexer: Lexer<'stream>,
    /// Token under consideration. This is the single token of lookahead.
    current: Token,
    config: ParserConfig,
}

impl<'stream> GrammarParser<'stream> {
    pub fn new(stream: &'stream ByteStream, config: ParserConfig) -> Self {
        Self {
            lexer: Lexer::new(stream, config.location.clone()),
            current: Token {
                kind: TokenKind::Eof,
                location: config.location.clone(),
            },
            config,
        }
    }

    /// Parses the complete grammar. Trailing tokens after the top level term are an error.
    pub fn parse(mut self) -> GrammarResult<Term> {
        self.advance()?;

        let term = self.parse_one_of()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error("expected EOF"));
        }

        log::debug!(
            "compiled grammar {}: {}",
            self.config.source.as_deref().unwrap_or("<anonymous>"),
            term
        );

        Ok(term)
    }

    fn advance(&mut self) -> GrammarResult<()> {
        self.current = self.lexer.lex()?;
        Ok(())
    }

    fn error(&self, message: &str) -> GrammarError {
        GrammarError::with_location(message, self.current.location.clone())
    }

    fn is_char(&self, c: char) -> bool {
        self.current.kind == TokenKind::Char(c)
    }

    /// Consumes the given character token, or fails with the given message
    fn expect_char(&mut self, c: char, message: &str) -> GrammarResult<()> {
        if !self.is_char(c) {
            return Err(self.error(message));
        }
        self.advance()
    }

    /// Consumes an identifier token and returns its text
    fn expect_ident(&mut self, message: &str) -> GrammarResult<String> {
        let TokenKind::Ident(name) = &self.current.kind else {
            return Err(self.error(message));
        };
        let name = name.clone();
        self.advance()?;

        Ok(name)
    }

    /// Consumes a number token and returns its value
    fn expect_number(&mut self) -> GrammarResult<f32> {
        let Some(value) = self.current.number() else {
            return Err(self.error("expected a number"));
        };
        self.advance()?;

        Ok(value)
    }

    /// Parses an optional `?name` capture prefix
    fn parse_capture_name(&mut self) -> GrammarResult<Option<String>> {
        if !self.is_char('?') {
            return Ok(None);
        }
        self.advance()?;

        Ok(Some(self.expect_ident("expected ident")?))
    }

    fn parse_one_of(&mut self) -> GrammarResult<Term> {
        let mut operands = vec![self.parse_any_of()?];
        while self.is_char('|') {
            self.advance()?;
            operands.push(self.parse_any_of()?);
        }

        Ok(collapse(operands, Term::OneOf))
    }

    fn parse_any_of(&mut self) -> GrammarResult<Term> {
        let mut operands = vec![self.parse_all_of()?];
        while self.current.kind == TokenKind::AnyOf {
            self.advance()?;
            operands.push(self.parse_all_of()?);
        }

        Ok(collapse(operands, Term::AnyOf))
    }

    fn parse_all_of(&mut self) -> GrammarResult<Term> {
        let mut operands = vec![self.parse_seq()?];
        while self.current.kind == TokenKind::AllOf {
            self.advance()?;
            operands.push(self.parse_seq()?);
        }

        Ok(collapse(operands, Term::AllOf))
    }

    fn parse_seq(&mut self) -> GrammarResult<Term> {
        let name = self.parse_capture_name()?;

        let mut operands = Vec::new();
        while let Some(operand) = self.parse_multiplier()? {
            operands.push(operand);

            if self.is_char(']')
                || self.is_char('|')
                || matches!(self.current.kind, TokenKind::AnyOf | TokenKind::AllOf)
            {
                break;
            }
        }

        if operands.is_empty() {
            return Err(self.error("expected a group, type, keyword, or literal"));
        }

        if name.is_none() && operands.len() == 1 {
            return Ok(operands.remove(0));
        }

        Ok(Term::Seq { name, operands })
    }

    /// Parses a multipliable followed by any number of multiplier suffixes. Returns `None`
    /// at the end of the grammar.
    fn parse_multiplier(&mut self) -> GrammarResult<Option<Term>> {
        let Some(mut term) = self.parse_multipliable()? else {
            return Ok(None);
        };

        loop {
            term = match self.current.kind {
                TokenKind::Char('*') => {
                    self.advance()?;
                    Term::ZeroOrMore(Box::new(term))
                }
                TokenKind::Char('+') => {
                    self.advance()?;
                    Term::OneOrMore(Box::new(term))
                }
                TokenKind::Char('?') => {
                    self.advance()?;
                    Term::ZeroOrOne(Box::new(term))
                }
                TokenKind::Char('!') => {
                    let Term::Group { required, .. } = &mut term else {
                        return Err(self.error("expected a group"));
                    };
                    *required = true;
                    self.advance()?;
                    term
                }
                TokenKind::Char('#') => {
                    self.advance()?;
                    let (min, max) = if self.is_char('{') {
                        self.parse_repeat_bounds()?
                    } else {
                        (1, None)
                    };

                    Term::Repeat {
                        min,
                        max,
                        commas: true,
                        operand: Box::new(term),
                    }
                }
                TokenKind::Char('{') => {
                    let (min, max) = self.parse_repeat_bounds()?;

                    Term::Repeat {
                        min,
                        max,
                        commas: false,
                        operand: Box::new(term),
                    }
                }
                _ => return Ok(Some(term)),
            };
        }
    }

    /// Parses `{m}`, `{m,}` or `{m,n}`. A missing or infinite maximum is unbounded.
    fn parse_repeat_bounds(&mut self) -> GrammarResult<(usize, Option<usize>)> {
        let start = self.current.location.clone();
        self.expect_char('{', "expected '{'")?;

        let min = self.expect_count()?;

        let mut max = Some(min);
        if self.is_char(',') {
            self.advance()?;

            max = None;
            if self.current.number() == Some(f32::INFINITY) {
                self.advance()?;
            } else if matches!(self.current.kind, TokenKind::Number(_)) {
                max = Some(self.expect_count()?);
            }
        }

        self.expect_char('}', "expected '}'")?;

        if max.is_some_and(|max| max < min) {
            return Err(GrammarError::with_location("invalid repeat range", start));
        }

        Ok((min, max))
    }

    /// Consumes a number token holding a non-negative integer
    fn expect_count(&mut self) -> GrammarResult<usize> {
        let TokenKind::Number(text) = &self.current.kind else {
            return Err(self.error("expected a number"));
        };

        let Ok(count) = text.strip_prefix('+').unwrap_or(text).parse::<usize>() else {
            return Err(self.error("expected a non-negative integer"));
        };
        self.advance()?;

        Ok(count)
    }

    fn parse_multipliable(&mut self) -> GrammarResult<Option<Term>> {
        let term = match &self.current.kind {
            TokenKind::Char('[') => self.parse_group()?,
            TokenKind::Char('<') => self.parse_type()?,
            TokenKind::Ident(keyword) => {
                let term = Term::Keyword(keyword.clone());
                self.advance()?;
                term
            }
            TokenKind::Literal(text) => {
                let term = Term::Literal(text.clone());
                self.advance()?;
                term
            }
            // Outside of ranges and repeat bounds a comma is a literal
            TokenKind::Char(',') => {
                self.advance()?;
                Term::Literal(",".to_string())
            }
            TokenKind::Eof => return Ok(None),
            _ => return Err(self.error("expected a group, type, keyword, or literal")),
        };

        Ok(Some(term))
    }

    fn parse_group(&mut self) -> GrammarResult<Term> {
        // skip '['
        self.advance()?;

        let name = self.parse_capture_name()?;
        let operand = self.parse_one_of()?;
        self.expect_char(']', "expected ']'")?;

        Ok(Term::Group {
            name,
            required: false,
            operand: Box::new(operand),
        })
    }

    fn parse_type(&mut self) -> GrammarResult<Term> {
        // skip '<'
        self.advance()?;

        match &self.current.kind {
            TokenKind::Ident(_) => {
                let name = self.expect_ident("expected an identifier")?;

                let term = match BasicTypeName::from_name(&name) {
                    Some(basic) => {
                        let range = if basic.accepts_range() && self.is_char('[') {
                            Some(self.parse_range()?)
                        } else {
                            None
                        };
                        Term::BasicType(BasicType { name: basic, range })
                    }
                    None => Term::NonTerminal(name),
                };

                self.expect_char('>', "expected '>'")?;
                Ok(term)
            }
            TokenKind::Char('\'') => {
                self.advance()?;

                let name = self.expect_ident("expected an identifier")?;
                self.expect_char('\'', "expected '")?;
                self.expect_char('>', "expected '>'")?;

                Ok(Term::PropertyType(name))
            }
            _ => Err(self.error("expected an identifier or '")),
        }
    }

    /// Parses a bracketed range: `[min,max]`
    fn parse_range(&mut self) -> GrammarResult<Range> {
        // skip '['
        self.advance()?;

        let min = self.expect_number()?;
        self.expect_char(',', "expected ','")?;
        let max = self.expect_number()?;
        self.expect_char(']', "expected ']'")?;

        Ok(Range::new(min, max))
    }
}

/// Single operands are returned as-is instead of being wrapped in a combinator
fn collapse(mut operands: Vec<Term>, combinator: fn(Vec<Term>) -> Term) -> Term {
    if operands.len() == 1 {
        return operands.remove(0);
    }
    combinator(operands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgvalue_shared::byte_stream::Location;
    use test_case::test_case;

    fn kw(name: &str) -> Term {
        Term::keyword(name)
    }

    fn basic(name: BasicTypeName) -> Term {
        Term::basic(name)
    }

    #[test_case("<integer>"; "orphans")]
    #[test_case("left | right | center | justify"; "text align")]
    #[test_case("<length> | <percentage>"; "padding top")]
    #[test_case("<color> | invert"; "outline color")]
    #[test_case("none | underline || overline || line-through || blink"; "text decoration")]
    #[test_case("[ <family-name> | <generic-family> ]#"; "font family")]
    #[test_case("[ <length> | thick | medium | thin ]{1,4}"; "border width")]
    #[test_case("[ inset? && <length>{2,4} && <color>? ]# | none"; "box shadow")]
    #[test_case("[<min-x>,? <min-y>,? <width>,? <height>]"; "view box")]
    #[test_case("<number [0,∞]> [ / <number [0,∞]> ]?"; "ratio")]
    fn parses_and_round_trips(grammar: &str) {
        let term = parse_grammar(grammar).unwrap();

        // parsing is deterministic
        assert_eq!(parse_grammar(grammar).unwrap(), term);

        let printed = term.to_string();
        assert_eq!(parse_grammar(&printed).unwrap(), term, "printed as {printed}");
    }

    #[test]
    fn precedence() {
        let term = parse_grammar("a b | c && d || e").unwrap();

        assert_eq!(
            term,
            Term::OneOf(vec![
                Term::seq(vec![kw("a"), kw("b")]),
                Term::AnyOf(vec![Term::AllOf(vec![kw("c"), kw("d")]), kw("e")]),
            ])
        );
    }

    #[test]
    fn box_shadow_structure() {
        let term = parse_grammar("[ inset? && <length>{2,4} && <color>? ]# | none").unwrap();

        assert_eq!(
            term,
            Term::OneOf(vec![
                Term::Repeat {
                    min: 1,
                    max: None,
                    commas: true,
                    operand: Box::new(Term::group(Term::AllOf(vec![
                        Term::ZeroOrOne(Box::new(kw("inset"))),
                        Term::Repeat {
                            min: 2,
                            max: Some(4),
                            commas: false,
                            operand: Box::new(basic(BasicTypeName::Length)),
                        },
                        Term::ZeroOrOne(Box::new(basic(BasicTypeName::Color))),
                    ]))),
                },
                kw("none"),
            ])
        );
    }

    #[test]
    fn view_box_commas_are_literals() {
        let term = parse_grammar("[<min-x>,? <min-y>]").unwrap();

        assert_eq!(
            term,
            Term::group(Term::seq(vec![
                Term::non_terminal("min-x"),
                Term::ZeroOrOne(Box::new(Term::literal(","))),
                Term::non_terminal("min-y"),
            ]))
        );
    }

    #[test]
    fn types() {
        assert_eq!(parse_grammar("<'border-width'>").unwrap(), Term::property("border-width"));
        assert_eq!(parse_grammar("<family-name>").unwrap(), Term::non_terminal("family-name"));
        assert_eq!(
            parse_grammar("<integer [1,∞]>").unwrap(),
            Term::BasicType(BasicType::with_range(BasicTypeName::Integer, Range::new(1.0, f32::INFINITY)))
        );
        assert_eq!(
            parse_grammar("<length [-2.5,1e2]>").unwrap(),
            Term::BasicType(BasicType::with_range(BasicTypeName::Length, Range::new(-2.5, 100.0)))
        );
    }

    #[test]
    fn named_captures() {
        assert_eq!(
            parse_grammar("[ ?pair a b ]!").unwrap(),
            Term::Group {
                name: Some("pair".to_string()),
                required: true,
                operand: Box::new(Term::seq(vec![kw("a"), kw("b")])),
            }
        );

        // a named sequence keeps its wrapper, even around a single operand
        assert_eq!(
            parse_grammar("x | ?single y").unwrap(),
            Term::OneOf(vec![
                kw("x"),
                Term::Seq {
                    name: Some("single".to_string()),
                    operands: vec![kw("y")],
                },
            ])
        );
    }

    #[test]
    fn repeat_bounds() {
        let repeat = |grammar: &str| match parse_grammar(grammar).unwrap() {
            Term::Repeat { min, max, commas, .. } => (min, max, commas),
            other => panic!("unexpected term {other:?}"),
        };

        assert_eq!(repeat("a{3}"), (3, Some(3), false));
        assert_eq!(repeat("a{1,}"), (1, None, false));
        assert_eq!(repeat("a{0,∞}"), (0, None, false));
        assert_eq!(repeat("a{2,4}"), (2, Some(4), false));
        assert_eq!(repeat("a#"), (1, None, true));
        assert_eq!(repeat("a#{1,4}"), (1, Some(4), true));
    }

    #[test]
    fn stacked_multipliers() {
        assert_eq!(
            parse_grammar("<length>#?").unwrap(),
            Term::ZeroOrOne(Box::new(Term::Repeat {
                min: 1,
                max: None,
                commas: true,
                operand: Box::new(basic(BasicTypeName::Length)),
            }))
        );
        assert_eq!(
            parse_grammar("a{1,2}#").unwrap(),
            Term::Repeat {
                min: 1,
                max: None,
                commas: true,
                operand: Box::new(Term::Repeat {
                    min: 1,
                    max: Some(2),
                    commas: false,
                    operand: Box::new(kw("a")),
                }),
            }
        );
    }

    #[test_case("[ a b", "expected ']'"; "unclosed group")]
    #[test_case("<integer [x,1]>", "expected a number"; "range without min")]
    #[test_case("<integer [0 1]>", "expected ','"; "range without comma")]
    #[test_case("<integer [0,1>", "expected ']'"; "unclosed range")]
    #[test_case("<length", "expected '>'"; "unclosed type")]
    #[test_case("<color [0,1]>", "expected '>'"; "range on a type without ranges")]
    #[test_case("<ratio [0,1]>", "expected '>'"; "range on ratio")]
    #[test_case("<'width>", "expected '"; "unclosed property")]
    #[test_case("<''>", "expected an identifier"; "empty property")]
    #[test_case("<[a]>", "expected an identifier or '"; "bad type")]
    #[test_case("a{x}", "expected a number"; "repeat without number")]
    #[test_case("a{1,2", "expected '}'"; "unclosed repeat")]
    #[test_case("a{1.5}", "expected a non-negative integer"; "fractional repeat")]
    #[test_case("a{3,1}", "invalid repeat range"; "inverted repeat")]
    #[test_case("a!", "expected a group"; "required keyword")]
    #[test_case("[ ?1 a ]", "expected ident"; "bad capture name")]
    #[test_case("", "expected a group, type, keyword, or literal"; "empty")]
    #[test_case("a | > b", "expected a group, type, keyword, or literal"; "stray token")]
    #[test_case("a ] b", "expected EOF"; "trailing tokens")]
    #[test_case("a 1e", "invalid number token"; "lexer error")]
    fn errors(grammar: &str, message: &str) {
        let err = parse_grammar(grammar).unwrap_err();
        assert_eq!(err.message, message);
        assert!(err.location.is_some());
    }

    #[test]
    fn error_location_is_relative_to_config() {
        let stream = ByteStream::new_from_str("a | [ b");
        let config = ParserConfig {
            source: Some("test".to_string()),
            location: Location::new(10, 4, 100),
        };

        let err = GrammarParser::new(&stream, config).parse().unwrap_err();
        assert_eq!(err.to_string(), "expected ']' at 10:11");
    }

    #[test]
    fn from_reader() {
        let term = parse_grammar_reader("auto | <length>".as_bytes()).unwrap();
        assert_eq!(term, Term::OneOf(vec![kw("auto"), basic(BasicTypeName::Length)]));

        let err = parse_grammar_reader("[ auto".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Grammar(_)));
    }

    #[test]
    fn overlong_utf8_is_rejected() {
        let err = parse_grammar_reader(&b"a \xC0\xAF b"[..]).unwrap_err();

        assert!(matches!(
            &err,
            Error::Grammar(err) if err.message == "invalid character" && err.location == Some(Location::new(1, 3, 2))
        ));
    }
}
