//! Backtracking matcher for value tokens against a compiled [`Term`] tree
//!
//! Every term is matched inside a checkpoint of the consumption offset, the consumed result
//! tokens and the captures. A term that fails restores all three, so no partial consumption
//! or capture survives a failed alternative.

use crate::config::MatcherConfig;
use crate::context::{Context, Function};
use crate::terms::{BasicType, BasicTypeName, Range, Term};
use lazy_static::lazy_static;
use std::io::Read;
use svgvalue_css3::{Token, TokenType, Tokenizer};
use svgvalue_shared::byte_stream::{ByteStream, Location};
use svgvalue_shared::errors::Error;

lazy_static! {
    /// `<number [0,∞]> [ / <number [0,∞]> ]?`
    static ref RATIO: Term = {
        let number = Term::BasicType(BasicType::with_range(
            BasicTypeName::Number,
            Range::new(0.0, f32::INFINITY),
        ));

        Term::seq(vec![
            number.clone(),
            Term::ZeroOrOne(Box::new(Term::group(Term::seq(vec![
                Term::literal("/"),
                number,
            ])))),
        ])
    };
}

/// Supplier of value tokens. An EOF token ends the stream.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, Error>;
}

impl TokenSource for Tokenizer<'_> {
    fn next_token(&mut self) -> Result<Token, Error> {
        Ok(self.consume())
    }
}

/// Tokens that were produced up front
impl TokenSource for std::vec::IntoIter<Token> {
    fn next_token(&mut self) -> Result<Token, Error> {
        Ok(self
            .next()
            .unwrap_or_else(|| Token::new(TokenType::Eof, Location::default())))
    }
}

/// A span of value tokens matched by a named term. The anonymous capture spans the whole
/// match and is always the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: Option<String>,
    pub tokens: Vec<Token>,
}

impl Capture {
    pub fn is_whole_match(&self) -> bool {
        self.name.is_none()
    }
}

/// Matches the tokens from the source against the term. Returns `None` when the value does
/// not match.
pub fn match_value<S: TokenSource>(context: &Context, term: &Term, source: S) -> Result<Option<Vec<Capture>>, Error> {
    Matcher::new(context, source).run(term)
}

/// Tokenizes the given value and matches it against the term
pub fn match_str(context: &Context, term: &Term, value: &str) -> Result<Option<Vec<Capture>>, Error> {
    let stream = ByteStream::new_from_str(value);
    match_value(context, term, Tokenizer::new(&stream, Location::default()))
}

/// Reads the value from the reader, then tokenizes and matches it against the term
pub fn match_reader(context: &Context, term: &Term, reader: impl Read) -> Result<Option<Vec<Capture>>, Error> {
    let stream = ByteStream::from_reader(reader)?;

    match_value(context, term, Tokenizer::new(&stream, Location::default()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Checkpoint {
    offset: usize,
    result_len: usize,
    captures_len: usize,
}

/// State of a single match. A matcher is used for one [`Matcher::run`] call only.
pub struct Matcher<'ctx, S: TokenSource> {
    context: &'ctx Context,
    config: MatcherConfig,
    source: S,
    /// Significant tokens read from the source so far. Tokens are never removed, backtracking
    /// only moves the offset.
    buffer: Vec<Token>,
    /// Set once the source has produced its EOF token
    exhausted: bool,
    /// Position of the next unconsumed token in the buffer
    offset: usize,
    /// Tokens consumed so far
    result: Vec<Token>,
    captures: Vec<Capture>,
    /// Number of term match attempts
    steps: usize,
    /// Set when the step budget ran out
    aborted: bool,
}

impl<'ctx, S: TokenSource> Matcher<'ctx, S> {
    pub fn new(context: &'ctx Context, source: S) -> Self {
        Self::with_config(context, source, MatcherConfig::default())
    }

    pub fn with_config(context: &'ctx Context, source: S, config: MatcherConfig) -> Self {
        Self {
            context,
            config,
            source,
            buffer: Vec::new(),
            exhausted: false,
            offset: 0,
            result: Vec::new(),
            captures: Vec::new(),
            steps: 0,
            aborted: false,
        }
    }

    /// Matches the term against the start of the token stream and returns the captures, or
    /// `None` when the term does not match.
    pub fn run(mut self, term: &Term) -> Result<Option<Vec<Capture>>, Error> {
        let matched = self.match_term(term)?;

        if self.aborted {
            return Ok(None);
        }
        if !matched {
            log::debug!("no match for {term}");
            return Ok(None);
        }
        if self.config.require_full_input && self.peek()?.is_some() {
            log::debug!("{term} matched, but not all input was consumed");
            return Ok(None);
        }

        let Matcher {
            mut captures,
            result,
            ..
        } = self;

        log::debug!(
            "matched {term} with {} tokens and {} captures",
            result.len(),
            captures.len()
        );

        captures.push(Capture {
            name: None,
            tokens: result,
        });

        Ok(Some(captures))
    }

    /// Returns the n-th unconsumed token (0 is the next one), reading from the source as
    /// needed. Whitespace is skipped.
    fn peek_nth(&mut self, n: usize) -> Result<Option<&Token>, Error> {
        while !self.exhausted && self.buffer.len() <= self.offset + n {
            let token = self.source.next_token()?;
            if token.is_eof() {
                self.exhausted = true;
                break;
            }
            if token.is_insignificant() {
                continue;
            }

            log::trace!("value token {token}");
            self.buffer.push(token);
        }

        Ok(self.buffer.get(self.offset + n))
    }

    fn peek(&mut self) -> Result<Option<&Token>, Error> {
        self.peek_nth(0)
    }

    fn next_is(&mut self, predicate: impl FnOnce(&Token) -> bool) -> Result<bool, Error> {
        Ok(self.peek()?.is_some_and(predicate))
    }

    /// Moves the next buffered token into the result
    fn chomp(&mut self) -> Result<(), Error> {
        let Some(token) = self.buffer.get(self.offset) else {
            return Err(Error::Internal("buffer underflow".to_string()));
        };

        self.result.push(token.clone());
        self.offset += 1;

        Ok(())
    }

    /// Consumes the next token when it satisfies the predicate
    fn consume_if(&mut self, predicate: impl FnOnce(&Token) -> bool) -> Result<bool, Error> {
        if !self.next_is(predicate)? {
            return Ok(false);
        }

        self.chomp()?;
        Ok(true)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            offset: self.offset,
            result_len: self.result.len(),
            captures_len: self.captures.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.offset = checkpoint.offset;
        self.result.truncate(checkpoint.result_len);
        self.captures.truncate(checkpoint.captures_len);
    }

    /// Appends a capture of everything consumed since the given result length
    fn capture(&mut self, name: &str, start: usize) {
        self.captures.push(Capture {
            name: Some(name.to_string()),
            tokens: self.result[start..].to_vec(),
        });
    }

    /// Counts a match attempt against the step budget
    fn step(&mut self) -> bool {
        if self.aborted {
            return false;
        }

        self.steps += 1;
        if let Some(max_steps) = self.config.max_steps {
            if self.steps > max_steps {
                log::warn!("match aborted after {max_steps} steps");
                self.aborted = true;
                return false;
            }
        }

        true
    }

    fn match_term(&mut self, term: &Term) -> Result<bool, Error> {
        if !self.step() {
            return Ok(false);
        }

        let checkpoint = self.checkpoint();
        let context = self.context;

        let matched = match term {
            Term::Keyword(keyword) => {
                self.consume_if(|token| matches!(&token.token_type, TokenType::Ident(ident) if ident == keyword))?
            }
            Term::BasicType(basic) => self.match_basic_type(basic)?,
            Term::PropertyType(name) => self.match_reference(name, context.property(name))?,
            Term::NonTerminal(name) => self.match_reference(name, context.non_terminal(name))?,
            Term::Literal(text) => self.consume_if(|token| literal_matches(text, token))?,
            Term::Seq { name, operands } => self.match_seq(name.as_deref(), operands)?,
            Term::AllOf(operands) => self.match_all_of(operands)?,
            Term::AnyOf(operands) => self.match_any_of(operands)?,
            Term::OneOf(operands) => self.match_one_of(operands)?,
            Term::Group {
                name,
                required,
                operand,
            } => self.match_group(name.as_deref(), *required, operand)?,
            Term::ZeroOrMore(operand) => {
                self.match_repeatedly(operand)?;
                true
            }
            Term::OneOrMore(operand) => {
                let first = self.match_term(operand)?;
                if first {
                    self.match_repeatedly(operand)?;
                }
                first
            }
            Term::ZeroOrOne(operand) => {
                self.match_term(operand)?;
                true
            }
            Term::Repeat {
                min,
                max,
                commas,
                operand,
            } => self.match_repeat(*min, *max, *commas, operand)?,
        };

        if !matched {
            self.restore(checkpoint);
        }

        Ok(matched)
    }

    fn match_basic_type(&mut self, basic: &BasicType) -> Result<bool, Error> {
        if self.next_is(Token::is_function)? {
            let function = self.match_function()?;
            return Ok(function.is_some_and(|function| function.return_type.name == basic.name));
        }

        if basic.name == BasicTypeName::Ratio {
            return self.match_term(&RATIO);
        }

        let enforce_ranges = self.config.enforce_ranges;
        self.consume_if(|token| token_fits(basic, token, enforce_ranges))
    }

    /// Matches a property or non-terminal. Unknown names do not match.
    fn match_reference(&mut self, name: &str, term: Option<&Term>) -> Result<bool, Error> {
        let Some(term) = term else {
            log::trace!("unresolved reference {name}");
            return Ok(false);
        };

        let start = self.result.len();
        if !self.match_term(term)? {
            return Ok(false);
        }

        self.capture(name, start);
        Ok(true)
    }

    fn match_seq(&mut self, name: Option<&str>, operands: &[Term]) -> Result<bool, Error> {
        let start = self.result.len();
        for operand in operands {
            if !self.match_term(operand)? {
                return Ok(false);
            }
        }

        if let Some(name) = name {
            self.capture(name, start);
        }
        Ok(true)
    }

    fn match_all_of(&mut self, operands: &[Term]) -> Result<bool, Error> {
        let mut pending: Vec<&Term> = operands.iter().collect();

        while !pending.is_empty() {
            if self.peek()?.is_none() {
                return Ok(false);
            }

            let mut found = None;
            for (i, operand) in pending.iter().enumerate() {
                if self.match_term(operand)? {
                    found = Some(i);
                    break;
                }
            }

            let Some(i) = found else {
                return Ok(false);
            };
            pending.remove(i);
        }

        Ok(true)
    }

    /// Operands stay available after they matched, so the same operand may match again in a
    /// later round.
    fn match_any_of(&mut self, operands: &[Term]) -> Result<bool, Error> {
        if !self.match_one_of(operands)? {
            return Ok(false);
        }

        loop {
            let before = self.offset;
            if !self.match_one_of(operands)? || self.offset == before {
                return Ok(true);
            }
        }
    }

    fn match_one_of(&mut self, operands: &[Term]) -> Result<bool, Error> {
        for operand in operands {
            if self.match_term(operand)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn match_group(&mut self, name: Option<&str>, required: bool, operand: &Term) -> Result<bool, Error> {
        let start = self.result.len();
        if !self.match_term(operand)? {
            return Ok(false);
        }

        // a required group must produce at least one value
        if required && self.result.len() == start {
            return Ok(false);
        }

        if let Some(name) = name {
            self.capture(name, start);
        }
        Ok(true)
    }

    /// Greedily matches the operand until it fails or stops consuming tokens
    fn match_repeatedly(&mut self, operand: &Term) -> Result<(), Error> {
        loop {
            let before = self.offset;
            if !self.match_term(operand)? || self.offset == before {
                return Ok(());
            }
        }
    }

    fn match_repeat(&mut self, min: usize, max: Option<usize>, commas: bool, operand: &Term) -> Result<bool, Error> {
        let mut count = 0;

        while max.is_none_or(|max| count < max) {
            if self.peek()?.is_none() {
                break;
            }

            let checkpoint = self.checkpoint();
            if count > 0 && commas {
                if !self.next_is(Token::is_comma)? {
                    return Ok(false);
                }
                self.chomp()?;
            }

            if !self.match_term(operand)? {
                // the separating comma belongs to the failed repetition
                self.restore(checkpoint);
                break;
            }
            count += 1;

            // an empty match can be repeated any number of times
            if self.offset == checkpoint.offset {
                count = count.max(min);
                break;
            }
        }

        Ok(count >= min)
    }

    /// Matches a function call against the function of the same name in the context. On
    /// failure nothing is consumed.
    fn match_function(&mut self) -> Result<Option<&'ctx Function>, Error> {
        let context = self.context;

        let Some(Token {
            token_type: TokenType::Function(name),
            ..
        }) = self.peek()?
        else {
            return Ok(None);
        };
        let Some(function) = context.function(name) else {
            log::trace!("unknown function {name}");
            return Ok(None);
        };

        let checkpoint = self.checkpoint();
        self.chomp()?;

        for (i, param) in function.params.iter().enumerate() {
            if !self.match_term(param)? {
                self.restore(checkpoint);
                return Ok(None);
            }

            // Commas are accepted between any two parameters, without requiring that either
            // all or none of them are separated.
            if i + 1 < function.params.len() {
                self.consume_if(Token::is_comma)?;
            }
        }

        if !self.consume_if(|token| token.token_type == TokenType::RParen)? {
            self.restore(checkpoint);
            return Ok(None);
        }

        Ok(Some(function))
    }
}

/// Returns true when the token has the shape of the basic type
fn token_fits(basic: &BasicType, token: &Token, enforce_ranges: bool) -> bool {
    let shape = match basic.name {
        BasicTypeName::CustomIdent | BasicTypeName::DashedIdent => {
            matches!(token.token_type, TokenType::Ident(_))
        }
        BasicTypeName::String => matches!(token.token_type, TokenType::QuotedString(_)),
        BasicTypeName::Url => matches!(token.token_type, TokenType::Url(_)),
        BasicTypeName::Color => matches!(
            token.token_type,
            TokenType::Hash(_) | TokenType::IDHash(_) | TokenType::Ident(_)
        ),
        BasicTypeName::Integer | BasicTypeName::Number => {
            matches!(token.token_type, TokenType::Number(_))
        }
        BasicTypeName::Percentage => matches!(token.token_type, TokenType::Percentage(_)),
        BasicTypeName::Dimension
        | BasicTypeName::Length
        | BasicTypeName::Angle
        | BasicTypeName::Time
        | BasicTypeName::Frequency
        | BasicTypeName::Resolution => matches!(token.token_type, TokenType::Dimension { .. }),
        // matched through its sub-grammar
        BasicTypeName::Ratio => false,
    };

    if !shape || !enforce_ranges {
        return shape;
    }

    let Some(value) = token.numeric_value() else {
        return true;
    };
    if basic.name == BasicTypeName::Integer && value.fract() != 0.0 {
        return false;
    }

    basic.range.is_none_or(|range| range.contains(value))
}

/// Maps a literal to the punctuation token it stands for. Anything else is a delimiter.
fn literal_matches(text: &str, token: &Token) -> bool {
    let expected = match text {
        ":" => TokenType::Colon,
        "," => TokenType::Comma,
        ";" => TokenType::Semicolon,
        "{" => TokenType::LCurly,
        "}" => TokenType::RCurly,
        "[" => TokenType::LBracket,
        "]" => TokenType::RBracket,
        "(" => TokenType::LParen,
        ")" => TokenType::RParen,
        _ => {
            let mut chars = text.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => token.token_type == TokenType::Delim(c),
                _ => false,
            };
        }
    };

    token.token_type == expected
}
