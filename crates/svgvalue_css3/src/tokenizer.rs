use std::fmt;
use svgvalue_shared::byte_stream::Character::Ch;
use svgvalue_shared::byte_stream::{ByteStream, Character, Location, Stream};

pub type Number = f32;

const NULL: char = '\u{0000}';
const BACKSPACE: char = '\u{0008}';
const LINE_TABULATION: char = '\u{000B}';
const SHIFT_OUT: char = '\u{000E}';
const INFORMATION_SEPARATOR_ONE: char = '\u{001F}';
const DELETE: char = '\u{007F}';
const MAX_ALLOWED: char = '\u{10FFFF}';
const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

#[derive(Debug, PartialEq, Clone)]
pub enum TokenType {
    /// `@name`, stored without the `@`
    AtKeyword(String),
    Ident(String),
    /// A `<function-token>`. The value is the function name, without the opening parenthesis.
    Function(String),
    Url(String),
    BadUrl(String),
    Dimension {
        value: Number,
        unit: String,
    },
    Percentage(Number),
    Number(Number),
    /// Quoted string, stored without the quotes
    QuotedString(String),
    /// String cut short by a newline
    BadString(String),
    /// A run of whitespace
    Whitespace,
    /// `#` followed by a name that is not a valid identifier, like `#123`
    Hash(String),
    /// `#` followed by an identifier, like `#fff`
    IDHash(String),
    /// A `<delim-token>`
    Delim(char),
    /// A `<{-token>`
    LCurly,
    /// A `<}-token>`
    RCurly,
    /// A `<(-token>`
    LParen,
    /// A `<)-token>`
    RParen,
    /// A `<[-token>`
    LBracket,
    /// A `<]-token>`
    RBracket,
    /// A `<comma-token>`
    Comma,
    /// A `:` `<colon-token>`
    Colon,
    /// A `;` `<semicolon-token>`
    Semicolon,
    // A `<!--` `<CDO-token>`
    Cdo,
    // A `-->` `<CDC-token>`
    Cdc,
    // A `<EOF-token>`
    Eof,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    /// Type of the token
    pub token_type: TokenType,
    /// Location of the token in the stream
    pub location: Location,
}

impl Token {
    #[must_use]
    pub fn new(token_type: TokenType, location: Location) -> Token {
        Token {
            token_type,
            location,
        }
    }

    pub fn is_comma(&self) -> bool {
        matches!(self.token_type, TokenType::Comma)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.token_type, TokenType::Function(_))
    }

    /// Whitespace carries no value and is skipped by the matcher
    pub fn is_insignificant(&self) -> bool {
        matches!(self.token_type, TokenType::Whitespace)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.token_type, TokenType::Eof)
    }

    /// Returns the numeric value carried by number, percentage and dimension tokens
    pub fn numeric_value(&self) -> Option<Number> {
        match self.token_type {
            TokenType::Number(value)
            | TokenType::Percentage(value)
            | TokenType::Dimension { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token_type {
            TokenType::AtKeyword(val) => write!(f, "@{val}"),
            TokenType::Function(val) => write!(f, "{val}("),
            TokenType::Url(val) => write!(f, "url({val})"),
            TokenType::Hash(val) | TokenType::IDHash(val) => write!(f, "#{val}"),
            TokenType::QuotedString(val) => write!(f, "\"{val}\""),
            TokenType::BadUrl(val) | TokenType::Ident(val) | TokenType::BadString(val) => {
                write!(f, "{val}")
            }
            TokenType::Delim(val) => write!(f, "{val}"),
            TokenType::Number(val) => write!(f, "{val}"),
            TokenType::Percentage(val) => write!(f, "{val}%"),
            TokenType::Dimension { unit, value } => write!(f, "{value}{unit}"),
            TokenType::Cdc => write!(f, "-->"),
            TokenType::Cdo => write!(f, "<!--"),
            TokenType::Colon => write!(f, ":"),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Comma => write!(f, ","),
            TokenType::LBracket => write!(f, "["),
            TokenType::RBracket => write!(f, "]"),
            TokenType::LCurly => write!(f, "{{"),
            TokenType::RCurly => write!(f, "}}"),
            TokenType::LParen => write!(f, "("),
            TokenType::RParen => write!(f, ")"),
            TokenType::Whitespace => write!(f, " "),
            TokenType::Eof => write!(f, "eof"),
        }
    }
}

/// Tokenizer for property and attribute values, following
/// [CSS Syntax Level 3](https://www.w3.org/TR/css-syntax-3/#tokenization)
///
/// Tokens are produced one at a time on demand. Buffering and backtracking over already
/// produced tokens is left to the consumer.
pub struct Tokenizer<'stream> {
    stream: &'stream ByteStream,
    /// Location of the first character of the value in its source
    start_location: Location,
    /// Position inside the value
    cur_location: Location,
}

impl<'stream> Tokenizer<'stream> {
    /// Creates a tokenizer whose token locations are reported relative to `location`
    pub fn new(stream: &'stream ByteStream, location: Location) -> Self {
        Self {
            stream,
            start_location: location,
            cur_location: Location::default(),
        }
    }

    /// Location of the next character in the source
    pub fn current_location(&self) -> Location {
        self.cur_location.relative_to(&self.start_location)
    }

    /// Returns true when the stream is closed and everything has been read
    pub fn eof(&self) -> bool {
        self.stream.eof()
    }

    /// Consumes the next token and returns it. Once the stream is exhausted, every call returns
    /// an EOF token.
    pub fn consume(&mut self) -> Token {
        let token = self.consume_token();
        log::trace!("{:?}", token);
        token
    }

    /// Consumes every remaining token, not including the final EOF token
    pub fn consume_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.consume();
            if token.is_eof() {
                return tokens;
            }
            tokens.push(token);
        }
    }

    fn consume_token(&mut self) -> Token {
        while self.look_ahead_slice(2) == "/*" {
            self.skip_comment();
        }

        let current = self.current_char();
        let loc = self.current_location();

        match current {
            Character::Surrogate(_) => {
                self.next_char();
                Token::new(TokenType::Delim(REPLACEMENT_CHARACTER), loc)
            }
            Character::StreamEnd => Token::new(TokenType::Eof, loc),
            Ch(c) if c.is_whitespace() => {
                self.consume_whitespace();
                Token::new(TokenType::Whitespace, loc)
            }
            Ch('"' | '\'') => self.consume_string_token(),
            Ch(c @ '#') => {
                // consume '#'
                self.next_char();

                if self.is_ident_char(self.current_char().into()) || self.starts_escape(0) {
                    return if self.starts_ident_seq(0) {
                        Token::new(TokenType::IDHash(self.consume_ident()), loc)
                    } else {
                        Token::new(TokenType::Hash(self.consume_ident()), loc)
                    };
                }

                Token::new(TokenType::Delim(c), loc)
            }
            Ch(')') => self.single(TokenType::RParen, loc),
            Ch('(') => self.single(TokenType::LParen, loc),
            Ch('[') => self.single(TokenType::LBracket, loc),
            Ch(']') => self.single(TokenType::RBracket, loc),
            Ch('{') => self.single(TokenType::LCurly, loc),
            Ch('}') => self.single(TokenType::RCurly, loc),
            Ch(',') => self.single(TokenType::Comma, loc),
            Ch(':') => self.single(TokenType::Colon, loc),
            Ch(';') => self.single(TokenType::Semicolon, loc),
            Ch(c @ '+') => {
                if self.starts_signed_number(0) {
                    return self.consume_numeric_token();
                }

                self.next_char();
                Token::new(TokenType::Delim(c), loc)
            }
            Ch(c @ '.') => {
                if self.stream.look_ahead(1).is_numeric() {
                    return self.consume_numeric_token();
                }

                self.next_char();
                Token::new(TokenType::Delim(c), loc)
            }
            Ch(c @ '-') => {
                if self.starts_signed_number(0) {
                    return self.consume_numeric_token();
                }

                let cdc_token = "-->";
                if self.look_ahead_slice(cdc_token.len()) == cdc_token {
                    self.consume_chars(cdc_token.len());
                    return Token::new(TokenType::Cdc, loc);
                }

                if self.starts_ident_seq(0) {
                    return self.consume_ident_like();
                }

                self.next_char();
                Token::new(TokenType::Delim(c), loc)
            }
            Ch(c @ '<') => {
                let cdo_token = "<!--";
                if self.look_ahead_slice(cdo_token.len()) == cdo_token {
                    self.consume_chars(cdo_token.len());
                    return Token::new(TokenType::Cdo, loc);
                }

                self.next_char();
                Token::new(TokenType::Delim(c), loc)
            }
            Ch(c @ '@') => {
                self.next_char();

                if self.starts_ident_seq(0) {
                    return Token::new(TokenType::AtKeyword(self.consume_ident()), loc);
                }

                Token::new(TokenType::Delim(c), loc)
            }
            Ch(c @ '\\') => {
                if self.starts_escape(0) {
                    return self.consume_ident_like();
                }

                // parse error
                self.next_char();
                Token::new(TokenType::Delim(c), loc)
            }
            Ch(c) if c.is_ascii_digit() => self.consume_numeric_token(),
            Ch(c) if self.is_ident_start(c) => self.consume_ident_like(),
            Ch(c) => {
                self.next_char();
                Token::new(TokenType::Delim(c), loc)
            }
        }
    }

    /// Consumes the single character making up a punctuation token
    fn single(&mut self, token_type: TokenType, loc: Location) -> Token {
        self.next_char();
        Token::new(token_type, loc)
    }

    /// An unterminated comment runs to the end of the input.
    fn skip_comment(&mut self) {
        self.consume_chars(2);

        while self.look_ahead_slice(2) != "*/" && !self.stream.eof() {
            self.next_char();
        }

        self.consume_chars(2);
    }

    /// Number, followed by a unit or `%` when present
    fn consume_numeric_token(&mut self) -> Token {
        let loc = self.current_location();
        let number = self.consume_number();

        if self.starts_ident_seq(0) {
            let unit = self.consume_ident();

            return Token::new(TokenType::Dimension { value: number, unit }, loc);
        } else if self.current_char() == Ch('%') {
            self.next_char();
            return Token::new(TokenType::Percentage(number), loc);
        }

        Token::new(TokenType::Number(number), loc)
    }

    /// A string hitting an unescaped newline becomes a bad string. The newline is left in the input.
    fn consume_string_token(&mut self) -> Token {
        let loc = self.current_location();

        let ending = self.next_char();
        let mut value = String::new();

        loop {
            // eof is a parse error, but we return the string read so far
            if self.current_char() == ending || self.stream.eof() {
                self.next_char();
                return Token::new(TokenType::QuotedString(value), loc);
            }

            // newline: parse error, the newline itself is not consumed
            if self.current_char() == Ch('\n') {
                return Token::new(TokenType::BadString(value), loc);
            }

            if self.current_char() == Ch('\\') && self.stream.look_ahead(1) == Ch('\n') {
                self.consume_chars(2);
                continue;
            }

            if self.starts_escape(0) {
                value.push(self.consume_escape());
                continue;
            }

            value.push(self.next_char().into());
        }
    }

    /// Reads an optional sign, digits, a fraction and an exponent
    fn consume_number(&mut self) -> Number {
        let mut value = String::new();

        if matches!(self.current_char(), Ch('+' | '-')) {
            value.push(self.next_char().into());
        }

        value.push_str(&self.consume_digits());

        if self.current_char() == Ch('.') && self.stream.look_ahead(1).is_numeric() {
            value.push_str(&self.consume_chars(2));
            value.push_str(&self.consume_digits());
        }

        let c1 = self.stream.look_ahead(0);
        let c2 = self.stream.look_ahead(1);
        let c3 = self.stream.look_ahead(2);
        if matches!(c1, Ch('e' | 'E'))
            && ((matches!(c2, Ch('-' | '+')) && c3.is_numeric()) || c2.is_numeric())
        {
            value.push(self.next_char().into());
            value.push(self.next_char().into());
            value.push_str(&self.consume_digits());
        }

        // The collected text is always a valid float literal at this point
        value.parse().unwrap_or_default()
    }

    /// Identifier, function start, or an unquoted url
    fn consume_ident_like(&mut self) -> Token {
        let loc = self.current_location();

        let value = self.consume_ident();

        if value.eq_ignore_ascii_case("url") && self.current_char() == Ch('(') {
            self.next_char();
            self.consume_whitespace();

            if matches!(self.current_char(), Ch('"' | '\'')) {
                return Token::new(TokenType::Function(value), loc);
            }

            return self.consume_url(loc);
        } else if self.current_char() == Ch('(') {
            self.next_char();
            return Token::new(TokenType::Function(value), loc);
        }

        Token::new(TokenType::Ident(value), loc)
    }

    /// Reads the body of `url(` up to the closing parenthesis
    fn consume_url(&mut self, loc: Location) -> Token {
        let mut url = String::new();

        self.consume_whitespace();

        loop {
            if self.current_char() == Ch(')') {
                self.next_char();
                break;
            }

            if self.stream.eof() {
                // parse error
                break;
            }

            if self.current_char().is_whitespace() {
                self.consume_whitespace();
                if self.current_char() == Ch(')') || self.stream.eof() {
                    continue;
                }

                self.consume_remnants_of_bad_url();
                return Token::new(TokenType::BadUrl(url), loc);
            }

            if matches!(self.current_char(), Ch('"' | '\'' | '(')) || self.is_non_printable_char() {
                // parse error
                self.consume_remnants_of_bad_url();
                return Token::new(TokenType::BadUrl(url), loc);
            }

            if self.starts_escape(0) {
                url.push(self.consume_escape());
                continue;
            }

            url.push(self.next_char().into());
        }

        Token::new(TokenType::Url(url), loc)
    }

    /// Skips up to and including the closing parenthesis of a malformed url
    fn consume_remnants_of_bad_url(&mut self) {
        loop {
            if self.current_char() == Ch(')') {
                self.next_char();
                break;
            }

            if self.stream.eof() {
                break;
            }

            if self.starts_escape(0) {
                self.consume_escape();
                continue;
            }

            self.next_char();
        }
    }

    /// Reads `\` followed by up to six hex digits, or a single escaped character
    fn consume_escape(&mut self) -> char {
        // consume '\'
        self.next_char();

        let mut value = String::new();

        // eof: parse error
        if self.stream.eof() {
            return REPLACEMENT_CHARACTER;
        }

        while matches!(self.current_char(), Ch(c) if c.is_ascii_hexdigit()) && value.len() < 6 {
            value.push(self.next_char().into());
        }

        if value.is_empty() {
            // Not a hex escape, the escaped character is taken literally
            return self.next_char().into();
        }

        if self.current_char().is_whitespace() {
            self.next_char();
        }

        match u32::from_str_radix(&value, 16).ok().and_then(char::from_u32) {
            Some(c) if c != NULL && c < MAX_ALLOWED => c,
            _ => REPLACEMENT_CHARACTER,
        }
    }

    /// Reads name characters and escapes. Callers check [`Self::starts_ident_seq`] first.
    fn consume_ident(&mut self) -> String {
        let mut value = String::new();

        loop {
            if self.starts_escape(0) {
                value.push(self.consume_escape());
                continue;
            }

            if !self.is_ident_char(self.current_char().into()) {
                break;
            }

            value.push(self.next_char().into());
        }

        value
    }

    fn consume_digits(&mut self) -> String {
        let mut value = String::new();

        while self.current_char().is_numeric() {
            value.push(self.next_char().into());
        }

        value
    }

    fn consume_chars(&mut self, mut len: usize) -> String {
        let mut value = String::new();

        while len > 0 {
            value.push(self.next_char().into());
            len -= 1;
        }

        value
    }

    fn consume_whitespace(&mut self) {
        while self.current_char().is_whitespace() {
            self.next_char();
        }
    }

    fn is_ident_start(&self, char: char) -> bool {
        char.is_alphabetic() || !char.is_ascii() || char == '_'
    }

    fn is_ident_char(&self, char: char) -> bool {
        self.is_ident_start(char) || char.is_ascii_digit() || char == '-'
    }

    fn is_non_printable_char(&self) -> bool {
        if let Ch(char) = self.current_char() {
            (NULL..=BACKSPACE).contains(&char)
                || (SHIFT_OUT..=INFORMATION_SEPARATOR_ONE).contains(&char)
                || char == LINE_TABULATION
                || char == DELETE
        } else {
            false
        }
    }

    /// A backslash not followed by a newline or the end of the input
    fn starts_escape(&self, start: usize) -> bool {
        let current_char = self.stream.look_ahead(start);
        let next_char = self.stream.look_ahead(start + 1);

        current_char == Ch('\\') && next_char != Ch('\n') && next_char != Character::StreamEnd
    }

    /// True when the code points at `start` begin an identifier, including `--` and `-\x`
    fn starts_ident_seq(&self, start: usize) -> bool {
        let first = self.stream.look_ahead(start);
        let second = self.stream.look_ahead(start + 1);

        if first == Ch('-') {
            return self.is_ident_start(second.into())
                || second == Ch('-')
                || self.starts_escape(start + 1);
        }

        if first == Ch('\\') {
            return self.starts_escape(start);
        }

        matches!(first, Ch(c) if self.is_ident_start(c))
    }

    fn starts_signed_number(&self, start: usize) -> bool {
        let current = self.stream.look_ahead(start);
        let next = self.stream.look_ahead(start + 1);
        let last = self.stream.look_ahead(start + 2);

        // e.g. +1, -1, +.1, -0.01
        matches!(current, Ch('+' | '-'))
            && ((next == Ch('.') && last.is_numeric()) || next.is_numeric())
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

    fn look_ahead_slice(&self, len: usize) -> String {
        let mut s = String::new();

        for i in 0..len {
            match self.stream.look_ahead(i) {
                Ch(c) => s.push(c),
                _ => break,
            }
        }

        s
    }
}
