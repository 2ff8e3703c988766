use std::cell::Cell;
use std::fmt::{Debug, Formatter};
use std::io::Read;
use std::{fmt, io};

pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_CR: char = '\u{000D}';

/// A single element read from the stream: a decoded character, an undecodable byte sequence, or
/// the end of the input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Character {
    /// Decoded UTF-8 character
    Ch(char),
    /// Surrogate code point or a byte sequence that is not valid UTF-8
    Surrogate(u16),
    /// No more input
    StreamEnd,
}

use Character::*;

/// Surrogates and the end of the stream convert to U+0000
impl From<Character> for char {
    fn from(c: Character) -> Self {
        match c {
            Ch(c) => c,
            Surrogate(..) | StreamEnd => '\u{0000}',
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ch(ch) => write!(f, "{ch}"),
            Surrogate(surrogate) => write!(f, "U+{surrogate:04X}"),
            StreamEnd => write!(f, "StreamEnd"),
        }
    }
}

impl Character {
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Ch(c) if c.is_whitespace())
    }

    /// Returns true for ascii digits only
    pub fn is_numeric(&self) -> bool {
        matches!(self, Ch(c) if c.is_ascii_digit())
    }
}

/// Read access to a character stream. Reading goes through `&self` so tokenizers and lexers can
/// share a single stream.
pub trait Stream {
    /// Reads the current character
    fn read(&self) -> Character;
    /// Reads the current character and moves past it
    fn read_and_next(&self) -> Character;
    /// Reads the character `offset` positions ahead without moving
    fn look_ahead(&self, offset: usize) -> Character;
    fn next(&self);
    /// Current position in bytes
    fn tell_bytes(&self) -> usize;
    fn eof(&self) -> bool;
}

/// An in-memory UTF-8 buffer. CRLF pairs are read as a single LF.
#[derive(Default)]
pub struct ByteStream {
    buffer: Vec<u8>,
    pos: Cell<usize>,
}

impl Stream for ByteStream {
    fn read(&self) -> Character {
        self.decode_at(self.pos.get()).0
    }

    fn read_and_next(&self) -> Character {
        let (ch, len) = self.decode_at(self.pos.get());
        self.pos.set(self.pos.get() + len);

        if ch == Ch(CHAR_CR) && self.read() == Ch(CHAR_LF) {
            self.next();
            return Ch(CHAR_LF);
        }

        ch
    }

    fn look_ahead(&self, offset: usize) -> Character {
        let mut pos = self.pos.get();
        for _ in 0..offset {
            let (_, len) = self.decode_at(pos);
            if len == 0 {
                return StreamEnd;
            }
            pos += len;
        }

        self.decode_at(pos).0
    }

    fn next(&self) {
        let (_, len) = self.decode_at(self.pos.get());
        self.pos.set(self.pos.get() + len);
    }

    fn tell_bytes(&self) -> usize {
        self.pos.get()
    }

    fn eof(&self) -> bool {
        self.pos.get() >= self.buffer.len()
    }
}

impl ByteStream {
    #[must_use]
    pub fn new_from_str(s: &str) -> Self {
        Self::new_from_bytes(s.as_bytes())
    }

    /// Creates a stream from raw bytes. Invalid UTF-8 is read as [`Character::Surrogate`].
    #[must_use]
    pub fn new_from_bytes(bytes: &[u8]) -> Self {
        Self {
            buffer: bytes.to_vec(),
            pos: Cell::new(0),
        }
    }

    /// Creates a stream holding everything the reader produces
    pub fn from_reader(mut r: impl Read) -> io::Result<Self> {
        let mut buffer = Vec::new();
        r.read_to_end(&mut buffer)?;

        Ok(Self {
            buffer,
            pos: Cell::new(0),
        })
    }

    // Decodes the character at the given byte position, together with its width in bytes
    fn decode_at(&self, pos: usize) -> (Character, usize) {
        let Some(&first_byte) = self.buffer.get(pos) else {
            return (StreamEnd, 0);
        };

        // stray continuation bytes, overlong two byte leads and leads past U+10FFFF
        let width = match first_byte {
            0x00..=0x7F => 1,
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return (Surrogate(u16::from(first_byte)), 1),
        };

        let Some(tail) = self.buffer.get(pos + 1..pos + width) else {
            // Truncated sequence at the end of the input
            return (Surrogate(0xFFFD), self.buffer.len() - pos);
        };

        if tail.iter().any(|b| b & 0b1100_0000 != 0b1000_0000) {
            return (Surrogate(u16::from(first_byte)), 1);
        }

        let code = tail
            .iter()
            .fold(u32::from(first_byte) & lead_mask(width), |acc, b| {
                (acc << 6) | (u32::from(*b) & 0x3F)
            });

        if code < min_code_point(width) {
            return (Surrogate(0xFFFD), width);
        }

        if (0xD800..=0xDFFF).contains(&code) {
            return (Surrogate(code as u16), width);
        }

        match char::from_u32(code) {
            Some(c) => (Ch(c), width),
            None => (Surrogate(0xFFFD), width),
        }
    }
}

/// Location holds the start position of the given element in the data source
#[derive(Clone, PartialEq, Eq)]
pub struct Location {
    /// Line number, starting with 1
    pub line: usize,
    /// Column number, starting with 1
    pub column: usize,
    /// Character offset, starting with 0
    pub offset: usize,
}

impl Default for Location {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Location {
    #[must_use]
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Advances the location past the given character
    pub fn advance(&mut self, ch: Character) {
        match ch {
            Ch(CHAR_LF) => {
                self.line += 1;
                self.column = 1;
                self.offset += 1;
            }
            Ch(_) | Surrogate(_) => {
                self.column += 1;
                self.offset += 1;
            }
            StreamEnd => {}
        }
    }

    /// Returns this location shifted so that it is relative to the given start location
    #[must_use]
    pub fn relative_to(&self, start: &Location) -> Location {
        let column = if self.line == 1 {
            start.column + self.column - 1
        } else {
            self.column
        };

        Location::new(start.line + self.line - 1, column, start.offset + self.offset)
    }
}

impl Debug for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Smallest code point that needs the given number of bytes. Anything below it is overlong.
#[inline]
fn min_code_point(width: usize) -> u32 {
    match width {
        1 => 0,
        2 => 0x80,
        3 => 0x800,
        _ => 0x1_0000,
    }
}

#[inline]
fn lead_mask(width: usize) -> u32 {
    match width {
        1 => 0x7F,
        2 => 0x1F,
        3 => 0x0F,
        _ => 0x07,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test]
    fn read_multibyte() {
        let stream = ByteStream::new_from_str("f∞f");
        assert!(!stream.eof());
        assert_eq!(stream.read_and_next(), Ch('f'));
        assert_eq!(stream.read_and_next(), Ch('∞'));
        assert_eq!(stream.tell_bytes(), 4);
        assert_eq!(stream.read_and_next(), Ch('f'));
        assert!(stream.eof());
        assert_eq!(stream.read_and_next(), StreamEnd);
        assert_eq!(stream.tell_bytes(), 5);
    }

    #[test]
    fn look_ahead_does_not_move() {
        let stream = ByteStream::new_from_str("a∞c");

        assert_eq!(stream.look_ahead(0), Ch('a'));
        assert_eq!(stream.look_ahead(1), Ch('∞'));
        assert_eq!(stream.look_ahead(2), Ch('c'));
        assert_eq!(stream.look_ahead(3), StreamEnd);
        assert_eq!(stream.look_ahead(7), StreamEnd);
        assert_eq!(stream.tell_bytes(), 0);
    }

    #[test]
    fn empty_stream() {
        let stream = ByteStream::default();
        assert!(stream.eof());
        assert_eq!(stream.read(), StreamEnd);
    }

    #[test]
    fn crlf_is_one_newline() {
        let stream = ByteStream::new_from_str("a\r\nb");
        assert_eq!(stream.read_and_next(), Ch('a'));
        assert_eq!(stream.read_and_next(), Ch(CHAR_LF));
        assert_eq!(stream.read_and_next(), Ch('b'));
    }

    #[test]
    fn invalid_utf8() {
        let stream = ByteStream::new_from_bytes(&[b'a', 0xC3, b'b', 0xE2, 0x88]);

        assert_eq!(stream.read_and_next(), Ch('a'));
        assert!(matches!(stream.read_and_next(), Surrogate(_)));
        assert_eq!(stream.read_and_next(), Ch('b'));
        assert!(matches!(stream.read_and_next(), Surrogate(_)));
        assert!(stream.eof());
    }

    #[test_case(&[0xC0, 0xAF]; "overlong two byte slash")]
    #[test_case(&[0xC1, 0xBF]; "overlong two byte lead")]
    #[test_case(&[0x80, 0x80]; "stray continuation bytes")]
    #[test_case(&[0xE0, 0x80, 0xAF]; "overlong three byte")]
    #[test_case(&[0xF0, 0x80, 0x80, 0xAF]; "overlong four byte")]
    #[test_case(&[0xF4, 0x90, 0x80, 0x80]; "above max code point")]
    #[test_case(&[0xF5, 0x80, 0x80, 0x80]; "lead past max code point")]
    #[test_case(&[0xED, 0xA0, 0x80]; "encoded surrogate")]
    fn malformed_utf8_is_a_surrogate(bytes: &[u8]) {
        let stream = ByteStream::new_from_bytes(bytes);

        while !stream.eof() {
            assert!(matches!(stream.read_and_next(), Surrogate(_)));
        }
    }

    #[test]
    fn shortest_forms_decode() {
        let stream = ByteStream::new_from_bytes(&[
            0xC2, 0x80, 0xE0, 0xA0, 0x80, 0xF0, 0x90, 0x80, 0x80, 0xF4, 0x8F, 0xBF, 0xBF,
        ]);

        assert_eq!(stream.read_and_next(), Ch('\u{80}'));
        assert_eq!(stream.read_and_next(), Ch('\u{800}'));
        assert_eq!(stream.read_and_next(), Ch('\u{10000}'));
        assert_eq!(stream.read_and_next(), Ch('\u{10FFFF}'));
        assert!(stream.eof());
    }

    #[test]
    fn from_reader() {
        let stream = ByteStream::from_reader("<length>".as_bytes()).unwrap();
        assert_eq!(stream.read_and_next(), Ch('<'));
        assert_eq!(stream.look_ahead(6), Ch('>'));
    }

    #[test]
    fn location() {
        let mut loc = Location::default();
        loc.advance(Ch('a'));
        loc.advance(Ch(CHAR_LF));
        loc.advance(Ch('b'));
        assert_eq!(loc, Location::new(2, 2, 3));

        let start = Location::new(4, 10, 100);
        assert_eq!(Location::new(1, 3, 2).relative_to(&start), Location::new(4, 12, 102));
        assert_eq!(Location::new(2, 3, 8).relative_to(&start), Location::new(5, 3, 108));
    }
}
