//! JSON parsing.

use crate::builder::{BuildError, Builder, Value};
use crate::options::Options;
use crate::util::validate_utf8;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reasons a JSON document is rejected.
#[derive(Debug)]
pub enum ParseErrorKind {
    UnexpectedCharacter(u8),
    UnexpectedEnd,
    BadEscape,
    NumberOverflow,
    InvalidUtf8,
    TrailingData,
    Builder(BuildError),
}

/// A parse failure and the byte offset it was detected at.
#[derive(Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: usize,
}

impl Display for ParseError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ParseErrorKind::UnexpectedCharacter(byte) => {
                write!(f, "unexpected character {:?} at position {}", *byte as char, self.pos)
            }
            ParseErrorKind::UnexpectedEnd => write!(f, "unexpected end of input at position {}", self.pos),
            ParseErrorKind::BadEscape => write!(f, "invalid escape sequence at position {}", self.pos),
            ParseErrorKind::NumberOverflow => write!(f, "number out of range at position {}", self.pos),
            ParseErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8 sequence at position {}", self.pos),
            ParseErrorKind::TrailingData => {
                write!(f, "trailing characters after the value at position {}", self.pos)
            }
            ParseErrorKind::Builder(e) => write!(f, "{} at position {}", e, self.pos),
        }
    }
}

impl Error for ParseError {}

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Recursive-descent JSON parser feeding a [`Builder`].
#[derive(Default)]
pub struct Parser {
    options: Options,
}

impl Parser {
    #[inline]
    pub fn new() -> Parser {
        Parser { options: Options::default() }
    }

    #[inline]
    pub fn with_options(options: Options) -> Parser {
        Parser { options }
    }

    /// Parses `json` and returns the sealed builder.
    #[inline]
    pub fn parse<T: AsRef<[u8]>>(&self, json: T) -> ParseResult<Builder> {
        let mut run = ParseRun {
            bytes: json.as_ref(),
            pos: 0,
            builder: Builder::with_options(self.options.clone()),
            scratch: Vec::new(),
        };
        run.parse_document()?;
        Ok(run.builder)
    }
}

struct ParseRun<'a> {
    bytes: &'a [u8],
    pos: usize,
    builder: Builder,
    scratch: Vec<u8>,
}

impl ParseRun<'_> {
    fn parse_document(&mut self) -> ParseResult<()> {
        self.skip_whitespace();
        self.parse_value()?;
        self.skip_whitespace();
        if self.pos != self.bytes.len() {
            return Err(self.error(ParseErrorKind::TrailingData));
        }
        Ok(())
    }

    fn parse_value(&mut self) -> ParseResult<()> {
        match self.peek() {
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string(),
            Some(b't') => self.parse_literal(b"true", Value::Bool(true)),
            Some(b'f') => self.parse_literal(b"false", Value::Bool(false)),
            Some(b'n') => self.parse_literal(b"null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(byte) => Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
        }
    }

    fn parse_object(&mut self) -> ParseResult<()> {
        self.pos += 1;
        self.build(Value::Object)?;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return self.close();
        }
        loop {
            match self.peek() {
                Some(b'"') => self.parse_string()?, // the key
                Some(byte) => return Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            }
            self.skip_whitespace();
            match self.peek() {
                Some(b':') => self.pos += 1,
                Some(byte) => return Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            }
            self.skip_whitespace();
            self.parse_value()?;
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                }
                Some(b'}') => {
                    self.pos += 1;
                    return self.close();
                }
                Some(byte) => return Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            }
        }
    }

    fn parse_array(&mut self) -> ParseResult<()> {
        self.pos += 1;
        self.build(Value::Array)?;
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return self.close();
        }
        loop {
            self.parse_value()?;
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                }
                Some(b']') => {
                    self.pos += 1;
                    return self.close();
                }
                Some(byte) => return Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            }
        }
    }

    fn parse_literal(&mut self, literal: &'static [u8], value: Value<'static>) -> ParseResult<()> {
        let end = self.pos + literal.len();
        if self.bytes.len() < end {
            return Err(ParseError {
                kind: ParseErrorKind::UnexpectedEnd,
                pos: self.bytes.len(),
            });
        }
        if &self.bytes[self.pos..end] != literal {
            return Err(self.error(ParseErrorKind::UnexpectedCharacter(self.bytes[self.pos])));
        }
        self.pos = end;
        self.build(value)
    }

    fn parse_number(&mut self) -> ParseResult<()> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        // integral part: a single zero or a nonzero-led digit run
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.skip_digits(),
            Some(byte) => return Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
            None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
        let mut integral = true;
        if self.peek() == Some(b'.') {
            integral = false;
            self.pos += 1;
            self.expect_digits()?;
        }
        if let Some(b'e' | b'E') = self.peek() {
            integral = false;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            self.expect_digits()?;
        }
        // SAFETY: the scanned range is ASCII
        let text = unsafe { std::str::from_utf8_unchecked(&self.bytes[start..self.pos]) };
        if integral {
            if let Ok(value) = text.parse::<i64>() {
                return self.build(Value::Int(value));
            }
            if !negative {
                if let Ok(value) = text.parse::<u64>() {
                    return self.build(Value::UInt(value));
                }
            }
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => self.build(Value::Double(value)),
            _ => Err(ParseError {
                kind: ParseErrorKind::NumberOverflow,
                pos: start,
            }),
        }
    }

    fn parse_string(&mut self) -> ParseResult<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = match self.parse_string_into(&mut scratch) {
            Ok(()) => {
                // SAFETY: parse_string_into validated the bytes
                let value = unsafe { std::str::from_utf8_unchecked(&scratch) };
                let pos = self.pos;
                self.builder.add(Value::String(value)).map_err(|e| ParseError {
                    kind: ParseErrorKind::Builder(e),
                    pos,
                })
            }
            Err(e) => Err(e),
        };
        scratch.clear();
        self.scratch = scratch;
        result
    }

    fn parse_string_into(&mut self, scratch: &mut Vec<u8>) -> ParseResult<()> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut ascii_only = true;
        loop {
            let byte = match self.peek() {
                Some(byte) => byte,
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            };
            match byte {
                b'"' => {
                    self.pos += 1;
                    if !ascii_only && !validate_utf8(scratch) {
                        return Err(ParseError {
                            kind: ParseErrorKind::InvalidUtf8,
                            pos: start,
                        });
                    }
                    return Ok(());
                }
                b'\\' => {
                    self.pos += 1;
                    self.parse_escape(scratch)?;
                }
                0x00..=0x1f => return Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
                _ => {
                    if byte >= 0x80 {
                        ascii_only = false;
                    }
                    scratch.push(byte);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_escape(&mut self, scratch: &mut Vec<u8>) -> ParseResult<()> {
        let pos = self.pos - 1; // at the backslash
        let byte = match self.peek() {
            Some(byte) => byte,
            None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
        };
        self.pos += 1;
        match byte {
            b'"' => scratch.push(b'"'),
            b'\\' => scratch.push(b'\\'),
            b'/' => scratch.push(b'/'),
            b'b' => scratch.push(0x08),
            b'f' => scratch.push(0x0c),
            b'n' => scratch.push(b'\n'),
            b'r' => scratch.push(b'\r'),
            b't' => scratch.push(b'\t'),
            b'u' => {
                let first = self.parse_hex4()?;
                let code = if (0xd800..=0xdbff).contains(&first) {
                    // a high surrogate; the low half must follow
                    if self.peek() != Some(b'\\') {
                        return Err(ParseError { kind: ParseErrorKind::BadEscape, pos });
                    }
                    self.pos += 1;
                    if self.peek() != Some(b'u') {
                        return Err(ParseError { kind: ParseErrorKind::BadEscape, pos });
                    }
                    self.pos += 1;
                    let second = self.parse_hex4()?;
                    if !(0xdc00..=0xdfff).contains(&second) {
                        return Err(ParseError { kind: ParseErrorKind::BadEscape, pos });
                    }
                    0x10000 + (((first - 0xd800) as u32) << 10) + (second - 0xdc00) as u32
                } else if (0xdc00..=0xdfff).contains(&first) {
                    return Err(ParseError { kind: ParseErrorKind::BadEscape, pos });
                } else {
                    first as u32
                };
                match char::from_u32(code) {
                    Some(c) => {
                        let mut buf = [0u8; 4];
                        scratch.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                    None => return Err(ParseError { kind: ParseErrorKind::BadEscape, pos }),
                }
            }
            _ => return Err(ParseError { kind: ParseErrorKind::BadEscape, pos }),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> ParseResult<u16> {
        let mut value: u16 = 0;
        for _ in 0..4 {
            let byte = match self.peek() {
                Some(byte) => byte,
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            };
            let digit = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => return Err(self.error(ParseErrorKind::BadEscape)),
            };
            value = (value << 4) | digit as u16;
            self.pos += 1;
        }
        Ok(value)
    }

    #[inline]
    fn build(&mut self, value: Value<'_>) -> ParseResult<()> {
        let pos = self.pos;
        self.builder.add(value).map_err(|e| ParseError {
            kind: ParseErrorKind::Builder(e),
            pos,
        })
    }

    #[inline]
    fn close(&mut self) -> ParseResult<()> {
        let pos = self.pos - 1; // the bracket that sealed the container
        self.builder.close().map_err(|e| ParseError {
            kind: ParseErrorKind::Builder(e),
            pos,
        })
    }

    #[inline]
    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError { kind, pos: self.pos }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    #[inline]
    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
    }

    #[inline]
    fn expect_digits(&mut self) -> ParseResult<()> {
        match self.peek() {
            Some(b'0'..=b'9') => {
                self.skip_digits();
                Ok(())
            }
            Some(byte) => Err(self.error(ParseErrorKind::UnexpectedCharacter(byte))),
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }
}
