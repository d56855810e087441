//! Tolerant parsing of an incomplete JSON text.
//!
//! A structured generation response arrives as JSON text cut at arbitrary
//! points: inside a string, between a key and its colon, halfway through
//! `true`. [`parse_partial`] turns any such prefix into the most complete
//! [`serde_json::Value`] it supports:
//!
//! | Cut inside… | Result |
//! |---|---|
//! | a string value | the characters received so far |
//! | an object key | the key (and its pending value) is dropped |
//! | a literal (`tr`, `nul`) | the literal it must become |
//! | a number (`12.`, `-`) | the longest parseable prefix, or dropped |
//! | an escape sequence | the partial escape is dropped |
//! | open objects/arrays | closed |
//!
//! A character that can never continue a JSON document is a syntax error;
//! that is how a malformed response is told apart from an unfinished one.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartialJsonError {
    #[error("unexpected character {found:?} at offset {offset}")]
    Syntax { offset: usize, found: char },
}

/// Parse a JSON prefix. `Ok(None)` means no value has started yet.
pub fn parse_partial(text: &str) -> Result<Option<Value>, PartialJsonError> {
    let mut cursor = Cursor { src: text, pos: 0 };
    let value = cursor.value()?;
    cursor.skip_ws();
    if let Some(found) = cursor.peek() {
        return Err(cursor.error(found));
    }
    Ok(value)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !matches!(c, ' ' | '\t' | '\n' | '\r') {
                break;
            }
            self.pos += 1;
        }
    }

    fn error(&self, found: char) -> PartialJsonError {
        PartialJsonError::Syntax {
            offset: self.pos,
            found,
        }
    }

    fn value(&mut self) -> Result<Option<Value>, PartialJsonError> {
        self.skip_ws();
        match self.peek() {
            None => Ok(None),
            Some('{') => self.object().map(Some),
            Some('[') => self.array().map(Some),
            Some('"') => Ok(Some(Value::String(self.string()?.0))),
            Some('t') => self.literal("true", Value::Bool(true)),
            Some('f') => self.literal("false", Value::Bool(false)),
            Some('n') => self.literal("null", Value::Null),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) => Err(self.error(c)),
        }
    }

    fn object(&mut self) -> Result<Value, PartialJsonError> {
        self.bump();
        let mut map = Map::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Ok(Value::Object(map)),
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some('"') => {}
                Some(c) => return Err(self.error(c)),
            }
            let (key, closed) = self.string()?;
            if !closed {
                return Ok(Value::Object(map));
            }
            self.skip_ws();
            match self.peek() {
                None => return Ok(Value::Object(map)),
                Some(':') => {
                    self.bump();
                }
                Some(c) => return Err(self.error(c)),
            }
            match self.value()? {
                Some(value) => {
                    map.insert(key, value);
                }
                None => return Ok(Value::Object(map)),
            }
            self.skip_ws();
            match self.peek() {
                None => return Ok(Value::Object(map)),
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some(c) => return Err(self.error(c)),
            }
        }
    }

    fn array(&mut self) -> Result<Value, PartialJsonError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Ok(Value::Array(items)),
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                _ => {}
            }
            match self.value()? {
                Some(value) => items.push(value),
                None => return Ok(Value::Array(items)),
            }
            self.skip_ws();
            match self.peek() {
                None => return Ok(Value::Array(items)),
                Some(',') => {
                    self.bump();
                }
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(c) => return Err(self.error(c)),
            }
        }
    }

    /// Returns the decoded string and whether its closing quote was seen.
    fn string(&mut self) -> Result<(String, bool), PartialJsonError> {
        self.bump();
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Ok((out, false));
            };
            match c {
                '"' => return Ok((out, true)),
                '\\' => {
                    let escape_at = self.pos;
                    let Some(e) = self.bump() else {
                        return Ok((out, false));
                    };
                    match e {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'b' => out.push('\u{0008}'),
                        'f' => out.push('\u{000C}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => match self.unicode_escape()? {
                            Some(ch) => out.push(ch),
                            None => return Ok((out, false)),
                        },
                        other => {
                            return Err(PartialJsonError::Syntax {
                                offset: escape_at,
                                found: other,
                            });
                        }
                    }
                }
                other => out.push(other),
            }
        }
    }

    /// Reads the hex digits after `\u`. `None` when the input ends first.
    fn unicode_escape(&mut self) -> Result<Option<char>, PartialJsonError> {
        let Some(high) = self.hex4()? else {
            return Ok(None);
        };
        if !(0xD800..0xDC00).contains(&high) {
            return Ok(Some(char::from_u32(high).unwrap_or('\u{FFFD}')));
        }
        // High surrogate: a `\uXXXX` low half should follow.
        if self.src[self.pos..].len() < 2 {
            return Ok(None);
        }
        if !self.src[self.pos..].starts_with("\\u") {
            return Ok(Some('\u{FFFD}'));
        }
        self.pos += 2;
        let Some(low) = self.hex4()? else {
            return Ok(None);
        };
        let combined = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
        Ok(Some(char::from_u32(combined).unwrap_or('\u{FFFD}')))
    }

    fn hex4(&mut self) -> Result<Option<u32>, PartialJsonError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(c) = self.peek() else {
                return Ok(None);
            };
            let Some(digit) = c.to_digit(16) else {
                return Err(self.error(c));
            };
            self.bump();
            value = value * 16 + digit;
        }
        Ok(Some(value))
    }

    fn literal(&mut self, word: &str, value: Value) -> Result<Option<Value>, PartialJsonError> {
        for expected in word.chars() {
            match self.peek() {
                None => return Ok(Some(value)),
                Some(c) if c == expected => {
                    self.bump();
                }
                Some(c) => return Err(self.error(c)),
            }
        }
        Ok(Some(value))
    }

    fn number(&mut self) -> Result<Option<Value>, PartialJsonError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')) {
                break;
            }
            self.bump();
        }
        let at_end = self.peek().is_none();
        let mut digits = &self.src[start..self.pos];
        loop {
            if let Ok(n) = serde_json::from_str::<Number>(digits) {
                return Ok(Some(Value::Number(n)));
            }
            if !at_end {
                let found = digits.chars().last().unwrap_or('-');
                return Err(PartialJsonError::Syntax {
                    offset: start,
                    found,
                });
            }
            match digits.char_indices().last() {
                Some((idx, c)) if matches!(c, '.' | 'e' | 'E' | '+' | '-') => {
                    digits = &digits[..idx];
                }
                _ => return Ok(None),
            }
            if digits.is_empty() {
                return Ok(None);
            }
        }
    }
}
