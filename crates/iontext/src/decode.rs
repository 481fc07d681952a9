//! Scalar decoders: pure functions from captured lexemes to typed values.
//!
//! The tokenizer hands over raw text (escapes intact, `_` separators kept).
//! These functions turn that text into values when an accessor asks for one.
//! Inputs have already been validated structurally, so failures here are
//! limited to semantic problems such as an out-of-range escape or exponent.

use core::fmt;

use num_bigint::BigInt;
use num_traits::Num;

use crate::error::SyntaxError;

/// Base of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Radix {
    /// Plain digits, e.g. `123`.
    Decimal,
    /// `0b` prefix.
    Binary,
    /// `0x` prefix.
    Hex,
}

impl Radix {
    /// The numeric base, as accepted by [`char::is_digit`].
    pub fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Binary => 2,
            Radix::Hex => 16,
        }
    }
}

/// An arbitrary-precision decimal, `coefficient × 10^exponent`.
///
/// Precision is preserved: `1.0` has coefficient `10` and exponent `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    /// The unscaled value.
    pub coefficient: BigInt,
    /// Power of ten the coefficient is scaled by.
    pub exponent: i64,
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.coefficient, self.exponent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Strings and symbols: any Unicode scalar.
    Text,
    /// Clobs: ASCII characters and escapes up to `\xFF`.
    Clob,
}

/// Walks `raw`, resolving backslash escapes, and feeds each code point to
/// `emit`.
fn walk_escapes(
    raw: &str,
    mode: Mode,
    mut emit: impl FnMut(u32),
) -> Result<(), SyntaxError> {
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            if mode == Mode::Clob && !c.is_ascii() {
                return Err(SyntaxError::InvalidCharacter(c));
            }
            emit(u32::from(c));
            continue;
        }
        let Some(e) = chars.next() else {
            return Err(SyntaxError::InvalidEscape('\\'));
        };
        let code = match e {
            'a' => 0x07,
            'b' => 0x08,
            't' => 0x09,
            'n' => 0x0A,
            'v' => 0x0B,
            'f' => 0x0C,
            'r' => 0x0D,
            '0' => 0x00,
            '?' | '\'' | '"' | '/' | '\\' => u32::from(e),
            // Line continuation.
            '\n' => continue,
            'x' => hex_digits(&mut chars, 2, e)?,
            'u' if mode == Mode::Text => {
                let unit = hex_digits(&mut chars, 4, e)?;
                match unit {
                    0xD800..=0xDBFF => {
                        if chars.next() != Some('\\') || chars.next() != Some('u') {
                            return Err(SyntaxError::InvalidEscape(e));
                        }
                        let low = hex_digits(&mut chars, 4, e)?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return Err(SyntaxError::InvalidEscape(e));
                        }
                        0x1_0000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
                    }
                    0xDC00..=0xDFFF => return Err(SyntaxError::InvalidEscape(e)),
                    _ => unit,
                }
            }
            'U' if mode == Mode::Text => {
                let code = hex_digits(&mut chars, 8, e)?;
                if char::from_u32(code).is_none() {
                    return Err(SyntaxError::InvalidEscape(e));
                }
                code
            }
            _ => return Err(SyntaxError::InvalidEscape(e)),
        };
        emit(code);
    }
    Ok(())
}

fn hex_digits(chars: &mut core::str::Chars<'_>, n: usize, escape: char) -> Result<u32, SyntaxError> {
    let mut code = 0u32;
    for _ in 0..n {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or(SyntaxError::InvalidEscape(escape))?;
        code = (code << 4) | digit;
    }
    Ok(code)
}

/// Validates the escapes in quoted text without building the decoded string.
pub(crate) fn check_escapes(raw: &str) -> Result<(), SyntaxError> {
    walk_escapes(raw, Mode::Text, |_| {})
}

/// Decodes one or more raw segments of quoted text, concatenated.
pub(crate) fn unescape<S: AsRef<str>>(segments: &[S]) -> Result<String, SyntaxError> {
    let mut out = String::with_capacity(segments.iter().map(|s| s.as_ref().len()).sum());
    for segment in segments {
        walk_escapes(segment.as_ref(), Mode::Text, |code| {
            out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        })?;
    }
    Ok(out)
}

/// Decodes clob segments into bytes.
pub(crate) fn clob_bytes<S: AsRef<str>>(segments: &[S]) -> Result<Vec<u8>, SyntaxError> {
    let mut out = Vec::new();
    for segment in segments {
        walk_escapes(segment.as_ref(), Mode::Clob, |code| {
            // Clob mode only yields ASCII and `\xHH`.
            out.extend(u8::try_from(code).ok());
        })?;
    }
    Ok(out)
}

/// Decodes standard padded base64.
pub(crate) fn blob_bytes(text: &str) -> Result<Vec<u8>, SyntaxError> {
    let bytes = text.as_bytes();
    if bytes.len() % 4 != 0 {
        return Err(SyntaxError::InvalidLob("base64 length is not a multiple of 4"));
    }
    let padding = bytes.iter().rev().take_while(|&&b| b == b'=').count();
    if padding > 2 {
        return Err(SyntaxError::InvalidLob("too much base64 padding"));
    }

    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    let mut acc = 0u32;
    let mut bits = 0u32;
    for &b in &bytes[..bytes.len() - padding] {
        let value = base64_value(b).ok_or(SyntaxError::InvalidLob("invalid base64 character"))?;
        acc = ((acc << 6) | u32::from(value)) & 0xFFFF;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.extend(u8::try_from((acc >> bits) & 0xFF).ok());
        }
    }
    Ok(out)
}

fn base64_value(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Parses an integer literal, honoring its sign, radix prefix, and `_`
/// separators.
pub(crate) fn parse_int(text: &str, radix: Radix) -> Result<BigInt, SyntaxError> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let body = match radix {
        Radix::Decimal => body,
        Radix::Binary | Radix::Hex => body.get(2..).unwrap_or_default(),
    };
    let digits: String = body.chars().filter(|&c| c != '_').collect();
    let value = BigInt::from_str_radix(&digits, radix.base())
        .map_err(|_| SyntaxError::InvalidNumeric(text.to_owned()))?;
    Ok(if negative { -value } else { value })
}

/// Parses a float literal such as `1.5e3` or `-2E-1`.
pub(crate) fn parse_float(text: &str) -> Result<f64, SyntaxError> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| SyntaxError::InvalidNumeric(text.to_owned()))
}

/// Parses a decimal literal such as `1.23`, `12.`, or `1.23d-2`.
///
/// A negative zero coefficient is not distinguished from zero.
pub(crate) fn parse_decimal(text: &str) -> Result<Decimal, SyntaxError> {
    let invalid = || SyntaxError::InvalidNumeric(text.to_owned());
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();

    let (mantissa, exponent) = match cleaned.find(['d', 'D']) {
        Some(at) => {
            let exponent = cleaned[at + 1..].parse::<i64>().map_err(|_| invalid())?;
            (&cleaned[..at], exponent)
        }
        None => (cleaned.as_str(), 0),
    };
    let (int_part, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut digits = String::with_capacity(int_part.len() + fraction.len());
    digits.push_str(int_part);
    digits.push_str(fraction);
    let coefficient = digits.parse::<BigInt>().map_err(|_| invalid())?;

    let scale = i64::try_from(fraction.len()).map_err(|_| invalid())?;
    let exponent = exponent.checked_sub(scale).ok_or_else(invalid)?;
    Ok(Decimal {
        coefficient,
        exponent,
    })
}
