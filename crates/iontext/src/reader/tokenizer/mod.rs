//! Tokenizer: classifies Ion text lexemes on top of [`InputBuffer`].
//!
//! What it does
//! - `next()` skips whitespace and comments, then classifies the next token.
//!   Punctuation is consumed; for everything else only enough is read to pick
//!   a [`TokenKind`], and the body is left for one of the `read_*` capture
//!   methods.
//! - A body that nobody captured is skipped on the following `next()`, so
//!   callers may ignore tokens (containers included) they do not care about.
//! - Literal classification (`is_triple_quote`, `is_inf`,
//!   `scan_for_numeric_type`) uses short `peek_n` scans and never leaves a
//!   partly consumed lookahead behind when a check fails.
//!
//! Scope
//! - Captures are raw: quoted text keeps its escapes (after their shape is
//!   validated) and numbers keep their separators. Decoding happens in
//!   `crate::decode`.

use std::io::Read;

use smallvec::{SmallVec, smallvec};

use super::input::{EOF, InputBuffer, Lookahead};
use crate::{
    decode::{self, Radix},
    error::{Error, Result, SyntaxError},
};

/// Whether a token's text was written between quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quoting {
    Bare,
    Quoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Eof,
    /// Identifier symbol, e.g. `foo`. Also covers `null`, `true`, `nan`...
    Symbol,
    /// `'quoted symbol'`
    QuotedSymbol,
    /// Run of operator characters, legal inside s-expressions.
    SymbolOperator,
    /// `"short string"`
    String,
    /// `'''long string'''`, one segment.
    LongString,
    /// Decimal digits; an int, decimal, or float.
    Numeric,
    Binary,
    Hex,
    Timestamp,
    FloatInf,
    FloatMinusInf,
    Comma,
    Colon,
    DoubleColon,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    OpenDoubleBrace,
}

impl TokenKind {
    pub(crate) fn quoting(self) -> Quoting {
        match self {
            TokenKind::QuotedSymbol | TokenKind::String | TokenKind::LongString => Quoting::Quoted,
            _ => Quoting::Bare,
        }
    }

    pub(crate) fn radix(self) -> Option<Radix> {
        match self {
            TokenKind::Numeric => Some(Radix::Decimal),
            TokenKind::Binary => Some(Radix::Binary),
            TokenKind::Hex => Some(Radix::Hex),
            _ => None,
        }
    }

    /// Human readable name used in error messages.
    pub(crate) fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Symbol | TokenKind::QuotedSymbol => "symbol",
            TokenKind::SymbolOperator => "operator",
            TokenKind::String | TokenKind::LongString => "string",
            TokenKind::Numeric | TokenKind::Binary | TokenKind::Hex => "number",
            TokenKind::Timestamp => "timestamp",
            TokenKind::FloatInf | TokenKind::FloatMinusInf => "infinity",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::DoubleColon => "'::'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenBracket => "'['",
            TokenKind::CloseBracket => "']'",
            TokenKind::OpenBrace => "'{'",
            TokenKind::CloseBrace => "'}'",
            TokenKind::OpenDoubleBrace => "'{{'",
        }
    }
}

/// Raw content of a `{{ ... }}` literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LobText {
    /// Base64 characters with whitespace removed.
    Blob(String),
    /// Raw quoted segments, escapes intact.
    Clob(Vec<String>),
}

pub(crate) struct Tokenizer<R> {
    input: InputBuffer<R>,
    kind: TokenKind,
    /// The body of `kind` has not been captured yet.
    unfinished: bool,
}

impl<R: Read> Tokenizer<R> {
    pub(crate) fn new(source: R) -> Self {
        Self {
            input: InputBuffer::new(source),
            kind: TokenKind::Eof,
            unfinished: false,
        }
    }

    pub(crate) fn position(&self) -> (usize, usize) {
        self.input.position()
    }

    pub(crate) fn error(&self, source: SyntaxError) -> Error {
        let (line, column) = self.position();
        Error::Syntax {
            source,
            line,
            column,
        }
    }

    // --- Input helpers -----------------------------------------------------

    pub(crate) fn read(&mut self) -> Result<Option<char>> {
        Ok(self.input.read()?)
    }

    pub(crate) fn unread(&mut self, c: Option<char>) {
        self.input.unread(c);
    }

    pub(crate) fn peek(&mut self) -> Result<Option<char>> {
        Ok(self.input.peek()?)
    }

    pub(crate) fn peek_n(&mut self, n: usize) -> Result<Lookahead> {
        Ok(self.input.peek_n(n)?)
    }

    // --- Tokens ------------------------------------------------------------

    /// Classifies the next token, skipping the body of the previous one if it
    /// was never captured.
    pub(crate) fn next(&mut self) -> Result<TokenKind> {
        if self.unfinished {
            self.finish()?;
        }

        let (c, _) = self.skip_whitespace()?;
        let Some(c) = c else {
            return Ok(self.set(TokenKind::Eof, false));
        };
        self.read()?;

        let kind = match c {
            ',' => TokenKind::Comma,
            ':' => {
                if self.peek()? == Some(':') {
                    self.read()?;
                    TokenKind::DoubleColon
                } else {
                    TokenKind::Colon
                }
            }
            '{' => {
                if self.peek()? == Some('{') {
                    self.read()?;
                    TokenKind::OpenDoubleBrace
                } else {
                    TokenKind::OpenBrace
                }
            }
            '}' => TokenKind::CloseBrace,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '"' => TokenKind::String,
            '\'' => {
                if self.is_triple_quote()? {
                    TokenKind::LongString
                } else {
                    TokenKind::QuotedSymbol
                }
            }
            '+' => {
                if self.is_inf(c)? {
                    TokenKind::FloatInf
                } else {
                    self.unread(Some(c));
                    TokenKind::SymbolOperator
                }
            }
            '-' => self.classify_minus()?,
            d if d.is_ascii_digit() => {
                let kind = self.scan_for_numeric_type(d)?;
                self.unread(Some(d));
                kind
            }
            c if is_identifier_start(c) => {
                self.unread(Some(c));
                TokenKind::Symbol
            }
            c if is_operator_char(c) => {
                self.unread(Some(c));
                TokenKind::SymbolOperator
            }
            c => return Err(self.error(SyntaxError::InvalidCharacter(c))),
        };

        let unfinished = !matches!(
            kind,
            TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::DoubleColon
                | TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::CloseBrace
                | TokenKind::FloatInf
                | TokenKind::FloatMinusInf
        );
        tracing::trace!(?kind, "token");
        Ok(self.set(kind, unfinished))
    }

    fn set(&mut self, kind: TokenKind, unfinished: bool) -> TokenKind {
        self.kind = kind;
        self.unfinished = unfinished;
        kind
    }

    fn classify_minus(&mut self) -> Result<TokenKind> {
        let next = self.peek()?;
        if let Some(d) = next.filter(char::is_ascii_digit) {
            self.read()?;
            let kind = self.scan_for_numeric_type(d)?;
            self.unread(Some(d));
            self.unread(Some('-'));
            if kind == TokenKind::Timestamp {
                return Err(self.error(SyntaxError::InvalidNumeric(format!("-{d}"))));
            }
            return Ok(kind);
        }
        if self.is_inf('-')? {
            return Ok(TokenKind::FloatMinusInf);
        }
        self.unread(Some('-'));
        Ok(TokenKind::SymbolOperator)
    }

    /// Marks the current container token as entered, so its contents are
    /// tokenized instead of skipped.
    pub(crate) fn enter_container(&mut self) {
        debug_assert!(matches!(
            self.kind,
            TokenKind::OpenBracket | TokenKind::OpenParen | TokenKind::OpenBrace
        ));
        self.unfinished = false;
    }

    /// Skips whatever is left of the current token.
    fn finish(&mut self) -> Result<()> {
        match self.kind {
            TokenKind::Symbol => {
                self.read_symbol()?;
            }
            TokenKind::QuotedSymbol => {
                self.read_quoted('\'')?;
            }
            TokenKind::SymbolOperator => {
                self.read_operator()?;
            }
            TokenKind::String => {
                self.read_quoted('"')?;
            }
            TokenKind::LongString => {
                self.read_long_string()?;
            }
            kind @ (TokenKind::Numeric | TokenKind::Binary | TokenKind::Hex) => {
                self.read_number(kind)?;
            }
            TokenKind::Timestamp => {
                self.read_timestamp()?;
            }
            TokenKind::OpenBracket => self.skip_container(']')?,
            TokenKind::OpenParen => self.skip_container(')')?,
            TokenKind::OpenBrace => self.skip_container('}')?,
            TokenKind::OpenDoubleBrace => {
                self.read_lob()?;
            }
            _ => {}
        }
        self.unfinished = false;
        Ok(())
    }

    // --- Whitespace and comments -------------------------------------------

    /// Skips whitespace and comments. Returns the first significant character
    /// (left unconsumed) and whether anything was skipped.
    pub(crate) fn skip_whitespace(&mut self) -> Result<(Option<char>, bool)> {
        self.skip_whitespace_with(true)
    }

    /// Skips whitespace only; inside lobs `//` is base64 content, not a
    /// comment.
    pub(crate) fn skip_lob_whitespace(&mut self) -> Result<(Option<char>, bool)> {
        self.skip_whitespace_with(false)
    }

    fn skip_whitespace_with(&mut self, comments: bool) -> Result<(Option<char>, bool)> {
        let mut skipped = false;
        loop {
            let c = self.read()?;
            match c {
                Some(w) if is_whitespace(w) => skipped = true,
                Some('/') if comments => {
                    if !self.skip_comment()? {
                        self.unread(c);
                        return Ok((c, skipped));
                    }
                    skipped = true;
                }
                _ => {
                    self.unread(c);
                    return Ok((c, skipped));
                }
            }
        }
    }

    /// Called after a `/`. Consumes a comment if one starts here; otherwise
    /// restores the character it looked at and returns `false`.
    pub(crate) fn skip_comment(&mut self) -> Result<bool> {
        match self.read()? {
            Some('/') => {
                self.skip_single_line_comment()?;
                Ok(true)
            }
            Some('*') => {
                self.skip_block_comment()?;
                Ok(true)
            }
            c => {
                self.unread(c);
                Ok(false)
            }
        }
    }

    pub(crate) fn skip_single_line_comment(&mut self) -> Result<()> {
        loop {
            if let EOF | Some('\n') = self.read()? {
                return Ok(());
            }
        }
    }

    pub(crate) fn skip_block_comment(&mut self) -> Result<()> {
        loop {
            match self.read()? {
                EOF => return Err(self.error(SyntaxError::UnterminatedComment)),
                Some('*') => {
                    if self.peek()? == Some('/') {
                        self.read()?;
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
        }
    }

    // --- Literal classification --------------------------------------------

    /// Called after a `'`. Consumes two more quotes if they follow.
    pub(crate) fn is_triple_quote(&mut self) -> Result<bool> {
        let ahead = self.peek_n(2)?;
        if ahead.as_slice() != ['\'', '\''] {
            return Ok(false);
        }
        self.read()?;
        self.read()?;
        Ok(true)
    }

    /// Called after a consumed sign. Consumes `inf` when it is followed by a
    /// terminator.
    pub(crate) fn is_inf(&mut self, sign: char) -> Result<bool> {
        if sign != '+' && sign != '-' {
            return Ok(false);
        }
        let ahead = self.peek_n(4)?;
        let cs = ahead.as_slice();
        if !cs.starts_with(&['i', 'n', 'f']) {
            return Ok(false);
        }
        let terminated = match cs.get(3) {
            None => true,
            Some(&c) if is_whitespace(c) => true,
            Some(',' | '}' | ')' | ']') => true,
            Some('/') => matches!(self.peek_n(5)?.as_slice().get(4), Some('/' | '*')),
            Some(_) => false,
        };
        if terminated {
            for _ in 0..3 {
                self.read()?;
            }
        }
        Ok(terminated)
    }

    /// Picks the numeric token kind for a literal starting with `first`, which
    /// has already been consumed.
    pub(crate) fn scan_for_numeric_type(&mut self, first: char) -> Result<TokenKind> {
        debug_assert!(first.is_ascii_digit());
        // Widen the lookahead one char at a time so a number at the end of
        // what the source has delivered so far never waits on more input.
        let mut ahead = self.peek_n(1)?;
        if first == '0' {
            match ahead.as_slice().first() {
                Some('b' | 'B') => return Ok(TokenKind::Binary),
                Some('x' | 'X') => return Ok(TokenKind::Hex),
                _ => {}
            }
        }
        for n in 1..=3 {
            if !ahead.as_slice().get(n - 1).is_some_and(char::is_ascii_digit) {
                return Ok(TokenKind::Numeric);
            }
            ahead = self.peek_n(n + 1)?;
        }
        if matches!(ahead.as_slice().get(3), Some('-' | 'T')) {
            return Ok(TokenKind::Timestamp);
        }
        Ok(TokenKind::Numeric)
    }

    /// Whether `c` may directly follow a scalar.
    fn is_stop_char(&mut self, c: Option<char>) -> Result<bool> {
        Ok(match c {
            EOF => true,
            Some(w) if is_whitespace(w) => true,
            Some('{' | '}' | '[' | ']' | '(' | ')' | ',' | '"' | '\'') => true,
            Some('/') => {
                let ahead = self.peek_n(2)?;
                matches!(ahead.as_slice(), ['/', '/' | '*'])
            }
            Some(_) => false,
        })
    }

    // --- Captures ----------------------------------------------------------

    pub(crate) fn read_symbol(&mut self) -> Result<String> {
        self.unfinished = false;
        self.read_while(is_identifier_part)
    }

    pub(crate) fn read_operator(&mut self) -> Result<String> {
        self.unfinished = false;
        self.read_while(is_operator_char)
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> Result<String> {
        let mut text = String::new();
        loop {
            let c = self.read()?;
            match c {
                Some(ch) if pred(ch) => text.push(ch),
                _ => {
                    self.unread(c);
                    return Ok(text);
                }
            }
        }
    }

    /// After a bare `null`, reads the `.type` suffix if present.
    pub(crate) fn read_null_suffix(&mut self) -> Result<Option<String>> {
        if self.peek()? != Some('.') {
            return Ok(None);
        }
        self.read()?;
        let name = self.read_while(is_identifier_part)?;
        if name.is_empty() {
            return Err(self.error(SyntaxError::InvalidTypedNull(name)));
        }
        Ok(Some(name))
    }

    /// Reads quoted text up to the closing `delimiter`, which has to be on
    /// the same line. The opening delimiter has already been consumed.
    pub(crate) fn read_quoted(&mut self, delimiter: char) -> Result<String> {
        self.unfinished = false;
        let mut raw = String::new();
        loop {
            match self.read()? {
                EOF => return Err(self.error(SyntaxError::UnterminatedString)),
                Some('\n') => return Err(self.error(SyntaxError::InvalidCharacter('\n'))),
                Some(c) if c == delimiter => break,
                Some('\\') => self.read_escape_into(&mut raw)?,
                Some(c) => raw.push(c),
            }
        }
        decode::check_escapes(&raw).map_err(|e| self.error(e))?;
        Ok(raw)
    }

    /// Reads one `'''` segment. The opening quotes have already been consumed.
    pub(crate) fn read_long_string(&mut self) -> Result<String> {
        self.unfinished = false;
        let mut raw = String::new();
        loop {
            match self.read()? {
                EOF => return Err(self.error(SyntaxError::UnterminatedString)),
                Some('\'') => {
                    if self.is_triple_quote()? {
                        break;
                    }
                    raw.push('\'');
                }
                Some('\\') => self.read_escape_into(&mut raw)?,
                Some(c) => raw.push(c),
            }
        }
        decode::check_escapes(&raw).map_err(|e| self.error(e))?;
        Ok(raw)
    }

    fn read_escape_into(&mut self, raw: &mut String) -> Result<()> {
        raw.push('\\');
        match self.read()? {
            EOF => Err(self.error(SyntaxError::UnterminatedString)),
            Some(c) => {
                raw.push(c);
                Ok(())
            }
        }
    }

    /// Skips whitespace and comments after a long string segment; if another
    /// segment follows, consumes its opening quotes and returns `true`.
    pub(crate) fn continues_long_string(&mut self) -> Result<bool> {
        let (c, _) = self.skip_whitespace()?;
        if c != Some('\'') {
            return Ok(false);
        }
        self.read()?;
        if self.is_triple_quote()? {
            return Ok(true);
        }
        self.unread(c);
        Ok(false)
    }

    /// Reads a numeric literal of the given kind, validating digits and
    /// separators structurally.
    pub(crate) fn read_number(&mut self, kind: TokenKind) -> Result<String> {
        self.unfinished = false;
        let mut text = String::new();
        if self.peek()? == Some('-') {
            self.read()?;
            text.push('-');
        }

        match kind.radix() {
            Some(radix @ (Radix::Binary | Radix::Hex)) => {
                // `0b` / `0x`, already classified by `scan_for_numeric_type`.
                for _ in 0..2 {
                    if let Some(c) = self.read()? {
                        text.push(c);
                    }
                }
                self.read_digits(&mut text, |c| c.is_digit(radix.base()))?;
            }
            _ => {
                let start = text.len();
                self.read_digits(&mut text, |c| c.is_ascii_digit())?;
                let int_part = &text[start..];
                if int_part.len() > 1 && int_part.starts_with('0') {
                    return Err(self.error(SyntaxError::InvalidNumeric(text)));
                }
                if self.peek()? == Some('.') {
                    self.read()?;
                    text.push('.');
                    if self.peek()?.is_some_and(|c| c.is_ascii_digit()) {
                        self.read_digits(&mut text, |c| c.is_ascii_digit())?;
                    }
                }
                if let Some(e @ ('e' | 'E' | 'd' | 'D')) = self.peek()? {
                    self.read()?;
                    text.push(e);
                    if let Some(sign @ ('+' | '-')) = self.peek()? {
                        self.read()?;
                        text.push(sign);
                    }
                    self.read_digits(&mut text, |c| c.is_ascii_digit())?;
                }
            }
        }

        self.expect_stop(text)
    }

    /// Reads digits accepted by `is_digit`, allowing single `_` separators
    /// between them. At least one digit is required.
    fn read_digits(&mut self, text: &mut String, is_digit: impl Fn(char) -> bool) -> Result<()> {
        let mut digits = 0usize;
        let mut after_digit = false;
        loop {
            let c = self.read()?;
            match c {
                Some(d) if is_digit(d) => {
                    text.push(d);
                    digits += 1;
                    after_digit = true;
                }
                Some('_') if after_digit => {
                    text.push('_');
                    after_digit = false;
                }
                _ => {
                    self.unread(c);
                    break;
                }
            }
        }
        if digits == 0 || !after_digit {
            return Err(self.error(SyntaxError::InvalidNumeric(text.clone())));
        }
        Ok(())
    }

    pub(crate) fn read_timestamp(&mut self) -> Result<String> {
        self.unfinished = false;
        let text = self.read_while(|c| {
            c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | '+' | 'T' | 'Z' | 'z')
        })?;
        self.expect_stop(text)
    }

    fn expect_stop(&mut self, mut text: String) -> Result<String> {
        let next = self.peek()?;
        if self.is_stop_char(next)? {
            return Ok(text);
        }
        text.extend(next);
        Err(self.error(SyntaxError::InvalidNumeric(text)))
    }

    /// Reads the content of a `{{ ... }}` literal, including the closing
    /// braces. The opening braces have already been consumed.
    pub(crate) fn read_lob(&mut self) -> Result<LobText> {
        self.unfinished = false;
        let (c, _) = self.skip_lob_whitespace()?;
        let lob = match c {
            Some('"') => {
                self.read()?;
                LobText::Clob(vec![self.read_quoted('"')?])
            }
            Some('\'') => {
                self.read()?;
                if !self.is_triple_quote()? {
                    return Err(self.error(SyntaxError::InvalidLob("expected a string")));
                }
                let mut segments = vec![self.read_long_string()?];
                loop {
                    let (c, _) = self.skip_lob_whitespace()?;
                    if c != Some('\'') {
                        break;
                    }
                    self.read()?;
                    if !self.is_triple_quote()? {
                        return Err(self.error(SyntaxError::InvalidLob("expected a long string")));
                    }
                    segments.push(self.read_long_string()?);
                }
                LobText::Clob(segments)
            }
            _ => {
                let mut text = String::new();
                loop {
                    match self.skip_lob_whitespace()? {
                        (Some(c), _) if is_base64_char(c) => {
                            self.read()?;
                            text.push(c);
                        }
                        _ => break,
                    }
                }
                LobText::Blob(text)
            }
        };

        self.skip_lob_whitespace()?;
        if self.read()? != Some('}') || self.read()? != Some('}') {
            return Err(self.error(SyntaxError::InvalidLob("expected '}}'")));
        }
        Ok(lob)
    }

    /// Skips the rest of a container whose opening delimiter has been
    /// consumed, honoring nested containers, quoted text, lobs, and comments.
    pub(crate) fn skip_container(&mut self, close: char) -> Result<()> {
        self.unfinished = false;
        let mut closers: SmallVec<[char; 8]> = smallvec![close];
        while let Some(&expected) = closers.last() {
            self.skip_whitespace()?;
            match self.read()? {
                EOF => return Err(self.error(SyntaxError::UnterminatedContainer)),
                Some(c) if c == expected => {
                    closers.pop();
                }
                Some(')' | ']' | '}') => {
                    return Err(self.error(SyntaxError::UnexpectedToken("closing delimiter")));
                }
                Some('"') => {
                    self.read_quoted('"')?;
                }
                Some('\'') => {
                    if self.is_triple_quote()? {
                        self.read_long_string()?;
                    } else {
                        self.read_quoted('\'')?;
                    }
                }
                Some('(') => closers.push(')'),
                Some('[') => closers.push(']'),
                Some('{') => {
                    if self.peek()? == Some('{') {
                        self.read()?;
                        self.read_lob()?;
                    } else {
                        closers.push('}');
                    }
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '!' | '#' | '%' | '&' | '*' | '+' | '-' | '.' | '/' | ';' | '<' | '=' | '>' | '?' | '@'
            | '^' | '`' | '|' | '~'
    )
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}
