//! Pull-based Ion text reader.
//!
//! Overview
//! - [`TextReader`] walks Ion text one value at a time. `next()` positions the
//!   cursor on the next value of the current scope; accessors decode that
//!   value on demand.
//! - The reader is layered: `input` turns bytes into characters with
//!   pushback, `tokenizer` classifies lexemes, and this module assembles
//!   values (field names, annotations, nulls, reserved bare words).
//!
//! Lookahead
//! - A bare symbol is only known to be an annotation once the token after it
//!   has been classified. That token is held in `peeked` and served to the
//!   next `next()` call; its body is still unread in the tokenizer.
//!
//! Errors
//! - I/O and syntax errors latch: `next()` returns `false` from then on and
//!   `err()` reports the failure. Accessor errors (type mismatch, overflow,
//!   undecodable values) and misuse of `step_in`/`step_out` leave the reader untouched.

use std::io::Read;

use num_bigint::BigInt;

use self::tokenizer::{LobText, Quoting, TokenKind, Tokenizer};
use crate::{
    IonType, ReaderOptions,
    decode::{self, Decimal, Radix},
    error::{Error, Result, SyntaxError},
};

mod input;
mod tokenizer;

/// A cursor over a stream of Ion values.
///
/// The cursor starts before the first top-level value. Each call to
/// [`next`](Reader::next) moves it to the next value in the current scope;
/// [`step_in`](Reader::step_in) and [`step_out`](Reader::step_out) move
/// between scopes.
pub trait Reader {
    /// Advances to the next value in the current scope.
    ///
    /// Returns `false` at the end of the scope, at end of input, or once an
    /// error has latched. Check [`err`](Reader::err) to tell them apart.
    fn next(&mut self) -> bool;

    /// The error that stopped the reader, if any.
    fn err(&self) -> Option<&Error>;

    /// Type of the current value, or `None` when there is no current value.
    fn ion_type(&self) -> Option<IonType>;

    /// Whether the current value is `null` or a typed null such as
    /// `null.int`.
    fn is_null(&self) -> bool;

    /// Annotations on the current value, in source order.
    fn annotations(&self) -> &[String];

    /// Field name of the current value when the current scope is a struct.
    fn field_name(&self) -> Option<&str>;

    /// Number of containers stepped into. Zero at top level.
    fn depth(&self) -> usize;

    /// Steps into the current list, s-expression, or struct.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when the current value is not a non-null
    /// container, [`Error::DepthLimitExceeded`] when
    /// [`ReaderOptions::max_container_depth`] would be exceeded.
    fn step_in(&mut self) -> Result<()>;

    /// Skips the rest of the current container and returns to its parent.
    /// The next call to `next()` moves to the container's next sibling.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] at top level, or the latched error if the
    /// remainder of the container could not be read.
    fn step_out(&mut self) -> Result<()>;

    /// Value of the current bool. `null.bool` reads as `false`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type.
    fn bool_value(&self) -> Result<bool>;

    /// Value of the current int. `null.int` reads as `0`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type, [`Error::Overflow`] when the
    /// value does not fit.
    fn int_value(&self) -> Result<i32>;

    /// Value of the current int. `null.int` reads as `0`.
    ///
    /// # Errors
    ///
    /// As [`int_value`](Reader::int_value).
    fn int64_value(&self) -> Result<i64>;

    /// Value of the current int at full precision, `None` for `null.int`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type.
    fn big_int_value(&self) -> Result<Option<BigInt>>;

    /// Value of the current float, including `nan`, `+inf`, and `-inf`.
    /// `null.float` reads as `0.0`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type, ints and decimals included.
    fn float_value(&self) -> Result<f64>;

    /// Value of the current decimal, `None` for `null.decimal`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type, [`Error::InvalidValue`]
    /// when the exponent does not fit in an `i64`.
    fn decimal_value(&self) -> Result<Option<Decimal>>;

    /// Text of the current string or symbol, with escapes resolved and long
    /// string segments joined. `None` for `null.string` and `null.symbol`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type.
    fn string_value(&self) -> Result<Option<String>>;

    /// Source text of the current timestamp, `None` for `null.timestamp`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type.
    fn timestamp_text(&self) -> Result<Option<&str>>;

    /// Bytes of the current blob or clob, `None` for a null lob.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] for any other type.
    fn lob_value(&self) -> Result<Option<&[u8]>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    TopLevel,
    List,
    Sexp,
    Struct,
}

impl ScopeKind {
    fn close(self) -> Option<TokenKind> {
        match self {
            ScopeKind::TopLevel => None,
            ScopeKind::List => Some(TokenKind::CloseBracket),
            ScopeKind::Sexp => Some(TokenKind::CloseParen),
            ScopeKind::Struct => Some(TokenKind::CloseBrace),
        }
    }

    fn has_commas(self) -> bool {
        matches!(self, ScopeKind::List | ScopeKind::Struct)
    }
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    kind: ScopeKind,
    /// A value has been produced in this scope, so a separator may follow.
    after_value: bool,
    /// The closing delimiter (or end of input) has been consumed.
    at_end: bool,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            after_value: false,
            at_end: false,
        }
    }
}

/// Captured, undecoded text behind the current value.
#[derive(Debug, Clone)]
enum Lexeme {
    /// Nulls and containers.
    Empty,
    Bool(bool),
    Int { text: String, radix: Radix },
    Float(String),
    /// `nan`, `+inf`, `-inf`.
    FloatSpecial(f64),
    Decimal(String),
    Timestamp(String),
    Symbol { text: String, quoting: Quoting },
    /// Raw string segments, escapes intact.
    Text(Vec<String>),
    Lob(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Current {
    ion_type: IonType,
    is_null: bool,
    annotations: Vec<String>,
    field_name: Option<String>,
    lexeme: Lexeme,
    /// Where the value ended, for errors raised while decoding it.
    position: (usize, usize),
}

/// A symbol-like token read while looking for annotations.
struct SymbolToken {
    text: String,
    quoting: Quoting,
    /// `.type` after a bare `null`.
    null_suffix: Option<String>,
}

impl SymbolToken {
    fn is_keyword(&self) -> bool {
        self.quoting == Quoting::Bare && matches!(self.text.as_str(), "null" | "true" | "false" | "nan")
    }
}

/// [`Reader`] over Ion text from any [`Read`] source.
///
/// # Examples
///
/// ```rust
/// use iontext::{IonType, Reader, TextReader};
///
/// let mut reader = TextReader::from_text("{ name: 'widget', tags: [a, b] }");
/// assert!(reader.next());
/// assert_eq!(reader.ion_type(), Some(IonType::Struct));
///
/// reader.step_in().unwrap();
/// assert!(reader.next());
/// assert_eq!(reader.field_name(), Some("name"));
/// assert_eq!(reader.string_value().unwrap().as_deref(), Some("widget"));
/// reader.step_out().unwrap();
///
/// assert!(!reader.next());
/// assert!(reader.err().is_none());
/// ```
pub struct TextReader<R> {
    tok: Tokenizer<R>,
    options: ReaderOptions,
    scopes: Vec<Scope>,
    current: Option<Current>,
    peeked: Option<TokenKind>,
    err: Option<Error>,
}

impl<'a> TextReader<&'a [u8]> {
    /// Creates a reader over in-memory text.
    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: Read> TextReader<R> {
    /// Creates a reader with default [`ReaderOptions`].
    pub fn new(source: R) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    /// Creates a reader with the given options.
    pub fn with_options(source: R, options: ReaderOptions) -> Self {
        Self {
            tok: Tokenizer::new(source),
            options,
            scopes: vec![Scope::new(ScopeKind::TopLevel)],
            current: None,
            peeked: None,
            err: None,
        }
    }

    fn scope(&self) -> Scope {
        self.scopes
            .last()
            .copied()
            .unwrap_or(Scope::new(ScopeKind::TopLevel))
    }

    fn scope_mut(&mut self) -> Option<&mut Scope> {
        self.scopes.last_mut()
    }

    fn next_token(&mut self) -> Result<TokenKind> {
        match self.peeked.take() {
            Some(kind) => Ok(kind),
            None => self.tok.next(),
        }
    }

    fn syntax(&self, source: SyntaxError) -> Error {
        self.tok.error(source)
    }

    /// Moves to the next value. `Ok(false)` at the end of the scope.
    fn advance(&mut self) -> Result<bool> {
        self.current = None;
        let scope = self.scope();
        if scope.at_end {
            return Ok(false);
        }

        let mut kind = self.next_token()?;
        if scope.after_value && scope.kind.has_commas() {
            if kind == TokenKind::Comma {
                kind = self.next_token()?;
            } else if Some(kind) != scope.kind.close() && kind != TokenKind::Eof {
                return Err(self.syntax(SyntaxError::UnexpectedToken(
                    "value without a separating ','",
                )));
            }
        }

        if kind == TokenKind::Eof {
            if scope.kind != ScopeKind::TopLevel {
                return Err(self.syntax(SyntaxError::UnexpectedEndOfInput));
            }
            self.end_scope();
            return Ok(false);
        }
        if Some(kind) == scope.kind.close() {
            self.end_scope();
            return Ok(false);
        }

        let field_name = if scope.kind == ScopeKind::Struct {
            let name = self.read_field_name(kind)?;
            if self.next_token()? != TokenKind::Colon {
                return Err(self.syntax(SyntaxError::UnexpectedToken("field name without ':'")));
            }
            kind = self.next_token()?;
            Some(name)
        } else {
            None
        };

        let mut annotations = Vec::new();
        let (ion_type, is_null, lexeme) = loop {
            if !matches!(kind, TokenKind::Symbol | TokenKind::QuotedSymbol) {
                let pending = field_name.is_some() || !annotations.is_empty();
                break self.read_value(kind, scope.kind, pending)?;
            }

            let symbol = self.read_symbol_token(kind)?;
            let next = self.next_token()?;
            if next == TokenKind::DoubleColon {
                if symbol.is_keyword() || symbol.null_suffix.is_some() {
                    return Err(self.syntax(SyntaxError::UnexpectedToken(
                        "keyword used as an annotation",
                    )));
                }
                annotations.push(self.symbol_text(symbol.text, symbol.quoting)?);
                kind = self.next_token()?;
                continue;
            }
            self.peeked = Some(next);
            break self.classify_symbol(symbol)?;
        };

        let current = Current {
            ion_type,
            is_null,
            annotations,
            field_name,
            lexeme,
            position: self.tok.position(),
        };
        tracing::trace!(
            ion_type = ?current.ion_type,
            is_null = current.is_null,
            depth = self.depth(),
            "value"
        );
        self.current = Some(current);
        if let Some(scope) = self.scope_mut() {
            scope.after_value = true;
        }
        Ok(true)
    }

    fn end_scope(&mut self) {
        if let Some(scope) = self.scope_mut() {
            scope.at_end = true;
        }
    }

    fn read_field_name(&mut self, kind: TokenKind) -> Result<String> {
        match kind {
            TokenKind::Symbol => self.tok.read_symbol(),
            TokenKind::QuotedSymbol => {
                let raw = self.tok.read_quoted('\'')?;
                self.unescape(&[raw])
            }
            TokenKind::String => {
                let raw = self.tok.read_quoted('"')?;
                self.unescape(&[raw])
            }
            TokenKind::LongString => {
                let segments = self.read_long_segments()?;
                self.unescape(&segments)
            }
            _ => Err(self.syntax(SyntaxError::UnexpectedToken(kind.describe()))),
        }
    }

    fn read_symbol_token(&mut self, kind: TokenKind) -> Result<SymbolToken> {
        let quoting = kind.quoting();
        let (text, null_suffix) = match quoting {
            Quoting::Quoted => (self.tok.read_quoted('\'')?, None),
            Quoting::Bare => {
                let text = self.tok.read_symbol()?;
                let null_suffix = if text == "null" {
                    self.tok.read_null_suffix()?
                } else {
                    None
                };
                (text, null_suffix)
            }
        };
        Ok(SymbolToken {
            text,
            quoting,
            null_suffix,
        })
    }

    fn symbol_text(&self, text: String, quoting: Quoting) -> Result<String> {
        match quoting {
            Quoting::Bare => Ok(text),
            Quoting::Quoted => self.unescape(&[text]),
        }
    }

    fn unescape(&self, segments: &[String]) -> Result<String> {
        decode::unescape(segments).map_err(|e| self.syntax(e))
    }

    /// Resolves reserved bare words; everything else is a plain symbol.
    fn classify_symbol(&self, symbol: SymbolToken) -> Result<(IonType, bool, Lexeme)> {
        if symbol.quoting == Quoting::Bare {
            match (symbol.text.as_str(), symbol.null_suffix) {
                ("null", None) => return Ok((IonType::Null, true, Lexeme::Empty)),
                ("null", Some(name)) => {
                    return match IonType::from_keyword(&name) {
                        Some(ty) => Ok((ty, true, Lexeme::Empty)),
                        None => Err(self.syntax(SyntaxError::InvalidTypedNull(name))),
                    };
                }
                ("true", _) => return Ok((IonType::Bool, false, Lexeme::Bool(true))),
                ("false", _) => return Ok((IonType::Bool, false, Lexeme::Bool(false))),
                ("nan", _) => return Ok((IonType::Float, false, Lexeme::FloatSpecial(f64::NAN))),
                _ => {}
            }
        }
        Ok((
            IonType::Symbol,
            false,
            Lexeme::Symbol {
                text: symbol.text,
                quoting: symbol.quoting,
            },
        ))
    }

    fn read_long_segments(&mut self) -> Result<Vec<String>> {
        let mut segments = vec![self.tok.read_long_string()?];
        while self.tok.continues_long_string()? {
            segments.push(self.tok.read_long_string()?);
        }
        Ok(segments)
    }

    /// Classifies and captures a non-symbol value. `pending` is set when a
    /// field name or annotations are waiting for this value.
    fn read_value(
        &mut self,
        kind: TokenKind,
        scope: ScopeKind,
        pending: bool,
    ) -> Result<(IonType, bool, Lexeme)> {
        let value = match kind {
            TokenKind::Numeric => {
                let text = self.tok.read_number(kind)?;
                if text.contains(['e', 'E']) {
                    (IonType::Float, Lexeme::Float(text))
                } else if text.contains(['.', 'd', 'D']) {
                    (IonType::Decimal, Lexeme::Decimal(text))
                } else {
                    (
                        IonType::Int,
                        Lexeme::Int {
                            text,
                            radix: Radix::Decimal,
                        },
                    )
                }
            }
            TokenKind::Binary | TokenKind::Hex => {
                let text = self.tok.read_number(kind)?;
                let radix = kind.radix().unwrap_or(Radix::Decimal);
                (IonType::Int, Lexeme::Int { text, radix })
            }
            TokenKind::Timestamp => (IonType::Timestamp, Lexeme::Timestamp(self.tok.read_timestamp()?)),
            TokenKind::FloatInf => (IonType::Float, Lexeme::FloatSpecial(f64::INFINITY)),
            TokenKind::FloatMinusInf => (IonType::Float, Lexeme::FloatSpecial(f64::NEG_INFINITY)),
            TokenKind::String => (IonType::String, Lexeme::Text(vec![self.tok.read_quoted('"')?])),
            TokenKind::LongString => (IonType::String, Lexeme::Text(self.read_long_segments()?)),
            TokenKind::SymbolOperator if scope == ScopeKind::Sexp => {
                let text = self.tok.read_operator()?;
                (
                    IonType::Symbol,
                    Lexeme::Symbol {
                        text,
                        quoting: kind.quoting(),
                    },
                )
            }
            TokenKind::SymbolOperator => {
                return Err(self.syntax(SyntaxError::UnexpectedToken(
                    "operator outside an s-expression",
                )));
            }
            TokenKind::OpenDoubleBrace => match self.tok.read_lob()? {
                LobText::Blob(text) => {
                    let bytes = decode::blob_bytes(&text).map_err(|e| self.syntax(e))?;
                    (IonType::Blob, Lexeme::Lob(bytes))
                }
                LobText::Clob(segments) => {
                    let bytes = decode::clob_bytes(&segments).map_err(|e| self.syntax(e))?;
                    (IonType::Clob, Lexeme::Lob(bytes))
                }
            },
            TokenKind::OpenBracket => (IonType::List, Lexeme::Empty),
            TokenKind::OpenParen => (IonType::Sexp, Lexeme::Empty),
            TokenKind::OpenBrace => (IonType::Struct, Lexeme::Empty),
            TokenKind::Eof
            | TokenKind::CloseBracket
            | TokenKind::CloseParen
            | TokenKind::CloseBrace
                if pending =>
            {
                return Err(self.syntax(SyntaxError::MissingValue));
            }
            _ => return Err(self.syntax(SyntaxError::UnexpectedToken(kind.describe()))),
        };
        Ok((value.0, false, value.1))
    }

    fn mismatch(&self, requested: &'static str) -> Error {
        Error::TypeMismatch {
            requested,
            actual: self.ion_type(),
        }
    }

    /// The current value, if it has one of `types`.
    fn expect(&self, requested: &'static str, types: &[IonType]) -> Result<&Current> {
        match &self.current {
            Some(current) if types.contains(&current.ion_type) => Ok(current),
            _ => Err(self.mismatch(requested)),
        }
    }

    fn decode_error(current: &Current, source: SyntaxError) -> Error {
        let (line, column) = current.position;
        Error::InvalidValue {
            source,
            line,
            column,
        }
    }

    fn int(&self, requested: &'static str) -> Result<Option<BigInt>> {
        let current = self.expect(requested, &[IonType::Int])?;
        match &current.lexeme {
            _ if current.is_null => Ok(None),
            Lexeme::Int { text, radix } => decode::parse_int(text, *radix)
                .map(Some)
                .map_err(|e| Self::decode_error(current, e)),
            _ => Err(self.mismatch(requested)),
        }
    }
}

impl<R: Read> Reader for TextReader<R> {
    fn next(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.advance() {
            Ok(more) => more,
            Err(err) => {
                let (line, column) = self.tok.position();
                tracing::debug!(error = %err, line, column, "reader error latched");
                self.current = None;
                self.peeked = None;
                self.err = Some(err);
                false
            }
        }
    }

    fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    fn ion_type(&self) -> Option<IonType> {
        self.current.as_ref().map(|c| c.ion_type)
    }

    fn is_null(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.is_null)
    }

    fn annotations(&self) -> &[String] {
        match &self.current {
            Some(current) => &current.annotations,
            None => &[],
        }
    }

    fn field_name(&self) -> Option<&str> {
        self.current.as_ref()?.field_name.as_deref()
    }

    fn depth(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn step_in(&mut self) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let Some(current) = &self.current else {
            return Err(Error::InvalidState("no current value to step into"));
        };
        let kind = match current.ion_type {
            IonType::List => ScopeKind::List,
            IonType::Sexp => ScopeKind::Sexp,
            IonType::Struct => ScopeKind::Struct,
            _ => return Err(Error::InvalidState("current value is not a container")),
        };
        if current.is_null {
            return Err(Error::InvalidState("cannot step into a null container"));
        }
        if let Some(max) = self.options.max_container_depth {
            if self.depth() >= max {
                return Err(Error::DepthLimitExceeded(max));
            }
        }

        self.tok.enter_container();
        self.scopes.push(Scope::new(kind));
        self.current = None;
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn step_out(&mut self) -> Result<()> {
        if self.depth() == 0 {
            return Err(Error::InvalidState("cannot step out of the top level"));
        }
        while self.next() {}
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        self.scopes.pop();
        self.current = None;
        Ok(())
    }

    fn bool_value(&self) -> Result<bool> {
        let current = self.expect("bool", &[IonType::Bool])?;
        match current.lexeme {
            _ if current.is_null => Ok(false),
            Lexeme::Bool(value) => Ok(value),
            _ => Err(self.mismatch("bool")),
        }
    }

    fn int_value(&self) -> Result<i32> {
        match self.int("i32")? {
            None => Ok(0),
            Some(value) => i32::try_from(&value).map_err(|_| Error::Overflow { target: "i32" }),
        }
    }

    fn int64_value(&self) -> Result<i64> {
        match self.int("i64")? {
            None => Ok(0),
            Some(value) => i64::try_from(&value).map_err(|_| Error::Overflow { target: "i64" }),
        }
    }

    fn big_int_value(&self) -> Result<Option<BigInt>> {
        self.int("int")
    }

    fn float_value(&self) -> Result<f64> {
        let current = self.expect("float", &[IonType::Float])?;
        match &current.lexeme {
            _ if current.is_null => Ok(0.0),
            Lexeme::FloatSpecial(value) => Ok(*value),
            Lexeme::Float(text) => {
                decode::parse_float(text).map_err(|e| Self::decode_error(current, e))
            }
            _ => Err(self.mismatch("float")),
        }
    }

    fn decimal_value(&self) -> Result<Option<Decimal>> {
        let current = self.expect("decimal", &[IonType::Decimal])?;
        match &current.lexeme {
            _ if current.is_null => Ok(None),
            Lexeme::Decimal(text) => decode::parse_decimal(text)
                .map(Some)
                .map_err(|e| Self::decode_error(current, e)),
            _ => Err(self.mismatch("decimal")),
        }
    }

    fn string_value(&self) -> Result<Option<String>> {
        let current = self.expect("string", &[IonType::String, IonType::Symbol])?;
        let decoded = match &current.lexeme {
            _ if current.is_null => return Ok(None),
            Lexeme::Text(segments) => decode::unescape(segments),
            Lexeme::Symbol {
                text,
                quoting: Quoting::Bare,
            } => return Ok(Some(text.clone())),
            Lexeme::Symbol {
                text,
                quoting: Quoting::Quoted,
            } => decode::unescape(&[text]),
            _ => return Err(self.mismatch("string")),
        };
        decoded
            .map(Some)
            .map_err(|e| Self::decode_error(current, e))
    }

    fn timestamp_text(&self) -> Result<Option<&str>> {
        let current = self.expect("timestamp", &[IonType::Timestamp])?;
        match &current.lexeme {
            _ if current.is_null => Ok(None),
            Lexeme::Timestamp(text) => Ok(Some(text)),
            _ => Err(self.mismatch("timestamp")),
        }
    }

    fn lob_value(&self) -> Result<Option<&[u8]>> {
        let current = self.expect("lob", &[IonType::Blob, IonType::Clob])?;
        match &current.lexeme {
            _ if current.is_null => Ok(None),
            Lexeme::Lob(bytes) => Ok(Some(bytes)),
            _ => Err(self.mismatch("lob")),
        }
    }
}

#[cfg(test)]
mod tests;
