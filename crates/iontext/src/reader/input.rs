//! Input: character reads over a UTF‑8 byte source.
//!
//! What it does
//! - Pulls bytes from any `std::io::Read` into a small decode window and
//!   hands out one `char` at a time, decoding with `bstr` (invalid sequences
//!   become U+FFFD).
//! - Normalizes `\r` and `\r\n` to a single `\n`.
//! - Keeps a LIFO pushback stack so callers can `unread` any number of
//!   characters, including [`EOF`], and read them back in reverse order.
//! - `peek_n` is built on read + unread, so lookahead never changes what later
//!   reads observe.
//!
//! Invariants
//! - The source is only read when the window is empty or ends in a partial
//!   UTF-8 sequence. Characters that have already arrived are handed out
//!   without waiting for more input.
//! - End of input is sticky: once the source reports zero bytes, it is not
//!   polled again.
//! - Position counters track the furthest character decoded from the source;
//!   pushback does not move them.

use std::io::{self, Read};

use smallvec::SmallVec;

/// End of input. Distinct from every character the buffer returns.
pub(crate) const EOF: Option<char> = None;

const WINDOW: usize = 4096;
const MAX_UTF8_LEN: usize = 4;

/// Characters returned by [`InputBuffer::peek_n`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Lookahead {
    pub(crate) chars: SmallVec<[char; 8]>,
    /// End of input was reached before the requested count.
    pub(crate) at_end: bool,
}

impl Lookahead {
    pub(crate) fn as_slice(&self) -> &[char] {
        &self.chars
    }
}

pub(crate) struct InputBuffer<R> {
    source: R,
    window: Vec<u8>,
    offset: usize,
    exhausted: bool,
    pushback: SmallVec<[Option<char>; 8]>,
    line: usize,
    column: usize,
}

impl<R: Read> InputBuffer<R> {
    pub(crate) fn new(source: R) -> Self {
        Self {
            source,
            window: Vec::new(),
            offset: 0,
            exhausted: false,
            pushback: SmallVec::new(),
            line: 1,
            column: 0,
        }
    }

    /// Returns the next character, or [`EOF`].
    pub(crate) fn read(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.pushback.pop() {
            return Ok(c);
        }
        let c = match self.decode()? {
            Some('\r') => {
                if self.peek_byte()? == Some(b'\n') {
                    self.offset += 1;
                }
                Some('\n')
            }
            other => other,
        };
        if let Some(ch) = c {
            self.bump_position(ch);
        }
        Ok(c)
    }

    /// Pushes `c` back so the next `read` returns it.
    pub(crate) fn unread(&mut self, c: Option<char>) {
        self.pushback.push(c);
    }

    pub(crate) fn peek(&mut self) -> io::Result<Option<char>> {
        let c = self.read()?;
        self.unread(c);
        Ok(c)
    }

    /// Returns up to `n` upcoming characters without consuming them.
    pub(crate) fn peek_n(&mut self, n: usize) -> io::Result<Lookahead> {
        let mut ahead = Lookahead::default();
        for _ in 0..n {
            match self.read() {
                Ok(Some(c)) => ahead.chars.push(c),
                Ok(None) => {
                    ahead.at_end = true;
                    self.unread(EOF);
                    break;
                }
                Err(err) => {
                    self.restore(&ahead);
                    return Err(err);
                }
            }
        }
        self.restore(&ahead);
        Ok(ahead)
    }

    fn restore(&mut self, ahead: &Lookahead) {
        for &c in ahead.chars.iter().rev() {
            self.unread(Some(c));
        }
    }

    /// `(line, column)` of the furthest character decoded.
    pub(crate) fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn bump_position(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    fn decode(&mut self) -> io::Result<Option<char>> {
        loop {
            let rest = &self.window[self.offset..];
            if rest.is_empty() {
                if self.exhausted {
                    return Ok(None);
                }
                self.fill()?;
                continue;
            }
            let (ch, len) = bstr::decode_utf8(rest);
            // A lead byte whose continuation bytes have not arrived yet.
            let truncated = ch.is_none() && len == rest.len() && len < MAX_UTF8_LEN;
            if truncated && !self.exhausted {
                self.fill()?;
                continue;
            }
            self.offset += len;
            return Ok(Some(ch.unwrap_or('\u{FFFD}')));
        }
    }

    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        if self.offset == self.window.len() && !self.exhausted {
            self.fill()?;
        }
        Ok(self.window.get(self.offset).copied())
    }

    /// Issues exactly one successful read against the source.
    fn fill(&mut self) -> io::Result<()> {
        if self.offset > 0 {
            self.window.drain(..self.offset);
            self.offset = 0;
        }
        let len = self.window.len();
        self.window.resize(len + WINDOW, 0);
        let read = loop {
            match self.source.read(&mut self.window[len..]) {
                Ok(read) => break read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.window.truncate(len);
                    return Err(err);
                }
            }
        };
        self.window.truncate(len + read);
        if read == 0 {
            self.exhausted = true;
        }
        Ok(())
    }
}
