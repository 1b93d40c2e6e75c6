//! JSON-shaped token scanner over the code point stream.
//!
//! `get_token` pulls one lexeme at a time: structural punctuation,
//! barewords, strings, numbers. Lexemes are carried verbatim, string
//! tokens keeping their quotes and escape sequences unprocessed, so a
//! consumer can re-emit the exact input text. Numbers follow the strict
//! JSON grammar.

use super::Stream;
use crate::channel::Channel;
use crate::error::{Error, Result};

/// Whitespace skipped between tokens: space, newline, carriage return,
/// tab, record separator, and the byte-order mark.
#[inline]
fn is_token_space(cp: u32) -> bool {
    matches!(cp, 0x20 | 0x0A | 0x0D | 0x09 | 0x1E | 0xFEFF)
}

#[inline]
fn is_ascii_letter(cp: u32) -> bool {
    matches!(cp, 0x41..=0x5A | 0x61..=0x7A)
}

#[inline]
fn is_ascii_digit(cp: u32) -> bool {
    matches!(cp, 0x30..=0x39)
}

#[inline]
fn is_hex_digit(cp: u32) -> bool {
    matches!(cp, 0x30..=0x39 | 0x41..=0x46 | 0x61..=0x66)
}

#[inline]
fn lexeme_char(cp: u32) -> char {
    char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER)
}

impl<C: Channel> Stream<C> {
    /// Returns the next token's lexeme, or `None` at end of input.
    ///
    /// Token classes:
    /// - structural: `[` `]` `{` `}` `,` `:`
    /// - bareword: a maximal ASCII letter run (`null`, `true`, `false`)
    /// - string: `"`-delimited, quotes and escapes kept verbatim
    /// - number: strict JSON number
    ///
    /// The byte terminating a bareword or number is pushed back, so it
    /// opens the next token. Grammar violations fail with
    /// [`Error::MalformedSequence`].
    pub async fn get_token(&mut self) -> Result<Option<String>> {
        let first = loop {
            match self.decode_scalar(false).await? {
                None => return Ok(None),
                Some(cp) if is_token_space(cp) => continue,
                Some(cp) => break cp,
            }
        };
        match first {
            0x5B | 0x5D | 0x7B | 0x7D | 0x2C | 0x3A => Ok(Some(lexeme_char(first).to_string())),
            0x22 => self.string_token().await,
            cp if is_ascii_letter(cp) => self.bareword_token(cp).await,
            cp if cp == 0x2D || is_ascii_digit(cp) => self.number_token(cp).await,
            _ => Err(Error::MalformedSequence),
        }
    }

    async fn bareword_token(&mut self, first: u32) -> Result<Option<String>> {
        let mut lexeme = String::new();
        lexeme.push(lexeme_char(first));
        loop {
            match self.decode_scalar(false).await? {
                Some(cp) if is_ascii_letter(cp) => lexeme.push(lexeme_char(cp)),
                Some(cp) => {
                    self.unget_codepoint(cp);
                    break;
                }
                None => break,
            }
        }
        Ok(Some(lexeme))
    }

    async fn string_token(&mut self) -> Result<Option<String>> {
        let mut lexeme = String::from('"');
        loop {
            let Some(cp) = self.decode_scalar(false).await? else {
                // End of input before the closing quote.
                return Err(Error::MalformedSequence);
            };
            if cp == 0x22 {
                lexeme.push('"');
                return Ok(Some(lexeme));
            }
            if cp == 0x5C {
                lexeme.push('\\');
                let Some(esc) = self.decode_scalar(false).await? else {
                    return Err(Error::MalformedSequence);
                };
                match esc {
                    0x22 | 0x5C | 0x2F | 0x62 | 0x66 | 0x6E | 0x72 | 0x74 => {
                        lexeme.push(lexeme_char(esc));
                    }
                    0x75 => {
                        lexeme.push('u');
                        for _ in 0..4 {
                            match self.decode_scalar(false).await? {
                                Some(h) if is_hex_digit(h) => lexeme.push(lexeme_char(h)),
                                _ => return Err(Error::MalformedSequence),
                            }
                        }
                    }
                    _ => return Err(Error::MalformedSequence),
                }
            } else if cp < 0x20 {
                // Raw control characters are not allowed inside strings.
                return Err(Error::MalformedSequence);
            } else {
                lexeme.push(lexeme_char(cp));
            }
        }
    }

    async fn number_token(&mut self, first: u32) -> Result<Option<String>> {
        let mut lexeme = String::new();
        let mut cp = first;
        if cp == 0x2D {
            lexeme.push('-');
            match self.decode_scalar(false).await? {
                Some(d) if is_ascii_digit(d) => cp = d,
                _ => return Err(Error::MalformedSequence),
            }
        }
        if cp == 0x30 {
            lexeme.push('0');
            // A lone zero is the only integer part that may start with 0.
            match self.decode_scalar(false).await? {
                Some(d) if is_ascii_digit(d) => return Err(Error::MalformedSequence),
                Some(other) => self.unget_codepoint(other),
                None => {}
            }
        } else {
            lexeme.push(lexeme_char(cp));
            self.digit_run(&mut lexeme).await?;
        }

        match self.decode_scalar(false).await? {
            Some(0x2E) => {
                lexeme.push('.');
                match self.decode_scalar(false).await? {
                    Some(d) if is_ascii_digit(d) => {
                        lexeme.push(lexeme_char(d));
                        self.digit_run(&mut lexeme).await?;
                    }
                    _ => return Err(Error::MalformedSequence),
                }
            }
            Some(other) => self.unget_codepoint(other),
            None => {}
        }

        match self.decode_scalar(false).await? {
            Some(e) if e == 0x65 || e == 0x45 => {
                lexeme.push(lexeme_char(e));
                let mut next = self.decode_scalar(false).await?;
                if let Some(sign) = next {
                    if sign == 0x2B || sign == 0x2D {
                        lexeme.push(lexeme_char(sign));
                        next = self.decode_scalar(false).await?;
                    }
                }
                match next {
                    Some(d) if is_ascii_digit(d) => {
                        lexeme.push(lexeme_char(d));
                        self.digit_run(&mut lexeme).await?;
                    }
                    _ => return Err(Error::MalformedSequence),
                }
            }
            Some(other) => self.unget_codepoint(other),
            None => {}
        }
        Ok(Some(lexeme))
    }

    /// Appends a maximal ASCII digit run, pushing back the terminator.
    async fn digit_run(&mut self, lexeme: &mut String) -> Result<()> {
        loop {
            match self.decode_scalar(false).await? {
                Some(d) if is_ascii_digit(d) => lexeme.push(lexeme_char(d)),
                Some(other) => {
                    self.unget_codepoint(other);
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
    }
}
