//! UTF-8 code point codec with push-back and surrogate emulation.
//!
//! Decoding follows the standard continuation-byte pattern. A byte that
//! breaks the pattern is pushed back (the mismatched byte deepest, so
//! valid continuations are re-examined first) and the decoder yields
//! U+FFFD, or fails with `MalformedSequence` under strict mode. In
//! UTF-16 mode an astral code point comes out as its two surrogate
//! halves across consecutive calls, and surrogate halves written
//! back-to-back fuse into one 4-byte sequence.

use super::{CodecMode, Stream};
use crate::channel::Channel;
use crate::error::{Error, Result};

const REPLACEMENT: u32 = char::REPLACEMENT_CHARACTER as u32;

/// True for UTF-16 high (leading) surrogate code units.
#[inline]
pub fn is_high_surrogate(unit: u32) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

/// True for UTF-16 low (trailing) surrogate code units.
#[inline]
pub fn is_low_surrogate(unit: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

#[inline]
fn payload(byte: u8) -> u32 {
    u32::from(byte & 0x3F)
}

impl<C: Channel> Stream<C> {
    /// Returns the next code point, or `None` at end of input.
    ///
    /// In [`CodecMode::Utf32`] this is a whole Unicode scalar. In
    /// [`CodecMode::Utf16`] a value above U+FFFF is returned as its
    /// high surrogate, with the low surrogate re-encoded onto the
    /// push-back stack for the next call.
    pub async fn get_codepoint(&mut self) -> Result<Option<u32>> {
        let split = self.mode == CodecMode::Utf16;
        self.decode_scalar(split).await
    }

    /// Returns the next code point without consuming it.
    pub async fn peek_codepoint(&mut self) -> Result<Option<u32>> {
        let cp = self.get_codepoint().await?;
        if let Some(cp) = cp {
            self.unget_codepoint(cp);
        }
        Ok(cp)
    }

    /// Re-encodes `cp` to UTF-8 and pushes the bytes back, so the next
    /// byte-level reads reproduce the sequence. Never suspends.
    ///
    /// Values above U+10FFFF cannot be encoded and are ignored.
    pub fn unget_codepoint(&mut self, cp: u32) {
        debug_assert!(cp <= 0x10FFFF, "unget_codepoint: {cp:#x} out of range");
        if cp < 0x80 {
            self.unget_byte(cp as u8);
        } else if cp < 0x800 {
            self.unget_byte(0x80 | (cp & 0x3F) as u8);
            self.unget_byte(0xC0 | (cp >> 6) as u8);
        } else if cp < 0x10000 {
            self.unget_byte(0x80 | (cp & 0x3F) as u8);
            self.unget_byte(0x80 | ((cp >> 6) & 0x3F) as u8);
            self.unget_byte(0xE0 | (cp >> 12) as u8);
        } else if cp <= 0x10FFFF {
            self.unget_byte(0x80 | (cp & 0x3F) as u8);
            self.unget_byte(0x80 | ((cp >> 6) & 0x3F) as u8);
            self.unget_byte(0x80 | ((cp >> 12) & 0x3F) as u8);
            self.unget_byte(0xF0 | (cp >> 18) as u8);
        }
    }

    /// Encodes `value` as UTF-8 onto the write buffer.
    ///
    /// A high surrogate is held in the pending register instead of
    /// being written; a following low surrogate fuses with it into one
    /// code point above U+FFFF, while anything else first flushes the
    /// held half as its own 3-byte sequence. Values above U+10FFFF fail
    /// with [`Error::InvalidArgument`].
    pub async fn put_codepoint(&mut self, value: u32) -> Result<()> {
        let mut cp = value;
        if let Some(high) = self.pending_surrogate.take() {
            if is_low_surrogate(cp) {
                cp = 0x10000 + (((high - 0xD800) << 10) | (cp - 0xDC00));
            } else {
                self.put_byte(0xE0 | (high >> 12) as u8).await?;
                self.put_byte(0x80 | ((high >> 6) & 0x3F) as u8).await?;
                self.put_byte(0x80 | (high & 0x3F) as u8).await?;
            }
        }
        if cp < 0x80 {
            self.put_byte(cp as u8).await
        } else if cp < 0x800 {
            self.put_byte(0xC0 | (cp >> 6) as u8).await?;
            self.put_byte(0x80 | (cp & 0x3F) as u8).await
        } else if cp < 0x10000 {
            if is_high_surrogate(cp) {
                self.pending_surrogate = Some(cp);
                return Ok(());
            }
            self.put_byte(0xE0 | (cp >> 12) as u8).await?;
            self.put_byte(0x80 | ((cp >> 6) & 0x3F) as u8).await?;
            self.put_byte(0x80 | (cp & 0x3F) as u8).await
        } else if cp <= 0x10FFFF {
            self.put_byte(0xF0 | (cp >> 18) as u8).await?;
            self.put_byte(0x80 | ((cp >> 12) & 0x3F) as u8).await?;
            self.put_byte(0x80 | ((cp >> 6) & 0x3F) as u8).await?;
            self.put_byte(0x80 | (cp & 0x3F) as u8).await
        } else {
            Err(Error::InvalidArgument)
        }
    }

    /// Reads through the next newline, returning the accumulated text
    /// including the 0x0A, or `None` when end of input arrives first
    /// with nothing read.
    ///
    /// Always consumes whole scalars regardless of codec mode; a scalar
    /// that is not a valid `char` (an unpaired surrogate encoded in the
    /// input) lands in the string as U+FFFD.
    pub async fn get_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            match self.decode_scalar(false).await? {
                Some(cp) => {
                    line.push(char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER));
                    if cp == 0x0A {
                        break;
                    }
                }
                None => {
                    if line.is_empty() {
                        return Ok(None);
                    }
                    break;
                }
            }
        }
        Ok(Some(line))
    }

    /// Encodes every character of `text` through [`Stream::put_codepoint`].
    pub async fn put_str(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            self.put_codepoint(u32::from(ch)).await?;
        }
        Ok(())
    }

    /// Decodes one scalar from the byte stream. With `split`, values
    /// above U+FFFF come out as a high surrogate with the low surrogate
    /// pushed back.
    pub(super) async fn decode_scalar(&mut self, split: bool) -> Result<Option<u32>> {
        let Some(b0) = self.get_byte().await? else {
            return Ok(None);
        };
        if b0 < 0x80 {
            return Ok(Some(u32::from(b0)));
        }
        if b0 & 0xE0 == 0xC0 {
            return match self.get_byte().await? {
                Some(b1) if is_continuation(b1) => {
                    Ok(Some((u32::from(b0 & 0x1F) << 6) | payload(b1)))
                }
                other => self.resync_malformed(&[], other),
            };
        }
        if b0 & 0xF0 == 0xE0 {
            return match self.get_byte().await? {
                Some(b1) if is_continuation(b1) => match self.get_byte().await? {
                    Some(b2) if is_continuation(b2) => Ok(Some(
                        (u32::from(b0 & 0x0F) << 12) | (payload(b1) << 6) | payload(b2),
                    )),
                    other => self.resync_malformed(&[b1], other),
                },
                other => self.resync_malformed(&[], other),
            };
        }
        if b0 & 0xF8 == 0xF0 {
            return match self.get_byte().await? {
                Some(b1) if is_continuation(b1) => match self.get_byte().await? {
                    Some(b2) if is_continuation(b2) => match self.get_byte().await? {
                        Some(b3) if is_continuation(b3) => {
                            let cp = (u32::from(b0 & 0x07) << 18)
                                | (payload(b1) << 12)
                                | (payload(b2) << 6)
                                | payload(b3);
                            if split && cp > 0xFFFF {
                                let v = cp - 0x10000;
                                self.unget_codepoint(0xDC00 + (v & 0x3FF));
                                return Ok(Some(0xD800 + (v >> 10)));
                            }
                            Ok(Some(cp))
                        }
                        other => self.resync_malformed(&[b1, b2], other),
                    },
                    other => self.resync_malformed(&[b1], other),
                },
                other => self.resync_malformed(&[], other),
            };
        }
        // 0x80..=0xBF and 0xF8..=0xFF cannot lead a sequence; the byte
        // stays consumed.
        self.resync_malformed(&[], None)
    }

    /// Restores the stream after a broken sequence. The mismatched byte
    /// (when one was read) is pushed deepest so the kept continuation
    /// bytes are re-examined first, then reports per the strictness
    /// policy.
    fn resync_malformed(&mut self, kept: &[u8], mismatched: Option<u8>) -> Result<Option<u32>> {
        if let Some(byte) = mismatched {
            self.unget_byte(byte);
        }
        for &byte in kept.iter().rev() {
            self.unget_byte(byte);
        }
        if self.strict_utf8 {
            Err(Error::MalformedSequence)
        } else {
            Ok(Some(REPLACEMENT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemChannel;

    fn reader(bytes: &[u8]) -> Stream<MemChannel> {
        Stream::new(MemChannel::from_vec(bytes.to_vec()))
    }

    async fn collect_codepoints(s: &mut Stream<MemChannel>) -> Vec<u32> {
        let mut out = Vec::new();
        while let Some(cp) = s.get_codepoint().await.unwrap() {
            out.push(cp);
        }
        out
    }

    #[tokio::test]
    async fn test_decodes_each_sequence_length() {
        let text = "a\u{E9}\u{4E0F}\u{1D11E}";
        let mut s = reader(text.as_bytes());
        let cps = collect_codepoints(&mut s).await;
        assert_eq!(cps, vec![0x61, 0xE9, 0x4E0F, 0x1D11E]);
    }

    #[tokio::test]
    async fn test_utf16_mode_splits_astral_codepoints() {
        let mut s = reader("\u{1D11E}".as_bytes());
        s.set_codec_mode(CodecMode::Utf16);
        assert_eq!(s.get_codepoint().await.unwrap(), Some(0xD834));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(0xDD1E));
        assert_eq!(s.get_codepoint().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_utf16_split_survives_unget() {
        let mut s = reader("\u{10348}".as_bytes());
        s.set_codec_mode(CodecMode::Utf16);
        let high = s.get_codepoint().await.unwrap().unwrap();
        s.unget_codepoint(high);
        assert_eq!(s.get_codepoint().await.unwrap(), Some(high));
        let low = s.get_codepoint().await.unwrap().unwrap();
        assert!(is_high_surrogate(high));
        assert!(is_low_surrogate(low));
    }

    #[tokio::test]
    async fn test_malformed_continuation_resyncs_at_bad_byte() {
        // 0xC3 promises one continuation; 0x28 breaks the pattern and
        // must be readable again afterwards.
        let mut s = reader(&[0xC3, 0x28]);
        assert_eq!(s.get_codepoint().await.unwrap(), Some(REPLACEMENT));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(0x28));
        assert_eq!(s.get_codepoint().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_three_byte_cascades() {
        // Valid continuation 0x82 is pushed back too, and re-reads as an
        // invalid lead before 0x41 comes through intact.
        let mut s = reader(&[0xE2, 0x82, 0x41]);
        assert_eq!(s.get_codepoint().await.unwrap(), Some(REPLACEMENT));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(REPLACEMENT));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(0x41));
    }

    #[tokio::test]
    async fn test_invalid_lead_byte_is_consumed() {
        let mut s = reader(&[0x80, 0x41]);
        assert_eq!(s.get_codepoint().await.unwrap(), Some(REPLACEMENT));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(0x41));
    }

    #[tokio::test]
    async fn test_truncated_sequence_at_eof() {
        let mut s = reader(&[0xE2, 0x82]);
        assert_eq!(s.get_codepoint().await.unwrap(), Some(REPLACEMENT));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(REPLACEMENT));
        assert_eq!(s.get_codepoint().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_strict_mode_raises_and_preserves_pushback() {
        let mut s = reader(&[0xC3, 0x28]);
        s.set_strict_utf8(true);
        let err = s.get_codepoint().await.unwrap_err();
        assert!(matches!(err, Error::MalformedSequence));
        // The mismatched byte is back on the stream.
        assert_eq!(s.get_byte().await.unwrap(), Some(0x28));
    }

    #[tokio::test]
    async fn test_unget_codepoint_restores_byte_encoding() {
        let mut s = reader(&[]);
        s.unget_codepoint(0xE9);
        assert_eq!(s.get_byte().await.unwrap(), Some(0xC3));
        assert_eq!(s.get_byte().await.unwrap(), Some(0xA9));
    }

    #[tokio::test]
    async fn test_get_then_unget_is_transparent() {
        let text = "ab\u{1D11E}c";
        let mut s = reader(text.as_bytes());
        let first = s.get_codepoint().await.unwrap().unwrap();
        s.unget_codepoint(first);
        let cps = collect_codepoints(&mut s).await;
        assert_eq!(cps, vec![0x61, 0x62, 0x1D11E, 0x63]);
    }

    #[tokio::test]
    async fn test_round_trip_boundary_codepoints() {
        for cp in [0u32, 0x7F, 0x80, 0x7FF, 0x800, 0xD7FF, 0xE000, 0xFFFF, 0x10000, 0x10FFFF] {
            let chan = MemChannel::new();
            let probe = chan.clone();
            let mut w = Stream::new(chan);
            w.put_codepoint(cp).await.unwrap();
            w.flush().await.unwrap();
            let mut r = Stream::new(MemChannel::from_vec(probe.contents()));
            assert_eq!(r.get_codepoint().await.unwrap(), Some(cp), "cp {cp:#x}");
        }
    }

    #[tokio::test]
    async fn test_round_trip_every_scalar() {
        let chan = MemChannel::new();
        let probe = chan.clone();
        let mut w = Stream::new(chan);
        for cp in (0u32..=0x10FFFF).filter(|cp| !(0xD800..=0xDFFF).contains(cp)) {
            w.put_codepoint(cp).await.unwrap();
        }
        w.flush().await.unwrap();
        let mut r = Stream::new(MemChannel::from_vec(probe.contents()));
        for cp in (0u32..=0x10FFFF).filter(|cp| !(0xD800..=0xDFFF).contains(cp)) {
            assert_eq!(r.get_codepoint().await.unwrap(), Some(cp), "cp {cp:#x}");
        }
        assert_eq!(r.get_codepoint().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_surrogate_pair_fuses_into_four_bytes() {
        let chan = MemChannel::new();
        let probe = chan.clone();
        let mut s = Stream::new(chan);
        s.put_codepoint(0xD834).await.unwrap();
        s.put_codepoint(0xDD1E).await.unwrap();
        s.flush().await.unwrap();
        assert_eq!(probe.contents(), "\u{1D11E}".as_bytes());
    }

    #[tokio::test]
    async fn test_unpaired_high_surrogate_written_as_three_bytes() {
        let chan = MemChannel::new();
        let probe = chan.clone();
        let mut s = Stream::new(chan);
        s.put_codepoint(0xD834).await.unwrap();
        s.put_codepoint(0x41).await.unwrap();
        s.flush().await.unwrap();
        assert_eq!(probe.contents(), &[0xED, 0xA0, 0xB4, 0x41]);
    }

    #[tokio::test]
    async fn test_flush_resolves_pending_surrogate() {
        let chan = MemChannel::new();
        let probe = chan.clone();
        let mut s = Stream::new(chan);
        s.put_codepoint(0xD834).await.unwrap();
        assert!(probe.is_empty());
        s.flush().await.unwrap();
        assert_eq!(probe.contents(), &[0xED, 0xA0, 0xB4]);
    }

    #[tokio::test]
    async fn test_put_codepoint_rejects_out_of_range() {
        let mut s = Stream::new(MemChannel::new());
        let err = s.put_codepoint(0x110000).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument));
    }

    #[tokio::test]
    async fn test_get_line_includes_newline() {
        let mut s = reader(b"one\ntwo");
        assert_eq!(s.get_line().await.unwrap(), Some("one\n".to_string()));
        assert_eq!(s.get_line().await.unwrap(), Some("two".to_string()));
        assert_eq!(s.get_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_line_replaces_malformed_bytes() {
        let mut s = reader(&[b'a', 0xFF, b'\n']);
        assert_eq!(s.get_line().await.unwrap(), Some("a\u{FFFD}\n".to_string()));
    }

    #[tokio::test]
    async fn test_put_str_round_trip() {
        let text = "h\u{E9}llo \u{1D11E}\n";
        let chan = MemChannel::new();
        let probe = chan.clone();
        let mut s = Stream::new(chan);
        s.put_str(text).await.unwrap();
        s.close().await.unwrap();
        assert_eq!(probe.contents(), text.as_bytes());
    }

    #[tokio::test]
    async fn test_peek_codepoint_does_not_consume() {
        let mut s = reader("\u{4E0F}x".as_bytes());
        assert_eq!(s.peek_codepoint().await.unwrap(), Some(0x4E0F));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(0x4E0F));
        assert_eq!(s.get_codepoint().await.unwrap(), Some(0x78));
    }
}
