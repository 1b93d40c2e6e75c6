//! Buffered stream over a byte channel.
//!
//! `Stream` owns a read buffer, a write buffer, and an unbounded
//! push-back stack, and layers a code point codec (`codec`) and a token
//! scanner (`lexer`) on top of single-byte access. Buffer bookkeeping
//! follows the classic stdio shape: `pos` is the consumer cursor,
//! `filled` the producer cursor, and `pos == filled` means empty.

mod codec;
mod lexer;

pub use codec::is_high_surrogate;
pub use codec::is_low_surrogate;

use std::io;

use tracing::trace;

use crate::channel::{Channel, SeekFrom};
use crate::error::Result;

/// Default capacity for read and write buffers.
pub const DEFAULT_BUF_CAPACITY: usize = 8192;

/// Buffering policy for the write side of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Flush only when the buffer fills or on explicit flush/close.
    #[default]
    Full,
    /// Additionally flush after every 0x0A byte.
    Line,
    /// Flush after every byte.
    Unbuffered,
}

/// How `get_codepoint` reports values above U+FFFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecMode {
    /// Whole Unicode scalar values.
    #[default]
    Utf32,
    /// Surrogate-pair emulation: an astral code point is returned as a
    /// high surrogate, with the low surrogate queued for the next call.
    Utf16,
}

/// A buffered, character-aware stream over a [`Channel`].
///
/// The stream assumes one logical reader and one logical writer; it is
/// not a synchronization point. Buffered output is lost unless `flush`
/// or `close` runs; streams handed to a
/// [`Registry`](crate::Registry) get that for free from `drain`.
pub struct Stream<C> {
    chan: C,
    rbuf: Vec<u8>,
    rpos: usize,
    rfilled: usize,
    wbuf: Vec<u8>,
    wpos: usize,
    wfilled: usize,
    pushback: Vec<u8>,
    eof: bool,
    pending_surrogate: Option<u32>,
    policy: Policy,
    mode: CodecMode,
    strict_utf8: bool,
}

// ---------------------------------------------------------------------------
// Construction and configuration
// ---------------------------------------------------------------------------

impl<C> Stream<C> {
    /// Wraps `chan` with default-capacity buffers, fully-buffered
    /// policy, UTF-32 codec mode, and lenient decoding.
    pub fn new(chan: C) -> Self {
        Self::with_capacity(chan, DEFAULT_BUF_CAPACITY)
    }

    /// Wraps `chan` with `capacity`-byte read and write buffers.
    pub fn with_capacity(chan: C, capacity: usize) -> Self {
        // A drained write buffer must have room for a resolved
        // surrogate's 3-byte encoding.
        let capacity = capacity.max(4);
        Self {
            chan,
            rbuf: vec![0; capacity],
            rpos: 0,
            rfilled: 0,
            wbuf: vec![0; capacity],
            wpos: 0,
            wfilled: 0,
            pushback: Vec::new(),
            eof: false,
            pending_surrogate: None,
            policy: Policy::default(),
            mode: CodecMode::default(),
            strict_utf8: false,
        }
    }

    /// Pushes `byte` onto the push-back stack. Never suspends.
    ///
    /// Pushed bytes are yielded before buffered input, most recent
    /// first, and before a cached EOF is reported.
    pub fn unget_byte(&mut self, byte: u8) {
        self.pushback.push(byte);
    }

    /// True once a channel read has returned zero bytes.
    ///
    /// Push-back can still make the next `get_byte` succeed; `seek`
    /// clears the flag.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    pub fn codec_mode(&self) -> CodecMode {
        self.mode
    }

    pub fn set_codec_mode(&mut self, mode: CodecMode) {
        self.mode = mode;
    }

    /// Whether malformed UTF-8 raises an error instead of yielding
    /// U+FFFD.
    pub fn strict_utf8(&self) -> bool {
        self.strict_utf8
    }

    pub fn set_strict_utf8(&mut self, strict: bool) {
        self.strict_utf8 = strict;
    }

    /// Returns a reference to the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.chan
    }

    /// Returns a mutable reference to the underlying channel.
    ///
    /// Direct channel I/O bypasses the buffers; mixing it with stream
    /// operations reorders bytes.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.chan
    }

    /// Discards buffered state and returns the channel.
    ///
    /// Unflushed output is dropped; call [`Stream::flush`] first when
    /// that matters.
    pub fn into_inner(self) -> C {
        self.chan
    }
}

// ---------------------------------------------------------------------------
// Byte-level I/O
// ---------------------------------------------------------------------------

impl<C: Channel> Stream<C> {
    /// Returns the next byte, or `None` at end of input.
    ///
    /// Resolution order: push-back stack, cached EOF, buffered input,
    /// then exactly one channel read to refill the buffer.
    pub async fn get_byte(&mut self) -> Result<Option<u8>> {
        if let Some(byte) = self.pushback.pop() {
            return Ok(Some(byte));
        }
        if self.eof {
            return Ok(None);
        }
        if self.rpos < self.rfilled {
            let byte = self.rbuf[self.rpos];
            self.rpos += 1;
            return Ok(Some(byte));
        }
        let n = self.chan.read(&mut self.rbuf).await?;
        trace!(bytes = n, "read buffer refilled");
        self.rfilled = n;
        if n == 0 {
            self.rpos = 0;
            self.eof = true;
            return Ok(None);
        }
        self.rpos = 1;
        Ok(Some(self.rbuf[0]))
    }

    /// Returns the next byte without consuming it.
    pub async fn peek_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.get_byte().await?;
        if let Some(byte) = byte {
            self.unget_byte(byte);
        }
        Ok(byte)
    }

    /// Appends `byte` to the write buffer, flushing as the buffering
    /// policy demands.
    ///
    /// Overflow drains the buffer without touching the pending-surrogate
    /// register; only policy-triggered and explicit flushes resolve it.
    pub async fn put_byte(&mut self, byte: u8) -> Result<()> {
        if self.wfilled == self.wbuf.len() {
            self.flush_buf().await?;
        }
        self.wbuf[self.wfilled] = byte;
        self.wfilled += 1;
        match self.policy {
            Policy::Unbuffered => self.flush().await,
            Policy::Line if byte == 0x0A => self.flush().await,
            _ => Ok(()),
        }
    }

    /// Fills `buf` from the stream, returning how many bytes were
    /// stored. Fewer than `buf.len()` means end of input was reached.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.get_byte().await? {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    /// Writes all of `data` through the buffer.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            self.put_byte(byte).await?;
        }
        Ok(())
    }

    /// Drives the unflushed region of the write buffer into the channel,
    /// looping over short writes.
    async fn flush_buf(&mut self) -> Result<()> {
        if self.wpos < self.wfilled {
            trace!(pending = self.wfilled - self.wpos, "flushing write buffer");
        }
        while self.wpos < self.wfilled {
            let n = self.chan.write(&self.wbuf[self.wpos..self.wfilled]).await?;
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero).into());
            }
            self.wpos += n;
        }
        self.wpos = 0;
        self.wfilled = 0;
        Ok(())
    }

    /// Flushes buffered output, then resolves a pending high surrogate
    /// by emitting its 3-byte encoding and flushing again.
    pub async fn flush(&mut self) -> Result<()> {
        loop {
            self.flush_buf().await?;
            match self.pending_surrogate.take() {
                Some(unit) => {
                    // The buffer was just drained, so three bytes fit.
                    let tail = [
                        0xE0 | (unit >> 12) as u8,
                        0x80 | ((unit >> 6) & 0x3F) as u8,
                        0x80 | (unit & 0x3F) as u8,
                    ];
                    self.wbuf[self.wfilled..self.wfilled + 3].copy_from_slice(&tail);
                    self.wfilled += 3;
                }
                None => return Ok(()),
            }
        }
    }

    /// Flushes pending output, discards read-side state (buffer,
    /// push-back, EOF flag), and repositions the channel.
    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.flush().await?;
        self.rpos = 0;
        self.rfilled = 0;
        self.pushback.clear();
        self.eof = false;
        self.chan.seek(pos).await
    }

    /// Flushes pending output and closes the channel.
    pub async fn close(&mut self) -> Result<()> {
        self.flush().await?;
        self.chan.close().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemChannel;
    use crate::error::Error;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every channel write so tests can assert on flush
    /// granularity; `limit` caps how many bytes one write accepts.
    struct RecordingChannel {
        log: Arc<Mutex<Vec<Vec<u8>>>>,
        limit: Option<usize>,
    }

    impl RecordingChannel {
        fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    log: Arc::clone(&log),
                    limit: None,
                },
                log,
            )
        }

        fn with_limit(limit: usize) -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
            let (mut chan, log) = Self::new();
            chan.limit = Some(limit);
            (chan, log)
        }
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        async fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Ok(0)
        }

        async fn write(&mut self, data: &[u8]) -> Result<usize> {
            let n = match self.limit {
                Some(limit) => data.len().min(limit),
                None => data.len(),
            };
            self.log.lock().push(data[..n].to_vec());
            Ok(n)
        }

        async fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
            Err(Error::NotSeekable)
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Serves canned bytes and counts channel reads.
    struct CountingReader {
        data: Vec<u8>,
        pos: usize,
        reads: Arc<Mutex<usize>>,
    }

    impl CountingReader {
        fn new(data: Vec<u8>) -> (Self, Arc<Mutex<usize>>) {
            let reads = Arc::new(Mutex::new(0));
            (
                Self {
                    data,
                    pos: 0,
                    reads: Arc::clone(&reads),
                },
                reads,
            )
        }
    }

    #[async_trait]
    impl Channel for CountingReader {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            *self.reads.lock() += 1;
            let n = buf.len().min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        async fn write(&mut self, _data: &[u8]) -> Result<usize> {
            Err(Error::InvalidArgument)
        }

        async fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
            Err(Error::NotSeekable)
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_byte_drains_then_reports_eof() {
        let mut s = Stream::with_capacity(MemChannel::from_vec(b"abc".to_vec()), 4);
        assert_eq!(s.get_byte().await.unwrap(), Some(b'a'));
        assert_eq!(s.get_byte().await.unwrap(), Some(b'b'));
        assert_eq!(s.get_byte().await.unwrap(), Some(b'c'));
        assert_eq!(s.get_byte().await.unwrap(), None);
        assert!(s.is_eof());
        // EOF is cached; no more channel reads happen.
        assert_eq!(s.get_byte().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_refill_issues_one_read_per_exhaustion() {
        let (chan, reads) = CountingReader::new(b"0123456789".to_vec());
        let mut s = Stream::with_capacity(chan, 4);
        for expect in b"0123456789" {
            assert_eq!(s.get_byte().await.unwrap(), Some(*expect));
        }
        assert_eq!(s.get_byte().await.unwrap(), None);
        // 10 bytes at capacity 4: three full refills plus the EOF probe.
        assert_eq!(*reads.lock(), 4);
    }

    #[tokio::test]
    async fn test_unget_wins_over_buffer_and_eof() {
        let mut s = Stream::new(MemChannel::from_vec(b"x".to_vec()));
        assert_eq!(s.get_byte().await.unwrap(), Some(b'x'));
        assert_eq!(s.get_byte().await.unwrap(), None);
        s.unget_byte(b'q');
        assert_eq!(s.get_byte().await.unwrap(), Some(b'q'));
        assert_eq!(s.get_byte().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unget_is_lifo() {
        let mut s = Stream::new(MemChannel::new());
        s.unget_byte(1);
        s.unget_byte(2);
        s.unget_byte(3);
        assert_eq!(s.get_byte().await.unwrap(), Some(3));
        assert_eq!(s.get_byte().await.unwrap(), Some(2));
        assert_eq!(s.get_byte().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_peek_does_not_consume() {
        let mut s = Stream::new(MemChannel::from_vec(b"ab".to_vec()));
        assert_eq!(s.peek_byte().await.unwrap(), Some(b'a'));
        assert_eq!(s.get_byte().await.unwrap(), Some(b'a'));
        assert_eq!(s.get_byte().await.unwrap(), Some(b'b'));
        assert_eq!(s.peek_byte().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_full_policy_flushes_only_when_full() {
        let (chan, log) = RecordingChannel::new();
        let mut s = Stream::with_capacity(chan, 4);
        s.write(b"abcdef").await.unwrap();
        // Four bytes went out when the buffer filled; two are pending.
        assert_eq!(*log.lock(), vec![b"abcd".to_vec()]);
        s.flush().await.unwrap();
        assert_eq!(*log.lock(), vec![b"abcd".to_vec(), b"ef".to_vec()]);
    }

    #[tokio::test]
    async fn test_line_policy_flushes_on_newline() {
        let (chan, log) = RecordingChannel::new();
        let mut s = Stream::with_capacity(chan, 64);
        s.set_policy(Policy::Line);
        s.write(b"one\ntwo").await.unwrap();
        assert_eq!(*log.lock(), vec![b"one\n".to_vec()]);
        s.flush().await.unwrap();
        assert_eq!(*log.lock(), vec![b"one\n".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn test_unbuffered_policy_writes_each_byte() {
        let (chan, log) = RecordingChannel::new();
        let mut s = Stream::with_capacity(chan, 64);
        s.set_policy(Policy::Unbuffered);
        s.write(b"hi!").await.unwrap();
        let writes = log.lock();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|w| w.len() == 1));
    }

    #[tokio::test]
    async fn test_flush_loops_over_short_writes() {
        let (chan, log) = RecordingChannel::with_limit(1);
        let mut s = Stream::with_capacity(chan, 64);
        s.write(b"abc").await.unwrap();
        s.flush().await.unwrap();
        assert_eq!(*log.lock(), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[tokio::test]
    async fn test_flush_rejects_zero_byte_writes() {
        let (chan, _log) = RecordingChannel::with_limit(0);
        let mut s = Stream::with_capacity(chan, 64);
        s.write(b"abc").await.unwrap();
        let err = s.flush().await.unwrap_err();
        assert!(matches!(err, Error::Io(ref io) if io.kind() == io::ErrorKind::WriteZero));
    }

    #[tokio::test]
    async fn test_seek_discards_read_state() {
        let mut s = Stream::with_capacity(MemChannel::from_vec(b"abcdef".to_vec()), 4);
        assert_eq!(s.get_byte().await.unwrap(), Some(b'a'));
        s.unget_byte(b'Z');
        assert_eq!(s.seek(SeekFrom::Start(3)).await.unwrap(), 3);
        assert_eq!(s.get_byte().await.unwrap(), Some(b'd'));
    }

    #[tokio::test]
    async fn test_seek_clears_cached_eof() {
        let mut s = Stream::new(MemChannel::from_vec(b"ab".to_vec()));
        while s.get_byte().await.unwrap().is_some() {}
        assert!(s.is_eof());
        s.seek(SeekFrom::Start(0)).await.unwrap();
        assert!(!s.is_eof());
        assert_eq!(s.get_byte().await.unwrap(), Some(b'a'));
    }

    #[tokio::test]
    async fn test_close_flushes_buffered_output() {
        let chan = MemChannel::new();
        let probe = chan.clone();
        let mut s = Stream::new(chan);
        s.write(b"kept").await.unwrap();
        assert!(probe.is_empty());
        s.close().await.unwrap();
        assert_eq!(probe.contents(), b"kept");
    }

    #[tokio::test]
    async fn test_bulk_read_stops_at_eof() {
        let mut s = Stream::new(MemChannel::from_vec(b"abc".to_vec()));
        let mut buf = [0u8; 8];
        assert_eq!(s.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(s.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_round_trip_through_mem_channel() {
        let chan = MemChannel::new();
        let probe = chan.clone();
        let mut s = Stream::with_capacity(chan, 4);
        s.write(b"hello buffered world").await.unwrap();
        s.flush().await.unwrap();
        assert_eq!(probe.contents(), b"hello buffered world");
    }
}
