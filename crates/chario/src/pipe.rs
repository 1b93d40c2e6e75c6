//! One-writer/one-reader in-memory pipe.
//!
//! Design: a growable byte buffer with `head..tail` marking the unread
//! region, plus a FIFO queue of suspended read requests. Writes never
//! block (the buffer compacts or reallocates instead) while reads
//! suspend until data or producer close. Waiters are completed through
//! oneshot channels, so a write schedules the suspended reader rather
//! than running it inline.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::channel::{Channel, SeekFrom};
use crate::error::{Error, Result};
use async_trait::async_trait;

const PIPE_CAPACITY: usize = 8192;
const PIPE_SLACK: usize = 1024;

struct Waiter {
    cap: usize,
    tx: oneshot::Sender<Vec<u8>>,
}

struct PipeState {
    buf: Vec<u8>,
    head: usize,
    tail: usize,
    waiters: VecDeque<Waiter>,
    eof: bool,
    broken: bool,
}

impl PipeState {
    fn available(&self) -> usize {
        self.tail - self.head
    }

    /// Makes room for `len` more bytes at the tail, first by shifting the
    /// unread region to offset zero, then by reallocating.
    fn ensure_room(&mut self, len: usize) {
        if self.tail + len <= self.buf.len() {
            return;
        }
        let unread = self.available();
        if unread + len <= self.buf.len() {
            self.buf.copy_within(self.head..self.tail, 0);
        } else {
            let mut grown = vec![0u8; unread + len + PIPE_SLACK];
            grown[..unread].copy_from_slice(&self.buf[self.head..self.tail]);
            self.buf = grown;
        }
        self.head = 0;
        self.tail = unread;
    }

    /// Completes queued readers in FIFO order while unread bytes remain.
    ///
    /// A reader whose receiving future has been dropped is skipped and
    /// its bytes stay in the buffer for the next waiter.
    fn deliver_ready(&mut self) {
        while self.head < self.tail {
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            let n = waiter.cap.min(self.available());
            let chunk = self.buf[self.head..self.head + n].to_vec();
            if waiter.tx.send(chunk).is_ok() {
                self.head += n;
                trace!(bytes = n, "pipe delivered to suspended reader");
            }
        }
        if self.head == self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }
}

fn close_producer(state: &Mutex<PipeState>) {
    let mut st = state.lock();
    if st.eof {
        return;
    }
    st.eof = true;
    let pending = st.waiters.len();
    // Every still-queued reader is woken in order with whatever remains,
    // possibly zero bytes (clean EOF).
    while let Some(waiter) = st.waiters.pop_front() {
        let n = waiter.cap.min(st.available());
        let head = st.head;
        let chunk = st.buf[head..head + n].to_vec();
        if waiter.tx.send(chunk).is_ok() {
            st.head += n;
        }
    }
    debug!(pending, "pipe producer closed");
}

fn close_consumer(state: &Mutex<PipeState>) {
    let mut st = state.lock();
    if st.broken {
        return;
    }
    st.broken = true;
    debug!(unread = st.available(), "pipe consumer closed");
}

/// Producer half of a [`mem_pipe`]. Write-only; `seek` always fails.
pub struct PipeWriter {
    state: Arc<Mutex<PipeState>>,
}

/// Consumer half of a [`mem_pipe`]. Read-only; `seek` always fails.
pub struct PipeReader {
    state: Arc<Mutex<PipeState>>,
}

/// Creates an in-memory pipe, returning its consumer and producer halves.
///
/// Bytes arrive at the consumer in exactly the order written. A read on
/// an empty pipe suspends until the producer writes or closes; writes
/// never suspend. Dropping a half without closing it behaves like
/// `close`, so a panicked task cannot strand its peer.
pub fn mem_pipe() -> (PipeReader, PipeWriter) {
    let state = Arc::new(Mutex::new(PipeState {
        buf: vec![0u8; PIPE_CAPACITY],
        head: 0,
        tail: 0,
        waiters: VecDeque::new(),
        eof: false,
        broken: false,
    }));
    (
        PipeReader {
            state: Arc::clone(&state),
        },
        PipeWriter { state },
    )
}

#[async_trait]
impl Channel for PipeWriter {
    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::InvalidArgument)
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut st = self.state.lock();
        if st.broken {
            return Err(Error::BrokenPipe);
        }
        if st.eof {
            // This half was already closed by its owner.
            return Err(Error::InvalidArgument);
        }
        st.ensure_room(data.len());
        let tail = st.tail;
        st.buf[tail..tail + data.len()].copy_from_slice(data);
        st.tail += data.len();
        st.deliver_ready();
        Ok(data.len())
    }

    async fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::NotSeekable)
    }

    async fn close(&mut self) -> Result<()> {
        close_producer(&self.state);
        Ok(())
    }
}

#[async_trait]
impl Channel for PipeReader {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let rx = {
            let mut st = self.state.lock();
            if st.head < st.tail {
                let n = buf.len().min(st.available());
                let head = st.head;
                buf[..n].copy_from_slice(&st.buf[head..head + n]);
                st.head += n;
                if st.head == st.tail {
                    st.head = 0;
                    st.tail = 0;
                }
                return Ok(n);
            }
            if st.eof {
                return Ok(0);
            }
            if st.broken {
                // This half was already closed by its owner.
                return Err(Error::InvalidArgument);
            }
            let (tx, rx) = oneshot::channel();
            st.waiters.push_back(Waiter { cap: buf.len(), tx });
            rx
        };
        match rx.await {
            Ok(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            // Producer state vanished without a close; treat as EOF.
            Err(_) => Ok(0),
        }
    }

    async fn write(&mut self, _data: &[u8]) -> Result<usize> {
        Err(Error::InvalidArgument)
    }

    async fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::NotSeekable)
    }

    async fn close(&mut self) -> Result<()> {
        close_consumer(&self.state);
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        close_producer(&self.state);
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        close_consumer(&self.state);
    }
}
