//! In-memory channel backed by a growable byte buffer.
//!
//! `MemChannel` behaves like a file whose backing store is a `Vec<u8>`:
//! reads consume from the current position, writes overwrite or extend,
//! and the full seek family is supported. Handles are cheap clones over
//! shared storage, so a test can keep one handle to inspect what a
//! stream wrote through another.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::{Channel, SeekFrom};
use crate::error::{Error, Result};
use async_trait::async_trait;

#[derive(Default)]
struct MemState {
    data: Vec<u8>,
    pos: usize,
}

/// A seekable in-memory byte channel.
#[derive(Clone, Default)]
pub struct MemChannel {
    state: Arc<Mutex<MemState>>,
}

impl MemChannel {
    /// Creates an empty channel positioned at offset zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel whose initial contents are `data`, positioned
    /// at offset zero.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemState { data, pos: 0 })),
        }
    }

    /// Returns a copy of the current contents.
    pub fn contents(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    /// Returns the number of stored bytes.
    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Returns `true` when no bytes are stored.
    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    /// Returns the current read/write position.
    pub fn position(&self) -> u64 {
        self.state.lock().pos as u64
    }
}

#[async_trait]
impl Channel for MemChannel {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut st = self.state.lock();
        let avail = st.data.len().saturating_sub(st.pos);
        let n = buf.len().min(avail);
        let pos = st.pos;
        buf[..n].copy_from_slice(&st.data[pos..pos + n]);
        st.pos += n;
        Ok(n)
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut st = self.state.lock();
        let end = st.pos + data.len();
        if end > st.data.len() {
            // A seek past the end followed by a write leaves a zero gap,
            // matching file semantics.
            st.data.resize(end, 0);
        }
        let pos = st.pos;
        st.data[pos..end].copy_from_slice(data);
        st.pos = end;
        Ok(data.len())
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let mut st = self.state.lock();
        let target = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset).map_err(|_| Error::InvalidArgument)?,
            SeekFrom::Current(delta) => st.pos as i64 + delta,
            SeekFrom::End(delta) => st.data.len() as i64 + delta,
        };
        if target < 0 {
            return Err(Error::InvalidArgument);
        }
        st.pos = target as usize;
        Ok(st.pos as u64)
    }

    async fn close(&mut self) -> Result<()> {
        // Storage stays alive while other handles exist.
        Ok(())
    }
}
