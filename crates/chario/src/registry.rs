//! Open-stream registry.
//!
//! The registry is an explicit object owned by whoever owns the process
//! context (see [`crate::Stdio`]): streams are attached at open time and
//! removed at close, and a single `drain` sweep flushes and closes
//! everything still open, in registration order. Nothing here is global
//! state; dropping the registry drops its bookkeeping, not the streams'
//! buffered bytes, so call `drain` before exit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::debug;

use crate::channel::BoxedChannel;
use crate::error::Result;
use crate::stream::Stream;

/// Registry of open streams.
pub struct Registry {
    streams: Mutex<Vec<SharedStream>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Wraps `stream` in a shared handle and records it as open.
    pub fn attach(self: &Arc<Self>, stream: Stream<BoxedChannel>) -> SharedStream {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = SharedStream {
            id,
            core: Arc::new(AsyncMutex::new(stream)),
            registry: Arc::downgrade(self),
        };
        self.streams.lock().push(shared.clone());
        shared
    }

    fn deregister(&self, id: u64) {
        self.streams.lock().retain(|s| s.id != id);
    }

    /// Number of streams currently registered as open.
    pub fn open_count(&self) -> usize {
        self.streams.lock().len()
    }

    /// Flushes and closes every registered stream, oldest first.
    ///
    /// Every stream is attempted even when one fails; the first error
    /// is reported after the sweep finishes.
    pub async fn drain(&self) -> Result<()> {
        let streams = std::mem::take(&mut *self.streams.lock());
        debug!(count = streams.len(), "draining stream registry");
        let mut first_err = None;
        for shared in streams {
            let mut stream = shared.core.lock().await;
            if let Err(err) = stream.close().await {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered stream. Clones share the same stream; the
/// async lock serializes access across tasks.
#[derive(Clone)]
pub struct SharedStream {
    id: u64,
    core: Arc<AsyncMutex<Stream<BoxedChannel>>>,
    registry: Weak<Registry>,
}

impl SharedStream {
    /// Registry-unique identifier, stable for the stream's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Locks the stream for a sequence of operations.
    pub async fn lock(&self) -> MutexGuard<'_, Stream<BoxedChannel>> {
        self.core.lock().await
    }

    /// Flushes buffered output, closes the channel, and removes the
    /// stream from its registry.
    ///
    /// The stream is deregistered even when the close fails; a failed
    /// flush does not keep a dead stream on the shutdown path.
    pub async fn close(&self) -> Result<()> {
        let result = {
            let mut stream = self.core.lock().await;
            stream.close().await
        };
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
        result
    }
}
