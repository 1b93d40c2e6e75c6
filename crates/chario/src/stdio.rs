//! Process stream context.
//!
//! `Stdio` bundles the three standard streams with a [`Registry`] so a
//! program has one object to open streams through and one `shutdown`
//! call that guarantees buffered output reaches the OS before exit.
//! Policy defaults follow stdio convention: stderr unbuffered, stdout
//! line-buffered on a terminal and fully buffered otherwise.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::channel::{BoxedChannel, Channel, OsChannel};
use crate::error::Result;
use crate::registry::{Registry, SharedStream};
use crate::stream::{Policy, Stream};

/// The standard streams plus a registry of everything opened through it.
pub struct Stdio {
    registry: Arc<Registry>,
    stdin: SharedStream,
    stdout: SharedStream,
    stderr: SharedStream,
}

impl Stdio {
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let stdin = registry.attach(Stream::new(Box::new(OsChannel::stdin()) as BoxedChannel));

        let mut out = Stream::new(Box::new(OsChannel::stdout()) as BoxedChannel);
        out.set_policy(if std::io::stdout().is_terminal() {
            Policy::Line
        } else {
            Policy::Full
        });
        let stdout = registry.attach(out);

        let mut err = Stream::new(Box::new(OsChannel::stderr()) as BoxedChannel);
        err.set_policy(Policy::Unbuffered);
        let stderr = registry.attach(err);

        Self {
            registry,
            stdin,
            stdout,
            stderr,
        }
    }

    pub fn stdin(&self) -> &SharedStream {
        &self.stdin
    }

    pub fn stdout(&self) -> &SharedStream {
        &self.stdout
    }

    pub fn stderr(&self) -> &SharedStream {
        &self.stderr
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Opens `path` for reading and registers the stream.
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<SharedStream> {
        let chan = OsChannel::open(path.as_ref()).await?;
        debug!(path = %path.as_ref().display(), "opened input stream");
        Ok(self
            .registry
            .attach(Stream::new(Box::new(chan) as BoxedChannel)))
    }

    /// Creates (or truncates) `path` for writing and registers the
    /// stream, fully buffered.
    pub async fn create(&self, path: impl AsRef<Path>) -> Result<SharedStream> {
        let chan = OsChannel::create(path.as_ref()).await?;
        debug!(path = %path.as_ref().display(), "created output stream");
        Ok(self
            .registry
            .attach(Stream::new(Box::new(chan) as BoxedChannel)))
    }

    /// Registers a stream over an arbitrary channel (a pipe half, an
    /// in-memory buffer) with the given buffering policy.
    pub fn adopt<C>(&self, chan: C, policy: Policy) -> SharedStream
    where
        C: Channel + 'static,
    {
        let mut stream = Stream::new(Box::new(chan) as BoxedChannel);
        stream.set_policy(policy);
        self.registry.attach(stream)
    }

    /// Flushes and closes every stream opened through this context,
    /// standard streams included.
    pub async fn shutdown(&self) -> Result<()> {
        self.registry.drain().await
    }
}

impl Default for Stdio {
    fn default() -> Self {
        Self::new()
    }
}
