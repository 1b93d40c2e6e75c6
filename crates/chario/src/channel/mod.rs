//! Byte channel abstraction.
//!
//! A [`Channel`] is the unbuffered transport a [`crate::Stream`] sits on:
//! files, the process's standard streams, in-memory buffers, and pipe
//! halves all implement it. The contract is deliberately austere (four
//! operations, byte slices in and out) so that buffering, character
//! decoding, and tokenization live entirely in the stream layer.

mod mem;
mod os;

pub use mem::MemChannel;
pub use os::OsChannel;

use crate::error::Result;
use async_trait::async_trait;

pub use std::io::SeekFrom;

/// A boxed channel, as held by registry-managed streams.
pub type BoxedChannel = Box<dyn Channel>;

/// An unbuffered bidirectional byte transport.
///
/// Contracts shared by every implementation:
///
/// - `read` returning `Ok(0)` for a non-empty buffer means end of data.
/// - `write` may accept fewer bytes than offered; callers loop.
/// - `seek` returns the new position from the start, or
///   [`Error::NotSeekable`](crate::Error::NotSeekable) when the channel
///   has no file position.
/// - `close` releases the underlying resource. Closing twice is a no-op;
///   any other operation after `close` fails with
///   [`Error::InvalidArgument`](crate::Error::InvalidArgument).
#[async_trait]
pub trait Channel: Send {
    /// Reads up to `buf.len()` bytes, returning how many were stored.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Writes up to `data.len()` bytes, returning how many were taken.
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Moves the channel position, returning the new offset from the start.
    async fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Releases the underlying resource.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Box<C> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf).await
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data).await
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}
