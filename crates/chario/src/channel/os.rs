//! Channels over operating-system file descriptors.
//!
//! `OsChannel` wraps tokio's file and standard-stream handles behind the
//! [`Channel`] contract. Files support the full read/write/seek surface;
//! the process streams are one-directional and refuse `seek` the way a
//! terminal or pipe descriptor would.

use std::path::Path;

use tokio::fs;
use tokio::io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::channel::{Channel, SeekFrom};
use crate::error::{Error, Result};
use async_trait::async_trait;

enum OsEndpoint {
    File(fs::File),
    Stdin(io::Stdin),
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

/// A channel over an OS file or standard stream.
///
/// `close` consumes the handle; later operations fail with
/// [`Error::InvalidArgument`] instead of touching a recycled descriptor.
pub struct OsChannel {
    endpoint: Option<OsEndpoint>,
}

impl OsChannel {
    /// Opens an existing file for reading.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = fs::File::open(path).await?;
        Ok(Self::from_file(file))
    }

    /// Creates (or truncates) a file for writing.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = fs::File::create(path).await?;
        Ok(Self::from_file(file))
    }

    /// Wraps an already-open file, e.g. one built with custom
    /// `OpenOptions`.
    pub fn from_file(file: fs::File) -> Self {
        Self {
            endpoint: Some(OsEndpoint::File(file)),
        }
    }

    /// The process's standard input.
    pub fn stdin() -> Self {
        Self {
            endpoint: Some(OsEndpoint::Stdin(io::stdin())),
        }
    }

    /// The process's standard output.
    pub fn stdout() -> Self {
        Self {
            endpoint: Some(OsEndpoint::Stdout(io::stdout())),
        }
    }

    /// The process's standard error.
    pub fn stderr() -> Self {
        Self {
            endpoint: Some(OsEndpoint::Stderr(io::stderr())),
        }
    }
}

#[async_trait]
impl Channel for OsChannel {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.endpoint.as_mut() {
            Some(OsEndpoint::File(file)) => Ok(file.read(buf).await?),
            Some(OsEndpoint::Stdin(stdin)) => Ok(stdin.read(buf).await?),
            Some(OsEndpoint::Stdout(_)) | Some(OsEndpoint::Stderr(_)) | None => {
                Err(Error::InvalidArgument)
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        match self.endpoint.as_mut() {
            Some(OsEndpoint::File(file)) => Ok(file.write(data).await?),
            Some(OsEndpoint::Stdout(stdout)) => Ok(stdout.write(data).await?),
            Some(OsEndpoint::Stderr(stderr)) => Ok(stderr.write(data).await?),
            Some(OsEndpoint::Stdin(_)) | None => Err(Error::InvalidArgument),
        }
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        match self.endpoint.as_mut() {
            Some(OsEndpoint::File(file)) => Ok(file.seek(pos).await?),
            Some(_) => Err(Error::NotSeekable),
            None => Err(Error::InvalidArgument),
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.endpoint.take() {
            Some(OsEndpoint::File(mut file)) => Ok(file.shutdown().await?),
            Some(OsEndpoint::Stdout(mut stdout)) => Ok(stdout.shutdown().await?),
            Some(OsEndpoint::Stderr(mut stderr)) => Ok(stderr.shutdown().await?),
            // Nothing buffered on the read side.
            Some(OsEndpoint::Stdin(_)) => Ok(()),
            // Second close is a no-op.
            None => Ok(()),
        }
    }
}
