//! Error type shared by channels, streams, and pipes.
//!
//! Every failure carries an errno-shaped kind so callers can match on
//! semantics without string inspection. OS-level failures are wrapped
//! rather than flattened, preserving the underlying `std::io::Error`.

use crate::errno;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by channel, stream, and pipe operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument was outside the accepted domain (seek before start,
    /// value above U+10FFFF, operation on a closed channel).
    #[error("invalid argument")]
    InvalidArgument,

    /// Seek was attempted on a channel without a file position.
    #[error("illegal seek")]
    NotSeekable,

    /// The consuming end of a pipe is gone; written bytes could never
    /// be read.
    #[error("broken pipe")]
    BrokenPipe,

    /// Input bytes do not form a valid encoded sequence, or token input
    /// violates the token grammar.
    #[error("illegal byte sequence")]
    MalformedSequence,

    /// An operating-system I/O failure from the underlying channel.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The errno value for this error.
    ///
    /// OS errors report their raw errno when the platform provides one,
    /// `EIO` otherwise.
    pub fn errno(&self) -> i32 {
        match self {
            Error::InvalidArgument => errno::EINVAL,
            Error::NotSeekable => errno::ESPIPE,
            Error::BrokenPipe => errno::EPIPE,
            Error::MalformedSequence => errno::EILSEQ,
            Error::Io(err) => err.raw_os_error().unwrap_or(errno::EIO),
        }
    }

    /// The symbolic errno name, e.g. `"EINVAL"`.
    pub fn code(&self) -> &'static str {
        errno::name(self.errno()).unwrap_or("EIO")
    }
}
