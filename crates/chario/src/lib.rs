//! # chario
//!
//! Buffered, character-aware async I/O over arbitrary byte channels.
//!
//! The core is [`Stream`]: a read/write buffered layer with an
//! unbounded push-back stack, carrying a UTF-8 code point codec (with
//! UTF-16 surrogate emulation), a line reader, and a JSON-shaped token
//! scanner. Underneath sits the [`Channel`] contract with OS, in-memory,
//! and pipe implementations; above sits [`Stdio`], a process context
//! that tracks every open stream so one `shutdown` call flushes them
//! all.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> chario::Result<()> {
//! use chario::{MemChannel, Stream};
//!
//! let mut s = Stream::new(MemChannel::from_vec("π ≈ 3.14\n".into()));
//! assert_eq!(s.get_codepoint().await?, Some(0x3C0));
//! s.unget_codepoint(0x3C0);
//! assert_eq!(s.get_line().await?, Some("π ≈ 3.14\n".to_string()));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod channel;
pub mod errno;
pub mod error;
pub mod pipe;
pub mod registry;
pub mod stdio;
pub mod stream;

pub use channel::{BoxedChannel, Channel, MemChannel, OsChannel, SeekFrom};
pub use error::{Error, Result};
pub use pipe::{PipeReader, PipeWriter, mem_pipe};
pub use registry::{Registry, SharedStream};
pub use stdio::Stdio;
pub use stream::{CodecMode, DEFAULT_BUF_CAPACITY, Policy, Stream};
