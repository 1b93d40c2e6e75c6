//! Error number definitions.
//!
//! The symbolic codes carried by [`crate::Error`], kept numerically
//! compatible with Linux `<errno.h>` so shell scripts and logs read the
//! same against either implementation.

/// Input/output error (fallback for OS errors without a number).
pub const EIO: i32 = 5;
/// Invalid argument.
pub const EINVAL: i32 = 22;
/// Illegal seek.
pub const ESPIPE: i32 = 29;
/// Broken pipe.
pub const EPIPE: i32 = 32;
/// Illegal byte sequence.
pub const EILSEQ: i32 = 84;

/// Returns the symbolic name for a code this crate produces, if any.
pub fn name(code: i32) -> Option<&'static str> {
    match code {
        EIO => Some("EIO"),
        EINVAL => Some("EINVAL"),
        ESPIPE => Some("ESPIPE"),
        EPIPE => Some("EPIPE"),
        EILSEQ => Some("EILSEQ"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_known_codes() {
        assert_eq!(name(EINVAL), Some("EINVAL"));
        assert_eq!(name(ESPIPE), Some("ESPIPE"));
        assert_eq!(name(EPIPE), Some("EPIPE"));
        assert_eq!(name(EILSEQ), Some("EILSEQ"));
    }

    #[test]
    fn test_name_unknown_code() {
        assert_eq!(name(0), None);
        assert_eq!(name(-1), None);
    }
}
