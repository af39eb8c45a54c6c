//! Library-wide error and result types.

use std::fmt;
use std::io;

use crate::keys::KeyKind;

/// Result alias used throughout enigmatrix.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// The key material cannot be used: passphrase shorter than
    /// [`MIN_KEY_LEN`](crate::MIN_KEY_LEN), an RSA unwrap failure, or
    /// required key material that was not supplied.
    InvalidKey(&'static str),
    /// The input is not an enigmatrix container (bad flag byte, or shorter
    /// than the minimum header).
    NotEncrypted,
    /// A PEM key of the wrong kind was supplied.
    WrongKeyType {
        /// The kind the operation needed.
        expected: KeyKind,
    },
    /// A block handed to the matrix codec was not exactly
    /// [`BLOCK_SIZE`](crate::BLOCK_SIZE) bytes. Signals a truncated
    /// ciphertext body or an internal bug.
    Shape(usize),
    /// RSA key generation or PEM encode/parse failed.
    Rsa(String),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKey(msg) => write!(f, "{msg}"),
            Error::NotEncrypted => write!(f, "not an encrypted file"),
            Error::WrongKeyType { expected } => {
                write!(f, "wrong RSA key type: expected a {expected} key")
            }
            Error::Shape(len) => write!(f, "block is {len} bytes, expected exactly 1 MiB"),
            Error::Rsa(msg) => write!(f, "RSA error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
