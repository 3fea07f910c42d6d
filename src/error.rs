use thiserror::Error;

use crate::emulation::EmulationError;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Blob Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid signature blob
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a blob
/// - [`Error::RecursionLimit`] - A nested type signature was too deep
///
/// ## Execution Errors
/// - [`Error::Emulation`] - A fatal condition raised by the call-frame state machine, see
///   [`EmulationError`] for the full taxonomy
///
/// # Examples
///
/// ```rust
/// use dotframe::{Error, metadata::signatures::parse_method_signature};
///
/// match parse_method_signature(&[0x00]) {
///     Ok(signature) => println!("{} parameters", signature.param_count),
///     Err(Error::OutOfBounds) => eprintln!("truncated signature"),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The blob is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a blob.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Recursion limit reached.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// A fatal condition raised while stepping a thread.
    ///
    /// None of these are recovered from inside the step function; the owning thread
    /// (and usually the whole virtual machine instance) must be treated as dead.
    #[error(transparent)]
    Emulation(#[from] EmulationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::token::Token;

    #[test]
    fn test_malformed_macro_captures_location() {
        let err = malformed_error!("bad byte - {}", 0x42);
        match err {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad byte - 66");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_emulation_error_is_transparent() {
        let err: Error = EmulationError::MissingMethodBody {
            token: Token::new(0x0600_0003),
        }
        .into();
        assert!(matches!(err, Error::Emulation(_)));
        assert!(err.to_string().contains("0x06000003"));
    }
}
