//! Contains the `Error` and `Result` types that `opcore` uses.

use std::{collections::HashSet, fmt, sync::Arc};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    bson::{Bson, Document},
    bson_util,
};

const RETRYABLE_WRITE_CODES: [i32; 12] = [
    11600, 11602, 10107, 13435, 13436, 189, 91, 7, 6, 89, 9001, 262,
];

/// Retryable write error label. This label will be added to an error when the error is
/// write-retryable.
pub const RETRYABLE_WRITE_ERROR: &str = "RetryableWriteError";

/// The result type for all methods that can return an error in the `opcore` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `opcore` crate. The inner [`ErrorKind`] is wrapped in a `Box` to
/// keep the error cheap to move through `Result` chains.
#[derive(Clone, Debug, Error)]
#[error("Kind: {kind}, labels: {labels:?}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,

    labels: HashSet<String>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, labels: Option<impl IntoIterator<Item = String>>) -> Self {
        let labels = labels
            .map(|labels| labels.into_iter().collect())
            .unwrap_or_default();
        Self {
            kind: Box::new(kind),
            labels,
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        ErrorKind::InvalidResponse {
            message: message.into(),
        }
        .into()
    }

    /// The canonical conversion from a well-formed command response document with `ok != 1` into
    /// a normalized error value. Every logical command failure funnels through here.
    pub(crate) fn from_command_response(response: &Document) -> Self {
        let labels = response.get_array("errorLabels").ok().map(|labels| {
            labels
                .iter()
                .filter_map(Bson::as_str)
                .map(String::from)
                .collect::<Vec<_>>()
        });
        match bson::from_bson::<CommandError>(Bson::Document(response.clone())) {
            Ok(command_error) => Error::new(ErrorKind::Command(command_error), labels),
            Err(_) => Error::new(
                ErrorKind::InvalidResponse {
                    message: format!("server returned malformed failure response: {}", response),
                },
                labels,
            ),
        }
    }

    /// Whether an error originated from the transport layer rather than the server.
    pub(crate) fn is_network_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Io(..))
    }

    /// Whether a failed write may be re-issued per the error's code or labels. The operation's
    /// own eligibility (aspects plus the per-call predicate) is checked separately by callers.
    pub fn is_write_retryable(&self) -> bool {
        if self.is_network_error() || self.contains_label(RETRYABLE_WRITE_ERROR) {
            return true;
        }
        match self.kind.code_and_message() {
            Some((code, _)) => RETRYABLE_WRITE_CODES.contains(&code),
            None => false,
        }
    }

    /// Returns the labels for this error.
    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }

    /// Whether this error contains the specified label.
    pub fn contains_label<T: AsRef<str>>(&self, label: T) -> bool {
        self.labels.contains(label.as_ref())
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self {
            kind: Box::new(err.into()),
            labels: Default::default(),
        }
    }
}

/// The types of errors that can occur.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An invalid argument was provided to an operation. Raised synchronously at construction,
    /// never delivered through the async result channel.
    #[error("An invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    /// The server returned an error to an attempted operation.
    #[error("Command failed: {0}")]
    Command(CommandError),

    /// Wrapper around `bson::de::Error`.
    #[error("{0}")]
    BsonDeserialization(#[from] crate::bson::de::Error),

    /// Wrapper around `bson::ser::Error`.
    #[error("{0}")]
    BsonSerialization(#[from] crate::bson::ser::Error),

    /// Wrapper around [`std::io::Error`].
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The server returned an invalid reply to an operation.
    #[error("The server returned an invalid reply: {message}")]
    #[non_exhaustive]
    InvalidResponse { message: String },

    /// No server could be selected for the operation.
    #[error("Server selection failed: {message}")]
    #[non_exhaustive]
    ServerSelection { message: String },

    /// An error occurred when trying to execute a write operation.
    #[error("Write operation failed: {0:?}")]
    Write(WriteFailure),
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl ErrorKind {
    /// Gets the code/message tuple from this error, if applicable. In the case of write errors,
    /// the code and message are taken from the write concern error, if there is one.
    pub(crate) fn code_and_message(&self) -> Option<(i32, &str)> {
        match self {
            ErrorKind::Command(ref cmd_err) => Some((cmd_err.code, cmd_err.message.as_str())),
            ErrorKind::Write(WriteFailure::WriteConcernError(ref wc_err)) => {
                Some((wc_err.code, wc_err.message.as_str()))
            }
            _ => None,
        }
    }
}

/// An error that occurred during a write operation that wasn't due to being unable to satisfy a
/// write concern.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteError {
    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    ///
    /// Note that the server will not return this in some cases, hence `code_name` being an
    /// `Option`.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default)]
    pub message: String,
}

/// An error that occurred due to not being able to satisfy a write concern.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteConcernError {
    /// Identifies the type of write concern error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default)]
    pub message: String,
}

/// An error that occurred when trying to execute a write operation.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum WriteFailure {
    /// An error that occurred due to not being able to satisfy a write concern.
    WriteConcernError(WriteConcernError),

    /// An error that occurred during a write operation that wasn't due to being unable to
    /// satisfy a write concern.
    WriteError(WriteError),
}

/// An error that occurred due to a database command failing.
#[derive(Clone, Debug, Deserialize)]
#[non_exhaustive]
pub struct CommandError {
    /// Identifies the type of error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default)]
    pub message: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "({}): {}", self.code_name, self.message)
    }
}

/// Checks that a response is `ok: 1`, converting it into an error via the canonical conversion if
/// it is not.
pub(crate) fn check_ok(response: &Document) -> Result<()> {
    match response.get("ok").and_then(bson_util::get_int) {
        Some(1) => Ok(()),
        Some(_) => Err(Error::from_command_response(response)),
        None => Err(Error::invalid_response(format!(
            "missing 'ok' field in server response: {}",
            response
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bson::doc;

    #[test]
    fn command_response_conversion_preserves_code_and_labels() {
        let response = doc! {
            "ok": 0,
            "code": 11600,
            "codeName": "InterruptedAtShutdown",
            "errmsg": "interrupted at shutdown",
            "errorLabels": ["RetryableWriteError"],
        };
        let error = Error::from_command_response(&response);
        match error.kind.as_ref() {
            ErrorKind::Command(cmd) => {
                assert_eq!(cmd.code, 11600);
                assert_eq!(cmd.code_name, "InterruptedAtShutdown");
            }
            other => panic!("expected command error, got {:?}", other),
        }
        assert!(error.contains_label(RETRYABLE_WRITE_ERROR));
        assert!(error.is_write_retryable());
    }

    #[test]
    fn check_ok_accepts_numeric_ok_types() {
        assert!(check_ok(&doc! { "ok": 1 }).is_ok());
        assert!(check_ok(&doc! { "ok": 1.0 }).is_ok());
        assert!(check_ok(&doc! { "ok": 0, "code": 2, "errmsg": "bad" }).is_err());
        assert!(check_ok(&doc! {}).is_err());
    }
}
