//! Operation types: each reifies one unit of work against a server, carrying its command
//! payload, typed options, and the static capability tags the executor consults.

pub(crate) mod delete;
pub(crate) mod list_databases;
pub(crate) mod run_command;
pub(crate) mod set_profiling_level;
pub(crate) mod update;
pub(crate) mod validate_collection;

use std::fmt::Debug;

use bitflags::bitflags;
use futures_core::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{
    bson::{self, Document},
    concern::WriteConcern,
    error::{self, Error, ErrorKind, Result, WriteConcernError, WriteError, WriteFailure},
    selection_criteria::SelectionCriteria,
    topology::Server,
};

pub(crate) use list_databases::ListDatabases;
pub(crate) use run_command::RunCommand;
pub(crate) use set_profiling_level::{GetProfilingLevel, SetProfilingLevel};
pub(crate) use validate_collection::ValidateCollection;

bitflags! {
    /// The closed set of capability tags attachable to an operation type. Aspects are bound at
    /// type-definition time via [`Operation::ASPECTS`] and are never mutated at runtime; the
    /// executor and retry layers above consult them to alter behavior.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Aspect: u8 {
        /// The operation is eligible for automatic retry, subject to the finer-grained
        /// [`Operation::can_retry_write`] check on compound forms.
        const RETRYABLE = 0b001;

        /// The operation modifies data and carries a write concern.
        const WRITE_OPERATION = 0b010;

        /// The operation requires server selection before execution.
        const EXECUTE_WITH_SELECTION = 0b100;
    }
}

/// A command to be sent to a server.
#[derive(Clone, Debug)]
pub struct Command {
    /// The name of the command.
    pub name: String,

    /// The database the command should be executed against.
    pub target_db: String,

    /// The command body.
    pub body: Document,
}

impl Command {
    pub(crate) fn new(name: impl Into<String>, target_db: impl Into<String>, body: Document) -> Self {
        Self {
            name: name.into(),
            target_db: target_db.into(),
            body,
        }
    }
}

/// A trait modeling the behavior of a server-side operation.
///
/// An operation is constructed per call, executed exactly once, and then discarded. `build`
/// produces the command from the operation's own state; it never mutates caller-supplied
/// options, which are copied and normalized at construction.
pub trait Operation {
    /// The output type of this operation.
    type O;

    /// The name of the server-side command associated with this operation.
    const NAME: &'static str;

    /// The capability tags of this operation type. Immutable registration-time metadata: an
    /// operation type lacking [`Aspect::RETRYABLE`] must never be offered for automatic retry
    /// even when [`Operation::can_retry_write`] would return `true`.
    const ASPECTS: Aspect;

    /// Returns the command that should be sent to the server as part of this operation.
    fn build(&self) -> Result<Command>;

    /// Interprets the server response to the command. Only called once the response has passed
    /// the uniform `ok` check in [`Operation::execute`].
    fn handle_response(&self, response: Document) -> Result<Self::O>;

    /// The write concern to use for this operation, if any.
    fn write_concern(&self) -> Option<&WriteConcern> {
        None
    }

    /// Criteria to use for selecting the server that this operation will be executed on.
    fn selection_criteria(&self) -> Option<&SelectionCriteria> {
        None
    }

    /// The per-call retry eligibility of this operation's payload. A pure function of the
    /// operation's sub-operation descriptors; consulted only when the type itself declares
    /// [`Aspect::RETRYABLE`].
    fn can_retry_write(&self) -> bool {
        true
    }

    /// Whether this operation type carries the given aspect.
    fn has_aspect(aspect: Aspect) -> bool
    where
        Self: Sized,
    {
        Self::ASPECTS.contains(aspect)
    }

    /// Whether a failed execution of this operation may safely be re-issued. The static aspect
    /// is authoritative; the dynamic predicate is the secondary check.
    fn is_retryable(&self) -> bool
    where
        Self: Sized,
    {
        Self::ASPECTS.contains(Aspect::RETRYABLE) && self.can_retry_write()
    }

    /// The name of the server-side command this operation issues.
    fn name(&self) -> &str {
        Self::NAME
    }

    /// Performs exactly one invocation of this operation against the given server, resolving
    /// with the operation's output or an error. Responses with `ok != 1` are converted into a
    /// normalized error before `handle_response` runs; transport errors pass through unmodified.
    fn execute<'a>(&'a self, server: &'a dyn Server) -> BoxFuture<'a, Result<Self::O>>
    where
        Self: Sized + Sync,
    {
        Box::pin(async move {
            let command = self.build()?;
            let response = server.run_command(command).await?;
            error::check_ok(&response)?;
            self.handle_response(response)
        })
    }
}

/// Appends a serializable struct to the input document. The serializable struct MUST serialize to
/// a document; otherwise, an error will be returned.
pub(crate) fn append_options<T: Serialize + Debug>(
    doc: &mut Document,
    options: Option<&T>,
) -> Result<()> {
    if let Some(options) = options {
        let options_doc = bson::to_document(options)?;
        doc.extend(options_doc);
    }
    Ok(())
}

/// Body of a write response: per-statement errors and the write concern error, if any.
#[derive(Debug, Deserialize)]
pub(crate) struct WriteResponseBody {
    pub(crate) n: u64,

    #[serde(rename = "nModified", default)]
    pub(crate) n_modified: u64,

    #[serde(default)]
    pub(crate) upserted: Option<Vec<Document>>,

    #[serde(rename = "writeErrors")]
    write_errors: Option<Vec<WriteError>>,

    #[serde(rename = "writeConcernError")]
    write_concern_error: Option<WriteConcernError>,

    #[serde(rename = "errorLabels")]
    labels: Option<Vec<String>>,
}

impl WriteResponseBody {
    pub(crate) fn from_response(response: &Document) -> Result<Self> {
        bson::from_bson(bson::Bson::Document(response.clone())).map_err(|e| {
            Error::invalid_response(format!("malformed write response: {}", e))
        })
    }

    /// Surfaces write errors and write concern errors carried by an `ok: 1` response.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(error) = self
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
        {
            return Err(Error::new(
                ErrorKind::Write(WriteFailure::WriteError(error.clone())),
                self.labels.clone(),
            ));
        }
        if let Some(ref wc_error) = self.write_concern_error {
            return Err(Error::new(
                ErrorKind::Write(WriteFailure::WriteConcernError(wc_error.clone())),
                self.labels.clone(),
            ));
        }
        Ok(())
    }
}
