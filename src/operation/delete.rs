use serde::Serialize;
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::{doc, Bson, Document},
    coll::Namespace,
    collation::Collation,
    concern::WriteConcern,
    error::Result,
    operation::{append_options, Aspect, Command, Operation, WriteResponseBody},
    results::DeleteResult,
};

/// A single delete descriptor within a bulk-shaped delete command. A `limit` of 0 conventionally
/// means "no limit" (delete-many semantics); an absent limit is serialized the same way on the
/// wire but is distinguished for retry classification.
#[derive(Clone, Debug)]
pub struct DeleteModel {
    filter: Document,
    limit: Option<u32>,
}

impl DeleteModel {
    /// Constructs a descriptor matching `filter`, deleting at most `limit` documents. A limit of
    /// `None` leaves the count unconstrained.
    pub fn new(filter: Document, limit: Option<u32>) -> Self {
        Self { filter, limit }
    }

    pub(crate) fn limit(&self) -> Option<u32> {
        self.limit
    }

    fn to_entry(&self) -> Document {
        doc! {
            "q": self.filter.clone(),
            "limit": self.limit.unwrap_or(0),
        }
    }
}

/// Specifies the options to a delete operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, TypedBuilder, Serialize)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct DeleteOptions {
    /// Restrict the deletion to a single document even on a delete-many call. This is a
    /// deliberate affordance carried over from older drivers: setting it on
    /// [`Collection::delete_many`](crate::Collection::delete_many) turns the call into a
    /// single-document delete. Since eligibility is computed from the effective descriptors,
    /// the per-call retry predicate then holds, though the delete-many operation type still
    /// lacks the static retryable aspect, which remains authoritative.
    #[serde(skip)]
    pub single: Option<bool>,

    /// The collation to use for filter comparisons. Applied to each delete statement rather
    /// than the command as a whole.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// The write concern for the operation.
    #[serde(skip)]
    pub write_concern: Option<WriteConcern>,

    /// The maximum amount of time to allow the operation to run.
    #[serde(
        rename = "maxTimeMS",
        serialize_with = "crate::serde_util::serialize_duration_option_as_int_millis"
    )]
    pub max_time: Option<std::time::Duration>,
}

/// The compound, bulk-shaped delete operation: an ordered array of delete descriptors executed
/// as one `delete` command.
#[derive(Debug)]
pub(crate) struct Delete {
    ns: Namespace,
    deletes: Vec<DeleteModel>,
    options: Option<DeleteOptions>,
}

impl Delete {
    pub(crate) fn new(
        ns: Namespace,
        deletes: Vec<DeleteModel>,
        options: Option<DeleteOptions>,
    ) -> Result<Self> {
        if let Some(write_concern) = options.as_ref().and_then(|o| o.write_concern.as_ref()) {
            write_concern.validate()?;
        }
        Ok(Self {
            ns,
            deletes,
            options,
        })
    }
}

impl Operation for Delete {
    type O = DeleteResult;

    const NAME: &'static str = "delete";

    const ASPECTS: Aspect = Aspect::RETRYABLE
        .union(Aspect::WRITE_OPERATION)
        .union(Aspect::EXECUTE_WITH_SELECTION);

    fn build(&self) -> Result<Command> {
        let mut deletes = Vec::with_capacity(self.deletes.len());
        for model in &self.deletes {
            let mut entry = model.to_entry();
            if let Some(collation) = self.options.as_ref().and_then(|o| o.collation.as_ref()) {
                entry.insert("collation", bson::to_document(collation)?);
            }
            deletes.push(Bson::Document(entry));
        }

        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "deletes": deletes,
            "ordered": true,
        };
        append_options(&mut body, self.options.as_ref())?;
        if let Some(write_concern) = self.write_concern().filter(|wc| !wc.is_empty()) {
            body.insert("writeConcern", bson::to_document(write_concern)?);
        }

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, response: Document) -> Result<Self::O> {
        let body = WriteResponseBody::from_response(&response)?;
        body.validate()?;
        Ok(DeleteResult {
            deleted_count: body.n,
        })
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.write_concern.as_ref())
    }

    /// Retryable iff no descriptor has an explicit limit of 0: a retry of an unbounded delete
    /// after a partial failure could re-apply to documents matched anew, while a positive limit
    /// bounds the operation to a small number of documents and is safe to re-issue.
    fn can_retry_write(&self) -> bool {
        self.deletes.iter().all(|model| model.limit() != Some(0))
    }
}

/// A single-document delete. Forces `limit: 1` at construction, so the per-call predicate is
/// trivially satisfied; the type declares [`Aspect::RETRYABLE`].
#[derive(Debug)]
pub(crate) struct DeleteOne(Delete);

impl DeleteOne {
    pub(crate) fn new(
        ns: Namespace,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> Result<Self> {
        Delete::new(ns, vec![DeleteModel::new(filter, Some(1))], options).map(Self)
    }
}

impl Operation for DeleteOne {
    type O = DeleteResult;

    const NAME: &'static str = Delete::NAME;

    const ASPECTS: Aspect = Delete::ASPECTS;

    fn build(&self) -> Result<Command> {
        self.0.build()
    }

    fn handle_response(&self, response: Document) -> Result<Self::O> {
        self.0.handle_response(response)
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.0.write_concern()
    }

    fn can_retry_write(&self) -> bool {
        self.0.can_retry_write()
    }
}

/// A multi-document delete. Uses `limit: 0` (no limit) unless the
/// [`single`](DeleteOptions::single) affordance narrows it to one document. Declares no
/// [`Aspect::RETRYABLE`], short-circuiting retry regardless of the per-call predicate.
#[derive(Debug)]
pub(crate) struct DeleteMany(Delete);

impl DeleteMany {
    pub(crate) fn new(
        ns: Namespace,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> Result<Self> {
        let limit = match options.as_ref().and_then(|o| o.single) {
            Some(true) => 1,
            _ => 0,
        };
        Delete::new(ns, vec![DeleteModel::new(filter, Some(limit))], options).map(Self)
    }
}

impl Operation for DeleteMany {
    type O = DeleteResult;

    const NAME: &'static str = Delete::NAME;

    const ASPECTS: Aspect = Aspect::WRITE_OPERATION.union(Aspect::EXECUTE_WITH_SELECTION);

    fn build(&self) -> Result<Command> {
        self.0.build()
    }

    fn handle_response(&self, response: Document) -> Result<Self::O> {
        self.0.handle_response(response)
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.0.write_concern()
    }

    fn can_retry_write(&self) -> bool {
        self.0.can_retry_write()
    }
}
