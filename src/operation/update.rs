use serde::Serialize;
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::{doc, Bson, Document},
    bson_util,
    coll::Namespace,
    collation::Collation,
    concern::WriteConcern,
    error::Result,
    operation::{append_options, Aspect, Command, Operation, WriteResponseBody},
    results::UpdateResult,
};

/// A single update descriptor within a bulk-shaped update command. The effective `multi` value is
/// normalized by the type-specific constructors before the descriptor is placed in the array
/// handed to execution.
#[derive(Clone, Debug)]
pub struct UpdateModel {
    filter: Document,
    update: Document,
    multi: Option<bool>,
}

impl UpdateModel {
    /// Creates a descriptor applying atomic update operators. Fails fast if the update document
    /// does not consist of update modifiers; this is a caller programming error, raised before
    /// any network interaction.
    pub fn update(filter: Document, update: Document, multi: Option<bool>) -> Result<Self> {
        bson_util::update_document_check(&update)?;
        Ok(Self {
            filter,
            update,
            multi,
        })
    }

    /// Creates a whole-document replacement descriptor. Fails fast if the replacement contains
    /// update modifiers. Replacements are single-document by definition.
    pub fn replacement(filter: Document, replacement: Document) -> Result<Self> {
        bson_util::replacement_document_check(&replacement)?;
        Ok(Self {
            filter,
            update: replacement,
            multi: None,
        })
    }

    pub(crate) fn multi(&self) -> Option<bool> {
        self.multi
    }

    pub(crate) fn with_multi(mut self, multi: bool) -> Self {
        self.multi = Some(multi);
        self
    }

    fn to_entry(&self) -> Document {
        let mut entry = doc! {
            "q": self.filter.clone(),
            "u": self.update.clone(),
        };
        if let Some(multi) = self.multi {
            entry.insert("multi", multi);
        }
        entry
    }
}

/// Specifies the options to an update operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, TypedBuilder, Serialize)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct UpdateOptions {
    /// Insert a document if no matching document is found.
    #[serde(skip)]
    pub upsert: Option<bool>,

    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// The collation to use for filter comparisons. Applied to each update statement rather than
    /// the command as a whole.
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

/// The compound, bulk-shaped update operation: an ordered array of update descriptors executed
/// as one `update` command.
#[derive(Debug)]
pub(crate) struct Update {
    ns: Namespace,
    updates: Vec<UpdateModel>,
    options: Option<UpdateOptions>,
}

impl Update {
    pub(crate) fn new(
        ns: Namespace,
        updates: Vec<UpdateModel>,
        options: Option<UpdateOptions>,
    ) -> Result<Self> {
        if let Some(write_concern) = options.as_ref().and_then(|o| o.write_concern.as_ref()) {
            write_concern.validate()?;
        }
        Ok(Self {
            ns,
            updates,
            options,
        })
    }
}

impl Operation for Update {
    type O = UpdateResult;

    const NAME: &'static str = "update";

    const ASPECTS: Aspect = Aspect::RETRYABLE
        .union(Aspect::WRITE_OPERATION)
        .union(Aspect::EXECUTE_WITH_SELECTION);

    fn build(&self) -> Result<Command> {
        let mut updates = Vec::with_capacity(self.updates.len());
        for model in &self.updates {
            let mut entry = model.to_entry();
            if let Some(upsert) = self.options.as_ref().and_then(|o| o.upsert) {
                entry.insert("upsert", upsert);
            }
            if let Some(collation) = self.options.as_ref().and_then(|o| o.collation.as_ref()) {
                entry.insert("collation", bson::to_document(collation)?);
            }
            updates.push(Bson::Document(entry));
        }

        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "updates": updates,
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

        let modified_count = body.n_modified;
        let upserted_id = body
            .upserted
            .as_ref()
            .and_then(|v| v.first())
            .and_then(|doc| doc.get("_id"))
            .cloned();

        let matched_count = if upserted_id.is_some() { 0 } else { body.n };

        Ok(UpdateResult {
            matched_count,
            modified_count,
            upserted_id,
        })
    }

    fn write_concern(&self) -> Option<&WriteConcern> {
        self.options
            .as_ref()
            .and_then(|opts| opts.write_concern.as_ref())
    }

    /// Retryable iff no descriptor asks for multi-document semantics: a retry after a partial
    /// failure could re-apply a multi update to documents already updated, and arbitrary update
    /// operators carry no idempotency guarantee.
    fn can_retry_write(&self) -> bool {
        self.updates.iter().all(|model| model.multi() != Some(true))
    }
}

/// A single-document update. Forces `multi: false` at construction, so the per-call predicate is
/// trivially satisfied; the type declares [`Aspect::RETRYABLE`].
#[derive(Debug)]
pub(crate) struct UpdateOne(Update);

impl UpdateOne {
    pub(crate) fn new(
        ns: Namespace,
        model: UpdateModel,
        options: Option<UpdateOptions>,
    ) -> Result<Self> {
        Update::new(ns, vec![model.with_multi(false)], options).map(Self)
    }
}

impl Operation for UpdateOne {
    type O = UpdateResult;

    const NAME: &'static str = Update::NAME;

    const ASPECTS: Aspect = Update::ASPECTS;

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

/// A multi-document update. Forces `multi: true` at construction and declares no
/// [`Aspect::RETRYABLE`], short-circuiting retry regardless of the per-call predicate.
#[derive(Debug)]
pub(crate) struct UpdateMany(Update);

impl UpdateMany {
    pub(crate) fn new(
        ns: Namespace,
        model: UpdateModel,
        options: Option<UpdateOptions>,
    ) -> Result<Self> {
        Update::new(ns, vec![model.with_multi(true)], options).map(Self)
    }
}

impl Operation for UpdateMany {
    type O = UpdateResult;

    const NAME: &'static str = Update::NAME;

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

#[cfg(test)]
mod test {
    use super::*;
    use crate::operation::Operation;
    use pretty_assertions::assert_eq;

    fn ns() -> Namespace {
        Namespace::new("test_db", "test_coll")
    }

    fn update_op(multis: &[Option<bool>]) -> Update {
        let updates = multis
            .iter()
            .map(|multi| {
                UpdateModel::update(doc! { "x": 1 }, doc! { "$set": { "y": 2 } }, *multi).unwrap()
            })
            .collect();
        Update::new(ns(), updates, None).unwrap()
    }

    #[test]
    fn retry_eligibility_over_multi_flags() {
        assert!(update_op(&[Some(false)]).can_retry_write());
        assert!(!update_op(&[Some(true)]).can_retry_write());
        assert!(update_op(&[None, Some(false)]).can_retry_write());
        assert!(!update_op(&[None, Some(true)]).can_retry_write());
        assert!(update_op(&[]).can_retry_write());
    }

    #[test]
    fn one_is_retryable_many_is_not() {
        let model =
            UpdateModel::update(doc! { "x": 1 }, doc! { "$inc": { "x": 1 } }, None).unwrap();
        let one = UpdateOne::new(ns(), model.clone(), None).unwrap();
        assert!(one.is_retryable());

        let many = UpdateMany::new(ns(), model, None).unwrap();
        // The dynamic predicate is false here too, but the missing static aspect alone is
        // sufficient to block retry.
        assert!(!many.is_retryable());
        assert!(!many.can_retry_write());
    }

    #[test]
    fn update_document_without_operators_is_rejected() {
        let err = UpdateModel::update(doc! {}, doc! { "x": 1 }, None).unwrap_err();
        assert!(matches!(
            err.kind.as_ref(),
            crate::error::ErrorKind::InvalidArgument { .. }
        ));
    }

    #[test]
    fn replacement_with_operators_is_rejected() {
        assert!(UpdateModel::replacement(doc! {}, doc! { "$set": { "x": 1 } }).is_err());
        assert!(UpdateModel::replacement(doc! {}, doc! { "x": 1 }).is_ok());
    }

    #[test]
    fn builds_update_command() {
        let model =
            UpdateModel::update(doc! { "x": 1 }, doc! { "$set": { "y": 2 } }, None).unwrap();
        let op = UpdateOne::new(
            ns(),
            model,
            Some(UpdateOptions::builder().upsert(true).build()),
        )
        .unwrap();
        let cmd = op.build().unwrap();
        assert_eq!(cmd.target_db, "test_db");
        assert_eq!(
            cmd.body,
            doc! {
                "update": "test_coll",
                "updates": [
                    { "q": { "x": 1 }, "u": { "$set": { "y": 2 } }, "multi": false, "upsert": true }
                ],
                "ordered": true,
            }
        );
    }

    #[test]
    fn handles_upserted_response() {
        let op = update_op(&[None]);
        let result = op
            .handle_response(doc! {
                "ok": 1,
                "n": 1,
                "nModified": 0,
                "upserted": [{ "index": 0, "_id": 42 }],
            })
            .unwrap();
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.modified_count, 0);
        assert_eq!(result.upserted_id, Some(Bson::Int32(42)));
    }
}
