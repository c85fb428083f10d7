//! Collection-level handles and the CRUD entry points that funnel into bulk-shaped write
//! operations.

use std::fmt;

use typed_builder::TypedBuilder;

use crate::{
    bson::Document,
    concern::WriteConcern,
    db::Database,
    error::Result,
    operation::{
        delete::{DeleteMany, DeleteOne, DeleteOptions},
        update::{UpdateMany, UpdateModel, UpdateOne, UpdateOptions},
    },
    results::{DeleteResult, UpdateResult},
    Client,
};

/// A struct modeling the canonical name for a collection on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// The name of the database associated with this namespace.
    pub db: String,

    /// The name of the collection this namespace corresponds to.
    pub coll: String,
}

impl Namespace {
    /// Construct a `Namespace` with the given database and collection.
    pub fn new(db: impl Into<String>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.coll)
    }
}

/// Specifies the options to a [`Collection`] handle.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct CollectionOptions {
    /// The default write concern for write operations on this collection. Overrides the owning
    /// database's default; a concern specified on the operation itself takes precedence over
    /// both.
    pub write_concern: Option<WriteConcern>,
}

/// `Collection` is the client-side abstraction of a collection on the server. CRUD calls on it
/// are reified into operations and handed to the executor. Cheap to clone.
#[derive(Clone)]
pub struct Collection {
    db: Database,
    name: String,
    write_concern: Option<WriteConcern>,
}

impl Collection {
    pub(crate) fn new(db: Database, name: &str, options: CollectionOptions) -> Self {
        let write_concern = options
            .write_concern
            .or_else(|| db.write_concern().cloned());
        Self {
            db,
            name: name.to_string(),
            write_concern,
        }
    }

    /// Gets the name of the `Collection`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the namespace of the `Collection`, i.e. `<db name>.<coll name>`.
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.db.name(), self.name.clone())
    }

    /// Gets the default write concern the `Collection` applies to writes that do not specify
    /// their own.
    pub fn write_concern(&self) -> Option<&WriteConcern> {
        self.write_concern.as_ref()
    }

    fn client(&self) -> &Client {
        self.db.client()
    }

    /// Updates the first document matching `filter` with the given atomic update operators.
    ///
    /// Fails synchronously, before any network interaction, if `update` is not made of update
    /// modifiers.
    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateResult> {
        let model = UpdateModel::update(filter, update, None)?;
        let options = self.resolve_update_concern(options);
        let op = UpdateOne::new(self.namespace(), model, options)?;
        self.client().execute_operation(op).await
    }

    /// Updates every document matching `filter` with the given atomic update operators. Never
    /// eligible for automatic retry.
    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateResult> {
        let model = UpdateModel::update(filter, update, None)?;
        let options = self.resolve_update_concern(options);
        let op = UpdateMany::new(self.namespace(), model, options)?;
        self.client().execute_operation(op).await
    }

    /// Replaces the first document matching `filter` with `replacement`.
    ///
    /// Fails synchronously if `replacement` contains update modifiers.
    pub async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateResult> {
        let model = UpdateModel::replacement(filter, replacement)?;
        let options = self.resolve_update_concern(options);
        let op = UpdateOne::new(self.namespace(), model, options)?;
        self.client().execute_operation(op).await
    }

    /// Deletes the first document matching `filter`.
    pub async fn delete_one(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> Result<DeleteResult> {
        let options = self.resolve_delete_concern(options);
        let op = DeleteOne::new(self.namespace(), filter, options)?;
        self.client().execute_operation(op).await
    }

    /// Deletes every document matching `filter` (or a single one, if
    /// [`DeleteOptions::single`] is set). Never eligible for automatic retry.
    pub async fn delete_many(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
    ) -> Result<DeleteResult> {
        let options = self.resolve_delete_concern(options);
        let op = DeleteMany::new(self.namespace(), filter, options)?;
        self.client().execute_operation(op).await
    }

    /// Callback form of [`Collection::update_one`]: delivers the outcome to `callback` instead
    /// of a future. The callback is invoked exactly once and never synchronously; a rejected
    /// update document arrives through it like any other failure.
    pub fn update_one_with_callback<F>(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
        callback: F,
    ) where
        F: FnOnce(Result<UpdateResult>) + Send + 'static,
    {
        let options = self.resolve_update_concern(options);
        let op = UpdateModel::update(filter, update, None)
            .and_then(|model| UpdateOne::new(self.namespace(), model, options));
        self.client().execute_pending_operation_with_callback(op, callback);
    }

    /// Callback form of [`Collection::update_many`].
    pub fn update_many_with_callback<F>(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
        callback: F,
    ) where
        F: FnOnce(Result<UpdateResult>) + Send + 'static,
    {
        let options = self.resolve_update_concern(options);
        let op = UpdateModel::update(filter, update, None)
            .and_then(|model| UpdateMany::new(self.namespace(), model, options));
        self.client().execute_pending_operation_with_callback(op, callback);
    }

    /// Callback form of [`Collection::replace_one`].
    pub fn replace_one_with_callback<F>(
        &self,
        filter: Document,
        replacement: Document,
        options: Option<UpdateOptions>,
        callback: F,
    ) where
        F: FnOnce(Result<UpdateResult>) + Send + 'static,
    {
        let options = self.resolve_update_concern(options);
        let op = UpdateModel::replacement(filter, replacement)
            .and_then(|model| UpdateOne::new(self.namespace(), model, options));
        self.client().execute_pending_operation_with_callback(op, callback);
    }

    /// Callback form of [`Collection::delete_one`].
    pub fn delete_one_with_callback<F>(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
        callback: F,
    ) where
        F: FnOnce(Result<DeleteResult>) + Send + 'static,
    {
        let options = self.resolve_delete_concern(options);
        let op = DeleteOne::new(self.namespace(), filter, options);
        self.client().execute_pending_operation_with_callback(op, callback);
    }

    /// Callback form of [`Collection::delete_many`].
    pub fn delete_many_with_callback<F>(
        &self,
        filter: Document,
        options: Option<DeleteOptions>,
        callback: F,
    ) where
        F: FnOnce(Result<DeleteResult>) + Send + 'static,
    {
        let options = self.resolve_delete_concern(options);
        let op = DeleteMany::new(self.namespace(), filter, options);
        self.client().execute_pending_operation_with_callback(op, callback);
    }

    // Write-concern inheritance happens on a locally owned copy of the options; the caller's
    // value is moved in and never observed again.
    fn resolve_update_concern(&self, options: Option<UpdateOptions>) -> Option<UpdateOptions> {
        let mut options = options.unwrap_or_default();
        options.write_concern =
            WriteConcern::resolve(options.write_concern.as_ref(), self.write_concern());
        Some(options)
    }

    fn resolve_delete_concern(&self, options: Option<DeleteOptions>) -> Option<DeleteOptions> {
        let mut options = options.unwrap_or_default();
        options.write_concern =
            WriteConcern::resolve(options.write_concern.as_ref(), self.write_concern());
        Some(options)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{bson::doc, test::client_with_responses};
    use pretty_assertions::assert_eq;

    fn write_ok() -> Document {
        doc! { "ok": 1, "n": 1, "nModified": 1 }
    }

    #[tokio::test]
    async fn update_inherits_database_write_concern() {
        let (client, server) = client_with_responses(vec![Ok(write_ok())]);
        let db = client.database_with_options(
            "test_db",
            crate::db::DatabaseOptions::builder()
                .write_concern(WriteConcern::nodes(2))
                .build(),
        );
        let coll = db.collection("users");
        coll.update_one(doc! { "x": 1 }, doc! { "$set": { "y": 2 } }, None)
            .await
            .unwrap();
        let sent = &server.commands()[0].body;
        assert_eq!(sent.get_document("writeConcern").unwrap(), &doc! { "w": 2 });
    }

    #[tokio::test]
    async fn explicit_write_concern_beats_inherited_default() {
        let (client, server) = client_with_responses(vec![Ok(write_ok())]);
        let db = client.database_with_options(
            "test_db",
            crate::db::DatabaseOptions::builder()
                .write_concern(WriteConcern::nodes(2))
                .build(),
        );
        let coll = db.collection("users");
        let options = UpdateOptions::builder()
            .write_concern(WriteConcern::majority())
            .build();
        coll.update_one(doc! {}, doc! { "$inc": { "n": 1 } }, Some(options))
            .await
            .unwrap();
        let sent = &server.commands()[0].body;
        assert_eq!(
            sent.get_document("writeConcern").unwrap(),
            &doc! { "w": "majority" }
        );
    }

    #[tokio::test]
    async fn collection_write_concern_overrides_database_default() {
        let (client, server) = client_with_responses(vec![Ok(doc! { "ok": 1, "n": 1 })]);
        let db = client.database_with_options(
            "test_db",
            crate::db::DatabaseOptions::builder()
                .write_concern(WriteConcern::nodes(2))
                .build(),
        );
        let coll = db.collection_with_options(
            "users",
            CollectionOptions::builder()
                .write_concern(WriteConcern::nodes(3))
                .build(),
        );
        coll.delete_one(doc! { "x": 1 }, None).await.unwrap();
        let sent = &server.commands()[0].body;
        assert_eq!(sent.get_document("writeConcern").unwrap(), &doc! { "w": 3 });
    }

    #[tokio::test]
    async fn invalid_update_document_never_reaches_the_server() {
        let (client, server) = client_with_responses(vec![]);
        let coll = client.database("test_db").collection("users");
        let err = coll
            .update_one(doc! {}, doc! { "y": 2 }, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.kind.as_ref(),
            crate::error::ErrorKind::InvalidArgument { .. }
        ));
        assert!(server.commands().is_empty());
    }

    #[tokio::test]
    async fn callback_form_delivers_crud_results() {
        let (client, server) = client_with_responses(vec![Ok(write_ok())]);
        let coll = client.database("test_db").collection("users");

        let (tx, rx) = tokio::sync::oneshot::channel();
        coll.update_one_with_callback(
            doc! { "x": 1 },
            doc! { "$set": { "y": 2 } },
            None,
            move |result| {
                let _ = tx.send(result);
            },
        );
        let result = rx.await.unwrap().unwrap();
        assert_eq!(result.modified_count, 1);
        assert_eq!(server.commands()[0].name, "update");
    }

    #[tokio::test]
    async fn callback_form_delivers_validation_failures_asynchronously() {
        let (client, server) = client_with_responses(vec![]);
        let coll = client.database("test_db").collection("users");

        let (tx, rx) = tokio::sync::oneshot::channel();
        coll.update_one_with_callback(doc! {}, doc! { "y": 2 }, None, move |result| {
            let _ = tx.send(result);
        });
        // The submitting call has returned without the callback having fired.
        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(
            err.kind.as_ref(),
            crate::error::ErrorKind::InvalidArgument { .. }
        ));
        assert!(server.commands().is_empty());
    }

    #[tokio::test]
    async fn delete_many_sends_no_limit() {
        let (client, server) = client_with_responses(vec![Ok(doc! { "ok": 1, "n": 7 })]);
        let coll = client.database("test_db").collection("users");
        let result = coll.delete_many(doc! { "stale": true }, None).await.unwrap();
        assert_eq!(result.deleted_count, 7);
        let commands = server.commands();
        let deletes = commands[0].body.get_array("deletes").unwrap();
        assert_eq!(
            deletes[0],
            crate::bson::Bson::Document(doc! { "q": { "stale": true }, "limit": 0u32 })
        );
    }
}
