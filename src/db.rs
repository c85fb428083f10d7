//! Database-level handles.

use typed_builder::TypedBuilder;

use crate::{
    bson::Document,
    coll::{Collection, CollectionOptions},
    concern::WriteConcern,
    error::Result,
    operation::RunCommand,
    selection_criteria::SelectionCriteria,
    Client,
};

/// Specifies the options to a [`Database`] handle.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct DatabaseOptions {
    /// The default write concern for write operations on this database's collections. A concern
    /// specified on the operation itself takes precedence.
    pub write_concern: Option<WriteConcern>,
}

/// `Database` is the client-side abstraction of a database on the server. It can be used to run
/// database-level commands or to obtain handles to specific collections. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    client: Client,
    name: String,
    write_concern: Option<WriteConcern>,
}

impl Database {
    pub(crate) fn new(client: Client, name: &str, options: DatabaseOptions) -> Self {
        Self {
            client,
            name: name.to_string(),
            write_concern: options.write_concern,
        }
    }

    /// Gets the name of the `Database`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the default write concern of the `Database`, readable by write-concern resolution.
    pub fn write_concern(&self) -> Option<&WriteConcern> {
        self.write_concern.as_ref()
    }

    /// Gets the `Client` this `Database` was created from.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Gets a handle to a collection in this database. The collection inherits this database's
    /// default write concern.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.clone(), name, Default::default())
    }

    /// Gets a handle to a collection in this database with the given options.
    pub fn collection_with_options(&self, name: &str, options: CollectionOptions) -> Collection {
        Collection::new(self.clone(), name, options)
    }

    /// Runs a command against this database, resolving with the raw response document. Fails
    /// before dispatch if the command document is empty.
    pub async fn run_command(&self, command: Document) -> Result<Document> {
        self.run_command_with_criteria(command, None).await
    }

    /// Callback form of [`Database::run_command`]: delivers the raw response document to
    /// `callback` instead of a future. The callback is invoked exactly once and never
    /// synchronously; an empty command document arrives through it like any other failure.
    pub fn run_command_with_callback<F>(&self, command: Document, callback: F)
    where
        F: FnOnce(Result<Document>) + Send + 'static,
    {
        let op = RunCommand::new(self.name.clone(), command, None);
        self.client.execute_pending_operation_with_callback(op, callback);
    }

    /// Runs a command against this database on a server matching the given criteria.
    pub async fn run_command_with_criteria(
        &self,
        command: Document,
        criteria: Option<SelectionCriteria>,
    ) -> Result<Document> {
        let op = RunCommand::new(self.name.clone(), command, criteria)?;
        self.client.execute_operation(op).await
    }
}

#[cfg(test)]
mod test {
    use crate::{bson::doc, test::client_with_responses};

    #[tokio::test]
    async fn run_command_targets_this_database() {
        let (client, server) = client_with_responses(vec![Ok(doc! { "ok": 1 })]);
        let db = client.database("reporting");
        db.run_command(doc! { "collStats": "events" }).await.unwrap();
        assert_eq!(server.commands()[0].target_db, "reporting");
        assert_eq!(server.commands()[0].body, doc! { "collStats": "events" });
    }

    #[tokio::test]
    async fn callback_form_delivers_empty_command_failure() {
        let (client, server) = client_with_responses(vec![]);
        let db = client.database("test_db");
        let (tx, rx) = tokio::sync::oneshot::channel();
        db.run_command_with_callback(doc! {}, move |result| {
            let _ = tx.send(result);
        });
        assert!(rx.await.unwrap().is_err());
        assert!(server.commands().is_empty());
    }

    #[tokio::test]
    async fn empty_command_fails_before_dispatch() {
        let (client, server) = client_with_responses(vec![]);
        let db = client.database("test_db");
        assert!(db.run_command(doc! {}).await.is_err());
        assert!(server.commands().is_empty());
    }
}
