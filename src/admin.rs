//! The admin command facade: named server administration commands composed from the generic
//! executor and the operation types.

use crate::{
    bson::{doc, Document},
    error::Result,
    operation::{
        list_databases::ListDatabasesOptions,
        set_profiling_level::ProfilingLevel,
        validate_collection::ValidateCollectionOptions,
        GetProfilingLevel,
        ListDatabases,
        RunCommand,
        SetProfilingLevel,
        ValidateCollection,
    },
    results::DatabaseSpecification,
    Client,
};

/// A handle for server administration commands, run against the `admin` database.
#[derive(Clone)]
pub struct Admin {
    client: Client,
}

impl Admin {
    const DB_NAME: &'static str = "admin";

    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Retrieves the server's status document.
    pub async fn server_status(&self) -> Result<Document> {
        let op = RunCommand::new(Self::DB_NAME, doc! { "serverStatus": 1 }, None)?;
        self.client.execute_operation(op).await
    }

    /// Pings the server.
    pub async fn ping(&self) -> Result<Document> {
        let op = RunCommand::new(Self::DB_NAME, doc! { "ping": 1 }, None)?;
        self.client.execute_operation(op).await
    }

    /// Retrieves the replica set status.
    pub async fn repl_set_get_status(&self) -> Result<Document> {
        let op = RunCommand::new(Self::DB_NAME, doc! { "replSetGetStatus": 1 }, None)?;
        self.client.execute_operation(op).await
    }

    /// Lists the databases present on the server.
    pub async fn list_databases(
        &self,
        options: Option<ListDatabasesOptions>,
    ) -> Result<Vec<DatabaseSpecification>> {
        let op = ListDatabases::new(false, options);
        self.client.execute_operation(op).await
    }

    /// Lists the names of the databases present on the server.
    pub async fn list_database_names(
        &self,
        options: Option<ListDatabasesOptions>,
    ) -> Result<Vec<String>> {
        let op = ListDatabases::new(true, options);
        let databases = self.client.execute_operation(op).await?;
        Ok(databases.into_iter().map(|spec| spec.name).collect())
    }

    /// Sets the database profiling level for the given database, resolving with the symbolic
    /// level that was set.
    pub async fn set_profiling_level(
        &self,
        db_name: &str,
        level: ProfilingLevel,
    ) -> Result<ProfilingLevel> {
        let op = SetProfilingLevel::new(db_name, level);
        self.client.execute_operation(op).await
    }

    /// Reads back the current database profiling level for the given database.
    pub async fn profiling_level(&self, db_name: &str) -> Result<ProfilingLevel> {
        let op = GetProfilingLevel::new(db_name);
        self.client.execute_operation(op).await
    }

    /// Validates the contents of the named collection, resolving with the server's validation
    /// report. The response is accepted only if it passes the ordered structural checks; a
    /// `valid: false` report fails even when the command itself succeeded.
    pub async fn validate_collection(
        &self,
        db_name: &str,
        coll_name: &str,
        options: Option<ValidateCollectionOptions>,
    ) -> Result<Document> {
        let op = ValidateCollection::new(db_name, coll_name, options);
        self.client.execute_operation(op).await
    }

    /// Callback form of [`Admin::server_status`]: delivers the outcome to `callback` instead of
    /// a future. As with every callback variant, the callback is invoked exactly once and never
    /// synchronously.
    pub fn server_status_with_callback<F>(&self, callback: F)
    where
        F: FnOnce(Result<Document>) + Send + 'static,
    {
        let op = RunCommand::new(Self::DB_NAME, doc! { "serverStatus": 1 }, None);
        self.client.execute_pending_operation_with_callback(op, callback);
    }

    /// Callback form of [`Admin::ping`].
    pub fn ping_with_callback<F>(&self, callback: F)
    where
        F: FnOnce(Result<Document>) + Send + 'static,
    {
        let op = RunCommand::new(Self::DB_NAME, doc! { "ping": 1 }, None);
        self.client.execute_pending_operation_with_callback(op, callback);
    }

    /// Callback form of [`Admin::repl_set_get_status`].
    pub fn repl_set_get_status_with_callback<F>(&self, callback: F)
    where
        F: FnOnce(Result<Document>) + Send + 'static,
    {
        let op = RunCommand::new(Self::DB_NAME, doc! { "replSetGetStatus": 1 }, None);
        self.client.execute_pending_operation_with_callback(op, callback);
    }

    /// Callback form of [`Admin::list_databases`].
    pub fn list_databases_with_callback<F>(&self, options: Option<ListDatabasesOptions>, callback: F)
    where
        F: FnOnce(Result<Vec<DatabaseSpecification>>) + Send + 'static,
    {
        let op = ListDatabases::new(false, options);
        self.client.execute_operation_with_callback(op, callback);
    }

    /// Callback form of [`Admin::list_database_names`].
    pub fn list_database_names_with_callback<F>(
        &self,
        options: Option<ListDatabasesOptions>,
        callback: F,
    ) where
        F: FnOnce(Result<Vec<String>>) + Send + 'static,
    {
        let op = ListDatabases::new(true, options);
        self.client.execute_operation_with_callback(op, move |result| {
            callback(result.map(|dbs| dbs.into_iter().map(|spec| spec.name).collect()))
        });
    }

    /// Callback form of [`Admin::set_profiling_level`].
    pub fn set_profiling_level_with_callback<F>(
        &self,
        db_name: &str,
        level: ProfilingLevel,
        callback: F,
    ) where
        F: FnOnce(Result<ProfilingLevel>) + Send + 'static,
    {
        let op = SetProfilingLevel::new(db_name, level);
        self.client.execute_operation_with_callback(op, callback);
    }

    /// Callback form of [`Admin::profiling_level`].
    pub fn profiling_level_with_callback<F>(&self, db_name: &str, callback: F)
    where
        F: FnOnce(Result<ProfilingLevel>) + Send + 'static,
    {
        let op = GetProfilingLevel::new(db_name);
        self.client.execute_operation_with_callback(op, callback);
    }

    /// Callback form of [`Admin::validate_collection`].
    pub fn validate_collection_with_callback<F>(
        &self,
        db_name: &str,
        coll_name: &str,
        options: Option<ValidateCollectionOptions>,
        callback: F,
    ) where
        F: FnOnce(Result<Document>) + Send + 'static,
    {
        let op = ValidateCollection::new(db_name, coll_name, options);
        self.client.execute_operation_with_callback(op, callback);
    }
}
