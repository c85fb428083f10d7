//! Contains the types of results returned by CRUD and admin operations.

use serde::{Deserialize, Serialize};

use crate::bson::Bson;

/// The result of an update operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UpdateResult {
    /// The number of documents that matched the filter.
    pub matched_count: u64,

    /// The number of documents that were modified by the operation.
    pub modified_count: u64,

    /// The `_id` field of the upserted document, if an upsert took place.
    pub upserted_id: Option<Bson>,
}

/// The result of a delete operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DeleteResult {
    /// The number of documents deleted by the operation.
    pub deleted_count: u64,
}

/// Describes a database in the server, as reported by `listDatabases`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DatabaseSpecification {
    /// The name of the database.
    pub name: String,

    /// The amount of disk space in bytes that is consumed by the database.
    #[serde(default)]
    pub size_on_disk: u64,

    /// Whether the database has any data.
    #[serde(default)]
    pub empty: bool,
}
