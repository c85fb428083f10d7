//! The operation execution and retry-classification core of a document database driver.
//!
//! This crate sits between a driver's public API (collections, databases, the admin facade) and
//! the transport layer that actually talks to a server. Every user-facing call is reified into
//! an operation: a value carrying its command payload, its typed options, and a static set of
//! capability tags ([`operation::Aspect`]s) declared by its type. A generic executor on
//! [`Client`] resolves a server from the [`topology::Topology`] collaborator, runs the
//! operation exactly once, and normalizes results and errors uniformly. Outcomes are delivered
//! either through a future or through a callback, with identical observable behavior.
//!
//! Retry classification is exposed, not enacted: bulk-shaped write operations answer
//! [`operation::Operation::can_retry_write`] as a pure function of their sub-operation
//! descriptors, and the static [`operation::Aspect::RETRYABLE`] tag is authoritative over it.
//! The layer above decides whether to re-issue.
//!
//! Wire framing, server discovery, connection pooling, and authentication are out of scope and
//! live behind the [`topology`] traits.
//!
//! ```no_run
//! use std::sync::Arc;
//! use opcore::{bson::doc, Client, ProfilingLevel};
//! # async fn demo(topology: Arc<dyn opcore::topology::Topology>) -> opcore::error::Result<()> {
//! let client = Client::new(topology);
//!
//! let users = client.database("app").collection("users");
//! users.update_one(doc! { "_id": 1 }, doc! { "$set": { "active": true } }, None).await?;
//!
//! let level = client.admin().set_profiling_level("app", ProfilingLevel::SlowOnly).await?;
//! assert_eq!(level.as_str(), "slow_only");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use bson;

mod admin;
mod bson_util;
mod client;
pub mod coll;
pub mod collation;
pub mod concern;
pub mod db;
pub mod error;
pub mod operation;
pub mod results;
pub mod selection_criteria;
mod serde_util;
pub mod topology;


pub use crate::{
    admin::Admin,
    client::Client,
    coll::{Collection, CollectionOptions, Namespace},
    collation::{Collation, CollationStrength},
    concern::{Acknowledgment, WriteConcern},
    db::{Database, DatabaseOptions},
    operation::{
        delete::DeleteOptions,
        list_databases::ListDatabasesOptions,
        set_profiling_level::ProfilingLevel,
        update::UpdateOptions,
        validate_collection::ValidateCollectionOptions,
        Aspect,
    },
    selection_criteria::{ReadPreference, SelectionCriteria},
};
