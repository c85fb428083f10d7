pub(crate) mod executor;

use std::sync::Arc;

use crate::{
    admin::Admin,
    db::{Database, DatabaseOptions},
    topology::Topology,
};

/// `Client` is the entry point of the crate: it owns the handle to the topology collaborator and
/// runs operations through the generic executor. `Client` uses [`std::sync::Arc`] internally, so
/// it can safely be shared across threads or async tasks.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    topology: Arc<dyn Topology>,
}

impl Client {
    /// Creates a new `Client` over the given topology.
    pub fn new(topology: Arc<dyn Topology>) -> Self {
        Self {
            inner: Arc::new(ClientInner { topology }),
        }
    }

    /// Gets a handle to a database specified by `name`. The database inherits no default write
    /// concern; use [`Client::database_with_options`] to attach one.
    pub fn database(&self, name: &str) -> Database {
        Database::new(self.clone(), name, Default::default())
    }

    /// Gets a handle to a database specified by `name` with the given options.
    pub fn database_with_options(&self, name: &str, options: DatabaseOptions) -> Database {
        Database::new(self.clone(), name, options)
    }

    /// Gets a handle to the admin command facade.
    pub fn admin(&self) -> Admin {
        Admin::new(self.clone())
    }

    pub(crate) fn topology(&self) -> &Arc<dyn Topology> {
        &self.inner.topology
    }
}
