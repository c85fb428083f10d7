//! The boundary between this crate and the transport layer. Server discovery, pooling, and
//! socket I/O live behind these traits; this crate only relies on the contracts below.

use std::sync::Arc;

use futures_core::future::BoxFuture;

use crate::{bson::Document, error::Result, operation::Command, selection_criteria::SelectionCriteria};

/// A handle to a resolved server that can run commands. Implementations must always complete
/// asynchronously, delivering either the raw response document or a transport error.
pub trait Server: Send + Sync {
    /// Runs the given command against this server, resolving with the raw response document.
    /// Write commands (`update`, `delete`) funnel through the same entry point as generic
    /// commands.
    fn run_command(&self, command: Command) -> BoxFuture<'_, Result<Document>>;

    /// The address of this server, used in log events.
    fn address(&self) -> &str;
}

/// A source of [`Server`] handles. Selection strategy (replica walking, latency windows,
/// failover) is entirely the implementation's concern.
pub trait Topology: Send + Sync {
    /// Selects a server suitable for the given criteria. `None` requests the default route
    /// (the primary, for topologies that have one).
    fn select_server(
        &self,
        criteria: Option<&SelectionCriteria>,
    ) -> BoxFuture<'_, Result<Arc<dyn Server>>>;
}
