use tracing::{debug, warn};

use super::Client;
use crate::{
    error::Result,
    operation::{Aspect, Operation},
};

impl Client {
    /// Executes an operation: resolves a server from the topology, performs exactly one
    /// invocation against it, and resolves with the operation's output or an error.
    ///
    /// This is the future half of the completion duality; [`Client::execute_operation_with_callback`]
    /// is the callback half. Both run this same path, so the two modes are observationally
    /// equivalent for identical underlying outcomes.
    pub(crate) async fn execute_operation<T: Operation + Sync>(&self, op: T) -> Result<T::O> {
        let criteria = if T::has_aspect(Aspect::EXECUTE_WITH_SELECTION) {
            op.selection_criteria()
        } else {
            None
        };
        let server = self.topology().select_server(criteria).await?;

        debug!(command = op.name(), server = server.address(), "executing operation");
        match op.execute(server.as_ref()).await {
            Ok(output) => {
                debug!(command = op.name(), "operation succeeded");
                Ok(output)
            }
            Err(error) => {
                warn!(command = op.name(), %error, "operation failed");
                Err(error)
            }
        }
    }

    /// Executes an operation, delivering the outcome to `callback` instead of a future.
    ///
    /// The callback is invoked exactly once, never before this method returns, on the task the
    /// underlying completion arrives on.
    pub(crate) fn execute_operation_with_callback<T, F>(&self, op: T, callback: F)
    where
        T: Operation + Send + Sync + 'static,
        T::O: Send + 'static,
        F: FnOnce(Result<T::O>) + Send + 'static,
    {
        self.execute_pending_operation_with_callback(Ok(op), callback);
    }

    /// Like [`Client::execute_operation_with_callback`], for operations whose construction can
    /// itself fail. A construction error takes the same delivery path as any other outcome, so
    /// the exactly-once, never-synchronous callback contract holds regardless of where the
    /// failure arose.
    pub(crate) fn execute_pending_operation_with_callback<T, F>(&self, op: Result<T>, callback: F)
    where
        T: Operation + Send + Sync + 'static,
        T::O: Send + 'static,
        F: FnOnce(Result<T::O>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            match op {
                Ok(op) => callback(client.execute_operation(op).await),
                Err(error) => callback(Err(error)),
            }
        });
    }
}

#[cfg(test)]
mod test {
    use std::{
        io,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    };

    use pretty_assertions::assert_eq;

    use crate::{
        bson::doc,
        error::ErrorKind,
        operation::RunCommand,
        test::{client_with_responses, failing_topology},
        Client,
    };

    #[tokio::test]
    async fn future_mode_resolves_with_response() {
        let (client, server) = client_with_responses(vec![Ok(doc! { "ok": 1, "n": 5 })]);
        let op = RunCommand::new("test_db", doc! { "count": "c" }, None).unwrap();
        let response = client.execute_operation(op).await.unwrap();
        assert_eq!(response, doc! { "ok": 1, "n": 5 });
        assert_eq!(server.commands()[0].name, "count");
        assert_eq!(server.commands()[0].target_db, "test_db");
    }

    #[tokio::test]
    async fn command_failure_is_normalized() {
        let (client, _server) = client_with_responses(vec![Ok(
            doc! { "ok": 0, "code": 59, "codeName": "CommandNotFound", "errmsg": "no such command" },
        )]);
        let op = RunCommand::new("test_db", doc! { "wat": 1 }, None).unwrap();
        let error = client.execute_operation(op).await.unwrap_err();
        match error.kind.as_ref() {
            ErrorKind::Command(cmd) => assert_eq!(cmd.code, 59),
            other => panic!("expected command error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn transport_errors_pass_through_unmodified() {
        let (client, _server) = client_with_responses(vec![Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "peer hung up",
        )
        .into())]);
        let op = RunCommand::new("test_db", doc! { "ping": 1 }, None).unwrap();
        let error = client.execute_operation(op).await.unwrap_err();
        assert!(matches!(error.kind.as_ref(), ErrorKind::Io(..)));
        assert!(error.is_write_retryable());
    }

    #[tokio::test]
    async fn selection_failure_short_circuits() {
        let client = Client::new(failing_topology());
        let op = RunCommand::new("test_db", doc! { "ping": 1 }, None).unwrap();
        let error = client.execute_operation(op).await.unwrap_err();
        assert!(matches!(
            error.kind.as_ref(),
            ErrorKind::ServerSelection { .. }
        ));
    }

    #[tokio::test]
    async fn callback_mode_matches_future_mode() {
        let make_op = || RunCommand::new("test_db", doc! { "ping": 1 }, None).unwrap();

        let (client, _server) = client_with_responses(vec![
            Ok(doc! { "ok": 1 }),
            Ok(doc! { "ok": 0, "code": 59, "errmsg": "nope" }),
            Ok(doc! { "ok": 1 }),
            Ok(doc! { "ok": 0, "code": 59, "errmsg": "nope" }),
        ]);

        let future_ok = client.execute_operation(make_op()).await;
        let future_err = client.execute_operation(make_op()).await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        client.execute_operation_with_callback(make_op(), move |result| {
            let _ = tx.send(result);
        });
        let callback_ok = rx.await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        client.execute_operation_with_callback(make_op(), move |result| {
            let _ = tx.send(result);
        });
        let callback_err = rx.await.unwrap();

        assert_eq!(future_ok.unwrap(), callback_ok.unwrap());
        let future_err = future_err.unwrap_err();
        let callback_err = callback_err.unwrap_err();
        match (future_err.kind.as_ref(), callback_err.kind.as_ref()) {
            (ErrorKind::Command(a), ErrorKind::Command(b)) => assert_eq!(a.code, b.code),
            other => panic!("mismatched error kinds: {:?}", other),
        }
    }

    #[tokio::test]
    async fn client_is_shareable_across_concurrent_operations() {
        let (client, server) = client_with_responses(vec![
            Ok(doc! { "ok": 1, "first": true }),
            Ok(doc! { "ok": 1, "second": true }),
        ]);
        let ping = client.execute_operation(RunCommand::new("a", doc! { "ping": 1 }, None).unwrap());
        let status =
            client.execute_operation(RunCommand::new("b", doc! { "serverStatus": 1 }, None).unwrap());
        let (ping, status) = futures::join!(ping, status);
        ping.unwrap();
        status.unwrap();
        assert_eq!(server.commands().len(), 2);
    }

    #[tokio::test]
    async fn callback_is_never_invoked_synchronously() {
        let (client, _server) = client_with_responses(vec![Ok(doc! { "ok": 1 })]);
        let op = RunCommand::new("test_db", doc! { "ping": 1 }, None).unwrap();

        let fired = Arc::new(AtomicBool::new(false));
        let fired_in_callback = Arc::clone(&fired);
        let (tx, rx) = tokio::sync::oneshot::channel();
        client.execute_operation_with_callback(op, move |result| {
            fired_in_callback.store(true, Ordering::SeqCst);
            let _ = tx.send(result);
        });
        // The submitting call has returned; the callback must not have fired yet.
        assert!(!fired.load(Ordering::SeqCst));
        rx.await.unwrap().unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }
}
