//! Cooperative cancellation for engine operations.
//!
//! A [`CancelHandle`] is held by whoever issued the request (the HTTP layer
//! arms it with a deadline). Every engine operation receives the matching
//! [`CancelSignal`] through its [`Caller`] and races its store work against
//! it. When the signal fires, the pending DB transaction is dropped, which
//! rolls it back, and the operation fails with [`EngineError::Aborted`].

use std::future::Future;

use tokio::sync::watch;

use crate::{EngineError, ResultEngine};

/// Creates a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
}

/// Issuer side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side of a cancellation pair. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the handle fires. Stays pending forever if the handle is
    /// dropped without firing.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl AsRef<CancelSignal> for CancelSignal {
    fn as_ref(&self) -> &CancelSignal {
        self
    }
}

/// The authenticated user on whose behalf an operation runs.
#[derive(Clone, Debug)]
pub struct Caller {
    pub user_id: String,
    pub cancel: CancelSignal,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            cancel: CancelSignal::never(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fails fast when the caller has already gone away.
    pub(crate) fn ensure_active(&self) -> ResultEngine<()> {
        if self.cancel.is_cancelled() {
            return Err(aborted());
        }
        Ok(())
    }
}

impl AsRef<CancelSignal> for Caller {
    fn as_ref(&self) -> &CancelSignal {
        &self.cancel
    }
}

fn aborted() -> EngineError {
    EngineError::Aborted("operation cancelled".to_string())
}

/// Drives `work` to completion unless `cancel` fires first.
pub(crate) async fn guard<T, F>(cancel: &CancelSignal, work: F) -> ResultEngine<T>
where
    F: Future<Output = ResultEngine<T>>,
{
    if cancel.is_cancelled() {
        return Err(aborted());
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(aborted()),
        result = work => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_passes_through_when_not_cancelled() {
        let (_handle, signal) = cancel_pair();
        let out = guard(&signal, async { Ok(7) }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn guard_aborts_after_cancel() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        let out: ResultEngine<()> = guard(&signal, async { Ok(()) }).await;
        assert!(matches!(out, Err(EngineError::Aborted(_))));
    }

    #[tokio::test]
    async fn guard_aborts_pending_work() {
        let (handle, signal) = cancel_pair();
        let work = async {
            std::future::pending::<()>().await;
            Ok(())
        };
        let (out, ()) = tokio::join!(guard(&signal, work), async { handle.cancel() });
        assert!(matches!(out, Err(EngineError::Aborted(_))));
    }

    #[tokio::test]
    async fn dropped_handle_never_fires() {
        let (handle, signal) = cancel_pair();
        drop(handle);
        assert!(!signal.is_cancelled());
        let out = guard(&signal, async { Ok("done") }).await;
        assert_eq!(out, Ok("done"));
    }

    #[test]
    fn caller_without_signal_is_active() {
        let caller = Caller::new("u1");
        assert!(caller.ensure_active().is_ok());
    }
}
