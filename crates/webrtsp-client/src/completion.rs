//! Single-shot completion handles
//!
//! A [`Completion`] is resolved exactly once: consuming `resume` or
//! `resume_with_error` is the only way to use it. Dropping it unresolved
//! fails the waiting side with [`ClientError::Disconnected`].

use tokio::sync::oneshot;

use crate::error::{ClientError, Result};

/// Resolving half
#[derive(Debug)]
pub struct Completion<T> {
    tx: oneshot::Sender<Result<T>>,
}

/// Waiting half
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
}

/// Create a linked completion/pending pair
pub fn completion<T>() -> (Completion<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, Pending { rx })
}

impl<T> Completion<T> {
    pub fn resume(self, value: T) {
        let _ = self.tx.send(Ok(value));
    }

    pub fn resume_with_error(self, error: ClientError) {
        let _ = self.tx.send(Err(error));
    }
}

impl<T> Pending<T> {
    pub async fn wait(self) -> Result<T> {
        self.rx.await.unwrap_or(Err(ClientError::Disconnected))
    }
}
