//! Stage-to-stage channels with explicit lifecycle signaling.
//!
//! A channel is a bounded FIFO conduit between one producer stage and one
//! consumer stage. On top of the raw queue it carries the lifecycle contract
//! every stage relies on:
//!
//! - [`StreamTx::push`] suspends until downstream accepts the record
//!   (backpressure).
//! - [`StreamTx::signal_end`] announces end-of-stream; it is idempotent, and
//!   records accepted before it are always delivered.
//! - [`StreamRx::close`] is the consumer's early-close signal; producers
//!   observe it via [`StreamTx::is_closed`] / [`StreamTx::closed`] before
//!   their next push.
//! - [`StreamTx::ended`] / [`StreamRx::ended`] resolve once, when the stream
//!   has ended and drained.
//!
//! The lifecycle is a one-way state machine: `Open` until the producer signals
//! end, `EndRequested` while accepted records are still being drained, `Ended`
//! once the receiver has seen the end. Every transition is idempotent.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Notify};

const OPEN: u8 = 0;
const END_REQUESTED: u8 = 1;
const ENDED: u8 = 2;

/// Why a push was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("push refused: consumer closed the channel")]
    Closed,

    #[error("push refused: end already signaled")]
    AfterEnd,
}

struct Shared {
    state: AtomicU8,
    ended: Notify,
}

impl Shared {
    fn request_end(&self) {
        let _ = self
            .state
            .compare_exchange(OPEN, END_REQUESTED, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn mark_ended(&self) {
        if self.state.swap(ENDED, Ordering::SeqCst) != ENDED {
            self.ended.notify_waiters();
        }
    }

    fn is_ended(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ENDED
    }

    async fn ended(&self) {
        let notified = self.ended.notified();
        tokio::pin!(notified);
        // Register interest before the final check so a concurrent
        // mark_ended cannot slip between check and await.
        notified.as_mut().enable();
        if self.is_ended() {
            return;
        }
        notified.await;
    }
}

/// Producer half of a stage channel.
///
/// Cloning yields another producer handle onto the same channel (used when
/// several producers multiplex one output). The stream ends once every handle
/// has signaled end or been dropped.
pub struct StreamTx<T> {
    tx: Option<mpsc::Sender<T>>,
    shared: Arc<Shared>,
}

impl<T> Clone for StreamTx<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<T: Send> StreamTx<T> {
    /// Push one record, suspending until downstream accepts it.
    pub async fn push(&self, record: T) -> std::result::Result<(), PushError> {
        let Some(tx) = &self.tx else {
            return Err(PushError::AfterEnd);
        };
        tx.send(record).await.map_err(|_| PushError::Closed)
    }

    /// Signal that this handle will push no further records. Idempotent.
    ///
    /// Records accepted before this call are still delivered; the channel
    /// reaches its ended state once the receiver drains them.
    pub fn signal_end(&mut self) {
        if self.tx.take().is_some() {
            self.shared.request_end();
        }
    }

    /// True once the consumer has closed its end (or after this handle
    /// signaled end).
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }

    /// Resolves when the consumer closes its end.
    pub async fn closed(&self) {
        if let Some(tx) = &self.tx {
            tx.closed().await;
        }
    }

    /// Resolves once the stream has ended and fully drained.
    pub async fn ended(&self) {
        self.shared.ended().await;
    }
}

/// Consumer half of a stage channel.
pub struct StreamRx<T> {
    rx: mpsc::Receiver<T>,
    shared: Arc<Shared>,
}

impl<T> StreamRx<T> {
    /// Receive the next record, in push order.
    ///
    /// Returns `None` once the producer side has ended and every accepted
    /// record has been drained; the channel is marked ended at that point.
    pub async fn recv(&mut self) -> Option<T> {
        match self.rx.recv().await {
            Some(record) => Some(record),
            None => {
                self.shared.mark_ended();
                None
            }
        }
    }

    /// Close the consumer side early.
    ///
    /// Producers observe this before their next push. Records already
    /// accepted can still be drained with [`StreamRx::recv`].
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Resolves once the stream has ended and fully drained.
    pub async fn ended(&self) {
        self.shared.ended().await;
    }
}

impl<T> Drop for StreamRx<T> {
    fn drop(&mut self) {
        // A dropped consumer counts as ended for anyone still waiting.
        self.shared.mark_ended();
    }
}

/// Create a bounded stage channel of the given capacity.
pub fn channel<T>(buffer: usize) -> (StreamTx<T>, StreamRx<T>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let shared = Arc::new(Shared {
        state: AtomicU8::new(OPEN),
        ended: Notify::new(),
    });
    (
        StreamTx {
            tx: Some(tx),
            shared: shared.clone(),
        },
        StreamRx { rx, shared },
    )
}
