//! Event publishing abstraction (mechanics only).
//!
//! The persistence context publishes committed domain events through a
//! [`MessagePublisher`], one envelope at a time and in commit order. What
//! happens after `publish` returns (fan-out, brokers, handlers) is the
//! publisher's business.
//!
//! ## Delivery
//!
//! Publication happens after the write succeeded, so delivery is best effort
//! relative to the write: a crash between the write and the last publish loses
//! the remaining events. Consumers should still be idempotent.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use thiserror::Error;

use crate::envelope::EventEnvelope;

/// Publication failure.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The publisher is no longer accepting messages.
    #[error("publisher closed")]
    Closed,

    /// Transport-specific failure.
    #[error("publish failed: {0}")]
    Transport(String),
}

/// Asynchronous "publish one event" interface.
///
/// The trait requires `Send + Sync` so a single publisher can be shared by every
/// request-scoped unit of work.
#[async_trait::async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), PublishError>;
}

#[async_trait::async_trait]
impl<P> MessagePublisher for Arc<P>
where
    P: MessagePublisher + ?Sized,
{
    async fn publish(&self, event: EventEnvelope) -> Result<(), PublishError> {
        (**self).publish(event).await
    }
}

/// A subscription to published events.
///
/// Each subscription gets a copy of every event published after it was created
/// (broadcast semantics). Designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything received so far without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}
