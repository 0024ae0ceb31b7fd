use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use thiserror::Error;

/// Receiving half of an event channel.
pub struct EventConsumer<E>(Receiver<E>);

/// Sending half of an event channel. Cloneable so many producers can feed
/// the same consumer.
pub struct EventPublisher<E>(Sender<E>);

#[derive(Debug, Error, PartialEq)]
pub enum EventPublisherError {
    #[error("error while publishing event: {0}")]
    SendError(String),
}

/// Creates a connected publisher/consumer pair backed by an unbounded channel.
pub fn pub_sub<E>() -> (EventPublisher<E>, EventConsumer<E>) {
    let (sender, receiver) = unbounded();
    (EventPublisher(sender), EventConsumer(receiver))
}

impl<E> EventPublisher<E> {
    pub fn publish(&self, event: E) -> Result<(), EventPublisherError> {
        self.0
            .send(event)
            .map_err(|err| EventPublisherError::SendError(err.to_string()))
    }
}

impl<E> Clone for EventPublisher<E> {
    fn clone(&self) -> Self {
        EventPublisher(self.0.clone())
    }
}

impl<E> EventConsumer<E> {
    /// Blocks until an event arrives or the timeout elapses. Disconnection
    /// (every publisher dropped) surfaces as [`RecvTimeoutError::Disconnected`].
    pub fn recv_timeout(&self, timeout: Duration) -> Result<E, RecvTimeoutError> {
        self.0.recv_timeout(timeout)
    }

    /// Returns the next pending event without blocking, if any.
    pub fn try_recv(&self) -> Option<E> {
        self.0.try_recv().ok()
    }
}
