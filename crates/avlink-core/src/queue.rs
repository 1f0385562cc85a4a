//! Multi-producer, single-consumer FIFO used to hand items to a long-running thread.
//!
//! Producers hold cheap [`HandoverSender`] clones; the owning thread polls with
//! [`HandoverQueue::try_pop`] on its own cadence and never blocks on the queue. Items move
//! by value, so each one is delivered to exactly one consumer.

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

/// Consumer end. Also able to push, so a single owner can use it on its own.
pub struct HandoverQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> HandoverQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Producer handle for other threads.
    pub fn sender(&self) -> HandoverSender<T> {
        HandoverSender {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, item: T) {
        // The receiver lives in `self`, so the channel cannot be disconnected here.
        let _ = self.tx.send(item);
    }

    /// Take the oldest item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Remove every queued item, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> Default for HandoverQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer end of a [`HandoverQueue`].
pub struct HandoverSender<T> {
    tx: Sender<T>,
}

impl<T> Clone for HandoverSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> HandoverSender<T> {
    /// Queue `item`. Hands it back if the consumer is gone.
    pub fn push(&self, item: T) -> Result<(), T> {
        self.tx.send(item).map_err(|e| e.into_inner())
    }
}
