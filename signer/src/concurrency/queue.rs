//! Typed, unbounded, close-signalled queues connecting pipeline stages.
//!
//! A queue is closed once every [`QueueTx`] clone has been dropped. The receiving side keeps
//! yielding buffered items after that and only then terminates, so a consumer always sees the
//! full stream as long as producers drop their senders after their last push.

use tokio::sync::mpsc;

use crate::bail;
use crate::error::{ErrorKind, SignerResult};

/// Sending side of a stage queue.
///
/// Cloned into every per-item task that writes to the queue. The queue closes when the last
/// clone is dropped.
pub type QueueTx<T> = mpsc::UnboundedSender<T>;

/// Receiving side of a stage queue, owned by the consuming stage.
pub type QueueRx<T> = mpsc::UnboundedReceiver<T>;

/// Creates a new unbounded queue.
pub fn create_queue<T>() -> (QueueTx<T>, QueueRx<T>) {
    mpsc::unbounded_channel()
}

/// Pushes `item` into the queue.
///
/// Fails with [`ErrorKind::QueueClosed`] when the consumer is gone, which only happens after
/// the downstream stage terminated early.
pub fn push<T>(queue: &QueueTx<T>, item: T) -> SignerResult<()> {
    if queue.send(item).is_err() {
        bail!(
            ErrorKind::QueueClosed,
            "Queue consumer is gone",
            "The downstream stage stopped reading before the item could be pushed"
        );
    }

    Ok(())
}

/// Reads every item until the queue is closed and drained.
pub async fn drain<T>(queue: &mut QueueRx<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Some(item) = queue.recv().await {
        items.push(item);
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_returns_buffered_items_after_close() {
        let (tx, mut rx) = create_queue();
        let second_tx = tx.clone();

        push(&tx, 1).unwrap();
        push(&second_tx, 2).unwrap();
        push(&tx, 3).unwrap();
        drop(tx);
        drop(second_tx);

        assert_eq!(drain(&mut rx).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn push_fails_once_consumer_is_dropped() {
        let (tx, rx) = create_queue::<u8>();
        drop(rx);

        let err = push(&tx, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);
    }
}
