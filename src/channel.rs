use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError<T> {
    /// The item is handed back to the caller.
    #[error("push into a closed transfer channel")]
    Closed(T),
}

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// A FIFO queue that moves items from one producer to one consumer.
///
/// The channel starts open. The producer calls [`close`](Self::close) once it
/// is done; the consumer keeps receiving until every item pushed before the
/// close has been handed out, and only then sees `None`.
///
/// By default the queue is unbounded, so a slow consumer lets the queue grow
/// without limit. [`TransferChannel::bounded`] makes `push` block while the
/// queue is full instead.
///
/// # Example
///
/// ```
/// use filtersnp::channel::TransferChannel;
///
/// let channel = TransferChannel::new();
/// channel.push(1).unwrap();
/// channel.push(2).unwrap();
/// channel.close();
/// assert!(channel.push(3).is_err());
/// assert_eq!(channel.try_pop_or_wait(), Some(1));
/// assert_eq!(channel.try_pop_or_wait(), Some(2));
/// assert_eq!(channel.try_pop_or_wait(), None);
/// ```
pub struct TransferChannel<T> {
    state: Mutex<State<T>>,
    /// Signalled on push and close.
    ready: Condvar,
    /// Signalled on pop; only waited on by bounded channels.
    space: Condvar,
    capacity: Option<usize>,
}

impl<T> Default for TransferChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TransferChannel<T> {
    /// Create an open, unbounded channel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Create an open channel holding at most `capacity` items (minimum 1).
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
            space: Condvar::new(),
            capacity,
        }
    }

    /// Append an item, taking ownership of it.
    ///
    /// Blocks while a bounded channel is full. Fails, returning the item,
    /// once the channel is closed.
    pub fn push(&self, item: T) -> Result<(), ChannelError<T>> {
        let mut state = self.state.lock();
        if let Some(capacity) = self.capacity {
            while !state.closed && state.queue.len() >= capacity {
                self.space.wait(&mut state);
            }
        }
        if state.closed {
            return Err(ChannelError::Closed(item));
        }
        state.queue.push_back(item);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Wait until an item is available or the channel is closed.
    ///
    /// Returns the oldest item, or `None` once the channel is closed *and*
    /// empty.
    pub fn try_pop_or_wait(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.queue.is_empty() && !state.closed {
            self.ready.wait(&mut state);
        }
        let item = state.queue.pop_front();
        drop(state);
        if item.is_some() && self.capacity.is_some() {
            self.space.notify_one();
        }
        item
    }

    /// Stop accepting items and wake every waiter.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_all();
        self.space.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_drains_after_close() {
        let channel = TransferChannel::new();
        for i in 0..100 {
            channel.push(i).unwrap();
        }
        channel.close();
        assert!(channel.is_closed());
        assert_eq!(channel.len(), 100);

        let drained: Vec<i32> = std::iter::from_fn(|| channel.try_pop_or_wait()).collect();
        assert_eq!(drained, (0..100).collect::<Vec<_>>());
        assert!(channel.is_empty());
    }

    #[test]
    fn test_push_after_close_returns_item() {
        let channel = TransferChannel::new();
        channel.close();
        match channel.push("late") {
            Err(ChannelError::Closed(item)) => assert_eq!(item, "late"),
            Ok(()) => panic!("push into closed channel succeeded"),
        }
    }

    #[test]
    fn test_consumer_waits_for_producer() {
        let channel = Arc::new(TransferChannel::new());
        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                std::iter::from_fn(|| channel.try_pop_or_wait()).collect::<Vec<_>>()
            })
        };
        for i in 0..1000 {
            channel.push(i).unwrap();
            if i % 250 == 0 {
                thread::sleep(Duration::from_millis(5));
            }
        }
        channel.close();
        assert_eq!(consumer.join().unwrap(), (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_close_wakes_idle_consumer() {
        let channel: Arc<TransferChannel<u8>> = Arc::new(TransferChannel::new());
        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.try_pop_or_wait())
        };
        thread::sleep(Duration::from_millis(20));
        channel.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_bounded_preserves_order() {
        let channel = Arc::new(TransferChannel::bounded(2));
        let producer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for i in 0..500 {
                    channel.push(i).unwrap();
                    assert!(channel.len() <= 2);
                }
                channel.close();
            })
        };
        let drained: Vec<i32> = std::iter::from_fn(|| channel.try_pop_or_wait()).collect();
        producer.join().unwrap();
        assert_eq!(drained, (0..500).collect::<Vec<_>>());
    }
}
