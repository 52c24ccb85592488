//! Background consumer thread for one subscription.
//!
//! `ConsumerThread` owns a transport consumer and polls it on a dedicated
//! thread: each delivery is handed to the dispatch closure, acknowledged on
//! success, and rejected without requeue on failure. Per-message failures
//! never stop the loop - one poison message must not stall subsequent
//! deliveries.

use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::BoxError;

use super::message::Message;
use super::transport::Consumer;

/// Statistics from a consumer thread.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Number of poll cycles completed.
    pub polls: usize,
    /// Number of messages handled and acknowledged.
    pub handled: usize,
    /// Number of messages rejected without requeue.
    pub rejected: usize,
}

/// A background thread driving one consumer.
///
/// Spawn, deliver, stop and collect stats. Dropping the handle signals the
/// thread to stop without waiting for it.
pub(crate) struct ConsumerThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<ConsumerStats>>,
}

impl ConsumerThread {
    pub(crate) fn spawn<C, F>(mut consumer: C, poll_interval: Duration, mut on_delivery: F) -> Self
    where
        C: Consumer,
        F: FnMut(&Message) -> Result<(), BoxError> + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = ConsumerStats::default();

            loop {
                // Check for stop signal
                match stop_rx.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }

                stats.polls += 1;

                match consumer.poll(poll_interval) {
                    Ok(Some(delivery)) => match on_delivery(&delivery.message) {
                        Ok(()) => {
                            let _ = consumer.ack(delivery.tag);
                            stats.handled += 1;
                        }
                        Err(_e) => {
                            let _ = consumer.reject(delivery.tag, false);
                            stats.rejected += 1;
                        }
                    },
                    Ok(None) => {
                        // No delivery available, continue polling
                    }
                    Err(_) => {
                        // Transport error, continue polling
                    }
                }
            }

            stats
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the consumer to stop and wait for it to finish.
    /// Returns the consumer statistics.
    pub(crate) fn stop(mut self) -> ConsumerStats {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            ConsumerStats::default()
        }
    }

    /// Signal the consumer to stop without waiting.
    pub(crate) fn signal_stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

impl Drop for ConsumerThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
