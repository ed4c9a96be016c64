//! One-shot "input drained" rendezvous.
//!
//! The input-reading task holds a [`DrainNotifier`] and fires it once it has
//! stopped reading from the terminal. Teardown waits on the matching
//! [`DrainWaiter`] before the device configuration is restored. Dropping the
//! notifier counts as firing it: either way nobody is reading any more.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};

/// Creates a connected notifier/waiter pair.
#[must_use]
pub fn channel() -> (DrainNotifier, DrainWaiter) {
    let (tx, rx) = mpsc::sync_channel(1);
    (
        DrainNotifier { tx },
        DrainWaiter {
            rx,
            drained: false,
        },
    )
}

/// Sending half, owned by the input-reading task.
#[derive(Debug)]
pub struct DrainNotifier {
    tx: SyncSender<()>,
}

impl DrainNotifier {
    /// Signals that the input task has stopped reading.
    pub fn notify(self) {
        // The waiter may already be gone if the session was torn down.
        let _ = self.tx.try_send(());
    }
}

/// Receiving half, owned by the session.
#[derive(Debug)]
pub struct DrainWaiter {
    rx: Receiver<()>,
    drained: bool,
}

impl DrainWaiter {
    /// Whether the notifier has fired or been dropped. Never blocks.
    pub fn is_drained(&mut self) -> bool {
        if !self.drained {
            self.drained = !matches!(self.rx.try_recv(), Err(TryRecvError::Empty));
        }
        self.drained
    }

    /// Blocks until the notifier fires or is dropped. There is no timeout.
    pub fn wait(self) {
        if !self.drained {
            let _ = self.rx.recv();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_notify_releases_waiter() {
        let (notifier, mut waiter) = channel();
        assert!(!waiter.is_drained());
        notifier.notify();
        assert!(waiter.is_drained());
        waiter.wait();
    }

    #[test]
    fn test_dropping_notifier_releases_waiter() {
        let (notifier, mut waiter) = channel();
        drop(notifier);
        assert!(waiter.is_drained());
        waiter.wait();
    }

    #[test]
    fn test_wait_blocks_until_notified() {
        let (notifier, waiter) = channel();
        let (done_tx, done_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            waiter.wait();
            done_tx.send(()).ok();
        });

        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        notifier.notify();
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().expect("waiter thread panicked");
    }
}
