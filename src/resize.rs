//! Window-change (`SIGWINCH`) subscription.
//!
//! Signals are collected by `signal-hook` and forwarded from a dedicated
//! thread into a channel, so nothing but a flag write happens in the signal
//! handler itself.

use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::SIGWINCH;
use signal_hook::iterator::{Handle, Signals};
use tracing::{debug, warn};

/// Notification that the terminal's window size changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowChanged;

/// An active `SIGWINCH` registration. Revoked when dropped.
#[derive(Debug)]
pub struct Subscription {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Starts forwarding window changes into `tx`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the signal handler or the forwarding thread
    /// cannot be set up.
    pub fn new(tx: Sender<WindowChanged>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGWINCH])?;
        let handle = signals.handle();
        let spawned = thread::Builder::new()
            .name("ttymode-sigwinch".into())
            .spawn(move || {
                for _ in signals.forever() {
                    if tx.send(WindowChanged).is_err() {
                        break;
                    }
                }
            });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                handle.close();
                return Err(err);
            }
        };
        debug!("subscribed to window-change notifications");
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Stops delivery. No notification is sent after this returns.
    pub fn revoke(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("window-change forwarding thread panicked");
            }
        }
        debug!("window-change subscription revoked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use nix::sys::signal::{Signal, raise};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_raised_sigwinch_is_forwarded() -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let subscription = Subscription::new(tx)?;

        raise(Signal::SIGWINCH)?;
        assert_eq!(rx.recv_timeout(Duration::from_secs(5))?, WindowChanged);

        subscription.revoke();
        Ok(())
    }

    #[test]
    fn test_revoke_disconnects_channel() -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let subscription = Subscription::new(tx)?;
        subscription.revoke();

        // The forwarding thread owned the only sender.
        while rx.try_recv().is_ok() {}
        assert_eq!(
            rx.try_recv(),
            Err(mpsc::TryRecvError::Disconnected)
        );
        Ok(())
    }
}
