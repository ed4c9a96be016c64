//! Terminal session lifecycle.
//!
//! A [`TerminalSession`] walks the terminal through
//! `Unopened -> Open -> Raw -> Draining -> Closed`:
//!
//! - [`TerminalSession::init`] opens the device, captures the original
//!   configuration, applies raw mode, subscribes to window changes and seeds
//!   the screen buffer with the current dimensions. Any failure releases
//!   what was acquired and leaves the session `Unopened`.
//! - [`TerminalSession::finalize`] revokes the subscription, waits for the
//!   input task to drain, restores the original configuration and closes
//!   both handles, in that order.

use std::fmt;
use std::fs::File;
use std::io;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use termios::Termios;
use tracing::{debug, warn};

use crate::control::{ApplyMode, DeviceControl, Ioctl};
use crate::device::DeviceHandles;
use crate::drain::{self, DrainNotifier, DrainWaiter};
use crate::error::{Error, TeardownFailure, TeardownStep};
use crate::resize::{Subscription, WindowChanged};
use crate::terminal::{OriginalConfig, apply_raw, capture_original, restore_original};
use crate::winsize::{self, Dimensions, ScreenBuffer};

/// The controlling terminal of the process.
pub const DEFAULT_DEVICE: &str = "/dev/tty";

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Terminal device to open.
    pub device: PathBuf,
    /// How the original configuration is written back at teardown.
    pub restore_mode: ApplyMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            restore_mode: ApplyMode::Now,
        }
    }
}

impl Options {
    /// Options for `device` with the default restore mode.
    pub fn new(device: impl AsRef<Path>) -> Self {
        Self {
            device: device.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Sets how the original configuration is restored.
    #[must_use]
    pub fn restore_mode(mut self, mode: ApplyMode) -> Self {
        self.restore_mode = mode;
        self
    }
}

/// Lifecycle state of a [`TerminalSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing acquired.
    Unopened,
    /// Both handles open, configuration untouched.
    Open,
    /// Raw mode applied and window changes subscribed.
    Raw,
    /// Subscription revoked, waiting for the input task to drain.
    Draining,
    /// Configuration restored and handles released.
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Unopened => "unopened",
            State::Open => "open",
            State::Raw => "raw",
            State::Draining => "draining",
            State::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Registers window-change delivery into a channel.
type Subscriber = fn(Sender<WindowChanged>) -> io::Result<Subscription>;

/// Raw-mode ownership of a terminal device.
pub struct TerminalSession<C: DeviceControl = Ioctl> {
    options: Options,
    control: C,
    state: State,
    handles: Option<DeviceHandles>,
    original: Option<OriginalConfig>,
    resize_tx: Sender<WindowChanged>,
    resize_rx: Receiver<WindowChanged>,
    subscriber: Subscriber,
    subscription: Option<Subscription>,
    drain_notifier: Option<DrainNotifier>,
    drain_waiter: Option<DrainWaiter>,
}

impl TerminalSession<Ioctl> {
    /// Creates an unopened session using the platform's terminal ioctls.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self::with_control(options, Ioctl)
    }
}

impl<C: DeviceControl> TerminalSession<C> {
    /// Creates an unopened session using `control` for device control.
    pub fn with_control(options: Options, control: C) -> Self {
        let (resize_tx, resize_rx) = mpsc::channel();
        let (notifier, waiter) = drain::channel();
        Self {
            options,
            control,
            state: State::Unopened,
            handles: None,
            original: None,
            resize_tx,
            resize_rx,
            subscriber: Subscription::new,
            subscription: None,
            drain_notifier: Some(notifier),
            drain_waiter: Some(waiter),
        }
    }

    /// Puts the terminal in raw mode and seeds `buffer` with its dimensions.
    ///
    /// The raw configuration is written only after both handles are open and
    /// the original configuration is captured, so a failure leaves the
    /// terminal unmodified (or restored, if subscribing fails).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the session is `Unopened`
    /// - [`Error::DeviceOpen`], [`Error::ConfigQuery`], [`Error::ConfigApply`]
    ///   or [`Error::Subscribe`] from the failing step; the session is back
    ///   to `Unopened` with no handle held
    pub fn init<B: ScreenBuffer + ?Sized>(&mut self, buffer: &mut B) -> Result<(), Error> {
        if self.state != State::Unopened {
            return Err(Error::InvalidState {
                operation: "initialize",
                state: self.state,
            });
        }

        let handles = DeviceHandles::open(&self.options.device)?;
        self.state = State::Open;
        debug!(device = %self.options.device.display(), "terminal device opened");

        let (original, subscription) = match self.enter_raw(&handles) {
            Ok(entered) => entered,
            Err(err) => {
                for failure in handles.close() {
                    warn!(%failure, "failed to release terminal handle");
                }
                self.state = State::Unopened;
                return Err(err);
            }
        };

        self.handles = Some(handles);
        self.original = Some(original);
        self.subscription = Some(subscription);
        self.state = State::Raw;

        winsize::resize_if_known(buffer, self.query_dimensions());
        Ok(())
    }

    fn enter_raw(&self, handles: &DeviceHandles) -> Result<(OriginalConfig, Subscription), Error> {
        let fd = handles.output().as_fd();
        let original = capture_original(&self.control, fd)?;
        apply_raw(&self.control, fd, &original)?;

        match (self.subscriber)(self.resize_tx.clone()) {
            Ok(subscription) => Ok((original, subscription)),
            Err(err) => {
                if let Err(restore_err) =
                    restore_original(&self.control, fd, self.options.restore_mode, &original)
                {
                    warn!(%restore_err, "failed to restore terminal after subscribe failure");
                }
                Err(Error::Subscribe(err))
            }
        }
    }

    /// Queries the terminal's current dimensions.
    ///
    /// A zero-sized result means the geometry is unknown.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if no handle is open
    /// - [`Error::SizeQuery`] if the query fails
    pub fn query_dimensions(&self) -> Result<Dimensions, Error> {
        let handles = self.handles.as_ref().ok_or(Error::InvalidState {
            operation: "query window size",
            state: self.state,
        })?;
        winsize::query_dimensions(&self.control, handles.output().as_fd())
    }

    /// Restores the terminal and releases the device.
    ///
    /// Steps run strictly in order: revoke the window-change subscription,
    /// wait (without timeout) for the input task to drain, restore the
    /// original configuration, close the output handle, close the input
    /// handle. Every step after the drain wait runs even if an earlier one
    /// failed.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the session was already finalized; nothing is
    ///   touched
    /// - [`Error::Teardown`] listing every restore or close failure
    pub fn finalize(&mut self) -> Result<(), Error> {
        let was_raw = match self.state {
            State::Closed => return Err(Error::Closed),
            State::Unopened => {
                self.state = State::Closed;
                return Ok(());
            }
            State::Raw => true,
            State::Open | State::Draining => false,
        };

        self.state = State::Draining;
        if let Some(subscription) = self.subscription.take() {
            subscription.revoke();
        }

        // An untaken notifier means no reader was ever started.
        self.drain_notifier = None;
        if let Some(waiter) = self.drain_waiter.take() {
            debug!("waiting for input task to drain");
            waiter.wait();
        }

        let mut failures = Vec::new();
        if let Some(handles) = self.handles.take() {
            if let (true, Some(original)) = (was_raw, self.original.as_ref()) {
                let fd = handles.output().as_fd();
                if let Err(source) =
                    restore_original(&self.control, fd, self.options.restore_mode, original)
                {
                    warn!(%source, "failed to restore terminal configuration");
                    failures.push(TeardownFailure {
                        step: TeardownStep::RestoreConfig,
                        source,
                    });
                }
            }
            failures.extend(handles.close());
        }

        self.state = State::Closed;
        debug!("terminal session closed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(failures))
        }
    }

    /// Hands the input-reading task its handle and drain notifier.
    ///
    /// There is a single reader per session. Once the reader exists,
    /// [`finalize`](Self::finalize) blocks until the notifier fires or is
    /// dropped.
    ///
    /// # Returns
    ///
    /// - A duplicate of the read-only handle, owned by the reader
    /// - The notifier the reader fires once it has stopped reading
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if no handle is open
    /// - [`Error::ReaderTaken`] if a reader was already handed out
    /// - [`Error::InputClone`] if the handle cannot be duplicated
    pub fn input_reader(&mut self) -> Result<(File, DrainNotifier), Error> {
        let handles = self.handles.as_ref().ok_or(Error::InvalidState {
            operation: "duplicate the input handle",
            state: self.state,
        })?;
        if self.drain_notifier.is_none() {
            return Err(Error::ReaderTaken);
        }
        let input = handles.input().try_clone().map_err(Error::InputClone)?;
        let notifier = self.drain_notifier.take().ok_or(Error::ReaderTaken)?;
        Ok((input, notifier))
    }

    /// The write-only handle, while the device is open.
    #[must_use]
    pub fn output(&self) -> Option<&File> {
        self.handles.as_ref().map(DeviceHandles::output)
    }

    /// Window-change notifications. Draining them is up to the caller.
    #[must_use]
    pub fn resize_events(&self) -> &Receiver<WindowChanged> {
        &self.resize_rx
    }

    /// Whether window changes are currently being delivered.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// The session's configuration.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The configuration captured when raw mode was entered.
    #[must_use]
    pub fn original_config(&self) -> Option<&Termios> {
        self.original.as_ref().map(OriginalConfig::config)
    }

    /// Output baud rate captured when raw mode was entered.
    #[must_use]
    pub fn baud_rate(&self) -> Option<u32> {
        self.original.as_ref().map(OriginalConfig::baud_rate)
    }
}

impl<C: DeviceControl> fmt::Debug for TerminalSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalSession")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("subscribed", &self.subscription.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: DeviceControl> Drop for TerminalSession<C> {
    fn drop(&mut self) {
        if self.state != State::Raw {
            return;
        }
        let drained = self.drain_notifier.is_some()
            || self
                .drain_waiter
                .as_mut()
                .is_some_and(DrainWaiter::is_drained);
        if drained {
            if let Err(err) = self.finalize() {
                warn!(%err, "terminal teardown on drop failed");
            }
        } else {
            warn!("session dropped while the input task is still reading; terminal left in raw mode");
        }
    }
}
