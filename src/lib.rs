//! Raw-mode lifecycle for the controlling terminal.
//!
//! A [`TerminalSession`] opens the terminal device, captures its original
//! line-discipline configuration, switches it to raw mode for cell-addressed
//! rendering, forwards window-change notifications, and restores everything
//! on [`TerminalSession::finalize`] once the input-reading task has drained.
//!
//! ```no_run
//! use std::io::Read;
//! use std::thread;
//! use ttymode::{Dimensions, Options, ScreenBuffer, TerminalSession};
//!
//! struct Screen(Dimensions);
//!
//! impl ScreenBuffer for Screen {
//!     fn resize(&mut self, cols: u16, rows: u16) {
//!         self.0 = Dimensions::new(cols, rows);
//!     }
//! }
//!
//! # fn main() -> Result<(), ttymode::Error> {
//! let mut screen = Screen(Dimensions::default());
//! let mut session = TerminalSession::new(Options::default());
//! session.init(&mut screen)?;
//!
//! let (mut input, notifier) = session.input_reader()?;
//! let reader = thread::spawn(move || {
//!     let mut byte = [0u8; 1];
//!     let _ = input.read(&mut byte);
//!     drop(notifier);
//! });
//!
//! session.finalize()?;
//! # let _ = reader.join();
//! # Ok(())
//! # }
//! ```

mod control;
mod device;
mod drain;
mod error;
mod logs;
mod resize;
mod session;
mod terminal;
mod winsize;

#[cfg(test)]
mod testutil;

pub use control::{ApplyMode, DeviceControl, Ioctl};
pub use device::DeviceHandles;
pub use drain::{DrainNotifier, DrainWaiter, channel as drain_channel};
pub use error::{Access, Error, TeardownFailure, TeardownStep};
pub use logs::init as init_logging;
pub use resize::{Subscription, WindowChanged};
pub use session::{DEFAULT_DEVICE, Options, State, TerminalSession};
pub use terminal::{
    OriginalConfig, RAW_CLEARED_CONTROL, RAW_CLEARED_INPUT, RAW_CLEARED_LOCAL, RAW_CLEARED_OUTPUT,
    apply_raw, baud_rate, capture_original, make_raw, restore_original,
};
pub use winsize::{Dimensions, ScreenBuffer, query_dimensions, resize_if_known};
