//! Device-control operations on a terminal handle.
//!
//! Everything that talks to the kernel about a terminal's line discipline or
//! geometry goes through [`DeviceControl`]. The production implementation,
//! [`Ioctl`], uses the `termios` crate for the configuration and `rustix` for
//! the window size.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

use termios::{TCSAFLUSH, TCSANOW, Termios, tcsetattr};

use crate::winsize::Dimensions;

/// When a configuration write takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    /// Apply immediately (`TCSANOW`). Pending output may be left unflushed.
    #[default]
    Now,
    /// Apply after pending output is written and discard unread input
    /// (`TCSAFLUSH`).
    Flush,
}

impl ApplyMode {
    fn action(self) -> i32 {
        match self {
            ApplyMode::Now => TCSANOW,
            ApplyMode::Flush => TCSAFLUSH,
        }
    }
}

/// Get/set/size operations on a terminal file descriptor.
pub trait DeviceControl {
    /// Reads the current terminal configuration.
    ///
    /// # Errors
    ///
    /// Returns the OS error if `fd` is not a terminal or cannot be queried.
    fn get_config(&self, fd: BorrowedFd<'_>) -> io::Result<Termios>;

    /// Writes a terminal configuration.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the configuration cannot be written.
    fn set_config(&self, fd: BorrowedFd<'_>, mode: ApplyMode, config: &Termios) -> io::Result<()>;

    /// Reads the window geometry.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the geometry cannot be queried.
    fn window_size(&self, fd: BorrowedFd<'_>) -> io::Result<Dimensions>;
}

/// Device control through the platform's terminal ioctls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ioctl;

impl DeviceControl for Ioctl {
    fn get_config(&self, fd: BorrowedFd<'_>) -> io::Result<Termios> {
        Termios::from_fd(fd.as_raw_fd())
    }

    fn set_config(&self, fd: BorrowedFd<'_>, mode: ApplyMode, config: &Termios) -> io::Result<()> {
        tcsetattr(fd.as_raw_fd(), mode.action(), config)
    }

    fn window_size(&self, fd: BorrowedFd<'_>) -> io::Result<Dimensions> {
        let ws = rustix::termios::tcgetwinsize(fd)?;
        Ok(Dimensions::new(ws.ws_col, ws.ws_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Pty;
    use anyhow::Result;
    use std::fs::File;
    use std::os::fd::AsFd;
    use termios::ICANON;

    #[test]
    fn test_get_config_rejects_non_terminal() -> Result<()> {
        let null = File::open("/dev/null")?;
        assert!(Ioctl.get_config(null.as_fd()).is_err());
        Ok(())
    }

    #[test]
    fn test_set_config_round_trips_on_pty() -> Result<()> {
        let pty = Pty::open()?;
        let fd = pty.slave.as_fd();
        let original = Ioctl.get_config(fd)?;

        let mut changed = original;
        changed.c_lflag ^= ICANON;
        Ioctl.set_config(fd, ApplyMode::Now, &changed)?;
        assert_eq!(Ioctl.get_config(fd)?.c_lflag & ICANON, changed.c_lflag & ICANON);

        Ioctl.set_config(fd, ApplyMode::Flush, &original)?;
        assert_eq!(Ioctl.get_config(fd)?, original);
        Ok(())
    }

    #[test]
    fn test_window_size_reports_pty_geometry() -> Result<()> {
        let pty = Pty::with_size(132, 43)?;
        assert_eq!(Ioctl.window_size(pty.slave.as_fd())?, Dimensions::new(132, 43));
        Ok(())
    }

    #[test]
    fn test_apply_mode_defaults_to_now() {
        assert_eq!(ApplyMode::default(), ApplyMode::Now);
        assert_eq!(ApplyMode::Now.action(), TCSANOW);
        assert_eq!(ApplyMode::Flush.action(), TCSAFLUSH);
    }
}
