//! Pseudo-terminal fixtures shared by the unit tests.

use std::fs::{self, File};
use std::os::fd::AsRawFd;
use std::path::PathBuf;

use anyhow::{Context, Result};
use nix::pty::{Winsize, openpty};
use termios::Termios;

use crate::session::Options;
use crate::winsize::ScreenBuffer;

/// A pseudo-terminal pair. The slave stands in for the controlling terminal.
pub(crate) struct Pty {
    pub(crate) master: File,
    pub(crate) slave: File,
    pub(crate) path: PathBuf,
}

impl Pty {
    /// Opens a pty whose geometry is left at zero.
    pub(crate) fn open() -> Result<Self> {
        Self::with_size(0, 0)
    }

    /// Opens a pty reporting `cols` x `rows`.
    pub(crate) fn with_size(cols: u16, rows: u16) -> Result<Self> {
        let winsize = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let pty = openpty(Some(&winsize), None).context("Failed to open pty")?;
        let path = fs::read_link(format!("/proc/self/fd/{}", pty.slave.as_raw_fd()))
            .context("Failed to resolve pty slave path")?;
        Ok(Self {
            master: File::from(pty.master),
            slave: File::from(pty.slave),
            path,
        })
    }

    /// Session options pointing at the slave device.
    pub(crate) fn options(&self) -> Options {
        Options::new(&self.path)
    }

    /// Current configuration of the slave, read through an independent handle.
    pub(crate) fn config(&self) -> Result<Termios> {
        Termios::from_fd(self.slave.as_raw_fd()).context("Failed to read pty configuration")
    }
}

/// Screen buffer that remembers every resize it was asked to perform.
#[derive(Debug, Default)]
pub(crate) struct RecordingScreen {
    pub(crate) resizes: Vec<(u16, u16)>,
}

impl ScreenBuffer for RecordingScreen {
    fn resize(&mut self, cols: u16, rows: u16) {
        self.resizes.push((cols, rows));
    }
}
