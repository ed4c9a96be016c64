//! Raw-mode terminal demonstration.
//!
//! Puts the controlling terminal in raw mode, then:
//! - prints the new dimensions whenever the window is resized
//! - prints the value of every byte typed
//! - restores the terminal and exits when `q` is typed
//!
//! Exit codes:
//! - 0: Terminal restored cleanly
//! - 1: The terminal could not be set up or restored
//!
//! # Environment Variables
//!
//! - `DEBUG`: When set, enables debug logging to stderr (`RUST_LOG` refines
//!   the filter).

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::AsFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use nix::poll::{PollFd, PollFlags, poll};
use tracing::debug;
use ttymode::{Dimensions, DrainNotifier, Options, ScreenBuffer, TerminalSession};

/// Tracks the size the screen was last resized to.
#[derive(Debug, Default)]
struct Screen {
    size: Dimensions,
}

impl ScreenBuffer for Screen {
    fn resize(&mut self, cols: u16, rows: u16) {
        self.size = Dimensions::new(cols, rows);
    }
}

/// Reads bytes until `stop` is set, then signals the drain.
///
/// The poll timeout bounds how long a stop request can go unnoticed while no
/// input arrives.
fn read_input(mut input: File, tx: Sender<u8>, stop: &AtomicBool, notifier: DrainNotifier) {
    let mut buf = [0u8; 64];
    while !stop.load(Ordering::Acquire) {
        let pollfd = PollFd::new(input.as_fd(), PollFlags::POLLIN);
        match poll(&mut [pollfd], 100_u8) {
            Ok(0) => {}
            Ok(_) => match input.read(&mut buf) {
                Ok(0) => {
                    debug!("got EOF");
                    break;
                }
                Ok(n) => {
                    if buf[..n].iter().any(|&byte| tx.send(byte).is_err()) {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("error reading from terminal: {e}");
                    break;
                }
            },
            Err(nix::errno::Errno::EINTR) => {}
            Err(e) => {
                debug!("error polling terminal: {e}");
                break;
            }
        }
    }
    notifier.notify();
}

/// Echoes input and resize events until `q` is typed or input ends.
fn run(session: &TerminalSession, screen: &mut Screen, input: &Receiver<u8>) -> Result<()> {
    let mut out = session.output().context("Terminal output is not open")?;
    write!(out, "{}x{}, press q to quit\r\n", screen.size.cols, screen.size.rows)?;

    loop {
        while session.resize_events().try_recv().is_ok() {
            if ttymode::resize_if_known(screen, session.query_dimensions()).is_some() {
                write!(out, "resized to {}x{}\r\n", screen.size.cols, screen.size.rows)?;
            }
        }

        match input.recv_timeout(Duration::from_millis(50)) {
            Ok(b'q') => return Ok(()),
            Ok(byte) => write!(out, "{byte:#04x}\r\n")?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

fn main() -> Result<()> {
    ttymode::init_logging();

    let mut screen = Screen::default();
    let mut session = TerminalSession::new(Options::default());
    session
        .init(&mut screen)
        .context("Failed to put terminal in raw mode")?;

    let (input, notifier) = session
        .input_reader()
        .context("Failed to hand out terminal input")?;

    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let reader = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || read_input(input, tx, &stop, notifier))
    };

    let result = run(&session, &mut screen, &rx);

    stop.store(true, Ordering::Release);
    session
        .finalize()
        .context("Failed to restore terminal")?;
    if reader.join().is_err() {
        debug!("input thread panicked");
    }

    result
}
