//! Raw-mode configuration of the terminal line discipline.
//!
//! This module provides functions for:
//! - Capturing the terminal's original configuration and baud rate
//! - Deriving the raw configuration from that snapshot
//! - Applying raw mode and restoring the original configuration

use std::io;
use std::os::fd::BorrowedFd;

use termios::{
    BRKINT, CS8, CSIZE, ECHO, ECHONL, ICANON, ICRNL, IEXTEN, IGNBRK, IGNCR, INLCR, ISIG, ISTRIP,
    IXON, OPOST, PARENB, PARMRK, Termios, VMIN, VTIME, cfgetospeed, speed_t, tcflag_t,
};
use tracing::debug;

use crate::control::{ApplyMode, DeviceControl};
use crate::error::Error;

/// Input-processing flags cleared in raw mode: break handling, parity
/// marking, stripping, newline translation and flow control.
pub const RAW_CLEARED_INPUT: tcflag_t =
    IGNBRK | BRKINT | PARMRK | ISTRIP | INLCR | IGNCR | ICRNL | IXON;

/// Output-processing flags cleared in raw mode.
pub const RAW_CLEARED_OUTPUT: tcflag_t = OPOST;

/// Local-processing flags cleared in raw mode: echo, canonical input, signal
/// keys and extended input processing.
pub const RAW_CLEARED_LOCAL: tcflag_t = ECHO | ECHONL | ICANON | ISIG | IEXTEN;

/// Control flags cleared in raw mode before `CS8` is set.
pub const RAW_CLEARED_CONTROL: tcflag_t = CSIZE | PARENB;

/// The terminal configuration captured before raw mode was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalConfig {
    config: Termios,
    baud_rate: u32,
}

impl OriginalConfig {
    /// The captured configuration.
    #[must_use]
    pub fn config(&self) -> &Termios {
        &self.config
    }

    /// Output baud rate at capture time. Zero when the speed is unknown.
    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// The raw configuration derived from this snapshot.
    #[must_use]
    pub fn raw(&self) -> Termios {
        let mut raw = self.config;
        make_raw(&mut raw);
        raw
    }
}

/// Reads the terminal configuration behind `fd`.
///
/// # Arguments
///
/// * `control` - Device-control implementation used for the query.
/// * `fd` - Any open handle on the terminal.
///
/// # Returns
///
/// The configuration together with its output baud rate.
///
/// # Errors
///
/// Returns [`Error::ConfigQuery`] if `fd` is not a terminal or the query is
/// refused.
pub fn capture_original<C: DeviceControl + ?Sized>(
    control: &C,
    fd: BorrowedFd<'_>,
) -> Result<OriginalConfig, Error> {
    let config = control.get_config(fd).map_err(Error::ConfigQuery)?;
    let baud_rate = baud_rate(&config);
    debug!(baud_rate, "captured original terminal configuration");
    Ok(OriginalConfig { config, baud_rate })
}

/// Switches a configuration to raw mode in place.
///
/// Reads block until at least one byte is available, with no inter-byte
/// timeout. Non-blocking reads hang on close on some platforms; the input
/// task is instead stopped through the drain handshake.
pub fn make_raw(config: &mut Termios) {
    config.c_iflag &= !RAW_CLEARED_INPUT;
    config.c_oflag &= !RAW_CLEARED_OUTPUT;
    config.c_lflag &= !RAW_CLEARED_LOCAL;
    config.c_cflag &= !RAW_CLEARED_CONTROL;
    config.c_cflag |= CS8;

    config.c_cc[VMIN] = 1;
    config.c_cc[VTIME] = 0;
}

/// Applies the raw configuration derived from `original`.
///
/// # Arguments
///
/// * `control` - Device-control implementation used for the write.
/// * `fd` - The handle carrying device control (the output handle).
/// * `original` - Snapshot the raw configuration is derived from.
///
/// # Returns
///
/// The configuration that was written.
///
/// # Errors
///
/// Returns [`Error::ConfigApply`] if the write fails. The terminal is then
/// still in its original configuration.
pub fn apply_raw<C: DeviceControl + ?Sized>(
    control: &C,
    fd: BorrowedFd<'_>,
    original: &OriginalConfig,
) -> Result<Termios, Error> {
    let raw = original.raw();
    control
        .set_config(fd, ApplyMode::Now, &raw)
        .map_err(Error::ConfigApply)?;
    debug!("terminal switched to raw mode");
    Ok(raw)
}

/// Writes the captured configuration back.
///
/// With [`ApplyMode::Now`] output still queued in the driver may be left
/// unflushed.
///
/// # Arguments
///
/// * `control` - Device-control implementation used for the write.
/// * `fd` - The handle carrying device control (the output handle).
/// * `mode` - When the change takes effect.
/// * `original` - Snapshot taken before raw mode was entered.
///
/// # Errors
///
/// Returns the OS error of the write. Callers report it and carry on.
pub fn restore_original<C: DeviceControl + ?Sized>(
    control: &C,
    fd: BorrowedFd<'_>,
    mode: ApplyMode,
    original: &OriginalConfig,
) -> io::Result<()> {
    control.set_config(fd, mode, original.config())?;
    debug!(?mode, "original terminal configuration restored");
    Ok(())
}

/// Output baud rate of `config` as an integer.
#[must_use]
pub fn baud_rate(config: &Termios) -> u32 {
    speed_to_baud(cfgetospeed(config))
}

// Linux encodes speeds as `B*` codes rather than rates.
#[cfg(target_os = "linux")]
fn speed_to_baud(speed: speed_t) -> u32 {
    use termios::os::linux::{
        B57600, B115200, B230400, B460800, B500000, B576000, B921600, B1000000, B1152000,
        B1500000, B2000000, B2500000, B3000000, B3500000, B4000000,
    };
    use termios::{
        B0, B50, B75, B110, B134, B150, B200, B300, B600, B1200, B1800, B2400, B4800, B9600,
        B19200, B38400,
    };

    match speed {
        B0 => 0,
        B50 => 50,
        B75 => 75,
        B110 => 110,
        B134 => 134,
        B150 => 150,
        B200 => 200,
        B300 => 300,
        B600 => 600,
        B1200 => 1200,
        B1800 => 1800,
        B2400 => 2400,
        B4800 => 4800,
        B9600 => 9600,
        B19200 => 19200,
        B38400 => 38400,
        B57600 => 57600,
        B115200 => 115_200,
        B230400 => 230_400,
        B460800 => 460_800,
        B500000 => 500_000,
        B576000 => 576_000,
        B921600 => 921_600,
        B1000000 => 1_000_000,
        B1152000 => 1_152_000,
        B1500000 => 1_500_000,
        B2000000 => 2_000_000,
        B2500000 => 2_500_000,
        B3000000 => 3_000_000,
        B3500000 => 3_500_000,
        B4000000 => 4_000_000,
        _ => 0,
    }
}

#[cfg(not(target_os = "linux"))]
fn speed_to_baud(speed: speed_t) -> u32 {
    u32::try_from(speed).unwrap_or(0)
}
