//! Error types for terminal session operations.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::session::State;

/// Errors raised while driving a [`TerminalSession`](crate::TerminalSession).
#[derive(Debug, Error)]
pub enum Error {
    /// The terminal device could not be opened.
    #[error("failed to open {} for {access}: {source}", .path.display())]
    DeviceOpen {
        /// Device path that was opened.
        path: PathBuf,
        /// Which of the two handles failed.
        access: Access,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Reading the terminal configuration failed.
    #[error("failed to query terminal configuration: {0}")]
    ConfigQuery(#[source] io::Error),

    /// Writing the raw configuration failed.
    #[error("failed to apply raw terminal configuration: {0}")]
    ConfigApply(#[source] io::Error),

    /// Registering for window-change notifications failed.
    #[error("failed to subscribe to window-change notifications: {0}")]
    Subscribe(#[source] io::Error),

    /// Querying the window geometry failed.
    #[error("failed to query window size: {0}")]
    SizeQuery(#[source] io::Error),

    /// Duplicating the input handle for the reader task failed.
    #[error("failed to duplicate terminal input handle: {0}")]
    InputClone(#[source] io::Error),

    /// One or more teardown steps failed. Every step was still attempted.
    #[error("terminal teardown failed: {}", join_failures(.0))]
    Teardown(Vec<TeardownFailure>),

    /// The operation is not valid in the session's current state.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: State,
    },

    /// The input reader and its drain notifier were already handed out.
    #[error("the input reader was already handed out")]
    ReaderTaken,

    /// The session was already finalized.
    #[error("terminal session is already closed")]
    Closed,
}

/// Access mode of a terminal device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The read-only input handle.
    Read,
    /// The write-only output handle.
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("reading"),
            Access::Write => f.write_str("writing"),
        }
    }
}

/// A single failed teardown step.
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct TeardownFailure {
    /// Step that failed.
    pub step: TeardownStep,
    /// Underlying OS error.
    #[source]
    pub source: io::Error,
}

/// Teardown steps that can fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    /// Writing the original configuration back.
    RestoreConfig,
    /// Closing the write-only handle.
    CloseOutput,
    /// Closing the read-only handle.
    CloseInput,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownStep::RestoreConfig => f.write_str("restoring terminal configuration"),
            TeardownStep::CloseOutput => f.write_str("closing output handle"),
            TeardownStep::CloseInput => f.write_str("closing input handle"),
        }
    }
}

fn join_failures(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_open_message_names_path_and_access() {
        let err = Error::DeviceOpen {
            path: PathBuf::from("/dev/tty"),
            access: Access::Write,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to open /dev/tty for writing: "));
    }

    #[test]
    fn test_teardown_message_lists_every_step() {
        let err = Error::Teardown(vec![
            TeardownFailure {
                step: TeardownStep::RestoreConfig,
                source: io::Error::other("EIO"),
            },
            TeardownFailure {
                step: TeardownStep::CloseInput,
                source: io::Error::other("EBADF"),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "terminal teardown failed: restoring terminal configuration: EIO; closing input handle: EBADF"
        );
    }

    #[test]
    fn test_invalid_state_message() {
        let err = Error::InvalidState {
            operation: "query window size",
            state: State::Closed,
        };
        assert_eq!(
            err.to_string(),
            "cannot query window size while session is closed"
        );
    }
}
