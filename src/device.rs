//! Terminal device handles.
//!
//! The terminal is opened twice: a read-only handle for the input task and a
//! write-only handle for output and device control. Either both handles are
//! held or neither is.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{Access, Error, TeardownFailure, TeardownStep};

/// The pair of handles on an open terminal device.
#[derive(Debug)]
pub struct DeviceHandles {
    input: File,
    output: File,
}

impl DeviceHandles {
    /// Opens `path` for reading and then for writing.
    ///
    /// If the write open fails, the read handle is released before the error
    /// is returned.
    ///
    /// # Arguments
    ///
    /// * `path` - The terminal device, normally `/dev/tty`.
    ///
    /// # Returns
    ///
    /// Both handles; never just one of them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceOpen`] naming the access mode that failed.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let input = open_one(path, Access::Read)?;
        let output = match open_one(path, Access::Write) {
            Ok(output) => output,
            Err(err) => {
                if let Err(close_err) = close_handle(input) {
                    debug!(%close_err, "failed to release input handle after open failure");
                }
                return Err(err);
            }
        };
        Ok(Self { input, output })
    }

    /// The read-only handle.
    #[must_use]
    pub fn input(&self) -> &File {
        &self.input
    }

    /// The write-only handle.
    #[must_use]
    pub fn output(&self) -> &File {
        &self.output
    }

    /// Closes the output handle, then the input handle.
    ///
    /// Both closes are attempted; every failure is returned.
    pub fn close(self) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();
        if let Err(source) = close_handle(self.output) {
            failures.push(TeardownFailure {
                step: TeardownStep::CloseOutput,
                source,
            });
        }
        if let Err(source) = close_handle(self.input) {
            failures.push(TeardownFailure {
                step: TeardownStep::CloseInput,
                source,
            });
        }
        failures
    }
}

fn open_one(path: &Path, access: Access) -> Result<File, Error> {
    let mut options = OpenOptions::new();
    match access {
        Access::Read => options.read(true),
        Access::Write => options.write(true),
    };
    options.open(path).map_err(|source| Error::DeviceOpen {
        path: path.to_path_buf(),
        access,
        source,
    })
}

/// Closes `file`, reporting the error `close(2)` returns.
///
/// Dropping a `File` silently discards close errors.
fn close_handle(file: File) -> io::Result<()> {
    nix::unistd::close(file).map_err(io::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Pty;
    use anyhow::Result;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_open_both_handles_on_pty() -> Result<()> {
        let pty = Pty::open()?;
        let handles = DeviceHandles::open(&pty.path)?;
        handles.output().write_all(b"ok")?;
        assert!(handles.close().is_empty());
        Ok(())
    }

    #[test]
    fn test_close_handle_reports_success() -> Result<()> {
        let pty = Pty::open()?;
        let file = OpenOptions::new().read(true).open(&pty.path)?;
        close_handle(file)?;
        Ok(())
    }

    #[test]
    fn test_open_missing_device_fails_on_read() {
        let err = DeviceHandles::open(Path::new("/nonexistent/tty")).unwrap_err();
        match err {
            Error::DeviceOpen { access, source, .. } => {
                assert_eq!(access, Access::Read);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_open_directory_fails_on_write() {
        // A directory opens read-only but refuses write access.
        let dir = env::temp_dir();
        let err = DeviceHandles::open(&dir).unwrap_err();
        match err {
            Error::DeviceOpen { path, access, .. } => {
                assert_eq!(path, dir);
                assert_eq!(access, Access::Write);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
