//! Window-size probing and the screen buffer seam.

use std::os::fd::BorrowedFd;

use crate::control::DeviceControl;
use crate::error::Error;

/// Terminal geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    /// Number of columns.
    pub cols: u16,
    /// Number of rows.
    pub rows: u16,
}

impl Dimensions {
    /// Create dimensions from columns and rows.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Whether both dimensions are non-zero.
    ///
    /// Terminals that do not track their geometry report zeros; such a
    /// result means "unknown" and must not be used to resize anything.
    #[must_use]
    pub const fn is_known(self) -> bool {
        self.cols != 0 && self.rows != 0
    }
}

/// The cell buffer a session seeds with the terminal's dimensions.
pub trait ScreenBuffer {
    /// Resize the buffer to `cols` x `rows` cells.
    fn resize(&mut self, cols: u16, rows: u16);
}

/// Queries the window geometry of the terminal behind `fd`.
///
/// # Errors
///
/// Returns [`Error::SizeQuery`] if the device-control query fails. Callers
/// should treat that the same as a zero-sized result.
pub fn query_dimensions<C: DeviceControl + ?Sized>(
    control: &C,
    fd: BorrowedFd<'_>,
) -> Result<Dimensions, Error> {
    control.window_size(fd).map_err(Error::SizeQuery)
}

/// Resizes `buffer` if `queried` holds known dimensions.
///
/// Returns the dimensions that were applied, if any.
pub fn resize_if_known<B: ScreenBuffer + ?Sized>(
    buffer: &mut B,
    queried: Result<Dimensions, Error>,
) -> Option<Dimensions> {
    match queried {
        Ok(size) if size.is_known() => {
            buffer.resize(size.cols, size.rows);
            Some(size)
        }
        Ok(size) => {
            tracing::debug!(?size, "window size unknown, leaving screen buffer as is");
            None
        }
        Err(err) => {
            tracing::debug!(%err, "window size query failed, leaving screen buffer as is");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Ioctl;
    use crate::testutil::{Pty, RecordingScreen};
    use anyhow::Result;
    use std::fs::File;
    use std::io;
    use std::os::fd::AsFd;

    #[test]
    fn test_is_known() {
        assert!(Dimensions::new(80, 24).is_known());
        assert!(!Dimensions::new(0, 24).is_known());
        assert!(!Dimensions::new(80, 0).is_known());
        assert!(!Dimensions::default().is_known());
    }

    #[test]
    fn test_query_dimensions_on_pty() -> Result<()> {
        let pty = Pty::with_size(100, 30)?;
        let size = query_dimensions(&Ioctl, pty.slave.as_fd())?;
        assert_eq!(size, Dimensions::new(100, 30));
        Ok(())
    }

    #[test]
    fn test_query_dimensions_on_non_terminal_fails() -> Result<()> {
        let null = File::open("/dev/null")?;
        let err = query_dimensions(&Ioctl, null.as_fd()).unwrap_err();
        assert!(matches!(err, Error::SizeQuery(_)));
        Ok(())
    }

    #[test]
    fn test_resize_if_known_skips_unknown_and_errors() {
        let mut screen = RecordingScreen::default();

        assert_eq!(resize_if_known(&mut screen, Ok(Dimensions::new(0, 0))), None);
        let failed = Err(Error::SizeQuery(io::Error::other("ENOTTY")));
        assert_eq!(resize_if_known(&mut screen, failed), None);
        assert!(screen.resizes.is_empty());

        let applied = resize_if_known(&mut screen, Ok(Dimensions::new(80, 24)));
        assert_eq!(applied, Some(Dimensions::new(80, 24)));
        assert_eq!(screen.resizes, vec![(80, 24)]);
    }
}
