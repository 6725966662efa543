//! Named pipe endpoint.

use super::DispatchError;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::stat::Mode;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;

/// Opens the write end of the publishing channel.
pub trait PipeConnector {
    /// Writer for one connected lifetime.
    type Writer: Write;

    /// Tries to connect to `path`.
    ///
    /// Returns `Ok(None)` while no reader is attached; the caller retries
    /// on its next tick.
    fn connect(&mut self, path: &Path) -> Result<Option<Self::Writer>, DispatchError>;
}

/// Connects to a FIFO on the filesystem, creating it when absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoConnector;

impl FifoConnector {
    /// Creates the FIFO at `path` unless it exists. Fails if something that
    /// is not a FIFO is in the way.
    pub fn ensure_fifo(path: &Path) -> Result<(), DispatchError> {
        let unavailable = |reason: String| DispatchError::PipeUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        match std::fs::metadata(path) {
            Ok(meta) if meta.file_type().is_fifo() => Ok(()),
            Ok(_) => Err(unavailable("exists and is not a FIFO".to_owned())),
            Err(_) => {
                nix::unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR)
                    .map_err(|e| unavailable(format!("mkfifo: {e}")))?;
                tracing::info!(path = %path.display(), "Created FIFO");
                Ok(())
            }
        }
    }
}

impl FifoConnector {
    /// Clears `O_NONBLOCK` so each line is written whole.
    fn set_blocking(file: &File) -> Result<(), String> {
        let fd = file.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| format!("F_GETFL: {e}"))?;
        let flags = OFlag::from_bits_truncate(flags) - OFlag::O_NONBLOCK;
        fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(|e| format!("F_SETFL: {e}"))?;
        Ok(())
    }
}

impl PipeConnector for FifoConnector {
    type Writer = File;

    fn connect(&mut self, path: &Path) -> Result<Option<File>, DispatchError> {
        Self::ensure_fifo(path)?;

        // Non-blocking so a missing reader shows up as ENXIO instead of
        // parking the thread where it cannot see shutdown.
        match OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)
        {
            Ok(file) => {
                Self::set_blocking(&file).map_err(|reason| DispatchError::PipeUnavailable {
                    path: path.to_path_buf(),
                    reason,
                })?;
                Ok(Some(file))
            }
            Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => Ok(None),
            Err(e) => Err(DispatchError::PipeUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }
}
