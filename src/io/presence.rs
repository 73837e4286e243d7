//! Presence-detector suppression channel.
//!
//! The sensor process reads a single `'0'`/`'1'` character from a named FIFO
//! to enable or suppress its heat-source presence detector. The FIFO is
//! opened non-blocking so a missing reader (sensor process down or
//! restarting) surfaces as an error instead of hanging the UI loop; writes
//! are best-effort and never retried inline; the minute-boundary resend
//! covers a reader that was away.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::core::errors::{PanelError, Result};

/// What the detector should be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceMode {
    /// Detector runs; `'1'` on the wire.
    Enabled,
    /// Detector suppressed; `'0'` on the wire.
    Suppressed,
}

impl PresenceMode {
    /// Wire encoding.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Enabled => b'1',
            Self::Suppressed => b'0',
        }
    }
}

/// Writer half of the suppression FIFO.
#[derive(Debug, Clone)]
pub struct PresenceChannel {
    fifo: PathBuf,
}

impl PresenceChannel {
    /// Channel backed by the given FIFO path.
    #[must_use]
    pub fn new(fifo: impl Into<PathBuf>) -> Self {
        Self { fifo: fifo.into() }
    }

    /// FIFO path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.fifo
    }

    /// Write the mode character. Fails fast (`ENXIO`) when no reader has the
    /// FIFO open rather than blocking the caller.
    pub fn write_mode(&self, mode: PresenceMode) -> Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt as _;
            options.custom_flags(nix::libc::O_NONBLOCK);
        }
        let mut file = options
            .open(&self.fifo)
            .map_err(|source| PanelError::SuppressionWrite {
                path: self.fifo.clone(),
                source,
            })?;
        file.write_all(&[mode.as_byte()])
            .map_err(|source| PanelError::SuppressionWrite {
                path: self.fifo.clone(),
                source,
            })?;
        Ok(())
    }
}
