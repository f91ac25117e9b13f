use std::io;
use std::os::fd::RawFd;
use thiserror::Error;

/// Every way the driver can fail.
///
/// All variants except [`DriverError::FallbackRead`] are fatal: they mean the
/// engine and the target no longer agree on the handshake, or the target
/// itself misbehaved, and the process must terminate.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("mmap(fd={fd}, size={size}) of the input file failed: {source}")]
    InputMap {
        fd: RawFd,
        size: usize,
        #[source]
        source: io::Error,
    },
    #[error("writing the done tag to the control channel failed: {0}")]
    DoneTagWrite(#[source] io::Error),
    #[error("reading the length header from the control channel failed: {0}")]
    LengthRead(#[source] io::Error),
    #[error("engine announced {len} input bytes but the input buffer holds {capacity}")]
    LengthOutOfBounds { len: u64, capacity: usize },
    #[error("test callback returned '{0}' instead of '0'")]
    CallbackFailed(i32),
    #[error("no test callback supplied: implement `Harness::test_one_input` or pass a closure")]
    MissingTestCallback,
    #[error("`{0}` is not supported by this driver yet")]
    Unsupported(&'static str),
    #[error("couldn't read data from '{name}': {source}")]
    FallbackRead {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid driver configuration: {0}")]
    InvalidConfig(String),
}

impl DriverError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DriverError::FallbackRead { .. })
    }

    /// True when the engine hung up the control channel instead of sending
    /// the next length.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, DriverError::LengthRead(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
