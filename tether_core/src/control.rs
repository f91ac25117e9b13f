use crate::error::DriverError;
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{FromRawFd, RawFd};

/// Size of the length header the engine sends before every iteration.
pub const LENGTH_HEADER_SIZE: usize = std::mem::size_of::<u64>();

/// The engine's control stream: length headers in, done tags out.
#[derive(Debug)]
pub struct ControlChannel<S = File> {
    stream: S,
    done_tag: u8,
}

impl ControlChannel<File> {
    /// Adopts the engine's control descriptor.
    ///
    /// # Safety
    /// `fd` must be an open descriptor that nothing else in the process reads,
    /// writes or closes; the channel owns it from here on.
    pub unsafe fn from_raw_fd(fd: RawFd, done_tag: u8) -> Self {
        // SAFETY: ownership transfer guaranteed by the caller.
        let stream = unsafe { File::from_raw_fd(fd) };
        Self::new(stream, done_tag)
    }
}

impl<S: Read + Write> ControlChannel<S> {
    pub fn new(stream: S, done_tag: u8) -> Self {
        Self { stream, done_tag }
    }

    /// Tells the engine the previous iteration finished.
    pub fn send_done(&mut self) -> Result<(), DriverError> {
        self.stream
            .write_all(&[self.done_tag])
            .and_then(|()| self.stream.flush())
            .map_err(DriverError::DoneTagWrite)?;
        tracing::trace!("done tag sent");
        Ok(())
    }

    /// Blocks until the engine announces the next input length.
    pub fn recv_len(&mut self) -> Result<u64, DriverError> {
        let mut header = [0u8; LENGTH_HEADER_SIZE];
        self.stream
            .read_exact(&mut header)
            .map_err(DriverError::LengthRead)?;
        let len = u64::from_ne_bytes(header);
        tracing::trace!(len, "length header received");
        Ok(len)
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}
