use crate::error::DriverError;
use memmap2::{Mmap, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::{FcntlArg, fcntl};
use std::os::fd::RawFd;

/// Read-only, shared view of the engine's input file.
///
/// The mapping covers the full agreed capacity and lives for as long as the
/// channel does. Only the engine writes the underlying file; each iteration
/// exposes the first `len` bytes announced over the control channel.
pub struct InputChannel {
    mmap: Mmap,
    fd: RawFd,
}

impl InputChannel {
    /// Returns `Ok(None)` when `fd` is closed, meaning no engine is attached.
    /// An open descriptor that cannot be mapped is an error.
    pub fn probe(fd: RawFd, capacity: usize) -> Result<Option<Self>, DriverError> {
        match fcntl(fd, FcntlArg::F_GETFD) {
            Err(Errno::EBADF) => {
                tracing::debug!(fd, "input descriptor is closed");
                Ok(None)
            }
            _ => Self::map(fd, capacity).map(Some),
        }
    }

    pub fn map(fd: RawFd, capacity: usize) -> Result<Self, DriverError> {
        // SAFETY: the mapping is read-only. The engine only rewrites the file
        // between iterations, while no slice handed out by `window` is alive.
        let mmap = unsafe { MmapOptions::new().len(capacity).map(fd) }.map_err(|source| {
            DriverError::InputMap {
                fd,
                size: capacity,
                source,
            }
        })?;
        tracing::debug!(fd, capacity, "input file mapped");
        Ok(Self { mmap, fd })
    }

    /// The bytes of the current iteration.
    pub fn window(&self, len: u64) -> Result<&[u8], DriverError> {
        let capacity = self.capacity();
        let end = usize::try_from(len)
            .ok()
            .filter(|end| *end <= capacity)
            .ok_or(DriverError::LengthOutOfBounds { len, capacity })?;
        Ok(&self.mmap[..end])
    }

    pub fn capacity(&self) -> usize {
        self.mmap.len()
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl std::fmt::Debug for InputChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputChannel")
            .field("fd", &self.fd)
            .field("capacity", &self.capacity())
            .finish()
    }
}
