use thiserror::Error;

use crate::psr::Priority;
use crate::word::Word;

/// Failures the machine can surface to its caller. Interruptable outcomes
/// (traps, exceptions, I/O interrupts) are deliberately not here: they are
/// control flow, carried by [`crate::engine::Fault`] and consumed inside the
/// run loop.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O-page access hit an address with no mapped device.
    #[error("no device mapped at {addr}")]
    NoDevice { addr: Word },

    /// A memory access failed; wraps the underlying device or routing
    /// failure and carries the offending address.
    #[error("memory error at {addr}")]
    Memory {
        addr: Word,
        #[source]
        source: Box<Error>,
    },

    /// A user-mode access touched privileged memory. Surfaces as an ACV
    /// exception inside the run loop; callers only see it from the direct
    /// memory API.
    #[error("access control violation at {addr}")]
    AccessControl { addr: Word },

    /// The object loader rejected its input or failed to write it.
    #[error("object loader")]
    Loader(#[from] LoaderError),

    /// An interrupt descriptor slot was claimed twice. The original
    /// registration is kept.
    #[error("interrupt descriptor table: {priority} already registered")]
    PriorityClaimed { priority: Priority },

    /// The run loop was cancelled from outside.
    #[error("cancelled: {reason}")]
    Cancelled { reason: String },
}

/// Why an object stream was rejected.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("object too short: {0} bytes")]
    TooShort(usize),

    #[error("object length {0} is not an even number of bytes")]
    OddLength(usize),

    #[error("object has no code")]
    Empty,

    #[error("store at {addr} while loading")]
    Store {
        addr: Word,
        #[source]
        source: Box<Error>,
    },
}
