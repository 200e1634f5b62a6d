//! Deterministic snapshot encoding for the tandem timing core.
//!
//! The format is a small tag-length-value (TLV) encoding providing:
//! - deterministic byte output (fields written in canonical tag order)
//! - forward compatibility (unknown tags are skipped on load)
//! - explicit versioning (major/minor) per device
//!
//! Save-state round-trips must be bit-reproducible: identical state encodes to identical bytes,
//! and decoding then re-encoding is the identity.

#![forbid(unsafe_code)]

pub mod codec;
mod reader;
mod writer;

use thiserror::Error;

pub use reader::SnapshotReader;
pub use writer::SnapshotWriter;

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot truncated")]
    Truncated,

    #[error("device id mismatch (expected {expected:?}, found {found:?})")]
    DeviceIdMismatch { expected: [u8; 4], found: [u8; 4] },

    #[error("unsupported snapshot major version {found} (supported {supported})")]
    UnsupportedVersion { supported: u16, found: u16 },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field encoding: {0}")]
    InvalidFieldEncoding(&'static str),
}

/// Device snapshot version. Bump the minor for forward-compatible field additions; bump the major
/// only for breaking layout changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub major: u16,
    pub minor: u16,
}

impl SnapshotVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

/// Snapshotting contract for timing-core components.
///
/// Implementations must keep `DEVICE_ID` stable forever and only perform forward-compatible
/// additions within the same major version by adding new TLV fields.
pub trait IoSnapshot {
    const DEVICE_ID: [u8; 4];
    const DEVICE_VERSION: SnapshotVersion;

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()>;
}
