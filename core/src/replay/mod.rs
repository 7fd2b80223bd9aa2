//! `ReplayRecorder` (§4.H) — frame-accurate snapshot capture and
//! deterministic playback, plus optional divergence detection (§4.H.1)
//! against a re-simulated run.

mod container;
mod recorder;
mod snapshot;

pub use recorder::{PlaybackSpeed, ReplayRecorder};
pub use snapshot::{ComponentRecord, EntityRecord, EventRecord, FrameSnapshot, NetworkInputRecord, UserInputRecord};

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay container is missing the FDP_REC magic header")]
    BadMagic,

    #[error("unsupported replay container version {0}")]
    UnsupportedVersion(u32),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("replay codec error: {0}")]
    Codec(#[from] Box<bincode::ErrorKind>),
}

/// `(entity id, type_tag)` mismatch found by [`ReplayRecorder::compare_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivergenceReport {
    pub id: u64,
    pub type_tag: u32,
    pub byte_offset: usize,
}

/// Supplies, per component `type_tag`, the byte ranges that hold
/// floating-point fields (§4.H.1) — those compare with `1e-3` relative
/// tolerance rather than bit-exact.
pub trait FloatFieldRegistry {
    fn float_ranges(&self, type_tag: u32) -> &[(usize, usize)];
}

/// A registry with no floating-point fields registered; every component
/// compares bit-exact. Useful for tests and all-integer payloads.
pub struct NoFloatFields;

impl FloatFieldRegistry for NoFloatFields {
    fn float_ranges(&self, _type_tag: u32) -> &[(usize, usize)] {
        &[]
    }
}
