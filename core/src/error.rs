//! Crate-wide error wrapper.
//!
//! Each subsystem owns its own `thiserror`-derived error enum (mirroring the
//! ancestor codebase's per-area `EntityError`/`EntityAuthError` split rather
//! than one giant error type). `CoreError` exists only at the [`crate::sim_core::SimCore`]
//! facade boundary, where callers want a single `Result` type to propagate.

use thiserror::Error;

use crate::authority::AuthorityError;
use crate::ghost::GhostError;
use crate::ids::IdAllocatorError;
use crate::lifecycle::LifecycleError;
use crate::registry::RegistryError;
use crate::replay::ReplayError;
use crate::time::TimeError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    IdAllocator(#[from] IdAllocatorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Ghost(#[from] GhostError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Replay(#[from] ReplayError),
}
