//! NetworkIdAllocator (§4.A) — block-based unique id allocation with
//! low-water refill, and the id-authority counter that answers block
//! requests (§4.A.1).

mod allocator;
mod authority;

pub use allocator::NetworkIdAllocator;
pub use authority::IdAuthority;

use thiserror::Error;

use crate::types::NetworkId;

/// Implemented by whatever owns graveyard membership (`EntityIdRegistry`),
/// so `NetworkIdAllocator::add_block` can reject blocks that intersect it
/// without a hard dependency between the two modules.
pub trait GraveyardCheck {
    fn is_graveyard(&self, id: NetworkId) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IdBlockRequest {
    pub client_id: String,
    pub request_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IdBlockResponse {
    pub client_id: String,
    pub start_id: u64,
    pub count: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdAllocatorError {
    #[error("id block [{start}, {end}) intersects the graveyard")]
    BlockIntersectsGraveyard { start: u64, end: u64 },

    #[error("id block request exhausted {attempts} retry attempts for client {client_id}")]
    RequestRetriesExhausted { client_id: String, attempts: u32 },

    #[error("local id pool is empty")]
    PoolExhausted,
}
