use std::collections::HashMap;

use crate::types::{BlueprintId, NodeId, PackedKey, Tick};

/// Accumulates raw descriptor bytes for an entity the local node hasn't
/// promoted yet (§4.D). Removed entirely once the ghost promotes or is
/// pruned.
#[derive(Debug, Default, Clone)]
pub struct GhostStore {
    pub stash: HashMap<PackedKey, Vec<u8>>,
    pub first_seen_tick: Tick,
}

impl GhostStore {
    pub fn new(first_seen_tick: Tick) -> Self {
        Self {
            stash: HashMap::new(),
            first_seen_tick,
        }
    }
}

/// Attached once the master descriptor arrives, naming which blueprint this
/// ghost should promote into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    pub blueprint_id: BlueprintId,
    pub initiator: Option<NodeId>,
    pub identified_tick: Tick,
}

/// Routes sub-entity descriptors on a promoted parent entity.
#[derive(Debug, Default, Clone)]
pub struct ChildMap<E> {
    pub children: HashMap<u32, E>,
}

impl<E: Copy> ChildMap<E> {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
        }
    }

    pub fn get(&self, instance_id: u32) -> Option<E> {
        self.children.get(&instance_id).copied()
    }
}
