//! `EntityIdRegistry` (§4.B) — the bidirectional network-id/entity map with
//! a timed graveyard that prevents a reclaimed id being handed back out
//! while a destroy is still in flight elsewhere in the federation.
//!
//! Also owns the orphan cleanup pass (§3.1): a child whose `PartMetadata`
//! parent has died is destroyed within the same sweep that prunes the
//! graveyard.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::host::Host;
use crate::ids::GraveyardCheck;
use crate::types::{EntityHandle, NetworkId, Tick};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("network id {0} is already registered")]
    AlreadyRegistered(u64),

    #[error("network id {0} is in the graveyard")]
    InGraveyard(u64),

    #[error("network id {0} is not registered")]
    NotRegistered(u64),
}

/// A child entity's routing metadata (§3's `PartMetadata`): which parent it
/// belongs to, so the orphan cleanup pass can find it.
pub struct PartMetadata<E> {
    pub parent: E,
    pub instance_id: u32,
    pub descriptor_ordinal: u32,
}

pub struct EntityIdRegistry<E> {
    forward: HashMap<u64, E>,
    reverse: HashMap<E, u64>,
    graveyard: HashMap<u64, Tick>,
    graveyard_ticks: u64,
}

impl<E> EntityIdRegistry<E>
where
    E: EntityHandle,
{
    pub fn new(graveyard_ticks: u64) -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
            graveyard: HashMap::new(),
            graveyard_ticks,
        }
    }

    pub fn register(&mut self, id: NetworkId, entity: E) -> Result<(), RegistryError> {
        if self.graveyard.contains_key(&id.0) {
            return Err(RegistryError::InGraveyard(id.0));
        }
        if self.forward.contains_key(&id.0) {
            return Err(RegistryError::AlreadyRegistered(id.0));
        }
        self.forward.insert(id.0, entity);
        self.reverse.insert(entity, id.0);
        Ok(())
    }

    pub fn unregister(&mut self, id: NetworkId, current_tick: Tick) -> Result<(), RegistryError> {
        let entity = self
            .forward
            .remove(&id.0)
            .ok_or(RegistryError::NotRegistered(id.0))?;
        self.reverse.remove(&entity);
        self.graveyard.insert(id.0, current_tick);
        Ok(())
    }

    pub fn resolve(&self, id: NetworkId) -> Option<E> {
        self.forward.get(&id.0).copied()
    }

    pub fn reverse(&self, entity: E) -> Option<NetworkId> {
        self.reverse.get(&entity).copied().map(NetworkId)
    }

    pub fn is_graveyard(&self, id: NetworkId) -> bool {
        self.graveyard.contains_key(&id.0)
    }

    /// Remove graveyard entries whose cooldown (`G` ticks) has elapsed.
    pub fn prune(&mut self, current_tick: Tick) {
        self.graveyard
            .retain(|_, death_tick| current_tick.saturating_sub(*death_tick) < self.graveyard_ticks);
    }

    /// Unregister any id whose entity is no longer alive in the host.
    pub fn prune_dead(&mut self, host: &dyn Host<Entity = E>, current_tick: Tick) {
        let dead: Vec<u64> = self
            .forward
            .iter()
            .filter(|(_, entity)| !host.is_alive(**entity))
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            debug!("EntityIdRegistry: pruning dead entity for net id {}", id);
            let _ = self.unregister(NetworkId(id), current_tick);
        }
    }

    /// The orphan cleanup pass (§3.1): destroy any child whose `PartMetadata`
    /// parent is no longer alive in the host.
    pub fn prune_orphans(
        &mut self,
        host: &mut dyn Host<Entity = E>,
        parts: &HashMap<E, PartMetadata<E>>,
        current_tick: Tick,
    ) {
        let orphans: Vec<E> = parts
            .iter()
            .filter(|(_, meta)| !host.is_alive(meta.parent))
            .map(|(child, _)| *child)
            .collect();
        for child in orphans {
            debug!("EntityIdRegistry: destroying orphaned child entity");
            if let Some(id) = self.reverse(child) {
                let _ = self.unregister(id, current_tick);
            }
            host.destroy_entity(child);
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<E> GraveyardCheck for EntityIdRegistry<E>
where
    E: EntityHandle,
{
    fn is_graveyard(&self, id: NetworkId) -> bool {
        EntityIdRegistry::is_graveyard(self, id)
    }
}
