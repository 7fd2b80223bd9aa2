//! `AuthorityStore` (§4.E) — entity-wide primary ownership plus
//! per-descriptor overrides, with hierarchical fallback through a child's
//! `PartMetadata` chain to its root.
//!
//! The host ECS is the system of record for `PrimaryAuthority` and
//! `DescriptorOwnership` (both ordinary attributes, per §3); this module
//! only adds the resolution logic and the change-detection pass described
//! in §4.E. Since [`crate::host::Host`] has no query/iteration surface,
//! `diff_and_emit` takes the candidate entity set explicitly — the caller
//! (typically `SimCore`) already tracks which entities carry ownership
//! state.

use std::collections::HashMap;

use thiserror::Error;

use crate::host::{Attribute, Host};
use crate::registry::PartMetadata;
use crate::types::{EntityHandle, NodeId, PackedKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("ownership update refers to an unregistered entity")]
    UnknownEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryAuthority {
    pub owner_node: NodeId,
    pub local_node: NodeId,
}

impl PrimaryAuthority {
    pub fn has_authority(&self) -> bool {
        self.owner_node == self.local_node
    }
}

#[derive(Debug, Default, Clone)]
pub struct DescriptorOwnership {
    pub map: HashMap<PackedKey, NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipUpdate<E> {
    pub entity: E,
    pub key: PackedKey,
    pub new_owner: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityChanged<E> {
    pub entity: E,
    pub key: PackedKey,
    pub is_authoritative: bool,
}

pub struct AuthorityStore<E: EntityHandle> {
    snapshot: HashMap<(E, PackedKey), NodeId>,
    outbound: Vec<OwnershipUpdate<E>>,
    changed: Vec<AuthorityChanged<E>>,
}

impl<E: EntityHandle> Default for AuthorityStore<E> {
    fn default() -> Self {
        Self {
            snapshot: HashMap::new(),
            outbound: Vec::new(),
            changed: Vec::new(),
        }
    }
}

impl<E: EntityHandle> AuthorityStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `PartMetadata.parent` until an entity without part metadata is
    /// found; that's the authority root.
    pub fn resolve_root(&self, entity: E, parts: &HashMap<E, PartMetadata<E>>) -> E {
        let mut current = entity;
        let mut guard = 0;
        while let Some(meta) = parts.get(&current) {
            current = meta.parent;
            guard += 1;
            if guard > 64 {
                break; // malformed parent chain; stop rather than loop forever
            }
        }
        current
    }

    pub fn has_authority<H>(&self, entity: E, host: &H, parts: &HashMap<E, PartMetadata<E>>) -> bool
    where
        H: Host<Entity = E> + Attribute<PrimaryAuthority>,
    {
        let root = self.resolve_root(entity, parts);
        host.get(root).map(PrimaryAuthority::has_authority).unwrap_or(false)
    }

    pub fn has_authority_for_key<H>(
        &self,
        entity: E,
        key: PackedKey,
        host: &H,
        parts: &HashMap<E, PartMetadata<E>>,
    ) -> bool
    where
        H: Host<Entity = E> + Attribute<PrimaryAuthority> + Attribute<DescriptorOwnership>,
    {
        let root = self.resolve_root(entity, parts);
        if let Some(ownership) = Attribute::<DescriptorOwnership>::get(host, root) {
            if let Some(owner) = ownership.map.get(&key) {
                let local = host
                    .get(root)
                    .map(|p: &PrimaryAuthority| p.local_node)
                    .unwrap_or(NodeId(0));
                return *owner == local;
            }
        }
        self.has_authority(entity, host, parts)
    }

    pub fn set_owner<H>(&mut self, entity: E, key: PackedKey, node_id: NodeId, host: &mut H)
    where
        H: Host<Entity = E> + Attribute<DescriptorOwnership>,
    {
        let ownership = Attribute::<DescriptorOwnership>::get_mut(host, entity);
        match ownership {
            Some(ownership) => {
                ownership.map.insert(key, node_id);
            }
            None => {
                let mut ownership = DescriptorOwnership::default();
                ownership.map.insert(key, node_id);
                Attribute::<DescriptorOwnership>::set(host, entity, ownership);
            }
        }
    }

    /// Diff each candidate entity's `DescriptorOwnership.map` against the
    /// cached snapshot, queueing an `OwnershipUpdate` per changed key.
    pub fn diff_and_emit<H>(&mut self, candidates: impl IntoIterator<Item = E>, host: &H)
    where
        H: Host<Entity = E> + Attribute<DescriptorOwnership>,
    {
        for entity in candidates {
            let Some(ownership) = Attribute::<DescriptorOwnership>::get(host, entity) else {
                continue;
            };
            for (key, owner) in &ownership.map {
                let previous = self.snapshot.insert((entity, *key), *owner);
                if previous != Some(*owner) {
                    self.outbound.push(OwnershipUpdate {
                        entity,
                        key: *key,
                        new_owner: *owner,
                    });
                }
            }
        }
    }

    pub fn take_updates(&mut self) -> Vec<OwnershipUpdate<E>> {
        std::mem::take(&mut self.outbound)
    }

    /// Apply an incoming `OwnershipUpdate`, writing the map and queueing a
    /// local `AuthorityChanged` event for application systems.
    pub fn apply_update<H>(&mut self, update: OwnershipUpdate<E>, local_node: NodeId, host: &mut H)
    where
        H: Host<Entity = E> + Attribute<DescriptorOwnership>,
    {
        self.set_owner(update.entity, update.key, update.new_owner, host);
        self.snapshot.insert((update.entity, update.key), update.new_owner);
        self.changed.push(AuthorityChanged {
            entity: update.entity,
            key: update.key,
            is_authoritative: update.new_owner == local_node,
        });
    }

    pub fn take_changed_events(&mut self) -> Vec<AuthorityChanged<E>> {
        std::mem::take(&mut self.changed)
    }
}
