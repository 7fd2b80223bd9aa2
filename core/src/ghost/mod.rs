//! `GhostEngine` (§4.D) — end-to-end ingress reconstruction of remote
//! entities: stash raw descriptor bytes for an unknown id, promote once a
//! blueprint's readiness predicate is satisfied, route post-promotion
//! descriptors to the parent or the right child.

mod blueprint;
mod store;

pub use blueprint::{Blueprint, BlueprintStore};
pub use store::{ChildMap, GhostStore, SpawnRequest};

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, warn};
use thiserror::Error;

use crate::config::GhostConfig;
use crate::descriptor::DescriptorRegistry;
use crate::host::{EntityCommandBuffer, Host};
use crate::lifecycle::LifecycleCoordinator;
use crate::registry::{EntityIdRegistry, PartMetadata};
use crate::types::{BlueprintId, EntityHandle, InstanceId, NetworkId, NodeId, PackedKey, Tick};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GhostError {
    #[error("network id {0} is in the graveyard, descriptor dropped")]
    GraveyardCollision(u64),

    #[error("no blueprint registered for id {0:?}")]
    BlueprintMissing(BlueprintId),
}

pub struct GhostEngine<E: EntityHandle> {
    config: GhostConfig,
    stores: HashMap<E, GhostStore>,
    spawn_requests: HashMap<E, SpawnRequest>,
    child_maps: HashMap<E, ChildMap<E>>,
    parts: HashMap<E, PartMetadata<E>>,
}

impl<E: EntityHandle> GhostEngine<E> {
    pub fn new(config: GhostConfig) -> Self {
        Self {
            config,
            stores: HashMap::new(),
            spawn_requests: HashMap::new(),
            child_maps: HashMap::new(),
            parts: HashMap::new(),
        }
    }

    pub fn parts(&self) -> &HashMap<E, PartMetadata<E>> {
        &self.parts
    }

    pub fn is_ghost(&self, entity: E) -> bool {
        self.stores.contains_key(&entity)
    }

    /// Allocate a local placeholder entity for `id`. Refused if `id` is
    /// currently in the registry's graveyard.
    pub fn create_ghost<H>(
        &mut self,
        id: NetworkId,
        tick: Tick,
        host: &mut H,
        registry: &mut EntityIdRegistry<E>,
    ) -> Result<E, GhostError>
    where
        H: Host<Entity = E>,
    {
        if registry.is_graveyard(id) {
            warn!("ghost creation for net id {} refused: in graveyard", id.0);
            return Err(GhostError::GraveyardCollision(id.0));
        }

        let entity = host.create_entity();
        registry
            .register(id, entity)
            .expect("freshly created entity cannot already be registered");
        self.stores.insert(entity, GhostStore::new(tick));
        Ok(entity)
    }

    /// Store raw descriptor bytes under `key` on a not-yet-promoted ghost.
    /// A no-op if `entity` is not (or no longer) a ghost.
    pub fn stash(&mut self, entity: E, key: PackedKey, bytes: Vec<u8>) {
        if let Some(store) = self.stores.get_mut(&entity) {
            store.stash.insert(key, bytes);
        }
    }

    /// Attach the `SpawnRequest` carried by a master descriptor.
    pub fn identify(&mut self, entity: E, blueprint_id: BlueprintId, initiator: Option<NodeId>, tick: Tick) {
        if self.stores.contains_key(&entity) {
            self.spawn_requests.insert(
                entity,
                SpawnRequest {
                    blueprint_id,
                    initiator,
                    identified_tick: tick,
                },
            );
        }
    }

    fn stashed_keys(&self, entity: E) -> std::collections::HashSet<PackedKey> {
        self.stores
            .get(&entity)
            .map(|s| s.stash.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Promote every ready ghost, deterministically ordered by
    /// `(identified_tick, network_id)`, bounded by `budget_ns` of wall time.
    #[allow(clippy::too_many_arguments)]
    pub fn promote_ready<H, B>(
        &mut self,
        current_tick: Tick,
        budget_ns: u64,
        host: &mut H,
        registry: &mut EntityIdRegistry<E>,
        descriptors: &DescriptorRegistry<H>,
        blueprints: &B,
        lifecycle: &mut LifecycleCoordinator<E>,
        cmd: &mut EntityCommandBuffer<H>,
    ) -> Result<(), GhostError>
    where
        H: Host<Entity = E>,
        B: BlueprintStore<H>,
    {
        let _ = current_tick;
        let budget = std::time::Duration::from_nanos(budget_ns);
        let started = Instant::now();

        let mut ready: Vec<(Tick, u64, E)> = self
            .spawn_requests
            .iter()
            .filter_map(|(entity, req)| {
                let blueprint = blueprints.get(req.blueprint_id)?;
                if blueprint.is_ready(&self.stashed_keys(*entity)) {
                    let net_id = registry.reverse(*entity).map(|n| n.0).unwrap_or(u64::MAX);
                    Some((req.identified_tick, net_id, *entity))
                } else {
                    None
                }
            })
            .collect();
        ready.sort_by_key(|(tick, net_id, _)| (*tick, *net_id));

        for (_, _, entity) in ready {
            if started.elapsed() > budget {
                break;
            }
            self.promote_one(entity, host, registry, descriptors, blueprints, lifecycle, cmd)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn promote_one<H, B>(
        &mut self,
        entity: E,
        host: &mut H,
        registry: &mut EntityIdRegistry<E>,
        descriptors: &DescriptorRegistry<H>,
        blueprints: &B,
        lifecycle: &mut LifecycleCoordinator<E>,
        cmd: &mut EntityCommandBuffer<H>,
    ) -> Result<(), GhostError>
    where
        H: Host<Entity = E>,
        B: BlueprintStore<H>,
    {
        let request = self.spawn_requests.remove(&entity).expect("checked ready above");
        let blueprint = blueprints
            .get(request.blueprint_id)
            .ok_or(GhostError::BlueprintMissing(request.blueprint_id))?;

        blueprint.apply_base(entity, cmd);

        let mut child_map = ChildMap::new();
        for (instance_id, child_blueprint_id) in blueprint.children() {
            let Some(child_blueprint) = blueprints.get(*child_blueprint_id) else {
                warn!("child blueprint {:?} missing, skipping child", child_blueprint_id);
                continue;
            };
            let child = host.create_entity();
            self.parts.insert(
                child,
                PartMetadata {
                    parent: entity,
                    instance_id: instance_id.0,
                    descriptor_ordinal: child_blueprint.descriptor_ordinal().0,
                },
            );
            child_blueprint.apply_base(child, cmd);
            child_map.children.insert(instance_id.0, child);
        }

        if let Some(store) = self.stores.remove(&entity) {
            for (key, bytes) in store.stash {
                let ordinal = key.ordinal();
                let instance = key.instance();
                if instance.is_parent() {
                    if let Err(err) = descriptors.apply(ordinal, &bytes, entity, cmd) {
                        debug!("dropping stashed descriptor during promotion: {}", err);
                    }
                } else if let Some(child) = child_map.get(instance.0) {
                    if let Err(err) = descriptors.apply(ordinal, &bytes, child, cmd) {
                        debug!("dropping stashed child descriptor during promotion: {}", err);
                    }
                } else {
                    debug!("dropping stashed descriptor for missing child instance {}", instance.0);
                }
            }
        }

        self.child_maps.insert(entity, child_map);

        lifecycle
            .begin_construction(entity, request.blueprint_id, request.identified_tick, request.initiator)
            .ok();

        let _ = registry;
        Ok(())
    }

    /// Destroy any ghost older than `T_ghost` ticks, dropping its stash.
    pub fn prune_stale<H>(&mut self, current_tick: Tick, host: &mut H, registry: &mut EntityIdRegistry<E>)
    where
        H: Host<Entity = E>,
    {
        let stale: Vec<E> = self
            .stores
            .iter()
            .filter(|(_, store)| current_tick.saturating_sub(store.first_seen_tick) > self.config.max_age_ticks)
            .map(|(entity, _)| *entity)
            .collect();

        for entity in stale {
            debug!("pruning stale ghost after {} ticks", self.config.max_age_ticks);
            self.destroy_ghost(entity, host, registry, current_tick);
        }
    }

    /// Destroy a ghost (timeout, graveyard conflict, lifecycle NACK),
    /// removing all pending stash bytes.
    pub fn destroy_ghost<H>(&mut self, entity: E, host: &mut H, registry: &mut EntityIdRegistry<E>, tick: Tick)
    where
        H: Host<Entity = E>,
    {
        self.stores.remove(&entity);
        self.spawn_requests.remove(&entity);
        self.child_maps.remove(&entity);
        if let Some(id) = registry.reverse(entity) {
            let _ = registry.unregister(id, tick);
        }
        host.destroy_entity(entity);
    }
}
