//! `LifecycleCoordinator` (§4.C) — multi-party ACK-based entity
//! construction/destruction, mirroring the ancestor codebase's two-phase
//! spawn handshake but generalized to an arbitrary, registrable set of
//! participant modules rather than one fixed "host accepts" round trip.

mod messages;
mod state;

pub use messages::{ConstructionAck, ConstructionOrder, DestructionAck, DestructionOrder, DestructionReason};
pub use state::LifecycleState;

use std::collections::{HashMap, HashSet};

use log::{error, warn};
use thiserror::Error;

use crate::config::LifecycleConfig;
use crate::host::{EntityCommandBuffer, EventQueue, Host};
use crate::types::{BlueprintId, EntityHandle, ModuleId, NodeId, Tick};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("entity already has a construction or destruction in flight")]
    AlreadyPending,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleStats {
    pub constructed: u64,
    pub destructed: u64,
    pub timeouts: u64,
    pub nacked: u64,
}

struct PendingConstruct {
    blueprint_id: BlueprintId,
    start_tick: Tick,
    remaining: HashSet<ModuleId>,
}

struct PendingDestruct {
    start_tick: Tick,
    remaining: HashSet<ModuleId>,
}

pub struct LifecycleCoordinator<E: EntityHandle> {
    config: LifecycleConfig,
    global: HashSet<ModuleId>,
    requirements: HashMap<BlueprintId, HashSet<ModuleId>>,
    pending_construct: HashMap<E, PendingConstruct>,
    pending_destruct: HashMap<E, PendingDestruct>,
    states: HashMap<E, LifecycleState>,
    construction_acks: EventQueue<ConstructionAck<E>>,
    destruction_acks: EventQueue<DestructionAck<E>>,
    outbound_construction: Vec<ConstructionOrder<E>>,
    outbound_destruction: Vec<DestructionOrder<E>>,
    stats: LifecycleStats,
}

impl<E: EntityHandle> LifecycleCoordinator<E> {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            global: HashSet::new(),
            requirements: HashMap::new(),
            pending_construct: HashMap::new(),
            pending_destruct: HashMap::new(),
            states: HashMap::new(),
            construction_acks: EventQueue::new(),
            destruction_acks: EventQueue::new(),
            outbound_construction: Vec::new(),
            outbound_destruction: Vec::new(),
            stats: LifecycleStats::default(),
        }
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }

    pub fn state_of(&self, entity: E) -> Option<LifecycleState> {
        self.states.get(&entity).copied()
    }

    pub fn register_global(&mut self, module_id: ModuleId) {
        self.global.insert(module_id);
    }

    pub fn unregister_global(&mut self, module_id: ModuleId) {
        self.global.remove(&module_id);
    }

    pub fn register_requirement(&mut self, blueprint_id: BlueprintId, module_id: ModuleId) {
        self.requirements
            .entry(blueprint_id)
            .or_default()
            .insert(module_id);
    }

    pub fn unregister_requirement(&mut self, blueprint_id: BlueprintId, module_id: ModuleId) {
        if let Some(set) = self.requirements.get_mut(&blueprint_id) {
            set.remove(&module_id);
        }
    }

    fn participants(&self, blueprint_id: BlueprintId) -> HashSet<ModuleId> {
        let mut participants = self.global.clone();
        if let Some(required) = self.requirements.get(&blueprint_id) {
            participants.extend(required.iter().copied());
        }
        participants
    }

    pub fn begin_construction(
        &mut self,
        entity: E,
        blueprint_id: BlueprintId,
        tick: Tick,
        initiator: Option<NodeId>,
    ) -> Result<(), LifecycleError> {
        if self.pending_construct.contains_key(&entity) || self.pending_destruct.contains_key(&entity) {
            if cfg!(debug_assertions) {
                panic!("begin_construction called on an entity with a pending lifecycle transition");
            }
            warn!("begin_construction called on an entity with a pending lifecycle transition");
            return Err(LifecycleError::AlreadyPending);
        }

        let remaining = self.participants(blueprint_id);
        self.pending_construct.insert(
            entity,
            PendingConstruct {
                blueprint_id,
                start_tick: tick,
                remaining,
            },
        );
        self.states.insert(entity, LifecycleState::Constructing);
        self.outbound_construction.push(ConstructionOrder {
            entity,
            blueprint_id,
            tick,
            initiator,
        });
        Ok(())
    }

    /// Idempotent: a second call while a destroy is already pending is a
    /// silent no-op.
    pub fn begin_destruction(&mut self, entity: E, tick: Tick, reason: DestructionReason) {
        if self.pending_destruct.contains_key(&entity) {
            return;
        }

        let blueprint_participants = self
            .pending_construct
            .remove(&entity)
            .map(|p| self.participants(p.blueprint_id))
            .unwrap_or_else(|| self.global.clone());

        self.pending_destruct.insert(
            entity,
            PendingDestruct {
                start_tick: tick,
                remaining: blueprint_participants,
            },
        );
        self.states.insert(entity, LifecycleState::TearingDown);
        self.outbound_destruction.push(DestructionOrder { entity, tick, reason });
    }

    pub fn acknowledge_construction(
        &mut self,
        entity: E,
        module_id: ModuleId,
        success: bool,
        error: Option<String>,
    ) {
        self.construction_acks.push(ConstructionAck {
            entity,
            module_id,
            success,
            error,
        });
    }

    pub fn acknowledge_destruction(&mut self, entity: E, module_id: ModuleId) {
        self.destruction_acks.push(DestructionAck { entity, module_id });
    }

    pub fn take_construction_orders(&mut self) -> Vec<ConstructionOrder<E>> {
        std::mem::take(&mut self.outbound_construction)
    }

    pub fn take_destruction_orders(&mut self) -> Vec<DestructionOrder<E>> {
        std::mem::take(&mut self.outbound_destruction)
    }

    /// Drains pending ACKs and runs the timeout sweep. Called once per frame.
    pub fn process<H>(&mut self, tick: Tick, cmd: &mut EntityCommandBuffer<H>)
    where
        H: Host<Entity = E>,
    {
        for ack in self.construction_acks.drain() {
            self.apply_construction_ack(ack, cmd);
        }
        for ack in self.destruction_acks.drain() {
            self.apply_destruction_ack(ack, cmd);
        }
        self.sweep_timeouts(tick, cmd);
    }

    fn apply_construction_ack<H>(&mut self, ack: ConstructionAck<E>, cmd: &mut EntityCommandBuffer<H>)
    where
        H: Host<Entity = E>,
    {
        let Some(pending) = self.pending_construct.get_mut(&ack.entity) else {
            return;
        };

        if !ack.success {
            if let Some(reason) = &ack.error {
                error!("construction NACKed for module {:?}: {}", ack.module_id, reason);
            }
            self.pending_construct.remove(&ack.entity);
            self.states.insert(ack.entity, LifecycleState::Destroyed);
            self.stats.nacked += 1;
            let entity = ack.entity;
            cmd.push(move |host: &mut H| host.destroy_entity(entity));
            return;
        }

        pending.remaining.remove(&ack.module_id);
        if pending.remaining.is_empty() {
            self.pending_construct.remove(&ack.entity);
            self.states.insert(ack.entity, LifecycleState::Active);
            self.stats.constructed += 1;
        }
    }

    fn apply_destruction_ack<H>(&mut self, ack: DestructionAck<E>, cmd: &mut EntityCommandBuffer<H>)
    where
        H: Host<Entity = E>,
    {
        let Some(pending) = self.pending_destruct.get_mut(&ack.entity) else {
            return;
        };
        pending.remaining.remove(&ack.module_id);
        if pending.remaining.is_empty() {
            self.pending_destruct.remove(&ack.entity);
            self.states.insert(ack.entity, LifecycleState::Destroyed);
            self.stats.destructed += 1;
            let entity = ack.entity;
            cmd.push(move |host: &mut H| host.destroy_entity(entity));
        }
    }

    fn sweep_timeouts<H>(&mut self, tick: Tick, cmd: &mut EntityCommandBuffer<H>)
    where
        H: Host<Entity = E>,
    {
        let timed_out_construct: Vec<E> = self
            .pending_construct
            .iter()
            .filter(|(_, p)| tick.saturating_sub(p.start_tick) > self.config.timeout_ticks)
            .map(|(entity, _)| *entity)
            .collect();
        for entity in timed_out_construct {
            if let Some(pending) = self.pending_construct.remove(&entity) {
                warn!(
                    "construction timed out for blueprint {:?}, missing modules: {:?}",
                    pending.blueprint_id, pending.remaining
                );
            }
            self.states.insert(entity, LifecycleState::Destroyed);
            self.stats.timeouts += 1;
            cmd.push(move |host: &mut H| host.destroy_entity(entity));
        }

        let timed_out_destruct: Vec<E> = self
            .pending_destruct
            .iter()
            .filter(|(_, p)| tick.saturating_sub(p.start_tick) > self.config.timeout_ticks)
            .map(|(entity, _)| *entity)
            .collect();
        for entity in timed_out_destruct {
            if let Some(pending) = self.pending_destruct.remove(&entity) {
                warn!("destruction timed out, missing modules: {:?}", pending.remaining);
            }
            self.states.insert(entity, LifecycleState::Destroyed);
            self.stats.timeouts += 1;
            cmd.push(move |host: &mut H| host.destroy_entity(entity));
        }
    }
}
