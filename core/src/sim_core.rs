//! `SimCore` (§2.1) — the facade a host application drives once per frame.
//!
//! Owns every subsystem and exposes the phase methods that implement the
//! §5 data/control flow: Pre-Sim drains ingress into the `GhostEngine` and
//! runs `LifecycleCoordinator` ACK processing; the host runs its own
//! application/domain systems in between; Post-Sim diffs `AuthorityStore`,
//! prunes the ghost and id registries, and snapshots the frame when
//! recording. `SimCore` never touches a network socket itself — ingress and
//! egress bytes are handed to and read from it by a transport adapter the
//! host application owns, matching the way `naia`'s `World` managers stay
//! agnostic of the wire itself.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::authority::{AuthorityChanged, AuthorityStore, DescriptorOwnership, OwnershipUpdate, PrimaryAuthority};
use crate::config::CoreConfig;
use crate::descriptor::DescriptorRegistry;
use crate::egress::SmartEgress;
use crate::error::CoreError;
use crate::ghost::{BlueprintStore, GhostEngine};
use crate::host::{Attribute, EntityCommandBuffer, Host};
use crate::ids::{GraveyardCheck, IdBlockRequest, IdBlockResponse, NetworkIdAllocator};
use crate::lifecycle::{LifecycleCoordinator, LifecycleState};
use crate::registry::EntityIdRegistry;
use crate::replay::{ComponentRecord, EntityRecord, EventRecord, FrameSnapshot, NetworkInputRecord, ReplayRecorder, UserInputRecord};
use crate::time::{TickInfo, TimeCoordinator, TimePulse};
use crate::types::{DescriptorOrdinal, NetworkId, NodeId, PackedKey, Tick};

/// One frame of replay (§4.H Playback), decoded and applied to the host
/// before being returned. Steps (b)-(d) of the playback sequence — feeding
/// `network_inputs`/`user_inputs`/`events` through the transport adapter's
/// own ingress paths — are the host's responsibility; `SimCore` only
/// restores the clock and writes component bytes (step (a), (e)).
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayFrame {
    pub frame_number: u64,
    pub total_time_s: f64,
    pub rng_seed: u64,
    pub network_inputs: Vec<NetworkInputRecord>,
    pub user_inputs: Vec<UserInputRecord>,
    pub events: Vec<EventRecord>,
}

/// splitmix64 (Steele, Lea & Flood 2014): a compact, deterministic step
/// function for the per-frame `rng_seed` recorded in snapshots, used the
/// same way `time::fnv1a` hand-rolls a small, dependency-free primitive for
/// the checksum it covers.
fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Everything a single frame of [`SimCore::pre_sim`] / [`SimCore::post_sim`]
/// needs from the host ECS, bundled so call sites don't repeat bound lists.
pub trait SimHost: Host + Attribute<PrimaryAuthority> + Attribute<DescriptorOwnership> {}
impl<H> SimHost for H where H: Host + Attribute<PrimaryAuthority> + Attribute<DescriptorOwnership> {}

pub struct SimCore<H: Host, B: BlueprintStore<H>> {
    config: CoreConfig,
    local_node: NodeId,
    tick: Tick,

    ids: NetworkIdAllocator,
    registry: EntityIdRegistry<H::Entity>,
    lifecycle: LifecycleCoordinator<H::Entity>,
    ghost: GhostEngine<H::Entity>,
    authority: AuthorityStore<H::Entity>,
    egress: SmartEgress<H::Entity>,
    time: TimeCoordinator,
    descriptors: DescriptorRegistry<H>,
    replay: Option<ReplayRecorder>,

    blueprints: B,
    cmd: EntityCommandBuffer<H>,

    /// Entities carrying ownership state, tracked explicitly because `Host`
    /// has no query surface for `AuthorityStore::diff_and_emit` to scan.
    authority_candidates: HashSet<H::Entity>,

    /// Entities carrying replicated descriptors, and which keys, tracked
    /// explicitly for the same reason `authority_candidates` is: `Host` has
    /// no query surface for the replay snapshot visitor to scan. Populated
    /// via [`SimCore::track_snapshot_component`] alongside whatever
    /// attaches the descriptor in the first place.
    snapshot_components: HashMap<H::Entity, HashSet<PackedKey>>,

    /// This frame's replay-determinism seed (§4.H). Advances once per
    /// `advance_time` call via a fixed step function so recording and
    /// playback derive the identical sequence from the same starting value.
    rng_seed: u64,
}

impl<H: Host, B: BlueprintStore<H>> SimCore<H, B> {
    pub fn new(config: CoreConfig, client_id: impl Into<String>, local_node: NodeId, time: TimeCoordinator, blueprints: B, rng_seed: u64) -> Self {
        Self {
            ids: NetworkIdAllocator::new(client_id, config.id_allocator),
            registry: EntityIdRegistry::new(config.registry.graveyard_ticks),
            lifecycle: LifecycleCoordinator::new(config.lifecycle),
            ghost: GhostEngine::new(config.ghost),
            authority: AuthorityStore::new(),
            egress: SmartEgress::new(config.egress),
            time,
            descriptors: DescriptorRegistry::new(),
            replay: None,
            config,
            local_node,
            tick: Tick(0),
            blueprints,
            cmd: EntityCommandBuffer::new(),
            authority_candidates: HashSet::new(),
            snapshot_components: HashMap::new(),
            rng_seed,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn local_node(&self) -> NodeId {
        self.local_node
    }

    pub fn ids(&mut self) -> &mut NetworkIdAllocator {
        &mut self.ids
    }

    pub fn registry(&self) -> &EntityIdRegistry<H::Entity> {
        &self.registry
    }

    pub fn lifecycle(&mut self) -> &mut LifecycleCoordinator<H::Entity> {
        &mut self.lifecycle
    }

    pub fn ghost(&mut self) -> &mut GhostEngine<H::Entity> {
        &mut self.ghost
    }

    pub fn authority(&mut self) -> &mut AuthorityStore<H::Entity> {
        &mut self.authority
    }

    pub fn egress(&self) -> &SmartEgress<H::Entity> {
        &self.egress
    }

    pub fn egress_mut(&mut self) -> &mut SmartEgress<H::Entity> {
        &mut self.egress
    }

    pub fn time(&mut self) -> &mut TimeCoordinator {
        &mut self.time
    }

    pub fn descriptors(&mut self) -> &mut DescriptorRegistry<H> {
        &mut self.descriptors
    }

    pub fn replay(&mut self) -> Option<&mut ReplayRecorder> {
        self.replay.as_mut()
    }

    pub fn begin_recording(&mut self) {
        self.replay = Some(ReplayRecorder::new_recording());
    }

    /// Switch into playback of a previously recorded sequence. Per §4.H,
    /// the caller is responsible for also moving `TimeCoordinator` into a
    /// deterministic, fixed-delta scheduler and disabling live ingress.
    pub fn load_replay(&mut self, frames: Vec<FrameSnapshot>) {
        self.replay = Some(ReplayRecorder::from_frames(frames));
    }

    pub fn stop_recording(&mut self) -> Option<ReplayRecorder> {
        self.replay.take()
    }

    /// Mark `entity` as one `AuthorityStore::diff_and_emit` should scan
    /// each Post-Sim. Call when attaching `DescriptorOwnership` to it.
    pub fn track_authority_candidate(&mut self, entity: H::Entity) {
        self.authority_candidates.insert(entity);
    }

    pub fn untrack_authority_candidate(&mut self, entity: H::Entity) {
        self.authority_candidates.remove(&entity);
    }

    /// Mark `(entity, key)` as a descriptor the replay snapshot visitor
    /// should capture each recorded frame. Call when attaching a
    /// replicated descriptor to `entity`.
    pub fn track_snapshot_component(&mut self, entity: H::Entity, key: PackedKey) {
        self.snapshot_components.entry(entity).or_default().insert(key);
    }

    pub fn untrack_snapshot_component(&mut self, entity: H::Entity, key: PackedKey) {
        if let Some(keys) = self.snapshot_components.get_mut(&entity) {
            keys.remove(&key);
            if keys.is_empty() {
                self.snapshot_components.remove(&entity);
            }
        }
    }

    /// This frame's replay-determinism seed (§4.H), restored verbatim
    /// during playback so a re-simulated run derives identical randomness.
    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Advance the scheduler one frame. The returned `TimePulse`, if any,
    /// is this node's `time.pulse_interval_s` broadcast to slaves.
    pub fn advance_time(&mut self, now_wall_ns: u64, delta_s: f32) -> (TickInfo, Option<TimePulse>) {
        let (info, pulse) = self.time.tick(now_wall_ns, delta_s);
        self.tick = Tick(info.frame_number);
        self.rng_seed = splitmix64(self.rng_seed);
        (info, pulse)
    }

    /// Feed a granted id block into the local allocator, e.g. in response
    /// to an `IdBlockResponse` arriving over the network.
    pub fn on_id_block_response(&mut self, response: &IdBlockResponse) -> Result<(), CoreError> {
        self.ids.on_block_response(response, &self.registry)?;
        Ok(())
    }

    /// Per-frame id-allocator sweep: retry timed-out block requests, drain
    /// those ready to send. Returns the requests a transport adapter should
    /// forward to the id authority node.
    pub fn sweep_id_requests(&mut self) -> Result<Vec<IdBlockRequest>, CoreError> {
        Ok(self.ids.sweep(self.tick)?)
    }

    pub fn is_graveyard(&self, id: NetworkId) -> bool {
        GraveyardCheck::is_graveyard(&self.registry, id)
    }

    /// Pre-Sim (§5): promote any ghost whose blueprint is now ready, then
    /// drain and apply lifecycle ACKs queued since the last frame.
    pub fn pre_sim(&mut self, host: &mut H) -> Result<(), CoreError> {
        self.ghost.promote_ready(
            self.tick,
            self.config.ghost.promotion_budget_ns,
            host,
            &mut self.registry,
            &self.descriptors,
            &self.blueprints,
            &mut self.lifecycle,
            &mut self.cmd,
        )?;
        self.lifecycle.process(self.tick, &mut self.cmd);
        self.cmd.flush(host);
        Ok(())
    }

    /// Post-Sim (§5): diff ownership, prune stale ghosts and dead/orphaned
    /// registry entries, and snapshot the frame if recording.
    pub fn post_sim(&mut self, host: &mut H) -> Vec<OwnershipUpdate<H::Entity>>
    where
        H: Attribute<DescriptorOwnership>,
    {
        self.authority.diff_and_emit(self.authority_candidates.iter().copied(), host);
        self.ghost.prune_stale(self.tick, host, &mut self.registry);
        self.registry.prune(self.tick);
        self.registry.prune_dead(host, self.tick);
        self.registry.prune_orphans(host, self.ghost.parts(), self.tick);

        if let Some(recorder) = self.replay.as_mut() {
            if recorder.is_recording() {
                let mut snapshot = FrameSnapshot::empty(self.tick.0, self.time.total_time_s(), self.rng_seed);
                for (&entity, keys) in self.snapshot_components.iter() {
                    if self.lifecycle.state_of(entity) != Some(LifecycleState::Active) {
                        continue;
                    }
                    let Some(network_id) = self.registry.reverse(entity) else {
                        continue;
                    };
                    let mut components = Vec::new();
                    for &key in keys {
                        let ordinal = key.ordinal();
                        if self.descriptors.is_local_only(ordinal).unwrap_or(true) {
                            continue;
                        }
                        if let Ok(bytes) = self.descriptors.encode(ordinal, entity, host) {
                            components.push(ComponentRecord { type_tag: ordinal.0, bytes });
                        }
                    }
                    if !components.is_empty() {
                        snapshot.entities.push(EntityRecord { id: network_id.0, components });
                    }
                }
                recorder.record_frame(snapshot);
            }
        }

        self.authority.take_updates()
    }

    /// Decode and apply the replay recorder's current frame directly onto
    /// `host` (§4.H Playback steps (a) and (e)). Ghost systems are not
    /// invoked: entities are resolved straight from the id registry and
    /// written through `DescriptorRegistry::apply`, bypassing construction
    /// handshakes entirely. Returns `None` if not currently in playback.
    pub fn apply_replay_frame(&mut self, host: &mut H) -> Option<ReplayFrame> {
        let snapshot = self.replay.as_ref()?.current_frame()?.clone();

        self.tick = Tick(snapshot.frame_number);
        let _ = self.time.restore_clock(snapshot.frame_number, snapshot.total_time_s);
        self.rng_seed = snapshot.rng_seed;

        for entity_record in &snapshot.entities {
            let Some(entity) = self.registry.resolve(NetworkId(entity_record.id)) else {
                debug!("replay frame references unregistered network id {}", entity_record.id);
                continue;
            };
            for component in &entity_record.components {
                let ordinal = DescriptorOrdinal(component.type_tag);
                if let Err(err) = self.descriptors.apply(ordinal, &component.bytes, entity, &mut self.cmd) {
                    debug!("dropping replay component during playback: {}", err);
                }
            }
        }
        self.cmd.flush(host);

        Some(ReplayFrame {
            frame_number: snapshot.frame_number,
            total_time_s: snapshot.total_time_s,
            rng_seed: snapshot.rng_seed,
            network_inputs: snapshot.network_inputs,
            user_inputs: snapshot.user_inputs,
            events: snapshot.events,
        })
    }

    /// Advance the recorder to its next frame per the active
    /// `PlaybackSpeed` (§4.H "Controls") and apply it. `None` if not
    /// currently in playback, or if playback is paused with no pending
    /// step.
    pub fn advance_replay(&mut self, host: &mut H) -> Option<ReplayFrame> {
        self.replay.as_mut()?.advance()?;
        self.apply_replay_frame(host)
    }

    /// Apply an incoming ownership update (remote peer took or released a
    /// descriptor), queuing the local `AuthorityChanged` event it produces.
    pub fn apply_ownership_update(&mut self, update: OwnershipUpdate<H::Entity>, host: &mut H) -> Vec<AuthorityChanged<H::Entity>>
    where
        H: Attribute<DescriptorOwnership>,
    {
        self.authority.apply_update(update, self.local_node, host);
        self.authority.take_changed_events()
    }

    pub fn should_publish(&self, entity: H::Entity, network_id: NetworkId, key: PackedKey, is_unreliable: bool, chunk_version: u64, last_chunk_published: u64) -> bool {
        self.egress
            .should_publish(entity, network_id, key, self.tick, is_unreliable, chunk_version, last_chunk_published)
    }

    pub fn on_descriptor_published(&mut self, entity: H::Entity, key: PackedKey) {
        self.egress.on_published(entity, key, self.tick);
        debug!("published descriptor {} for entity at tick {}", key, self.tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::descriptor::DescriptorEntry;
    use crate::ghost::Blueprint;
    use crate::config::TimeConfig;
    use crate::types::{BlueprintId, InstanceId, ModuleId};
    use std::collections::HashMap;
    use std::collections::HashSet as Set;

    #[derive(Default)]
    struct FakeHost {
        alive: Set<u32>,
        next: u32,
        primary: HashMap<u32, PrimaryAuthority>,
        ownership: HashMap<u32, DescriptorOwnership>,
        position: HashMap<u32, f32>,
    }

    impl Host for FakeHost {
        type Entity = u32;
        fn create_entity(&mut self) -> u32 {
            let id = self.next;
            self.next += 1;
            self.alive.insert(id);
            id
        }
        fn destroy_entity(&mut self, entity: u32) {
            self.alive.remove(&entity);
        }
        fn is_alive(&self, entity: u32) -> bool {
            self.alive.contains(&entity)
        }
        fn chunk_version(&self, _entity: u32) -> u64 {
            0
        }
    }

    impl Attribute<PrimaryAuthority> for FakeHost {
        fn get(&self, entity: u32) -> Option<&PrimaryAuthority> {
            self.primary.get(&entity)
        }
        fn get_mut(&mut self, entity: u32) -> Option<&mut PrimaryAuthority> {
            self.primary.get_mut(&entity)
        }
        fn set(&mut self, entity: u32, value: PrimaryAuthority) {
            self.primary.insert(entity, value);
        }
        fn remove(&mut self, entity: u32) -> Option<PrimaryAuthority> {
            self.primary.remove(&entity)
        }
    }

    impl Attribute<DescriptorOwnership> for FakeHost {
        fn get(&self, entity: u32) -> Option<&DescriptorOwnership> {
            self.ownership.get(&entity)
        }
        fn get_mut(&mut self, entity: u32) -> Option<&mut DescriptorOwnership> {
            self.ownership.get_mut(&entity)
        }
        fn set(&mut self, entity: u32, value: DescriptorOwnership) {
            self.ownership.insert(entity, value);
        }
        fn remove(&mut self, entity: u32) -> Option<DescriptorOwnership> {
            self.ownership.remove(&entity)
        }
    }

    struct NoBlueprints;
    impl BlueprintStore<FakeHost> for NoBlueprints {
        fn get(&self, _id: BlueprintId) -> Option<&dyn Blueprint<FakeHost>> {
            None
        }
    }

    fn core() -> SimCore<FakeHost, NoBlueprints> {
        SimCore::new(
            CoreConfig::default(),
            "node-a",
            NodeId(1),
            TimeCoordinator::standalone(TimeConfig::default()),
            NoBlueprints,
            42,
        )
    }

    #[test]
    fn pre_sim_and_post_sim_run_without_pending_work() {
        let mut sim = core();
        let mut host = FakeHost::default();
        sim.advance_time(0, 1.0 / 60.0);
        sim.pre_sim(&mut host).unwrap();
        let updates = sim.post_sim(&mut host);
        assert!(updates.is_empty());
    }

    #[test]
    fn recording_captures_tracked_entities_and_the_frame_rng_seed() {
        let mut sim = core();
        let mut host = FakeHost::default();

        let ordinal = crate::types::DescriptorOrdinal(7);
        sim.descriptors().register(
            ordinal,
            DescriptorEntry {
                is_unreliable: false,
                is_local_only: false,
                encode: Box::new(|entity, host: &FakeHost| host.position.get(&entity).copied().unwrap_or(0.0).to_le_bytes().to_vec()),
                apply_to_entity: Box::new(|bytes, entity, cmd| {
                    let value = f32::from_le_bytes(bytes.try_into().unwrap());
                    cmd.push(move |host: &mut FakeHost| {
                        host.position.insert(entity, value);
                    });
                }),
                read_id_from_bytes: |_| 0,
                read_instance_from_bytes: |_| 0,
                dispose_instance: Box::new(|_, _| {}),
            },
        );

        let entity = host.create_entity();
        host.position.insert(entity, 3.5);
        sim.registry.register(NetworkId(10), entity).unwrap();
        sim.track_snapshot_component(entity, PackedKey::new(ordinal, InstanceId::PARENT));

        sim.lifecycle().register_global(ModuleId(1));
        let tick = sim.tick();
        sim.lifecycle().begin_construction(entity, BlueprintId(100), tick, None).unwrap();
        sim.lifecycle().acknowledge_construction(entity, ModuleId(1), true, None);

        sim.begin_recording();
        sim.advance_time(0, 1.0 / 60.0);
        sim.pre_sim(&mut host).unwrap(); // drains the ack, entity reaches Active
        sim.post_sim(&mut host);
        let expected_seed = sim.rng_seed();

        let recorder = sim.stop_recording().unwrap();
        let mut buf = Vec::new();
        recorder.write_to(&mut buf).unwrap();
        let played_back = ReplayRecorder::read_from(&mut &buf[..]).unwrap();
        let frame = played_back.current_frame().unwrap();

        assert_eq!(frame.rng_seed, expected_seed);
        assert_eq!(frame.entities.len(), 1);
        assert_eq!(frame.entities[0].id, 10);
        assert_eq!(frame.entities[0].components.len(), 1);
        assert_eq!(frame.entities[0].components[0].type_tag, 7);
        let bytes: [u8; 4] = frame.entities[0].components[0].bytes.clone().try_into().unwrap();
        assert_eq!(f32::from_le_bytes(bytes), 3.5);
    }

    #[test]
    fn untracked_and_non_active_entities_are_excluded_from_the_snapshot() {
        let mut sim = core();
        let mut host = FakeHost::default();

        let ordinal = crate::types::DescriptorOrdinal(7);
        sim.descriptors().register(
            ordinal,
            DescriptorEntry {
                is_unreliable: false,
                is_local_only: false,
                encode: Box::new(|_entity, _host: &FakeHost| Vec::new()),
                apply_to_entity: Box::new(|_bytes, _entity, _cmd| {}),
                read_id_from_bytes: |_| 0,
                read_instance_from_bytes: |_| 0,
                dispose_instance: Box::new(|_, _| {}),
            },
        );

        // tracked, but still Constructing: must not appear in the snapshot.
        let entity = host.create_entity();
        sim.registry.register(NetworkId(11), entity).unwrap();
        sim.track_snapshot_component(entity, PackedKey::new(ordinal, InstanceId::PARENT));
        let tick = sim.tick();
        sim.lifecycle().begin_construction(entity, BlueprintId(100), tick, None).unwrap();

        sim.begin_recording();
        sim.advance_time(0, 1.0 / 60.0);
        sim.pre_sim(&mut host).unwrap();
        sim.post_sim(&mut host);

        let recorder = sim.stop_recording().unwrap();
        let mut buf = Vec::new();
        recorder.write_to(&mut buf).unwrap();
        let played_back = ReplayRecorder::read_from(&mut &buf[..]).unwrap();
        assert!(played_back.current_frame().unwrap().entities.is_empty());
    }

    fn position_descriptor() -> DescriptorEntry<FakeHost> {
        DescriptorEntry {
            is_unreliable: false,
            is_local_only: false,
            encode: Box::new(|_entity, _host: &FakeHost| Vec::new()),
            apply_to_entity: Box::new(|bytes, entity, cmd| {
                let value = f32::from_le_bytes(bytes.try_into().unwrap());
                cmd.push(move |host: &mut FakeHost| {
                    host.position.insert(entity, value);
                });
            }),
            read_id_from_bytes: |_| 0,
            read_instance_from_bytes: |_| 0,
            dispose_instance: Box::new(|_, _| {}),
        }
    }

    #[test]
    fn apply_replay_frame_restores_clock_rng_seed_and_component_bytes() {
        let mut sim = core();
        let mut host = FakeHost::default();

        let ordinal = crate::types::DescriptorOrdinal(7);
        sim.descriptors().register(ordinal, position_descriptor());

        let entity = host.create_entity();
        sim.registry.register(NetworkId(20), entity).unwrap();

        let mut frame = FrameSnapshot::empty(9, 0.15, 1234);
        frame.entities.push(EntityRecord {
            id: 20,
            components: vec![ComponentRecord { type_tag: 7, bytes: 7.25f32.to_le_bytes().to_vec() }],
        });
        sim.load_replay(vec![frame]);

        let replayed = sim.apply_replay_frame(&mut host).expect("a loaded replay has a current frame");

        assert_eq!(replayed.frame_number, 9);
        assert_eq!(replayed.rng_seed, 1234);
        assert_eq!(sim.tick(), Tick(9));
        assert_eq!(sim.rng_seed(), 1234);
        assert_eq!(host.position.get(&entity), Some(&7.25));
    }

    #[test]
    fn advance_replay_steps_to_the_next_frame_and_applies_it() {
        let mut sim = core();
        let mut host = FakeHost::default();

        let ordinal = crate::types::DescriptorOrdinal(7);
        sim.descriptors().register(ordinal, position_descriptor());

        let entity = host.create_entity();
        sim.registry.register(NetworkId(21), entity).unwrap();

        let frame_a = FrameSnapshot::empty(1, 1.0 / 60.0, 10);
        let mut frame_b = FrameSnapshot::empty(2, 2.0 / 60.0, 20);
        frame_b.entities.push(EntityRecord {
            id: 21,
            components: vec![ComponentRecord { type_tag: 7, bytes: 1.5f32.to_le_bytes().to_vec() }],
        });
        sim.load_replay(vec![frame_a, frame_b]);

        sim.apply_replay_frame(&mut host).unwrap();
        assert!(host.position.get(&entity).is_none());

        let replayed = sim.advance_replay(&mut host).expect("second frame is queued");
        assert_eq!(replayed.frame_number, 2);
        assert_eq!(host.position.get(&entity), Some(&1.5));
    }

    #[test]
    fn authority_candidate_changes_surface_through_post_sim() {
        let mut sim = core();
        let mut host = FakeHost::default();
        let entity = host.create_entity();
        sim.track_authority_candidate(entity);

        let key = PackedKey::new(crate::types::DescriptorOrdinal(1), crate::types::InstanceId::PARENT);
        sim.authority().set_owner(entity, key, NodeId(2), &mut host);

        let updates = sim.post_sim(&mut host);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].new_owner, NodeId(2));
    }
}
