//! Property tests for the quantified invariants and round-trip laws:
//! id uniqueness, graveyard safety, ownership-map idempotence, and
//! container/codec round-tripping.

use std::collections::HashSet;

use proptest::prelude::*;

use replisim_core::authority::AuthorityStore;
use replisim_core::config::IdAllocatorConfig;
use replisim_core::ids::NetworkIdAllocator;
use replisim_core::replay::{ComponentRecord, EntityRecord, EventRecord, FrameSnapshot, NetworkInputRecord, UserInputRecord};
use replisim_core::types::{DescriptorOrdinal, InstanceId, NodeId, PackedKey};

mod support;
use support::TestHost;

struct NoGraveyard;
impl replisim_core::ids::GraveyardCheck for NoGraveyard {
    fn is_graveyard(&self, _id: replisim_core::types::NetworkId) -> bool {
        false
    }
}

fn arb_frame_snapshot() -> impl Strategy<Value = FrameSnapshot> {
    (
        any::<u64>(),
        any::<f64>(),
        any::<u64>(),
        prop::collection::vec(
            (any::<u64>(), prop::collection::vec((any::<u32>(), prop::collection::vec(any::<u8>(), 0..16)), 0..4)),
            0..4,
        ),
    )
        .prop_map(|(frame_number, total_time_s, rng_seed, entities)| {
            let mut snapshot = FrameSnapshot::empty(frame_number, total_time_s, rng_seed);
            for (id, components) in entities {
                snapshot.entities.push(EntityRecord {
                    id,
                    components: components
                        .into_iter()
                        .map(|(type_tag, bytes)| ComponentRecord { type_tag, bytes })
                        .collect(),
                });
            }
            snapshot.events.push(EventRecord { event_tag: 1, bytes: vec![1, 2, 3] });
            snapshot.network_inputs.push(NetworkInputRecord { source_node: 1, channel: 0, bytes: vec![4, 5] });
            snapshot.user_inputs.push(UserInputRecord { bytes: vec![6, 7, 8] });
            snapshot
        })
}

proptest! {
    /// §8.2 codec round-trip: every `FrameSnapshot` the allocator can produce
    /// survives `write_container`/`read_container` byte-for-byte.
    #[test]
    fn frame_snapshot_round_trips_through_the_container(snapshots in prop::collection::vec(arb_frame_snapshot(), 0..6)) {
        let mut buf = Vec::new();
        let mut recorder = replisim_core::replay::ReplayRecorder::new_recording();
        for snapshot in &snapshots {
            recorder.record_frame(snapshot.clone());
        }
        recorder.write_to(&mut buf).unwrap();

        let mut cursor = replisim_core::replay::ReplayRecorder::read_from(&mut &buf[..]).unwrap();
        let mut restored = Vec::new();
        for i in 0..snapshots.len() {
            restored.push(cursor.current_frame().cloned().unwrap());
            if i + 1 < snapshots.len() {
                cursor.advance();
            }
        }
        prop_assert_eq!(restored, snapshots);
    }

    /// §8.1 id uniqueness: ids drawn from a `NetworkIdAllocator` across
    /// arbitrarily many granted blocks never repeat.
    #[test]
    fn allocated_ids_are_never_reused_across_blocks(
        block_sizes in prop::collection::vec(1u32..20, 1..8),
        draw_counts in prop::collection::vec(0u32..25, 1..8),
    ) {
        let mut alloc = NetworkIdAllocator::new("proptest-client", IdAllocatorConfig::default());
        let mut next_start = 0u64;
        let mut seen = HashSet::new();

        for (size, draws) in block_sizes.iter().zip(draw_counts.iter()) {
            alloc.add_block(replisim_core::types::NetworkId(next_start), *size, &NoGraveyard).unwrap();
            next_start += *size as u64;

            for _ in 0..*draws {
                if let Some(id) = alloc.allocate() {
                    prop_assert!(seen.insert(id.0), "id {} allocated twice", id.0);
                }
            }
        }
    }

    /// §8.2 ownership idempotence: repeating an identical `set_owner` call
    /// surfaces at most one `OwnershipUpdate`, never one per call.
    #[test]
    fn repeated_identical_set_owner_emits_at_most_one_update(repeat_count in 1usize..10) {
        let mut host = TestHost::new();
        let entity = {
            use replisim_core::Host;
            host.create_entity()
        };
        let key = PackedKey::new(DescriptorOrdinal(4), InstanceId::PARENT);
        let mut store: AuthorityStore<support::TestEntity> = AuthorityStore::new();

        for _ in 0..repeat_count {
            store.set_owner(entity, key, NodeId(9), &mut host);
            store.diff_and_emit([entity], &host);
        }

        // only the first diff_and_emit call should have produced an update,
        // no matter how many times the identical value was re-set.
        let total_after_loop = store.take_updates().len();
        prop_assert_eq!(total_after_loop, 1);
    }
}
