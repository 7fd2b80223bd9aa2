//! `SmartEgress` (§4.F) — decides, per `(entity, descriptor-key)`, whether
//! this frame's state is worth publishing: a chunk-version early-out, a
//! dirty bit application code sets on mutation, and a salted rolling
//! refresh so unreliable descriptors still converge periodically even if
//! nothing marks them dirty.
//!
//! Authority is not consulted here — per §4.F the transport adapter gates
//! on [`crate::authority::AuthorityStore::has_authority_for_key`] before
//! ever asking `should_publish`.

use std::collections::{HashMap, HashSet};

use crate::config::EgressConfig;
use crate::types::{EntityHandle, NetworkId, PackedKey, Tick};

#[derive(Debug, Default, Clone)]
pub struct EgressPublicationState {
    pub last_tick: HashMap<PackedKey, Tick>,
    pub dirty: HashSet<PackedKey>,
}

pub struct SmartEgress<E: EntityHandle> {
    config: EgressConfig,
    states: HashMap<E, EgressPublicationState>,
}

impl<E: EntityHandle> SmartEgress<E> {
    pub fn new(config: EgressConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    pub fn mark_dirty(&mut self, entity: E, key: PackedKey) {
        self.states.entry(entity).or_default().dirty.insert(key);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn should_publish(
        &self,
        entity: E,
        network_id: NetworkId,
        key: PackedKey,
        tick: Tick,
        is_unreliable: bool,
        chunk_version: u64,
        last_chunk_published: u64,
    ) -> bool {
        if chunk_version == last_chunk_published && !is_unreliable {
            return false;
        }

        let state = self.states.get(&entity);
        if state.map(|s| s.dirty.contains(&key)).unwrap_or(false) {
            return true;
        }

        if is_unreliable {
            let r = self.config.refresh_interval_ticks.max(1);
            let phase = (tick.0 + (network_id.0 % r)) % r;
            let last = state.and_then(|s| s.last_tick.get(&key).copied());
            if last != Some(tick) && phase == 0 {
                return true;
            }
        }

        false
    }

    /// Record that `key` was just published for `entity` at `tick`, and
    /// clear its dirty bit.
    pub fn on_published(&mut self, entity: E, key: PackedKey, tick: Tick) {
        let state = self.states.entry(entity).or_default();
        state.last_tick.insert(key, tick);
        state.dirty.remove(&key);
    }
}
