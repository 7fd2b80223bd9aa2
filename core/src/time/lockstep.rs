//! Deterministic lockstep scheduling (§4.G.2): master blocks the next
//! frame until every slave has acked the current one, making per-frame
//! state bit-reproducible given deterministic inputs.

use std::collections::{HashMap, HashSet};

use crate::config::TimeConfig;
use crate::types::NodeId;

use super::tick::TickInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOrder {
    pub frame_id: u64,
    pub fixed_delta_micros: u32,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAck {
    pub frame_id: u64,
    pub node_id: NodeId,
    pub checksum: Option<u32>,
}

pub struct LockstepMaster {
    config: TimeConfig,
    frame_id: u64,
    total_time_s: f64,
    sequence: u64,
    slaves: HashSet<NodeId>,
    pending_acks: HashSet<NodeId>,
}

impl LockstepMaster {
    pub fn new(config: TimeConfig, slaves: HashSet<NodeId>) -> Self {
        Self {
            config,
            frame_id: 0,
            total_time_s: 0.0,
            sequence: 0,
            slaves,
            pending_acks: HashSet::new(),
        }
    }

    pub fn blocked(&self) -> bool {
        !self.pending_acks.is_empty()
    }

    /// Advance one frame if every slave has acked the previous one.
    /// Returns `None` (a zero-delta idle tick) while blocked.
    pub fn try_advance(&mut self) -> (TickInfo, Option<FrameOrder>) {
        if self.blocked() {
            return (TickInfo::idle(self.frame_id, self.total_time_s), None);
        }

        self.frame_id += 1;
        self.sequence += 1;
        self.total_time_s += self.config.fixed_delta_s as f64;
        self.pending_acks = self.slaves.clone();

        let order = FrameOrder {
            frame_id: self.frame_id,
            fixed_delta_micros: (self.config.fixed_delta_s * 1_000_000.0) as u32,
            sequence: self.sequence,
        };
        (
            TickInfo {
                frame_number: self.frame_id,
                total_time_s: self.total_time_s,
                delta_s: self.config.fixed_delta_s,
                scale: 1.0,
            },
            Some(order),
        )
    }

    /// ACKs for a stale `frame_id` are discarded.
    pub fn on_ack(&mut self, ack: FrameAck) {
        if ack.frame_id != self.frame_id {
            return;
        }
        self.pending_acks.remove(&ack.node_id);
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn total_time_s(&self) -> f64 {
        self.total_time_s
    }
}

pub struct LockstepSlave {
    local_node_id: NodeId,
    expected_frame_id: u64,
    total_time_s: f64,
    buffered: HashMap<u64, FrameOrder>,
}

impl LockstepSlave {
    pub fn new(local_node_id: NodeId) -> Self {
        Self {
            local_node_id,
            expected_frame_id: 1,
            total_time_s: 0.0,
            buffered: HashMap::new(),
        }
    }

    pub fn buffer_order(&mut self, order: FrameOrder) {
        self.buffered.insert(order.frame_id, order);
    }

    pub fn last_completed_frame(&self) -> u64 {
        self.expected_frame_id.saturating_sub(1)
    }

    pub fn total_time_s(&self) -> f64 {
        self.total_time_s
    }

    /// Execute the next expected frame if its `FrameOrder` is buffered,
    /// otherwise return an idle tick.
    pub fn try_advance(&mut self) -> (TickInfo, Option<FrameAck>) {
        let Some(order) = self.buffered.remove(&self.expected_frame_id) else {
            return (TickInfo::idle(self.expected_frame_id.saturating_sub(1), self.total_time_s), None);
        };

        let delta_s = order.fixed_delta_micros as f32 / 1_000_000.0;
        self.total_time_s += delta_s as f64;

        let tick = TickInfo {
            frame_number: self.expected_frame_id,
            total_time_s: self.total_time_s,
            delta_s,
            scale: 1.0,
        };
        let ack = FrameAck {
            frame_id: self.expected_frame_id,
            node_id: self.local_node_id,
            checksum: None,
        };
        self.expected_frame_id += 1;
        (tick, Some(ack))
    }
}
