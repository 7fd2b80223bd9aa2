use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub type_tag: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u64,
    pub components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_tag: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInputRecord {
    pub source_node: u32,
    pub channel: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputRecord {
    pub bytes: Vec<u8>,
}

/// One frame's worth of recorded state (§4.H). Components tagged
/// `local-only` by the host's type registry are excluded before the
/// snapshot is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub frame_number: u64,
    pub total_time_s: f64,
    pub rng_seed: u64,
    pub entities: Vec<EntityRecord>,
    pub events: Vec<EventRecord>,
    pub network_inputs: Vec<NetworkInputRecord>,
    pub user_inputs: Vec<UserInputRecord>,
}

impl FrameSnapshot {
    pub fn empty(frame_number: u64, total_time_s: f64, rng_seed: u64) -> Self {
        Self {
            frame_number,
            total_time_s,
            rng_seed,
            entities: Vec::new(),
            events: Vec::new(),
            network_inputs: Vec::new(),
            user_inputs: Vec::new(),
        }
    }
}
