/// Which role this node plays in the time-sync federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Standalone,
    Master,
    Slave,
}

/// Which scheduling discipline is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Continuous,
    Deterministic,
}

/// Per-tick output every node's scheduler produces (§4.G).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInfo {
    pub frame_number: u64,
    pub total_time_s: f64,
    pub delta_s: f32,
    pub scale: f32,
}

impl TickInfo {
    pub fn idle(frame_number: u64, total_time_s: f64) -> Self {
        Self {
            frame_number,
            total_time_s,
            delta_s: 0.0,
            scale: 1.0,
        }
    }
}
