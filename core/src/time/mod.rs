//! `TimeCoordinator` (§4.G) — dual-mode scheduling: a phase-locked
//! continuous clock for ordinary play, and a blocking deterministic
//! lockstep scheduler for bit-reproducible replay-grade runs, with a
//! future-barrier protocol for switching between them mid-session.

mod continuous;
mod lockstep;
mod tick;

pub use continuous::{ContinuousMaster, ContinuousSlave, TimePulse};
pub use lockstep::{FrameAck, FrameOrder, LockstepMaster, LockstepSlave};
pub use tick::{Mode, Role, TickInfo};

use std::collections::HashSet;

use log::warn;
use thiserror::Error;

use crate::config::TimeConfig;
use crate::types::NodeId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("operation requires the coordinator to be running in {0:?} mode")]
    WrongMode(Mode),

    #[error("operation requires the coordinator to hold the {0:?} role")]
    WrongRole(Role),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchModeMessage {
    pub target_mode: Mode,
    pub barrier_frame: u64,
    pub fixed_delta_s: Option<f32>,
}

enum Inner {
    Standalone { frame_number: u64, total_time_s: f64 },
    ContinuousMaster(ContinuousMaster),
    ContinuousSlave(ContinuousSlave),
    LockstepMaster(LockstepMaster),
    LockstepSlave(LockstepSlave),
}

pub struct TimeCoordinator {
    config: TimeConfig,
    role: Role,
    mode: Mode,
    inner: Inner,
    pending_switch: Option<SwitchModeMessage>,
    /// Remembered so a mode swap can reconstruct the right inner scheduler
    /// without forgetting which node this is or who the slaves are.
    local_node: NodeId,
    slaves: HashSet<NodeId>,

    /// The `FrameOrder`/`FrameAck` produced by the lockstep arms of the most
    /// recent `tick()`, held here so a caller driving frames through
    /// `tick()`/`SimCore::advance_time` can still retrieve the wire message
    /// without re-invoking the underlying scheduler's `try_advance` (which
    /// would consume the frame a second time).
    pending_frame_order: Option<FrameOrder>,
    pending_frame_ack: Option<FrameAck>,
}

impl TimeCoordinator {
    pub fn standalone(config: TimeConfig) -> Self {
        Self {
            config,
            role: Role::Standalone,
            mode: Mode::Continuous,
            inner: Inner::Standalone {
                frame_number: 0,
                total_time_s: 0.0,
            },
            pending_switch: None,
            local_node: NodeId(0),
            slaves: HashSet::new(),
            pending_frame_order: None,
            pending_frame_ack: None,
        }
    }

    pub fn continuous_master(config: TimeConfig) -> Self {
        Self {
            inner: Inner::ContinuousMaster(ContinuousMaster::new(config)),
            config,
            role: Role::Master,
            mode: Mode::Continuous,
            pending_switch: None,
            local_node: NodeId(0),
            slaves: HashSet::new(),
            pending_frame_order: None,
            pending_frame_ack: None,
        }
    }

    pub fn continuous_slave(config: TimeConfig) -> Self {
        Self {
            inner: Inner::ContinuousSlave(ContinuousSlave::new(config)),
            config,
            role: Role::Slave,
            mode: Mode::Continuous,
            pending_switch: None,
            local_node: NodeId(0),
            slaves: HashSet::new(),
            pending_frame_order: None,
            pending_frame_ack: None,
        }
    }

    pub fn lockstep_master(config: TimeConfig, slaves: HashSet<NodeId>) -> Self {
        Self {
            inner: Inner::LockstepMaster(LockstepMaster::new(config, slaves.clone())),
            config,
            role: Role::Master,
            mode: Mode::Deterministic,
            pending_switch: None,
            local_node: NodeId(0),
            slaves,
            pending_frame_order: None,
            pending_frame_ack: None,
        }
    }

    pub fn lockstep_slave(config: TimeConfig, local_node_id: NodeId) -> Self {
        Self {
            inner: Inner::LockstepSlave(LockstepSlave::new(local_node_id)),
            config,
            role: Role::Slave,
            mode: Mode::Deterministic,
            pending_switch: None,
            local_node: local_node_id,
            slaves: HashSet::new(),
            pending_frame_order: None,
            pending_frame_ack: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_frame(&self) -> u64 {
        match &self.inner {
            Inner::Standalone { frame_number, .. } => *frame_number,
            Inner::ContinuousMaster(m) => m.frame_number(),
            Inner::ContinuousSlave(s) => s.frame_number(),
            Inner::LockstepMaster(m) => m.frame_id(),
            Inner::LockstepSlave(s) => s.last_completed_frame(),
        }
    }

    pub fn total_time_s(&self) -> f64 {
        match &self.inner {
            Inner::Standalone { total_time_s, .. } => *total_time_s,
            Inner::ContinuousMaster(m) => m.total_time_s(),
            Inner::ContinuousSlave(s) => s.total_time_s(),
            Inner::LockstepMaster(m) => m.total_time_s(),
            Inner::LockstepSlave(s) => s.total_time_s(),
        }
    }

    /// Standalone and continuous-master tick driven by wall time;
    /// continuous-slave and lockstep variants have their own ingress-driven
    /// entry points below. `delta_s` is the host-measured frame delta.
    pub fn tick(&mut self, now_wall_ns: u64, delta_s: f32) -> (TickInfo, Option<TimePulse>) {
        self.apply_pending_switch_if_due();
        match &mut self.inner {
            Inner::Standalone { frame_number, total_time_s } => {
                *frame_number += 1;
                *total_time_s += delta_s as f64;
                (
                    TickInfo {
                        frame_number: *frame_number,
                        total_time_s: *total_time_s,
                        delta_s,
                        scale: 1.0,
                    },
                    None,
                )
            }
            Inner::ContinuousMaster(master) => master.tick(now_wall_ns, delta_s),
            Inner::ContinuousSlave(slave) => (slave.tick(now_wall_ns), None),
            Inner::LockstepMaster(master) => {
                let (tick, order) = master.try_advance();
                if order.is_none() {
                    warn!("lockstep master blocked: waiting on slave acks");
                }
                self.pending_frame_order = order;
                (tick, None)
            }
            Inner::LockstepSlave(slave) => {
                let (tick, ack) = slave.try_advance();
                self.pending_frame_ack = ack;
                (tick, None)
            }
        }
    }

    pub fn on_pulse(&mut self, pulse: &TimePulse, now_local_ns: u64) -> Result<(), TimeError> {
        match &mut self.inner {
            Inner::ContinuousSlave(slave) => {
                slave.on_pulse(pulse, now_local_ns);
                Ok(())
            }
            _ => Err(TimeError::WrongMode(Mode::Continuous)),
        }
    }

    /// Retrieve the `FrameOrder` a lockstep master owes its slaves for the
    /// current frame. If `tick()` already advanced this frame, drains the
    /// order it buffered rather than calling `try_advance` again (which
    /// would see the just-populated `pending_acks` and report blocked).
    /// Callers that never go through `tick()` still get the original
    /// call-and-advance behavior.
    pub fn take_frame_order(&mut self) -> Result<FrameOrder, TimeError> {
        if let Some(order) = self.pending_frame_order.take() {
            return Ok(order);
        }
        match &mut self.inner {
            Inner::LockstepMaster(master) => {
                let (_, order) = master.try_advance();
                order.ok_or(TimeError::WrongMode(Mode::Deterministic))
            }
            _ => Err(TimeError::WrongMode(Mode::Deterministic)),
        }
    }

    /// Retrieve the `FrameAck` a lockstep slave owes its master for the
    /// frame `tick()` just executed. `None` if the slave idled because the
    /// next frame's order hasn't arrived yet.
    pub fn take_frame_ack(&mut self) -> Option<FrameAck> {
        self.pending_frame_ack.take()
    }

    /// Force the clock to an exact frame/time pair, e.g. when restoring a
    /// recorded frame during replay playback (§4.H). Only meaningful for
    /// the bare standalone scheduler a replay session runs under — lockstep
    /// and continuous modes derive their clock from network state instead.
    pub fn restore_clock(&mut self, frame_number: u64, total_time_s: f64) -> Result<(), TimeError> {
        match &mut self.inner {
            Inner::Standalone { frame_number: f, total_time_s: t } => {
                *f = frame_number;
                *t = total_time_s;
                Ok(())
            }
            _ => Err(TimeError::WrongMode(Mode::Continuous)),
        }
    }

    pub fn on_frame_ack(&mut self, ack: FrameAck) -> Result<(), TimeError> {
        match &mut self.inner {
            Inner::LockstepMaster(master) => {
                master.on_ack(ack);
                Ok(())
            }
            _ => Err(TimeError::WrongMode(Mode::Deterministic)),
        }
    }

    pub fn buffer_frame_order(&mut self, order: FrameOrder) -> Result<(), TimeError> {
        match &mut self.inner {
            Inner::LockstepSlave(slave) => {
                slave.buffer_order(order);
                Ok(())
            }
            _ => Err(TimeError::WrongMode(Mode::Deterministic)),
        }
    }

    /// Master-side: build the `SwitchMode` message to broadcast.
    pub fn request_switch_mode(&self, target_mode: Mode) -> Result<SwitchModeMessage, TimeError> {
        if self.role != Role::Master {
            return Err(TimeError::WrongRole(Role::Master));
        }
        let barrier_frame = match target_mode {
            Mode::Deterministic => self.current_frame() + self.config.pause_barrier_frames,
            Mode::Continuous => 0,
        };
        Ok(SwitchModeMessage {
            target_mode,
            barrier_frame,
            fixed_delta_s: Some(self.config.fixed_delta_s),
        })
    }

    /// Slave-side: receive a `SwitchMode` broadcast. Performs an emergency
    /// swap immediately if the barrier has already passed.
    pub fn receive_switch_mode(&mut self, message: SwitchModeMessage) {
        if message.barrier_frame <= self.current_frame() {
            warn!(
                "SwitchMode received after barrier frame {}, performing emergency swap",
                message.barrier_frame
            );
            self.swap_mode(message.target_mode);
        } else {
            self.pending_switch = Some(message);
        }
    }

    fn apply_pending_switch_if_due(&mut self) {
        if let Some(message) = self.pending_switch {
            if self.current_frame() >= message.barrier_frame {
                self.pending_switch = None;
                self.swap_mode(message.target_mode);
            }
        }
    }

    fn swap_mode(&mut self, target_mode: Mode) {
        if self.mode == target_mode {
            return;
        }
        self.inner = match (target_mode, self.role) {
            (Mode::Deterministic, Role::Master) => {
                Inner::LockstepMaster(LockstepMaster::new(self.config, self.slaves.clone()))
            }
            (Mode::Deterministic, Role::Slave) => Inner::LockstepSlave(LockstepSlave::new(self.local_node)),
            (Mode::Continuous, Role::Master) => Inner::ContinuousMaster(ContinuousMaster::new(self.config)),
            (Mode::Continuous, Role::Slave) => Inner::ContinuousSlave(ContinuousSlave::new(self.config)),
            _ => return,
        };
        self.mode = target_mode;
        self.pending_frame_order = None;
        self.pending_frame_ack = None;
    }
}

/// FNV-1a over arbitrary bytes (§4.G.4's default `FrameAck.checksum`).
pub fn fnv1a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    bytes.iter().fold(OFFSET_BASIS, |hash, byte| (hash ^ *byte as u32).wrapping_mul(PRIME))
}

/// Fold FNV-1a over every `Active` entity's serialized component bytes, in
/// ascending `NetworkIdentity.id` order. The caller is responsible for
/// sorting `entities` by id before calling this.
pub fn compute_frame_checksum<'a>(entities: impl Iterator<Item = &'a [u8]>) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    entities.fold(OFFSET_BASIS, |hash, bytes| {
        bytes.iter().fold(hash, |h, byte| (h ^ *byte as u32).wrapping_mul(PRIME))
    })
}
