//! # replisim-core
//!
//! Cross-cutting runtime for distributed, deterministic, entity-based
//! simulations: id allocation, entity lifecycle coordination, ghost-protocol
//! replication, split authority, bandwidth-aware egress decisions, dual-mode
//! time synchronization, and frame-accurate record/replay.
//!
//! This crate owns none of the host's entity storage, transport, or wire
//! codec — see [`host::Host`] for the boundary it consumes. A host
//! application wires its own ECS and network layer against the traits and
//! facade exposed here; [`sim_core::SimCore`] is the entry point most
//! integrations start from.

pub mod authority;
pub mod config;
pub mod descriptor;
pub mod egress;
pub mod error;
pub mod ghost;
pub mod host;
pub mod ids;
pub mod lifecycle;
pub mod registry;
pub mod replay;
pub mod sim_core;
pub mod time;
pub mod types;

pub use config::CoreConfig;
pub use error::CoreError;
pub use host::{Attribute, EntityCommandBuffer, EventQueue, Host};
pub use sim_core::SimCore;
