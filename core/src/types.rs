//! Small value types shared across every subsystem.

use std::fmt;
use std::hash::Hash;

/// Bound required of a host-ECS entity handle.
///
/// The core never constructs or inspects an entity handle beyond copying,
/// comparing and hashing it; the host ECS owns its actual representation
/// (index/generation pair, slot key, whatever).
pub trait EntityHandle: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> EntityHandle for T where T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Globally unique replication id, assigned by [`crate::ids::NetworkIdAllocator`]
/// and attached to an entity via `NetworkIdentity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// Identifies a peer node in the federation. `0` has no reserved meaning;
/// callers agree out of band on which node is master / id authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub u32);

/// Stable identifier of a blueprint (component + child template) in the
/// external template store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct BlueprintId(pub u64);

/// Identifies a participant module registered with the [`crate::lifecycle::LifecycleCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ModuleId(pub u32);

/// Stable identifier of a replicated descriptor type, assigned by the
/// external descriptor registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct DescriptorOrdinal(pub u32);

/// Routes a descriptor to the parent entity (`0`) or to a child via
/// `ChildMap` (`>0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct InstanceId(pub u32);

impl InstanceId {
    pub const PARENT: InstanceId = InstanceId(0);

    pub fn is_parent(&self) -> bool {
        self.0 == 0
    }
}

/// `(descriptor_ordinal, instance_id)` packed into a single 64-bit key, used
/// to index ownership overrides, egress publication state, and sub-entity
/// routing without an extra level of indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PackedKey(u64);

impl PackedKey {
    pub fn new(ordinal: DescriptorOrdinal, instance: InstanceId) -> Self {
        PackedKey(((ordinal.0 as u64) << 32) | instance.0 as u64)
    }

    pub fn ordinal(&self) -> DescriptorOrdinal {
        DescriptorOrdinal((self.0 >> 32) as u32)
    }

    pub fn instance(&self) -> InstanceId {
        InstanceId((self.0 & 0xFFFF_FFFF) as u32)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        PackedKey(raw)
    }
}

impl fmt::Display for PackedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.ordinal().0, self.instance().0)
    }
}

/// Monotonic simulation frame counter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub fn saturating_sub(self, rhs: Tick) -> u64 {
        self.0.saturating_sub(rhs.0)
    }

    pub fn succ(self) -> Tick {
        Tick(self.0 + 1)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
