use std::collections::HashSet;

use crate::host::{EntityCommandBuffer, Host};
use crate::types::{BlueprintId, DescriptorOrdinal, InstanceId, PackedKey};

/// A template from the external blueprint store (§3): base components plus
/// a child list and a readiness predicate over the set of stashed
/// descriptor keys.
pub trait Blueprint<H: Host>: Send + Sync {
    fn id(&self) -> BlueprintId;

    /// Does `stashed` contain everything this blueprint needs before the
    /// ghost can promote?
    fn is_ready(&self, stashed: &HashSet<PackedKey>) -> bool;

    fn children(&self) -> &[(InstanceId, BlueprintId)];

    fn apply_base(&self, entity: H::Entity, cmd: &mut EntityCommandBuffer<H>);

    /// The descriptor this blueprint is keyed under, recorded on a child's
    /// `PartMetadata` so hierarchical authority and orphan cleanup can tell
    /// which blueprint produced it without re-resolving the blueprint store.
    fn descriptor_ordinal(&self) -> DescriptorOrdinal;
}

/// External collaborator owning the blueprint-id → blueprint mapping.
pub trait BlueprintStore<H: Host> {
    fn get(&self, id: BlueprintId) -> Option<&dyn Blueprint<H>>;
}
