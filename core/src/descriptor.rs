//! Descriptor registry (§9 design decision): a function-object registry
//! keyed by `descriptor_ordinal`, replacing a reflection/inheritance-based
//! "descriptor type" hierarchy with a flat table of closures, the same
//! dispatch shape the ancestor codebase uses for its per-message-type
//! encode/decode table.

use std::collections::HashMap;

use thiserror::Error;

use crate::host::{EntityCommandBuffer, Host};
use crate::types::DescriptorOrdinal;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor ordinal {0:?} is not registered")]
    UnknownOrdinal(DescriptorOrdinal),
}

/// One registered descriptor type's behavior, keyed by ordinal.
///
/// `encode`/`apply_to_entity` operate on raw bytes rather than a concrete
/// Rust type so the registry can hold descriptors of unrelated component
/// types in one flat map; the host application supplies the closures at
/// registration time, where the concrete type is still in scope.
pub struct DescriptorEntry<H: Host> {
    pub is_unreliable: bool,
    /// Excluded from replay snapshots (§4.H): transient, derived, or
    /// purely local state that would be wrong to restore from a recording.
    pub is_local_only: bool,
    pub encode: Box<dyn Fn(H::Entity, &H) -> Vec<u8> + Send + Sync>,
    pub apply_to_entity: Box<dyn Fn(&[u8], H::Entity, &mut EntityCommandBuffer<H>) + Send + Sync>,
    pub read_id_from_bytes: fn(&[u8]) -> u64,
    pub read_instance_from_bytes: fn(&[u8]) -> u32,
    pub dispose_instance: Box<dyn Fn(H::Entity, &mut EntityCommandBuffer<H>) + Send + Sync>,
}

#[derive(Default)]
pub struct DescriptorRegistry<H: Host> {
    entries: HashMap<DescriptorOrdinal, DescriptorEntry<H>>,
}

impl<H: Host> DescriptorRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(&mut self, ordinal: DescriptorOrdinal, entry: DescriptorEntry<H>) {
        self.entries.insert(ordinal, entry);
    }

    pub fn get(&self, ordinal: DescriptorOrdinal) -> Option<&DescriptorEntry<H>> {
        self.entries.get(&ordinal)
    }

    pub fn is_unreliable(&self, ordinal: DescriptorOrdinal) -> Result<bool, DescriptorError> {
        self.entries
            .get(&ordinal)
            .map(|e| e.is_unreliable)
            .ok_or(DescriptorError::UnknownOrdinal(ordinal))
    }

    pub fn is_local_only(&self, ordinal: DescriptorOrdinal) -> Result<bool, DescriptorError> {
        self.entries
            .get(&ordinal)
            .map(|e| e.is_local_only)
            .ok_or(DescriptorError::UnknownOrdinal(ordinal))
    }

    /// Decode `bytes` and apply them to `entity` via the registered
    /// descriptor's closure. The decode step is folded into
    /// `apply_to_entity` itself (see [`DescriptorEntry`]).
    pub fn apply(
        &self,
        ordinal: DescriptorOrdinal,
        bytes: &[u8],
        entity: H::Entity,
        cmd: &mut EntityCommandBuffer<H>,
    ) -> Result<(), DescriptorError> {
        let entry = self
            .entries
            .get(&ordinal)
            .ok_or(DescriptorError::UnknownOrdinal(ordinal))?;
        (entry.apply_to_entity)(bytes, entity, cmd);
        Ok(())
    }

    pub fn encode(
        &self,
        ordinal: DescriptorOrdinal,
        entity: H::Entity,
        host: &H,
    ) -> Result<Vec<u8>, DescriptorError> {
        let entry = self
            .entries
            .get(&ordinal)
            .ok_or(DescriptorError::UnknownOrdinal(ordinal))?;
        Ok((entry.encode)(entity, host))
    }
}
