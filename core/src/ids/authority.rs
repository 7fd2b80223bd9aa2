use std::collections::HashMap;

use log::info;

use crate::types::NetworkId;

use super::{IdBlockRequest, IdBlockResponse};

/// The id-authority side of the protocol (§4.A.1): whichever node is
/// elected (election mechanism out of scope, see SPEC_FULL.md §9) answers
/// `IdBlockRequest`s from a monotonically growing cursor that never
/// rewinds, and never issues overlapping blocks to two different clients.
pub struct IdAuthority {
    cursor: u64,
    /// Last block granted per client, so a duplicate/idempotent retransmit
    /// of the same logical request does not carve out a second block.
    last_grant: HashMap<String, IdBlockResponse>,
}

impl IdAuthority {
    pub fn new(start: u64) -> Self {
        Self {
            cursor: start,
            last_grant: HashMap::new(),
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Answer a block request. Duplicate requests (same `client_id`
    /// re-sending because it never saw our response) are idempotent: they
    /// receive the same block again rather than a fresh one, per §4.A's
    /// idempotence requirement.
    pub fn handle_request(&mut self, request: &IdBlockRequest) -> IdBlockResponse {
        if let Some(prev) = self.last_grant.get(&request.client_id) {
            if prev.count == request.request_size {
                return prev.clone();
            }
        }

        let start = self.cursor;
        let count = request.request_size;
        self.cursor += count as u64;

        let response = IdBlockResponse {
            client_id: request.client_id.clone(),
            start_id: start,
            count,
        };
        info!(
            "IdAuthority: granted [{}, {}) to {}",
            start,
            start + count as u64,
            request.client_id
        );
        self.last_grant.insert(request.client_id.clone(), response.clone());
        response
    }

    pub fn last_issued(&self) -> NetworkId {
        NetworkId(self.cursor)
    }
}
