use std::collections::VecDeque;

use log::{info, warn};

use crate::config::IdAllocatorConfig;
use crate::types::{NetworkId, Tick};

use super::{GraveyardCheck, IdAllocatorError, IdBlockRequest, IdBlockResponse};

struct PendingRequest {
    requested_at: Tick,
    size: u32,
    attempt: u32,
}

/// Block-based unique id allocator (§4.A).
///
/// Holds a local pool of previously-granted, unused ids. When the pool
/// drains below `low_water`, it emits an `IdBlockRequest` (collected via
/// [`NetworkIdAllocator::sweep`]) and fires the low-water callback exactly
/// once per crossing, never once per `allocate()` call while still below
/// the threshold.
pub struct NetworkIdAllocator {
    client_id: String,
    config: IdAllocatorConfig,
    pool: VecDeque<u64>,
    below_low_water: bool,
    pending: Option<PendingRequest>,
    outbox: Vec<IdBlockRequest>,
    on_low_water: Option<Box<dyn FnMut() + Send>>,
}

impl NetworkIdAllocator {
    pub fn new(client_id: impl Into<String>, config: IdAllocatorConfig) -> Self {
        Self {
            client_id: client_id.into(),
            config,
            pool: VecDeque::new(),
            below_low_water: false,
            pending: None,
            outbox: Vec::new(),
            on_low_water: None,
        }
    }

    /// Register a callback fired exactly once per crossing below
    /// `low_water`. Per §5, if invoked from a cross-thread context it must
    /// only enqueue a deferred action, never mutate simulation state
    /// directly; that responsibility is the caller's.
    pub fn on_low_water(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_low_water = Some(Box::new(callback));
    }

    /// Yield a previously unused id from the local pool. Never blocks: an
    /// empty pool returns `None` and the caller tries again next frame once
    /// a block response arrives.
    pub fn allocate(&mut self) -> Option<NetworkId> {
        let id = self.pool.pop_front();
        self.check_low_water();
        id.map(NetworkId)
    }

    pub fn available(&self) -> usize {
        self.pool.len()
    }

    fn check_low_water(&mut self) {
        let below = self.pool.len() < self.config.low_water as usize;
        if below && !self.below_low_water {
            self.below_low_water = true;
            if let Some(cb) = self.on_low_water.as_mut() {
                cb();
            }
            self.queue_request();
        } else if !below {
            self.below_low_water = false;
        }
    }

    fn queue_request(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let size = self.config.low_water.max(1) * 2;
        self.outbox.push(IdBlockRequest {
            client_id: self.client_id.clone(),
            request_size: size,
        });
    }

    /// Grow the local pool with a freshly granted `[start, start+count)`
    /// range. Rejected if it intersects the graveyard (§4.A), in which case
    /// the pool is left untouched.
    pub fn add_block(
        &mut self,
        start: NetworkId,
        count: u32,
        graveyard: &dyn GraveyardCheck,
    ) -> Result<(), IdAllocatorError> {
        let end = start.0 + count as u64;
        for raw in start.0..end {
            if graveyard.is_graveyard(NetworkId(raw)) {
                return Err(IdAllocatorError::BlockIntersectsGraveyard {
                    start: start.0,
                    end,
                });
            }
        }
        for raw in start.0..end {
            self.pool.push_back(raw);
        }
        info!(
            "NetworkIdAllocator[{}]: added block [{}, {}) ({} ids)",
            self.client_id, start.0, end, count
        );
        self.check_low_water();
        Ok(())
    }

    /// Discard pool and pending request state, as if freshly constructed.
    /// Used when a host needs to restart an allocator deterministically
    /// (e.g. on replay seek).
    pub fn reset(&mut self, start: NetworkId) {
        self.pool.clear();
        self.pending = None;
        self.below_low_water = false;
        info!(
            "NetworkIdAllocator[{}]: reset (next expected start {})",
            self.client_id, start.0
        );
    }

    /// Handle an `IdBlockResponse`. Ignored if it doesn't match our
    /// in-flight request's `client_id` (duplicate / stray response from
    /// another client).
    pub fn on_block_response(
        &mut self,
        response: &IdBlockResponse,
        graveyard: &dyn GraveyardCheck,
    ) -> Result<(), IdAllocatorError> {
        if response.client_id != self.client_id {
            return Ok(());
        }
        self.pending = None;
        self.add_block(NetworkId(response.start_id), response.count, graveyard)
    }

    /// Per-frame sweep: retries timed-out requests with exponential
    /// backoff (capped at `max_retry_attempts`), and drains requests ready
    /// to be sent over the wire.
    pub fn sweep(&mut self, tick: Tick) -> Result<Vec<IdBlockRequest>, IdAllocatorError> {
        if let Some(pending) = &self.pending {
            let elapsed = tick.saturating_sub(pending.requested_at);
            let backoff = self.config.request_timeout_ticks * (1 << pending.attempt.min(8));
            if elapsed > backoff {
                if pending.attempt + 1 >= self.config.max_retry_attempts {
                    let client_id = self.client_id.clone();
                    let attempts = pending.attempt + 1;
                    self.pending = None;
                    warn!(
                        "NetworkIdAllocator[{}]: exhausted {} retry attempts requesting ids",
                        client_id, attempts
                    );
                    return Err(IdAllocatorError::RequestRetriesExhausted {
                        client_id,
                        attempts,
                    });
                }
                let size = self.pending.as_ref().unwrap().size;
                self.outbox.push(IdBlockRequest {
                    client_id: self.client_id.clone(),
                    request_size: size,
                });
                self.pending = Some(PendingRequest {
                    requested_at: tick,
                    size,
                    attempt: pending.attempt + 1,
                });
            }
        }

        if !self.outbox.is_empty() && self.pending.is_none() {
            if let Some(req) = self.outbox.last() {
                self.pending = Some(PendingRequest {
                    requested_at: tick,
                    size: req.request_size,
                    attempt: 0,
                });
            }
        }

        Ok(std::mem::take(&mut self.outbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoGraveyard;
    impl GraveyardCheck for NoGraveyard {
        fn is_graveyard(&self, _id: NetworkId) -> bool {
            false
        }
    }

    struct AllGraveyard;
    impl GraveyardCheck for AllGraveyard {
        fn is_graveyard(&self, _id: NetworkId) -> bool {
            true
        }
    }

    #[test]
    fn allocate_drains_pool_and_requests_more_at_low_water() {
        let mut alloc = NetworkIdAllocator::new("c1", IdAllocatorConfig { low_water: 2, ..Default::default() });
        alloc.add_block(NetworkId(0), 3, &NoGraveyard).unwrap();

        assert_eq!(alloc.allocate(), Some(NetworkId(0)));
        // pool now has 2 left, not yet below low_water(2)
        let reqs = alloc.sweep(Tick(0)).unwrap();
        assert!(reqs.is_empty());

        assert_eq!(alloc.allocate(), Some(NetworkId(1)));
        // pool now has 1 left, below low_water -> request queued
        let reqs = alloc.sweep(Tick(0)).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].client_id, "c1");
    }

    #[test]
    fn low_water_callback_fires_once_per_crossing() {
        use std::sync::{Arc, Mutex};
        let count = Arc::new(Mutex::new(0));
        let count2 = count.clone();

        let mut alloc = NetworkIdAllocator::new("c1", IdAllocatorConfig { low_water: 5, ..Default::default() });
        alloc.on_low_water(move || *count2.lock().unwrap() += 1);

        alloc.add_block(NetworkId(0), 10, &NoGraveyard).unwrap();
        for _ in 0..4 {
            alloc.allocate();
        }
        assert_eq!(*count.lock().unwrap(), 0);

        alloc.allocate(); // now below 5
        assert_eq!(*count.lock().unwrap(), 1);

        alloc.allocate(); // still below, should not refire
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn empty_pool_returns_none_without_blocking() {
        let mut alloc = NetworkIdAllocator::new("c1", IdAllocatorConfig::default());
        assert_eq!(alloc.allocate(), None);
    }

    #[test]
    fn add_block_rejected_when_it_intersects_graveyard() {
        let mut alloc = NetworkIdAllocator::new("c1", IdAllocatorConfig::default());
        let err = alloc.add_block(NetworkId(100), 5, &AllGraveyard).unwrap_err();
        assert!(matches!(err, IdAllocatorError::BlockIntersectsGraveyard { .. }));
        assert_eq!(alloc.available(), 0);
    }

    #[test]
    fn block_response_for_non_matching_client_id_is_ignored() {
        let mut alloc = NetworkIdAllocator::new("c1", IdAllocatorConfig::default());
        let resp = IdBlockResponse {
            client_id: "other".into(),
            start_id: 0,
            count: 10,
        };
        alloc.on_block_response(&resp, &NoGraveyard).unwrap();
        assert_eq!(alloc.available(), 0);
    }

    #[test]
    fn retries_exhaust_after_max_attempts() {
        let mut alloc = NetworkIdAllocator::new(
            "c1",
            IdAllocatorConfig {
                low_water: 1,
                request_timeout_ticks: 10,
                max_retry_attempts: 2,
            },
        );
        // force below low-water so a request gets queued
        alloc.allocate();
        let _ = alloc.sweep(Tick(0)).unwrap();

        // first retry
        let _ = alloc.sweep(Tick(25)).unwrap();
        // second retry exceeds max_retry_attempts
        let err = alloc.sweep(Tick(200)).unwrap_err();
        assert!(matches!(err, IdAllocatorError::RequestRetriesExhausted { .. }));
    }
}
