//! Indicator registry
//!
//! Book-keeping between the three identifier spaces the bridge deals
//! with:
//!
//! - **external id**: chosen by the UDP client, names a marker
//! - **request id**: allocated here, correlates a host call with its
//!   asynchronous confirmation
//! - **object handle**: assigned by the host once the object exists
//!
//! Two maps, each behind its own mutex. The pending map
//! (`request id → external id`) only holds entries while a create
//! request is outstanding; the object map
//! (`external id → object handle`) is the authoritative record of what
//! is currently shown. When one operation touches both, the lock order
//! is pending map first, then object map.

use crate::types::{IndicatorId, ObjectHandle, RequestId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// First request id handed out for user commands. Ids below this are
/// reserved for internal host subscriptions such as the periodic
/// aircraft-state poll and must never be allocated here.
pub const USER_REQUEST_BASE: RequestId = 64;

/// Result of resolving an object-assignment confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// External id the confirmed object belongs to
    pub indicator: IndicatorId,
    /// A different handle the indicator was already mapped to. The
    /// caller should remove that object from the simulation, otherwise
    /// it stays behind unreachable.
    pub replaced: Option<ObjectHandle>,
}

/// Thread-safe indicator/request/object correlation table
pub struct IndicatorRegistry {
    /// Outstanding create requests awaiting host confirmation
    pending: Mutex<HashMap<RequestId, IndicatorId>>,
    /// Confirmed placements currently shown in the simulation
    objects: Mutex<HashMap<IndicatorId, ObjectHandle>>,
    /// Next request id; wraps back into the user band, never below it
    next_request: AtomicU32,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            next_request: AtomicU32::new(USER_REQUEST_BASE),
        }
    }

    /// Allocate the next request id from the user band.
    ///
    /// Monotonic for the process lifetime; on overflow the counter wraps
    /// to [`USER_REQUEST_BASE`], skipping the reserved low ids.
    pub fn allocate_request(&self) -> RequestId {
        self.next_request
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(if id == u32::MAX { USER_REQUEST_BASE } else { id + 1 })
            })
            .unwrap_or_else(|id| id)
    }

    /// Allocate a request id and record that its confirmation belongs to
    /// `indicator`.
    pub fn reserve_request(&self, indicator: IndicatorId) -> RequestId {
        let request = self.allocate_request();
        self.lock_pending().insert(request, indicator);
        request
    }

    /// Drop a pending entry whose host call never went out.
    pub fn abandon_request(&self, request: RequestId) {
        self.lock_pending().remove(&request);
    }

    /// Resolve a host confirmation to its indicator and record the live
    /// object handle.
    ///
    /// Unknown request ids are logged and ignored; the host can report
    /// assignments this process never asked for (for example objects left
    /// over from an earlier session). A second confirmation for the same
    /// request is likewise a no-op.
    pub fn confirm_object(&self, request: RequestId, handle: ObjectHandle) -> Option<Confirmation> {
        // Lock order: pending map, then object map.
        let mut pending = self.lock_pending();
        let Some(indicator) = pending.remove(&request) else {
            log::warn!("Ignoring object assignment for unknown request {}", request);
            return None;
        };

        let replaced = self
            .lock_objects()
            .insert(indicator, handle)
            .filter(|&old| old != handle);

        Some(Confirmation { indicator, replaced })
    }

    /// Handle of the live object for an indicator, if one is shown.
    pub fn lookup_object(&self, indicator: IndicatorId) -> Option<ObjectHandle> {
        self.lock_objects().get(&indicator).copied()
    }

    /// Every external id with a confirmed placement, in no particular
    /// order.
    pub fn all_external_ids(&self) -> Vec<IndicatorId> {
        self.lock_objects().keys().copied().collect()
    }

    /// Drop the mapping for an indicator without touching the host.
    /// Returns the handle it mapped to, if any.
    pub fn forget(&self, indicator: IndicatorId) -> Option<ObjectHandle> {
        self.lock_objects().remove(&indicator)
    }

    /// Number of confirmed placements.
    pub fn tracked_count(&self) -> usize {
        self.lock_objects().len()
    }

    /// Wipe both maps. Used when the host connection is lost and every
    /// correlation with it is void.
    pub fn clear(&self) {
        // Lock order: pending map, then object map.
        let mut pending = self.lock_pending();
        let mut objects = self.lock_objects();
        pending.clear();
        objects.clear();
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, IndicatorId>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, HashMap<IndicatorId, ObjectHandle>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_starts_at_user_base() {
        let registry = IndicatorRegistry::new();
        assert_eq!(registry.allocate_request(), USER_REQUEST_BASE);
        assert_eq!(registry.allocate_request(), USER_REQUEST_BASE + 1);
        assert_eq!(registry.allocate_request(), USER_REQUEST_BASE + 2);
    }

    #[test]
    fn test_allocator_wraps_into_user_band() {
        let registry = IndicatorRegistry::new();
        registry.next_request.store(u32::MAX, Ordering::Relaxed);
        assert_eq!(registry.allocate_request(), u32::MAX);
        // Wraps past the reserved low ids straight back to the base
        assert_eq!(registry.allocate_request(), USER_REQUEST_BASE);
        assert_eq!(registry.allocate_request(), USER_REQUEST_BASE + 1);
    }

    #[test]
    fn test_reserve_confirm_lookup() {
        let registry = IndicatorRegistry::new();
        let request = registry.reserve_request(7);
        assert_eq!(registry.lookup_object(7), None);

        let confirmation = registry.confirm_object(request, 4242).unwrap();
        assert_eq!(confirmation.indicator, 7);
        assert_eq!(confirmation.replaced, None);
        assert_eq!(registry.lookup_object(7), Some(4242));
        assert_eq!(registry.tracked_count(), 1);
    }

    #[test]
    fn test_second_confirm_is_noop() {
        let registry = IndicatorRegistry::new();
        let request = registry.reserve_request(7);
        assert!(registry.confirm_object(request, 4242).is_some());
        // The pending entry is consumed by the first confirmation
        assert_eq!(registry.confirm_object(request, 9999), None);
        assert_eq!(registry.lookup_object(7), Some(4242));
    }

    #[test]
    fn test_unknown_request_is_ignored() {
        let registry = IndicatorRegistry::new();
        assert_eq!(registry.confirm_object(12345, 1), None);
        assert_eq!(registry.tracked_count(), 0);
    }

    #[test]
    fn test_confirm_reports_replaced_handle() {
        let registry = IndicatorRegistry::new();
        let first = registry.reserve_request(3);
        registry.confirm_object(first, 100);

        let second = registry.reserve_request(3);
        let confirmation = registry.confirm_object(second, 200).unwrap();
        assert_eq!(confirmation.replaced, Some(100));
        assert_eq!(registry.lookup_object(3), Some(200));
        assert_eq!(registry.tracked_count(), 1);
    }

    #[test]
    fn test_abandon_request_drops_pending() {
        let registry = IndicatorRegistry::new();
        let request = registry.reserve_request(5);
        registry.abandon_request(request);
        assert_eq!(registry.confirm_object(request, 77), None);
    }

    #[test]
    fn test_forget() {
        let registry = IndicatorRegistry::new();
        let request = registry.reserve_request(9);
        registry.confirm_object(request, 500);

        assert_eq!(registry.forget(9), Some(500));
        assert_eq!(registry.lookup_object(9), None);
        assert_eq!(registry.forget(9), None);
    }

    #[test]
    fn test_all_external_ids() {
        let registry = IndicatorRegistry::new();
        for id in [4, 2, 8] {
            let request = registry.reserve_request(id);
            registry.confirm_object(request, u32::from(id) + 1000);
        }

        let mut ids = registry.all_external_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 4, 8]);
    }

    #[test]
    fn test_clear_wipes_pending_and_objects() {
        let registry = IndicatorRegistry::new();
        let outstanding = registry.reserve_request(1);
        let confirmed = registry.reserve_request(2);
        registry.confirm_object(confirmed, 11);

        registry.clear();
        assert_eq!(registry.tracked_count(), 0);
        assert_eq!(registry.all_external_ids(), Vec::<IndicatorId>::new());
        // The outstanding request died with the connection
        assert_eq!(registry.confirm_object(outstanding, 22), None);
    }
}
