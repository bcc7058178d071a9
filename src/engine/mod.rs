mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod reconcile;

pub use availability::{at_least_k_free, free_spans, merge_overlapping, occupancy_buckets, subtract_intervals};
pub use error::EngineError;
pub use reconcile::reconcile;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::clock::Clock;
use crate::limits::DEFAULT_START_GRACE_MS;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::registry::Registry;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

/// Write guards over a set of resources, acquired in ascending id order.
pub(super) type WriteSet = BTreeMap<ResourceId, OwnedRwLockWriteGuard<ResourceState>>;
pub(super) type ReadSet = BTreeMap<ResourceId, OwnedRwLockReadGuard<ResourceState>>;

/// Reservation ledger, interval index and status reconciler for one pool.
///
/// Locking discipline: a reservation record is only modified while every
/// resource it covers is write-locked, and locks are always taken in
/// ascending resource id order.
pub struct Engine {
    pub registry: Registry,
    /// Interval index per resource. Fixed key set, so ordered iteration is free.
    pub(super) state: BTreeMap<ResourceId, SharedResourceState>,
    /// Authoritative reservation records, cancelled ones included.
    pub(super) reservations: DashMap<ReservationId, Reservation>,
    next_id: AtomicU64,
    pub(super) clock: Arc<dyn Clock>,
    pub notify: Arc<NotifyHub>,
    pub(super) start_grace_ms: Ms,
}

impl Engine {
    pub fn new(registry: Registry, clock: Arc<dyn Clock>, notify: Arc<NotifyHub>) -> Self {
        let state = registry
            .list()
            .iter()
            .map(|r| {
                let rs = ResourceState::new(r.id, r.label.clone());
                (r.id, Arc::new(RwLock::new(rs)))
            })
            .collect();

        Self {
            registry,
            state,
            reservations: DashMap::new(),
            next_id: AtomicU64::new(1),
            clock,
            notify,
            start_grace_ms: DEFAULT_START_GRACE_MS,
        }
    }

    /// How far ahead `start_now` looks for a reservation to pull forward.
    pub fn with_start_grace(mut self, grace_ms: Ms) -> Self {
        self.start_grace_ms = grace_ms;
        self
    }

    pub fn now(&self) -> Ms {
        self.clock.now_ms()
    }

    pub fn get_resource(&self, id: &ResourceId) -> Option<SharedResourceState> {
        self.state.get(id).cloned()
    }

    pub(super) fn allocate_id(&self) -> ReservationId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(super) fn ensure_resources_exist(&self, ids: &[ResourceId]) -> Result<(), EngineError> {
        match ids.iter().find(|id| !self.state.contains_key(id)) {
            Some(&missing) => Err(EngineError::UnknownResource(missing)),
            None => Ok(()),
        }
    }

    /// Acquire write locks on `ids` in ascending order.
    pub(super) async fn lock_write(&self, ids: &[ResourceId]) -> Result<WriteSet, EngineError> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut guards = WriteSet::new();
        for id in sorted {
            let rs = self.get_resource(&id).ok_or(EngineError::UnknownResource(id))?;
            guards.insert(id, rs.write_owned().await);
        }
        Ok(guards)
    }

    pub(super) async fn lock_all_write(&self) -> WriteSet {
        let mut guards = WriteSet::new();
        for (id, rs) in &self.state {
            guards.insert(*id, rs.clone().write_owned().await);
        }
        guards
    }

    pub(super) async fn lock_all_read(&self) -> ReadSet {
        let mut guards = ReadSet::new();
        for (id, rs) in &self.state {
            guards.insert(*id, rs.clone().read_owned().await);
        }
        guards
    }

    /// Lock the resources of an existing reservation and return them together
    /// with a fresh copy of the record read under those locks.
    pub(super) async fn lock_reservation(
        &self,
        id: ReservationId,
    ) -> Result<(WriteSet, Reservation), EngineError> {
        let resource_ids = self
            .reservations
            .get(&id)
            .map(|r| r.resource_ids.clone())
            .ok_or(EngineError::UnknownReservation(id))?;
        // Resource sets never change after creation, so the lock set stays valid.
        let guards = self.lock_write(&resource_ids).await?;
        let record = self
            .reservations
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(EngineError::UnknownReservation(id))?;
        Ok((guards, record))
    }

    pub(super) fn notify_all(&self, resource_ids: &[ResourceId], event: &Event) {
        for rid in resource_ids {
            self.notify.send(*rid, event);
        }
    }
}
