use std::collections::BTreeMap;

use crate::limits::*;
use crate::model::*;
use crate::registry::Resource;

use super::availability::{at_least_k_free, free_spans, merge_overlapping, occupancy_buckets};
use super::conflict::{normalize_resource_ids, validate_span};
use super::reconcile::reconcile;
use super::{Engine, EngineError, ReadSet};

fn validate_window(start: Ms, end: Ms) -> Result<Span, EngineError> {
    if end <= start {
        return Err(EngineError::InvalidInterval { start, end });
    }
    if end - start > MAX_QUERY_WINDOW_MS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }
    Ok(Span::new(start, end))
}

impl Engine {
    /// Acquire read locks on `ids` in ascending order.
    async fn lock_read(&self, ids: &[ResourceId]) -> Result<ReadSet, EngineError> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut guards = ReadSet::new();
        for id in sorted {
            let rs = self.get_resource(&id).ok_or(EngineError::UnknownResource(id))?;
            guards.insert(id, rs.read_owned().await);
        }
        Ok(guards)
    }

    /// Records for every indexed reservation of a resource, in start order.
    fn indexed_records(&self, rs: &ResourceState) -> Vec<Reservation> {
        rs.intervals
            .iter()
            .filter_map(|i| self.reservations.get(&i.reservation_id).map(|r| r.value().clone()))
            .collect()
    }

    fn view_of(&self, resource: &Resource, rs: &ResourceState, now: Ms) -> ResourceView {
        let records = self.indexed_records(rs);
        let refs: Vec<&Reservation> = records.iter().collect();
        reconcile(resource, &refs, now)
    }

    /// Live view of every resource, taken as one consistent snapshot.
    pub async fn list_resources(&self) -> Vec<ResourceView> {
        let guards = self.lock_all_read().await;
        let now = self.now();
        self.registry
            .list()
            .iter()
            .filter_map(|resource| {
                guards
                    .get(&resource.id)
                    .map(|guard| self.view_of(resource, guard, now))
            })
            .collect()
    }

    pub async fn resource_view(&self, resource_id: ResourceId) -> Result<ResourceView, EngineError> {
        let resource = self
            .registry
            .get(resource_id)
            .ok_or(EngineError::UnknownResource(resource_id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::UnknownResource(resource_id))?;
        let guard = rs.read().await;
        Ok(self.view_of(resource, &guard, self.now()))
    }

    /// Non-cancelled reservations on a resource, start ascending.
    pub async fn list_active(&self, resource_id: ResourceId) -> Result<Vec<Reservation>, EngineError> {
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::UnknownResource(resource_id))?;
        let guard = rs.read().await;
        Ok(self.indexed_records(&guard))
    }

    /// Every reservation ever made, most recent first.
    pub fn list_reservations(&self) -> Vec<Reservation> {
        let mut all: Vec<Reservation> = self
            .reservations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        all
    }

    pub fn get_reservation(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        self.reservations
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(EngineError::UnknownReservation(id))
    }

    /// Would `[start, end)` collide with anything on the resource other than `exclude`?
    pub async fn overlaps(
        &self,
        resource_id: ResourceId,
        start: Ms,
        end: Ms,
        exclude: Option<ReservationId>,
    ) -> Result<bool, EngineError> {
        let span = validate_span(start, end)?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::UnknownResource(resource_id))?;
        let guard = rs.read().await;
        Ok(guard.first_overlap(&span, exclude, self.now()).is_some())
    }

    pub async fn compute_availability(
        &self,
        resource_id: ResourceId,
        query_start: Ms,
        query_end: Ms,
        min_duration_ms: Option<Ms>,
    ) -> Result<Vec<Span>, EngineError> {
        let query = validate_window(query_start, query_end)?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::UnknownResource(resource_id))?;
        let guard = rs.read().await;
        Ok(free_spans(&guard, &query, min_duration_ms))
    }

    /// Windows where at least `min_available` of `resource_ids` are free at once.
    pub async fn compute_multi_availability(
        &self,
        resource_ids: &[ResourceId],
        query_start: Ms,
        query_end: Ms,
        min_available: usize,
        min_duration_ms: Option<Ms>,
    ) -> Result<Vec<Span>, EngineError> {
        let query = validate_window(query_start, query_end)?;
        let resource_ids = normalize_resource_ids(resource_ids)?;
        self.ensure_resources_exist(&resource_ids)?;
        if min_available == 0 {
            return Err(EngineError::Validation("minAvailable must be at least 1".into()));
        }

        let guards = self.lock_read(&resource_ids).await?;
        let per_resource: Vec<Vec<Span>> = guards
            .values()
            .map(|guard| free_spans(guard, &query, None))
            .collect();
        drop(guards);

        let mut result = at_least_k_free(&per_resource, min_available);
        if let Some(min) = min_duration_ms {
            result.retain(|s| s.duration_ms() >= min);
        }
        Ok(result)
    }

    /// Per-bucket count of occupied resources over `[start, end)`, using the
    /// actual occupancy of closed reservations.
    pub fn occupancy(&self, start: Ms, end: Ms, bucket_ms: Ms) -> Result<Vec<OccupancyBucket>, EngineError> {
        let window = validate_window(start, end)?;
        if bucket_ms <= 0 {
            return Err(EngineError::Validation("bucket size must be positive".into()));
        }
        let buckets = (window.duration_ms() + bucket_ms - 1) / bucket_ms;
        if buckets > MAX_OCCUPANCY_BUCKETS as Ms {
            return Err(EngineError::LimitExceeded("too many buckets"));
        }

        let mut by_resource: BTreeMap<ResourceId, Vec<Span>> = BTreeMap::new();
        for entry in self.reservations.iter() {
            let Some(span) = entry.occupied_span() else {
                continue;
            };
            if !span.overlaps(&window) {
                continue;
            }
            for rid in &entry.resource_ids {
                by_resource.entry(*rid).or_default().push(span);
            }
        }

        let occupied: Vec<Vec<Span>> = self
            .registry
            .list()
            .iter()
            .map(|r| {
                let mut spans = by_resource.remove(&r.id).unwrap_or_default();
                spans.sort_by_key(|s| s.start);
                merge_overlapping(&spans)
            })
            .collect();

        Ok(occupancy_buckets(&occupied, &window, bucket_ms))
    }

    pub async fn summary(&self) -> Summary {
        let views = self.list_resources().await;
        let busy = views
            .iter()
            .filter(|v| v.status == ResourceStatus::Busy)
            .count() as u32;
        Summary {
            total: views.len() as u32,
            free: views.len() as u32 - busy,
            busy,
        }
    }
}
