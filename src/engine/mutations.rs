use tracing::{debug, info};

use crate::limits::*;
use crate::model::*;
use crate::observability::{CONFLICTS_TOTAL, RESERVATIONS_CLOSED_TOTAL, RESERVATIONS_CREATED_TOTAL, SWEEP_TRANSITIONS_TOTAL};

use super::conflict::*;
use super::{Engine, EngineError, WriteSet};

/// Overlap-check `span` on every listed resource, in the given order.
fn check_all(
    guards: &WriteSet,
    resource_ids: &[ResourceId],
    span: &Span,
    exclude: Option<ReservationId>,
    now: Ms,
) -> Result<(), EngineError> {
    for rid in resource_ids {
        let guard = guards.get(rid).ok_or(EngineError::UnknownResource(*rid))?;
        if let Err(e) = check_no_conflict(guard, span, exclude, now) {
            metrics::counter!(CONFLICTS_TOTAL).increment(1);
            return Err(e);
        }
    }
    Ok(())
}

/// The reservation (if any) covering `now` on a resource.
fn covering(rs: &ResourceState, now: Ms) -> Option<ReservationId> {
    rs.overlapping(&Span::new(now, now + 1))
        .next()
        .map(|i| i.reservation_id)
}

fn close_label(reason: &CloseReason) -> &'static str {
    match reason {
        CloseReason::Cancelled { .. } => "cancelled",
        CloseReason::Released => "released",
        CloseReason::Elapsed => "elapsed",
    }
}

impl Engine {
    /// Book `resource_ids` for `client_name` over `[start, end)`.
    ///
    /// All-or-nothing: if any resource conflicts, nothing is written and the
    /// error names the first conflicting resource in the caller's order.
    pub async fn create_reservation(
        &self,
        resource_ids: &[ResourceId],
        client_name: &str,
        start: Ms,
        end: Ms,
    ) -> Result<Reservation, EngineError> {
        let resource_ids = normalize_resource_ids(resource_ids)?;
        let client_name = validate_client_name(client_name)?;
        let span = validate_span(start, end)?;
        self.ensure_resources_exist(&resource_ids)?;

        let mut guards = self.lock_write(&resource_ids).await?;
        let now = self.now();
        ensure_not_ended(&span, now)?;
        if guards.values().any(|g| g.intervals.len() >= MAX_INTERVALS_PER_RESOURCE) {
            return Err(EngineError::LimitExceeded("too many reservations on resource"));
        }
        check_all(&guards, &resource_ids, &span, None, now)?;

        let id = self.allocate_id();
        let status = if span.contains_instant(now) {
            ReservationStatus::Active
        } else {
            ReservationStatus::Reserved
        };
        let reservation = Reservation {
            id,
            resource_ids: resource_ids.clone(),
            client_name,
            span,
            status,
            created_at: now,
            actual_end: None,
            closure: None,
        };

        for guard in guards.values_mut() {
            guard.insert_interval(Interval {
                reservation_id: id,
                span,
            });
        }
        self.reservations.insert(id, reservation.clone());

        metrics::counter!(RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(
            "reservation {id} created for {:?} on {resource_ids:?} [{}, {}) status {status:?}",
            reservation.client_name, span.start, span.end
        );
        self.notify_all(
            &resource_ids,
            &Event::ReservationCreated {
                id,
                client_name: reservation.client_name.clone(),
                span,
            },
        );
        Ok(reservation)
    }

    /// Move a reservation to `[new_start, new_end)` on all of its resources.
    pub async fn reschedule_reservation(
        &self,
        id: ReservationId,
        new_start: Ms,
        new_end: Ms,
    ) -> Result<Reservation, EngineError> {
        let span = validate_span(new_start, new_end)?;
        self.move_reservation(id, |_, _| Ok(span)).await
    }

    /// Change only the end of a reservation.
    pub async fn extend_reservation(
        &self,
        id: ReservationId,
        new_end: Ms,
    ) -> Result<Reservation, EngineError> {
        self.move_reservation(id, |record, _| validate_span(record.span.start, new_end))
            .await
    }

    /// Cancel a reservation. Cancelling twice is a no-op, not an error.
    pub async fn cancel_reservation(
        &self,
        id: ReservationId,
        reason: Option<String>,
    ) -> Result<Reservation, EngineError> {
        let reason = validate_reason(reason)?;
        let (mut guards, mut record) = self.lock_reservation(id).await?;
        if record.status.is_cancelled() {
            debug!("reservation {id} already cancelled");
            return Ok(record);
        }
        let now = self.now();
        self.commit_close(&mut guards, &mut record, now, CloseReason::Cancelled { reason });
        Ok(record)
    }

    /// Pull the nearest reservation due within the grace window forward to
    /// now and mark it active.
    pub async fn start_now(&self, resource_id: ResourceId) -> Result<Reservation, EngineError> {
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::UnknownResource(resource_id))?;
        let grace = self.start_grace_ms;

        let candidate = {
            let guard = rs.read().await;
            let now = self.now();
            // Index order is start order, so the first hit is the nearest.
            guard
                .intervals
                .iter()
                .filter(|i| i.span.end > now && i.span.start <= now + grace)
                .find(|i| {
                    self.reservations
                        .get(&i.reservation_id)
                        .is_some_and(|r| r.status == ReservationStatus::Reserved)
                })
                .map(|i| i.reservation_id)
        };
        let id = candidate.ok_or(EngineError::NothingToStart(resource_id))?;

        self.move_reservation(id, |record, now| {
            let due = record.span.end > now && record.span.start <= now + grace;
            if record.status != ReservationStatus::Reserved || !due {
                // Changed while we waited for the locks.
                return Err(EngineError::NothingToStart(resource_id));
            }
            Ok(Span::new(record.span.start.min(now), record.span.end))
        })
        .await
    }

    /// Free a resource now by closing whatever reservation covers the
    /// current instant. `None` if the resource was already free.
    pub async fn release_resource(
        &self,
        resource_id: ResourceId,
    ) -> Result<Option<Reservation>, EngineError> {
        let rs = self
            .get_resource(&resource_id)
            .ok_or(EngineError::UnknownResource(resource_id))?;
        let candidate = {
            let guard = rs.read().await;
            covering(&guard, self.now())
        };
        let Some(id) = candidate else {
            return Ok(None);
        };

        let (mut guards, mut record) = self.lock_reservation(id).await?;
        let now = self.now();
        if record.status.is_cancelled() || !record.span.contains_instant(now) {
            return Ok(None);
        }
        self.commit_close(&mut guards, &mut record, now, CloseReason::Released);
        Ok(Some(record))
    }

    /// Lifecycle bookkeeping driven by the clock: Reserved → Active once a
    /// reservation covers now, anything open → Cancelled (elapsed) once its
    /// end has passed. Never touches start/end.
    pub async fn sweep(&self) -> SweepReport {
        let mut guards = self.lock_all_write().await;
        let now = self.now();

        let due: Vec<ReservationId> = self
            .reservations
            .iter()
            .filter(|r| {
                !r.status.is_cancelled()
                    && (r.span.end <= now
                        || (r.status == ReservationStatus::Reserved && r.span.start <= now))
            })
            .map(|r| r.id)
            .collect();

        let mut report = SweepReport::default();
        for id in due {
            let Some(mut record) = self.reservations.get(&id).map(|r| r.value().clone()) else {
                continue;
            };
            if record.span.end <= now {
                self.commit_close(&mut guards, &mut record, now, CloseReason::Elapsed);
                metrics::counter!(SWEEP_TRANSITIONS_TOTAL, "to" => "cancelled").increment(1);
                report.elapsed += 1;
            } else if record.transition(ReservationStatus::Active) {
                self.reservations.insert(id, record.clone());
                self.notify_all(&record.resource_ids, &Event::ReservationActivated { id });
                metrics::counter!(SWEEP_TRANSITIONS_TOTAL, "to" => "active").increment(1);
                report.activated += 1;
            }
        }

        if report != SweepReport::default() {
            debug!(
                "sweep at {now}: {} activated, {} elapsed",
                report.activated, report.elapsed
            );
        }
        report
    }

    /// Shared body of reschedule / extend / start-now. `make_span` sees the
    /// record as read under the locks and returns the new window.
    async fn move_reservation<F>(
        &self,
        id: ReservationId,
        make_span: F,
    ) -> Result<Reservation, EngineError>
    where
        F: FnOnce(&Reservation, Ms) -> Result<Span, EngineError>,
    {
        let (mut guards, mut record) = self.lock_reservation(id).await?;
        if record.status.is_cancelled() {
            return Err(EngineError::AlreadyCancelled(id));
        }
        let now = self.now();
        let span = make_span(&record, now)?;
        ensure_not_ended(&span, now)?;
        if record.span.start <= now && span.start != record.span.start {
            return Err(EngineError::AlreadyStarted(id));
        }
        check_all(&guards, &record.resource_ids, &span, Some(id), now)?;

        let moved = record.span != span;
        for rid in &record.resource_ids {
            if let Some(guard) = guards.get_mut(rid) {
                guard.update_interval(id, span);
            }
        }
        record.span = span;
        let activated = span.contains_instant(now) && record.transition(ReservationStatus::Active);
        self.reservations.insert(id, record.clone());
        drop(guards);

        if moved {
            info!("reservation {id} moved to [{}, {})", span.start, span.end);
            self.notify_all(&record.resource_ids, &Event::ReservationRescheduled { id, span });
        }
        if activated {
            info!("reservation {id} active");
            self.notify_all(&record.resource_ids, &Event::ReservationActivated { id });
        }
        Ok(record)
    }

    /// Close `record` and drop it from the index. Caller holds the write
    /// locks of all its resources.
    fn commit_close(&self, guards: &mut WriteSet, record: &mut Reservation, now: Ms, reason: CloseReason) {
        let label = close_label(&reason);
        let elapsed = reason == CloseReason::Elapsed;
        if !record.close(now, reason) {
            return;
        }
        for rid in &record.resource_ids {
            if let Some(guard) = guards.get_mut(rid) {
                guard.remove_interval(record.id);
            }
        }
        self.reservations.insert(record.id, record.clone());

        metrics::counter!(RESERVATIONS_CLOSED_TOTAL, "reason" => label).increment(1);
        let event = if elapsed {
            Event::ReservationElapsed { id: record.id }
        } else {
            info!(
                "reservation {} closed ({label}), occupancy ended at {:?}",
                record.id, record.actual_end
            );
            Event::ReservationCancelled {
                id: record.id,
                actual_end: record.actual_end,
            }
        };
        self.notify_all(&record.resource_ids, &event);
    }
}
