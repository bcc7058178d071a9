use serde::{Deserialize, Serialize};

/// Unix milliseconds. The only time type inside the engine.
pub type Ms = i64;

pub type ResourceId = u32;
pub type ReservationId = u64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// One entry of a resource's interval index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub reservation_id: ReservationId,
    pub span: Span,
}

/// Per-resource interval index: every non-cancelled reservation that
/// includes the resource, sorted by `span.start`. Live entries never overlap
/// each other; an ended entry awaiting the sweep may overlap a newer one.
#[derive(Debug, Clone)]
pub struct ResourceState {
    pub id: ResourceId,
    pub label: String,
    pub intervals: Vec<Interval>,
}

impl ResourceState {
    pub fn new(id: ResourceId, label: String) -> Self {
        Self {
            id,
            label,
            intervals: Vec::new(),
        }
    }

    /// Insert interval maintaining sort order by span.start.
    pub fn insert_interval(&mut self, interval: Interval) {
        let pos = self
            .intervals
            .binary_search_by_key(&interval.span.start, |i| i.span.start)
            .unwrap_or_else(|e| e);
        self.intervals.insert(pos, interval);
    }

    /// Remove interval by reservation id.
    pub fn remove_interval(&mut self, reservation_id: ReservationId) -> Option<Interval> {
        let pos = self
            .intervals
            .iter()
            .position(|i| i.reservation_id == reservation_id)?;
        Some(self.intervals.remove(pos))
    }

    /// Move an indexed reservation to a new span. Returns false if it was not indexed.
    pub fn update_interval(&mut self, reservation_id: ReservationId, span: Span) -> bool {
        if self.remove_interval(reservation_id).is_none() {
            return false;
        }
        self.insert_interval(Interval {
            reservation_id,
            span,
        });
        true
    }

    /// Return only intervals whose span overlaps the query window.
    /// Uses binary search to skip intervals starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Interval> {
        let right_bound = self
            .intervals
            .partition_point(|i| i.span.start < query.end);
        self.intervals[..right_bound]
            .iter()
            .filter(move |i| i.span.end > query.start)
    }

    /// First indexed reservation overlapping `span`, ignoring `exclude` and
    /// anything that ended at or before `now` but has not been swept yet.
    pub fn first_overlap(
        &self,
        span: &Span,
        exclude: Option<ReservationId>,
        now: Ms,
    ) -> Option<ReservationId> {
        self.overlapping(span)
            .find(|i| Some(i.reservation_id) != exclude && i.span.end > now)
            .map(|i| i.reservation_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Reserved,
    Active,
    Cancelled,
}

impl ReservationStatus {
    /// Forward-only lifecycle: Reserved → Active → Cancelled, Reserved → Cancelled.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Reserved, Active) | (Reserved, Cancelled) | (Active, Cancelled)
        )
    }

    pub fn is_cancelled(self) -> bool {
        self == ReservationStatus::Cancelled
    }
}

/// Why a reservation left the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    Cancelled { reason: Option<String> },
    /// The resource was freed by an operator while the reservation was running.
    Released,
    /// The booked end passed.
    Elapsed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub at: Ms,
    pub reason: CloseReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_ids: Vec<ResourceId>,
    pub client_name: String,
    /// The booked window. Closing a reservation never changes it.
    pub span: Span,
    pub status: ReservationStatus,
    pub created_at: Ms,
    /// When occupancy actually stopped; set on close if it had begun.
    pub actual_end: Option<Ms>,
    pub closure: Option<Closure>,
}

impl Reservation {
    /// Apply a status change if the lifecycle allows it.
    pub fn transition(&mut self, next: ReservationStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Close the reservation at `now`. The booked span stays as it was.
    pub fn close(&mut self, now: Ms, reason: CloseReason) -> bool {
        if !self.transition(ReservationStatus::Cancelled) {
            return false;
        }
        self.actual_end = match reason {
            CloseReason::Elapsed => Some(self.span.end),
            _ if self.span.start <= now => Some(now.min(self.span.end)),
            _ => None,
        };
        self.closure = Some(Closure { at: now, reason });
        true
    }

    /// Time this reservation actually held its resources, if any.
    pub fn occupied_span(&self) -> Option<Span> {
        if !self.status.is_cancelled() {
            return Some(self.span);
        }
        let end = self.actual_end?;
        (end > self.span.start).then(|| Span::new(self.span.start, end))
    }
}

/// Change notifications, fanned out per resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    ReservationCreated {
        id: ReservationId,
        client_name: String,
        span: Span,
    },
    #[serde(rename_all = "camelCase")]
    ReservationRescheduled {
        id: ReservationId,
        span: Span,
    },
    #[serde(rename_all = "camelCase")]
    ReservationActivated {
        id: ReservationId,
    },
    #[serde(rename_all = "camelCase")]
    ReservationCancelled {
        id: ReservationId,
        actual_end: Option<Ms>,
    },
    #[serde(rename_all = "camelCase")]
    ReservationElapsed {
        id: ReservationId,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ReservationCreated { .. } => "reservationCreated",
            Event::ReservationRescheduled { .. } => "reservationRescheduled",
            Event::ReservationActivated { .. } => "reservationActivated",
            Event::ReservationCancelled { .. } => "reservationCancelled",
            Event::ReservationElapsed { .. } => "reservationElapsed",
        }
    }
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Free,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveReservation {
    pub reservation_id: ReservationId,
    pub client_name: String,
    pub start: Ms,
    pub end: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingReservation {
    pub reservation_id: ReservationId,
    pub client_name: String,
    pub start: Ms,
    pub end: Ms,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceView {
    pub id: ResourceId,
    pub label: String,
    pub status: ResourceStatus,
    pub active: Option<ActiveReservation>,
    pub upcoming: Vec<UpcomingReservation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyBucket {
    pub span: Span,
    pub busy: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: u32,
    pub free: u32,
    pub busy: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub activated: usize,
    pub elapsed: usize,
}
