use crate::model::*;
use crate::registry::Resource;

/// Derive a resource's observable state from the reservations on it and `now`.
///
/// Pure: no reservation is modified, so repeated calls with the same inputs
/// agree. Cancelled reservations are ignored even if passed in.
pub fn reconcile(resource: &Resource, reservations: &[&Reservation], now: Ms) -> ResourceView {
    let mut active: Option<&Reservation> = None;
    let mut upcoming: Vec<&Reservation> = Vec::new();

    for &r in reservations {
        if r.status.is_cancelled() {
            continue;
        }
        if r.span.contains_instant(now) {
            // Non-overlap means at most one can cover now; keep the earliest
            // start for a stable answer regardless of input order.
            if active.is_none_or(|a| r.span.start < a.span.start) {
                active = Some(r);
            }
        } else if r.span.start > now {
            upcoming.push(r);
        }
    }
    upcoming.sort_by_key(|r| (r.span.start, r.id));

    ResourceView {
        id: resource.id,
        label: resource.label.clone(),
        status: if active.is_some() {
            ResourceStatus::Busy
        } else {
            ResourceStatus::Free
        },
        active: active.map(|r| ActiveReservation {
            reservation_id: r.id,
            client_name: r.client_name.clone(),
            start: r.span.start,
            end: r.span.end,
        }),
        upcoming: upcoming
            .into_iter()
            .map(|r| UpcomingReservation {
                reservation_id: r.id,
                client_name: r.client_name.clone(),
                start: r.span.start,
                end: r.span.end,
                status: r.status,
            })
            .collect(),
    }
}
