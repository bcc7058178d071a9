//! JSON shapes of the HTTP API. Field names follow the club front-ends
//! (`clientName`, `futureReservations`, ...); the older `computerIds`,
//! `startTime` and `endTime` request names are accepted as aliases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::*;

pub fn to_datetime(ms: Ms) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

// ── Responses ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FutureReservationDto {
    pub reservation_id: ReservationId,
    pub client_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
    pub id: ResourceId,
    pub label: String,
    pub status: ResourceStatus,
    pub client_name: Option<String>,
    pub active_reservation_id: Option<ReservationId>,
    pub active_start: Option<DateTime<Utc>>,
    pub active_end: Option<DateTime<Utc>>,
    pub future_reservations: Vec<FutureReservationDto>,
}

impl From<ResourceView> for ResourceDto {
    fn from(view: ResourceView) -> Self {
        let active = view.active;
        Self {
            id: view.id,
            label: view.label,
            status: view.status,
            client_name: active.as_ref().map(|a| a.client_name.clone()),
            active_reservation_id: active.as_ref().map(|a| a.reservation_id),
            active_start: active.as_ref().map(|a| to_datetime(a.start)),
            active_end: active.as_ref().map(|a| to_datetime(a.end)),
            future_reservations: view
                .upcoming
                .into_iter()
                .map(|u| FutureReservationDto {
                    reservation_id: u.reservation_id,
                    client_name: u.client_name,
                    start: to_datetime(u.start),
                    end: to_datetime(u.end),
                    status: u.status,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub id: ReservationId,
    pub resource_ids: Vec<ResourceId>,
    pub client_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub actual_end: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// `cancelled`, `released` or `elapsed`.
    pub close_reason: Option<String>,
    pub cancel_reason: Option<String>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        let (closed_at, close_reason, cancel_reason) = match r.closure {
            None => (None, None, None),
            Some(Closure { at, reason }) => {
                let (kind, text) = match reason {
                    CloseReason::Cancelled { reason } => ("cancelled", reason),
                    CloseReason::Released => ("released", None),
                    CloseReason::Elapsed => ("elapsed", None),
                };
                (Some(to_datetime(at)), Some(kind.to_string()), text)
            }
        };
        Self {
            id: r.id,
            resource_ids: r.resource_ids,
            client_name: r.client_name,
            start: to_datetime(r.span.start),
            end: to_datetime(r.span.end),
            status: r.status,
            created_at: to_datetime(r.created_at),
            actual_end: r.actual_end.map(to_datetime),
            closed_at,
            close_reason,
            cancel_reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanDto {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<Span> for SpanDto {
    fn from(s: Span) -> Self {
        Self {
            start: to_datetime(s.start),
            end: to_datetime(s.end),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccupancyBucketDto {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub busy: u32,
}

impl From<OccupancyBucket> for OccupancyBucketDto {
    fn from(b: OccupancyBucket) -> Self {
        Self {
            start: to_datetime(b.span.start),
            end: to_datetime(b.span.end),
            busy: b.busy,
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[serde(alias = "computerIds")]
    pub resource_ids: Vec<ResourceId>,
    pub client_name: String,
    #[serde(alias = "startTime")]
    pub start: DateTime<Utc>,
    #[serde(alias = "endTime")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    #[serde(alias = "startTime")]
    pub start: DateTime<Utc>,
    #[serde(alias = "endTime")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendRequest {
    #[serde(alias = "endTime")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelQuery {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub min_duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAvailabilityQuery {
    /// Comma-separated resource ids.
    pub resource_ids: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Defaults to all of `resource_ids`.
    pub min_available: Option<usize>,
    pub min_duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bucket_minutes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_original_field_names() {
        let body = r#"{
            "computerIds": [1, 2],
            "clientName": "Alice",
            "startTime": "2026-10-16T10:00:00Z",
            "endTime": "2026-10-16T11:00:00Z"
        }"#;
        let req: CreateReservationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.resource_ids, vec![1, 2]);
        assert_eq!((req.end - req.start).num_minutes(), 60);
    }

    #[test]
    fn resource_dto_field_names() {
        let view = ResourceView {
            id: 1,
            label: "PC-1".into(),
            status: ResourceStatus::Busy,
            active: Some(ActiveReservation {
                reservation_id: 5,
                client_name: "Alice".into(),
                start: 0,
                end: 3_600_000,
            }),
            upcoming: vec![],
        };
        let json = serde_json::to_value(ResourceDto::from(view)).unwrap();
        assert_eq!(json["status"], "Busy");
        assert_eq!(json["clientName"], "Alice");
        assert_eq!(json["activeReservationId"], 5);
        assert_eq!(json["activeEnd"], "1970-01-01T01:00:00Z");
        assert!(json["futureReservations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn reservation_dto_close_fields() {
        let r = Reservation {
            id: 2,
            resource_ids: vec![3],
            client_name: "Bob".into(),
            span: Span::new(0, 7_200_000),
            status: ReservationStatus::Cancelled,
            created_at: 0,
            actual_end: Some(1_800_000),
            closure: Some(Closure {
                at: 1_800_000,
                reason: CloseReason::Cancelled {
                    reason: Some("left early".into()),
                },
            }),
        };
        let json = serde_json::to_value(ReservationDto::from(r)).unwrap();
        assert_eq!(json["status"], "Cancelled");
        assert_eq!(json["closeReason"], "cancelled");
        assert_eq!(json["cancelReason"], "left early");
        assert_eq!(json["actualEnd"], "1970-01-01T00:30:00Z");
        assert_eq!(json["end"], "1970-01-01T02:00:00Z");
    }
}
