use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use crate::model::{Ms, ReservationId, ResourceId};

use super::AppState;
use super::dto::*;
use super::error::ApiError;

const MINUTE_MS: Ms = 60_000;
const DEFAULT_BUCKET_MINUTES: i64 = 60;

fn minutes_to_ms(minutes: Option<i64>, field: &str) -> Result<Option<Ms>, ApiError> {
    match minutes {
        None => Ok(None),
        Some(m) if m < 0 => Err(ApiError::bad_request(format!("{field} must not be negative"))),
        Some(m) => m
            .checked_mul(MINUTE_MS)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("{field} out of range"))),
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<ResourceId>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| ApiError::bad_request(format!("invalid resource id {s:?}")))
        })
        .collect()
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ── Computers ────────────────────────────────────────────────────

pub async fn list_computers(State(state): State<AppState>) -> Json<Vec<ResourceDto>> {
    let views = state.engine.list_resources().await;
    Json(views.into_iter().map(ResourceDto::from).collect())
}

pub async fn get_computer(
    State(state): State<AppState>,
    path: Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<ResourceDto>, ApiError> {
    let Path(id) = path?;
    let view = state.engine.resource_view(id).await?;
    Ok(Json(view.into()))
}

pub async fn start_computer(
    State(state): State<AppState>,
    path: Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<ReservationDto>, ApiError> {
    let Path(id) = path?;
    let reservation = state.engine.start_now(id).await?;
    Ok(Json(reservation.into()))
}

pub async fn free_computer(
    State(state): State<AppState>,
    path: Result<Path<ResourceId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.engine.release_resource(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn computer_reservations(
    State(state): State<AppState>,
    path: Result<Path<ResourceId>, PathRejection>,
) -> Result<Json<Vec<ReservationDto>>, ApiError> {
    let Path(id) = path?;
    let reservations = state.engine.list_active(id).await?;
    Ok(Json(reservations.into_iter().map(ReservationDto::from).collect()))
}

pub async fn computer_availability(
    State(state): State<AppState>,
    path: Result<Path<ResourceId>, PathRejection>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<Vec<SpanDto>>, ApiError> {
    let Path(id) = path?;
    let Query(q) = query?;
    let min = minutes_to_ms(q.min_duration_minutes, "minDurationMinutes")?;
    let spans = state
        .engine
        .compute_availability(id, q.start.timestamp_millis(), q.end.timestamp_millis(), min)
        .await?;
    Ok(Json(spans.into_iter().map(SpanDto::from).collect()))
}

pub async fn multi_availability(
    State(state): State<AppState>,
    query: Result<Query<MultiAvailabilityQuery>, QueryRejection>,
) -> Result<Json<Vec<SpanDto>>, ApiError> {
    let Query(q) = query?;
    let ids = parse_id_list(&q.resource_ids)?;
    let min = minutes_to_ms(q.min_duration_minutes, "minDurationMinutes")?;
    let min_available = q.min_available.unwrap_or(ids.len());
    let spans = state
        .engine
        .compute_multi_availability(
            &ids,
            q.start.timestamp_millis(),
            q.end.timestamp_millis(),
            min_available,
            min,
        )
        .await?;
    Ok(Json(spans.into_iter().map(SpanDto::from).collect()))
}

// ── Reservations ─────────────────────────────────────────────────

pub async fn create_reservation(
    State(state): State<AppState>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let reservation = state
        .engine
        .create_reservation(
            &req.resource_ids,
            &req.client_name,
            req.start.timestamp_millis(),
            req.end.timestamp_millis(),
        )
        .await
        .map_err(ApiError::for_create)?;
    let location = format!("/api/reservations/{}", reservation.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ReservationDto::from(reservation)),
    ))
}

pub async fn list_reservations(State(state): State<AppState>) -> Json<Vec<ReservationDto>> {
    let all = state.engine.list_reservations();
    Json(all.into_iter().map(ReservationDto::from).collect())
}

pub async fn get_reservation(
    State(state): State<AppState>,
    path: Result<Path<ReservationId>, PathRejection>,
) -> Result<Json<ReservationDto>, ApiError> {
    let Path(id) = path?;
    let reservation = state.engine.get_reservation(id)?;
    Ok(Json(reservation.into()))
}

pub async fn reschedule_reservation(
    State(state): State<AppState>,
    path: Result<Path<ReservationId>, PathRejection>,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    state
        .engine
        .reschedule_reservation(id, req.start.timestamp_millis(), req.end.timestamp_millis())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn extend_reservation(
    State(state): State<AppState>,
    path: Result<Path<ReservationId>, PathRejection>,
    payload: Result<Json<ExtendRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    state
        .engine
        .extend_reservation(id, req.end.timestamp_millis())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    path: Result<Path<ReservationId>, PathRejection>,
    query: Result<Query<CancelQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    let Query(q) = query?;
    state.engine.cancel_reservation(id, q.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Stats ────────────────────────────────────────────────────────

pub async fn occupancy(
    State(state): State<AppState>,
    query: Result<Query<OccupancyQuery>, QueryRejection>,
) -> Result<Json<Vec<OccupancyBucketDto>>, ApiError> {
    let Query(q) = query?;
    let bucket_ms = minutes_to_ms(Some(q.bucket_minutes.unwrap_or(DEFAULT_BUCKET_MINUTES)), "bucketMinutes")?
        .unwrap_or(DEFAULT_BUCKET_MINUTES * MINUTE_MS);
    let buckets = state
        .engine
        .occupancy(q.start.timestamp_millis(), q.end.timestamp_millis(), bucket_ms)?;
    Ok(Json(buckets.into_iter().map(OccupancyBucketDto::from).collect()))
}

pub async fn summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.summary().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parsing() {
        assert_eq!(parse_id_list("1, 2,3,").unwrap(), vec![1, 2, 3]);
        assert!(parse_id_list("1,x").is_err());
        assert!(parse_id_list("").unwrap().is_empty());
    }

    #[test]
    fn minutes_conversion() {
        assert_eq!(minutes_to_ms(None, "m").unwrap(), None);
        assert_eq!(minutes_to_ms(Some(30), "m").unwrap(), Some(30 * MINUTE_MS));
        assert!(minutes_to_ms(Some(-1), "m").is_err());
        assert!(minutes_to_ms(Some(i64::MAX), "m").is_err());
    }
}
