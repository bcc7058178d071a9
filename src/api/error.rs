use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::engine::EngineError;
use crate::model::{ReservationId, ResourceId};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
}

/// An error on its way out as `{"error": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.into(),
                resource_id: None,
                reservation_id: None,
            },
        }
    }

    /// Booking against a computer that does not exist is a bad request, not
    /// a missing route target.
    pub fn for_create(err: EngineError) -> Self {
        let unknown = matches!(err, EngineError::UnknownResource(_));
        let mut api = Self::from(err);
        if unknown {
            api.status = StatusCode::BAD_REQUEST;
        }
        api
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let (status, resource_id, reservation_id) = match &err {
            EngineError::Validation(_)
            | EngineError::InvalidClientName
            | EngineError::InvalidInterval { .. }
            | EngineError::AlreadyEnded { .. }
            | EngineError::LimitExceeded(_) => (StatusCode::BAD_REQUEST, None, None),
            EngineError::UnknownResource(id) | EngineError::NothingToStart(id) => {
                (StatusCode::NOT_FOUND, Some(*id), None)
            }
            EngineError::UnknownReservation(id) => (StatusCode::NOT_FOUND, None, Some(*id)),
            EngineError::Conflict(id) => (StatusCode::CONFLICT, Some(*id), None),
            EngineError::AlreadyCancelled(id) | EngineError::AlreadyStarted(id) => {
                (StatusCode::CONFLICT, None, Some(*id))
            }
        };
        Self {
            status,
            body: ErrorBody {
                error: err.to_string(),
                resource_id,
                reservation_id,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("request failed: {}", self.body.error);
        } else {
            tracing::debug!("request rejected ({}): {}", self.status, self.body.error);
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::from(EngineError::Conflict(2)).status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(EngineError::AlreadyCancelled(4)).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(EngineError::UnknownReservation(9)).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(EngineError::InvalidInterval { start: 5, end: 5 }).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(EngineError::AlreadyStarted(3)).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(EngineError::NothingToStart(1)).status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unknown_resource_depends_on_operation() {
        assert_eq!(
            ApiError::from(EngineError::UnknownResource(99)).status,
            StatusCode::NOT_FOUND
        );
        let create = ApiError::for_create(EngineError::UnknownResource(99));
        assert_eq!(create.status, StatusCode::BAD_REQUEST);
        assert_eq!(create.body.resource_id, Some(99));
    }

    #[test]
    fn conflict_body_names_resource() {
        let api = ApiError::from(EngineError::Conflict(2));
        let json = serde_json::to_value(&api.body).unwrap();
        assert_eq!(json["resourceId"], 2);
        assert!(json.get("reservationId").is_none());
        assert!(json["error"].as_str().unwrap().contains("computer 2"));
    }
}
