use crate::model::{Ms, ReservationId, ResourceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Input has the wrong shape.
    Validation(String),
    UnknownResource(ResourceId),
    UnknownReservation(ReservationId),
    InvalidClientName,
    InvalidInterval { start: Ms, end: Ms },
    AlreadyEnded { end: Ms },
    Conflict(ResourceId),
    AlreadyCancelled(ReservationId),
    /// Occupancy has begun, so only the end may still move.
    AlreadyStarted(ReservationId),
    NothingToStart(ResourceId),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "invalid request: {msg}"),
            EngineError::UnknownResource(id) => write!(f, "computer {id} not found"),
            EngineError::UnknownReservation(id) => write!(f, "reservation {id} not found"),
            EngineError::InvalidClientName => write!(f, "clientName required"),
            EngineError::InvalidInterval { start, end } => {
                write!(f, "end must be after start: [{start}, {end})")
            }
            EngineError::AlreadyEnded { end } => {
                write!(f, "window ending at {end} is already in the past")
            }
            EngineError::Conflict(id) => {
                write!(f, "computer {id} is already reserved in this period")
            }
            EngineError::AlreadyCancelled(id) => write!(f, "reservation {id} is cancelled"),
            EngineError::AlreadyStarted(id) => {
                write!(f, "reservation {id} has already started, only its end can change")
            }
            EngineError::NothingToStart(id) => {
                write!(f, "no reservation on computer {id} is due to start")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
