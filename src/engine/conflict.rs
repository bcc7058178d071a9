use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// Shape checks for a booking window. Says nothing about "now".
pub(crate) fn validate_span(start: Ms, end: Ms) -> Result<Span, EngineError> {
    if end <= start {
        return Err(EngineError::InvalidInterval { start, end });
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    let span = Span::new(start, end);
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(span)
}

/// A window that has fully passed cannot be booked or moved into.
pub(crate) fn ensure_not_ended(span: &Span, now: Ms) -> Result<(), EngineError> {
    if span.end <= now {
        return Err(EngineError::AlreadyEnded { end: span.end });
    }
    Ok(())
}

pub(crate) fn validate_client_name(name: &str) -> Result<String, EngineError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidClientName);
    }
    if trimmed.len() > MAX_CLIENT_NAME_LEN {
        return Err(EngineError::LimitExceeded("client name too long"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_reason(reason: Option<String>) -> Result<Option<String>, EngineError> {
    match reason {
        Some(r) if r.len() > MAX_REASON_LEN => Err(EngineError::LimitExceeded("reason too long")),
        Some(r) if r.trim().is_empty() => Ok(None),
        Some(r) => Ok(Some(r.trim().to_string())),
        None => Ok(None),
    }
}

/// Drop repeated ids, keeping the caller's order.
pub(crate) fn normalize_resource_ids(ids: &[ResourceId]) -> Result<Vec<ResourceId>, EngineError> {
    if ids.is_empty() {
        return Err(EngineError::Validation("resourceIds required".into()));
    }
    let mut out: Vec<ResourceId> = Vec::with_capacity(ids.len());
    for &id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    if out.len() > MAX_RESOURCES_PER_RESERVATION {
        return Err(EngineError::LimitExceeded("too many resources in one reservation"));
    }
    Ok(out)
}

pub(crate) fn check_no_conflict(
    rs: &ResourceState,
    span: &Span,
    exclude: Option<ReservationId>,
    now: Ms,
) -> Result<(), EngineError> {
    match rs.first_overlap(span, exclude, now) {
        Some(other) => {
            tracing::debug!(
                "conflict on resource {} for [{}, {}) with reservation {other}",
                rs.id,
                span.start,
                span.end
            );
            Err(EngineError::Conflict(rs.id))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: Ms = 1_700_000_000_000;

    #[test]
    fn span_must_be_forward() {
        assert_eq!(
            validate_span(T0, T0),
            Err(EngineError::InvalidInterval { start: T0, end: T0 })
        );
        assert!(matches!(validate_span(T0 + 1, T0), Err(EngineError::InvalidInterval { .. })));
        assert_eq!(validate_span(T0, T0 + 1), Ok(Span::new(T0, T0 + 1)));
    }

    #[test]
    fn span_limits() {
        assert_eq!(
            validate_span(0, 10),
            Err(EngineError::LimitExceeded("timestamp out of range"))
        );
        assert_eq!(
            validate_span(T0, T0 + MAX_SPAN_DURATION_MS + 1),
            Err(EngineError::LimitExceeded("span too wide"))
        );
    }

    #[test]
    fn client_name_is_trimmed() {
        assert_eq!(validate_client_name("  Alice "), Ok("Alice".to_string()));
        assert_eq!(validate_client_name("   "), Err(EngineError::InvalidClientName));
        assert_eq!(validate_client_name(""), Err(EngineError::InvalidClientName));
    }

    #[test]
    fn blank_reason_is_dropped() {
        assert_eq!(validate_reason(Some("  ".into())), Ok(None));
        assert_eq!(validate_reason(Some(" late ".into())), Ok(Some("late".into())));
        assert_eq!(validate_reason(None), Ok(None));
    }

    #[test]
    fn resource_ids_deduplicated_in_order() {
        assert_eq!(normalize_resource_ids(&[3, 1, 3, 2, 1]), Ok(vec![3, 1, 2]));
        assert!(matches!(normalize_resource_ids(&[]), Err(EngineError::Validation(_))));
    }

    #[test]
    fn conflict_names_the_resource() {
        let mut rs = ResourceState::new(4, "PC-4".into());
        rs.insert_interval(Interval {
            reservation_id: 1,
            span: Span::new(100, 200),
        });
        assert_eq!(
            check_no_conflict(&rs, &Span::new(150, 250), None, 0),
            Err(EngineError::Conflict(4))
        );
        assert_eq!(check_no_conflict(&rs, &Span::new(200, 250), None, 0), Ok(()));
        assert_eq!(check_no_conflict(&rs, &Span::new(150, 250), Some(1), 0), Ok(()));
        // Ended at 200, only waiting for the sweep.
        assert_eq!(check_no_conflict(&rs, &Span::new(150, 250), None, 200), Ok(()));
    }
}
