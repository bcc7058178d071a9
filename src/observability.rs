use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: HTTP requests served. Labels: route, status.
pub const HTTP_REQUESTS_TOTAL: &str = "clubslot_http_requests_total";

/// Histogram: HTTP request latency in seconds. Labels: route.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "clubslot_http_request_duration_seconds";

// ── Ledger metrics ──────────────────────────────────────────────

/// Counter: reservations created.
pub const RESERVATIONS_CREATED_TOTAL: &str = "clubslot_reservations_created_total";

/// Counter: bookings or moves rejected because of an overlap.
pub const CONFLICTS_TOTAL: &str = "clubslot_conflicts_total";

/// Counter: reservations closed. Labels: reason (cancelled, released, elapsed).
pub const RESERVATIONS_CLOSED_TOTAL: &str = "clubslot_reservations_closed_total";

/// Counter: lifecycle transitions made by the sweeper. Labels: to (active, cancelled).
pub const SWEEP_TRANSITIONS_TOTAL: &str = "clubslot_sweep_transitions_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: resources currently busy.
pub const RESOURCES_BUSY: &str = "clubslot_resources_busy";

/// Gauge: resources currently free.
pub const RESOURCES_FREE: &str = "clubslot_resources_free";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
