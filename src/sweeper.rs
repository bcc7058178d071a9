use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::Engine;
use crate::observability::{RESOURCES_BUSY, RESOURCES_FREE};

/// One sweeper pass: lifecycle bookkeeping plus the free/busy gauges.
pub async fn sweep_once(engine: &Engine) {
    let report = engine.sweep().await;
    if report.activated + report.elapsed > 0 {
        info!(
            "sweeper: {} reservation(s) activated, {} elapsed",
            report.activated, report.elapsed
        );
    }
    let summary = engine.summary().await;
    metrics::gauge!(RESOURCES_BUSY).set(summary.busy as f64);
    metrics::gauge!(RESOURCES_FREE).set(summary.free as f64);
}

/// Background task that periodically sweeps reservation lifecycles.
pub async fn run_sweeper(engine: Arc<Engine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        sweep_once(&engine).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::*;
    use crate::notify::NotifyHub;
    use crate::registry::Registry;

    const T0: Ms = 1_760_000_000_000;
    const M: Ms = 60_000;

    #[tokio::test]
    async fn sweeper_activates_then_elapses() {
        let clock = Arc::new(ManualClock::new(T0));
        let engine = Arc::new(Engine::new(
            Registry::numbered(2, "PC-").unwrap(),
            clock.clone(),
            Arc::new(NotifyHub::new()),
        ));

        let r = engine
            .create_reservation(&[1], "Alice", T0 + 10 * M, T0 + 70 * M)
            .await
            .unwrap();
        assert_eq!(r.status, ReservationStatus::Reserved);

        clock.advance(15 * M);
        sweep_once(&engine).await;
        assert_eq!(engine.get_reservation(r.id).unwrap().status, ReservationStatus::Active);

        clock.advance(60 * M);
        sweep_once(&engine).await;
        let closed = engine.get_reservation(r.id).unwrap();
        assert_eq!(closed.status, ReservationStatus::Cancelled);
        assert_eq!(closed.closure.unwrap().reason, CloseReason::Elapsed);
        assert_eq!(closed.span, Span::new(T0 + 10 * M, T0 + 70 * M));
    }

    #[tokio::test]
    async fn run_sweeper_ticks() {
        let clock = Arc::new(ManualClock::new(T0));
        let engine = Arc::new(Engine::new(
            Registry::numbered(1, "PC-").unwrap(),
            clock.clone(),
            Arc::new(NotifyHub::new()),
        ));
        let r = engine
            .create_reservation(&[1], "Bob", T0 + M, T0 + 2 * M)
            .await
            .unwrap();
        clock.advance(3 * M);

        let handle = tokio::spawn(run_sweeper(engine.clone(), Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(
            engine.get_reservation(r.id).unwrap().status,
            ReservationStatus::Cancelled
        );
    }
}
