//! Fire-and-forget usage events.
//!
//! [`Telemetry::emit`] only pushes onto an unbounded channel; a background
//! task drains it into a [`TelemetrySink`]. Sink failures (no network, a dead
//! endpoint) are swallowed, so emitting can neither block nor fail a session.

use std::future::Future;

use tokio::sync::mpsc;

use crate::types::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEventKind {
    SessionPresented,
    SessionNoDiff,
    SessionApplied,
    SessionFixed,
    PresentationClosed,
}

impl TelemetryEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TelemetryEventKind::SessionPresented => "session_presented",
            TelemetryEventKind::SessionNoDiff => "session_no_diff",
            TelemetryEventKind::SessionApplied => "session_applied",
            TelemetryEventKind::SessionFixed => "session_fixed",
            TelemetryEventKind::PresentationClosed => "presentation_closed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub kind: TelemetryEventKind,
    /// Correlation key shared by every event of one session.
    pub session: SessionId,
    /// `local`, or the remote host when running over SSH.
    pub host: String,
}

/// Transport for telemetry events.
pub trait TelemetrySink: Send + 'static {
    fn send(&mut self, event: TelemetryEvent) -> impl Future<Output = Result<(), String>> + Send;
}

/// Sink that records events in the log under the `restyle::telemetry` target.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    async fn send(&mut self, event: TelemetryEvent) -> Result<(), String> {
        tracing::info!(
            target: "restyle::telemetry",
            event = event.kind.as_str(),
            session = %event.session,
            host = %event.host,
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    tx: Option<mpsc::UnboundedSender<TelemetryEvent>>,
    host: String,
}

impl Telemetry {
    /// A telemetry handle that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None, host: host_name() }
    }

    /// Starts the drain task when `enabled`; otherwise returns [`Telemetry::disabled`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: TelemetrySink>(enabled: bool, mut sink: S) -> Self {
        if !enabled {
            return Self::disabled();
        }
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.send(event).await {
                    tracing::debug!(error = %e, "telemetry event dropped");
                }
            }
        });
        Self { tx: Some(tx), host: host_name() }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn emit(&self, kind: TelemetryEventKind, session: SessionId) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(TelemetryEvent { kind, session, host: self.host.clone() });
        }
    }
}

fn host_name() -> String {
    std::env::var("SSH_CONNECTION")
        .ok()
        .and_then(|v| v.split_whitespace().nth(2).map(str::to_owned))
        .unwrap_or_else(|| "local".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Collect(Arc<Mutex<Vec<TelemetryEventKind>>>);

    impl TelemetrySink for Collect {
        async fn send(&mut self, event: TelemetryEvent) -> Result<(), String> {
            self.0.lock().unwrap().push(event.kind);
            Ok(())
        }
    }

    struct Offline;

    impl TelemetrySink for Offline {
        async fn send(&mut self, _event: TelemetryEvent) -> Result<(), String> {
            Err("network unreachable".to_owned())
        }
    }

    #[tokio::test]
    async fn events_reach_the_sink_when_enabled() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let telemetry = Telemetry::spawn(true, Collect(Arc::clone(&seen)));
        let id = SessionId::new();
        telemetry.emit(TelemetryEventKind::SessionPresented, id);
        telemetry.emit(TelemetryEventKind::SessionApplied, id);
        for _ in 0..50 {
            if seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TelemetryEventKind::SessionPresented, TelemetryEventKind::SessionApplied]
        );
    }

    #[tokio::test]
    async fn opt_out_drops_everything() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let telemetry = Telemetry::spawn(false, Collect(Arc::clone(&seen)));
        assert!(!telemetry.is_enabled());
        telemetry.emit(TelemetryEventKind::SessionNoDiff, SessionId::new());
        tokio::task::yield_now().await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let telemetry = Telemetry::spawn(true, Offline);
        telemetry.emit(TelemetryEventKind::SessionFixed, SessionId::new());
        tokio::task::yield_now().await;
        telemetry.emit(TelemetryEventKind::PresentationClosed, SessionId::new());
    }
}
