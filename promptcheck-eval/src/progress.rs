//! Append-only progress reporting for pipeline runs.
//!
//! Every phase transition is recorded as a timestamped [`ProgressEvent`].
//! The log only grows; events are never rewritten, so an observer that
//! replays it sees the run exactly as it happened, in order. A reporter can
//! additionally forward each event over a channel for live streaming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Lifecycle state a phase transition announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    /// Phase is underway
    Running,
    /// Phase finished normally
    Completed,
    /// Phase terminated the run
    Error,
}

/// One timestamped entry in the progress log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,

    /// Pipeline phase ("generation", "evaluation", "optimization", ...)
    pub phase: String,

    /// What happened to the phase
    pub status: PhaseStatus,

    /// Human-readable detail, e.g. "case 3/5"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProgressEvent {
    fn new(phase: &str, status: PhaseStatus, details: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            phase: phase.to_string(),
            status,
            details,
        }
    }
}

/// Collects progress events and optionally forwards them live.
///
/// The reporter owns the canonical event log; a subscriber channel, if
/// attached, receives a copy of each event at the moment it is recorded.
/// A closed subscriber never blocks recording.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    events: Vec<ProgressEvent>,
    subscriber: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Create a reporter with no subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reporter that forwards each event to `subscriber` as it is
    /// recorded.
    pub fn with_subscriber(subscriber: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            events: Vec::new(),
            subscriber: Some(subscriber),
        }
    }

    /// Record that a phase is running.
    pub fn running(&mut self, phase: &str, details: impl Into<String>) {
        self.emit(ProgressEvent::new(
            phase,
            PhaseStatus::Running,
            Some(details.into()),
        ));
    }

    /// Record a phase completion.
    pub fn completed(&mut self, phase: &str, details: impl Into<String>) {
        self.emit(ProgressEvent::new(
            phase,
            PhaseStatus::Completed,
            Some(details.into()),
        ));
    }

    /// Record a phase error.
    pub fn error(&mut self, phase: &str, details: impl Into<String>) {
        self.emit(ProgressEvent::new(
            phase,
            PhaseStatus::Error,
            Some(details.into()),
        ));
    }

    fn emit(&mut self, event: ProgressEvent) {
        log::debug!(
            "[{}] {:?}: {}",
            event.phase,
            event.status,
            event.details.as_deref().unwrap_or("")
        );
        if let Some(subscriber) = &self.subscriber {
            // Receiver may have hung up; the log is still authoritative.
            let _ = subscriber.send(event.clone());
        }
        self.events.push(event);
    }

    /// The full event log, in recording order.
    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Consume the reporter, yielding the event log.
    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_ordered_and_timestamped() {
        let mut reporter = ProgressReporter::new();
        reporter.running("generation", "generating 5 cases");
        reporter.completed("generation", "generated 5 cases");
        reporter.running("evaluation", "running 5 cases");

        let events = reporter.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].status, PhaseStatus::Running);
        assert_eq!(events[1].status, PhaseStatus::Completed);

        for pair in events.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_copies() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::with_subscriber(tx);

        reporter.running("generation", "go");
        reporter.error("generation", "no array found");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.phase, "generation");
        assert_eq!(first.status, PhaseStatus::Running);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.status, PhaseStatus::Error);

        // The canonical log kept its own copies.
        assert_eq!(reporter.events().len(), 2);
    }

    #[test]
    fn test_closed_subscriber_does_not_block_recording() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let mut reporter = ProgressReporter::with_subscriber(tx);
        reporter.running("evaluation", "still recorded");
        assert_eq!(reporter.events().len(), 1);
    }

    #[test]
    fn test_event_serializes_with_status_tag() {
        let mut reporter = ProgressReporter::new();
        reporter.completed("optimization", "proposal accepted");

        let json = serde_json::to_value(&reporter.events()[0]).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["phase"], "optimization");
        assert!(json["timestamp"].is_string());
        assert_eq!(json["details"], "proposal accepted");
    }
}
