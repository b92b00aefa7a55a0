//! One-way notifications from the host to the window.

use crate::backend::SupervisorState;
use crate::config::NetworkConfig;
use serde::Serialize;
use tokio::sync::broadcast;

/// Which output stream of the backend a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Something the window may want to display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostEvent {
    BackendState { state: SupervisorState },
    BackendOutput { stream: OutputStream, line: String },
    BackendExited { code: Option<i32> },
}

impl HostEvent {
    /// Event name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::BackendState { .. } => "backend-state",
            HostEvent::BackendOutput { .. } => "backend-output",
            HostEvent::BackendExited { .. } => "backend-exited",
        }
    }
}

/// Broadcast channel for [`HostEvent`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HostEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(NetworkConfig::EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: HostEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization() {
        let event = HostEvent::BackendExited { code: Some(3) };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "backend-exited", "code": 3})
        );

        let event = HostEvent::BackendOutput {
            stream: OutputStream::Stderr,
            line: "Traceback (most recent call last):".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], event.kind());
        assert_eq!(value["stream"], "stderr");
    }

    #[test]
    fn test_state_event_serialization() {
        let event = HostEvent::BackendState {
            state: SupervisorState::Exited { code: None },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "backend-state", "state": {"status": "exited", "code": null}})
        );
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(HostEvent::BackendExited { code: None });

        let mut rx = bus.subscribe();
        bus.publish(HostEvent::BackendExited { code: Some(0) });
        assert_eq!(rx.recv().await.unwrap(), HostEvent::BackendExited { code: Some(0) });
    }
}
