//! Live progress streams for automation runs.
//!
//! A client opens `GET /api/v1/stream/{session_id}` before starting a run and
//! passes the same id as `streamSessionId`. The engine publishes events and
//! screenshot frames to that session; the stream ends when the run closes it
//! or the client disconnects.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;

/// One server-sent event payload.
#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl StreamEvent {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        let data = match data {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            kind: kind.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }

    /// A screenshot frame. `frame` is base64 PNG.
    pub fn frame(frame: String, step: &str, extra: serde_json::Value) -> Self {
        let mut event = Self::new("frame", extra);
        event.data.insert("frame".to_string(), frame.into());
        event.data.insert("step".to_string(), step.into());
        event
    }
}

/// Registry of connected stream sessions.
#[derive(Default)]
pub struct StreamHub {
    sessions: Mutex<HashMap<String, mpsc::UnboundedSender<StreamEvent>>>,
}

impl StreamHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its event receiver. A second connect
    /// with the same id replaces the first.
    pub fn connect(&self, session_id: &str) -> mpsc::UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let connected = StreamEvent::new(
            "connected",
            serde_json::json!({ "sessionId": session_id }),
        );
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(connected);

        let mut sessions = self.lock();
        prune_disconnected(&mut sessions);
        sessions.insert(session_id.to_string(), tx);
        tracing::info!(session_id, active = sessions.len(), "Stream connected");
        rx
    }

    pub fn is_connected(&self, session_id: &str) -> bool {
        self.lock()
            .get(session_id)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Send an event to a session. Sessions whose client went away are
    /// dropped.
    pub fn publish(&self, session_id: &str, event: StreamEvent) {
        let mut sessions = self.lock();
        let Some(tx) = sessions.get(session_id) else {
            return;
        };
        if tx.send(event).is_err() {
            sessions.remove(session_id);
            tracing::info!(session_id, "Stream client disconnected");
        }
    }

    /// End a session's stream.
    pub fn close(&self, session_id: &str) {
        if self.lock().remove(session_id).is_some() {
            tracing::info!(session_id, "Stream closed");
        }
    }

    /// Sessions whose client is still listening.
    pub fn active_sessions(&self) -> usize {
        let mut sessions = self.lock();
        prune_disconnected(&mut sessions);
        sessions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<StreamEvent>>> {
        // A poisoned map is still structurally valid.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Forget sessions whose receiver was dropped, e.g. an SSE client that went
/// away without a run ever publishing to it.
fn prune_disconnected(sessions: &mut HashMap<String, mpsc::UnboundedSender<StreamEvent>>) {
    let before = sessions.len();
    sessions.retain(|_, tx| !tx.is_closed());
    let pruned = before - sessions.len();
    if pruned > 0 {
        tracing::debug!(pruned, "Pruned disconnected stream sessions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_publish_close() {
        let hub = StreamHub::new();
        let mut rx = hub.connect("s1");
        assert!(hub.is_connected("s1"));

        hub.publish("s1", StreamEvent::new("navigating", serde_json::json!({ "url": "https://x.example" })));
        hub.close("s1");

        let connected = rx.recv().await.unwrap();
        assert_eq!(connected.kind, "connected");
        assert_eq!(connected.data["sessionId"], "s1");

        let navigating = rx.recv().await.unwrap();
        assert_eq!(navigating.kind, "navigating");
        assert_eq!(navigating.data["url"], "https://x.example");

        assert!(rx.recv().await.is_none());
        assert!(!hub.is_connected("s1"));
    }

    #[test]
    fn test_publish_to_disconnected_client_drops_session() {
        let hub = StreamHub::new();
        let rx = hub.connect("gone");
        drop(rx);
        hub.publish("gone", StreamEvent::new("filling_form", serde_json::Value::Null));
        assert_eq!(hub.active_sessions(), 0);
    }

    #[test]
    fn test_abandoned_sessions_are_not_counted() {
        let hub = StreamHub::new();
        for i in 0..100 {
            drop(hub.connect(&format!("idle-{}", i)));
        }
        assert_eq!(hub.active_sessions(), 0);

        let _live = hub.connect("live");
        drop(hub.connect("abandoned"));
        assert_eq!(hub.active_sessions(), 1);
        assert!(hub.is_connected("live"));
        assert_eq!(hub.lock().len(), 1);
    }

    #[test]
    fn test_event_serializes_flat() {
        let event = StreamEvent::frame("aGk=".to_string(), "navigated", serde_json::json!({ "url": "u" }));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "frame");
        assert_eq!(json["frame"], "aGk=");
        assert_eq!(json["step"], "navigated");
        assert_eq!(json["url"], "u");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_unknown_session_is_ignored() {
        let hub = StreamHub::new();
        hub.publish("nobody", StreamEvent::new("completed", serde_json::Value::Null));
        hub.close("nobody");
        assert!(!hub.is_connected("nobody"));
    }
}
