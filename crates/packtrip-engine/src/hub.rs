//! The broadcast hub — live subscriber tracking and room fan-out.
//!
//! An explicitly-owned, injectable value (cloning shares the same rooms),
//! never a process-wide singleton, so every test can run its own hub.
//!
//! Delivery is best-effort and at-most-once: a subscriber whose channel is
//! gone is silently dropped from the room without aborting delivery to the
//! rest, and the hub never raises to its callers.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use chrono::Utc;
use packtrip_core::event::ServerEvent;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// Identifies one subscriber connection within a hub.
pub type ConnId = u64;

type Room = HashMap<ConnId, mpsc::UnboundedSender<serde_json::Value>>;

#[derive(Clone, Default)]
pub struct Hub {
  rooms:   Arc<Mutex<HashMap<String, Room>>>,
  next_id: Arc<AtomicU64>,
}

impl Hub {
  pub fn new() -> Self { Self::default() }

  /// Join a trip room. The returned receiver yields every frame published
  /// to the room until [`Hub::unsubscribe`] or the receiver is dropped.
  pub async fn subscribe(
    &self,
    trip_id: &str,
  ) -> (ConnId, mpsc::UnboundedReceiver<serde_json::Value>) {
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    let (tx, rx) = mpsc::unbounded_channel();
    self.rooms.lock().await.entry(trip_id.to_owned()).or_default().insert(id, tx);
    debug!(trip_id, conn = id, "subscriber joined");
    (id, rx)
  }

  /// Leave a trip room. Unknown ids are a no-op; empty rooms are pruned.
  pub async fn unsubscribe(&self, trip_id: &str, conn: ConnId) {
    let mut rooms = self.rooms.lock().await;
    if let Some(room) = rooms.get_mut(trip_id) {
      room.remove(&conn);
      if room.is_empty() {
        rooms.remove(trip_id);
      }
    }
    debug!(trip_id, conn, "subscriber left");
  }

  /// Deliver `event` to every subscriber of the room except `exclude`,
  /// stamping it with a `timestamp` field. Unreachable subscribers are
  /// dropped from the room; delivery to the rest continues.
  pub async fn publish(&self, trip_id: &str, event: &ServerEvent, exclude: Option<ConnId>) {
    let frame = match serde_json::to_value(event) {
      Ok(mut v) => {
        v["timestamp"] = serde_json::Value::String(Utc::now().to_rfc3339());
        v
      }
      // Serialisation of our own enum cannot fail in practice; degrade to
      // no-op delivery rather than propagate.
      Err(_) => return,
    };

    let mut rooms = self.rooms.lock().await;
    let Some(room) = rooms.get_mut(trip_id) else { return };

    let mut dead = Vec::new();
    for (&id, tx) in room.iter() {
      if Some(id) == exclude {
        continue;
      }
      if tx.send(frame.clone()).is_err() {
        dead.push(id);
      }
    }
    for id in dead {
      debug!(trip_id, conn = id, "dropping unreachable subscriber");
      room.remove(&id);
    }
    if room.is_empty() {
      rooms.remove(trip_id);
    }
  }

  /// Current subscriber count for a room (diagnostics and tests).
  pub async fn subscriber_count(&self, trip_id: &str) -> usize {
    self.rooms.lock().await.get(trip_id).map_or(0, Room::len)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn publish_reaches_all_but_excluded() {
    let hub = Hub::new();
    let (a, mut rx_a) = hub.subscribe("t1").await;
    let (_b, mut rx_b) = hub.subscribe("t1").await;

    hub.publish("t1", &ServerEvent::Typing { user_id: 1 }, Some(a)).await;

    let frame = rx_b.try_recv().unwrap();
    assert_eq!(frame["type"], "typing");
    assert!(frame["timestamp"].is_string());
    assert!(rx_a.try_recv().is_err());
  }

  #[tokio::test]
  async fn dead_subscriber_is_dropped_without_blocking_the_rest() {
    let hub = Hub::new();
    let (_a, rx_a) = hub.subscribe("t1").await;
    let (_b, mut rx_b) = hub.subscribe("t1").await;
    drop(rx_a); // a's channel is now closed; sends to it fail

    hub.publish("t1", &ServerEvent::Typing { user_id: 1 }, None).await;

    assert_eq!(rx_b.try_recv().unwrap()["type"], "typing");
    assert_eq!(hub.subscriber_count("t1").await, 1);
  }

  #[tokio::test]
  async fn empty_rooms_are_pruned() {
    let hub = Hub::new();
    let (a, _rx) = hub.subscribe("t1").await;
    hub.unsubscribe("t1", a).await;
    assert_eq!(hub.subscriber_count("t1").await, 0);
    // publishing to a missing room is a quiet no-op
    hub.publish("t1", &ServerEvent::Typing { user_id: 1 }, None).await;
  }

  #[tokio::test]
  async fn rooms_are_isolated() {
    let hub = Hub::new();
    let (_a, mut rx_a) = hub.subscribe("t1").await;
    let (_b, mut rx_b) = hub.subscribe("t2").await;

    hub.publish("t1", &ServerEvent::Typing { user_id: 1 }, None).await;

    assert!(rx_a.try_recv().is_ok());
    assert!(rx_b.try_recv().is_err());
  }
}
