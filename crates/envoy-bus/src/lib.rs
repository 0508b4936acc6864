pub mod event;

pub use event::Event;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

const SUBSCRIBER_CAPACITY: usize = 256;

/// Per-session, non-retaining publish/subscribe fabric.
///
/// Each session id maps to zero or more live subscribers, each with its own
/// bounded channel. `emit` never blocks: a subscriber whose channel is full
/// is behind and simply misses that event, the emitter is never stalled by
/// a slow reader. There is no backlog — a subscriber that joins late sees
/// nothing that happened before it subscribed, and there is no ordering
/// guarantee across different session ids.
#[derive(Default)]
pub struct EventBus {
    subscribers: DashMap<String, Vec<(uuid::Uuid, mpsc::Sender<Event>)>>,
}

pub struct Subscription {
    pub id: uuid::Uuid,
    pub session_id: String,
    pub receiver: mpsc::Receiver<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Register a new subscriber for `session_id`. Drop the returned
    /// [`Subscription`] (or call [`EventBus::unsubscribe`]) to stop
    /// receiving events.
    pub fn subscribe(&self, session_id: &str) -> Subscription {
        let id = uuid::Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers
            .entry(session_id.to_string())
            .or_default()
            .push((id, tx));
        Subscription {
            id,
            session_id: session_id.to_string(),
            receiver: rx,
        }
    }

    pub fn unsubscribe(&self, session_id: &str, id: uuid::Uuid) {
        if let Some(mut subs) = self.subscribers.get_mut(session_id) {
            subs.retain(|(sub_id, _)| *sub_id != id);
            if subs.is_empty() {
                drop(subs);
                self.subscribers.remove(session_id);
            }
        }
    }

    /// Publish `event` to every live subscriber of `session_id`. A full or
    /// closed subscriber channel is logged and skipped — never awaited,
    /// never propagated as an error. Emitting to a session with no
    /// subscribers is a silent no-op.
    pub fn emit(&self, session_id: &str, event: Event) {
        let Some(subs) = self.subscribers.get(session_id) else {
            return;
        };
        for (id, tx) in subs.iter() {
            if let Err(err) = tx.try_send(event.clone()) {
                debug!(session_id, subscriber = %id, %err, "dropping event for slow/closed subscriber");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe("s1");
        bus.emit("s1", Event::Start);
        bus.emit(
            "s1",
            Event::Delta {
                content: "hi".into(),
            },
        );
        bus.emit(
            "s1",
            Event::Done {
                content: "hi".into(),
            },
        );

        assert!(matches!(sub.receiver.recv().await.unwrap(), Event::Start));
        assert!(matches!(
            sub.receiver.recv().await.unwrap(),
            Event::Delta { .. }
        ));
        assert!(matches!(sub.receiver.recv().await.unwrap(), Event::Done { .. }));
    }

    #[tokio::test]
    async fn emit_with_no_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.emit("ghost", Event::Start);
    }

    #[tokio::test]
    async fn events_do_not_cross_sessions() {
        let bus = EventBus::new();
        let mut sub_a = bus.subscribe("a");
        let _sub_b = bus.subscribe("b");
        bus.emit(
            "b",
            Event::Delta {
                content: "for b only".into(),
            },
        );
        bus.emit("a", Event::Start);
        assert!(matches!(sub_a.receiver.recv().await.unwrap(), Event::Start));
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let sub = bus.subscribe("s1");
        bus.unsubscribe("s1", sub.id);
        bus.emit("s1", Event::Start);
        assert!(bus.subscribers.get("s1").is_none());
    }

    #[tokio::test]
    async fn two_subscribers_see_the_same_sequence() {
        let bus = EventBus::new();
        let mut sub_a = bus.subscribe("s1");
        let mut sub_b = bus.subscribe("s1");
        bus.emit("s1", Event::Start);
        bus.emit(
            "s1",
            Event::Done {
                content: "x".into(),
            },
        );
        assert!(matches!(sub_a.receiver.recv().await.unwrap(), Event::Start));
        assert!(matches!(sub_b.receiver.recv().await.unwrap(), Event::Start));
        assert!(matches!(sub_a.receiver.recv().await.unwrap(), Event::Done { .. }));
        assert!(matches!(sub_b.receiver.recv().await.unwrap(), Event::Done { .. }));
    }
}
