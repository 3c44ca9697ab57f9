use crossbeam_channel::{Receiver, Sender};

use crate::proctoring::domain::proctoring_event::{EventKind, ProctoringEvent};

pub type EventCallback = Box<dyn FnMut(&ProctoringEvent) + Send>;

/// Handle returned by every subscribe call; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Sink {
    Callback(EventCallback),
    Channel(Sender<ProctoringEvent>),
}

struct Subscriber {
    id: SubscriptionId,
    filter: Option<EventKind>,
    sink: Sink,
}

/// Fan-out of proctoring events to callbacks and channels.
///
/// Subscribers are called in subscription order. Channel subscribers whose
/// receiver was dropped are removed on the next publish.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives every event.
    pub fn subscribe(&mut self, callback: impl FnMut(&ProctoringEvent) + Send + 'static) -> SubscriptionId {
        self.add(None, Sink::Callback(Box::new(callback)))
    }

    /// Receives only events of `kind`.
    pub fn subscribe_kind(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&ProctoringEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.add(Some(kind), Sink::Callback(Box::new(callback)))
    }

    /// Receives every event on an unbounded channel, for consumers living on
    /// another thread.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, Receiver<ProctoringEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (self.add(None, Sink::Channel(tx)), rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn publish(&mut self, event: &ProctoringEvent) {
        let kind = event.kind();
        self.subscribers.retain_mut(|subscriber| {
            if subscriber.filter.is_some_and(|f| f != kind) {
                return true;
            }
            match &mut subscriber.sink {
                Sink::Callback(callback) => {
                    callback(event);
                    true
                }
                Sink::Channel(tx) => tx.send(event.clone()).is_ok(),
            }
        });
    }

    fn add(&mut self, filter: Option<EventKind>, sink: Sink) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscriber { id, filter, sink });
        id
    }
}
