/*
[INPUT]:  Decoded inbound messages and consumer registrations
[OUTPUT]: Handler invocations routed by type, type:symbol, or wildcard key
[POS]:    Dispatch layer - fan-out from the socket to interested consumers
[UPDATE]: When changing routing keys or handler isolation
*/

use crate::message::InboundMessage;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::warn;

/// Registration key that receives every dispatched message
pub const WILDCARD_KEY: &str = "*";

type Handler = Arc<dyn Fn(&InboundMessage) + Send + Sync + 'static>;

/// Routes inbound messages to registered consumers.
///
/// A message with a `type` reaches handlers registered under that type; with
/// both `type` and `symbol` it additionally reaches `type:symbol` handlers;
/// every message reaches wildcard handlers. Handlers for one message run on
/// the event-processing task; a panicking handler never takes down its
/// siblings or the connection.
#[derive(Default)]
pub struct MessageRouter {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, HashMap<u64, Handler>>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<String, HashMap<u64, Handler>>> {
        self.handlers.lock().expect("router lock poisoned")
    }

    /// Register a handler under a key. The returned guard deregisters
    /// exactly this handler from exactly this key; dropping the guard
    /// without calling [`HandlerGuard::remove`] leaves the handler active.
    pub fn register<F>(self: &Arc<Self>, key: &str, handler: F) -> HandlerGuard
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers()
            .entry(key.to_string())
            .or_default()
            .insert(id, Arc::new(handler));
        HandlerGuard {
            key: key.to_string(),
            id,
            router: Arc::downgrade(self),
        }
    }

    fn deregister(&self, key: &str, id: u64) {
        let mut handlers = self.handlers();
        if let Some(set) = handlers.get_mut(key) {
            set.remove(&id);
            // drop the key once its last handler is gone
            if set.is_empty() {
                handlers.remove(key);
            }
        }
    }

    /// Remove all keys and handlers
    pub fn clear(&self) {
        self.handlers().clear();
    }

    /// Route one message to every matching handler
    pub fn dispatch(&self, message: &InboundMessage) {
        let mut selected: Vec<(String, Handler)> = Vec::new();
        {
            let handlers = self.handlers();
            if let Some(event_type) = message.event_type() {
                collect(&handlers, event_type, &mut selected);
                if let Some(symbol) = message.symbol() {
                    collect(&handlers, &format!("{event_type}:{symbol}"), &mut selected);
                }
            }
            collect(&handlers, WILDCARD_KEY, &mut selected);
        }

        // invoked outside the lock so handlers may register/deregister
        for (key, handler) in selected {
            if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
                warn!(key = %key, "consumer callback panicked during dispatch");
            }
        }
    }

    #[cfg(test)]
    fn key_count(&self) -> usize {
        self.handlers().len()
    }
}

fn collect(
    handlers: &HashMap<String, HashMap<u64, Handler>>,
    key: &str,
    selected: &mut Vec<(String, Handler)>,
) {
    if let Some(set) = handlers.get(key) {
        selected.extend(set.values().map(|handler| (key.to_string(), Arc::clone(handler))));
    }
}

/// Deregistration handle scoped to a single `register` call
pub struct HandlerGuard {
    key: String,
    id: u64,
    router: Weak<MessageRouter>,
}

impl HandlerGuard {
    /// Remove the handler this guard was created for
    pub fn remove(self) {
        if let Some(router) = self.router.upgrade() {
            router.deregister(&self.key, self.id);
        }
    }
}
