/*
[INPUT]:  Channel identifiers from subscribe/unsubscribe calls
[OUTPUT]: The tracked channel set and the deltas each call changed
[POS]:    Subscription state - source of truth for what should be subscribed
[UPDATE]: When changing subscription tracking or replay semantics
*/

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

/// Tracks which channels should be subscribed, independent of connection
/// state. The tracked set survives reconnects and is replayed in full after
/// every successful (re)connection.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: Mutex<BTreeSet<String>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.channels.lock().expect("channel registry lock poisoned")
    }

    /// Track the given channels. Returns only the channels that were not
    /// already tracked, so callers can send a minimal subscribe frame.
    pub fn add<I, S>(&self, channels: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracked = self.channels();
        channels
            .into_iter()
            .map(Into::into)
            .filter(|channel| tracked.insert(channel.clone()))
            .collect()
    }

    /// Stop tracking the given channels. Returns only the channels that
    /// were actually tracked.
    pub fn remove<I, S>(&self, channels: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tracked = self.channels();
        channels
            .into_iter()
            .filter(|channel| tracked.remove(channel.as_ref()))
            .map(|channel| channel.as_ref().to_string())
            .collect()
    }

    /// The full tracked set, in sorted order
    pub fn snapshot(&self) -> Vec<String> {
        self.channels().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels().is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels().len()
    }
}
