//! Event model shared by the live subscriber and the compensation scanner.

use serde::{Deserialize, Serialize};

/// The kind of keyspace event observed for a key.
///
/// `Expired`, `Deleted`, and `Set` map to Redis's `expired`, `del`, and
/// `set` keyspace-notification event names respectively. Anything else
/// (e.g. `lpush`, `rename_from`) passes through verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// The key expired (TTL elapsed).
    Expired,
    /// The key was deleted.
    Deleted,
    /// The key was set (created or overwritten).
    Set,
    /// Any other keyspace event name, passed through verbatim.
    Other(String),
}

impl EventType {
    /// Parse an event-type string as emitted after the channel prefix has
    /// been stripped (see `Watcher`'s prefix handling).
    #[must_use]
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "expired" => Self::Expired,
            "del" => Self::Deleted,
            "set" => Self::Set,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// A single observed event: an event type paired with the affected key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The kind of event.
    pub action: EventType,
    /// The affected key's name.
    pub key: String,
}

/// A callback invoked once per observed event.
///
/// Must be safe to invoke concurrently: the live subscriber and the
/// compensation scanner may both call it from different tasks, and the
/// subscriber's own workers may call it concurrently for different keys.
pub trait Callback: Fn(EventType, String) + Send + Sync + 'static {}

impl<F> Callback for F where F: Fn(EventType, String) + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_event_types() {
        assert_eq!(EventType::parse("expired"), EventType::Expired);
        assert_eq!(EventType::parse("del"), EventType::Deleted);
        assert_eq!(EventType::parse("set"), EventType::Set);
    }

    #[test]
    fn unknown_event_type_passes_through() {
        assert_eq!(
            EventType::parse("rename_from"),
            EventType::Other("rename_from".to_string())
        );
    }
}
