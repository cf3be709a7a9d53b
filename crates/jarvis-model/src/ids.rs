//! Newtype identifiers so a `RunId` and a `NodeId` can never be swapped at a
//! call site by accident.
//!
//! `RunId` and `SessionId` use UUIDv7: the leading 48 bits are a millisecond
//! Unix timestamp, so the canonical hyphenated string form sorts
//! lexicographically in creation order (spec requires both to be
//! "time-ordered, lexicographically sortable"). `NodeId`/`AgentId` carry no
//! such requirement and stay on UUIDv4.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $ctor:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                let ctor: fn() -> Uuid = $ctor;
                Self(ctor())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(raw)?))
            }
        }
    };
}

uuid_id!(RunId, Uuid::now_v7);
uuid_id!(SessionId, Uuid::now_v7);
uuid_id!(NodeId, Uuid::new_v4);
uuid_id!(AgentId, Uuid::new_v4);

#[cfg(test)]
mod tests {
    use super::{RunId, SessionId};
    use std::str::FromStr;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn unit_run_id_round_trips_through_display_and_from_str() {
        let id = RunId::new();
        let parsed = RunId::from_str(&id.to_string()).expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn unit_run_id_and_node_id_are_distinct_types() {
        // This is a compile-time property: the line below would not build if
        // `RunId` and `NodeId` were interchangeable.
        let run_id = RunId::new();
        let node_id = super::NodeId::new();
        assert_ne!(run_id.to_string(), node_id.to_string());
    }

    #[test]
    fn regression_run_ids_are_lexicographically_time_ordered() {
        let first = RunId::new();
        sleep(Duration::from_millis(5));
        let second = RunId::new();
        assert!(first.to_string() < second.to_string());
        assert!(first < second);
    }

    #[test]
    fn regression_session_ids_are_lexicographically_time_ordered() {
        let first = SessionId::new();
        sleep(Duration::from_millis(5));
        let second = SessionId::new();
        assert!(first.to_string() < second.to_string());
    }
}
