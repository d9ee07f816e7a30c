//! Identifier newtypes
//!
//! Relational identities are UUIDs. Document keys are opaque strings minted by
//! the document store; the in-memory and Postgres stores use ULIDs so keys sort
//! by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Underlying UUID
            #[inline]
            #[must_use]
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

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id!(
    /// Authenticated account identity (the subject of a token)
    UserId
);
uuid_id!(
    /// Student profile identity
    StudentId
);
uuid_id!(
    /// Lecturer profile identity
    LecturerId
);
uuid_id!(
    /// Achievement reference identity (ledger primary key)
    ReferenceId
);
uuid_id!(
    /// History entry identity
    HistoryId
);
uuid_id!(
    /// Notification identity
    NotificationId
);

/// Opaque key of an achievement document in the document store
///
/// The ledger stores it verbatim; nothing outside the document store may
/// interpret its structure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Mint a new time-ordered key
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Wrap a key produced elsewhere
    #[inline]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw key
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_round_trip_through_strings() {
        let id = ReferenceId::new();
        let parsed: ReferenceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<StudentId>().is_err());
    }

    #[test]
    fn document_keys_are_unique_and_ordered() {
        let a = DocumentKey::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = DocumentKey::generate();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn ids_serialize_transparently() {
        let key = DocumentKey::from_raw("abc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"abc\"");
    }
}
