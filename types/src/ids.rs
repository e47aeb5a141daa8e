//! Record identifiers.
//!
//! User ids are chat ids handed to us by the messaging platform, task ids are
//! chosen by the administrator, withdrawal ids are assigned by the store.
//! All three are opaque strings; the newtypes only keep them from being mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Ids must be non-empty once surrounding whitespace is removed.
            pub fn is_valid(&self) -> bool {
                !self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifies a user account; doubles as the user's chat id for notifications.
    UserId
);

string_id!(
    /// Identifies a task definition in the catalog.
    TaskId
);

string_id!(
    /// Identifies a withdrawal request.
    WithdrawalId
);

impl WithdrawalId {
    /// Build the canonical id for the `seq`-th withdrawal a store has issued.
    ///
    /// Zero-padded so that lexicographic order matches issue order.
    pub fn from_sequence(seq: u64) -> Self {
        Self(format!("wd-{seq:012}"))
    }
}
