use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 11;

/// Base-36 millisecond timestamp followed by a random base-36 suffix.
pub fn generate() -> String {
    let millis = u128::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let mut id = to_base36(millis);
    let suffix = to_base36(Uuid::new_v4().as_u128());
    id.push_str(&suffix[..SUFFIX_LEN.min(suffix.len())]);
    id
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn generate() -> Self {
                Self(generate())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a [`crate::task::Task`].
    TaskId
);

string_id!(
    /// Identifier of a [`crate::category::Category`].
    CategoryId
);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{TaskId, generate, to_base36};

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_296), "100");
    }

    #[test]
    fn generated_ids_are_distinct_and_lowercase_alnum() {
        let ids: HashSet<String> = (0..2_000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 2_000);
        assert!(ids.iter().all(|id| {
            id.chars()
                .all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase())
        }));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::from("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");
        let back: TaskId = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(back, id);
    }
}
