//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up a court id with a hold id or a confirmation number.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
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
    };
}

define_id!(RequestId, "Identifier of a reservation request in the upstream store.");
define_id!(PrincipalId, "Identifier of the account holder the request acts for.");
define_id!(UnitId, "Identifier of one interchangeable resource unit (e.g. a court).");
define_id!(HoldId, "Server-issued identifier of a short-lived hold.");
define_id!(ConfirmationId, "Confirmation number returned by a successful submission.");

impl RequestId {
    /// Generate a new unique request identifier using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_id_new_and_display() {
        let id = UnitId::new("court-7");
        assert_eq!(id.as_str(), "court-7");
        assert_eq!(format!("{id}"), "court-7");
    }

    #[test]
    fn request_id_generate_is_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }

    #[test]
    fn ids_from_strings() {
        let hold: HoldId = "h-1".into();
        assert_eq!(hold.as_str(), "h-1");

        let confirmation: ConfirmationId = String::from("278890").into();
        assert_eq!(confirmation.into_inner(), "278890");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = UnitId::new("3");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"3\"");
    }
}
