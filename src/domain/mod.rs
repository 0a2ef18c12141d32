//! Domain types for the storefront.
//!
//! Everything persisted as a plain string column (statuses, roles, channel
//! sets) has a strongly typed counterpart here. Parsing happens once, at the
//! repository or request boundary, so the services never compare raw strings.

use thiserror::Error;

/// Error returned when a stored or submitted string matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a fieldless enum with a fixed external string form.
///
/// Generates `as_str`, `ALL`, `Display`, `FromStr` and string-based serde
/// impls so the database representation and the JSON representation agree.
macro_rules! str_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::domain::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::domain::ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub mod money;
pub mod order;
pub mod payment;
pub mod security;
pub mod ticket;

pub use money::{TransferQuote, parse_money, round_money};
pub use order::{OrderStatus, PaymentStatus, PaymentType, ShippingAddress, StatusHistoryEntry};
pub use payment::{GatewaySettings, PaymentGateway};
pub use security::{Channel, SensitiveAction, TwoFactorMethod};
pub use ticket::{Attachment, SenderType, TicketCategory, TicketPriority, TicketStatus};

str_enum! {
    /// Account role. Admins reach the `/api/admin` surface.
    #[derive(Default)]
    pub enum UserRole: "role" {
        #[default]
        Customer => "customer",
        Admin => "admin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_enum_round_trips_through_strings() {
        for role in UserRole::ALL {
            let parsed: UserRole = role.as_str().parse().unwrap();
            assert_eq!(&parsed, role);
        }
    }

    #[test]
    fn str_enum_rejects_unknown_values() {
        let err = "superuser".parse::<UserRole>().unwrap_err();
        assert_eq!(err.kind, "role");
        assert_eq!(err.value, "superuser");
    }

    #[test]
    fn str_enum_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserRole::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let role: UserRole = serde_json::from_str("\"customer\"").unwrap();
        assert_eq!(role, UserRole::Customer);
        assert!(serde_json::from_str::<UserRole>("\"root\"").is_err());
    }
}
