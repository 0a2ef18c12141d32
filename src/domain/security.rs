//! Two-factor channels and the actions they protect.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

str_enum! {
    /// Out-of-band delivery channel for one-time codes.
    pub enum Channel: "channel" {
        Email => "email",
        Sms => "sms",
        WhatsApp => "whatsapp",
    }
}

impl Channel {
    const fn bit(self) -> u8 {
        match self {
            Self::Email => 0b001,
            Self::Sms => 0b010,
            Self::WhatsApp => 0b100,
        }
    }
}

str_enum! {
    /// Operations that require a fresh one-time code when 2FA is enabled.
    pub enum SensitiveAction: "action" {
        AdminAccess => "admin_access",
        HighValueOrder => "high_value_order",
        ProfileUpdate => "profile_update",
        PaymentChange => "payment_change",
        SecuritySettings => "security_settings",
        PasswordReset => "password_reset",
    }
}

/// The user's two-factor method: a non-empty set of channels.
///
/// Externally this is one of `email`, `sms`, `whatsapp`, `email_sms`,
/// `email_whatsapp`, `sms_whatsapp` or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TwoFactorMethod(u8);

impl TwoFactorMethod {
    pub const EMAIL: Self = Self(0b001);
    pub const SMS: Self = Self(0b010);
    pub const WHATSAPP: Self = Self(0b100);
    pub const ALL: Self = Self(0b111);

    /// Builds a method from a set of channels; `None` if the set is empty.
    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Option<Self> {
        let bits = channels.into_iter().fold(0u8, |acc, c| acc | c.bit());
        (bits != 0).then_some(Self(bits))
    }

    #[must_use]
    pub const fn contains(&self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Channels in this set, in the fixed order email, sms, whatsapp.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL
            .iter()
            .copied()
            .filter(move |c| self.contains(*c))
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        // The bit set is never empty, see `from_channels`.
        match self.0 {
            0b001 => "email",
            0b010 => "sms",
            0b100 => "whatsapp",
            0b011 => "email_sms",
            0b101 => "email_whatsapp",
            0b110 => "sms_whatsapp",
            _ => "all",
        }
    }
}

impl Default for TwoFactorMethod {
    fn default() -> Self {
        Self::EMAIL
    }
}

impl fmt::Display for TwoFactorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TwoFactorMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = match s {
            "email" => 0b001,
            "sms" => 0b010,
            "whatsapp" => 0b100,
            "email_sms" => 0b011,
            "email_whatsapp" => 0b101,
            "sms_whatsapp" => 0b110,
            "all" => 0b111,
            other => {
                return Err(ParseEnumError {
                    kind: "two-factor method",
                    value: other.to_string(),
                });
            }
        };
        Ok(Self(bits))
    }
}

impl Serialize for TwoFactorMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TwoFactorMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_external_name_round_trips() {
        for name in [
            "email",
            "sms",
            "whatsapp",
            "email_sms",
            "email_whatsapp",
            "sms_whatsapp",
            "all",
        ] {
            let method: TwoFactorMethod = name.parse().unwrap();
            assert_eq!(method.as_str(), name);
        }
        assert!("email_sms_whatsapp".parse::<TwoFactorMethod>().is_err());
        assert!("".parse::<TwoFactorMethod>().is_err());
    }

    #[test]
    fn method_is_a_channel_set() {
        let method: TwoFactorMethod = "sms_whatsapp".parse().unwrap();
        assert!(!method.contains(Channel::Email));
        assert!(method.contains(Channel::Sms));
        assert!(method.contains(Channel::WhatsApp));
        assert_eq!(
            method.channels().collect::<Vec<_>>(),
            vec![Channel::Sms, Channel::WhatsApp]
        );
        assert_eq!(TwoFactorMethod::ALL.channels().count(), 3);
    }

    #[test]
    fn from_channels_builds_the_combined_name() {
        let method = TwoFactorMethod::from_channels([Channel::WhatsApp, Channel::Email]).unwrap();
        assert_eq!(method.as_str(), "email_whatsapp");
        assert!(TwoFactorMethod::from_channels([]).is_none());
    }

    #[test]
    fn sensitive_action_uses_snake_case_tags() {
        let action: SensitiveAction = "admin_access".parse().unwrap();
        assert_eq!(action, SensitiveAction::AdminAccess);
        assert!("delete_everything".parse::<SensitiveAction>().is_err());
    }
}
