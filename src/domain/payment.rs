//! Payment gateway keys and their typed configuration blobs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::order::PaymentType;

str_enum! {
    /// Key of a `payment_configs` row.
    pub enum PaymentGateway: "payment gateway" {
        MercadoPago => "mercadopago",
        BankTransfer => "bank_transfer",
        Conekta => "conekta",
    }
}

impl PaymentGateway {
    /// The order payment type a customer selects when using this gateway.
    #[must_use]
    pub const fn payment_type(&self) -> PaymentType {
        match self {
            Self::MercadoPago => PaymentType::MercadoPago,
            Self::BankTransfer => PaymentType::DirectTransfer,
            Self::Conekta => PaymentType::Conekta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MercadoPagoSettings {
    pub public_key: String,
    pub access_token: String,
    #[serde(default)]
    pub sandbox: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BankTransferSettings {
    pub bank_name: String,
    pub account_holder: String,
    /// 18-digit Mexican interbank account number.
    pub clabe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConektaSettings {
    pub public_key: String,
    pub private_key: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuración inválida para {gateway}: {message}")]
    Shape {
        gateway: PaymentGateway,
        message: String,
    },

    #[error("el campo {field} de {gateway} no puede estar vacío")]
    EmptyField {
        gateway: PaymentGateway,
        field: &'static str,
    },

    #[error("la CLABE debe tener 18 dígitos")]
    InvalidClabe,
}

/// Parsed content of a `payment_configs.config` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewaySettings {
    MercadoPago(MercadoPagoSettings),
    BankTransfer(BankTransferSettings),
    Conekta(ConektaSettings),
}

impl GatewaySettings {
    /// Parses and validates the JSON blob for `gateway`.
    pub fn parse(gateway: PaymentGateway, value: &Value) -> Result<Self, SettingsError> {
        let shape = |e: serde_json::Error| SettingsError::Shape {
            gateway,
            message: e.to_string(),
        };

        let settings = match gateway {
            PaymentGateway::MercadoPago => {
                Self::MercadoPago(serde_json::from_value(value.clone()).map_err(shape)?)
            }
            PaymentGateway::BankTransfer => {
                Self::BankTransfer(serde_json::from_value(value.clone()).map_err(shape)?)
            }
            PaymentGateway::Conekta => {
                Self::Conekta(serde_json::from_value(value.clone()).map_err(shape)?)
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    #[must_use]
    pub const fn gateway(&self) -> PaymentGateway {
        match self {
            Self::MercadoPago(_) => PaymentGateway::MercadoPago,
            Self::BankTransfer(_) => PaymentGateway::BankTransfer,
            Self::Conekta(_) => PaymentGateway::Conekta,
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let gateway = self.gateway();
        let required: Vec<(&'static str, &str)> = match self {
            Self::MercadoPago(s) => vec![
                ("publicKey", s.public_key.as_str()),
                ("accessToken", s.access_token.as_str()),
            ],
            Self::BankTransfer(s) => vec![
                ("bankName", s.bank_name.as_str()),
                ("accountHolder", s.account_holder.as_str()),
                ("clabe", s.clabe.as_str()),
            ],
            Self::Conekta(s) => vec![
                ("publicKey", s.public_key.as_str()),
                ("privateKey", s.private_key.as_str()),
            ],
        };

        if let Some((field, _)) = required.into_iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(SettingsError::EmptyField { gateway, field });
        }

        if let Self::BankTransfer(s) = self
            && (s.clabe.len() != 18 || !s.clabe.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(SettingsError::InvalidClabe);
        }

        Ok(())
    }

    /// Full JSON form, secrets included. Only for persistence and admins.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let result = match self {
            Self::MercadoPago(s) => serde_json::to_value(s),
            Self::BankTransfer(s) => serde_json::to_value(s),
            Self::Conekta(s) => serde_json::to_value(s),
        };
        result.unwrap_or(Value::Null)
    }

    /// What the storefront may show to shoppers: no access tokens or private keys.
    #[must_use]
    pub fn public_view(&self) -> Value {
        match self {
            Self::MercadoPago(s) => serde_json::json!({
                "publicKey": s.public_key,
                "sandbox": s.sandbox,
            }),
            Self::BankTransfer(_) => self.to_value(),
            Self::Conekta(s) => serde_json::json!({ "publicKey": s.public_key }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bank_transfer_settings() {
        let settings = GatewaySettings::parse(
            PaymentGateway::BankTransfer,
            &json!({
                "bankName": "BBVA",
                "accountHolder": "MercadoBoom SA de CV",
                "clabe": "012180001234567891",
                "instructions": "Usa tu número de pedido como referencia"
            }),
        )
        .unwrap();
        assert_eq!(settings.gateway(), PaymentGateway::BankTransfer);
        assert_eq!(settings.public_view()["clabe"], "012180001234567891");
    }

    #[test]
    fn rejects_unknown_and_missing_fields() {
        let err = GatewaySettings::parse(
            PaymentGateway::MercadoPago,
            &json!({ "publicKey": "pk", "accessToken": "at", "extra": 1 }),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Shape { .. }));

        let err = GatewaySettings::parse(PaymentGateway::Conekta, &json!({ "publicKey": "pk" }))
            .unwrap_err();
        assert!(matches!(err, SettingsError::Shape { .. }));
    }

    #[test]
    fn rejects_blank_required_values_and_bad_clabe() {
        let err = GatewaySettings::parse(
            PaymentGateway::MercadoPago,
            &json!({ "publicKey": " ", "accessToken": "at" }),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::EmptyField {
                field: "publicKey",
                ..
            }
        ));

        let err = GatewaySettings::parse(
            PaymentGateway::BankTransfer,
            &json!({ "bankName": "BBVA", "accountHolder": "MB", "clabe": "12345" }),
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidClabe));
    }

    #[test]
    fn public_view_hides_secrets() {
        let settings = GatewaySettings::parse(
            PaymentGateway::MercadoPago,
            &json!({ "publicKey": "APP_USR-pk", "accessToken": "APP_USR-secret" }),
        )
        .unwrap();
        let view = settings.public_view();
        assert_eq!(view["publicKey"], "APP_USR-pk");
        assert!(view.get("accessToken").is_none());
        assert_eq!(settings.to_value()["accessToken"], "APP_USR-secret");
    }

    #[test]
    fn gateway_maps_to_payment_type() {
        assert_eq!(
            PaymentGateway::BankTransfer.payment_type(),
            PaymentType::DirectTransfer
        );
        assert_eq!(
            PaymentGateway::MercadoPago.payment_type(),
            PaymentType::MercadoPago
        );
    }
}
