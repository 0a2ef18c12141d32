use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::domain::{OrderStatus, PaymentStatus, PaymentType, TicketStatus, TwoFactorMethod};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: None,
        }
    }

    #[must_use]
    pub const fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Account as returned to its owner; includes the API key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    #[serde(flatten)]
    pub user: User,
    pub api_key: String,
}

impl From<User> for AccountDto {
    fn from(user: User) -> Self {
        let api_key = user.api_key.clone();
        Self { user, api_key }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub action: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTwoFactorRequest {
    pub enabled: bool,
    #[serde(default)]
    pub method: Option<TwoFactorMethod>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub identifier: String,
    #[serde(default)]
    pub method: Option<TwoFactorMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirm {
    pub identifier: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferQuoteQuery {
    pub product_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceiptRequest {
    pub receipt_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTransferRequest {
    pub order_id: i32,
    pub verified: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_type: Option<PaymentType>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketListQuery {
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Deserialize)]
pub struct TicketStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct BlockUserRequest {
    pub blocked: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_empty_fields() {
        let body = serde_json::to_value(ApiResponse::<()>::error("nope").with_code("CODE_EXPIRED"))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": "nope", "code": "CODE_EXPIRED"})
        );
    }

    #[test]
    fn quote_query_defaults_to_one_unit() {
        let query: TransferQuoteQuery = serde_json::from_str(r#"{"productId": 4}"#).unwrap();
        assert_eq!(query.quantity, 1);
    }
}
