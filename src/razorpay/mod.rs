//! Razorpay integration via REST API (no SDK dependency)
//!
//! Order creation goes through the shared [`reqwest::Client`] carried in
//! application state, which has a bounded request timeout. Signature
//! verification is HMAC-SHA256 over `order_id|payment_id` with the
//! key secret, compared in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

const API_BASE: &str = "https://api.razorpay.com/v1";

/// Gateway-facing fields of a freshly created order.
#[derive(Debug)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure or timeout; no order was persisted, safe to retry.
    #[error("gateway request failed: {0}")]
    Unavailable(#[from] reqwest::Error),
    /// The gateway answered but not with the shape we expect.
    #[error("unexpected gateway response: {0}")]
    BadResponse(String),
}

pub struct OrderRequest<'a> {
    /// Minor currency units
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
    pub user_id: &'a str,
    pub plan_id: i64,
}

/// Create a gateway order for a checkout.
pub async fn create_order(
    client: &reqwest::Client,
    key_id: &str,
    key_secret: &str,
    req: &OrderRequest<'_>,
) -> Result<GatewayOrder, GatewayError> {
    let resp: serde_json::Value = client
        .post(format!("{API_BASE}/orders"))
        .basic_auth(key_id, Some(key_secret))
        .json(&serde_json::json!({
            "amount": req.amount,
            "currency": req.currency,
            "receipt": req.receipt,
            "notes": {
                "user_id": req.user_id,
                "plan_id": req.plan_id.to_string(),
            },
        }))
        .send()
        .await?
        .json()
        .await?;

    let order_id = resp["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| GatewayError::BadResponse(format!("order creation failed: {resp}")))?;

    Ok(GatewayOrder {
        order_id,
        amount: resp["amount"].as_i64().unwrap_or(req.amount),
        currency: resp["currency"]
            .as_str()
            .unwrap_or(req.currency)
            .to_string(),
    })
}

/// Verify a payment capture signature (HMAC-SHA256)
///
/// The client-side checkout reports `(order_id, payment_id, signature)`;
/// the signature proves the claim originated from the gateway. Must be
/// checked before any entitlement side effect.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    key_secret: &str,
) -> Result<(), &'static str> {
    let payload = format!("{order_id}|{payment_id}");
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key_secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(payload.as_bytes());

    // Decode hex signature and use constant-time comparison via hmac::verify_slice
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Payment signature mismatch")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let sig = sign("order_abc", "pay_123", "secret");
        assert!(verify_payment_signature("order_abc", "pay_123", &sig, "secret").is_ok());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let sig = sign("order_abc", "pay_123", "secret");
        assert!(verify_payment_signature("order_abc", "pay_999", &sig, "secret").is_err());
        assert!(verify_payment_signature("order_xyz", "pay_123", &sig, "secret").is_err());
        assert!(verify_payment_signature("order_abc", "pay_123", &sig, "other").is_err());
        assert!(verify_payment_signature("order_abc", "pay_123", "tampered", "secret").is_err());
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        assert!(verify_payment_signature("o", "p", "not-hex!!", "secret").is_err());
        assert!(verify_payment_signature("o", "p", "", "secret").is_err());
    }
}
