//! Order gateway contract and its REST implementation.
//!
//! Prices are fractional in (0, 1); sizes are currency units. Signing and
//! authentication are the venue gateway's concern, not this client's.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::GatewayError;
use crate::market::Outcome;

use super::order::{Order, OrderStatus, OrderUpdate, Side};

/// Order placement, cancellation, and status reporting.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Place a limit order. Returns the acknowledged order with its
    /// exchange-assigned id.
    async fn place_limit_order(
        &self,
        token_id: &str,
        outcome: Outcome,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, GatewayError>;

    /// Cancel an order. `Ok(false)` means the venue no longer knows the
    /// order (already terminal).
    async fn cancel_order(&self, order_id: &str) -> Result<bool, GatewayError>;

    /// Query current order status.
    async fn get_order_status(&self, order_id: &str) -> Result<OrderUpdate, GatewayError>;
}

/// REST-backed gateway against a CLOB-style order API.
#[derive(Debug, Clone)]
pub struct HttpOrderGateway {
    http: reqwest::Client,
    clob_url: String,
}

/// Order submission request body.
#[derive(Debug, Clone, Serialize)]
struct PlaceOrderRequest {
    token_id: String,
    side: String,
    price: String,
    size: String,
    order_type: String,
}

/// Order submission response; venues disagree on the id field name.
#[derive(Debug, Clone, Deserialize)]
struct PlaceOrderResponse {
    #[serde(alias = "orderID", alias = "orderId", alias = "order_id", alias = "id")]
    order_id: Option<String>,
    error: Option<String>,
    success: Option<bool>,
}

impl HttpOrderGateway {
    /// Create a gateway client from configuration.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            clob_url: config.clob_api_url.clone(),
        }
    }

    fn validate_params(price: Decimal, size: Decimal) -> Result<(), GatewayError> {
        if price <= Decimal::ZERO || price >= Decimal::ONE {
            return Err(GatewayError::InvalidParams(format!(
                "price {price} outside (0, 1)"
            )));
        }
        if size <= Decimal::ZERO {
            return Err(GatewayError::InvalidParams(format!(
                "size {size} must be positive"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    #[instrument(skip(self), fields(token_id = %token_id, side = %side))]
    async fn place_limit_order(
        &self,
        token_id: &str,
        outcome: Outcome,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Result<Order, GatewayError> {
        Self::validate_params(price, size)?;

        let body = PlaceOrderRequest {
            token_id: token_id.to_string(),
            side: side.to_string(),
            price: price.to_string(),
            size: size.to_string(),
            order_type: "GTC".to_string(),
        };

        let url = format!("{}/order", self.clob_url);
        // Placement is intentionally not retried: a timed-out request may
        // have reached the venue, and a resubmit would double the position.
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::SubmissionFailed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::SubmissionFailed(format!(
                "HTTP {status} - {text}"
            )));
        }

        let result: PlaceOrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::SubmissionFailed(format!("bad response: {e}")))?;

        if let Some(error) = result.error {
            return Err(GatewayError::Rejected { reason: error });
        }
        if result.success == Some(false) {
            return Err(GatewayError::Rejected {
                reason: "venue reported failure".to_string(),
            });
        }

        let order_id = result
            .order_id
            .ok_or_else(|| GatewayError::SubmissionFailed("no order id in response".to_string()))?;

        let now = OffsetDateTime::now_utc();
        let mut order = Order::new(token_id, outcome, side, price, size, now);
        order.id = Some(order_id.clone());
        order.status = OrderStatus::Live;

        info!(order_id = %order_id, price = %price, size = %size, "order placed");
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<bool, GatewayError> {
        let url = format!("{}/order/{}", self.clob_url, order_id);
        let response =
            self.http
                .delete(&url)
                .send()
                .await
                .map_err(|e| GatewayError::CancelFailed {
                    order_id: order_id.to_string(),
                    reason: format!("request failed: {e}"),
                })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(order_id = %order_id, "order unknown to venue, nothing to cancel");
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(GatewayError::CancelFailed {
                order_id: order_id.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        info!(order_id = %order_id, "order cancelled");
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn get_order_status(&self, order_id: &str) -> Result<OrderUpdate, GatewayError> {
        let url = format!("{}/order/{}", self.clob_url, order_id);
        let response =
            self.http
                .get(&url)
                .send()
                .await
                .map_err(|e| GatewayError::StatusFailed {
                    order_id: order_id.to_string(),
                    reason: format!("request failed: {e}"),
                })?;

        if !response.status().is_success() {
            return Err(GatewayError::StatusFailed {
                order_id: order_id.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| GatewayError::StatusFailed {
                    order_id: order_id.to_string(),
                    reason: format!("bad response: {e}"),
                })?;

        Ok(parse_order_update(&json))
    }
}

/// Parse a status response, tolerating the field-name conventions different
/// venue API versions use.
fn parse_order_update(json: &serde_json::Value) -> OrderUpdate {
    let status = json
        .get("status")
        .or_else(|| json.get("orderStatus"))
        .or_else(|| json.get("order_status"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<OrderStatus>().ok());

    let filled_size = parse_decimal_field(json, &["filled", "filledSize", "filled_size", "sizeFilled"]);
    let average_price = parse_decimal_field(json, &["avgPrice", "average_price", "averagePrice", "price_avg"]);

    OrderUpdate {
        status,
        filled_size,
        average_price,
    }
}

/// Read a decimal from JSON trying multiple field names; accepts both string
/// and numeric encodings.
fn parse_decimal_field(json: &serde_json::Value, keys: &[&str]) -> Option<Decimal> {
    for key in keys {
        if let Some(value) = json.get(*key) {
            if let Some(s) = value.as_str() {
                if let Ok(d) = s.parse::<Decimal>() {
                    return Some(d);
                }
            }
            if let Some(n) = value.as_f64() {
                if let Ok(d) = Decimal::try_from(n) {
                    return Some(d);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn validate_params_rejects_bad_inputs() {
        assert!(HttpOrderGateway::validate_params(dec!(0.50), dec!(10)).is_ok());
        assert!(HttpOrderGateway::validate_params(dec!(0), dec!(10)).is_err());
        assert!(HttpOrderGateway::validate_params(dec!(1), dec!(10)).is_err());
        assert!(HttpOrderGateway::validate_params(dec!(0.50), dec!(0)).is_err());
        assert!(HttpOrderGateway::validate_params(dec!(0.50), dec!(-1)).is_err());
    }

    #[test]
    fn parse_order_update_handles_field_variants() {
        let json = serde_json::json!({
            "orderStatus": "FILLED",
            "filledSize": "10.5",
            "avgPrice": 0.49
        });

        let update = parse_order_update(&json);
        assert_eq!(update.status, Some(OrderStatus::Filled));
        assert_eq!(update.filled_size, Some(dec!(10.5)));
        assert_eq!(update.average_price, Some(dec!(0.49)));
    }

    #[test]
    fn parse_order_update_tolerates_missing_fields() {
        let json = serde_json::json!({"unrelated": true});
        let update = parse_order_update(&json);
        assert!(update.status.is_none());
        assert!(update.filled_size.is_none());
        assert!(update.average_price.is_none());
    }

    #[test]
    fn parse_decimal_field_tries_keys_in_order() {
        let json = serde_json::json!({"filled": "10.5", "remaining": 5.25});
        assert_eq!(parse_decimal_field(&json, &["filled"]), Some(dec!(10.5)));
        assert_eq!(parse_decimal_field(&json, &["remaining"]), Some(dec!(5.25)));
        assert_eq!(parse_decimal_field(&json, &["missing"]), None);
    }
}
