//! # broker::alpaca
//!
//! [`AlpacaBroker`] — live/paper trading through the Alpaca v2 REST API.
//!
//! ## Endpoints used
//! ```text
//! GET  {BASE_URL}/v2/clock                        → is_open
//! GET  {BASE_URL}/v2/positions/{ticker}           → qty, avg_entry_price   (404 = flat)
//! GET  {DATA_URL}/v2/stocks/{ticker}/bars/latest  → bar.c
//! POST {BASE_URL}/v2/orders                       → market order, TIF day
//! GET  {BASE_URL}/v2/account                      → startup summary only
//! ```
//!
//! One `reqwest::Client` is built at startup and reused by every worker; its
//! connection pool is what makes concurrent calls safe and cheap.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::Broker;
use crate::config::{env_or, env_required, env_secs};
use crate::error::{BrokerError, ConfigError};
use crate::models::OrderSide;

const DEFAULT_BASE_URL: &str = "https://paper-api.alpaca.markets";
const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// Trading API root, paper or live.
    pub base_url:   String,
    /// Market data API root.
    pub data_url:   String,
    pub api_key:    String,
    pub api_secret: String,
    /// Per-request timeout.  Bounds how long a hung call can hold up shutdown.
    pub timeout:    Duration,
}

impl AlpacaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url:   env_or("BASE_URL", DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            data_url:   env_or("DATA_URL", DEFAULT_DATA_URL).trim_end_matches('/').to_string(),
            api_key:    env_required("API_KEY")?,
            api_secret: env_required("API_SECRET")?,
            timeout:    env_secs("BROKER_TIMEOUT_SECS", 10)?,
        })
    }
}

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ClockResponse {
    is_open: bool,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    #[serde(deserialize_with = "decimal")]
    qty:             f64,
    #[serde(deserialize_with = "decimal")]
    avg_entry_price: f64,
}

#[derive(Debug, Deserialize)]
struct LatestBarResponse {
    bar: Bar,
}

#[derive(Debug, Deserialize)]
struct Bar {
    /// Close of the most recent minute bar.
    c: f64,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol:          &'a str,
    /// Alpaca takes quantities as strings so fractional shares survive.
    qty:             String,
    side:            OrderSide,
    #[serde(rename = "type")]
    order_type:      &'static str,
    time_in_force:   &'static str,
    client_order_id: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id:     String,
    status: String,
}

/// Account balances, logged once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSummary {
    #[serde(deserialize_with = "decimal")]
    pub cash:            f64,
    #[serde(deserialize_with = "decimal")]
    pub equity:          f64,
    #[serde(deserialize_with = "decimal")]
    pub buying_power:    f64,
    #[serde(deserialize_with = "decimal")]
    pub portfolio_value: f64,
}

/// Alpaca encodes most numbers as decimal strings; accept either form.
fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ─── Broker ───────────────────────────────────────────────────────────────────

pub struct AlpacaBroker {
    client:   reqwest::Client,
    base_url: String,
    data_url: String,
}

impl AlpacaBroker {
    pub fn new(config: &AlpacaConfig) -> Result<Self, BrokerError> {
        let mut headers = HeaderMap::new();
        headers.insert("APCA-API-KEY-ID", header_value(&config.api_key)?);
        headers.insert("APCA-API-SECRET-KEY", header_value(&config.api_secret)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Setup(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            data_url = %config.data_url,
            timeout  = ?config.timeout,
            "Alpaca broker configured"
        );

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            data_url: config.data_url.clone(),
        })
    }

    /// Current account balances.
    pub async fn account(&self) -> Result<AccountSummary, BrokerError> {
        self.get(&format!("{}/v2/account", self.base_url)).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, BrokerError> {
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    /// `None` when Alpaca reports no open position (HTTP 404).
    async fn position(&self, ticker: &str) -> Result<Option<PositionResponse>, BrokerError> {
        let url = format!("{}/v2/positions/{ticker}", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(ticker, "No open position");
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn submit_order(
        &self,
        ticker: &str,
        quantity: f64,
        side: OrderSide,
    ) -> Result<(), BrokerError> {
        let order = OrderRequest {
            symbol:          ticker,
            qty:             quantity.to_string(),
            side,
            order_type:      "market",
            time_in_force:   "day",
            client_order_id: Uuid::new_v4().to_string(),
        };

        info!(
            ticker,
            side            = %side,
            quantity,
            client_order_id = %order.client_order_id,
            "🚀 Submitting market order"
        );

        let response = self
            .client
            .post(format!("{}/v2/orders", self.base_url))
            .json(&order)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Alpaca unreachable");
                BrokerError::Http(e)
            })?;

        let ack: OrderResponse = decode(response).await?;

        if ack.status == "rejected" {
            warn!(order_id = %ack.id, "Alpaca rejected order");
            return Err(BrokerError::Rejected(format!("order {} rejected", ack.id)));
        }

        info!(order_id = %ack.id, status = %ack.status, "✅ Alpaca accepted order");
        Ok(())
    }
}

#[async_trait]
impl Broker for AlpacaBroker {
    async fn is_market_open(&self) -> Result<bool, BrokerError> {
        let clock: ClockResponse = self.get(&format!("{}/v2/clock", self.base_url)).await?;
        Ok(clock.is_open)
    }

    async fn held_quantity(&self, ticker: &str) -> Result<f64, BrokerError> {
        Ok(self.position(ticker).await?.map(|p| p.qty).unwrap_or(0.0))
    }

    async fn current_price(&self, ticker: &str) -> Result<f64, BrokerError> {
        let url = format!("{}/v2/stocks/{ticker}/bars/latest", self.data_url);
        let latest: LatestBarResponse = self.get(&url).await?;
        match latest.bar.c {
            c if c.is_finite() && c > 0.0 => Ok(c),
            _ => Err(BrokerError::NoQuote(ticker.to_string())),
        }
    }

    async fn entry_price(&self, ticker: &str) -> Result<f64, BrokerError> {
        self.position(ticker)
            .await?
            .map(|p| p.avg_entry_price)
            .ok_or_else(|| BrokerError::NoPosition(ticker.to_string()))
    }

    async fn place_buy(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError> {
        self.submit_order(ticker, quantity, OrderSide::Buy).await
    }

    async fn place_sell(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError> {
        self.submit_order(ticker, quantity, OrderSide::Sell).await
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn header_value(secret: &str) -> Result<HeaderValue, BrokerError> {
    let mut value = HeaderValue::from_str(secret)
        .map_err(|_| BrokerError::Setup("credentials contain invalid header characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BrokerError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BrokerError::Api { status: status.as_u16(), body });
    }

    response
        .json()
        .await
        .map_err(|e| BrokerError::Decode(e.to_string()))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_accepts_decimal_strings() {
        let body = r#"{
            "symbol": "AAPL",
            "qty": "10",
            "avg_entry_price": "187.25",
            "side": "long",
            "market_value": "1900.10"
        }"#;
        let position: PositionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(position.qty, 10.0);
        assert_eq!(position.avg_entry_price, 187.25);
    }

    #[test]
    fn test_decimal_accepts_plain_numbers() {
        let position: PositionResponse =
            serde_json::from_str(r#"{"qty": 2.5, "avg_entry_price": 99}"#).unwrap();
        assert_eq!(position.qty, 2.5);
        assert_eq!(position.avg_entry_price, 99.0);
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        let result: Result<PositionResponse, _> =
            serde_json::from_str(r#"{"qty": "lots", "avg_entry_price": "1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_latest_bar_close_is_price() {
        let body = r#"{
            "symbol": "AAPL",
            "bar": { "t": "2024-01-02T15:59:00Z", "o": 185.1, "h": 185.4, "l": 184.9, "c": 185.3, "v": 51234 }
        }"#;
        let latest: LatestBarResponse = serde_json::from_str(body).unwrap();
        assert_eq!(latest.bar.c, 185.3);
    }

    #[test]
    fn test_order_request_shape() {
        let order = OrderRequest {
            symbol:          "AAPL",
            qty:             2.5_f64.to_string(),
            side:            OrderSide::Sell,
            order_type:      "market",
            time_in_force:   "day",
            client_order_id: "abc".into(),
        };
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["qty"], "2.5");
        assert_eq!(json["side"], "sell");
        assert_eq!(json["type"], "market");
        assert_eq!(json["time_in_force"], "day");
    }

    #[test]
    fn test_account_summary() {
        let body = r#"{
            "id": "904837e3-3b76-47ec-b432-046db621571b",
            "cash": "4000.32",
            "equity": "10421.50",
            "buying_power": "8000.64",
            "portfolio_value": "10421.50",
            "status": "ACTIVE"
        }"#;
        let account: AccountSummary = serde_json::from_str(body).unwrap();
        assert_eq!(account.cash, 4000.32);
        assert_eq!(account.buying_power, 8000.64);
    }

    #[test]
    fn test_new_rejects_unprintable_credentials() {
        let config = AlpacaConfig {
            base_url:   DEFAULT_BASE_URL.into(),
            data_url:   DEFAULT_DATA_URL.into(),
            api_key:    "key\nwith-newline".into(),
            api_secret: "secret".into(),
            timeout:    Duration::from_secs(1),
        };
        assert!(matches!(AlpacaBroker::new(&config), Err(BrokerError::Setup(_))));
    }
}
