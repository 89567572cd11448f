//! # broker::paper
//!
//! [`PaperBroker`] — in-memory simulated broker, selected with `BASE_URL=mock`.
//!
//! * Market is open unless `PAPER_MARKET_OPEN=false`.
//! * Every ticker quotes `PAPER_PRICE` until a specific quote is set.
//! * Buys fill immediately at the quote and move the weighted-average entry.
//! * Sells shrink the position; selling more than is held is rejected.
//!
//! The whole book sits behind one `tokio::sync::RwLock`, so any number of
//! workers can share a single instance.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::broker::Broker;
use crate::config::env_parse;
use crate::error::{BrokerError, ConfigError};
use crate::models::OrderSide;

/// Quantities below this are treated as a flat position.
const EPSILON: f64 = 1e-9;

/// A filled simulated order.
#[derive(Debug, Clone, Serialize)]
pub struct PaperOrder {
    pub order_id:   Uuid,
    pub ticker:     String,
    pub side:       OrderSide,
    pub quantity:   f64,
    pub fill_price: f64,
    pub placed_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct PaperPosition {
    quantity:        f64,
    avg_entry_price: f64,
}

#[derive(Debug, Default)]
struct Book {
    quotes:    HashMap<String, f64>,
    positions: HashMap<String, PaperPosition>,
    orders:    Vec<PaperOrder>,
}

impl Book {
    fn quote(&self, ticker: &str, default_price: f64) -> f64 {
        self.quotes.get(ticker).copied().unwrap_or(default_price)
    }
}

pub struct PaperBroker {
    market_open:   bool,
    default_price: f64,
    book:          RwLock<Book>,
}

impl PaperBroker {
    pub fn new(default_price: f64) -> Self {
        Self {
            market_open: true,
            default_price,
            book: RwLock::new(Book::default()),
        }
    }

    /// Fix the market status for the life of the broker.
    pub fn with_market_open(mut self, open: bool) -> Self {
        self.market_open = open;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::read_env("PAPER_PRICE", "PAPER_MARKET_OPEN")
    }

    fn read_env(price_key: &'static str, open_key: &'static str) -> Result<Self, ConfigError> {
        let price: f64 = env_parse(price_key, 100.0)?;
        if !price.is_finite() || price <= 0.0 {
            return Err(ConfigError::InvalidEnv { key: price_key, value: price.to_string() });
        }
        let market_open: bool = env_parse(open_key, true)?;

        info!(price, market_open, "🎭 Paper broker active — orders are simulated");
        Ok(Self::new(price).with_market_open(market_open))
    }

    /// Every order filled so far, oldest first.
    pub async fn orders(&self) -> Vec<PaperOrder> {
        self.book.read().await.orders.clone()
    }

    async fn fill(&self, ticker: &str, quantity: f64, side: OrderSide) -> Result<(), BrokerError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(BrokerError::Rejected(format!("invalid quantity {quantity}")));
        }

        let mut book = self.book.write().await;
        let price = book.quote(ticker, self.default_price);

        match side {
            OrderSide::Buy => {
                let position = book
                    .positions
                    .entry(ticker.to_string())
                    .or_insert(PaperPosition { quantity: 0.0, avg_entry_price: price });
                let total = position.quantity + quantity;
                position.avg_entry_price =
                    (position.avg_entry_price * position.quantity + price * quantity) / total;
                position.quantity = total;
            }
            OrderSide::Sell => {
                let held = book.positions.get(ticker).map(|p| p.quantity).unwrap_or(0.0);
                if quantity > held + EPSILON {
                    return Err(BrokerError::Rejected(format!(
                        "cannot sell {quantity} {ticker}: only {held} held"
                    )));
                }
                let remaining = held - quantity;
                if remaining.abs() < EPSILON {
                    book.positions.remove(ticker);
                } else if let Some(position) = book.positions.get_mut(ticker) {
                    position.quantity = remaining;
                }
            }
        }

        let order = PaperOrder {
            order_id:   Uuid::new_v4(),
            ticker:     ticker.to_string(),
            side,
            quantity,
            fill_price: price,
            placed_at:  Utc::now(),
        };
        info!(
            order_id = %order.order_id,
            ticker,
            side     = %side,
            quantity,
            price,
            "🎭 Paper order filled"
        );
        book.orders.push(order);

        Ok(())
    }
}

#[cfg(test)]
impl PaperBroker {
    pub async fn set_price(&self, ticker: &str, price: f64) {
        self.book.write().await.quotes.insert(ticker.to_string(), price);
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn is_market_open(&self) -> Result<bool, BrokerError> {
        Ok(self.market_open)
    }

    async fn held_quantity(&self, ticker: &str) -> Result<f64, BrokerError> {
        let book = self.book.read().await;
        Ok(book.positions.get(ticker).map(|p| p.quantity).unwrap_or(0.0))
    }

    async fn current_price(&self, ticker: &str) -> Result<f64, BrokerError> {
        Ok(self.book.read().await.quote(ticker, self.default_price))
    }

    async fn entry_price(&self, ticker: &str) -> Result<f64, BrokerError> {
        let book = self.book.read().await;
        book.positions
            .get(ticker)
            .map(|p| p.avg_entry_price)
            .ok_or_else(|| BrokerError::NoPosition(ticker.to_string()))
    }

    async fn place_buy(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError> {
        self.fill(ticker, quantity, OrderSide::Buy).await
    }

    async fn place_sell(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError> {
        self.fill(ticker, quantity, OrderSide::Sell).await
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
