//! # broker
//!
//! The [`Broker`] trait is the only window workers have onto the market.
//!
//! One broker value is created at startup and shared by every worker through
//! [`SharedBroker`].  Implementations must therefore be safe under concurrent
//! calls on their own — workers never lock around them.
//!
//! | Implementation          | Selected by        | Backing                         |
//! |-------------------------|--------------------|---------------------------------|
//! | [`alpaca::AlpacaBroker`] | `BASE_URL=<url>`  | Alpaca v2 REST (pooled reqwest) |
//! | [`paper::PaperBroker`]   | `BASE_URL=mock`   | in-memory book behind `RwLock`  |

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BrokerError;

pub mod alpaca;
pub mod paper;

#[async_trait]
pub trait Broker: Send + Sync {
    /// Whether the exchange is currently accepting orders.
    async fn is_market_open(&self) -> Result<bool, BrokerError>;

    /// Units currently held for `ticker`.  `0.0` when there is no position.
    async fn held_quantity(&self, ticker: &str) -> Result<f64, BrokerError>;

    /// Latest traded price for `ticker`.
    async fn current_price(&self, ticker: &str) -> Result<f64, BrokerError>;

    /// Average cost basis of the open position in `ticker`.
    async fn entry_price(&self, ticker: &str) -> Result<f64, BrokerError>;

    /// Submit a market buy for `quantity` units.
    async fn place_buy(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError>;

    /// Submit a market sell for `quantity` units.
    async fn place_sell(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError>;
}

/// Convenience alias: the broker handle every worker receives.
pub type SharedBroker = Arc<dyn Broker>;
