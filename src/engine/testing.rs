//! Scripted [`Broker`] double: fixed answers, injectable failures, call log.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::broker::Broker;
use crate::error::BrokerError;
use crate::models::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    MarketOpen,
    HeldQuantity,
    CurrentPrice,
    EntryPrice,
    Buy,
    Sell,
}

#[derive(Debug)]
struct Script {
    market_open: bool,
    held:        f64,
    price:       f64,
    entry:       f64,
    failing:     HashSet<Call>,
    calls:       Vec<Call>,
    orders:      Vec<(OrderSide, String, f64)>,
}

pub struct ScriptedBroker {
    script:  Mutex<Script>,
    latency: Duration,
}

impl ScriptedBroker {
    /// Open market, flat position, price and entry both 100.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                market_open: true,
                held:        0.0,
                price:       100.0,
                entry:       100.0,
                failing:     HashSet::new(),
                calls:       Vec::new(),
                orders:      Vec::new(),
            }),
            latency: Duration::ZERO,
        }
    }

    pub fn market_open(self, open: bool) -> Self {
        self.script.lock().unwrap().market_open = open;
        self
    }

    pub fn held(self, quantity: f64) -> Self {
        self.script.lock().unwrap().held = quantity;
        self
    }

    pub fn price(self, current: f64, entry: f64) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            script.price = current;
            script.entry = entry;
        }
        self
    }

    pub fn failing(self, call: Call) -> Self {
        self.script.lock().unwrap().failing.insert(call);
        self
    }

    /// Every call sleeps this long before answering.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }

    pub fn orders(&self) -> Vec<(OrderSide, String, f64)> {
        self.script.lock().unwrap().orders.clone()
    }

    async fn answer<T>(
        &self,
        call: Call,
        read: impl FnOnce(&mut Script) -> T,
    ) -> Result<T, BrokerError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        if script.failing.contains(&call) {
            return Err(BrokerError::Api { status: 503, body: format!("{call:?} unavailable") });
        }
        Ok(read(&mut script))
    }
}

#[async_trait]
impl Broker for ScriptedBroker {
    async fn is_market_open(&self) -> Result<bool, BrokerError> {
        self.answer(Call::MarketOpen, |s| s.market_open).await
    }

    async fn held_quantity(&self, _ticker: &str) -> Result<f64, BrokerError> {
        self.answer(Call::HeldQuantity, |s| s.held).await
    }

    async fn current_price(&self, _ticker: &str) -> Result<f64, BrokerError> {
        self.answer(Call::CurrentPrice, |s| s.price).await
    }

    async fn entry_price(&self, _ticker: &str) -> Result<f64, BrokerError> {
        self.answer(Call::EntryPrice, |s| s.entry).await
    }

    async fn place_buy(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError> {
        self.answer(Call::Buy, |s| s.orders.push((OrderSide::Buy, ticker.to_string(), quantity)))
            .await
    }

    async fn place_sell(&self, ticker: &str, quantity: f64) -> Result<(), BrokerError> {
        self.answer(Call::Sell, |s| s.orders.push((OrderSide::Sell, ticker.to_string(), quantity)))
            .await
    }
}
