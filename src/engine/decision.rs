//! # engine::decision
//!
//! The threshold rule, kept free of I/O so it can be tested exhaustively.
//!
//! ```text
//! gain_loss = current_price - entry_price
//!
//!   gain_loss >= min_gain  → sell (take profit)     ← checked first
//!   gain_loss <= max_loss  → sell (stop loss)
//!   otherwise              → hold
//! ```
//!
//! Both bounds are inclusive and evaluated against the same `gain_loss`, so
//! when `min_gain == max_loss` a value on the boundary is a take-profit.

use crate::models::Directive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Gain reached `min_gain`.
    TakeProfit,
    /// Loss reached `max_loss`.
    StopLoss,
    Hold,
}

impl Decision {
    pub fn is_sell(self) -> bool {
        !matches!(self, Decision::Hold)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::TakeProfit => "take_profit",
            Decision::StopLoss   => "stop_loss",
            Decision::Hold       => "hold",
        }
    }
}

/// Apply the threshold rule.  A NaN `gain_loss` matches neither bound.
pub fn decide(gain_loss: f64, directive: &Directive) -> Decision {
    if gain_loss >= directive.min_gain {
        Decision::TakeProfit
    } else if gain_loss <= directive.max_loss {
        Decision::StopLoss
    } else {
        Decision::Hold
    }
}
