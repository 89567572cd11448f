//! Domain models shared across the whole trader.

pub mod directive;
pub mod order;

pub use directive::{load_directives, Directive};
pub use order::OrderSide;
