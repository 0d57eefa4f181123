use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidQuote, InvalidQuoteReason, Side};

/// Best bid and best ask for one symbol at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub best_bid: f64,
    pub best_ask: f64,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, best_bid: f64, best_ask: f64) -> Self {
        Self {
            symbol: symbol.into(),
            best_bid,
            best_ask,
        }
    }

    /// Checks that both sides are finite and strictly positive.
    ///
    /// A crossed book (`best_bid > best_ask`) is not rejected.
    pub fn validate(&self) -> Result<(), InvalidQuote> {
        for (side, price) in [(Side::Bid, self.best_bid), (Side::Ask, self.best_ask)] {
            let reason = if !price.is_finite() {
                InvalidQuoteReason::NonFinite(side)
            } else if price <= 0.0 {
                InvalidQuoteReason::NonPositive(side)
            } else {
                continue;
            };

            return Err(InvalidQuote {
                symbol: self.symbol.clone(),
                reason,
            });
        }

        Ok(())
    }

    pub fn is_crossed(&self) -> bool {
        self.best_bid > self.best_ask
    }
}

impl Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: Best Bid = {}, Best Ask = {}",
            self.symbol, self.best_bid, self.best_ask
        )
    }
}
