//! Four-leg traversal of a quadrangular cycle at current best-of-book prices.

use chrono::{DateTime, Utc};

use crate::{
    cycle::{CycleConfig, LEG_COUNT},
    error::{EvaluationError, InvalidQuote, InvalidQuoteReason},
    quote::Quote,
    result::CycleResult,
};

/// Evaluates one cycle variant. Holds no state between evaluations.
#[derive(Debug, Clone)]
pub struct ArbitrageEvaluator {
    config: CycleConfig,
}

impl ArbitrageEvaluator {
    pub fn new(config: CycleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        quotes: &[Quote; LEG_COUNT],
        timestamp: DateTime<Utc>,
    ) -> Result<CycleResult, EvaluationError> {
        evaluate(quotes, &self.config, timestamp)
    }
}

/// Walks the cycle once, taking the ask when buying and the bid when selling.
///
/// Every quote is validated before any arithmetic happens, and each quote must be for the leg
/// symbol at the same position in `config.legs`.
///
/// # Errors
/// Returns [`EvaluationError::InvalidQuote`] if a price is zero, negative or non-finite, if the
/// quotes are not in leg order, or if an intermediate amount overflows.
pub fn evaluate(
    quotes: &[Quote; LEG_COUNT],
    config: &CycleConfig,
    timestamp: DateTime<Utc>,
) -> Result<CycleResult, EvaluationError> {
    for (quote, expected) in quotes.iter().zip(&config.legs) {
        if &quote.symbol != expected {
            return Err(InvalidQuote {
                symbol: quote.symbol.clone(),
                reason: InvalidQuoteReason::SymbolMismatch {
                    expected: expected.clone(),
                },
            }
            .into());
        }
        quote.validate()?;
    }

    let [buy_bridge, sell_bridge, buy_alt, sell_alt] = quotes;

    let amount1 = config.starting_capital / buy_bridge.best_ask;
    let amount2 = amount1 * sell_bridge.best_bid;
    let amount3 = amount2 / buy_alt.best_ask;
    let amount4 = amount3 * sell_alt.best_bid;
    let amounts = [amount1, amount2, amount3, amount4];

    if let Some(leg) = amounts.iter().position(|amount| !amount.is_finite()) {
        return Err(InvalidQuote {
            symbol: quotes[leg].symbol.clone(),
            reason: InvalidQuoteReason::Overflow,
        }
        .into());
    }

    let fee_total = config.fee_total();
    let profit_or_loss = amount4 - config.starting_capital - fee_total;

    Ok(CycleResult {
        timestamp,
        variant: config.variant.clone(),
        assets: config.assets.clone(),
        starting_capital: config.starting_capital,
        amounts,
        fee_total,
        profit_or_loss,
        is_profitable: profit_or_loss > 0.0,
    })
}
